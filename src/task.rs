// 该文件是 Kanjian （看见） 项目的一部分。
// src/task.rs - 分析任务
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::future::Future;

use anyhow::{Context, bail};
use image::RgbImage;
use tracing::{info, warn};

use crate::{
  asset::{LocalFile, UploadPayload},
  detection::DetectionSet,
  input::ImageSource,
  intake::Intake,
  model::{Model, PipelineError},
  output::{Analysis, Render},
  session::{Session, Status, View},
};

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(
    self,
    input: I,
    model: M,
    output: O,
  ) -> impl Future<Output = Result<Self::Output, Self::Error>>;
}

/// 选择图像、提交一次、绘制结果
pub struct OneShotTask {
  intake: Intake,
  focus: Option<usize>,
}

impl OneShotTask {
  pub fn new(intake: Intake) -> Self {
    Self {
      intake,
      focus: None,
    }
  }

  /// 只绘制序号为 `focus` 的对象（从 0 开始）
  pub fn with_focus(mut self, focus: Option<usize>) -> Self {
    self.focus = focus;
    self
  }
}

impl<M, O, R, E> Task<ImageSource, M, O> for OneShotTask
where
  M: Model<Input = UploadPayload, Output = DetectionSet, Error = PipelineError>,
  O: IntoIterator<Item = R>,
  R: for<'a> Render<RgbImage, Analysis<'a>, Error = E>,
  E: std::error::Error + Send + Sync + 'static,
{
  type Output = Session;
  type Error = anyhow::Error;

  async fn run_task(self, input: ImageSource, model: M, output: O) -> Result<Session, Self::Error> {
    info!("开始任务...");
    let mut session = Session::new();
    let now = std::time::Instant::now();

    match input {
      ImageSource::Local(path) => {
        let file = LocalFile::open(&path)
          .with_context(|| format!("无法读取图片文件: {}", path.display()))?;
        session.select_file(&self.intake, file)?;
        session.submit(&model).await?;
      }
      ImageSource::Remote(url) => {
        session.analyze_url(&self.intake, &model, &url).await?;
      }
    }
    info!("分析结束，耗时: {:.2?}", now.elapsed());

    if let Status::Failed(message) = session.status() {
      bail!("{}", message);
    }

    if let Some(index) = self.focus {
      session.focus(index)?;
    }

    match session.view() {
      View::Overlay {
        asset,
        detections,
        focus,
      } => {
        let analysis = Analysis { detections, focus };
        for sink in output {
          sink.render_result(asset.image(), &analysis)?;
        }
        info!("渲染完成");
      }
      View::Preview(_) | View::Empty => warn!("没有可绘制的检测结果"),
    }

    info!("任务完成，退出");
    Ok(session)
  }
}
