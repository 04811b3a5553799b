// 该文件是 Kanjian （看见） 项目的一部分。
// src/output/save_image_file.rs - 保存标注图像
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

use std::path::{Path, PathBuf};

use image::RgbImage;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  config::RenderStyle,
  output::{Analysis, IMAGE_SCHEME, Render, ensure_parent, url_file_path},
  render::{BlockFace, ColorPicker, FontFace, LabelFace, RandomColor, Renderer},
};

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 默认渲染器：配置的字体或内置字体，加随机颜色
pub fn default_renderer(style: RenderStyle) -> Renderer<Box<dyn LabelFace>, RandomColor> {
  let face: Box<dyn LabelFace> = match FontFace::discover(&style) {
    Ok(face) => Box::new(face),
    Err(e) => {
      warn!("内置字体加载失败: {}，标签文字将以方块显示", e);
      Box::new(BlockFace::new(style.font_size))
    }
  };
  Renderer::new(face, RandomColor, style)
}

pub struct SaveImageFileOutput<F = Box<dyn LabelFace>, C = RandomColor> {
  path: PathBuf,
  renderer: Renderer<F, C>,
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = IMAGE_SCHEME;
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    Self::from_url_with_style(uri, RenderStyle::default())
  }
}

impl SaveImageFileOutput {
  pub fn from_url_with_style(uri: &Url, style: RenderStyle) -> Result<Self, SaveImageFileError> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(Self::with_renderer(url_file_path(uri), default_renderer(style)))
  }
}

impl<F: LabelFace, C: ColorPicker> SaveImageFileOutput<F, C> {
  pub fn with_renderer(path: impl Into<PathBuf>, renderer: Renderer<F, C>) -> Self {
    Self {
      path: path.into(),
      renderer,
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn save_image(&self, image: RgbImage) -> Result<(), SaveImageFileError> {
    ensure_parent(&self.path)?;
    image.save(&self.path)?;
    info!("保存图像到文件: {}", self.path.display());
    Ok(())
  }
}

impl<'a, F: LabelFace, C: ColorPicker> Render<RgbImage, Analysis<'a>> for SaveImageFileOutput<F, C> {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &RgbImage, result: &Analysis<'a>) -> Result<(), Self::Error> {
    let image = self.renderer.render(frame, result.detections, result.focus);
    self.save_image(image)
  }
}
