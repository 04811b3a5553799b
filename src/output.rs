// 该文件是 Kanjian （看见） 项目的一部分。
// src/output.rs - 输出定义
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
use url::Url;

use crate::{
  FromUrl,
  config::RenderStyle,
  detection::DetectionSet,
  render::{ColorPicker, LabelFace, RandomColor},
};

mod save_image_file;

pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput, default_renderer};

pub const IMAGE_SCHEME: &str = "image";

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

/// 一次分析的结果与焦点
#[derive(Debug, Clone, Copy)]
pub struct Analysis<'a> {
  pub detections: &'a DetectionSet,
  pub focus: Option<usize>,
}

/// 从 URL 取出文件路径
fn url_file_path(url: &Url) -> PathBuf {
  let path = url.path();
  match urlencoding::decode(path) {
    Ok(decoded) => PathBuf::from(decoded.into_owned()),
    Err(_) => PathBuf::from(path),
  }
}

fn ensure_parent(path: &Path) -> Result<(), std::io::Error> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)?;
  }
  Ok(())
}

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum OutputWrapper<F = Box<dyn LabelFace>, C = RandomColor> {
  SaveImageFileOutput(SaveImageFileOutput<F, C>),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    Self::from_url_with_style(url, RenderStyle::default())
  }
}

impl OutputWrapper {
  pub fn from_url_with_style(url: &Url, style: RenderStyle) -> Result<Self, OutputError> {
    match url.scheme() {
      IMAGE_SCHEME => {
        let output = SaveImageFileOutput::from_url_with_style(url, style)?;
        Ok(OutputWrapper::SaveImageFileOutput(output))
      }
      other => Err(OutputError::SchemeMismatch(other.to_string())),
    }
  }
}

impl<'a, F: LabelFace, C: ColorPicker> Render<RgbImage, Analysis<'a>> for OutputWrapper<F, C> {
  type Error = OutputError;

  fn render_result(&self, frame: &RgbImage, result: &Analysis<'a>) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::SaveImageFileOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    }
  }
}
