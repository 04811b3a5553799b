// 该文件是 Kanjian （看见） 项目的一部分。
// src/intake.rs - 图像输入与校验
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

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  asset::{ImageAsset, LocalFile, MimeType, PreviewPool},
  config::IntakeLimits,
};

/// URL 图像的文件名
pub const REMOTE_FILE_NAME: &str = "uploaded_image.jpg";

#[derive(Error, Debug)]
pub enum IntakeError {
  #[error("Invalid file type. Please select a JPEG or PNG image.")]
  UnsupportedType(MimeType),
  #[error("File size exceeds 2 MB limit.")]
  TooLarge(u64),
  #[error("Image dimensions exceed 2000 x 2000 pixels.")]
  DimensionsExceeded { width: u32, height: u32 },
  #[error("Image fetch failed: {status}")]
  FetchFailed { status: u16 },
  #[error("Image fetch failed: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("Image could not be decoded: {0}")]
  Decode(#[from] image::ImageError),
}

/// 将本地文件或 URL 转为 [`ImageAsset`]
#[derive(Debug, Clone)]
pub struct Intake {
  limits: IntakeLimits,
  pool: PreviewPool,
  http: reqwest::Client,
}

impl Intake {
  pub fn new(limits: IntakeLimits) -> Self {
    Self::with_client(limits, reqwest::Client::new())
  }

  pub fn with_client(limits: IntakeLimits, http: reqwest::Client) -> Self {
    Self {
      limits,
      pool: PreviewPool::new(),
      http,
    }
  }

  pub fn limits(&self) -> &IntakeLimits {
    &self.limits
  }

  pub fn pool(&self) -> &PreviewPool {
    &self.pool
  }

  fn check_type_and_size(&self, mime_type: &MimeType, size: u64) -> Result<(), IntakeError> {
    if !self.limits.allowed.contains(mime_type) {
      return Err(IntakeError::UnsupportedType(mime_type.clone()));
    }
    if size > self.limits.max_bytes {
      return Err(IntakeError::TooLarge(size));
    }
    Ok(())
  }

  fn check_dimensions(&self, width: u32, height: u32) -> Result<(), IntakeError> {
    if width > self.limits.max_width || height > self.limits.max_height {
      return Err(IntakeError::DimensionsExceeded { width, height });
    }
    Ok(())
  }

  /// 解码并分配预览句柄，`checked` 为真时校验尺寸
  fn stage(
    &self,
    name: String,
    mime_type: MimeType,
    bytes: Vec<u8>,
    checked: bool,
  ) -> Result<ImageAsset, IntakeError> {
    let image = image::load_from_memory(&bytes)?.to_rgb8();
    let (width, height) = image.dimensions();
    if checked {
      self.check_dimensions(width, height)?;
    }
    let preview = self.pool.acquire(image);
    Ok(ImageAsset {
      name,
      bytes: Arc::from(bytes),
      mime_type,
      width,
      height,
      preview,
    })
  }

  /// 校验本地文件：类型、大小、尺寸
  pub fn validate_local_file(&self, file: LocalFile) -> Result<ImageAsset, IntakeError> {
    let LocalFile {
      name,
      mime_type,
      bytes,
    } = file;

    if let Err(e) = self.check_type_and_size(&mime_type, bytes.len() as u64) {
      warn!("文件 {} 未通过校验: {}", name, e);
      return Err(e);
    }

    match self.stage(name.clone(), mime_type, bytes, true) {
      Ok(asset) => {
        info!(
          "文件 {} 校验通过: {}x{} {}",
          asset.name, asset.width, asset.height, asset.mime_type
        );
        Ok(asset)
      }
      Err(e) => {
        warn!("文件 {} 未通过校验: {}", name, e);
        Err(e)
      }
    }
  }

  /// 下载 URL 图像，使用服务器声明的类型
  pub async fn fetch_remote_image(&self, url: &Url) -> Result<ImageAsset, IntakeError> {
    info!("下载图像: {}", url);
    let response = self.http.get(url.clone()).send().await?;

    let status = response.status();
    if !status.is_success() {
      warn!("图像下载失败，状态码: {}", status);
      return Err(IntakeError::FetchFailed {
        status: status.as_u16(),
      });
    }

    let mime_type = response
      .headers()
      .get(reqwest::header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(MimeType::parse)
      .unwrap_or_else(|| MimeType::Other("application/octet-stream".to_string()));
    let bytes = response.bytes().await?.to_vec();

    let checked = self.limits.validate_remote;
    if checked {
      self.check_type_and_size(&mime_type, bytes.len() as u64)?;
    }
    let asset = self.stage(REMOTE_FILE_NAME.to_string(), mime_type, bytes, checked)?;
    info!(
      "图像下载完成: {}x{} {} ({} 字节)",
      asset.width,
      asset.height,
      asset.mime_type,
      asset.bytes.len()
    );
    Ok(asset)
  }
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use image::{DynamicImage, ImageFormat, RgbImage};

  use super::*;

  fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
      .write_to(&mut buf, format)
      .unwrap();
    buf.into_inner()
  }

  #[test]
  fn rejects_unsupported_type_before_decoding() {
    let intake = Intake::new(IntakeLimits::default());
    let file = LocalFile::new("a.gif", MimeType::Gif, vec![1, 2, 3]);
    let err = intake.validate_local_file(file).unwrap_err();
    assert!(matches!(err, IntakeError::UnsupportedType(MimeType::Gif)));
    assert_eq!(intake.pool().live(), 0);
  }

  #[test]
  fn rejects_oversized_file() {
    let intake = Intake::new(IntakeLimits::default());
    let file = LocalFile::new("big.png", MimeType::Png, vec![0; 2_097_153]);
    let err = intake.validate_local_file(file).unwrap_err();
    assert!(matches!(err, IntakeError::TooLarge(2_097_153)));
  }

  #[test]
  fn accepts_exact_size_limit_until_decode() {
    let intake = Intake::new(IntakeLimits::default());
    let file = LocalFile::new("edge.png", MimeType::Png, vec![0; 2_097_152]);
    // 大小通过，内容无法解码
    let err = intake.validate_local_file(file).unwrap_err();
    assert!(matches!(err, IntakeError::Decode(_)));
  }

  #[test]
  fn rejects_large_dimensions() {
    let intake = Intake::new(IntakeLimits::default());
    let file = LocalFile::new("wide.png", MimeType::Png, encode(2001, 10, ImageFormat::Png));
    let err = intake.validate_local_file(file).unwrap_err();
    assert!(matches!(
      err,
      IntakeError::DimensionsExceeded {
        width: 2001,
        height: 10
      }
    ));
    assert_eq!(intake.pool().live(), 0);
  }

  #[test]
  fn accepts_valid_jpeg() {
    let intake = Intake::new(IntakeLimits::default());
    let file = LocalFile::new(
      "photo.jpg",
      MimeType::Jpeg,
      encode(800, 600, ImageFormat::Jpeg),
    );
    let asset = intake.validate_local_file(file).unwrap();
    assert_eq!((asset.width, asset.height), (800, 600));
    assert_eq!(asset.image().dimensions(), (800, 600));
    assert_eq!(intake.pool().live(), 1);
    drop(asset);
    assert_eq!(intake.pool().live(), 0);
  }

  #[test]
  fn error_messages_match_the_shell() {
    assert_eq!(
      IntakeError::FetchFailed { status: 404 }.to_string(),
      "Image fetch failed: 404"
    );
    assert_eq!(
      IntakeError::TooLarge(3).to_string(),
      "File size exceeds 2 MB limit."
    );
  }
}
