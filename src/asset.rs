// 该文件是 Kanjian （看见） 项目的一部分。
// src/asset.rs - 待分析图像
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

use std::{
  path::Path,
  sync::{
    Arc,
    atomic::{AtomicU64, AtomicUsize, Ordering},
  },
};

use image::RgbImage;
use tracing::debug;

/// 图像 MIME 类型
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MimeType {
  Jpeg,
  Png,
  Gif,
  Bmp,
  Webp,
  Other(String),
}

impl MimeType {
  /// 解析 `Content-Type`，忽略参数与大小写
  pub fn parse(value: &str) -> Self {
    let essence = value
      .split(';')
      .next()
      .unwrap_or_default()
      .trim()
      .to_ascii_lowercase();
    match essence.as_str() {
      "image/jpeg" => MimeType::Jpeg,
      "image/png" => MimeType::Png,
      "image/gif" => MimeType::Gif,
      "image/bmp" => MimeType::Bmp,
      "image/webp" => MimeType::Webp,
      _ => MimeType::Other(essence),
    }
  }

  /// 按扩展名推断，和浏览器文件选择器的行为一致
  pub fn from_path(path: &Path) -> Self {
    let ext = path
      .extension()
      .and_then(|e| e.to_str())
      .map(|e| e.to_ascii_lowercase())
      .unwrap_or_default();
    match ext.as_str() {
      "jpg" | "jpeg" | "jfif" => MimeType::Jpeg,
      "png" => MimeType::Png,
      "gif" => MimeType::Gif,
      "bmp" => MimeType::Bmp,
      "webp" => MimeType::Webp,
      _ => MimeType::Other("application/octet-stream".to_string()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      MimeType::Jpeg => "image/jpeg",
      MimeType::Png => "image/png",
      MimeType::Gif => "image/gif",
      MimeType::Bmp => "image/bmp",
      MimeType::Webp => "image/webp",
      MimeType::Other(s) => s,
    }
  }
}

impl std::fmt::Display for MimeType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 用户选择的本地文件
#[derive(Debug, Clone)]
pub struct LocalFile {
  pub name: String,
  pub mime_type: MimeType,
  pub bytes: Vec<u8>,
}

impl LocalFile {
  pub fn new(name: impl Into<String>, mime_type: MimeType, bytes: Vec<u8>) -> Self {
    Self {
      name: name.into(),
      mime_type,
      bytes,
    }
  }

  pub fn open(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();
    Ok(Self::new(name, MimeType::from_path(path), bytes))
  }

  pub fn byte_size(&self) -> u64 {
    self.bytes.len() as u64
  }
}

/// 预览句柄池，统计未释放的句柄数量
#[derive(Debug, Default, Clone)]
pub struct PreviewPool {
  next_id: Arc<AtomicU64>,
  live: Arc<AtomicUsize>,
}

impl PreviewPool {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn acquire(&self, image: RgbImage) -> PreviewHandle {
    let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
    self.live.fetch_add(1, Ordering::AcqRel);
    debug!("分配预览句柄 #{} ({}x{})", id, image.width(), image.height());
    PreviewHandle {
      id,
      image: Arc::new(image),
      live: Arc::clone(&self.live),
    }
  }

  pub fn live(&self) -> usize {
    self.live.load(Ordering::Acquire)
  }
}

/// 解码后的图像引用，析构时释放
#[derive(Debug)]
pub struct PreviewHandle {
  id: u64,
  image: Arc<RgbImage>,
  live: Arc<AtomicUsize>,
}

impl PreviewHandle {
  pub fn id(&self) -> u64 {
    self.id
  }

  pub fn image(&self) -> &RgbImage {
    &self.image
  }
}

impl Drop for PreviewHandle {
  fn drop(&mut self) {
    self.live.fetch_sub(1, Ordering::AcqRel);
    debug!("释放预览句柄 #{}", self.id);
  }
}

/// 上传到检测服务的内容
#[derive(Debug, Clone)]
pub struct UploadPayload {
  pub file_name: String,
  pub mime_type: MimeType,
  pub bytes: Arc<[u8]>,
}

/// 已通过校验的图像
#[derive(Debug)]
pub struct ImageAsset {
  pub name: String,
  pub bytes: Arc<[u8]>,
  pub mime_type: MimeType,
  pub width: u32,
  pub height: u32,
  pub preview: PreviewHandle,
}

impl ImageAsset {
  pub fn payload(&self) -> UploadPayload {
    UploadPayload {
      file_name: self.name.clone(),
      mime_type: self.mime_type.clone(),
      bytes: Arc::clone(&self.bytes),
    }
  }

  pub fn image(&self) -> &RgbImage {
    self.preview.image()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mime_from_extension() {
    assert_eq!(MimeType::from_path(Path::new("a/b.JPG")), MimeType::Jpeg);
    assert_eq!(MimeType::from_path(Path::new("b.jpeg")), MimeType::Jpeg);
    assert_eq!(MimeType::from_path(Path::new("b.png")), MimeType::Png);
    assert_eq!(
      MimeType::from_path(Path::new("notes.txt")).as_str(),
      "application/octet-stream"
    );
  }

  #[test]
  fn mime_parse_drops_parameters() {
    assert_eq!(MimeType::parse("image/PNG; charset=binary"), MimeType::Png);
    assert_eq!(
      MimeType::parse("text/html"),
      MimeType::Other("text/html".to_string())
    );
  }

  #[test]
  fn handles_are_released_on_drop() {
    let pool = PreviewPool::new();
    let first = pool.acquire(RgbImage::new(2, 2));
    let second = pool.acquire(RgbImage::new(2, 2));
    assert_eq!(pool.live(), 2);
    assert_ne!(first.id(), second.id());
    drop(first);
    assert_eq!(pool.live(), 1);
    drop(second);
    assert_eq!(pool.live(), 0);
  }
}
