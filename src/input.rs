// 该文件是 Kanjian （看见） 项目的一部分。
// src/input.rs - 图像来源
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

use std::{path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::error;
use url::Url;

use crate::FromUrl;

#[derive(Error, Debug)]
pub enum InputError {
  #[error("URI scheme mismatch: {0}")]
  SchemeMismatch(String),
  #[error("Invalid file URI: {0}")]
  InvalidFilePath(Url),
}

/// 本地文件或远程 URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
  Local(PathBuf),
  Remote(Url),
}

impl FromUrl for ImageSource {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      "file" => url
        .to_file_path()
        .map(ImageSource::Local)
        .map_err(|_| InputError::InvalidFilePath(url.clone())),
      "http" | "https" => Ok(ImageSource::Remote(url.clone())),
      other => {
        error!("URI scheme mismatch: expected 'file', 'http' or 'https', found '{}'", other);
        Err(InputError::SchemeMismatch(other.to_string()))
      }
    }
  }
}

impl FromStr for ImageSource {
  type Err = InputError;

  /// 不是 URL 的字符串按本地路径处理
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match Url::parse(s) {
      // Windows 盘符会被解析成单字母方案
      Ok(url) if url.scheme().len() > 1 => Self::from_url(&url),
      _ => Ok(ImageSource::Local(PathBuf::from(s))),
    }
  }
}
