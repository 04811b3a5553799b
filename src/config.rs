// 该文件是 Kanjian （看见） 项目的一部分。
// src/config.rs - 运行配置
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

use std::path::PathBuf;

use url::Url;

use crate::asset::MimeType;

pub const DEFAULT_ENDPOINT: &str = "https://api.api-ninjas.com/v1/objectdetection";
pub const MAX_FILE_BYTES: u64 = 2 * 1024 * 1024;
pub const MAX_DIMENSION: u32 = 2000;

/// 输入图像的校验限制
#[derive(Debug, Clone)]
pub struct IntakeLimits {
  /// 允许的 MIME 类型
  pub allowed: Vec<MimeType>,
  /// 文件字节上限
  pub max_bytes: u64,
  /// 宽度上限
  pub max_width: u32,
  /// 高度上限
  pub max_height: u32,
  /// 是否对 URL 图像执行同样的校验
  pub validate_remote: bool,
}

impl Default for IntakeLimits {
  fn default() -> Self {
    Self {
      allowed: vec![MimeType::Jpeg, MimeType::Png],
      max_bytes: MAX_FILE_BYTES,
      max_width: MAX_DIMENSION,
      max_height: MAX_DIMENSION,
      validate_remote: false,
    }
  }
}

/// 检测服务配置
#[derive(Clone)]
pub struct DetectorConfig {
  pub endpoint: Url,
  pub api_key: String,
}

impl DetectorConfig {
  pub fn new(endpoint: Url, api_key: impl Into<String>) -> Self {
    Self {
      endpoint,
      api_key: api_key.into(),
    }
  }
}

// 不输出密钥
impl std::fmt::Debug for DetectorConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DetectorConfig")
      .field("endpoint", &self.endpoint.as_str())
      .field("api_key", &"<redacted>")
      .finish()
  }
}

// 文本渲染常量
pub const LABEL_FONT_SIZE: f32 = 16.0;
pub const LABEL_BLOCK_HEIGHT: f32 = 55.0;
pub const LABEL_PADDING: f32 = 10.0;
pub const LABEL_EDGE_MARGIN: f32 = 10.0;
pub const LABEL_BELOW_OFFSET: f32 = 10.0;
pub const LABEL_TEXT_INSET: f32 = 5.0;
pub const LABEL_LINE_OFFSETS: [f32; 3] = [15.0, 30.0, 45.0];
pub const BOX_LINE_WIDTH: u32 = 2;
pub const TEXT_STROKE_WIDTH: u32 = 3;
pub const LABEL_BACKGROUND_ALPHA: f32 = 0.7;

/// 标注绘制风格
#[derive(Debug, Clone)]
pub struct RenderStyle {
  pub font_size: f32,
  pub block_height: f32,
  pub padding: f32,
  pub edge_margin: f32,
  pub below_offset: f32,
  pub text_inset: f32,
  pub line_offsets: [f32; 3],
  pub box_line_width: u32,
  pub text_stroke_width: u32,
  pub background_alpha: f32,
  /// 字体文件，为空时使用内置字体
  pub font_path: Option<PathBuf>,
}

impl Default for RenderStyle {
  fn default() -> Self {
    Self {
      font_size: LABEL_FONT_SIZE,
      block_height: LABEL_BLOCK_HEIGHT,
      padding: LABEL_PADDING,
      edge_margin: LABEL_EDGE_MARGIN,
      below_offset: LABEL_BELOW_OFFSET,
      text_inset: LABEL_TEXT_INSET,
      line_offsets: LABEL_LINE_OFFSETS,
      box_line_width: BOX_LINE_WIDTH,
      text_stroke_width: TEXT_STROKE_WIDTH,
      background_alpha: LABEL_BACKGROUND_ALPHA,
      font_path: None,
    }
  }
}
