// 该文件是 Kanjian （看见） 项目的一部分。
// src/detection.rs - 检测结果定义
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

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// 服务返回的文本字段，数字按 JSON 原文保留
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
  Ok(match Value::deserialize(deserializer)? {
    Value::String(s) => s,
    Value::Null => String::new(),
    other => other.to_string(),
  })
}

/// 取字符串开头的整数部分，`"12.7"` 得到 12
pub fn parse_leading_int(text: &str) -> Option<i32> {
  let text = text.trim_start();
  let (sign, rest) = match text.as_bytes().first() {
    Some(b'-') => (-1i64, &text[1..]),
    Some(b'+') => (1i64, &text[1..]),
    _ => (1i64, text),
  };
  let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
  if digits == 0 {
    return None;
  }
  let value: i64 = rest[..digits].parse().ok()?;
  i32::try_from(sign * value).ok()
}

/// 像素坐标矩形
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
  pub x1: i32,
  pub y1: i32,
  pub x2: i32,
  pub y2: i32,
}

impl PixelRect {
  pub fn width(&self) -> i64 {
    self.x2 as i64 - self.x1 as i64
  }

  pub fn height(&self) -> i64 {
    self.y2 as i64 - self.y1 as i64
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BoundingBox {
  #[serde(default, deserialize_with = "lenient_text")]
  pub x1: String,
  #[serde(default, deserialize_with = "lenient_text")]
  pub y1: String,
  #[serde(default, deserialize_with = "lenient_text")]
  pub x2: String,
  #[serde(default, deserialize_with = "lenient_text")]
  pub y2: String,
}

impl BoundingBox {
  pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
    Self {
      x1: x1.to_string(),
      y1: y1.to_string(),
      x2: x2.to_string(),
      y2: y2.to_string(),
    }
  }

  /// 坐标转为整数，任一坐标无法解析时返回 `None`
  pub fn to_rect(&self) -> Option<PixelRect> {
    Some(PixelRect {
      x1: parse_leading_int(&self.x1)?,
      y1: parse_leading_int(&self.y1)?,
      x2: parse_leading_int(&self.x2)?,
      y2: parse_leading_int(&self.y2)?,
    })
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DetectionRecord {
  #[serde(default, deserialize_with = "lenient_text")]
  pub label: String,
  #[serde(default, deserialize_with = "lenient_text")]
  pub confidence: String,
  #[serde(default)]
  pub bounding_box: BoundingBox,
}

impl DetectionRecord {
  pub fn title(index: usize) -> String {
    format!("Object {}", index + 1)
  }

  /// 标签块的三行文本
  pub fn label_lines(&self, index: usize) -> [String; 3] {
    [
      Self::title(index),
      format!("Label: {}", self.label),
      format!("Confidence: {}", self.confidence),
    ]
  }

  /// 列表条目文本
  pub fn summary(&self, index: usize) -> Vec<String> {
    let [title, label, confidence] = self.label_lines(index);
    let b = &self.bounding_box;
    vec![
      title,
      label,
      confidence,
      format!("Bounding Box: ({}, {}), ({}, {})", b.x1, b.y1, b.x2, b.y2),
    ]
  }
}

/// 按服务返回顺序排列的检测结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct DetectionSet {
  pub records: Vec<DetectionRecord>,
}

impl DetectionSet {
  pub fn new(records: Vec<DetectionRecord>) -> Self {
    Self { records }
  }

  pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(text)
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&DetectionRecord> {
    self.records.get(index)
  }

  /// 按焦点过滤后的 (序号, 记录)
  pub fn visible(&self, focus: Option<usize>) -> impl Iterator<Item = (usize, &DetectionRecord)> {
    self
      .records
      .iter()
      .enumerate()
      .filter(move |(i, _)| focus.is_none_or(|f| f == *i))
  }
}
