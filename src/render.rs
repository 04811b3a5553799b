// 该文件是 Kanjian （看见） 项目的一部分。
// src/render.rs - 目标检测结果可视化
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

use std::{path::Path, sync::Mutex};

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
  config::RenderStyle,
  detection::{DetectionSet, PixelRect},
};

const TEXT_FILL: Rgb<u8> = Rgb([255, 255, 255]);
const TEXT_STROKE: Rgb<u8> = Rgb([0, 0, 0]);

/// 内置的标签字体
const EMBEDDED_FONT: &[u8] = include_bytes!("../assets/DejaVuSans-Bold.ttf");

#[derive(Error, Debug)]
pub enum RenderError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体无效: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

pub trait TextMeasure {
  fn text_width(&self, text: &str) -> f32;
}

/// 可以测量并绘制标签文本的字体
pub trait LabelFace: TextMeasure {
  /// `baseline` 为文字基线的 y 坐标
  fn draw_text(&self, image: &mut RgbImage, color: Rgb<u8>, x: i32, baseline: i32, text: &str);
}

impl<T: TextMeasure + ?Sized> TextMeasure for Box<T> {
  fn text_width(&self, text: &str) -> f32 {
    (**self).text_width(text)
  }
}

impl<T: LabelFace + ?Sized> LabelFace for Box<T> {
  fn draw_text(&self, image: &mut RgbImage, color: Rgb<u8>, x: i32, baseline: i32, text: &str) {
    (**self).draw_text(image, color, x, baseline, text)
  }
}

/// TrueType 字体
pub struct FontFace {
  font: FontArc,
  scale: PxScale,
}

impl FontFace {
  pub fn from_bytes(data: Vec<u8>, size: f32) -> Result<Self, RenderError> {
    Ok(Self {
      font: FontArc::try_from_vec(data)?,
      scale: PxScale::from(size),
    })
  }

  pub fn load(path: impl AsRef<Path>, size: f32) -> Result<Self, RenderError> {
    Self::from_bytes(std::fs::read(path)?, size)
  }

  pub fn embedded(size: f32) -> Result<Self, RenderError> {
    Ok(Self {
      font: FontArc::try_from_slice(EMBEDDED_FONT)?,
      scale: PxScale::from(size),
    })
  }

  /// 优先使用配置的字体，无法加载时退回内置字体
  pub fn discover(style: &RenderStyle) -> Result<Self, RenderError> {
    if let Some(path) = &style.font_path {
      match Self::load(path, style.font_size) {
        Ok(face) => {
          debug!("使用字体: {}", path.display());
          return Ok(face);
        }
        Err(e) => warn!("字体 {} 无法使用: {}，改用内置字体", path.display(), e),
      }
    }
    Self::embedded(style.font_size)
  }
}

impl TextMeasure for FontFace {
  fn text_width(&self, text: &str) -> f32 {
    text_size(self.scale, &self.font, text).0 as f32
  }
}

impl LabelFace for FontFace {
  fn draw_text(&self, image: &mut RgbImage, color: Rgb<u8>, x: i32, baseline: i32, text: &str) {
    let ascent = self.font.as_scaled(self.scale).ascent();
    let top = baseline.saturating_sub(ascent.round() as i32);
    draw_text_mut(image, color, x, top, self.scale, &self.font, text);
  }
}

/// 等宽方块字形，没有字体文件时使用
#[derive(Debug, Clone, Copy)]
pub struct BlockFace {
  pub advance: f32,
  pub glyph_height: u32,
}

impl BlockFace {
  pub fn new(font_size: f32) -> Self {
    Self {
      advance: (font_size * 0.6).round(),
      glyph_height: (font_size * 0.7).round() as u32,
    }
  }
}

impl TextMeasure for BlockFace {
  fn text_width(&self, text: &str) -> f32 {
    text.chars().count() as f32 * self.advance
  }
}

impl LabelFace for BlockFace {
  fn draw_text(&self, image: &mut RgbImage, color: Rgb<u8>, x: i32, baseline: i32, text: &str) {
    let glyph_width = (self.advance as i64 - 2).max(1);
    let bottom = baseline as i64 - 1;
    let top = baseline as i64 - self.glyph_height as i64;
    for (i, ch) in text.chars().enumerate() {
      if ch.is_whitespace() || self.glyph_height == 0 {
        continue;
      }
      let gx = x as i64 + (i as f32 * self.advance) as i64 + 1;
      fill_clipped(image, gx, top, gx + glyph_width - 1, bottom, color);
    }
  }
}

/// 边框颜色的选择策略
pub trait ColorPicker {
  fn pick(&self) -> Rgb<u8>;
}

/// 六位十六进制颜色，每位独立均匀取值
pub fn random_hex_color<R: Rng + ?Sized>(rng: &mut R) -> Rgb<u8> {
  let mut nibbles = [0u8; 6];
  for n in nibbles.iter_mut() {
    *n = rng.gen_range(0..16);
  }
  Rgb([
    nibbles[0] << 4 | nibbles[1],
    nibbles[2] << 4 | nibbles[3],
    nibbles[4] << 4 | nibbles[5],
  ])
}

pub fn to_hex(color: Rgb<u8>) -> String {
  format!("#{:02X}{:02X}{:02X}", color[0], color[1], color[2])
}

/// 每次绘制都重新随机
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomColor;

impl ColorPicker for RandomColor {
  fn pick(&self) -> Rgb<u8> {
    random_hex_color(&mut rand::thread_rng())
  }
}

/// 固定种子的随机颜色
#[derive(Debug)]
pub struct SeededColor(Mutex<StdRng>);

impl SeededColor {
  pub fn new(seed: u64) -> Self {
    Self(Mutex::new(StdRng::seed_from_u64(seed)))
  }
}

impl ColorPicker for SeededColor {
  fn pick(&self) -> Rgb<u8> {
    let mut rng = self.0.lock().unwrap_or_else(|e| e.into_inner());
    random_hex_color(&mut *rng)
  }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedColor(pub Rgb<u8>);

impl ColorPicker for FixedColor {
  fn pick(&self) -> Rgb<u8> {
    self.0
  }
}

/// 标签块的位置、大小与文本
#[derive(Debug, Clone, PartialEq)]
pub struct LabelBlock {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
  pub lines: [String; 3],
}

impl LabelBlock {
  pub fn right(&self) -> f32 {
    self.x + self.width
  }
}

/// 一个检测对象的绘制内容
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
  pub index: usize,
  pub rect: PixelRect,
  pub label: LabelBlock,
}

/// 计算每个可见检测对象的边框与标签块位置
pub fn layout<M: TextMeasure + ?Sized>(
  set: &DetectionSet,
  focus: Option<usize>,
  surface: (u32, u32),
  measure: &M,
  style: &RenderStyle,
) -> Vec<Annotation> {
  let surface_width = surface.0 as f32;
  let mut annotations = Vec::new();

  for (index, record) in set.visible(focus) {
    let Some(rect) = record.bounding_box.to_rect() else {
      warn!("对象 {} 的坐标无法解析: {:?}", index + 1, record.bounding_box);
      continue;
    };

    let lines = record.label_lines(index);
    let width = lines
      .iter()
      .map(|line| measure.text_width(line))
      .fold(0.0f32, f32::max)
      + style.padding;

    // 默认放在边框上方，超出顶部时移到边框内
    let mut x = rect.x1 as f32;
    let mut y = rect.y1 as f32 - style.block_height;
    if y < 0.0 {
      y = rect.y1 as f32 + style.below_offset;
    }
    if x + width > surface_width {
      x = surface_width - width - style.edge_margin;
    }

    annotations.push(Annotation {
      index,
      rect,
      label: LabelBlock {
        x,
        y,
        width,
        height: style.block_height,
        lines,
      },
    });
  }

  annotations
}

pub struct Renderer<F, C> {
  face: F,
  colors: C,
  style: RenderStyle,
}

impl<F: LabelFace, C: ColorPicker> Renderer<F, C> {
  pub fn new(face: F, colors: C, style: RenderStyle) -> Self {
    Self {
      face,
      colors,
      style,
    }
  }

  pub fn face(&self) -> &F {
    &self.face
  }

  pub fn style(&self) -> &RenderStyle {
    &self.style
  }

  pub fn layout(
    &self,
    set: &DetectionSet,
    focus: Option<usize>,
    surface: (u32, u32),
  ) -> Vec<Annotation> {
    layout(set, focus, surface, &self.face, &self.style)
  }

  /// 在原图副本上绘制全部可见的检测结果
  pub fn render(&self, base: &RgbImage, set: &DetectionSet, focus: Option<usize>) -> RgbImage {
    // 画布与原图同尺寸
    let mut surface = base.clone();
    let annotations = self.layout(set, focus, surface.dimensions());
    for annotation in &annotations {
      let color = self.colors.pick();
      debug!(
        "绘制对象 {}: {:?} 颜色 {}",
        annotation.index + 1,
        annotation.rect,
        to_hex(color)
      );
      self.draw_box(&mut surface, &annotation.rect, color);
      self.draw_label(&mut surface, &annotation.label);
    }
    surface
  }

  fn draw_box(&self, image: &mut RgbImage, rect: &PixelRect, color: Rgb<u8>) {
    let line_width = self.style.box_line_width.max(1) as i64;
    // 线宽以路径为中心，每圈只画落在画布内的部分
    for k in 0..line_width {
      let offset = k - line_width / 2;
      let left = rect.x1 as i64 + offset;
      let top = rect.y1 as i64 + offset;
      let right = left + (rect.width() - 2 * offset).max(1) - 1;
      let bottom = top + (rect.height() - 2 * offset).max(1) - 1;
      fill_clipped(image, left, top, right, top, color);
      fill_clipped(image, left, bottom, right, bottom, color);
      fill_clipped(image, left, top, left, bottom, color);
      fill_clipped(image, right, top, right, bottom, color);
    }
  }

  fn draw_label(&self, image: &mut RgbImage, block: &LabelBlock) {
    let (surface_width, surface_height) = image.dimensions();
    if block.right() <= 0.0
      || block.x >= surface_width as f32
      || block.y + block.height <= 0.0
      || block.y >= surface_height as f32
    {
      debug!("标签块在画布外: ({}, {})", block.x, block.y);
      return;
    }

    let x = block.x.round() as i64;
    let y = block.y.round() as i64;
    shade_rect(
      image,
      x,
      y,
      x + block.width.round() as i64 - 1,
      y + block.height.round() as i64 - 1,
      self.style.background_alpha,
    );

    let radius = (self.style.text_stroke_width / 2) as i32;
    let text_x = (block.x + self.style.text_inset).round() as i32;
    for (line, offset) in block.lines.iter().zip(self.style.line_offsets) {
      let baseline = (block.y + offset).round() as i32;
      for dy in -radius..=radius {
        for dx in -radius..=radius {
          if dx != 0 || dy != 0 {
            self
              .face
              .draw_text(image, TEXT_STROKE, text_x + dx, baseline + dy, line);
          }
        }
      }
      self.face.draw_text(image, TEXT_FILL, text_x, baseline, line);
    }
  }
}

/// 与画布求交后的闭区间矩形，完全在画布外时为 `None`
fn clip_to_surface(
  image: &RgbImage,
  left: i64,
  top: i64,
  right: i64,
  bottom: i64,
) -> Option<(u32, u32, u32, u32)> {
  let left = left.max(0);
  let top = top.max(0);
  let right = right.min(image.width() as i64 - 1);
  let bottom = bottom.min(image.height() as i64 - 1);
  if left > right || top > bottom {
    return None;
  }
  Some((left as u32, top as u32, right as u32, bottom as u32))
}

fn fill_clipped(
  image: &mut RgbImage,
  left: i64,
  top: i64,
  right: i64,
  bottom: i64,
  color: Rgb<u8>,
) {
  if let Some((left, top, right, bottom)) = clip_to_surface(image, left, top, right, bottom) {
    let rect = Rect::at(left as i32, top as i32).of_size(right - left + 1, bottom - top + 1);
    draw_filled_rect_mut(image, rect, color);
  }
}

/// 以黑色半透明覆盖矩形区域，超出画布的部分忽略
fn shade_rect(
  image: &mut RgbImage,
  left: i64,
  top: i64,
  right: i64,
  bottom: i64,
  alpha: f32,
) {
  let keep = (1.0 - alpha).clamp(0.0, 1.0);
  let Some((left, top, right, bottom)) = clip_to_surface(image, left, top, right, bottom) else {
    return;
  };
  for py in top..=bottom {
    for px in left..=right {
      let pixel = image.get_pixel_mut(px, py);
      for c in pixel.0.iter_mut() {
        *c = (*c as f32 * keep).round() as u8;
      }
    }
  }
}
