// 该文件是 Kanjian （看见） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;
use kanjian::{config::DEFAULT_ENDPOINT, input::ImageSource};
use url::Url;

/// Kanjian 目标检测客户端
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源
  /// 支持格式:
  /// - 本地图片: path/to/image.jpg 或 file:///path/to/image.png（JPEG/PNG，不超过 2 MB 与 2000x2000）
  /// - 远程图片: http(s)://...
  #[arg(long, value_name = "SOURCE")]
  pub input: ImageSource,

  /// 输出位置，可重复
  /// 支持格式:
  /// - 标注图像: image:out.png 或 image:///abs/out.png
  #[arg(long, value_name = "OUTPUT", default_value = "image:annotated.png")]
  pub output: Vec<Url>,

  /// 只绘制第 N 个对象（从 1 开始）
  #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
  pub focus: Option<u64>,

  /// 检测服务密钥
  #[arg(long, env = "KANJIAN_API_KEY", hide_env_values = true)]
  pub api_key: String,

  /// 检测服务地址
  #[arg(long, default_value = DEFAULT_ENDPOINT, value_name = "URL")]
  pub endpoint: Url,

  /// 标签字体文件 (TTF/OTF)
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,

  /// 对远程图片同样执行类型、大小与尺寸校验
  #[arg(long)]
  pub validate_remote: bool,
}
