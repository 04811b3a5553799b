// 该文件是 Kanjian （看见） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kanjian::{
  config::{DetectorConfig, IntakeLimits, RenderStyle},
  intake::Intake,
  model::DetectionClient,
  output::OutputWrapper,
  session::Session,
  task::{OneShotTask, Task},
};

fn print_detections(session: &Session) {
  let Some(detections) = session.detections() else {
    return;
  };
  println!();
  println!("检测到 {} 个对象:", detections.len());
  for (index, record) in detections.visible(session.focus_index()) {
    println!();
    for line in record.summary(index) {
      println!("  {}", line);
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = args::Args::parse();

  info!("输入来源: {:?}", args.input);
  info!("检测服务: {}", args.endpoint);
  for output in &args.output {
    info!("输出路径: {}", output);
  }

  let limits = IntakeLimits {
    validate_remote: args.validate_remote,
    ..IntakeLimits::default()
  };
  let style = RenderStyle {
    font_path: args.font.clone(),
    ..RenderStyle::default()
  };

  let intake = Intake::new(limits);
  let model = DetectionClient::new(DetectorConfig::new(args.endpoint.clone(), args.api_key));
  let outputs = args
    .output
    .iter()
    .map(|url| OutputWrapper::from_url_with_style(url, style.clone()))
    .collect::<Result<Vec<_>, _>>()?;

  let focus = args.focus.map(|n| (n - 1) as usize);
  let session = OneShotTask::new(intake)
    .with_focus(focus)
    .run_task(args.input, model, outputs)
    .await?;

  if let Some(message) = session.status().message() {
    println!("{}", message);
  }
  print_detections(&session);

  Ok(())
}
