// 该文件是 Kanjian （看见） 项目的一部分。
// src/model.rs - 检测模型
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

use std::future::Future;

use reqwest::multipart::{Form, Part};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{asset::UploadPayload, config::DetectorConfig, detection::DetectionSet};

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input)
  -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

/// 上传表单中图像字段的名称
pub const IMAGE_FIELD: &str = "image";
pub const API_KEY_HEADER: &str = "X-Api-Key";

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("{status} - {body}")]
  UploadFailed { status: u16, body: String },
  #[error("{0}")]
  Transport(#[from] reqwest::Error),
  #[error("invalid response: {0}")]
  InvalidResponse(#[from] serde_json::Error),
}

/// 通过 HTTP 调用的检测服务
#[derive(Debug, Clone)]
pub struct DetectionClient {
  config: DetectorConfig,
  http: reqwest::Client,
}

impl DetectionClient {
  pub fn new(config: DetectorConfig) -> Self {
    Self::with_client(config, reqwest::Client::new())
  }

  pub fn with_client(config: DetectorConfig, http: reqwest::Client) -> Self {
    Self { config, http }
  }

  pub fn config(&self) -> &DetectorConfig {
    &self.config
  }

  pub async fn detect(&self, payload: &UploadPayload) -> Result<DetectionSet, PipelineError> {
    let part = || Part::bytes(payload.bytes.to_vec()).file_name(payload.file_name.clone());
    let part = match part().mime_str(payload.mime_type.as_str()) {
      Ok(part) => part,
      // 服务器给出的类型不合法时退回无类型
      Err(_) => part(),
    };
    let form = Form::new().part(IMAGE_FIELD, part);

    info!(
      "提交图像到检测服务: {} ({} 字节)",
      self.config.endpoint,
      payload.bytes.len()
    );
    let now = std::time::Instant::now();
    let response = self
      .http
      .post(self.config.endpoint.clone())
      .header(API_KEY_HEADER, &self.config.api_key)
      .multipart(form)
      .send()
      .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
      warn!("检测服务返回错误: {} - {}", status, body);
      return Err(PipelineError::UploadFailed {
        status: status.as_u16(),
        body,
      });
    }

    debug!("检测服务响应: {}", body);
    let set = DetectionSet::from_json(&body)?;
    info!(
      "检测完成，耗时: {:.2?}，共 {} 个对象",
      now.elapsed(),
      set.len()
    );
    Ok(set)
  }
}

impl Model for DetectionClient {
  type Input = UploadPayload;
  type Output = DetectionSet;
  type Error = PipelineError;

  async fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.detect(input).await
  }
}
