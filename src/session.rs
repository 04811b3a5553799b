// 该文件是 Kanjian （看见） 项目的一部分。
// src/session.rs - 会话状态
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

//! 单张图像的分析会话。
//!
//! 所有状态变化都通过具名的转换函数完成。网络请求拆成 `begin_*` 与
//! `complete_*` 两步，请求携带发起时的 [`Ticket`]，会话在此期间被重新选择
//! 图像时，旧请求的结果会被丢弃。

use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  asset::{ImageAsset, LocalFile, UploadPayload},
  detection::DetectionSet,
  intake::{Intake, IntakeError},
  model::{Model, PipelineError},
};

pub const SUCCESS_MESSAGE: &str = "Image analysed successfully";
pub const FAILURE_PREFIX: &str = "Upload failed: ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
  Idle,
  Loading,
  Failed(String),
  Succeeded(String),
}

impl Status {
  pub fn message(&self) -> Option<&str> {
    match self {
      Status::Failed(m) | Status::Succeeded(m) => Some(m),
      Status::Idle | Status::Loading => None,
    }
  }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
  #[error("no image is ready to submit")]
  NoSelection,
  #[error("a request is already in flight")]
  Busy,
  #[error("no detections to focus")]
  NoDetections,
  #[error("detection {index} is out of range ({len} detections)")]
  FocusOutOfRange { index: usize, len: usize },
}

/// 请求发起时的会话代数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
  generation: u64,
}

/// 当前应展示的内容
#[derive(Debug)]
pub enum View<'a> {
  Empty,
  Preview(&'a ImageAsset),
  Overlay {
    asset: &'a ImageAsset,
    detections: &'a DetectionSet,
    focus: Option<usize>,
  },
}

#[derive(Debug)]
pub struct Session {
  generation: u64,
  asset: Option<ImageAsset>,
  submittable: bool,
  detections: Option<DetectionSet>,
  focus: Option<usize>,
  error: Option<String>,
  status: Status,
  in_flight: Option<Ticket>,
  show_overlay: bool,
  url_mode: bool,
}

impl Default for Session {
  fn default() -> Self {
    Self::new()
  }
}

impl Session {
  pub fn new() -> Self {
    Self {
      generation: 0,
      asset: None,
      submittable: false,
      detections: None,
      focus: None,
      error: None,
      status: Status::Idle,
      in_flight: None,
      show_overlay: false,
      url_mode: false,
    }
  }

  pub fn asset(&self) -> Option<&ImageAsset> {
    self.asset.as_ref()
  }

  pub fn detections(&self) -> Option<&DetectionSet> {
    self.detections.as_ref()
  }

  pub fn focus_index(&self) -> Option<usize> {
    self.focus
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn status(&self) -> &Status {
    &self.status
  }

  pub fn is_loading(&self) -> bool {
    self.in_flight.is_some()
  }

  pub fn url_mode(&self) -> bool {
    self.url_mode
  }

  /// 提交按钮是否可用
  pub fn can_submit(&self) -> bool {
    self.asset.is_some() && self.submittable && !self.url_mode && self.in_flight.is_none()
  }

  pub fn view(&self) -> View<'_> {
    match (&self.asset, &self.detections) {
      (Some(asset), Some(detections)) if self.show_overlay => View::Overlay {
        asset,
        detections,
        focus: self.focus,
      },
      (Some(asset), _) => View::Preview(asset),
      (None, _) => View::Empty,
    }
  }

  /// 放弃当前图像与结果，旧句柄随之释放
  fn invalidate(&mut self) {
    self.generation += 1;
    self.asset = None;
    self.submittable = false;
    self.detections = None;
    self.focus = None;
    self.error = None;
    self.status = Status::Idle;
    self.in_flight = None;
    self.show_overlay = false;
  }

  /// 状态栏总是 `Upload failed: {原因}`，`error` 由调用方决定
  fn fail(&mut self, error: String, cause: &dyn std::fmt::Display) {
    let message = format!("{}{}", FAILURE_PREFIX, cause);
    warn!("{}", message);
    self.in_flight = None;
    self.submittable = false;
    self.error = Some(error);
    self.status = Status::Failed(message);
  }

  fn is_current(&self, ticket: Ticket) -> bool {
    ticket.generation == self.generation && self.in_flight == Some(ticket)
  }

  pub fn reset(&mut self) {
    self.invalidate();
    self.url_mode = false;
  }

  /// 选择本地文件，校验失败时不保留任何选择
  pub fn select_file(&mut self, intake: &Intake, file: LocalFile) -> Result<(), IntakeError> {
    self.invalidate();
    self.url_mode = false;
    match intake.validate_local_file(file) {
      Ok(asset) => {
        self.asset = Some(asset);
        self.submittable = true;
        Ok(())
      }
      Err(e) => {
        self.error = Some(e.to_string());
        Err(e)
      }
    }
  }

  /// 切换到 URL 输入
  pub fn open_url_input(&mut self) {
    self.invalidate();
    self.url_mode = true;
  }

  pub fn begin_submit(&mut self) -> Result<(Ticket, UploadPayload), SessionError> {
    if self.in_flight.is_some() {
      return Err(SessionError::Busy);
    }
    let payload = match &self.asset {
      Some(asset) if self.submittable && !self.url_mode => asset.payload(),
      _ => return Err(SessionError::NoSelection),
    };
    let ticket = Ticket {
      generation: self.generation,
    };
    self.in_flight = Some(ticket);
    self.detections = None;
    self.focus = None;
    self.show_overlay = false;
    self.error = None;
    self.status = Status::Loading;
    info!("开始分析: {}", payload.file_name);
    Ok((ticket, payload))
  }

  /// 写入检测结果，过期的结果返回 `false`
  pub fn complete_submit(
    &mut self,
    ticket: Ticket,
    result: Result<DetectionSet, PipelineError>,
  ) -> bool {
    if !self.is_current(ticket) {
      debug!("丢弃过期的检测结果 (代数 {})", ticket.generation);
      return false;
    }
    match result {
      Ok(set) => {
        info!("分析完成，共 {} 个对象", set.len());
        self.in_flight = None;
        self.submittable = false;
        self.detections = Some(set);
        self.show_overlay = true;
        self.status = Status::Succeeded(SUCCESS_MESSAGE.to_string());
      }
      // 服务端拒绝时错误文本与状态相同，其余只保留原因
      Err(e @ PipelineError::UploadFailed { .. }) => {
        self.fail(format!("{}{}", FAILURE_PREFIX, e), &e)
      }
      Err(e) => self.fail(e.to_string(), &e),
    }
    true
  }

  pub fn begin_url(&mut self) -> Result<Ticket, SessionError> {
    if self.in_flight.is_some() {
      return Err(SessionError::Busy);
    }
    self.invalidate();
    self.url_mode = true;
    let ticket = Ticket {
      generation: self.generation,
    };
    self.in_flight = Some(ticket);
    self.status = Status::Loading;
    Ok(ticket)
  }

  /// 写入下载的图像，返回接下来要提交的内容
  pub fn attach_remote(
    &mut self,
    ticket: Ticket,
    result: Result<ImageAsset, IntakeError>,
  ) -> Option<UploadPayload> {
    if !self.is_current(ticket) {
      debug!("丢弃过期的下载结果 (代数 {})", ticket.generation);
      return None;
    }
    match result {
      Ok(asset) => {
        let payload = asset.payload();
        self.asset = Some(asset);
        Some(payload)
      }
      Err(e) => {
        self.fail(e.to_string(), &e);
        None
      }
    }
  }

  pub fn focus(&mut self, index: usize) -> Result<(), SessionError> {
    let len = self
      .detections
      .as_ref()
      .map(DetectionSet::len)
      .ok_or(SessionError::NoDetections)?;
    if index >= len {
      return Err(SessionError::FocusOutOfRange { index, len });
    }
    self.focus = Some(index);
    self.show_overlay = true;
    Ok(())
  }

  pub fn clear_focus(&mut self) {
    self.focus = None;
  }

  pub async fn submit<M>(&mut self, model: &M) -> Result<(), SessionError>
  where
    M: Model<Input = UploadPayload, Output = DetectionSet, Error = PipelineError>,
  {
    let (ticket, payload) = self.begin_submit()?;
    let result = model.infer(&payload).await;
    self.complete_submit(ticket, result);
    Ok(())
  }

  pub async fn analyze_url<M>(
    &mut self,
    intake: &Intake,
    model: &M,
    url: &Url,
  ) -> Result<(), SessionError>
  where
    M: Model<Input = UploadPayload, Output = DetectionSet, Error = PipelineError>,
  {
    let ticket = self.begin_url()?;
    let fetched = intake.fetch_remote_image(url).await;
    let Some(payload) = self.attach_remote(ticket, fetched) else {
      return Ok(());
    };
    let result = model.infer(&payload).await;
    self.complete_submit(ticket, result);
    Ok(())
  }
}
