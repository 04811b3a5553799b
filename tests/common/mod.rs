#![allow(dead_code)]

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use kanjian::{
  asset::{LocalFile, MimeType, UploadPayload},
  detection::{BoundingBox, DetectionRecord, DetectionSet},
  model::{Model, PipelineError},
};
use tokio::{
  io::{AsyncReadExt, AsyncWriteExt},
  net::TcpListener,
  task::JoinHandle,
};
use url::Url;

pub fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
  let mut buf = Cursor::new(Vec::new());
  DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([90, 120, 150])))
    .write_to(&mut buf, format)
    .unwrap();
  buf.into_inner()
}

pub fn jpeg_file(width: u32, height: u32) -> LocalFile {
  LocalFile::new("photo.jpg", MimeType::Jpeg, encode(width, height, ImageFormat::Jpeg))
}

pub fn record(label: &str, confidence: &str, bbox: BoundingBox) -> DetectionRecord {
  DetectionRecord {
    label: label.to_string(),
    confidence: confidence.to_string(),
    bounding_box: bbox,
  }
}

pub fn cat_set() -> DetectionSet {
  DetectionSet::new(vec![record("cat", "0.95", BoundingBox::new(10, 10, 50, 50))])
}

/// 返回固定结果的模型
pub struct FakeModel {
  pub result: Result<DetectionSet, (u16, String)>,
}

impl FakeModel {
  pub fn ok(set: DetectionSet) -> Self {
    Self { result: Ok(set) }
  }

  pub fn failing(status: u16, body: &str) -> Self {
    Self {
      result: Err((status, body.to_string())),
    }
  }
}

impl Model for FakeModel {
  type Input = UploadPayload;
  type Output = DetectionSet;
  type Error = PipelineError;

  async fn infer(&self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
    match &self.result {
      Ok(set) => Ok(set.clone()),
      Err((status, body)) => Err(PipelineError::UploadFailed {
        status: *status,
        body: body.clone(),
      }),
    }
  }
}

pub struct CapturedRequest {
  pub head: String,
  pub body: Vec<u8>,
}

impl CapturedRequest {
  pub fn header(&self, name: &str) -> Option<String> {
    let name = name.to_ascii_lowercase();
    self.head.lines().skip(1).find_map(|line| {
      let (key, value) = line.split_once(':')?;
      (key.trim().to_ascii_lowercase() == name).then(|| value.trim().to_string())
    })
  }

  pub fn body_text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
  haystack.windows(needle.len()).position(|w| w == needle)
}

/// 只服务一次请求的 HTTP 服务器
pub async fn serve_once(
  status: u16,
  content_type: &str,
  body: Vec<u8>,
) -> (Url, JoinHandle<CapturedRequest>) {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  let content_type = content_type.to_string();

  let handle = tokio::spawn(async move {
    let (mut stream, _) = listener.accept().await.unwrap();
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
      if let Some(pos) = find(&buf, b"\r\n\r\n") {
        break pos + 4;
      }
      let n = stream.read(&mut chunk).await.unwrap();
      assert!(n > 0, "connection closed before headers");
      buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut request = CapturedRequest {
      head,
      body: Vec::new(),
    };
    let chunked = request
      .header("transfer-encoding")
      .is_some_and(|v| v.eq_ignore_ascii_case("chunked"));
    let length: usize = request
      .header("content-length")
      .and_then(|v| v.parse().ok())
      .unwrap_or(0);

    loop {
      let body = &buf[head_end..];
      let complete = if chunked {
        find(body, b"0\r\n\r\n").is_some()
      } else {
        body.len() >= length
      };
      if complete {
        break;
      }
      let n = stream.read(&mut chunk).await.unwrap();
      if n == 0 {
        break;
      }
      buf.extend_from_slice(&chunk[..n]);
    }
    request.body = buf[head_end..].to_vec();

    let head = format!(
      "HTTP/1.1 {} Mock\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
      status,
      content_type,
      body.len()
    );
    stream.write_all(head.as_bytes()).await.unwrap();
    stream.write_all(&body).await.unwrap();
    stream.shutdown().await.unwrap();
    request
  });

  let url = Url::parse(&format!("http://{}/v1/objectdetection", addr)).unwrap();
  (url, handle)
}

/// 不经过系统代理的客户端
pub fn http() -> reqwest::Client {
  reqwest::Client::builder().no_proxy().build().unwrap()
}
