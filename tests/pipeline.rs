mod common;

use common::{encode, http, jpeg_file, serve_once};
use image::ImageFormat;
use kanjian::{
  asset::MimeType,
  config::{DetectorConfig, IntakeLimits},
  detection::BoundingBox,
  intake::{Intake, IntakeError, REMOTE_FILE_NAME},
  model::{DetectionClient, Model, PipelineError},
  session::{Session, Status},
};

const CAT_RESPONSE: &str = r#"[{"label":"cat","confidence":"0.95","bounding_box":{"x1":"10","y1":"10","x2":"50","y2":"50"}}]"#;

#[tokio::test]
async fn detect_returns_records_verbatim() {
  let (url, server) = serve_once(200, "application/json", CAT_RESPONSE.into()).await;
  let intake = Intake::with_client(IntakeLimits::default(), http());
  let asset = intake.validate_local_file(jpeg_file(800, 600)).unwrap();
  let client = DetectionClient::with_client(DetectorConfig::new(url, "test-key"), http());

  let set = client.infer(&asset.payload()).await.unwrap();

  assert_eq!(set.len(), 1);
  let record = set.get(0).unwrap();
  assert_eq!(record.label, "cat");
  assert_eq!(record.confidence, "0.95");
  assert_eq!(record.bounding_box, BoundingBox::new(10, 10, 50, 50));

  let request = server.await.unwrap();
  assert!(request.head.starts_with("POST /v1/objectdetection"));
  assert_eq!(request.header("x-api-key").as_deref(), Some("test-key"));
  assert!(
    request
      .header("content-type")
      .unwrap()
      .starts_with("multipart/form-data")
  );
  let body = request.body_text();
  assert!(body.contains("name=\"image\""));
  assert!(body.contains("filename=\"photo.jpg\""));
  assert!(body.contains("image/jpeg"));
}

#[tokio::test]
async fn detect_reports_upload_failure() {
  let (url, server) = serve_once(500, "text/plain", b"server error".to_vec()).await;
  let intake = Intake::with_client(IntakeLimits::default(), http());
  let client = DetectionClient::with_client(DetectorConfig::new(url, "test-key"), http());

  let mut session = Session::new();
  session.select_file(&intake, jpeg_file(64, 64)).unwrap();
  session.submit(&client).await.unwrap();
  server.await.unwrap();

  assert_eq!(
    session.status(),
    &Status::Failed("Upload failed: 500 - server error".to_string())
  );
  assert_eq!(session.error(), Some("Upload failed: 500 - server error"));
  assert!(!session.is_loading());
  assert!(session.detections().is_none());
}

#[tokio::test]
async fn detect_error_keeps_status_and_body() {
  let (url, _server) = serve_once(500, "text/plain", b"server error".to_vec()).await;
  let intake = Intake::with_client(IntakeLimits::default(), http());
  let asset = intake.validate_local_file(jpeg_file(32, 32)).unwrap();
  let client = DetectionClient::with_client(DetectorConfig::new(url, "k"), http());

  let err = client.detect(&asset.payload()).await.unwrap_err();
  match err {
    PipelineError::UploadFailed { status, body } => {
      assert_eq!(status, 500);
      assert_eq!(body, "server error");
    }
    other => panic!("unexpected error: {other}"),
  }
}

#[tokio::test]
async fn malformed_response_is_reported() {
  let (url, _server) = serve_once(200, "application/json", b"{not json".to_vec()).await;
  let intake = Intake::with_client(IntakeLimits::default(), http());
  let asset = intake.validate_local_file(jpeg_file(32, 32)).unwrap();
  let client = DetectionClient::with_client(DetectorConfig::new(url, "k"), http());

  let err = client.detect(&asset.payload()).await.unwrap_err();
  assert!(matches!(err, PipelineError::InvalidResponse(_)));
}

#[tokio::test]
async fn remote_image_uses_server_content_type() {
  let (url, _server) = serve_once(200, "image/png", encode(3000, 40, ImageFormat::Png)).await;
  let intake = Intake::with_client(IntakeLimits::default(), http());

  // 远程图像默认不做尺寸校验
  let asset = intake.fetch_remote_image(&url).await.unwrap();
  assert_eq!(asset.name, REMOTE_FILE_NAME);
  assert_eq!(asset.mime_type, MimeType::Png);
  assert_eq!((asset.width, asset.height), (3000, 40));
  assert_eq!(intake.pool().live(), 1);
}

#[tokio::test]
async fn remote_image_validated_when_requested() {
  let (url, _server) = serve_once(200, "image/png", encode(3000, 40, ImageFormat::Png)).await;
  let intake = Intake::with_client(
    IntakeLimits {
      validate_remote: true,
      ..IntakeLimits::default()
    },
    http(),
  );

  let err = intake.fetch_remote_image(&url).await.unwrap_err();
  assert!(matches!(
    err,
    IntakeError::DimensionsExceeded {
      width: 3000,
      height: 40
    }
  ));
}

#[tokio::test]
async fn remote_fetch_failure_reports_status() {
  let (url, _server) = serve_once(404, "text/plain", b"missing".to_vec()).await;
  let intake = Intake::with_client(IntakeLimits::default(), http());

  let err = intake.fetch_remote_image(&url).await.unwrap_err();
  assert!(matches!(err, IntakeError::FetchFailed { status: 404 }));
  assert_eq!(err.to_string(), "Image fetch failed: 404");
}

#[tokio::test]
async fn undecodable_remote_image_is_an_error() {
  let (url, _server) = serve_once(200, "image/jpeg", b"not an image".to_vec()).await;
  let intake = Intake::with_client(IntakeLimits::default(), http());

  let err = intake.fetch_remote_image(&url).await.unwrap_err();
  assert!(matches!(err, IntakeError::Decode(_)));
  assert_eq!(intake.pool().live(), 0);
}

#[tokio::test]
async fn url_analysis_fetches_then_detects() {
  let (image_url, _image_server) =
    serve_once(200, "image/jpeg", encode(120, 80, ImageFormat::Jpeg)).await;
  let (api_url, api_server) = serve_once(200, "application/json", CAT_RESPONSE.into()).await;
  let intake = Intake::with_client(IntakeLimits::default(), http());
  let client = DetectionClient::with_client(DetectorConfig::new(api_url, "k"), http());

  let mut session = Session::new();
  session
    .analyze_url(&intake, &client, &image_url)
    .await
    .unwrap();

  assert_eq!(
    session.status(),
    &Status::Succeeded("Image analysed successfully".to_string())
  );
  assert_eq!(session.detections().map(|d| d.len()), Some(1));
  assert_eq!(session.asset().map(|a| a.width), Some(120));
  assert!(!session.can_submit());

  let request = api_server.await.unwrap();
  assert!(
    request
      .body_text()
      .contains(&format!("filename=\"{}\"", REMOTE_FILE_NAME))
  );
}

#[tokio::test]
async fn url_analysis_reports_fetch_failure() {
  let (image_url, _server) = serve_once(403, "text/plain", Vec::new()).await;
  let intake = Intake::with_client(IntakeLimits::default(), http());
  let model = common::FakeModel::ok(common::cat_set());

  let mut session = Session::new();
  session.analyze_url(&intake, &model, &image_url).await.unwrap();

  assert_eq!(
    session.status(),
    &Status::Failed("Upload failed: Image fetch failed: 403".to_string())
  );
  assert_eq!(session.error(), Some("Image fetch failed: 403"));
  assert!(session.asset().is_none());
  assert!(!session.is_loading());
}
