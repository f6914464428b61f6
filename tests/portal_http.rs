/// Integration tests for the portal HTTP surface: the edge device and the
/// gate actuator both speak this exact contract.
use portal_service::api;
use portal_service::config::{PipelineConfig, DEFAULT_ALLOW_LIST};
use portal_service::matcher::AllowList;
use portal_service::pipeline::FramePipeline;
use portal_service::recognize::ScriptedRecognizer;
use portal_service::state::PortalState;
use portal_service::storage::UploadStore;
use std::io::Cursor;
use std::sync::Arc;

/// Build a test server with a scripted recognizer and the default allow-list.
fn setup_test_server(tokens: &[&str], upload_dir: &std::path::Path) -> axum_test::TestServer {
    let recognizer = ScriptedRecognizer::new(tokens.iter().map(|s| s.to_string()).collect());
    let pipeline = FramePipeline::new(Box::new(recognizer), PipelineConfig::frame_defaults())
        .expect("frame pipeline");
    let state = PortalState::new(
        Arc::new(pipeline),
        AllowList::new(DEFAULT_ALLOW_LIST.iter().map(|s| s.to_string())),
        UploadStore::new(upload_dir).expect("upload store"),
        0.0,
        "Прием. Холл сработал!".to_string(),
    );
    axum_test::TestServer::new(api::router(state)).expect("test server")
}

fn test_jpeg() -> Vec<u8> {
    let img = image::RgbImage::from_fn(64, 32, |x, y| image::Rgb([(x * 4) as u8, (y * 8) as u8, 96]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
        .expect("encode test jpeg");
    bytes
}

#[tokio::test]
async fn test_ping() {
    let dir = tempfile::tempdir().unwrap();
    let server = setup_test_server(&[], dir.path());

    let response = server.get("/ping").await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["message"], "pong");
}

#[tokio::test]
async fn test_check_empty_body_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let server = setup_test_server(&[], dir.path());

    let response = server.post("/check").await;
    assert_eq!(response.status_code(), 400);
    let body: serde_json::Value = response.json();
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "empty body");
}

#[tokio::test]
async fn test_check_text_notification_is_advisory() {
    let dir = tempfile::tempdir().unwrap();
    let server = setup_test_server(&["M222MM136"], dir.path());

    let response = server
        .post("/check")
        .content_type("text/plain")
        .bytes("Прием. Холл сработал!".as_bytes().to_vec().into())
        .await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["type"], "text");

    // Notification must not trip the latch
    let poll = server.get("/check/result").await;
    assert_eq!(poll.text(), "false");
}

#[tokio::test]
async fn test_check_unknown_content_type_saves_raw() {
    let dir = tempfile::tempdir().unwrap();
    let server = setup_test_server(&[], dir.path());

    let response = server
        .post("/check")
        .content_type("application/octet-stream")
        .bytes(vec![1u8, 2, 3, 4].into())
        .await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["type"], "unknown");

    let file = body["file"].as_str().unwrap();
    assert!(file.ends_with("_raw.bin"));
    assert!(dir.path().join(file).exists());
}

#[tokio::test]
async fn test_check_photo_persists_upload() {
    let dir = tempfile::tempdir().unwrap();
    let server = setup_test_server(&[], dir.path());

    let jpeg = test_jpeg();
    let response = server
        .post("/check")
        .content_type("image/jpeg")
        .bytes(jpeg.clone().into())
        .await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();

    let file = body["file"].as_str().unwrap();
    assert!(file.ends_with("_photo.jpg"));
    let saved = std::fs::read(dir.path().join(file)).expect("saved upload");
    assert_eq!(saved, jpeg);
}

#[tokio::test]
async fn test_check_unreadable_photo_is_denial_not_error() {
    let dir = tempfile::tempdir().unwrap();
    let server = setup_test_server(&["M222MM136"], dir.path());

    // Garbage bytes labeled as jpeg: zero candidates, still a 200
    let response = server
        .post("/check")
        .content_type("image/jpeg")
        .bytes(b"not actually a jpeg".to_vec().into())
        .await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["ok"], false);
    assert_eq!(body["number"], "");
    assert_eq!(body["candidates"].as_array().unwrap().len(), 0);

    let poll = server.get("/check/result").await;
    assert_eq!(poll.text(), "false");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let server = setup_test_server(&[], dir.path());

    let _ = server.get("/check/result").await;
    let response = server.get("/metrics").await;
    assert_eq!(response.status_code(), 200);
    assert!(response.text().contains("portal_latch_polls_total"));
}
