//! Router-level tests: request parsing, response shapes and error bodies.

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use prism_api::constants::VIDEO_DOWNLOAD_INSTRUCTIONS;
use prism_api::create_router;
use prism_core::MediaKind;
use prism_test_utils::fixtures::{NO_KEYWORD_PROMPT, VIDEO_PROMPT};
use prism_test_utils::http::{payload_for, ArtifactServer};
use prism_test_utils::{MockEnhancementProvider, MockGenerationProvider, Script};
use serde_json::{json, Value};
use tower::ServiceExt;

#[path = "support/service.rs"]
mod service;

use service::{build_service, TestService, PUBLIC_BASE_URL};

async fn app(generator: MockGenerationProvider) -> (Router, TestService) {
    let t = build_service(generator, MockEnhancementProvider::new(), |_| {}).await;
    (create_router(t.app_state()), t)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_and_banner() {
    let (app, _t) = app(MockGenerationProvider::new(Script::NeverFinish)).await;

    let (status, body) = send_json(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send_json(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "prism");
    assert!(body["endpoints"].as_array().unwrap().len() >= 5);
}

#[tokio::test]
async fn test_short_prompt_returns_structured_400() {
    let (app, t) = app(MockGenerationProvider::new(Script::NeverFinish)).await;

    let (status, body) = send_json(&app, post_json("/generate", json!({ "prompt": "a" }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["kind"], "VALIDATION_ERROR");
    assert!(body["request_id"].is_string());
    assert_eq!(t.generator.submissions(), 0);
}

#[tokio::test]
async fn test_malformed_body_is_invalid_input() {
    let (app, _t) = app(MockGenerationProvider::new(Script::NeverFinish)).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"prompt\": 42"))
        .unwrap();
    let (status, body) = send_json(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_text_endpoint_reports_errors_as_plain_text() {
    let (app, _t) = app(MockGenerationProvider::new(Script::NeverFinish)).await;

    let (status, bytes) = send(
        &app,
        post_json("/generate-image-text", json!({ "prompt": "x" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8(bytes).unwrap().starts_with("Error: "));
}

#[tokio::test]
async fn test_generate_image_json_and_static_serving() {
    let server = ArtifactServer::start().await.unwrap();
    let (app, t) = app(MockGenerationProvider::succeeding(server.file_url("moon.png"))).await;

    let (status, body) = send_json(
        &app,
        post_json("/generate", json!({ "prompt": NO_KEYWORD_PROMPT })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["type"], "image");
    assert_eq!(body["intent_analysis"]["detected_type"], "image");
    let url = body["image_url"].as_str().unwrap().to_string();
    assert!(url.starts_with(PUBLIC_BASE_URL));
    assert_eq!(body["markdown_image"], format!("![]({})", url));

    // the stored file is reachable under the same relative path
    let relative = url.trim_start_matches(PUBLIC_BASE_URL).to_string();
    let (status, bytes) = send(&app, get(&relative)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, payload_for("moon.png"));
    assert_eq!(t.stored_files(MediaKind::Image).len(), 1);
}

#[tokio::test]
async fn test_body_target_selects_video() {
    let server = ArtifactServer::start().await.unwrap();
    let (app, _t) = app(MockGenerationProvider::succeeding(server.file_url("clip.mp4"))).await;

    let (status, body) = send_json(
        &app,
        post_json(
            "/generate",
            json!({ "prompt": NO_KEYWORD_PROMPT, "target": "video" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "video");
    assert!(body.get("intent_analysis").map_or(true, Value::is_null));
    assert_eq!(body["video_url"], server.file_url("clip.mp4"));
}

#[tokio::test]
async fn test_video_text_endpoint_returns_instructions() {
    let server = ArtifactServer::start().await.unwrap();
    let (app, _t) = app(MockGenerationProvider::succeeding(server.file_url("wave.mp4"))).await;

    let (status, bytes) = send(
        &app,
        post_json("/generate-video-text", json!({ "prompt": VIDEO_PROMPT })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with(VIDEO_DOWNLOAD_INSTRUCTIONS));
    assert!(text.ends_with(&server.file_url("wave.mp4")));
}

#[tokio::test]
async fn test_download_timeout_text_names_remote_url() {
    let server = ArtifactServer::start().await.unwrap();
    let remote = server.url("slow/3000");
    let t = build_service(
        MockGenerationProvider::succeeding(remote.clone()),
        MockEnhancementProvider::new(),
        |c| c.video_download_timeout = Duration::from_millis(200),
    )
    .await;
    let app = create_router(t.app_state());

    let (status, bytes) = send(
        &app,
        post_json("/generate-video-text", json!({ "prompt": VIDEO_PROMPT })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with("Error: "));
    assert!(text.ends_with(&format!("Remote URL: {}", remote)));
    assert!(t.stored_files(MediaKind::Video).is_empty());

    // the JSON route reports the same failure with its kind
    let (status, body) = send_json(
        &app,
        post_json("/generate-video", json!({ "prompt": VIDEO_PROMPT })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "DOWNLOAD_FAILED");
    assert_eq!(body["kind"], "TIMEOUT_ERROR");
    assert_eq!(body["details"]["remote_url"], remote.as_str());
}

#[tokio::test]
async fn test_delete_artifact() {
    let server = ArtifactServer::start().await.unwrap();
    let (app, t) = app(MockGenerationProvider::succeeding(server.file_url("gone.png"))).await;

    let (_, body) = send_json(
        &app,
        post_json("/generate-image", json!({ "prompt": NO_KEYWORD_PROMPT })),
    )
    .await;
    let filename = body["filename"].as_str().unwrap().to_string();

    let delete = |uri: String| {
        Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = send_json(&app, delete(format!("/artifacts/image/{}", filename))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(t.stored_files(MediaKind::Image).is_empty());

    let (status, body) = send_json(&app, delete(format!("/artifacts/image/{}", filename))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "ARTIFACT_NOT_FOUND");

    let (status, _) = send_json(&app, delete("/artifacts/audio/x.wav".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(&app, delete("/artifacts/image/notes.txt".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_reports_limits_and_models() {
    let (app, _t) = app(MockGenerationProvider::new(Script::NeverFinish)).await;

    let (status, body) = send_json(&app, get("/status")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["admission"]["generation_in_flight"], 0);
    assert_eq!(body["admission"]["generation_capacity"], 20);
    assert_eq!(body["enhancement_cache"]["enabled"], true);
    assert!(body["models"]["image"].is_string());
}

#[tokio::test]
async fn test_metrics_endpoint_serves_text() {
    let (app, _t) = app(MockGenerationProvider::new(Script::NeverFinish)).await;
    send(&app, get("/health")).await;

    let (status, bytes) = send(&app, get("/metrics")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(bytes).unwrap().contains("prism_"));
}
