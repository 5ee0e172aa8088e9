//! End-to-end generation scenarios over mock providers and a local artifact server.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use prism_api::ApiError;
use prism_core::intent::NO_KEYWORD_RATIONALE;
use prism_core::{new_request_id, MediaKind, Phase};
use prism_test_utils::assertions::{
    assert_download_error, assert_provider_error, assert_timeout, assert_validation_error,
};
use prism_test_utils::fixtures::{self, IMAGE_PROMPT, NO_KEYWORD_PROMPT, VIDEO_PROMPT};
use prism_test_utils::http::{payload_for, ArtifactServer};
use prism_test_utils::{MockEnhancementProvider, MockEvent, MockGenerationProvider, Script};

#[path = "support/service.rs"]
mod service;

use service::{build_service, PUBLIC_BASE_URL};

#[tokio::test]
async fn test_prompt_without_keyword_becomes_image() {
    let server = ArtifactServer::start().await.unwrap();
    let enhancer = MockEnhancementProvider::new();
    let expected_prompt = enhancer.expected(NO_KEYWORD_PROMPT);
    let t = build_service(
        MockGenerationProvider::succeeding(server.file_url("cat.png")),
        enhancer,
        |_| {},
    )
    .await;

    let outcome = t
        .service
        .generate(new_request_id(), fixtures::auto_request(NO_KEYWORD_PROMPT))
        .await
        .unwrap();

    assert_eq!(outcome.kind, MediaKind::Image);
    let intent = outcome.intent.expect("auto requests carry an intent analysis");
    assert!(intent.confidence < 1.0);
    assert_eq!(intent.rationale, NO_KEYWORD_RATIONALE);

    assert!(outcome.prompt_enhanced);
    assert_eq!(outcome.enhanced_prompt.as_deref(), Some(expected_prompt.as_str()));
    assert_eq!(outcome.original_prompt, NO_KEYWORD_PROMPT);

    let specs = t.generator.submitted_specs();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].prompt, expected_prompt);
    // the provider does not extend a prompt we already rewrote
    assert!(!specs[0].prompt_extend);

    assert!(outcome
        .local_url
        .starts_with(&format!("{}/temp_images/generated_", PUBLIC_BASE_URL)));
    let bytes = std::fs::read(&outcome.artifact.path).unwrap();
    assert_eq!(bytes, payload_for("cat.png"));
    assert_eq!(outcome.artifact.size_bytes, bytes.len() as u64);
}

#[tokio::test]
async fn test_video_keyword_routes_to_video() {
    let server = ArtifactServer::start().await.unwrap();
    let t = build_service(
        MockGenerationProvider::succeeding(server.file_url("sunset.mp4")),
        MockEnhancementProvider::new(),
        |c| c.video_audio = true,
    )
    .await;

    let outcome = t
        .service
        .generate(new_request_id(), fixtures::auto_request(VIDEO_PROMPT))
        .await
        .unwrap();

    assert_eq!(outcome.kind, MediaKind::Video);
    let intent = outcome.intent.unwrap();
    assert_eq!(intent.confidence, 1.0);
    assert_eq!(outcome.duration, Some(10));
    assert!(outcome.has_audio);
    assert_eq!(outcome.remote_url, server.file_url("sunset.mp4"));
    assert!(outcome.local_url.contains("/temp_videos/"));

    let spec = &t.generator.submitted_specs()[0];
    assert_eq!(spec.kind, MediaKind::Video);
    assert_eq!(spec.audio, Some(true));
    assert_eq!(spec.duration, Some(10));
}

#[tokio::test]
async fn test_configured_intent_confidences() {
    let server = ArtifactServer::start().await.unwrap();
    let t = build_service(
        MockGenerationProvider::succeeding(server.file_url("tuned.png")),
        MockEnhancementProvider::new(),
        |c| {
            c.intent_image_confidence = 0.7;
            c.intent_fallback_confidence = 0.6;
        },
    )
    .await;

    let fallback = t
        .service
        .generate(new_request_id(), fixtures::unenhanced(fixtures::auto_request(NO_KEYWORD_PROMPT)))
        .await
        .unwrap();
    let intent = fallback.intent.unwrap();
    assert_eq!(intent.kind, MediaKind::Image);
    assert_eq!(intent.confidence, 0.6);

    let keyword = t
        .service
        .generate(new_request_id(), fixtures::unenhanced(fixtures::auto_request(IMAGE_PROMPT)))
        .await
        .unwrap();
    let intent = keyword.intent.unwrap();
    assert_eq!(intent.kind, MediaKind::Image);
    assert_eq!(intent.confidence, 0.7);
}

#[tokio::test]
async fn test_forced_target_skips_classification() {
    let server = ArtifactServer::start().await.unwrap();
    let t = build_service(
        MockGenerationProvider::succeeding(server.file_url("forced.png")),
        MockEnhancementProvider::new(),
        |_| {},
    )
    .await;

    let outcome = t
        .service
        .generate(new_request_id(), fixtures::image_request(VIDEO_PROMPT))
        .await
        .unwrap();

    assert_eq!(outcome.kind, MediaKind::Image);
    assert!(outcome.intent.is_none());
}

#[tokio::test]
async fn test_short_prompt_makes_no_remote_calls() {
    let server = ArtifactServer::start().await.unwrap();
    let t = build_service(
        MockGenerationProvider::succeeding(server.file_url("never.png")),
        MockEnhancementProvider::new(),
        |_| {},
    )
    .await;

    let result = t
        .service
        .generate(new_request_id(), fixtures::auto_request("hi"))
        .await;

    assert_validation_error(&result);
    assert_eq!(t.generator.submissions(), 0);
    assert_eq!(t.enhancer.calls(), 0);
    assert_eq!(server.hits(), 0);
}

#[tokio::test]
async fn test_enhancement_failure_uses_original_prompt() {
    let server = ArtifactServer::start().await.unwrap();
    let t = build_service(
        MockGenerationProvider::succeeding(server.file_url("plain.png")),
        MockEnhancementProvider::failing(),
        |_| {},
    )
    .await;

    let outcome = t
        .service
        .generate(new_request_id(), fixtures::auto_request(NO_KEYWORD_PROMPT))
        .await
        .unwrap();

    assert!(!outcome.prompt_enhanced);
    assert_eq!(outcome.enhanced_prompt, None);
    assert_eq!(t.generator.submitted_specs()[0].prompt, NO_KEYWORD_PROMPT);
}

#[tokio::test]
async fn test_generation_slots_serialize_jobs() {
    let server = ArtifactServer::start().await.unwrap();
    let t = build_service(
        MockGenerationProvider::new(Script::SucceedAfter {
            polls: 3,
            url: server.file_url("queued.png"),
            actual_prompt: None,
        }),
        MockEnhancementProvider::new(),
        |c| c.max_concurrent_generations = 1,
    )
    .await;

    let first = t
        .service
        .generate(new_request_id(), fixtures::unenhanced(fixtures::image_request(NO_KEYWORD_PROMPT)));
    let second = t
        .service
        .generate(new_request_id(), fixtures::unenhanced(fixtures::image_request(NO_KEYWORD_PROMPT)));
    let (first, second) = tokio::join!(first, second);
    first.unwrap();
    second.unwrap();

    assert_eq!(t.generator.peak_in_flight(), 1);
    let order: Vec<&str> = t
        .generator
        .events()
        .iter()
        .map(|e| match e {
            MockEvent::Submitted { .. } => "submitted",
            MockEvent::Terminal { .. } => "terminal",
            MockEvent::Canceled { .. } => "canceled",
        })
        .collect();
    assert_eq!(order, ["submitted", "terminal", "submitted", "terminal"]);
    assert_eq!(t.service.admission().snapshot().generation_in_flight, 0);
}

#[tokio::test]
async fn test_unfinished_job_times_out_with_504() {
    let t = build_service(
        MockGenerationProvider::new(Script::NeverFinish),
        MockEnhancementProvider::new(),
        |c| c.image_generation_timeout = Duration::from_millis(200),
    )
    .await;

    let result = t
        .service
        .generate(new_request_id(), fixtures::image_request(NO_KEYWORD_PROMPT))
        .await;

    assert_timeout(&result, Phase::Generation);
    let error = ApiError::from(result.unwrap_err());
    assert_eq!(error.status_code(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(
        error.details.as_ref().and_then(|d| d["task_id"].as_str()),
        Some("mock-task-1")
    );
    assert_eq!(t.service.admission().snapshot().generation_in_flight, 0);
}

#[tokio::test]
async fn test_provider_failure_maps_to_502() {
    let t = build_service(
        MockGenerationProvider::new(Script::FailAfter {
            polls: 2,
            code: "DataInspectionFailed".to_string(),
            message: "input rejected".to_string(),
        }),
        MockEnhancementProvider::new(),
        |_| {},
    )
    .await;

    let result = t
        .service
        .generate(new_request_id(), fixtures::image_request(NO_KEYWORD_PROMPT))
        .await;

    assert_provider_error(&result);
    let error = ApiError::from(result.unwrap_err());
    assert_eq!(error.status_code(), StatusCode::BAD_GATEWAY);
    assert!(error.message.contains("input rejected"));
}

#[tokio::test]
async fn test_failed_download_leaves_no_file() {
    let server = Arc::new(ArtifactServer::start().await.unwrap());
    let t = build_service(
        MockGenerationProvider::succeeding(server.url("broken")),
        MockEnhancementProvider::new(),
        |_| {},
    )
    .await;

    let result = t
        .service
        .generate(new_request_id(), fixtures::image_request(NO_KEYWORD_PROMPT))
        .await;

    assert_download_error(&result);
    let error = ApiError::from(result.unwrap_err());
    assert_eq!(error.status_code(), StatusCode::BAD_GATEWAY);
    // the remote result is still reported so the caller can fetch it directly
    assert_eq!(
        error.details.as_ref().and_then(|d| d["remote_url"].as_str()),
        Some(server.url("broken").as_str())
    );
    assert!(t.stored_files(MediaKind::Image).is_empty());
    assert_eq!(t.service.admission().snapshot().download_in_flight, 0);
}
