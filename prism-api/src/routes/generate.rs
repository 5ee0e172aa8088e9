//! Generation Endpoints
//!
//! - `POST /generate`: classify the prompt, then generate (JSON)
//! - `POST /generate-image`, `POST /generate-video`: forced kind (JSON)
//! - `POST /generate-image-text`, `POST /generate-video-text`: forced kind,
//!   plain-text body for chat clients

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use prism_core::{new_request_id, GenerationRequest, TargetKind};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::services::GenerationService;
use crate::state::AppState;
use crate::types::GenerationPayload;
#[cfg(feature = "openapi")]
use crate::types::{ImagePayload, VideoPayload};

type Body = Result<Json<GenerationRequest>, JsonRejection>;

/// Run a request and convert the outcome. Errors carry the request id.
async fn run(
    service: &GenerationService,
    body: Body,
    target: Option<TargetKind>,
) -> ApiResult<GenerationPayload> {
    let Json(mut request) =
        body.map_err(|rejection| ApiError::invalid_input(rejection.body_text()))?;
    if let Some(target) = target {
        request.target = target;
    }

    let request_id = new_request_id();
    service
        .generate(request_id, request)
        .await
        .map(GenerationPayload::from)
        .map_err(|e| ApiError::from(e).with_request_id(request_id))
}

async fn run_text(service: &GenerationService, body: Body, target: TargetKind) -> Response {
    match run(service, body, Some(target)).await {
        Ok(payload) => payload.plain_text().to_string().into_response(),
        Err(e) => e.into_plain_text(),
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// Generate an image or a video, chosen from the prompt.
///
/// The body's `target` defaults to `auto`; an explicit `image` or `video`
/// skips classification.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/generate",
    tag = "Generation",
    request_body = GenerationRequest,
    responses(
        (status = 200, description = "Generated media", body = GenerationPayload),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 502, description = "Provider or download failure", body = ApiError),
        (status = 504, description = "Generation timed out", body = ApiError),
    ),
))]
pub async fn generate(
    State(service): State<Arc<GenerationService>>,
    body: Body,
) -> ApiResult<Json<GenerationPayload>> {
    run(&service, body, None).await.map(Json)
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/generate-image",
    tag = "Generation",
    request_body = GenerationRequest,
    responses(
        (status = 200, description = "Generated image", body = ImagePayload),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 502, description = "Provider or download failure", body = ApiError),
        (status = 504, description = "Generation timed out", body = ApiError),
    ),
))]
pub async fn generate_image(
    State(service): State<Arc<GenerationService>>,
    body: Body,
) -> ApiResult<Json<GenerationPayload>> {
    run(&service, body, Some(TargetKind::Image)).await.map(Json)
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/generate-video",
    tag = "Generation",
    request_body = GenerationRequest,
    responses(
        (status = 200, description = "Generated video", body = VideoPayload),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 502, description = "Provider or download failure", body = ApiError),
        (status = 504, description = "Generation timed out", body = ApiError),
    ),
))]
pub async fn generate_video(
    State(service): State<Arc<GenerationService>>,
    body: Body,
) -> ApiResult<Json<GenerationPayload>> {
    run(&service, body, Some(TargetKind::Video)).await.map(Json)
}

/// Markdown image embed as plain text.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/generate-image-text",
    tag = "Generation",
    request_body = GenerationRequest,
    responses(
        (status = 200, description = "`![](<url>)`", body = String, content_type = "text/plain"),
        (status = 400, description = "`Error: <message>`", body = String, content_type = "text/plain"),
    ),
))]
pub async fn generate_image_text(
    State(service): State<Arc<GenerationService>>,
    body: Body,
) -> Response {
    run_text(&service, body, TargetKind::Image).await
}

/// Download instructions with the provider URL as plain text.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/generate-video-text",
    tag = "Generation",
    request_body = GenerationRequest,
    responses(
        (status = 200, description = "Download instructions", body = String, content_type = "text/plain"),
        (status = 400, description = "`Error: <message>`", body = String, content_type = "text/plain"),
    ),
))]
pub async fn generate_video_text(
    State(service): State<Arc<GenerationService>>,
    body: Body,
) -> Response {
    run_text(&service, body, TargetKind::Video).await
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate))
        .route("/generate-image", post(generate_image))
        .route("/generate-video", post(generate_video))
        .route("/generate-image-text", post(generate_image_text))
        .route("/generate-video-text", post(generate_video_text))
}
