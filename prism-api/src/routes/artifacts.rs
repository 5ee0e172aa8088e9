//! Operator deletion of stored artifacts.
//!
//! Artifacts are served read-only from `/temp_images` and `/temp_videos`;
//! this is the explicit removal path next to the retention sweeper.

use axum::{
    extract::{Path, State},
    routing::delete,
    Json, Router,
};
use prism_core::{is_artifact_filename, MediaKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::store::ArtifactStore;
use crate::telemetry::METRICS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeleteArtifactResponse {
    pub success: bool,
    pub kind: MediaKind,
    pub filename: String,
}

/// DELETE /artifacts/{kind}/{filename}
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/artifacts/{kind}/{filename}",
    tag = "Artifacts",
    params(
        ("kind" = String, Path, description = "`image` or `video`"),
        ("filename" = String, Path, description = "Stored artifact filename"),
    ),
    responses(
        (status = 200, description = "Artifact deleted", body = DeleteArtifactResponse),
        (status = 400, description = "Unknown kind or invalid filename", body = ApiError),
        (status = 404, description = "Artifact not found", body = ApiError),
    ),
))]
pub async fn delete_artifact(
    State(store): State<Arc<ArtifactStore>>,
    Path((kind, filename)): Path<(String, String)>,
) -> ApiResult<Json<DeleteArtifactResponse>> {
    let kind: MediaKind = kind.parse().map_err(ApiError::invalid_input)?;
    if !is_artifact_filename(kind, &filename) {
        return Err(ApiError::invalid_input(format!(
            "'{}' is not a {} artifact name",
            filename, kind
        )));
    }

    if !store.delete(kind, &filename).await? {
        return Err(ApiError::artifact_not_found(&filename));
    }
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_artifacts_removed("operator", 1);
    }

    Ok(Json(DeleteArtifactResponse {
        success: true,
        kind,
        filename,
    }))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/artifacts/:kind/:filename", delete(delete_artifact))
}
