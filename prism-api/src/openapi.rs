//! OpenAPI Specification for Prism API
//!
//! Built with utoipa from the route annotations and the schema derives on
//! request, response and error types. Served at `/openapi.json`.

use utoipa::OpenApi;

use crate::admission::AdmissionSnapshot;
use crate::error::{ApiError, ErrorCode};
use crate::jobs::RetentionSnapshot;
use crate::routes::artifacts::{self, DeleteArtifactResponse};
use crate::routes::generate;
use crate::routes::health::{self, BannerResponse, EndpointInfo, HealthResponse, HealthStatus};
use crate::routes::status::{self, CacheStatus, ModelInfo, StatusResponse};
use crate::types::{GenerationPayload, ImagePayload, IntentAnalysisBody, VideoPayload};

use prism_core::{ErrorKind, GenerationRequest, MediaKind, TargetKind};

/// OpenAPI document for Prism API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Prism API",
        version = "0.3.0",
        description = "Prompt-to-image and prompt-to-video generation with intent detection, prompt enhancement and local artifact storage",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:9528", description = "Local Development")
    ),
    tags(
        (name = "Generation", description = "Prompt to image or video"),
        (name = "Artifacts", description = "Stored artifact management"),
        (name = "System", description = "Health, status and service banner"),
        (name = "Observability", description = "Prometheus metrics"),
    ),
    paths(
        generate::generate,
        generate::generate_image,
        generate::generate_video,
        generate::generate_image_text,
        generate::generate_video_text,
        artifacts::delete_artifact,
        health::health,
        health::banner,
        status::status,
        crate::telemetry::metrics::metrics_handler,
    ),
    components(
        schemas(
            // === Error Types ===
            ApiError, ErrorCode, ErrorKind,

            // === Generation Types ===
            GenerationRequest, TargetKind, MediaKind,
            GenerationPayload, ImagePayload, VideoPayload, IntentAnalysisBody,

            // === Artifact Types ===
            DeleteArtifactResponse,

            // === System Types ===
            HealthResponse, HealthStatus, BannerResponse, EndpointInfo,
            StatusResponse, CacheStatus, ModelInfo, AdmissionSnapshot, RetentionSnapshot,
        )
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() {
        let openapi = ApiDoc::openapi();
        assert_eq!(openapi.info.title, "Prism API");

        let paths = &openapi.paths.paths;
        for path in [
            "/generate",
            "/generate-image",
            "/generate-video-text",
            "/artifacts/{kind}/{filename}",
            "/health",
            "/status",
        ] {
            assert!(paths.contains_key(path), "missing path {}", path);
        }
    }

    #[test]
    fn test_openapi_json_serialization() -> Result<(), String> {
        let json = ApiDoc::to_json().map_err(|e| format!("Failed to serialize OpenAPI: {}", e))?;
        serde_json::from_str::<serde_json::Value>(&json)
            .map_err(|e| format!("Generated JSON invalid: {}", e))?;
        assert!(json.contains("GenerationRequest"));
        assert!(json.contains("VALIDATION_FAILED"));
        assert!(json.contains("TIMEOUT_ERROR"));
        Ok(())
    }
}
