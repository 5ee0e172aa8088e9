//! Health Check and Service Banner
//!
//! - `GET /health`: liveness only, no side effects
//! - `GET /`: service name, version and endpoint list
//!
//! No authentication required.

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::constants::SERVICE_NAME;
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EndpointInfo {
    pub method: String,
    pub path: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BannerResponse {
    pub service: String,
    pub version: String,
    pub endpoints: Vec<EndpointInfo>,
}

const ENDPOINTS: &[(&str, &str, &str)] = &[
    ("POST", "/generate", "Generate an image or video, chosen from the prompt"),
    ("POST", "/generate-image", "Generate an image"),
    ("POST", "/generate-video", "Generate a video"),
    ("POST", "/generate-image-text", "Generate an image, markdown embed as plain text"),
    ("POST", "/generate-video-text", "Generate a video, download instructions as plain text"),
    ("DELETE", "/artifacts/{kind}/{filename}", "Delete a stored artifact"),
    ("GET", "/temp_images/{filename}", "Stored images"),
    ("GET", "/temp_videos/{filename}", "Stored videos"),
    ("GET", "/health", "Liveness check"),
    ("GET", "/status", "Admission, cache and retention state"),
    ("GET", "/metrics", "Prometheus metrics"),
    ("GET", "/openapi.json", "OpenAPI document"),
];

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health - Process liveness check
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health",
    tag = "System",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse),
    ),
))]
pub async fn health() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    (StatusCode::OK, Json(response))
}

/// GET / - Service banner
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/",
    tag = "System",
    responses(
        (status = 200, description = "Service banner", body = BannerResponse),
    ),
))]
pub async fn banner() -> Json<BannerResponse> {
    Json(BannerResponse {
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: ENDPOINTS
            .iter()
            .map(|(method, path, description)| EndpointInfo {
                method: method.to_string(),
                path: path.to_string(),
                description: description.to_string(),
            })
            .collect(),
    })
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            service: "prism".to_string(),
            version: "0.1.0".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"service\":\"prism\""));
    }

    #[tokio::test]
    async fn test_banner_lists_generation_endpoints() {
        let Json(banner) = banner().await;
        assert_eq!(banner.service, "prism");
        assert!(banner
            .endpoints
            .iter()
            .any(|e| e.method == "POST" && e.path == "/generate"));
    }
}
