//! REST API Routes Module
//!
//! Includes:
//! - Generation endpoints (JSON and plain text)
//! - Artifact deletion and static serving of stored artifacts
//! - Health, status and service banner
//! - Prometheus metrics and the OpenAPI document
//! - CORS support for browser-based clients

pub mod artifacts;
pub mod generate;
pub mod health;
pub mod status;

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    routing::get,
    Router,
};
use prism_core::MediaKind;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

// ============================================================================
// OPENAPI ENDPOINT
// ============================================================================

/// Handler for /openapi.json endpoint.
#[cfg(feature = "openapi")]
async fn openapi_json() -> impl axum::response::IntoResponse {
    use utoipa::OpenApi;
    axum::Json(crate::openapi::ApiDoc::openapi())
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the complete service router.
///
/// Layer order, outermost first: CORS, HTTP tracing, observability, handler.
pub fn create_router(state: AppState) -> Router {
    let image_dir = state.store.dir(MediaKind::Image);
    let video_dir = state.store.dir(MediaKind::Video);
    let cors = build_cors_layer(&state.config);

    #[allow(unused_mut)]
    let mut router = Router::new()
        .merge(generate::create_router())
        .merge(artifacts::create_router())
        .merge(health::create_router())
        .merge(status::create_router())
        .route("/metrics", get(metrics_handler));

    #[cfg(feature = "openapi")]
    {
        router = router.route("/openapi.json", get(openapi_json));
    }

    router
        .nest_service(
            &format!("/{}", MediaKind::Image.storage_dir()),
            ServeDir::new(image_dir),
        )
        .nest_service(
            &format!("/{}", MediaKind::Video.storage_dir()),
            ServeDir::new(video_dir),
        )
        .with_state(state)
        .layer(from_fn(observability_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ServiceConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
fn build_cors_layer(config: &ServiceConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if !config.is_production() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any).allow_headers(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}
