//! Service status: admission, enhancement cache and retention counters.

use axum::{extract::State, routing::get, Json, Router};
use prism_providers::CacheStats;
use serde::{Deserialize, Serialize};

use crate::admission::AdmissionSnapshot;
use crate::constants::SERVICE_NAME;
use crate::jobs::RetentionSnapshot;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CacheStatus {
    pub enabled: bool,
    pub entries: u64,
    pub capacity: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub stale_served: u64,
    pub hit_rate: f64,
}

impl CacheStatus {
    fn new(enabled: bool, stats: CacheStats) -> Self {
        Self {
            enabled,
            entries: stats.entry_count,
            capacity: stats.capacity,
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            expirations: stats.expirations,
            stale_served: stats.stale_served,
            hit_rate: stats.hit_rate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ModelInfo {
    pub image: String,
    pub video: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StatusResponse {
    pub service: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub admission: AdmissionSnapshot,
    pub enhancement_cache: CacheStatus,
    pub retention: RetentionSnapshot,
    pub models: ModelInfo,
}

/// GET /status
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/status",
    tag = "System",
    responses(
        (status = 200, description = "Current service state", body = StatusResponse),
    ),
))]
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let config = &state.config;
    Json(StatusResponse {
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        admission: state.admission().snapshot(),
        enhancement_cache: CacheStatus::new(
            config.enhancement_enabled,
            state.generation.cache().stats(),
        ),
        retention: state.retention.snapshot(),
        models: ModelInfo {
            image: config.image_model.clone(),
            video: config.video_model.clone(),
            text: config.text_model.clone(),
        },
    })
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/status", get(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_status_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            entry_count: 1,
            capacity: 512,
            ..Default::default()
        };
        let status = CacheStatus::new(true, stats);
        assert_eq!(status.hit_rate, 0.75);
        assert_eq!(status.entries, 1);
    }
}
