//! Shared application state for Axum routers.

use std::sync::Arc;

use crate::admission::AdmissionController;
use crate::config::ServiceConfig;
use crate::jobs::RetentionMetrics;
use crate::services::GenerationService;
use crate::store::ArtifactStore;

/// Application-wide state shared across all routes.
///
/// Every component is built once at startup; handlers only clone handles.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub generation: Arc<GenerationService>,
    pub store: Arc<ArtifactStore>,
    /// Counters of the background retention sweeper.
    pub retention: Arc<RetentionMetrics>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        generation: Arc<GenerationService>,
        store: Arc<ArtifactStore>,
        retention: Arc<RetentionMetrics>,
    ) -> Self {
        Self {
            config: Arc::clone(generation.config()),
            generation,
            store,
            retention,
            start_time: std::time::Instant::now(),
        }
    }

    pub fn admission(&self) -> &Arc<AdmissionController> {
        self.generation.admission()
    }
}

crate::impl_from_ref!(Arc<ServiceConfig>, config);
crate::impl_from_ref!(Arc<GenerationService>, generation);
crate::impl_from_ref!(Arc<ArtifactStore>, store);
crate::impl_from_ref!(Arc<RetentionMetrics>, retention);
crate::impl_from_ref!(std::time::Instant, start_time);
