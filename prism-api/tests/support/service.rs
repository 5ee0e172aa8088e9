#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use prism_api::{
    AdmissionController, AppState, ArtifactFetcher, ArtifactStore, GenerationService,
    RetentionMetrics, ServiceConfig,
};
use prism_core::MediaKind;
use prism_providers::{EnhancementCache, EnhancementProvider};
use prism_test_utils::{MockEnhancementProvider, MockGenerationProvider};
use tempfile::TempDir;

pub const PUBLIC_BASE_URL: &str = "http://prism.test";

/// A generation service over mock providers and a temporary artifact root.
pub struct TestService {
    pub service: Arc<GenerationService>,
    pub store: Arc<ArtifactStore>,
    pub generator: Arc<MockGenerationProvider>,
    pub enhancer: Arc<MockEnhancementProvider>,
    _dir: TempDir,
}

impl TestService {
    pub fn app_state(&self) -> AppState {
        AppState::new(
            Arc::clone(&self.service),
            Arc::clone(&self.store),
            Arc::new(RetentionMetrics::new()),
        )
    }

    /// Names of every file in the storage directory of `kind`, partial files included.
    pub fn stored_files(&self, kind: MediaKind) -> Vec<String> {
        std::fs::read_dir(self.store.dir(kind))
            .map(|dir| {
                dir.filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Millisecond polling and short deadlines so real-time tests stay fast.
pub fn fast_config() -> ServiceConfig {
    ServiceConfig {
        public_base_url: PUBLIC_BASE_URL.to_string(),
        image_poll_interval: Duration::from_millis(10),
        video_poll_interval: Duration::from_millis(10),
        image_generation_timeout: Duration::from_secs(5),
        video_generation_timeout: Duration::from_secs(5),
        image_download_timeout: Duration::from_secs(5),
        video_download_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

pub async fn build_service(
    generator: MockGenerationProvider,
    enhancer: MockEnhancementProvider,
    tweak: impl FnOnce(&mut ServiceConfig),
) -> TestService {
    let dir = TempDir::new().unwrap();
    let mut config = fast_config();
    config.artifact_root = dir.path().to_path_buf();
    tweak(&mut config);

    let store = Arc::new(ArtifactStore::open(dir.path()).await.unwrap());
    let generator = Arc::new(generator);
    let enhancer = Arc::new(enhancer);
    let admission = Arc::new(
        AdmissionController::new(
            config.max_concurrent_generations,
            config.max_concurrent_downloads,
        )
        .unwrap(),
    );
    let cache = Arc::new(EnhancementCache::new(
        config.enhancement_cache_capacity,
        config.enhancement_cache_ttl,
    ));

    let service = GenerationService::new(
        Arc::new(config),
        generator.clone(),
        Some(enhancer.clone() as Arc<dyn EnhancementProvider>),
        cache,
        admission,
        ArtifactFetcher::new(Arc::clone(&store)).unwrap(),
    )
    .unwrap();

    TestService {
        service: Arc::new(service),
        store,
        generator,
        enhancer,
        _dir: dir,
    }
}
