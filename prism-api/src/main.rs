//! Prism API Server Entry Point
//!
//! Loads configuration, wires the providers, cache, admission control and
//! artifact store together, starts the retention sweeper and serves the
//! Axum router until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use prism_api::constants::PROVIDER_REQUEST_TIMEOUT_SECS;
use prism_api::telemetry::{init_tracing, TelemetryConfig};
use prism_api::{
    create_router, retention_sweep_task, AdmissionController, AppState, ArtifactFetcher,
    ArtifactStore, GenerationService, RetentionConfig, RetentionMetrics, ServiceConfig,
};
use prism_core::{PrismError, PrismResult};
use prism_providers::{
    DashScopeClient, DashScopeEnhancementProvider, DashScopeGenerationProvider,
    EnhancementCache, EnhancementProvider, GenerationProvider,
};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> PrismResult<()> {
    // A missing .env file is fine; the process environment still applies.
    let _ = dotenvy::dotenv();

    init_tracing(&TelemetryConfig::from_env())?;

    let config = ServiceConfig::from_env();
    config.validate()?;
    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| PrismError::config("DASHSCOPE_API_KEY", "must be set"))?;
    let config = Arc::new(config);

    let client = DashScopeClient::with_base_url(
        api_key,
        config.provider_base_url.clone(),
        Duration::from_secs(PROVIDER_REQUEST_TIMEOUT_SECS),
    )?;
    let generator: Arc<dyn GenerationProvider> = Arc::new(DashScopeGenerationProvider::new(
        client.clone(),
        config.image_model.clone(),
        config.video_model.clone(),
    ));
    let enhancer: Option<Arc<dyn EnhancementProvider>> = if config.enhancement_enabled {
        Some(Arc::new(DashScopeEnhancementProvider::new(
            client,
            config.text_model.clone(),
        )))
    } else {
        None
    };

    let store = Arc::new(ArtifactStore::open(config.artifact_root.clone()).await?);
    let fetcher = ArtifactFetcher::new(Arc::clone(&store))?;
    let admission = Arc::new(AdmissionController::new(
        config.max_concurrent_generations,
        config.max_concurrent_downloads,
    )?);
    let cache = Arc::new(
        EnhancementCache::new(
            config.enhancement_cache_capacity,
            config.enhancement_cache_ttl,
        )
        .with_enhance_timeout(config.enhancement_timeout),
    );

    let generation = Arc::new(GenerationService::new(
        Arc::clone(&config),
        generator,
        enhancer,
        cache,
        admission,
        fetcher,
    )?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let retention = Arc::new(RetentionMetrics::new());
    let sweeper = tokio::spawn(retention_sweep_task(
        Arc::clone(&store),
        RetentionConfig::from_service(&config),
        Arc::clone(&retention),
        shutdown_rx,
    ));

    let state = AppState::new(generation, store, retention);
    let app = create_router(state);

    let addr = config.bind_addr()?;
    tracing::info!(
        %addr,
        public_base_url = %config.public_base_url,
        artifact_root = %config.artifact_root.display(),
        "Starting Prism API server"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| PrismError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| PrismError::internal(format!("Server error: {}", e)))?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "Retention sweep task ended abnormally");
    }
    tracing::info!("Prism API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
