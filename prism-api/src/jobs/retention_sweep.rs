//! Retention Sweep Background Task
//!
//! Periodically deletes stored artifacts older than the configured maximum
//! age, together with partial downloads left behind by a crash.
//!
//! # Configuration
//!
//! ```rust
//! use prism_api::jobs::RetentionConfig;
//! use std::time::Duration;
//!
//! let config = RetentionConfig {
//!     check_interval: Duration::from_secs(3600), // Sweep hourly
//!     max_age: Duration::from_secs(24 * 3600),   // Keep artifacts for a day
//!     log_removals: true,
//! };
//! ```

use crate::config::ServiceConfig;
use crate::constants::{DEFAULT_ARTIFACT_MAX_AGE_HOURS, DEFAULT_RETENTION_CHECK_INTERVAL_SECS};
use crate::store::{ArtifactStore, SweepReport};
use crate::telemetry::METRICS;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the retention sweep background task.
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    /// How often to sweep (default: 1 hour)
    pub check_interval: Duration,

    /// Artifacts last modified longer ago than this are deleted
    /// (default: 24 hours)
    pub max_age: Duration,

    /// Whether to log sweeps that removed something (default: true)
    pub log_removals: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(DEFAULT_RETENTION_CHECK_INTERVAL_SECS),
            max_age: Duration::from_secs(DEFAULT_ARTIFACT_MAX_AGE_HOURS * 3600),
            log_removals: true,
        }
    }
}

impl RetentionConfig {
    pub fn from_service(config: &ServiceConfig) -> Self {
        Self {
            check_interval: config.retention_check_interval,
            max_age: config.artifact_max_age,
            log_removals: true,
        }
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// Counters for sweep activity since startup.
#[derive(Debug, Default)]
pub struct RetentionMetrics {
    /// Total sweeps completed
    pub sweep_cycles: AtomicU64,

    /// Total files removed
    pub artifacts_removed: AtomicU64,

    /// Total bytes freed
    pub bytes_removed: AtomicU64,

    /// Total files that could not be inspected or removed
    pub sweep_errors: AtomicU64,
}

impl RetentionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current snapshot of all metrics.
    pub fn snapshot(&self) -> RetentionSnapshot {
        RetentionSnapshot {
            sweep_cycles: self.sweep_cycles.load(Ordering::Relaxed),
            artifacts_removed: self.artifacts_removed.load(Ordering::Relaxed),
            bytes_removed: self.bytes_removed.load(Ordering::Relaxed),
            sweep_errors: self.sweep_errors.load(Ordering::Relaxed),
        }
    }

    fn record(&self, report: &SweepReport) {
        self.sweep_cycles.fetch_add(1, Ordering::Relaxed);
        self.artifacts_removed
            .fetch_add(report.removed, Ordering::Relaxed);
        self.bytes_removed
            .fetch_add(report.bytes_removed, Ordering::Relaxed);
        self.sweep_errors.fetch_add(report.errors, Ordering::Relaxed);
    }
}

/// Snapshot of retention metrics at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RetentionSnapshot {
    pub sweep_cycles: u64,
    pub artifacts_removed: u64,
    pub bytes_removed: u64,
    pub sweep_errors: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Background task that sweeps the artifact store until shutdown.
///
/// The first sweep runs immediately, which also clears whatever a previous
/// process left behind.
///
/// ```ignore
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// let metrics = Arc::new(RetentionMetrics::new());
/// tokio::spawn(retention_sweep_task(store, config, metrics.clone(), shutdown_rx));
///
/// // On shutdown
/// let _ = shutdown_tx.send(true);
/// ```
pub async fn retention_sweep_task(
    store: Arc<ArtifactStore>,
    config: RetentionConfig,
    metrics: Arc<RetentionMetrics>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<RetentionMetrics> {
    let mut sweep_interval = interval(config.check_interval);
    sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        check_interval_secs = config.check_interval.as_secs(),
        max_age_secs = config.max_age.as_secs(),
        root = %store.root().display(),
        "Retention sweep task started"
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("Retention sweep task shutting down");
                    break;
                }
            }

            _ = sweep_interval.tick() => {
                sweep_once(&store, &config, &metrics, SystemTime::now()).await;
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        sweep_cycles = snapshot.sweep_cycles,
        artifacts_removed = snapshot.artifacts_removed,
        bytes_removed = snapshot.bytes_removed,
        sweep_errors = snapshot.sweep_errors,
        "Retention sweep task completed"
    );

    metrics
}

/// Perform one sweep as of `now`.
pub async fn sweep_once(
    store: &ArtifactStore,
    config: &RetentionConfig,
    metrics: &RetentionMetrics,
    now: SystemTime,
) -> SweepReport {
    let report = store.sweep(config.max_age, now).await;
    metrics.record(&report);
    if let Ok(prom) = METRICS.as_ref() {
        prom.record_artifacts_removed("retention", report.removed);
    }

    if report.removed > 0 && config.log_removals {
        tracing::info!(
            scanned = report.scanned,
            removed = report.removed,
            bytes_removed = report.bytes_removed,
            errors = report.errors,
            "Retention sweep removed expired artifacts"
        );
    } else {
        tracing::trace!(scanned = report.scanned, "Retention sweep found nothing to remove");
    }
    report
}

// ============================================================================
// TESTS
// ============================================================================
