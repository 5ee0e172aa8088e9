//! Background Jobs for Prism API
//!
//! - `retention_sweep`: deletes stored artifacts past their maximum age
//!
//! # Usage
//!
//! ```ignore
//! use prism_api::jobs::{retention_sweep_task, RetentionConfig, RetentionMetrics};
//! use tokio::sync::watch;
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! let metrics = Arc::new(RetentionMetrics::new());
//! tokio::spawn(retention_sweep_task(store, RetentionConfig::default(), metrics, shutdown_rx));
//!
//! // On shutdown
//! let _ = shutdown_tx.send(true);
//! ```

pub mod retention_sweep;

pub use retention_sweep::{
    retention_sweep_task, sweep_once, RetentionConfig, RetentionMetrics, RetentionSnapshot,
};
