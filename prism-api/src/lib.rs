//! Prism API - HTTP Generation Service
//!
//! Accepts a natural-language prompt, decides whether it asks for an image
//! or a video, optionally rewrites it with a text model, drives the remote
//! asynchronous generation job to completion and stores the result locally
//! behind a public URL.
//!
//! Endpoints are served with Axum; stored artifacts are served statically
//! and expired by a background retention sweeper.

#[macro_use]
mod macros;

pub mod admission;
pub mod config;
pub mod constants;
pub mod error;
pub mod fetcher;
pub mod jobs;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use admission::{AdmissionController, AdmissionPermit, AdmissionSnapshot, SlotKind};
pub use config::ServiceConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use fetcher::ArtifactFetcher;
pub use jobs::{retention_sweep_task, RetentionConfig, RetentionMetrics};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::create_router;
pub use services::{GenerationOutcome, GenerationService};
pub use state::AppState;
pub use store::{ArtifactStore, SweepReport};
pub use types::{GenerationPayload, ImagePayload, IntentAnalysisBody, VideoPayload};
