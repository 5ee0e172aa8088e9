//! Prism Providers - Remote Collaborator Layer
//!
//! Provider-agnostic traits for media generation and prompt enhancement,
//! the DashScope implementations of both, the enhancement cache and the
//! task client that drives a generation job to a terminal state.

use async_trait::async_trait;
use prism_core::{MediaKind, PrismResult};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod cache;
pub mod providers;
pub mod task_client;

pub use cache::{CacheLookup, CacheStats, EnhancementCache};
pub use providers::dashscope::{
    DashScopeClient, DashScopeEnhancementProvider, DashScopeGenerationProvider,
};
pub use task_client::{PollTiming, TaskClient, TaskClientConfig, TaskOutcome};

// ============================================================================
// JOB TYPES
// ============================================================================

/// Fully resolved parameters of one generation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub kind: MediaKind,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    /// Provider size token, e.g. `1280*960`.
    pub size: String,
    /// Seconds; video only.
    pub duration: Option<u32>,
    pub watermark: bool,
    /// Provider-side prompt rewriting.
    pub prompt_extend: bool,
    /// Generated soundtrack; video only.
    pub audio: Option<bool>,
    pub seed: Option<u32>,
}

impl JobSpec {
    pub fn image(prompt: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Image,
            prompt: prompt.into(),
            negative_prompt: None,
            size: size.into(),
            duration: None,
            watermark: false,
            prompt_extend: false,
            audio: None,
            seed: None,
        }
    }

    pub fn video(prompt: impl Into<String>, size: impl Into<String>, duration: u32) -> Self {
        Self {
            kind: MediaKind::Video,
            prompt: prompt.into(),
            negative_prompt: None,
            size: size.into(),
            duration: Some(duration),
            watermark: false,
            prompt_extend: true,
            audio: Some(true),
            seed: None,
        }
    }
}

/// Task status as reported by the remote provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    /// Task expired or never existed on the provider side.
    Unknown,
}

impl RemoteStatus {
    /// Parse a provider status string. Anything unrecognized is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" | "SUBMITTED" | "QUEUED" => RemoteStatus::Pending,
            "RUNNING" | "PROCESSING" => RemoteStatus::Running,
            "SUCCEEDED" | "SUCCESS" => RemoteStatus::Succeeded,
            "FAILED" => RemoteStatus::Failed,
            "CANCELED" | "CANCELLED" => RemoteStatus::Canceled,
            _ => RemoteStatus::Unknown,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RemoteStatus::Pending | RemoteStatus::Running)
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RemoteStatus::Pending => "PENDING",
            RemoteStatus::Running => "RUNNING",
            RemoteStatus::Succeeded => "SUCCEEDED",
            RemoteStatus::Failed => "FAILED",
            RemoteStatus::Canceled => "CANCELED",
            RemoteStatus::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Reason reported for tasks the provider no longer knows about.
pub const UNKNOWN_TASK_REASON: &str = "task unknown to provider (expired or never created)";

/// Accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTask {
    pub task_id: String,
    pub status: RemoteStatus,
}

/// One observation of a remote task.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollSnapshot {
    pub task_id: String,
    pub status: Option<RemoteStatus>,
    /// Remote result location, set once succeeded.
    pub result_url: Option<String>,
    /// Prompt actually used after provider-side extension.
    pub actual_prompt: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl PollSnapshot {
    pub fn status(&self) -> RemoteStatus {
        self.status.unwrap_or(RemoteStatus::Unknown)
    }
}

// ============================================================================
// PROVIDER TRAITS
// ============================================================================

/// Remote media generation provider.
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Model used for the given media kind.
    fn model(&self, kind: MediaKind) -> &str;

    /// Submit a job. Returns as soon as the provider has issued a task id.
    async fn submit(&self, spec: &JobSpec) -> PrismResult<SubmittedTask>;

    /// Query the current state of a task.
    async fn poll(&self, kind: MediaKind, task_id: &str) -> PrismResult<PollSnapshot>;

    /// Ask the provider to stop a task. Providers without a cancel
    /// operation keep the default no-op.
    async fn cancel(&self, task_id: &str) -> PrismResult<()> {
        let _ = task_id;
        Ok(())
    }
}

/// Remote text enhancement provider.
#[async_trait]
pub trait EnhancementProvider: Send + Sync {
    fn model_id(&self) -> &str;

    /// Rewrite a prompt. Empty output is an error.
    async fn enhance(&self, prompt: &str) -> PrismResult<String>;
}

// ============================================================================
// TESTS
// ============================================================================
