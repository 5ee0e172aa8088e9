//! Error types for Prism operations

use crate::{MediaKind, TaskState};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Request validation errors. Never retried, always a client error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Prompt too short: {actual} characters, minimum is {min}")]
    PromptTooShort { min: usize, actual: usize },

    #[error("Prompt too long: {actual} characters, maximum is {max}")]
    PromptTooLong { max: usize, actual: usize },

    #[error("Unsupported {kind} size '{size}': {reason}")]
    UnsupportedSize {
        kind: MediaKind,
        size: String,
        reason: String,
    },

    #[error("Unsupported video duration {duration}s, allowed: {allowed:?}")]
    UnsupportedDuration { duration: u32, allowed: Vec<u32> },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Remote provider errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{provider} rejected submission ({code}): {message}")]
    SubmissionRejected {
        provider: String,
        code: String,
        message: String,
    },

    #[error("Request to {provider} failed with status {status}: {message}")]
    RequestFailed {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider} unreachable: {reason}")]
    Unreachable { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Task {task_id} failed ({code}): {message}")]
    TaskFailed {
        task_id: String,
        code: String,
        message: String,
    },

    #[error("Task {task_id} was canceled by the provider")]
    TaskCanceled { task_id: String },
}

/// Artifact retrieval errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DownloadError {
    #[error("Remote returned status {status}")]
    RemoteStatus { status: u16 },

    #[error("Network failure: {reason}")]
    Network { reason: String },

    #[error("Local write to {path} failed: {reason}")]
    Io { path: String, reason: String },

    #[error("Remote returned an empty body")]
    EmptyBody,
}

/// Illegal task state transition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskStateError {
    #[error("Task {task_id} already terminal in {from:?}, cannot move to {to:?}")]
    AlreadyTerminal {
        task_id: String,
        from: TaskState,
        to: TaskState,
    },
}

/// Deadline-bounded phase of a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Generation,
    Download,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Generation => f.write_str("generation"),
            Phase::Download => f.write_str("download"),
        }
    }
}

/// Stable, client-facing error classification.
///
/// Coarser than the HTTP error code: every timeout is `TIMEOUT_ERROR`
/// whichever phase ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ValidationError,
    ProviderError,
    TimeoutError,
    DownloadError,
    EnhancementError,
    ConfigError,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::ProviderError => "PROVIDER_ERROR",
            ErrorKind::TimeoutError => "TIMEOUT_ERROR",
            ErrorKind::DownloadError => "DOWNLOAD_ERROR",
            ErrorKind::EnhancementError => "ENHANCEMENT_ERROR",
            ErrorKind::ConfigError => "CONFIG_ERROR",
            ErrorKind::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Master error type for all Prism errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PrismError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("{phase} timed out after {}s", .limit.as_secs_f64())]
    Timeout {
        phase: Phase,
        limit: Duration,
        task_id: Option<String>,
        remote_url: Option<String>,
    },

    #[error("Download of {remote_url} failed: {source}")]
    Download {
        remote_url: String,
        #[source]
        source: DownloadError,
    },

    #[error("Prompt enhancement failed: {reason}")]
    Enhancement { reason: String },

    #[error("Config error for {field}: {reason}")]
    Config { field: String, reason: String },

    #[error("Internal error: {reason}")]
    Internal { reason: String },
}

impl PrismError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PrismError::Validation(_) => ErrorKind::ValidationError,
            PrismError::Provider(_) => ErrorKind::ProviderError,
            PrismError::Timeout { .. } => ErrorKind::TimeoutError,
            PrismError::Download { .. } => ErrorKind::DownloadError,
            PrismError::Enhancement { .. } => ErrorKind::EnhancementError,
            PrismError::Config { .. } => ErrorKind::ConfigError,
            PrismError::Internal { .. } => ErrorKind::InternalError,
        }
    }

    /// Remote result URL still usable by the caller after a failed download.
    pub fn remote_url(&self) -> Option<&str> {
        match self {
            PrismError::Download { remote_url, .. } => Some(remote_url),
            PrismError::Timeout { remote_url, .. } => remote_url.as_deref(),
            _ => None,
        }
    }

    pub fn generation_timeout(limit: Duration, task_id: Option<String>) -> Self {
        PrismError::Timeout {
            phase: Phase::Generation,
            limit,
            task_id,
            remote_url: None,
        }
    }

    pub fn download_timeout(limit: Duration, remote_url: impl Into<String>) -> Self {
        PrismError::Timeout {
            phase: Phase::Download,
            limit,
            task_id: None,
            remote_url: Some(remote_url.into()),
        }
    }

    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PrismError::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        PrismError::Internal {
            reason: reason.into(),
        }
    }
}

impl From<TaskStateError> for PrismError {
    fn from(err: TaskStateError) -> Self {
        PrismError::Internal {
            reason: err.to_string(),
        }
    }
}

/// Result type alias for Prism operations.
pub type PrismResult<T> = Result<T, PrismError>;

// =============================================================================
// TESTS
// =============================================================================
