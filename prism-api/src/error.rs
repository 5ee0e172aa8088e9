//! Error Types for Prism API
//!
//! This module defines error handling for the HTTP layer:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//! - The mapping from the domain `PrismError` taxonomy
//!
//! Every error body carries `success: false`, a stable code and a
//! human-readable message. Errors raised by the generation pipeline also
//! carry the domain `kind`, which groups both timeout phases under
//! `TIMEOUT_ERROR` while `code` keeps them apart.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use prism_core::{ErrorKind, Phase, PrismError, RequestId};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Client Errors (400, 404)
    // ========================================================================
    /// Prompt, size or duration rejected before any provider call
    ValidationFailed,

    /// Malformed request outside the generation contract
    InvalidInput,

    /// Requested artifact does not exist
    ArtifactNotFound,

    // ========================================================================
    // Upstream Errors (502, 504)
    // ========================================================================
    /// The generation provider rejected or failed the job
    ProviderFailed,

    /// The generation deadline elapsed while the job was still running
    GenerationTimeout,

    /// The job succeeded but the result could not be stored locally
    DownloadFailed,

    /// The enhancement provider failed
    EnhancementFailed,

    // ========================================================================
    // Server Errors (500)
    // ========================================================================
    /// Invalid service configuration
    ConfigError,

    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationFailed | ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,

            ErrorCode::ArtifactNotFound => StatusCode::NOT_FOUND,

            ErrorCode::ProviderFailed
            | ErrorCode::DownloadFailed
            | ErrorCode::EnhancementFailed => StatusCode::BAD_GATEWAY,

            ErrorCode::GenerationTimeout => StatusCode::GATEWAY_TIMEOUT,

            ErrorCode::ConfigError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::ArtifactNotFound => "Artifact not found",
            ErrorCode::ProviderFailed => "Generation provider failed",
            ErrorCode::GenerationTimeout => "Generation timed out",
            ErrorCode::DownloadFailed => "Failed to download generated result",
            ErrorCode::EnhancementFailed => "Prompt enhancement failed",
            ErrorCode::ConfigError => "Invalid service configuration",
            ErrorCode::InternalError => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    /// Always false
    pub success: bool,

    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Domain classification, present for generation pipeline failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details, e.g. the remote result URL
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,

    /// Identifier of the generation request that failed
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub request_id: Option<RequestId>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code,
            kind: None,
            message: message.into(),
            details: None,
            request_id: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    /// The remote result URL reported with a failed download.
    pub fn remote_url(&self) -> Option<&str> {
        self.details.as_ref()?.get("remote_url")?.as_str()
    }

    /// Body of the text endpoints. A failed download still names the
    /// remote result so the caller can fetch it directly.
    pub fn plain_text(&self) -> String {
        match self.remote_url() {
            Some(url) => format!("Error: {}. Remote URL: {}", self.message, url),
            None => format!("Error: {}", self.message),
        }
    }

    /// Plain-text rendition used by the text endpoints.
    pub fn into_plain_text(self) -> Response {
        (self.status_code(), self.plain_text()).into_response()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    /// Create a ValidationFailed error.
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create an ArtifactNotFound error for the given file.
    pub fn artifact_not_found(filename: &str) -> Self {
        Self::new(
            ErrorCode::ArtifactNotFound,
            format!("Artifact {} not found", filename),
        )
    }

    /// Create an InternalError.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM OTHER ERROR TYPES
// ============================================================================

impl From<PrismError> for ApiError {
    fn from(err: PrismError) -> Self {
        let message = err.to_string();
        let error = match &err {
            PrismError::Validation(_) => ApiError::validation_failed(message),
            PrismError::Provider(_) => ApiError::new(ErrorCode::ProviderFailed, message),
            PrismError::Timeout {
                phase: Phase::Generation,
                task_id,
                ..
            } => {
                let error = ApiError::new(ErrorCode::GenerationTimeout, message);
                match task_id {
                    Some(task_id) => error.with_details(serde_json::json!({ "task_id": task_id })),
                    None => error,
                }
            }
            PrismError::Timeout {
                phase: Phase::Download,
                ..
            }
            | PrismError::Download { .. } => {
                let error = ApiError::new(ErrorCode::DownloadFailed, message);
                match err.remote_url() {
                    Some(url) => error.with_details(serde_json::json!({ "remote_url": url })),
                    None => error,
                }
            }
            PrismError::Enhancement { .. } => ApiError::new(ErrorCode::EnhancementFailed, message),
            PrismError::Config { .. } => ApiError::new(ErrorCode::ConfigError, message),
            PrismError::Internal { .. } => ApiError::internal_error(message),
        };
        ApiError {
            kind: Some(err.kind()),
            ..error
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::internal_error(format!("I/O error: {}", err))
    }
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// TESTS
// ============================================================================
