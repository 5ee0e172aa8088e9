//! Prism Core - Domain Types
//!
//! Request validation, size policy, task lifecycle, artifact naming and
//! intent classification. No I/O happens in this crate; every other Prism
//! crate depends on it.

use chrono::{DateTime, Utc};

pub mod artifact;
pub mod error;
pub mod intent;
pub mod media;
pub mod prompt;
pub mod request;
pub mod size;
pub mod task;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Request identifier attached to spans and response bodies.
pub type RequestId = uuid::Uuid;

/// Generate a fresh random request identifier.
pub fn new_request_id() -> RequestId {
    uuid::Uuid::new_v4()
}

pub use artifact::{artifact_filename, is_artifact_filename, StoredArtifact};
pub use error::{
    DownloadError, ErrorKind, Phase, PrismError, PrismResult, ProviderError, TaskStateError,
    ValidationError,
};
pub use intent::{IntentAnalysis, IntentClassifier};
pub use media::{MediaKind, TargetKind};
pub use prompt::{normalize_prompt, prompt_cache_key, PromptKey};
pub use request::{GenerationRequest, PromptBounds, ResolvedMedia, ValidatedRequest};
pub use size::{
    SizePolicy, SizeResolution, SizeSource, DEFAULT_IMAGE_SIZE, DEFAULT_VIDEO_DURATION,
    DEFAULT_VIDEO_SIZE, SUPPORTED_DURATIONS,
};
pub use task::{GenerationTask, TaskState};
