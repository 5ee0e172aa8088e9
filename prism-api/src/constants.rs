//! Constants for Prism API
//!
//! Default values for every setting `ServiceConfig::from_env` recognizes.

// ============================================================================
// SERVER
// ============================================================================

pub const SERVICE_NAME: &str = "prism";

pub const DEFAULT_HOST: &str = "0.0.0.0";

pub const DEFAULT_PORT: u16 = 9528;

/// Host used to build public artifact links when `PUBLIC_BASE_URL` is unset.
pub const DEFAULT_SERVER_HOST: &str = "localhost";

/// Default CORS max age in seconds (24 hours)
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86400;

// ============================================================================
// GENERATION
// ============================================================================

/// Timeout of a single submit or poll call to the provider.
pub const PROVIDER_REQUEST_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_IMAGE_GENERATION_TIMEOUT_SECS: u64 = 180;

pub const DEFAULT_VIDEO_GENERATION_TIMEOUT_SECS: u64 = 900;

pub const DEFAULT_IMAGE_POLL_INTERVAL_MS: u64 = 3000;

pub const DEFAULT_VIDEO_POLL_INTERVAL_MS: u64 = 15000;

/// Poll cadence is never faster than this.
pub const MIN_POLL_INTERVAL_MS: u64 = 100;

// ============================================================================
// DOWNLOADS
// ============================================================================

pub const DEFAULT_IMAGE_DOWNLOAD_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_VIDEO_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

// ============================================================================
// ADMISSION
// ============================================================================

pub const DEFAULT_MAX_CONCURRENT_GENERATIONS: usize = 20;

pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 10;

// ============================================================================
// ENHANCEMENT
// ============================================================================

pub const DEFAULT_ENHANCEMENT_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// RETENTION
// ============================================================================

pub const DEFAULT_ARTIFACT_MAX_AGE_HOURS: u64 = 24;

pub const DEFAULT_RETENTION_CHECK_INTERVAL_SECS: u64 = 3600;

// ============================================================================
// LOGGING
// ============================================================================

pub const DEFAULT_LOG_FILTER: &str = "prism_api=debug,tower_http=info,info";

// ============================================================================
// RESPONSE TEXT
// ============================================================================

pub const VIDEO_DOWNLOAD_INSTRUCTIONS: &str =
    "Please copy the link to your web browser to download the video, video URL:";

pub const IMAGE_SUCCESS_MESSAGE: &str = "Image generated successfully";
