//! Service Configuration Module
//!
//! Every tunable of the generation service is read from environment
//! variables (a `.env` file is loaded by `main` before this runs). Each
//! setting has a default; numeric settings outside their accepted range
//! are clamped and a warning is logged.

use crate::constants::*;
use prism_core::intent::{DEFAULT_FALLBACK_CONFIDENCE, DEFAULT_IMAGE_CONFIDENCE};
use prism_core::{
    MediaKind, PrismError, PrismResult, PromptBounds, SizePolicy, DEFAULT_IMAGE_SIZE,
    DEFAULT_VIDEO_DURATION, DEFAULT_VIDEO_SIZE,
};
use prism_providers::cache::{DEFAULT_CAPACITY, DEFAULT_TTL};
use prism_providers::providers::dashscope::{
    DEFAULT_BASE_URL, DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL, DEFAULT_VIDEO_MODEL,
};
use prism_providers::{PollTiming, TaskClientConfig};
use secrecy::SecretString;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// SERVICE CONFIGURATION
// ============================================================================

/// Configuration for the whole service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    // ========================================================================
    // Server
    // ========================================================================
    pub host: String,
    pub port: u16,
    /// Base of the links handed out for locally stored artifacts.
    pub public_base_url: String,
    /// Allowed CORS origins. Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Provider
    // ========================================================================
    /// Required to serve generation requests; `main` refuses to start without it.
    pub api_key: Option<SecretString>,
    pub provider_base_url: String,
    pub image_model: String,
    pub video_model: String,
    pub text_model: String,

    // ========================================================================
    // Request defaults
    // ========================================================================
    pub image_default_size: String,
    pub video_default_size: String,
    pub video_default_duration: u32,
    pub image_watermark: bool,
    pub video_watermark: bool,
    pub image_prompt_extend: bool,
    pub video_prompt_extend: bool,
    pub video_audio: bool,
    pub min_prompt_chars: usize,
    pub max_prompt_chars: usize,

    // ========================================================================
    // Intent
    // ========================================================================
    /// Confidence reported when an image keyword decides the media kind.
    pub intent_image_confidence: f64,
    /// Confidence reported when no keyword matched and image is assumed.
    pub intent_fallback_confidence: f64,

    // ========================================================================
    // Enhancement
    // ========================================================================
    pub enhancement_enabled: bool,
    pub enhancement_cache_capacity: usize,
    pub enhancement_cache_ttl: Duration,
    pub enhancement_timeout: Duration,

    // ========================================================================
    // Phase deadlines and polling
    // ========================================================================
    pub image_generation_timeout: Duration,
    pub video_generation_timeout: Duration,
    pub image_poll_interval: Duration,
    pub video_poll_interval: Duration,
    pub image_download_timeout: Duration,
    pub video_download_timeout: Duration,
    /// Send a provider cancel when the local generation deadline elapses.
    pub cancel_on_timeout: bool,

    // ========================================================================
    // Admission
    // ========================================================================
    pub max_concurrent_generations: usize,
    pub max_concurrent_downloads: usize,

    // ========================================================================
    // Storage and retention
    // ========================================================================
    /// Parent of `temp_images/` and `temp_videos/`.
    pub artifact_root: PathBuf,
    pub artifact_max_age: Duration,
    pub retention_check_interval: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            public_base_url: format!("http://{}:{}", DEFAULT_SERVER_HOST, DEFAULT_PORT),
            cors_origins: Vec::new(),
            cors_max_age_secs: DEFAULT_CORS_MAX_AGE_SECS,

            api_key: None,
            provider_base_url: DEFAULT_BASE_URL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            video_model: DEFAULT_VIDEO_MODEL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),

            image_default_size: DEFAULT_IMAGE_SIZE.to_string(),
            video_default_size: DEFAULT_VIDEO_SIZE.to_string(),
            video_default_duration: DEFAULT_VIDEO_DURATION,
            image_watermark: false,
            video_watermark: false,
            image_prompt_extend: false,
            video_prompt_extend: true,
            video_audio: true,
            min_prompt_chars: PromptBounds::default().min_chars,
            max_prompt_chars: PromptBounds::default().max_chars,

            intent_image_confidence: DEFAULT_IMAGE_CONFIDENCE,
            intent_fallback_confidence: DEFAULT_FALLBACK_CONFIDENCE,

            enhancement_enabled: true,
            enhancement_cache_capacity: DEFAULT_CAPACITY,
            enhancement_cache_ttl: DEFAULT_TTL,
            enhancement_timeout: Duration::from_secs(DEFAULT_ENHANCEMENT_TIMEOUT_SECS),

            image_generation_timeout: Duration::from_secs(DEFAULT_IMAGE_GENERATION_TIMEOUT_SECS),
            video_generation_timeout: Duration::from_secs(DEFAULT_VIDEO_GENERATION_TIMEOUT_SECS),
            image_poll_interval: Duration::from_millis(DEFAULT_IMAGE_POLL_INTERVAL_MS),
            video_poll_interval: Duration::from_millis(DEFAULT_VIDEO_POLL_INTERVAL_MS),
            image_download_timeout: Duration::from_secs(DEFAULT_IMAGE_DOWNLOAD_TIMEOUT_SECS),
            video_download_timeout: Duration::from_secs(DEFAULT_VIDEO_DOWNLOAD_TIMEOUT_SECS),
            cancel_on_timeout: false,

            max_concurrent_generations: DEFAULT_MAX_CONCURRENT_GENERATIONS,
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,

            artifact_root: PathBuf::from("."),
            artifact_max_age: Duration::from_secs(DEFAULT_ARTIFACT_MAX_AGE_HOURS * 3600),
            retention_check_interval: Duration::from_secs(DEFAULT_RETENTION_CHECK_INTERVAL_SECS),
        }
    }
}

impl ServiceConfig {
    /// Create ServiceConfig from process environment variables.
    ///
    /// Environment variables:
    /// - `DASHSCOPE_API_KEY`, `DASHSCOPE_BASE_URL`
    /// - `IMAGE_MODEL`, `VIDEO_MODEL`, `QWEN_TEXT_MODEL`
    /// - `IMAGE_DEFAULT_SIZE`, `VIDEO_DEFAULT_SIZE`, `VIDEO_DEFAULT_DURATION`
    /// - `IMAGE_WATERMARK`, `VIDEO_WATERMARK`, `IMAGE_PROMPT_EXTEND`,
    ///   `VIDEO_PROMPT_EXTEND`, `VIDEO_AUDIO`
    /// - `ENABLE_PROMPT_ENHANCEMENT`, `ENHANCEMENT_CACHE_CAPACITY`,
    ///   `ENHANCEMENT_CACHE_TTL_SECS`, `ENHANCEMENT_TIMEOUT_SECS`
    /// - `IMAGE_GENERATION_TIMEOUT_SECS`, `VIDEO_GENERATION_TIMEOUT_SECS`
    /// - `IMAGE_POLL_INTERVAL_MS`, `VIDEO_POLL_INTERVAL_MS`
    /// - `IMAGE_DOWNLOAD_TIMEOUT_SECS`, `VIDEO_DOWNLOAD_TIMEOUT_SECS`
    /// - `MAX_CONCURRENT_GENERATIONS`, `MAX_CONCURRENT_DOWNLOADS`, `CANCEL_ON_TIMEOUT`
    /// - `MIN_PROMPT_LENGTH`, `MAX_PROMPT_LENGTH`
    /// - `INTENT_IMAGE_CONFIDENCE`, `INTENT_DEFAULT_CONFIDENCE` (clamped to `[0, 1]`)
    /// - `ARTIFACT_ROOT`, `ARTIFACT_MAX_AGE_HOURS`, `RETENTION_CHECK_INTERVAL_SECS`
    /// - `HOST`, `PORT`, `SERVER_HOST`, `PUBLIC_BASE_URL`, `PRISM_CORS_ORIGINS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };
        let defaults = Self::default();

        let port = env.number("PORT", u64::from(DEFAULT_PORT), 1, u64::from(u16::MAX)) as u16;
        let server_host = env.string("SERVER_HOST", DEFAULT_SERVER_HOST);
        let public_base_url = env
            .get("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://{}:{}", server_host, port))
            .trim_end_matches('/')
            .to_string();

        let min_prompt_chars = env.number("MIN_PROMPT_LENGTH", defaults.min_prompt_chars as u64, 1, 10_000) as usize;
        let max_prompt_chars = env.number("MAX_PROMPT_LENGTH", defaults.max_prompt_chars as u64, 1, 100_000) as usize;

        Self {
            host: env.string("HOST", DEFAULT_HOST),
            port,
            public_base_url,
            cors_origins: env
                .get("PRISM_CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            cors_max_age_secs: defaults.cors_max_age_secs,

            api_key: env
                .get("DASHSCOPE_API_KEY")
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
            provider_base_url: env.string("DASHSCOPE_BASE_URL", DEFAULT_BASE_URL),
            image_model: env.string("IMAGE_MODEL", DEFAULT_IMAGE_MODEL),
            video_model: env.string("VIDEO_MODEL", DEFAULT_VIDEO_MODEL),
            text_model: env.string("QWEN_TEXT_MODEL", DEFAULT_TEXT_MODEL),

            image_default_size: env.string("IMAGE_DEFAULT_SIZE", DEFAULT_IMAGE_SIZE),
            video_default_size: env.string("VIDEO_DEFAULT_SIZE", DEFAULT_VIDEO_SIZE),
            video_default_duration: env.number(
                "VIDEO_DEFAULT_DURATION",
                u64::from(DEFAULT_VIDEO_DURATION),
                1,
                60,
            ) as u32,
            image_watermark: env.flag("IMAGE_WATERMARK", defaults.image_watermark),
            video_watermark: env.flag("VIDEO_WATERMARK", defaults.video_watermark),
            image_prompt_extend: env.flag("IMAGE_PROMPT_EXTEND", defaults.image_prompt_extend),
            video_prompt_extend: env.flag("VIDEO_PROMPT_EXTEND", defaults.video_prompt_extend),
            video_audio: env.flag("VIDEO_AUDIO", defaults.video_audio),
            min_prompt_chars,
            max_prompt_chars,

            intent_image_confidence: env.ratio("INTENT_IMAGE_CONFIDENCE", DEFAULT_IMAGE_CONFIDENCE),
            intent_fallback_confidence: env.ratio(
                "INTENT_DEFAULT_CONFIDENCE",
                DEFAULT_FALLBACK_CONFIDENCE,
            ),

            enhancement_enabled: env.flag("ENABLE_PROMPT_ENHANCEMENT", defaults.enhancement_enabled),
            enhancement_cache_capacity: env.number(
                "ENHANCEMENT_CACHE_CAPACITY",
                DEFAULT_CAPACITY as u64,
                1,
                1_000_000,
            ) as usize,
            enhancement_cache_ttl: env.secs("ENHANCEMENT_CACHE_TTL_SECS", DEFAULT_TTL.as_secs(), 1, 7 * 86400),
            enhancement_timeout: env.secs("ENHANCEMENT_TIMEOUT_SECS", DEFAULT_ENHANCEMENT_TIMEOUT_SECS, 1, 600),

            image_generation_timeout: env.secs(
                "IMAGE_GENERATION_TIMEOUT_SECS",
                DEFAULT_IMAGE_GENERATION_TIMEOUT_SECS,
                1,
                3600,
            ),
            video_generation_timeout: env.secs(
                "VIDEO_GENERATION_TIMEOUT_SECS",
                DEFAULT_VIDEO_GENERATION_TIMEOUT_SECS,
                1,
                4 * 3600,
            ),
            image_poll_interval: Duration::from_millis(env.number(
                "IMAGE_POLL_INTERVAL_MS",
                DEFAULT_IMAGE_POLL_INTERVAL_MS,
                MIN_POLL_INTERVAL_MS,
                600_000,
            )),
            video_poll_interval: Duration::from_millis(env.number(
                "VIDEO_POLL_INTERVAL_MS",
                DEFAULT_VIDEO_POLL_INTERVAL_MS,
                MIN_POLL_INTERVAL_MS,
                600_000,
            )),
            image_download_timeout: env.secs(
                "IMAGE_DOWNLOAD_TIMEOUT_SECS",
                DEFAULT_IMAGE_DOWNLOAD_TIMEOUT_SECS,
                1,
                3600,
            ),
            video_download_timeout: env.secs(
                "VIDEO_DOWNLOAD_TIMEOUT_SECS",
                DEFAULT_VIDEO_DOWNLOAD_TIMEOUT_SECS,
                1,
                4 * 3600,
            ),
            cancel_on_timeout: env.flag("CANCEL_ON_TIMEOUT", defaults.cancel_on_timeout),

            max_concurrent_generations: env.number(
                "MAX_CONCURRENT_GENERATIONS",
                DEFAULT_MAX_CONCURRENT_GENERATIONS as u64,
                1,
                10_000,
            ) as usize,
            max_concurrent_downloads: env.number(
                "MAX_CONCURRENT_DOWNLOADS",
                DEFAULT_MAX_CONCURRENT_DOWNLOADS as u64,
                1,
                10_000,
            ) as usize,

            artifact_root: env
                .get("ARTIFACT_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_root),
            artifact_max_age: Duration::from_secs(
                env.number("ARTIFACT_MAX_AGE_HOURS", DEFAULT_ARTIFACT_MAX_AGE_HOURS, 1, 24 * 365) * 3600,
            ),
            retention_check_interval: env.secs(
                "RETENTION_CHECK_INTERVAL_SECS",
                DEFAULT_RETENTION_CHECK_INTERVAL_SECS,
                1,
                7 * 86400,
            ),
        }
    }

    /// Reject combinations the service cannot run with.
    pub fn validate(&self) -> PrismResult<()> {
        if self.max_concurrent_generations == 0 {
            return Err(PrismError::config(
                "MAX_CONCURRENT_GENERATIONS",
                "must be at least 1",
            ));
        }
        if self.max_concurrent_downloads == 0 {
            return Err(PrismError::config(
                "MAX_CONCURRENT_DOWNLOADS",
                "must be at least 1",
            ));
        }
        if self.enhancement_cache_capacity == 0 {
            return Err(PrismError::config(
                "ENHANCEMENT_CACHE_CAPACITY",
                "must be at least 1",
            ));
        }
        if self.min_prompt_chars == 0 || self.min_prompt_chars > self.max_prompt_chars {
            return Err(PrismError::config(
                "MIN_PROMPT_LENGTH",
                format!(
                    "must be between 1 and MAX_PROMPT_LENGTH ({})",
                    self.max_prompt_chars
                ),
            ));
        }
        if self.image_poll_interval.is_zero() || self.video_poll_interval.is_zero() {
            return Err(PrismError::config("POLL_INTERVAL_MS", "must be positive"));
        }
        self.size_policy()?;
        Ok(())
    }

    // ========================================================================
    // Derived settings
    // ========================================================================

    pub fn size_policy(&self) -> PrismResult<SizePolicy> {
        SizePolicy::new(
            &self.image_default_size,
            &self.video_default_size,
            self.video_default_duration,
        )
        .map_err(|e| PrismError::config("default size/duration", e.to_string()))
    }

    pub fn prompt_bounds(&self) -> PromptBounds {
        PromptBounds {
            min_chars: self.min_prompt_chars,
            max_chars: self.max_prompt_chars,
        }
    }

    pub fn task_client_config(&self) -> TaskClientConfig {
        TaskClientConfig {
            cancel_on_timeout: self.cancel_on_timeout,
            ..Default::default()
        }
    }

    pub fn poll_timing(&self, kind: MediaKind) -> PollTiming {
        match kind {
            MediaKind::Image => PollTiming::new(self.image_poll_interval, self.image_generation_timeout),
            MediaKind::Video => PollTiming::new(self.video_poll_interval, self.video_generation_timeout),
        }
    }

    pub fn download_timeout(&self, kind: MediaKind) -> Duration {
        match kind {
            MediaKind::Image => self.image_download_timeout,
            MediaKind::Video => self.video_download_timeout,
        }
    }

    pub fn default_watermark(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Image => self.image_watermark,
            MediaKind::Video => self.video_watermark,
        }
    }

    pub fn default_prompt_extend(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Image => self.image_prompt_extend,
            MediaKind::Video => self.video_prompt_extend,
        }
    }

    pub fn model(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Image => &self.image_model,
            MediaKind::Video => &self.video_model,
        }
    }

    /// Public link for a path relative to the artifact root.
    pub fn public_url(&self, relative: &str) -> String {
        format!("{}/{}", self.public_base_url, relative.trim_start_matches('/'))
    }

    pub fn bind_addr(&self) -> PrismResult<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| PrismError::config("HOST", format!("invalid bind address {}: {}", addr, e)))
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }
}

// ============================================================================
// ENVIRONMENT PARSING
// ============================================================================

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            None => default,
            Some(raw) => match raw.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => true,
                "false" | "0" | "no" | "off" => false,
                _ => {
                    tracing::warn!(key, value = %raw, default, "unrecognized boolean, using default");
                    default
                }
            },
        }
    }

    fn number(&self, key: &str, default: u64, min: u64, max: u64) -> u64 {
        let Some(raw) = self.get(key) else {
            return default;
        };
        match raw.parse::<u64>() {
            Ok(value) if value < min || value > max => {
                let clamped = value.clamp(min, max);
                tracing::warn!(key, value, min, max, clamped, "setting out of range, clamped");
                clamped
            }
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, default, "setting is not a number, using default");
                default
            }
        }
    }

    fn secs(&self, key: &str, default: u64, min: u64, max: u64) -> Duration {
        Duration::from_secs(self.number(key, default, min, max))
    }

    /// A value in `[0, 1]`.
    fn ratio(&self, key: &str, default: f64) -> f64 {
        let Some(raw) = self.get(key) else {
            return default;
        };
        match raw.parse::<f64>() {
            Ok(value) if value.is_nan() => {
                tracing::warn!(key, value = %raw, default, "setting is not a number, using default");
                default
            }
            Ok(value) if !(0.0..=1.0).contains(&value) => {
                let clamped = value.clamp(0.0, 1.0);
                tracing::warn!(key, value, clamped, "setting out of range, clamped");
                clamped
            }
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, default, "setting is not a number, using default");
                default
            }
        }
    }
}
