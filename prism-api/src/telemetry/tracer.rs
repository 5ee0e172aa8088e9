//! Tracing Subscriber Initialization
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and either
//! JSON (default) or human-readable output.

use crate::constants::{DEFAULT_LOG_FILTER, SERVICE_NAME};
use prism_core::{PrismError, PrismResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "pretty" | "text" | "plain" => Some(LogFormat::Pretty),
            _ => None,
        }
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Output format (`PRISM_LOG_FORMAT`)
    pub log_format: LogFormat,
    /// Filter directives used when `RUST_LOG` is unset
    pub default_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: SERVICE_NAME.to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_format: LogFormat::Json,
            default_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl TelemetryConfig {
    pub fn from_env() -> Self {
        let log_format = std::env::var("PRISM_LOG_FORMAT")
            .ok()
            .and_then(|s| LogFormat::parse(&s))
            .unwrap_or(LogFormat::Json);
        Self {
            log_format,
            ..Default::default()
        }
    }
}

/// Initialize the tracing subscriber.
///
/// Call once at startup before anything logs. `RUST_LOG` overrides the
/// configured default filter.
pub fn init_tracing(config: &TelemetryConfig) -> PrismResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    installed.map_err(|e| PrismError::internal(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = config.service_name,
        service_version = config.service_version,
        log_format = ?config.log_format,
        "Telemetry initialized"
    );
    Ok(())
}
