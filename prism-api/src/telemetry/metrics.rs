//! Prometheus Metrics Definitions
//!
//! Defines all Prism metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prism_core::{PrismError, PrismResult};
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, Encoder,
    GaugeVec, HistogramVec, TextEncoder,
};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Generation latency buckets (seconds), from quick images to long videos.
const GENERATION_LATENCY_BUCKETS: &[f64] = &[
    1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0, 180.0, 300.0, 600.0, 900.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<PrismResult<PrismMetrics>> = Lazy::new(PrismMetrics::new);

/// Container for all Prism metrics.
#[derive(Clone)]
pub struct PrismMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Generation outcomes - labels: kind, outcome
    pub generations_total: CounterVec,

    /// Submit-to-terminal latency - labels: kind
    pub generation_duration_seconds: HistogramVec,

    /// Bytes written to the artifact store - labels: kind
    pub download_bytes_total: CounterVec,

    /// Enhancement cache lookups - labels: result (hit/miss/failed)
    pub enhancement_lookups_total: CounterVec,

    /// Held admission slots - labels: slot
    pub admission_in_flight: GaugeVec,

    /// Artifacts removed by retention - labels: trigger
    pub artifacts_removed_total: CounterVec,
}

fn registration(name: &str, e: prometheus::Error) -> PrismError {
    PrismError::internal(format!("Failed to register {}: {}", name, e))
}

impl PrismMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> PrismResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "prism_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "prism_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration("http_request_duration_seconds", e))?,

            generations_total: register_counter_vec!(
                "prism_generations_total",
                "Generation jobs by media kind and outcome",
                &["kind", "outcome"]
            )
            .map_err(|e| registration("generations_total", e))?,

            generation_duration_seconds: register_histogram_vec!(
                "prism_generation_duration_seconds",
                "Time from submission to a terminal provider state",
                &["kind"],
                GENERATION_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration("generation_duration_seconds", e))?,

            download_bytes_total: register_counter_vec!(
                "prism_download_bytes_total",
                "Bytes of generated artifacts stored locally",
                &["kind"]
            )
            .map_err(|e| registration("download_bytes_total", e))?,

            enhancement_lookups_total: register_counter_vec!(
                "prism_enhancement_lookups_total",
                "Prompt enhancement lookups by result",
                &["result"]
            )
            .map_err(|e| registration("enhancement_lookups_total", e))?,

            admission_in_flight: register_gauge_vec!(
                "prism_admission_in_flight",
                "Admission slots currently held",
                &["slot"]
            )
            .map_err(|e| registration("admission_in_flight", e))?,

            artifacts_removed_total: register_counter_vec!(
                "prism_artifacts_removed_total",
                "Stored artifacts removed",
                &["trigger"]
            )
            .map_err(|e| registration("artifacts_removed_total", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record a finished generation attempt.
    pub fn record_generation(&self, kind: &str, outcome: &str, duration_secs: Option<f64>) {
        self.generations_total
            .with_label_values(&[kind, outcome])
            .inc();
        if let Some(secs) = duration_secs {
            self.generation_duration_seconds
                .with_label_values(&[kind])
                .observe(secs);
        }
    }

    pub fn record_download(&self, kind: &str, bytes: u64) {
        self.download_bytes_total
            .with_label_values(&[kind])
            .inc_by(bytes as f64);
    }

    pub fn record_enhancement(&self, result: &str) {
        self.enhancement_lookups_total
            .with_label_values(&[result])
            .inc();
    }

    pub fn admission_acquired(&self, slot: &str) {
        self.admission_in_flight.with_label_values(&[slot]).inc();
    }

    pub fn admission_released(&self, slot: &str) {
        self.admission_in_flight.with_label_values(&[slot]).dec();
    }

    pub fn record_artifacts_removed(&self, trigger: &str, count: u64) {
        self.artifacts_removed_total
            .with_label_values(&[trigger])
            .inc_by(count as f64);
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
))]
pub async fn metrics_handler() -> impl IntoResponse {
    // Touch the registry so every metric family is present on first scrape.
    let _ = METRICS.as_ref();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
