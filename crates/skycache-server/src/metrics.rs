//! Prometheus metrics for skycache.
//!
//! This module provides:
//! - HTTP request metrics (count, latency)
//! - Cache metrics (hits, misses, backend errors)
//! - Provider metrics (calls by outcome, latency)
//! - Admission metrics (allowed, denied, failed open)

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

    // Cache metrics
    pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";
    pub const CACHE_ERRORS_TOTAL: &str = "cache_errors_total";

    // Provider metrics
    pub const PROVIDER_REQUESTS_TOTAL: &str = "provider_requests_total";
    pub const PROVIDER_REQUEST_DURATION_SECONDS: &str = "provider_request_duration_seconds";

    // Admission metrics
    pub const ADMISSION_DECISIONS_TOTAL: &str = "admission_decisions_total";
}

/// Initialize the Prometheus metrics exporter.
///
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::debug!("Prometheus metrics already initialized");
        return false;
    }

    // Pull-based: /metrics renders the handle
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                tracing::warn!("Failed to store Prometheus handle (already set)");
                return false;
            }

            tracing::info!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            false
        }
    }
}

/// Render all metrics in Prometheus text format.
///
/// Returns `None` if metrics were not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

// =============================================================================
// HTTP Metrics
// =============================================================================

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    counter!(
        names::HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status_class" => status_class(status)
    )
    .increment(1);

    histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration.as_secs_f64());
}

fn status_class(status: u16) -> &'static str {
    match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

// =============================================================================
// Cache Metrics
// =============================================================================

pub fn record_cache_hit(backend: &'static str) {
    counter!(names::CACHE_HITS_TOTAL, "backend" => backend).increment(1);
}

pub fn record_cache_miss(backend: &'static str) {
    counter!(names::CACHE_MISSES_TOTAL, "backend" => backend).increment(1);
}

/// Record a cache backend failure (`op` is "get" or "set").
pub fn record_cache_error(backend: &'static str, op: &'static str) {
    counter!(names::CACHE_ERRORS_TOTAL, "backend" => backend, "op" => op).increment(1);
}

// =============================================================================
// Provider Metrics
// =============================================================================

/// Record an upstream call. `outcome` is one of "ok", "not_found",
/// "status", "timeout", "network", "invalid_body".
pub fn record_provider_request(outcome: &'static str, duration: Duration) {
    counter!(names::PROVIDER_REQUESTS_TOTAL, "outcome" => outcome).increment(1);
    histogram!(names::PROVIDER_REQUEST_DURATION_SECONDS).record(duration.as_secs_f64());
}

// =============================================================================
// Admission Metrics
// =============================================================================

/// `decision` is one of "allowed", "denied", "fail_open".
pub fn record_admission(decision: &'static str) {
    counter!(names::ADMISSION_DECISIONS_TOTAL, "decision" => decision).increment(1);
}
