//! Metrics definitions for the notes gateway.
//!
//! All metrics follow Prometheus naming conventions:
//! - `gateway_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded. Subjects and note ids never appear as labels:
//! - `method`: HTTP methods
//! - `endpoint`: parameterized paths, unknown paths become `/other`
//! - `status`: success, error, timeout
//! - `reason`: [`AuthError`](crate::errors::AuthError) labels
//! - `decision`: admitted, throttled, bypassed

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used by
/// the `/metrics` endpoint.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g. already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("gateway_http_request".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `gateway_http_requests_total`, `gateway_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("gateway_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("gateway_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Replace dynamic path segments with placeholders.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/health" | "/metrics" | "/api/me" | "/api/notes" | "/api/notes/latest"
        | "/api/auth/login" | "/api/auth/register" => path.to_string(),
        _ => {
            let mut parts = path.split('/').skip(1);
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some("api"), Some("notes"), Some(_), None) => "/api/notes/{id}".to_string(),
                _ => "/other".to_string(),
            }
        }
    }
}

// ============================================================================
// Authentication & Admission Metrics
// ============================================================================

/// Record a rejected authentication attempt.
///
/// Metric: `gateway_auth_failures_total`
/// Labels: `reason`
pub fn record_auth_failure(reason: &'static str) {
    counter!("gateway_auth_failures_total", "reason" => reason).increment(1);
}

/// Record an admission decision for an authenticated request.
///
/// Metric: `gateway_admission_decisions_total`
/// Labels: `decision`
pub fn record_admission_decision(decision: &'static str) {
    counter!("gateway_admission_decisions_total", "decision" => decision).increment(1);
}

/// Set the current number of live rate-limit buckets.
///
/// Metric: `gateway_rate_limit_buckets`
#[allow(clippy::cast_precision_loss)] // bucket counts stay far below 2^52
pub fn set_rate_limit_buckets(count: usize) {
    gauge!("gateway_rate_limit_buckets").set(count as f64);
}

/// Record a successfully issued token.
///
/// Metric: `gateway_tokens_issued_total`
pub fn record_token_issued() {
    counter!("gateway_tokens_issued_total").increment(1);
}
