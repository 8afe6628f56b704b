//! Prometheus metrics for Solon.
//!
//! This module provides Prometheus-format metrics collection and exposure.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `solon_requests_total` | Counter | `operation`, `status`, `outcome` | Total requests |
//! | `solon_request_duration_seconds` | Histogram | `operation` | Request latency |
//! | `solon_in_flight_requests` | Gauge | - | In-flight requests |
//! | `solon_authz_decisions_total` | Counter | `decision` | Authorization decisions |
//! | `solon_validation_failures_total` | Counter | `kind` | Validation failures |
//! | `solon_lifecycle_hook_failures_total` | Counter | `phase` | Failed lifecycle hooks |
//!
//! Recording functions are safe to call before [`init_metrics`]; the
//! `metrics` facade discards observations until a recorder is installed.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Request counter name.
pub const REQUESTS_TOTAL: &str = "solon_requests_total";
/// Request latency histogram name.
pub const REQUEST_DURATION_SECONDS: &str = "solon_request_duration_seconds";
/// In-flight gauge name.
pub const IN_FLIGHT_REQUESTS: &str = "solon_in_flight_requests";
/// Authorization decision counter name.
pub const AUTHZ_DECISIONS_TOTAL: &str = "solon_authz_decisions_total";
/// Validation failure counter name.
pub const VALIDATION_FAILURES_TOTAL: &str = "solon_validation_failures_total";
/// Lifecycle hook failure counter name.
pub const LIFECYCLE_HOOK_FAILURES_TOTAL: &str = "solon_lifecycle_hook_failures_total";

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Address to expose metrics on (e.g., "0.0.0.0:9090").
    pub addr: String,

    /// Service name for metric labels.
    pub service_name: String,

    /// Histogram buckets for request duration.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
            service_name: "solon".to_string(),
            // 1ms .. 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Initializes the metrics subsystem.
///
/// Installs the Prometheus recorder with an HTTP listener on
/// `config.addr`. Calling it again after a successful install fails, since
/// only one global recorder may exist.
///
/// # Errors
///
/// Returns `TelemetryError::MetricsInit` if initialization fails.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    let handle = PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", config.service_name.clone())
        .set_buckets_for_metric(
            Matcher::Full(REQUEST_DURATION_SECONDS.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::InvalidConfig(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);

    register_metric_descriptions();

    Ok(())
}

/// Renders metrics in Prometheus format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(REQUESTS_TOTAL, "Total number of requests by terminal outcome");
    describe_histogram!(REQUEST_DURATION_SECONDS, "Request duration in seconds");
    describe_gauge!(IN_FLIGHT_REQUESTS, "Number of requests currently being processed");
    describe_counter!(AUTHZ_DECISIONS_TOTAL, "Total authorization decisions by result");
    describe_counter!(VALIDATION_FAILURES_TOTAL, "Total validation failures by kind");
    describe_counter!(
        LIFECYCLE_HOOK_FAILURES_TOTAL,
        "Total failed lifecycle hooks by phase"
    );
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Records a finished request.
///
/// # Arguments
///
/// * `operation` - The operation ID, or `"unmatched"` when routing failed
/// * `status_code` - HTTP status code
/// * `outcome` - `"completed"` or `"rejected"`
/// * `duration` - Request duration
pub fn record_request(operation: &str, status_code: u16, outcome: &str, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status_code.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(REQUEST_DURATION_SECONDS, "operation" => operation.to_string())
        .record(duration.as_secs_f64());
}

/// Records an authorization decision (`allow`, `deny`, `unavailable`,
/// `fail_open`).
pub fn record_authz_decision(decision: &str) {
    counter!(AUTHZ_DECISIONS_TOTAL, "decision" => decision.to_string()).increment(1);
}

/// Records a validation failure (`request` or `response`).
pub fn record_validation_failure(kind: &str) {
    counter!(VALIDATION_FAILURES_TOTAL, "kind" => kind.to_string()).increment(1);
}

/// Records a failed lifecycle hook (`startup` or `shutdown`).
pub fn record_hook_failure(phase: &str) {
    counter!(LIFECYCLE_HOOK_FAILURES_TOTAL, "phase" => phase.to_string()).increment(1);
}

/// Guard that tracks one in-flight request.
///
/// Increments the gauge on creation and decrements it on drop, so a
/// cancelled request still leaves the gauge balanced.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Creates a new guard and increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT_REQUESTS).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT_REQUESTS).decrement(1.0);
    }
}
