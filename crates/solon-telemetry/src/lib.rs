//! Observability for Solon services.
//!
//! This crate provides:
//!
//! - **Logging**: `tracing-subscriber` setup with JSON or pretty output
//! - **Metrics**: Prometheus-format metrics via the `metrics` crate
//! - **Tracing**: optional OpenTelemetry span export over OTLP
//! - **Emitters**: the [`TelemetryEmitter`] sink that receives one record per
//!   finished request
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     RequestPipeline                       │
//! │                          │ one TelemetryRecord            │
//! │                          ▼                                │
//! │                  TelemetryEmitter                         │
//! │            ┌─────────────┴─────────────┐                  │
//! │            ▼                           ▼                  │
//! │     tracing (logs)             metrics (counters)         │
//! └────────────┼───────────────────────────┼──────────────────┘
//!              ▼                           ▼
//!        ┌──────────┐               ┌──────────┐
//!        │ stdout   │               │Prometheus│
//!        │ JSON     │               │ /metrics │
//!        └──────────┘               └──────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use solon_telemetry::{init_telemetry, MetricsConfig, ServiceIdentity, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = ServiceIdentity::new("users-service").with_version("1.0.0");
//!     let config = TelemetryConfig::new(service).with_metrics(MetricsConfig {
//!         enabled: true,
//!         ..MetricsConfig::default()
//!     });
//!
//!     let _guard = init_telemetry(config).expect("telemetry");
//! }
//! ```
//!
//! # Metrics Endpoint
//!
//! ```text
//! # TYPE solon_requests_total counter
//! solon_requests_total{operation="getUser",status="200",outcome="completed"} 1234
//! solon_requests_total{operation="getUser",status="403",outcome="rejected"} 56
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod emitter;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod tracing;

pub use config::{ServiceIdentity, TelemetryConfig};
pub use emitter::{LogEmitter, RecordingEmitter, TelemetryEmitter, TelemetryRecord, TerminalState};
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use metrics::{init_metrics, render_metrics, InFlightGuard, MetricsConfig};
pub use tracing::{init_tracing, TracingConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Guard that flushes and shuts down the tracer provider on drop.
///
/// Keep it alive for the lifetime of the application.
pub struct TelemetryGuard {
    tracer_provider: Option<opentelemetry_sdk::trace::TracerProvider>,
}

impl TelemetryGuard {
    /// Creates a new telemetry guard.
    #[must_use]
    pub fn new(tracer_provider: Option<opentelemetry_sdk::trace::TracerProvider>) -> Self {
        Self { tracer_provider }
    }

    /// Returns `true` if span export is active.
    #[must_use]
    pub fn is_exporting(&self) -> bool {
        self.tracer_provider.is_some()
    }
}

impl std::fmt::Debug for TelemetryGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryGuard")
            .field("exporting", &self.is_exporting())
            .finish()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            for result in provider.force_flush() {
                if let Err(e) = result {
                    eprintln!("Error flushing tracer provider: {e}");
                }
            }
            if let Err(e) = provider.shutdown() {
                eprintln!("Error shutting down tracer provider: {e}");
            }
        }
    }
}

/// Initializes logging, metrics and tracing, in that order.
///
/// # Errors
///
/// Returns `TelemetryError` if any subsystem fails to initialize.
pub fn init_telemetry(config: TelemetryConfig) -> TelemetryResult<TelemetryGuard> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    let tracer_provider = init_tracing(&config.tracing, &config.service)?;

    ::tracing::info!(
        service = %config.service.name,
        version = config.service.version.as_deref(),
        environment = %config.service.environment,
        metrics = config.metrics.enabled,
        tracing = config.tracing.enabled,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard::new(tracer_provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_guard_without_provider() {
        let guard = TelemetryGuard::new(None);
        assert!(!guard.is_exporting());
        drop(guard);
    }

    #[test]
    fn test_init_with_everything_disabled() {
        let config = TelemetryConfig::new(ServiceIdentity::new("test-service")).with_logging(
            LogConfig {
                enabled: false,
                ..LogConfig::default()
            },
        );

        let guard = init_telemetry(config).unwrap();
        assert!(!guard.is_exporting());
    }
}
