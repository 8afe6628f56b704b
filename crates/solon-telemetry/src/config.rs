//! Telemetry configuration.
//!
//! A [`ServiceIdentity`] names the emitting service once. [`TelemetryConfig`]
//! stamps that name onto the logging and metrics settings so log lines,
//! metric labels and exported spans always agree on who produced them.

use crate::logging::LogConfig;
use crate::metrics::MetricsConfig;
use crate::tracing::TracingConfig;

/// The service a process reports telemetry as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    /// Service name.
    pub name: String,

    /// Service version, when the deployment declares one.
    pub version: Option<String>,

    /// Deployment environment (development, staging, production).
    pub environment: String,
}

impl ServiceIdentity {
    /// Identifies `name` in the development environment, without a version.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            environment: "development".to_string(),
        }
    }

    /// Sets the service version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the deployment environment.
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }
}

/// Settings for [`init_telemetry`](crate::init_telemetry).
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// The reporting service.
    pub service: ServiceIdentity,

    /// Log subscriber settings.
    pub logging: LogConfig,

    /// Prometheus exporter settings.
    pub metrics: MetricsConfig,

    /// OTLP span export settings.
    pub tracing: TracingConfig,
}

impl TelemetryConfig {
    /// Default subsystem settings for `service`: JSON logs, no exporter,
    /// no span export.
    #[must_use]
    pub fn new(service: ServiceIdentity) -> Self {
        Self {
            service,
            logging: LogConfig::default(),
            metrics: MetricsConfig::default(),
            tracing: TracingConfig::default(),
        }
        .stamped()
    }

    /// Replaces the logging settings.
    #[must_use]
    pub fn with_logging(mut self, logging: LogConfig) -> Self {
        self.logging = logging;
        self.stamped()
    }

    /// Replaces the metrics settings.
    #[must_use]
    pub fn with_metrics(mut self, metrics: MetricsConfig) -> Self {
        self.metrics = metrics;
        self.stamped()
    }

    /// Replaces the span export settings.
    #[must_use]
    pub fn with_tracing(mut self, tracing: TracingConfig) -> Self {
        self.tracing = tracing;
        self
    }

    fn stamped(mut self) -> Self {
        self.logging.service_name.clone_from(&self.service.name);
        self.metrics.service_name.clone_from(&self.service.name);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_defaults() {
        let service = ServiceIdentity::new("users");
        assert_eq!(service.name, "users");
        assert_eq!(service.version, None);
        assert_eq!(service.environment, "development");

        let service = service.with_version("2.0.0").with_environment("production");
        assert_eq!(service.version.as_deref(), Some("2.0.0"));
        assert_eq!(service.environment, "production");
    }

    #[test]
    fn test_new_stamps_service_name() {
        let config = TelemetryConfig::new(ServiceIdentity::new("users"));

        assert_eq!(config.logging.service_name, "users");
        assert_eq!(config.metrics.service_name, "users");
        assert!(!config.metrics.enabled);
        assert!(!config.tracing.enabled);
    }

    #[test]
    fn test_replaced_sections_keep_service_name() {
        let config = TelemetryConfig::new(ServiceIdentity::new("orders"))
            .with_logging(LogConfig {
                json_format: false,
                ..LogConfig::default()
            })
            .with_metrics(MetricsConfig {
                enabled: true,
                addr: "127.0.0.1:9999".to_string(),
                ..MetricsConfig::default()
            });

        assert_eq!(config.logging.service_name, "orders");
        assert!(!config.logging.json_format);
        assert_eq!(config.metrics.service_name, "orders");
        assert_eq!(config.metrics.addr, "127.0.0.1:9999");
    }

    #[test]
    fn test_with_tracing() {
        let config = TelemetryConfig::new(ServiceIdentity::new("orders"))
            .with_tracing(TracingConfig::otlp("http://collector:4317", 0.5));

        assert!(config.tracing.enabled);
        assert_eq!(config.tracing.otlp_endpoint, "http://collector:4317");
    }
}
