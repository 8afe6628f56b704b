//! OpenTelemetry span export for Solon.
//!
//! Span export over OTLP/gRPC is optional and off by default. The request
//! pipeline propagates W3C trace ids on its own; this module only wires the
//! exporter and the global tracer provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use solon_telemetry::{init_tracing, ServiceIdentity, TracingConfig};
//!
//! let config = TracingConfig::otlp("http://collector:4317", 0.1);
//! let provider = init_tracing(&config, &ServiceIdentity::new("users"))?;
//! ```

use crate::config::ServiceIdentity;
use crate::error::TelemetryError;
use crate::TelemetryResult;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{Sampler, TracerProvider};
use opentelemetry_sdk::Resource;
use opentelemetry_semantic_conventions::attribute::{SERVICE_NAME, SERVICE_VERSION};

/// Collector address used when none is configured.
pub const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";

const DEPLOYMENT_ENVIRONMENT: &str = "deployment.environment";

/// Span export settings.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Whether spans are exported.
    pub enabled: bool,

    /// OTLP/gRPC collector endpoint.
    pub otlp_endpoint: String,

    /// Fraction of traces sampled, clamped to `0.0..=1.0`.
    pub sample_ratio: f64,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: DEFAULT_OTLP_ENDPOINT.to_string(),
            sample_ratio: 1.0,
        }
    }
}

impl TracingConfig {
    /// Export enabled towards `endpoint`.
    #[must_use]
    pub fn otlp(endpoint: impl Into<String>, sample_ratio: f64) -> Self {
        Self {
            enabled: true,
            otlp_endpoint: endpoint.into(),
            sample_ratio,
        }
    }
}

/// Installs the global tracer provider exporting to `config.otlp_endpoint`.
///
/// Returns `None` when export is disabled. Must run inside a Tokio runtime;
/// the batch exporter spawns onto it.
///
/// # Errors
///
/// Returns `TelemetryError::TracingInit` if the exporter cannot be built.
pub fn init_tracing(
    config: &TracingConfig,
    service: &ServiceIdentity,
) -> TelemetryResult<Option<TracerProvider>> {
    if !config.enabled {
        return Ok(None);
    }

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(config.otlp_endpoint.as_str())
        .build()
        .map_err(|e| TelemetryError::TracingInit(format!("{}: {e}", config.otlp_endpoint)))?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_sampler(sampler_for(config.sample_ratio))
        .with_resource(service_resource(service))
        .build();
    global::set_tracer_provider(provider.clone());

    ::tracing::debug!(
        endpoint = %config.otlp_endpoint,
        sample_ratio = config.sample_ratio,
        "OTLP span export enabled"
    );
    Ok(Some(provider))
}

fn service_resource(service: &ServiceIdentity) -> Resource {
    let mut attributes = vec![
        KeyValue::new(SERVICE_NAME, service.name.clone()),
        KeyValue::new(DEPLOYMENT_ENVIRONMENT, service.environment.clone()),
    ];
    if let Some(version) = &service.version {
        attributes.push(KeyValue::new(SERVICE_VERSION, version.clone()));
    }
    Resource::new(attributes)
}

fn sampler_for(ratio: f64) -> Sampler {
    match ratio.clamp(0.0, 1.0) {
        r if r >= 1.0 => Sampler::AlwaysOn,
        r if r <= 0.0 => Sampler::AlwaysOff,
        r => Sampler::TraceIdRatioBased(r),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::{Key, Value};

    #[test]
    fn test_default_is_disabled() {
        let config = TracingConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.otlp_endpoint, DEFAULT_OTLP_ENDPOINT);
    }

    #[test]
    fn test_sampler_selection() {
        assert!(matches!(sampler_for(1.0), Sampler::AlwaysOn));
        assert!(matches!(sampler_for(3.0), Sampler::AlwaysOn));
        assert!(matches!(sampler_for(0.0), Sampler::AlwaysOff));
        assert!(matches!(sampler_for(-1.0), Sampler::AlwaysOff));
        assert!(matches!(sampler_for(0.25), Sampler::TraceIdRatioBased(r) if (r - 0.25).abs() < f64::EPSILON));
    }

    #[test]
    fn test_resource_omits_missing_version() {
        let resource = service_resource(&ServiceIdentity::new("users"));
        assert_eq!(
            resource.get(Key::from_static_str(SERVICE_NAME)),
            Some(Value::from("users"))
        );
        assert_eq!(
            resource.get(Key::from_static_str(DEPLOYMENT_ENVIRONMENT)),
            Some(Value::from("development"))
        );
        assert_eq!(resource.get(Key::from_static_str(SERVICE_VERSION)), None);

        let resource = service_resource(&ServiceIdentity::new("users").with_version("2.1.0"));
        assert_eq!(
            resource.get(Key::from_static_str(SERVICE_VERSION)),
            Some(Value::from("2.1.0"))
        );
    }

    #[test]
    fn test_disabled_tracing() {
        let provider = init_tracing(&TracingConfig::default(), &ServiceIdentity::new("users"));
        assert!(provider.unwrap().is_none());
    }
}
