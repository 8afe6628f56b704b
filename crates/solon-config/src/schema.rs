//! Configuration schema types.
//!
//! This module defines the structure of all configuration sections. Every
//! section rejects unknown keys and fills omitted keys with defaults.

use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use solon_authz::{FailMode, GateConfig};
use solon_telemetry::{
    tracing::DEFAULT_OTLP_ENDPOINT, LogConfig, MetricsConfig as TelemetryMetrics, ServiceIdentity,
    TelemetryConfig, TracingConfig as OtlpConfig,
};

/// Server configuration section.
///
/// # Example
///
/// ```
/// use solon_config::ServerConfig;
///
/// let config = ServerConfig {
///     http_addr: "127.0.0.1:8080".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(config.max_body_bytes, 1024 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// HTTP server bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Request timeout in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Largest request body accepted, in bytes. Larger bodies get 413.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// Graceful shutdown timeout as a [`Duration`].
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Enable the Prometheus exporter.
    #[serde(default)]
    pub enabled: bool,

    /// Prometheus metrics endpoint address.
    #[serde(default = "default_metrics_addr")]
    pub addr: String,

    /// Histogram bucket boundaries for request duration.
    #[serde(default = "default_histogram_buckets")]
    pub histogram_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_metrics_addr(),
            histogram_buckets: default_histogram_buckets(),
        }
    }
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_histogram_buckets() -> Vec<f64> {
    vec![
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ]
}

/// Tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TracingConfig {
    /// Enable OTLP span export.
    #[serde(default)]
    pub enabled: bool,

    /// OTLP exporter endpoint (e.g., `http://localhost:4317`).
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// Sampling ratio (0.0 to 1.0). 1.0 means sample all traces.
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: None,
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

fn default_sampling_ratio() -> f64 {
    1.0
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log filter (a level such as `info`, or directives such as
    /// `solon_middleware=debug`).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telemetry configuration section.
///
/// Controls all observability features: metrics, tracing, and logging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    /// Service name for telemetry identification.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Service version.
    #[serde(default)]
    pub service_version: Option<String>,

    /// Deployment environment (e.g., "development", "staging", "production").
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Tracing configuration.
    #[serde(default)]
    pub tracing: TracingConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TelemetrySection {
    /// Converts the section into the settings `solon-telemetry` initializes
    /// from.
    pub fn to_telemetry_config(&self) -> TelemetryConfig {
        let mut service =
            ServiceIdentity::new(&self.service_name).with_environment(&self.environment);
        if let Some(version) = &self.service_version {
            service = service.with_version(version);
        }

        let config = TelemetryConfig::new(service)
            .with_metrics(TelemetryMetrics {
                enabled: self.metrics.enabled,
                addr: self.metrics.addr.clone(),
                duration_buckets: self.metrics.histogram_buckets.clone(),
                ..TelemetryMetrics::default()
            })
            .with_logging(LogConfig {
                enabled: self.logging.enabled,
                level: self.logging.level.clone(),
                json_format: self.logging.format == LogFormat::Json,
                file_line_info: self.logging.include_location,
                ..LogConfig::default()
            });

        if !self.tracing.enabled {
            return config;
        }
        let endpoint = self
            .tracing
            .otlp_endpoint
            .as_deref()
            .unwrap_or(DEFAULT_OTLP_ENDPOINT);
        config.with_tracing(OtlpConfig::otlp(endpoint, self.tracing.sampling_ratio))
    }
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            service_version: None,
            environment: default_environment(),
            metrics: MetricsConfig::default(),
            tracing: TracingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_service_name() -> String {
    "solon-service".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

/// Which decision point the server wires behind the authorization gate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DecisionPointKind {
    /// Allow all requests (development only).
    AllowAll,
    /// Deny all requests.
    DenyAll,
    /// Role-based access control over the `roles` and `allow_anonymous`
    /// grants.
    #[default]
    Rbac,
    /// Remote policy service reached over HTTP.
    Http,
}

impl DecisionPointKind {
    /// Lowercase name as it appears in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllowAll => "allow_all",
            Self::DenyAll => "deny_all",
            Self::Rbac => "rbac",
            Self::Http => "http",
        }
    }
}

/// Authorization configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuthorizationConfig {
    /// Per-decision timeout in milliseconds. Must be non-zero.
    #[serde(default = "default_authz_timeout")]
    pub timeout_ms: u64,

    /// Behavior when no decision can be obtained.
    #[serde(default)]
    pub fail_mode: FailMode,

    /// Decision point behind the gate.
    #[serde(default)]
    pub decision_point: DecisionPointKind,

    /// Policy service endpoint, required for the `http` decision point.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Operations anonymous callers may invoke under `rbac`.
    #[serde(default)]
    pub allow_anonymous: Vec<String>,

    /// Role grants under `rbac`: role name to operation ids, `"*"` for all.
    ///
    /// ```toml
    /// [authorization.roles]
    /// admin = ["*"]
    /// reader = ["getUser", "listUsers"]
    /// ```
    #[serde(default)]
    pub roles: IndexMap<String, Vec<String>>,
}

impl AuthorizationConfig {
    /// Gate settings derived from this section.
    pub fn gate_config(&self) -> GateConfig {
        GateConfig::new()
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_fail_mode(self.fail_mode)
    }
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_authz_timeout(),
            fail_mode: FailMode::Closed,
            decision_point: DecisionPointKind::default(),
            endpoint: None,
            allow_anonymous: Vec::new(),
            roles: IndexMap::new(),
        }
    }
}

fn default_authz_timeout() -> u64 {
    1_000
}

/// How a response that does not match its declared schema is treated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Log and count the mismatch, send the response unchanged.
    #[default]
    Observe,
    /// Replace the response with a 500.
    Strict,
}

/// Validation configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ValidationConfig {
    /// Check handler responses against declared response schemas.
    #[serde(default = "default_true")]
    pub validate_responses: bool,

    /// Mismatch handling when response checking is on.
    #[serde(default)]
    pub response_mode: ResponseMode,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            validate_responses: true,
            response_mode: ResponseMode::Observe,
        }
    }
}

/// Contract configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct ContractConfig {
    /// Contract document path (`.json` or `.toml`).
    #[serde(default)]
    pub path: Option<String>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, "0.0.0.0:8080");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_body_bytes, 1_048_576);
    }

    #[test]
    fn test_server_config_deserialize() {
        let toml = r#"
            http_addr = "127.0.0.1:3000"
            max_body_bytes = 4096
        "#;
        let config: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.http_addr, "127.0.0.1:3000");
        assert_eq!(config.max_body_bytes, 4096);
        // Defaults applied
        assert_eq!(config.shutdown_timeout_secs, 30);
    }

    #[test]
    fn test_server_config_unknown_field_rejected() {
        let toml = r#"
            http_addr = "127.0.0.1:3000"
            max_connections = 10
        "#;
        let result: Result<ServerConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_format_deserialize() {
        let format: LogFormat = serde_json::from_str(r#""pretty""#).unwrap();
        assert_eq!(format, LogFormat::Pretty);
        assert!(serde_json::from_str::<LogFormat>(r#""xml""#).is_err());
    }

    #[test]
    fn test_authorization_defaults_fail_closed() {
        let config = AuthorizationConfig::default();
        assert_eq!(config.fail_mode, FailMode::Closed);
        assert_eq!(config.decision_point, DecisionPointKind::Rbac);

        let gate = config.gate_config();
        assert_eq!(gate.timeout, Duration::from_secs(1));
        assert_eq!(gate.fail_mode, FailMode::Closed);
    }

    #[test]
    fn test_authorization_deserialize() {
        let toml = r#"
            timeout_ms = 200
            fail_mode = "open"
            decision_point = "http"
            endpoint = "http://policy:8181/decide"
        "#;
        let config: AuthorizationConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.decision_point, DecisionPointKind::Http);
        assert_eq!(config.gate_config().timeout, Duration::from_millis(200));
        assert_eq!(config.gate_config().fail_mode, FailMode::Open);
        assert_eq!(config.decision_point.as_str(), "http");
    }

    #[test]
    fn test_response_mode_deserialize() {
        let config: ValidationConfig = toml::from_str(r#"response_mode = "strict""#).unwrap();
        assert_eq!(config.response_mode, ResponseMode::Strict);
        assert!(config.validate_responses);
    }

    #[test]
    fn test_telemetry_conversion() {
        let section = TelemetrySection {
            service_name: "users".to_string(),
            service_version: Some("2.1.0".to_string()),
            metrics: MetricsConfig {
                enabled: true,
                ..Default::default()
            },
            tracing: TracingConfig {
                enabled: true,
                otlp_endpoint: Some("http://collector:4317".to_string()),
                sampling_ratio: 0.25,
            },
            logging: LoggingConfig {
                format: LogFormat::Pretty,
                ..Default::default()
            },
            ..Default::default()
        };

        let config = section.to_telemetry_config();
        assert_eq!(config.service.name, "users");
        assert_eq!(config.service.version.as_deref(), Some("2.1.0"));
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.service_name, "users");
        assert!(config.tracing.enabled);
        assert_eq!(config.tracing.otlp_endpoint, "http://collector:4317");
        assert!((config.tracing.sample_ratio - 0.25).abs() < f64::EPSILON);
        assert!(!config.logging.json_format);
    }

    #[test]
    fn test_telemetry_conversion_keeps_tracing_off() {
        let config = TelemetrySection::default().to_telemetry_config();
        assert!(!config.tracing.enabled);
        assert_eq!(config.service.name, "solon-service");
        assert_eq!(config.service.version, None);
        assert_eq!(config.logging.service_name, "solon-service");
    }
}
