//! Main configuration types.
//!
//! This module provides the top-level [`SolonConfig`] struct and its builder.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use solon_authz::FailMode;

use crate::{
    AuthorizationConfig, ConfigError, ContractConfig, DecisionPointKind, LogFormat, ResponseMode,
    ServerConfig, TelemetrySection, ValidationConfig,
};

/// Complete Solon server configuration.
///
/// This is the root configuration type that contains all configuration sections.
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use solon_config::SolonConfig;
///
/// let config = SolonConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SolonConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Telemetry configuration (metrics, tracing, logging).
    #[serde(default)]
    pub telemetry: TelemetrySection,

    /// Authorization configuration.
    #[serde(default)]
    pub authorization: AuthorizationConfig,

    /// Request and response validation configuration.
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Contract document location.
    #[serde(default)]
    pub contract: ContractConfig,
}

impl SolonConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use solon_config::{ServerConfig, SolonConfig};
    ///
    /// let config = SolonConfig::builder()
    ///     .server(ServerConfig {
    ///         http_addr: "127.0.0.1:3000".to_string(),
    ///         ..Default::default()
    ///     })
    ///     .build();
    ///
    /// assert_eq!(config.server.http_addr, "127.0.0.1:3000");
    /// ```
    #[must_use]
    pub fn builder() -> SolonConfigBuilder {
        SolonConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] or [`ConfigError::MissingField`] when:
    /// - the server or metrics address does not parse
    /// - a timeout is zero
    /// - the sampling ratio is outside 0.0..=1.0
    /// - the `http` decision point has no endpoint
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_addr("server.http_addr", &self.server.http_addr)?;

        if self.server.shutdown_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "server.shutdown_timeout_secs",
                "must be greater than zero",
            ));
        }

        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_ms",
                "must be greater than zero",
            ));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }

        if self.telemetry.metrics.enabled {
            parse_addr("telemetry.metrics.addr", &self.telemetry.metrics.addr)?;
        }

        if !(0.0..=1.0).contains(&self.telemetry.tracing.sampling_ratio) {
            return Err(ConfigError::invalid_value(
                "telemetry.tracing.sampling_ratio",
                "must be between 0.0 and 1.0",
            ));
        }

        if self.authorization.timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "authorization.timeout_ms",
                "must be greater than zero",
            ));
        }

        if self.authorization.decision_point == DecisionPointKind::Http {
            let endpoint = match self.authorization.endpoint.as_deref() {
                None | Some("") => {
                    return Err(ConfigError::missing_field("authorization.endpoint"));
                }
                Some(endpoint) => endpoint,
            };
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ConfigError::invalid_value(
                    "authorization.endpoint",
                    format!("expected an http(s) URL, got '{endpoint}'"),
                ));
            }
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// - Pretty, debug-level logs with source locations
    /// - Allow-all authorization, failing open
    /// - Response mismatches observed, never enforced
    ///
    /// # Example
    ///
    /// ```
    /// use solon_config::SolonConfig;
    ///
    /// let config = SolonConfig::development();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.server.http_addr = "127.0.0.1:8080".to_string();

        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config.telemetry.logging.include_location = true;
        config.telemetry.environment = "development".to_string();

        config.authorization.decision_point = DecisionPointKind::AllowAll;
        config.authorization.fail_mode = FailMode::Open;
        config.authorization.timeout_ms = 2_000;

        config.validation.response_mode = ResponseMode::Observe;

        config
    }

    /// Create a production configuration preset.
    ///
    /// - JSON logs at info level, Prometheus exporter on
    /// - RBAC authorization, failing closed with a 250ms budget
    /// - Response mismatches enforced
    ///
    /// # Example
    ///
    /// ```
    /// use solon_config::{LogFormat, SolonConfig};
    ///
    /// let config = SolonConfig::production();
    /// assert_eq!(config.telemetry.logging.format, LogFormat::Json);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.telemetry.logging.level = "info".to_string();
        config.telemetry.logging.format = LogFormat::Json;
        config.telemetry.environment = "production".to_string();
        config.telemetry.metrics.enabled = true;

        config.authorization.decision_point = DecisionPointKind::Rbac;
        config.authorization.fail_mode = FailMode::Closed;
        config.authorization.timeout_ms = 250;

        config.validation.validate_responses = true;
        config.validation.response_mode = ResponseMode::Strict;

        config
    }
}

fn parse_addr(field: &str, value: &str) -> Result<SocketAddr, ConfigError> {
    value
        .parse::<SocketAddr>()
        .map_err(|_| ConfigError::invalid_value(field, format!("invalid socket address: {value}")))
}

/// Builder for [`SolonConfig`].
#[derive(Debug, Default)]
pub struct SolonConfigBuilder {
    server: Option<ServerConfig>,
    telemetry: Option<TelemetrySection>,
    authorization: Option<AuthorizationConfig>,
    validation: Option<ValidationConfig>,
    contract: Option<ContractConfig>,
}

impl SolonConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server configuration.
    #[must_use]
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.server = Some(server);
        self
    }

    /// Set the telemetry configuration.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetrySection) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Set the authorization configuration.
    #[must_use]
    pub fn authorization(mut self, authorization: AuthorizationConfig) -> Self {
        self.authorization = Some(authorization);
        self
    }

    /// Set the validation configuration.
    #[must_use]
    pub fn validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Set the contract configuration.
    #[must_use]
    pub fn contract(mut self, contract: ContractConfig) -> Self {
        self.contract = Some(contract);
        self
    }

    /// Build the configuration.
    ///
    /// Any unset sections will use their default values.
    #[must_use]
    pub fn build(self) -> SolonConfig {
        SolonConfig {
            server: self.server.unwrap_or_default(),
            telemetry: self.telemetry.unwrap_or_default(),
            authorization: self.authorization.unwrap_or_default(),
            validation: self.validation.unwrap_or_default(),
            contract: self.contract.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<SolonConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MetricsConfig, TracingConfig};

    #[test]
    fn test_default_config() {
        let config = SolonConfig::default();
        assert_eq!(config.server.http_addr, "0.0.0.0:8080");
        assert_eq!(config.telemetry.service_name, "solon-service");
        assert_eq!(config.authorization.timeout_ms, 1_000);
        assert_eq!(config.validation.response_mode, ResponseMode::Observe);
        assert!(config.contract.path.is_none());
    }

    #[test]
    fn test_builder_all_sections() {
        let config = SolonConfig::builder()
            .server(ServerConfig {
                http_addr: "127.0.0.1:3000".to_string(),
                ..Default::default()
            })
            .telemetry(TelemetrySection {
                service_name: "users".to_string(),
                ..Default::default()
            })
            .authorization(AuthorizationConfig {
                decision_point: DecisionPointKind::DenyAll,
                ..Default::default()
            })
            .validation(ValidationConfig {
                response_mode: ResponseMode::Strict,
                ..Default::default()
            })
            .contract(ContractConfig {
                path: Some("contract.json".to_string()),
            })
            .build();

        assert_eq!(config.server.http_addr, "127.0.0.1:3000");
        assert_eq!(config.telemetry.service_name, "users");
        assert_eq!(config.authorization.decision_point, DecisionPointKind::DenyAll);
        assert_eq!(config.validation.response_mode, ResponseMode::Strict);
        assert_eq!(config.contract.path.as_deref(), Some("contract.json"));
    }

    #[test]
    fn test_validate_default_config() {
        assert!(SolonConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_server_addr() {
        let config = SolonConfig::builder()
            .server(ServerConfig {
                http_addr: "not-an-address".to_string(),
                ..Default::default()
            })
            .build();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("http_addr"));
    }

    #[test]
    fn test_validate_zero_timeouts() {
        let config = SolonConfig::builder()
            .authorization(AuthorizationConfig {
                timeout_ms: 0,
                ..Default::default()
            })
            .build();
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("authorization.timeout_ms"));

        let config = SolonConfig::builder()
            .server(ServerConfig {
                request_timeout_ms: 0,
                ..Default::default()
            })
            .build();
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("request_timeout_ms"));

        let config = SolonConfig::builder()
            .server(ServerConfig {
                shutdown_timeout_secs: 0,
                ..Default::default()
            })
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_metrics_addr_only_when_enabled() {
        let disabled = SolonConfig::builder()
            .telemetry(TelemetrySection {
                metrics: MetricsConfig {
                    enabled: false,
                    addr: "invalid".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            })
            .build();
        assert!(disabled.validate().is_ok());

        let enabled = SolonConfig::builder()
            .telemetry(TelemetrySection {
                metrics: MetricsConfig {
                    enabled: true,
                    addr: "invalid".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            })
            .build();
        let err = enabled.validate().unwrap_err();
        assert!(err.to_string().contains("metrics.addr"));
    }

    #[test]
    fn test_validate_invalid_sampling_ratio() {
        let config = SolonConfig::builder()
            .telemetry(TelemetrySection {
                tracing: TracingConfig {
                    sampling_ratio: 1.5,
                    ..Default::default()
                },
                ..Default::default()
            })
            .build();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sampling_ratio"));
    }

    #[test]
    fn test_validate_http_decision_point_needs_endpoint() {
        let missing = SolonConfig::builder()
            .authorization(AuthorizationConfig {
                decision_point: DecisionPointKind::Http,
                endpoint: None,
                ..Default::default()
            })
            .build();
        let err = missing.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { .. }));
        assert!(err.to_string().contains("authorization.endpoint"));

        let not_http = SolonConfig::builder()
            .authorization(AuthorizationConfig {
                decision_point: DecisionPointKind::Http,
                endpoint: Some("policy:8181".to_string()),
                ..Default::default()
            })
            .build();
        assert!(not_http.validate().is_err());

        let valid = SolonConfig::builder()
            .authorization(AuthorizationConfig {
                decision_point: DecisionPointKind::Http,
                endpoint: Some("http://localhost:8181/v1/decide".to_string()),
                ..Default::default()
            })
            .build();
        assert!(valid.validate().is_ok());
    }

    #[test]
    fn test_development_preset() {
        let config = SolonConfig::development();
        assert_eq!(config.telemetry.logging.level, "debug");
        assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);
        assert_eq!(config.authorization.decision_point, DecisionPointKind::AllowAll);
        assert_eq!(config.authorization.fail_mode, FailMode::Open);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_preset() {
        let config = SolonConfig::production();
        assert_eq!(config.telemetry.logging.format, LogFormat::Json);
        assert_eq!(config.authorization.fail_mode, FailMode::Closed);
        assert_eq!(config.authorization.timeout_ms, 250);
        assert_eq!(config.validation.response_mode, ResponseMode::Strict);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_build_validated_failure() {
        let result = SolonConfig::builder()
            .server(ServerConfig {
                http_addr: "invalid".to_string(),
                ..Default::default()
            })
            .build_validated();

        assert!(result.is_err());
    }

    #[test]
    fn test_toml_round_trip_sections() {
        let config = SolonConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[authorization]"));
        assert!(toml_str.contains("[validation]"));
    }

    #[test]
    fn test_unknown_section_rejected() {
        let toml_str = r#"
            [server]
            http_addr = "127.0.0.1:8000"

            [cors]
            enabled = true
        "#;

        let result: Result<SolonConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }
}
