//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, files, `.env` files, and environment variables.

use std::env;
use std::fs;
use std::path::Path;

use serde_json::Value;
use solon_authz::FailMode;
use tracing::debug;

use crate::{ConfigError, DecisionPointKind, LogFormat, ResponseMode, SolonConfig};

/// Configuration loader with layered approach.
///
/// The loader applies configuration in layers, with later layers overriding
/// earlier ones:
/// 1. Default values (or a preset)
/// 2. Configuration file (TOML or JSON)
/// 3. A `.env` file, which only fills variables the process does not set
/// 4. Environment variables named `PREFIX__SECTION__KEY`
///
/// A file only overrides the keys it mentions; everything else keeps the
/// value from the layer below.
///
/// # Example
///
/// ```no_run
/// use solon_config::ConfigLoader;
///
/// # fn main() -> Result<(), solon_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("solon.toml")?
///     .with_dotenv()?
///     .with_env_prefix("SOLON")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: SolonConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SolonConfig::default(),
            env_prefix: None,
        }
    }

    /// Start with default configuration values.
    ///
    /// This is called automatically by `new()`, but can be chained for clarity.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = SolonConfig::default();
        self
    }

    /// Start with the development preset.
    ///
    /// # Example
    ///
    /// ```
    /// use solon_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_development()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = SolonConfig::development();
        self
    }

    /// Start with the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = SolonConfig::production();
        self
    }

    /// Layer a configuration file over the current values.
    ///
    /// The format is chosen by extension: `.toml` or `.json`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing or unreadable, has an
    /// unsupported extension, fails to parse, or contains unknown fields.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        debug!(path = %path.display(), "Loading configuration file");
        self.with_string(&content, &format)
    }

    /// Layer an optional configuration file.
    ///
    /// If the file does not exist, the loader continues unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Layer configuration from a string in the given format (`toml` or
    /// `json`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or the format is unknown.
    ///
    /// # Example
    ///
    /// ```
    /// use solon_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [server]
    ///     http_addr = "127.0.0.1:3000"
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.server.http_addr, "127.0.0.1:3000");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        // Parse strictly first so unknown keys are reported in the source
        // format, then keep only the keys the document mentions.
        let overlay: Value = match format.to_lowercase().as_str() {
            "toml" => {
                toml::from_str::<SolonConfig>(content)?;
                toml::from_str(content)?
            }
            "json" => {
                serde_json::from_str::<SolonConfig>(content)?;
                serde_json::from_str(content)?
            }
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        let mut base = serde_json::to_value(&self.config)?;
        merge_values(&mut base, overlay);
        self.config = serde_json::from_value(base)?;
        Ok(self)
    }

    /// Load a `.env` file from the current directory or its parents.
    ///
    /// A missing file is not an error. Variables already set in the process
    /// environment are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file exists but is malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }
        Ok(self)
    }

    /// Load a specific `.env` file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file is missing or malformed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "Loaded .env file");
        Ok(self)
    }

    /// Set environment variable prefix for overrides applied by
    /// [`load`](Self::load).
    ///
    /// Environment variables use the format `PREFIX__SECTION__KEY`. For
    /// example, with prefix "SOLON":
    /// - `SOLON__SERVER__HTTP_ADDR=0.0.0.0:9000`
    /// - `SOLON__AUTHORIZATION__FAIL_MODE=open`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Apply overrides from an explicit set of variables, the way
    /// [`load`](Self::load) applies the process environment.
    ///
    /// Variables without the prefix are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvParseError` if a value does not parse.
    pub fn with_env_vars<I, K, V>(mut self, prefix: &str, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.apply_env_overrides(&prefix.to_uppercase(), vars)?;
        Ok(self)
    }

    /// Finalize and return the loaded configuration.
    ///
    /// Applies environment variable overrides (if a prefix was set) and
    /// validates the final configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an environment variable does not parse or
    /// validation fails.
    pub fn load(mut self) -> Result<SolonConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix, env::vars())?;
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Finalize without validation.
    #[must_use]
    pub fn load_unvalidated(self) -> SolonConfig {
        self.config
    }

    fn apply_env_overrides<I, K, V>(&mut self, prefix: &str, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let marker = format!("{prefix}__");
        for (key, value) in vars {
            let key = key.as_ref();
            if let Some(rest) = key.strip_prefix(&marker) {
                self.apply_env_var(key, rest, value.as_ref())?;
            }
        }
        Ok(())
    }

    // Apply a single environment variable; `path` is the key without prefix.
    fn apply_env_var(&mut self, key: &str, path: &str, value: &str) -> Result<(), ConfigError> {
        let parts: Vec<&str> = path.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            // Server section
            ["SERVER", "HTTP_ADDR"] => config.server.http_addr = value.to_string(),
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                config.server.shutdown_timeout_secs = parse_int(key, value)?;
            }
            ["SERVER", "REQUEST_TIMEOUT_MS"] => {
                config.server.request_timeout_ms = parse_int(key, value)?;
            }
            ["SERVER", "MAX_BODY_BYTES"] => config.server.max_body_bytes = parse_int(key, value)?,

            // Telemetry section
            ["TELEMETRY", "SERVICE_NAME"] => config.telemetry.service_name = value.to_string(),
            ["TELEMETRY", "SERVICE_VERSION"] => {
                config.telemetry.service_version = non_empty(value);
            }
            ["TELEMETRY", "ENVIRONMENT"] => config.telemetry.environment = value.to_string(),
            ["TELEMETRY", "METRICS", "ENABLED"] => {
                config.telemetry.metrics.enabled = parse_flag(key, value)?;
            }
            ["TELEMETRY", "METRICS", "ADDR"] => config.telemetry.metrics.addr = value.to_string(),
            ["TELEMETRY", "TRACING", "ENABLED"] => {
                config.telemetry.tracing.enabled = parse_flag(key, value)?;
            }
            ["TELEMETRY", "TRACING", "OTLP_ENDPOINT"] => {
                config.telemetry.tracing.otlp_endpoint = non_empty(value);
            }
            ["TELEMETRY", "TRACING", "SAMPLING_RATIO"] => {
                config.telemetry.tracing.sampling_ratio = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected float"))?;
            }
            ["TELEMETRY", "LOGGING", "ENABLED"] => {
                config.telemetry.logging.enabled = parse_flag(key, value)?;
            }
            ["TELEMETRY", "LOGGING", "LEVEL"] => config.telemetry.logging.level = value.to_string(),
            ["TELEMETRY", "LOGGING", "FORMAT"] => {
                config.telemetry.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }

            // Authorization section
            ["AUTHORIZATION", "TIMEOUT_MS"] => {
                config.authorization.timeout_ms = parse_int(key, value)?;
            }
            ["AUTHORIZATION", "FAIL_MODE"] => {
                config.authorization.fail_mode = match value.to_lowercase().as_str() {
                    "closed" => FailMode::Closed,
                    "open" => FailMode::Open,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'closed' or 'open'",
                        ))
                    }
                };
            }
            ["AUTHORIZATION", "DECISION_POINT"] => {
                config.authorization.decision_point = match value.to_lowercase().as_str() {
                    "allow_all" => DecisionPointKind::AllowAll,
                    "deny_all" => DecisionPointKind::DenyAll,
                    "rbac" => DecisionPointKind::Rbac,
                    "http" => DecisionPointKind::Http,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'allow_all', 'deny_all', 'rbac', or 'http'",
                        ))
                    }
                };
            }
            ["AUTHORIZATION", "ENDPOINT"] => config.authorization.endpoint = non_empty(value),
            ["AUTHORIZATION", "ALLOW_ANONYMOUS"] => {
                config.authorization.allow_anonymous = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
            }
            // Role names arrive uppercased from the environment.
            ["AUTHORIZATION", "ROLES", role] => {
                config.authorization.roles.insert(
                    role.to_lowercase(),
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect(),
                );
            }

            // Validation section
            ["VALIDATION", "VALIDATE_RESPONSES"] => {
                config.validation.validate_responses = parse_flag(key, value)?;
            }
            ["VALIDATION", "RESPONSE_MODE"] => {
                config.validation.response_mode = match value.to_lowercase().as_str() {
                    "observe" => ResponseMode::Observe,
                    "strict" => ResponseMode::Strict,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'observe' or 'strict'",
                        ))
                    }
                };
            }

            // Contract section
            ["CONTRACT", "PATH"] => config.contract.path = non_empty(value),

            _ => debug!(var = key, "Ignoring unrecognized configuration variable"),
        }

        Ok(())
    }
}

/// Overlays `overlay` onto `base`, recursing into objects.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn parse_int<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
