//! Transport settings.
//!
//! [`TransportConfig`] is the resolved form of the `server` configuration
//! section: the bind address parsed, timeouts as [`Duration`]s.
//!
//! ```rust
//! use solon_server::TransportConfig;
//! use std::time::Duration;
//!
//! let config = TransportConfig::builder()
//!     .http_addr("127.0.0.1:3000".parse().unwrap())
//!     .shutdown_timeout(Duration::from_secs(5))
//!     .max_body_bytes(64 * 1024)
//!     .build();
//!
//! assert_eq!(config.http_addr().port(), 3000);
//! assert_eq!(config.max_body_bytes(), 65536);
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ServerError;

/// Default bind address.
pub const DEFAULT_HTTP_ADDR: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 8080);

/// Default drain period on shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Default request body limit.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// HTTP transport settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    http_addr: SocketAddr,
    shutdown_timeout: Duration,
    max_body_bytes: usize,
    keep_alive: bool,
}

impl TransportConfig {
    /// Starts a builder with default values.
    #[must_use]
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }

    /// Resolves the `server` configuration section.
    ///
    /// # Errors
    ///
    /// [`ServerError::InvalidAddress`] if `http_addr` is not a socket address.
    pub fn from_settings(settings: &solon_config::ServerConfig) -> Result<Self, ServerError> {
        let http_addr = settings
            .http_addr
            .parse()
            .map_err(|e| ServerError::InvalidAddress {
                addr: settings.http_addr.clone(),
                reason: format!("{e}"),
            })?;

        Ok(Self::builder()
            .http_addr(http_addr)
            .shutdown_timeout(settings.shutdown_timeout())
            .max_body_bytes(settings.max_body_bytes)
            .build())
    }

    /// Bind address.
    #[must_use]
    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    /// How long open connections may drain after shutdown is triggered.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Largest request body accepted.
    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Whether HTTP/1.1 keep-alive is enabled.
    #[must_use]
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`TransportConfig`].
#[derive(Debug, Clone)]
pub struct TransportConfigBuilder {
    http_addr: SocketAddr,
    shutdown_timeout: Duration,
    max_body_bytes: usize,
    keep_alive: bool,
}

impl Default for TransportConfigBuilder {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            keep_alive: true,
        }
    }
}

impl TransportConfigBuilder {
    /// Sets the bind address.
    pub fn http_addr(mut self, addr: SocketAddr) -> Self {
        self.http_addr = addr;
        self
    }

    /// Sets the drain period.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sets the request body limit.
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Enables or disables keep-alive.
    pub fn keep_alive(mut self, enabled: bool) -> Self {
        self.keep_alive = enabled;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> TransportConfig {
        TransportConfig {
            http_addr: self.http_addr,
            shutdown_timeout: self.shutdown_timeout,
            max_body_bytes: self.max_body_bytes,
            keep_alive: self.keep_alive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.http_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_body_bytes(), 1024 * 1024);
        assert!(config.keep_alive());
    }

    #[test]
    fn test_from_settings() {
        let settings = solon_config::ServerConfig {
            http_addr: "127.0.0.1:9000".to_string(),
            shutdown_timeout_secs: 3,
            max_body_bytes: 512,
            ..Default::default()
        };

        let config = TransportConfig::from_settings(&settings).unwrap();
        assert_eq!(config.http_addr().to_string(), "127.0.0.1:9000");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(3));
        assert_eq!(config.max_body_bytes(), 512);
    }

    #[test]
    fn test_from_settings_rejects_bad_address() {
        let settings = solon_config::ServerConfig {
            http_addr: "localhost".to_string(),
            ..Default::default()
        };

        let err = TransportConfig::from_settings(&settings).unwrap_err();
        assert!(matches!(err, ServerError::InvalidAddress { ref addr, .. } if addr == "localhost"));
    }
}
