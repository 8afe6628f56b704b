//! Typed configuration for Solon servers.
//!
//! Configuration is built around [`SolonConfig`]:
//!
//! - [`ServerConfig`] - bind address, timeouts, body limit
//! - [`TelemetrySection`] - metrics, tracing, logging
//! - [`AuthorizationConfig`] - decision point, timeout, failure mode
//! - [`ValidationConfig`] - response checking
//! - [`ContractConfig`] - contract document location
//!
//! Every section rejects unknown keys. [`ConfigLoader`] layers defaults, a
//! TOML or JSON file, a `.env` file and `PREFIX__SECTION__KEY` environment
//! variables, then validates the result.
//!
//! # Example
//!
//! ```no_run
//! use solon_config::ConfigLoader;
//!
//! # fn main() -> Result<(), solon_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_production()
//!     .with_optional_file("solon.toml")?
//!     .with_dotenv()?
//!     .with_env_prefix("SOLON")
//!     .load()?;
//!
//! println!("Listening on {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! request_timeout_ms = 30000
//! max_body_bytes = 1048576
//!
//! [telemetry]
//! service_name = "users"
//! environment = "production"
//!
//! [telemetry.logging]
//! level = "info"
//! format = "json"
//!
//! [authorization]
//! decision_point = "http"
//! endpoint = "http://localhost:8181/v1/decide"
//! timeout_ms = 250
//! fail_mode = "closed"
//!
//! [validation]
//! response_mode = "strict"
//!
//! [contract]
//! path = "contract.toml"
//! ```
//!
//! # Environment Variable Overrides
//!
//! - `SOLON__SERVER__HTTP_ADDR=0.0.0.0:9000`
//! - `SOLON__AUTHORIZATION__FAIL_MODE=open`
//! - `SOLON__TELEMETRY__LOGGING__LEVEL=debug`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{SolonConfig, SolonConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
