//! Server error type.

use std::io;
use std::net::SocketAddr;

use solon_authz::AuthzError;
use solon_config::ConfigError;
use solon_core::SolonError;
use thiserror::Error;

use crate::lifecycle::LifecycleError;

/// Errors raised while assembling, starting or serving an application.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The configured bind address does not parse.
    #[error("invalid address '{addr}': {reason}")]
    InvalidAddress {
        /// Address as configured.
        addr: String,
        /// Parse failure.
        reason: String,
    },

    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Contract, routing or binding failure during assembly.
    #[error(transparent)]
    Assembly(#[from] SolonError),

    /// The decision point could not be built.
    #[error(transparent)]
    Authz(#[from] AuthzError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Startup or shutdown failed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Transport I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
