//! Error types for the authorization crate.

use std::time::Duration;
use thiserror::Error;

/// Result type for authorization operations.
pub type AuthzResult<T> = Result<T, AuthzError>;

/// Errors a decision point can report.
///
/// Every variant means "no decision was obtained". The gate turns all of them
/// into the configured failure behavior; none of them is ever a deny.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthzError {
    /// The decision point could not be reached.
    #[error("decision point unreachable: {0}")]
    Unreachable(String),

    /// The decision point answered with a non-success status.
    #[error("decision point returned status {status}")]
    Status {
        /// HTTP status returned.
        status: u16,
    },

    /// The decision point answered with a body that is not a decision.
    #[error("invalid decision response: {0}")]
    InvalidResponse(String),

    /// The decision point did not answer in time.
    #[error("decision point timed out after {0:?}")]
    Timeout(Duration),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AuthzError {
    /// Create an unreachable error.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable(message.into())
    }

    /// Check if this error is worth retrying on a later request.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Timeout(_) | Self::Status { .. })
    }

    /// Label used in logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unreachable(_) => "unreachable",
            Self::Status { .. } => "status",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Timeout(_) => "timeout",
            Self::Config(_) => "config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_error() {
        assert!(AuthzError::unreachable("connection refused").is_retryable());
        assert!(AuthzError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!AuthzError::InvalidResponse("not json".to_string()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = AuthzError::Status { status: 502 };
        assert_eq!(err.to_string(), "decision point returned status 502");
        assert_eq!(err.kind(), "status");
    }
}
