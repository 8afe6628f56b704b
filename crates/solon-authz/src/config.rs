//! Configuration for the authorization gate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default per-call timeout for decision point queries.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// What the gate does when no decision can be obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailMode {
    /// Deny with `policy-unavailable`, surfaced as 503.
    #[default]
    Closed,
    /// Allow, with a warning log and a metric.
    Open,
}

/// Configuration for the authorization gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Maximum time to wait for a decision. Always applied.
    pub timeout: Duration,
    /// Behavior when the decision point is unreachable, fails, or times out.
    pub fail_mode: FailMode,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            fail_mode: FailMode::Closed,
        }
    }
}

impl GateConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the failure behavior.
    pub fn with_fail_mode(mut self, fail_mode: FailMode) -> Self {
        self.fail_mode = fail_mode;
        self
    }

    /// Create a production configuration.
    pub fn production() -> Self {
        Self {
            timeout: Duration::from_millis(250),
            fail_mode: FailMode::Closed,
        }
    }

    /// Create a development configuration.
    pub fn development() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            fail_mode: FailMode::Open,
        }
    }
}
