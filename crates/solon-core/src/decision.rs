//! Authorization decisions.

use serde::{Deserialize, Serialize};

/// Reason recorded when the decision point could not be consulted.
pub const POLICY_UNAVAILABLE: &str = "policy-unavailable";

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AuthorizationDecision {
    /// The request may proceed.
    Allow,
    /// The request is refused.
    Deny {
        /// Why the request was refused.
        reason: String,
    },
}

impl AuthorizationDecision {
    /// Creates a deny decision.
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::Deny {
            reason: reason.into(),
        }
    }

    /// Creates the deny decision used when no decision could be obtained.
    #[must_use]
    pub fn unavailable() -> Self {
        Self::deny(POLICY_UNAVAILABLE)
    }

    /// Returns `true` if the decision allows the request.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Returns `true` for the decision produced by [`unavailable`](Self::unavailable).
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Deny { reason } if reason == POLICY_UNAVAILABLE)
    }

    /// Label used in metrics and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny { .. } => "deny",
        }
    }
}
