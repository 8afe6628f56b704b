//! Pipeline stages.
//!
//! The stages run in a fixed order that cannot be changed or disabled:
//!
//! 1. [`request_id`], [`tracing`] and [`identity`]: correlation, trace
//!    context and caller identity
//! 2. [`validation`]: typed parameters and request body
//! 3. [`authorization`]: the decision point
//! 4. [`dispatch`]: the bound handler
//! 5. response check, also in [`validation`]
//! 6. [`telemetry`]: one record per terminal state
//!
//! [`error_normalization`] turns any failure into the JSON error envelope.

pub mod authorization;
pub mod dispatch;
pub mod error_normalization;
pub mod identity;
pub mod request_id;
pub mod telemetry;
pub mod tracing;
pub mod validation;

pub use authorization::AuthorizationStage;
pub use dispatch::Dispatcher;
pub use error_normalization::error_response;
pub use identity::IdentityResolver;
pub use request_id::{EchoHeaders, RequestIdStage};
pub use telemetry::TelemetryStage;
pub use tracing::TraceContext;
pub use validation::{ResponseValidationMode, ValidatedParams, Validator};

/// A stage that can bring a request to a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Correlation, trace and identity resolution.
    Identity,
    /// Request validation.
    Validation,
    /// Authorization.
    Authorization,
    /// Handler dispatch.
    Dispatch,
    /// Response schema check.
    ResponseCheck,
}

impl Stage {
    /// Returns the stage name used in telemetry.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Validation => "validation",
            Self::Authorization => "authorization",
            Self::Dispatch => "dispatch",
            Self::ResponseCheck => "response_check",
        }
    }

    /// Returns all stages in execution order.
    #[must_use]
    pub const fn all() -> [Stage; 5] {
        [
            Self::Identity,
            Self::Validation,
            Self::Authorization,
            Self::Dispatch,
            Self::ResponseCheck,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        let stages = Stage::all();
        assert!(stages.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(stages[1], Stage::Validation);
        assert_eq!(stages[2], Stage::Authorization);
    }
}
