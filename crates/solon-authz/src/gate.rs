//! The authorization gate.
//!
//! The gate wraps a [`DecisionPoint`] with the mandatory timeout and the
//! fail-closed / fail-open policy:
//!
//! | Decision point result | Gate result |
//! |---|---|
//! | `Allow` | `Allow` |
//! | `Deny{reason}` | `Deny{reason}` |
//! | error or timeout, fail-closed | `Deny{"policy-unavailable"}` |
//! | error or timeout, fail-open | `Allow`, logged at `warn` |

use std::sync::Arc;
use std::time::Instant;

use solon_core::{AuthorizationDecision, Identity, Operation, SolonError, SolonResult};
use solon_telemetry::metrics::record_authz_decision;
use tracing::{debug, warn};

use crate::config::{FailMode, GateConfig};
use crate::decision_point::{DecisionPoint, DecisionQuery};
use crate::error::AuthzError;

/// Enforcement boundary between the pipeline and a decision point.
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    point: Arc<dyn DecisionPoint>,
    config: GateConfig,
}

impl AuthorizationGate {
    /// Creates a gate with the default configuration (1s, fail-closed).
    pub fn new(point: impl DecisionPoint) -> Self {
        Self::with_config(point, GateConfig::default())
    }

    /// Creates a gate with an explicit configuration.
    pub fn with_config(point: impl DecisionPoint, config: GateConfig) -> Self {
        Self {
            point: Arc::new(point),
            config,
        }
    }

    /// Creates a gate around an already shared decision point.
    pub fn from_shared(point: Arc<dyn DecisionPoint>, config: GateConfig) -> Self {
        Self { point, config }
    }

    /// Returns the gate configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Returns the name of the wrapped decision point.
    pub fn decision_point(&self) -> &'static str {
        self.point.name()
    }

    /// Rejects anonymous callers of operations that declare scopes.
    ///
    /// Runs before the decision point is consulted.
    pub fn require_identity(identity: &Identity, operation: &Operation) -> SolonResult<()> {
        if operation.requires_identity() && identity.is_anonymous() {
            return Err(SolonError::authentication_missing(operation.id()));
        }
        Ok(())
    }

    /// Obtains a decision, applying the timeout and the failure mode.
    ///
    /// Never fails: an unobtainable decision becomes either the
    /// `policy-unavailable` deny or, when failing open, an allow.
    pub async fn authorize(&self, query: &DecisionQuery) -> AuthorizationDecision {
        let started = Instant::now();
        let outcome =
            match tokio::time::timeout(self.config.timeout, self.point.decide(query)).await {
                Ok(result) => result,
                Err(_) => Err(AuthzError::Timeout(self.config.timeout)),
            };

        match outcome {
            Ok(decision) => {
                debug!(
                    operation_id = %query.operation_id,
                    decision_point = self.point.name(),
                    decision = decision.as_str(),
                    elapsed_us = started.elapsed().as_micros() as u64,
                    "Authorization decided"
                );
                record_authz_decision(decision.as_str());
                decision
            }
            Err(error) => self.unavailable(query, &error),
        }
    }

    fn unavailable(&self, query: &DecisionQuery, error: &AuthzError) -> AuthorizationDecision {
        match self.config.fail_mode {
            FailMode::Closed => {
                warn!(
                    operation_id = %query.operation_id,
                    decision_point = self.point.name(),
                    error = %error,
                    "Decision point unavailable, denying"
                );
                record_authz_decision("unavailable");
                AuthorizationDecision::unavailable()
            }
            FailMode::Open => {
                warn!(
                    operation_id = %query.operation_id,
                    decision_point = self.point.name(),
                    error = %error,
                    "Decision point unavailable, failing open"
                );
                record_authz_decision("fail_open");
                AuthorizationDecision::Allow
            }
        }
    }

    /// Converts a decision into the pipeline outcome.
    ///
    /// `policy-unavailable` maps to [`SolonError::PolicyUnavailable`], any
    /// other deny to [`SolonError::AuthorizationDenied`].
    pub fn enforce(decision: &AuthorizationDecision) -> SolonResult<()> {
        match decision {
            AuthorizationDecision::Allow => Ok(()),
            AuthorizationDecision::Deny { reason } if decision.is_unavailable() => {
                Err(SolonError::policy_unavailable(reason.clone()))
            }
            AuthorizationDecision::Deny { reason } => {
                Err(SolonError::authorization_denied(reason.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision_point::{AllowAll, DenyAll};
    use futures_util::future::BoxFuture;
    use http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Decision point that never answers.
    #[derive(Debug)]
    struct Hanging;

    impl DecisionPoint for Hanging {
        fn name(&self) -> &'static str {
            "hanging"
        }

        fn decide<'a>(
            &'a self,
            _query: &'a DecisionQuery,
        ) -> BoxFuture<'a, crate::AuthzResult<AuthorizationDecision>> {
            Box::pin(futures_util::future::pending())
        }
    }

    /// Decision point that always errors and counts calls.
    #[derive(Debug, Default)]
    struct Broken {
        calls: AtomicUsize,
    }

    impl DecisionPoint for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn decide<'a>(
            &'a self,
            _query: &'a DecisionQuery,
        ) -> BoxFuture<'a, crate::AuthzResult<AuthorizationDecision>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(std::future::ready(Err(AuthzError::unreachable(
                "connection refused",
            ))))
        }
    }

    fn operation(scoped: bool) -> Operation {
        let builder = Operation::builder("getUser").path("/users/{userId}");
        let builder = if scoped { builder.scope("users:read") } else { builder };
        builder.build().unwrap()
    }

    fn query() -> DecisionQuery {
        DecisionQuery::new(Identity::user("u-1", ["user"]), &operation(false), "/users/1")
    }

    #[tokio::test]
    async fn test_allow_passes_through() {
        let gate = AuthorizationGate::new(AllowAll);
        let decision = gate.authorize(&query()).await;
        assert!(decision.is_allowed());
        assert!(AuthorizationGate::enforce(&decision).is_ok());
    }

    #[tokio::test]
    async fn test_deny_maps_to_forbidden() {
        let gate = AuthorizationGate::new(DenyAll);
        let decision = gate.authorize(&query()).await;
        assert!(!decision.is_unavailable());

        let err = AuthorizationGate::enforce(&decision).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.error_code(), "AUTHORIZATION_DENIED");
    }

    #[tokio::test]
    async fn test_error_fails_closed_by_default() {
        let gate = AuthorizationGate::new(Broken::default());
        let decision = gate.authorize(&query()).await;
        assert!(decision.is_unavailable());

        let err = AuthorizationGate::enforce(&decision).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_code(), "POLICY_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_error_fails_open_when_configured() {
        let gate = AuthorizationGate::with_config(
            Broken::default(),
            GateConfig::new().with_fail_mode(FailMode::Open),
        );
        assert!(gate.authorize(&query()).await.is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_unavailable() {
        let gate = AuthorizationGate::with_config(
            Hanging,
            GateConfig::new().with_timeout(Duration::from_millis(20)),
        );
        let decision = gate.authorize(&query()).await;
        assert!(decision.is_unavailable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_open_when_configured() {
        let gate = AuthorizationGate::with_config(
            Hanging,
            GateConfig::new()
                .with_timeout(Duration::from_millis(20))
                .with_fail_mode(FailMode::Open),
        );
        assert!(gate.authorize(&query()).await.is_allowed());
    }

    #[test]
    fn test_require_identity() {
        let scoped = operation(true);
        let err = AuthorizationGate::require_identity(&Identity::Anonymous, &scoped).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        assert!(AuthorizationGate::require_identity(&Identity::api_key("k"), &scoped).is_ok());
        assert!(AuthorizationGate::require_identity(&Identity::Anonymous, &operation(false)).is_ok());
    }

    #[tokio::test]
    async fn test_shared_decision_point_is_consulted_once_per_call() {
        let broken = Arc::new(Broken::default());
        let gate = AuthorizationGate::from_shared(broken.clone(), GateConfig::default());
        gate.authorize(&query()).await;
        gate.authorize(&query()).await;
        assert_eq!(broken.calls.load(Ordering::SeqCst), 2);
    }
}
