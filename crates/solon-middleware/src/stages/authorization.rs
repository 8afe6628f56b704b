//! Authorization stage.
//!
//! Runs after validation, so the decision point sees typed path parameters
//! as resource attributes:
//!
//! ```text
//! Identity → Validation → [Authorization] → Dispatch
//! ```
//!
//! Anonymous callers of operations that declare scopes are rejected with
//! 401 before the decision point is consulted. Otherwise the gate's
//! decision is recorded on the request context and enforced: a deny is a
//! 403, an unavailable decision point under fail-closed is a 503.

use solon_authz::{AuthorizationGate, DecisionQuery};
use solon_core::{Operation, ParamValues, RequestContext, SolonError, SolonResult};

/// Applies the authorization gate to one request.
#[derive(Debug)]
pub struct AuthorizationStage {
    gate: AuthorizationGate,
}

impl AuthorizationStage {
    /// Wraps a configured gate.
    #[must_use]
    pub fn new(gate: AuthorizationGate) -> Self {
        Self { gate }
    }

    /// Returns the underlying gate.
    #[must_use]
    pub fn gate(&self) -> &AuthorizationGate {
        &self.gate
    }

    /// Authorizes the caller recorded in `ctx` for `operation`.
    ///
    /// `path` is the concrete request path and `resource` the typed path
    /// parameters.
    pub async fn authorize(
        &self,
        ctx: &RequestContext,
        operation: &Operation,
        path: &str,
        resource: ParamValues,
    ) -> SolonResult<()> {
        let identity = ctx.identity().cloned().unwrap_or_default();
        AuthorizationGate::require_identity(&identity, operation)?;

        let query = DecisionQuery::new(identity, operation, path).with_resource(resource);
        let decision = self.gate.authorize(&query).await;

        let outcome = AuthorizationGate::enforce(&decision);
        ctx.set_decision(decision)
            .map_err(|e| SolonError::handler(operation.id(), e))?;
        outcome
    }
}
