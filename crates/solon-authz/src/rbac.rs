//! Role-based decision point.
//!
//! Maps roles to the operations they may invoke. Roles come from
//! [`Identity::roles`]: users carry explicit roles, SPIFFE callers get
//! `spiffe:<trust-domain>`, and API keys get `api_key:<key-id>`.
//!
//! ```rust
//! use solon_authz::RbacDecisionPoint;
//!
//! let rbac = RbacDecisionPoint::builder()
//!     .allow_role("admin", ["*"])
//!     .allow_role("user", ["getUser", "listUsers"])
//!     .allow_anonymous_operations(["health"])
//!     .build();
//! ```

use std::collections::{HashMap, HashSet};

use futures_util::future::BoxFuture;
use solon_core::{AuthorizationDecision, Identity};

use crate::decision_point::{DecisionPoint, DecisionQuery};
use crate::error::AuthzResult;

/// Wildcard granting every operation.
pub const WILDCARD: &str = "*";

/// Role-based access control decision point.
#[derive(Debug, Clone, Default)]
pub struct RbacDecisionPoint {
    /// Maps role names to allowed operation IDs.
    role_permissions: HashMap<String, HashSet<String>>,
    /// Operations allowed for anonymous callers.
    anonymous_operations: HashSet<String>,
    /// Whether anonymous callers may invoke everything.
    allow_anonymous: bool,
}

impl RbacDecisionPoint {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> RbacBuilder {
        RbacBuilder::default()
    }

    /// Evaluates the policy synchronously.
    pub fn evaluate(&self, identity: &Identity, operation_id: &str) -> AuthorizationDecision {
        if identity.is_anonymous() {
            if self.allow_anonymous || self.anonymous_operations.contains(operation_id) {
                return AuthorizationDecision::Allow;
            }
            return AuthorizationDecision::deny("Anonymous access not permitted");
        }

        let roles = identity.roles();
        let permitted = roles.iter().any(|role| {
            self.role_permissions
                .get(role)
                .is_some_and(|ops| ops.contains(WILDCARD) || ops.contains(operation_id))
        });

        if permitted {
            AuthorizationDecision::Allow
        } else {
            AuthorizationDecision::deny(format!(
                "No permission for operation '{operation_id}' with roles {roles:?}"
            ))
        }
    }
}

impl DecisionPoint for RbacDecisionPoint {
    fn name(&self) -> &'static str {
        "rbac"
    }

    fn decide<'a>(
        &'a self,
        query: &'a DecisionQuery,
    ) -> BoxFuture<'a, AuthzResult<AuthorizationDecision>> {
        let decision = self.evaluate(&query.identity, &query.operation_id);
        Box::pin(std::future::ready(Ok(decision)))
    }
}

/// Builder for [`RbacDecisionPoint`].
#[derive(Debug, Default)]
pub struct RbacBuilder {
    inner: RbacDecisionPoint,
}

impl RbacBuilder {
    /// Allows a role to access specific operations.
    ///
    /// Use `["*"]` to allow all operations. Calling it again for the same
    /// role adds to its operations.
    #[must_use]
    pub fn allow_role<S, I>(mut self, role: S, operations: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.inner
            .role_permissions
            .entry(role.into())
            .or_default()
            .extend(operations.into_iter().map(Into::into));
        self
    }

    /// Allows anonymous callers to access specific operations.
    #[must_use]
    pub fn allow_anonymous_operations<I>(mut self, operations: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.inner
            .anonymous_operations
            .extend(operations.into_iter().map(Into::into));
        self
    }

    /// Allows anonymous access to all operations.
    #[must_use]
    pub fn allow_anonymous(mut self) -> Self {
        self.inner.allow_anonymous = true;
        self
    }

    /// Builds the decision point.
    #[must_use]
    pub fn build(self) -> RbacDecisionPoint {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rbac() -> RbacDecisionPoint {
        RbacDecisionPoint::builder()
            .allow_role("admin", ["*"])
            .allow_role("user", ["getUser", "listUsers"])
            .allow_role("spiffe:prod.example.org", ["syncUsers"])
            .allow_role("api_key:reporting", ["listUsers"])
            .build()
    }

    #[test]
    fn test_role_with_permission() {
        let decision = rbac().evaluate(&Identity::user("u-1", ["user"]), "getUser");
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_role_without_permission() {
        let decision = rbac().evaluate(&Identity::user("u-1", ["user"]), "deleteUser");
        match decision {
            AuthorizationDecision::Deny { reason } => assert!(reason.contains("deleteUser")),
            AuthorizationDecision::Allow => panic!("expected deny"),
        }
    }

    #[test]
    fn test_wildcard_allows_any_operation() {
        let decision = rbac().evaluate(&Identity::user("root", ["admin"]), "deleteUser");
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_anonymous_denied_by_default() {
        assert!(!rbac().evaluate(&Identity::Anonymous, "listUsers").is_allowed());
    }

    #[test]
    fn test_specific_anonymous_operations() {
        let rbac = RbacDecisionPoint::builder()
            .allow_anonymous_operations(["listUsers"])
            .build();
        assert!(rbac.evaluate(&Identity::Anonymous, "listUsers").is_allowed());
        assert!(!rbac.evaluate(&Identity::Anonymous, "getUser").is_allowed());
    }

    #[test]
    fn test_allow_anonymous_permits_all() {
        let rbac = RbacDecisionPoint::builder().allow_anonymous().build();
        assert!(rbac.evaluate(&Identity::Anonymous, "anything").is_allowed());
    }

    #[test]
    fn test_spiffe_and_api_key_roles() {
        let rbac = rbac();
        let workload = Identity::spiffe("prod.example.org", "/ns/users/sa/sync");
        assert!(rbac.evaluate(&workload, "syncUsers").is_allowed());
        assert!(!rbac.evaluate(&workload, "getUser").is_allowed());

        let key = Identity::api_key("reporting");
        assert!(rbac.evaluate(&key, "listUsers").is_allowed());
    }

    #[test]
    fn test_allow_role_accumulates() {
        let rbac = RbacDecisionPoint::builder()
            .allow_role("user", ["getUser"])
            .allow_role("user", ["listUsers"])
            .build();
        let user = Identity::user("u-1", ["user"]);
        assert!(rbac.evaluate(&user, "getUser").is_allowed());
        assert!(rbac.evaluate(&user, "listUsers").is_allowed());
    }
}
