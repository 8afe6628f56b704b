//! The decision point seam.
//!
//! A [`DecisionPoint`] answers a [`DecisionQuery`] with an
//! [`AuthorizationDecision`]. It knows nothing about timeouts or failure
//! modes; the [`AuthorizationGate`](crate::AuthorizationGate) applies those.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::Serialize;
use solon_core::{AuthorizationDecision, Identity, Operation, ParamValues};

use crate::error::AuthzResult;

/// Everything a decision point may base its decision on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionQuery {
    /// The resolved caller.
    pub identity: Identity,
    /// Operation being invoked.
    pub operation_id: String,
    /// HTTP method of the request.
    pub method: String,
    /// Concrete request path.
    pub path: String,
    /// Scopes the operation declares.
    pub scopes: Vec<String>,
    /// Tags the operation carries.
    pub tags: Vec<String>,
    /// Resource attributes, the typed path parameters.
    pub resource: ParamValues,
}

impl DecisionQuery {
    /// Builds a query for an operation.
    pub fn new(identity: Identity, operation: &Operation, path: impl Into<String>) -> Self {
        Self {
            identity,
            operation_id: operation.id().to_string(),
            method: operation.method().to_string(),
            path: path.into(),
            scopes: operation.scopes().to_vec(),
            tags: operation.tags().to_vec(),
            resource: ParamValues::new(),
        }
    }

    /// Attaches resource attributes.
    pub fn with_resource(mut self, resource: ParamValues) -> Self {
        self.resource = resource;
        self
    }
}

/// An external authority that decides whether a request may proceed.
pub trait DecisionPoint: Send + Sync + fmt::Debug + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Decides one query.
    ///
    /// An `Err` means no decision was obtained, never a deny.
    fn decide<'a>(&'a self, query: &'a DecisionQuery)
        -> BoxFuture<'a, AuthzResult<AuthorizationDecision>>;
}

impl<T: DecisionPoint + ?Sized> DecisionPoint for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn decide<'a>(
        &'a self,
        query: &'a DecisionQuery,
    ) -> BoxFuture<'a, AuthzResult<AuthorizationDecision>> {
        (**self).decide(query)
    }
}

/// Allows every request. Use for development or when authorization is
/// enforced elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl DecisionPoint for AllowAll {
    fn name(&self) -> &'static str {
        "allow_all"
    }

    fn decide<'a>(
        &'a self,
        _query: &'a DecisionQuery,
    ) -> BoxFuture<'a, AuthzResult<AuthorizationDecision>> {
        Box::pin(std::future::ready(Ok(AuthorizationDecision::Allow)))
    }
}

/// Denies every request. Use for testing rejection flows.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl DecisionPoint for DenyAll {
    fn name(&self) -> &'static str {
        "deny_all"
    }

    fn decide<'a>(
        &'a self,
        _query: &'a DecisionQuery,
    ) -> BoxFuture<'a, AuthzResult<AuthorizationDecision>> {
        Box::pin(std::future::ready(Ok(AuthorizationDecision::deny(
            "Authorization denied (deny-all mode)",
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn get_user() -> Operation {
        Operation::builder("getUser")
            .path("/users/{userId}")
            .scope("users:read")
            .tag("users")
            .build()
            .unwrap()
    }

    #[test]
    fn test_query_from_operation() {
        let mut resource = ParamValues::new();
        resource.insert("userId".to_string(), json!(42));

        let query = DecisionQuery::new(Identity::user("u-1", ["admin"]), &get_user(), "/users/42")
            .with_resource(resource);

        assert_eq!(query.operation_id, "getUser");
        assert_eq!(query.method, "GET");
        assert_eq!(query.scopes, vec!["users:read".to_string()]);
        assert_eq!(query.resource.get("userId"), Some(&json!(42)));
    }

    #[test]
    fn test_query_serializes_identity_tag() {
        let query = DecisionQuery::new(Identity::api_key("k-9"), &get_user(), "/users/1");
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value["identity"]["type"], "api_key");
        assert_eq!(value["identity"]["key_id"], "k-9");
        assert_eq!(value["tags"], json!(["users"]));
    }

    #[tokio::test]
    async fn test_allow_all_and_deny_all() {
        let query = DecisionQuery::new(Identity::Anonymous, &get_user(), "/users/1");

        assert_eq!(
            AllowAll.decide(&query).await.unwrap(),
            AuthorizationDecision::Allow
        );
        assert!(!DenyAll.decide(&query).await.unwrap().is_allowed());
    }
}
