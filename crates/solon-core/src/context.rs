//! Request context types.
//!
//! The [`RequestContext`] carries all per-request state through the pipeline
//! and into handlers. Apart from the request id and creation time, every field
//! starts unset and may be set exactly once; a second write is refused with
//! [`ContextError::AlreadySet`] and leaves the stored value untouched.

use crate::decision::AuthorizationDecision;
use crate::identity::Identity;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

/// Parameter values after coercion to their declared types.
pub type ParamValues = IndexMap<String, serde_json::Value>;

/// A unique identifier for each request.
///
/// Generated identifiers use UUID v7, which is time-ordered and therefore
/// convenient for log correlation. Identifiers propagated from a caller are
/// kept verbatim.
///
/// # Example
///
/// ```
/// use solon_core::RequestId;
///
/// let id = RequestId::new();
/// assert_eq!(id.as_str().len(), 36);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wraps an identifier received from the caller.
    #[must_use]
    pub fn from_inbound(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.to_string())
    }
}

/// Attempted to overwrite a field of a [`RequestContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The field already holds a value.
    #[error("request context field '{0}' is already set")]
    AlreadySet(&'static str),
}

fn set_once<T>(slot: &OnceLock<T>, value: T, field: &'static str) -> Result<(), ContextError> {
    slot.set(value).map_err(|_| ContextError::AlreadySet(field))
}

/// Per-request context that flows through the pipeline.
///
/// # Example
///
/// ```
/// use solon_core::{Identity, RequestContext, RequestId};
///
/// let ctx = RequestContext::new(RequestId::new());
/// ctx.set_identity(Identity::api_key("k-1")).unwrap();
/// assert!(ctx.set_identity(Identity::Anonymous).is_err());
/// assert_eq!(ctx.identity(), Some(&Identity::api_key("k-1")));
/// ```
#[derive(Debug)]
pub struct RequestContext {
    request_id: RequestId,
    trace_id: OnceLock<String>,
    span_id: OnceLock<String>,
    operation_id: OnceLock<String>,
    path_params: OnceLock<ParamValues>,
    query_params: OnceLock<ParamValues>,
    identity: OnceLock<Identity>,
    decision: OnceLock<AuthorizationDecision>,
    created_at: Instant,
}

impl RequestContext {
    /// Creates a context for the given request ID with every other field unset.
    #[must_use]
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            trace_id: OnceLock::new(),
            span_id: OnceLock::new(),
            operation_id: OnceLock::new(),
            path_params: OnceLock::new(),
            query_params: OnceLock::new(),
            identity: OnceLock::new(),
            decision: OnceLock::new(),
            created_at: Instant::now(),
        }
    }

    /// Creates a context with a generated request ID, for tests.
    #[must_use]
    pub fn mock() -> Self {
        Self::new(RequestId::new())
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Returns the trace ID if set.
    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.get().map(String::as_str)
    }

    /// Sets the trace ID.
    pub fn set_trace_id(&self, trace_id: impl Into<String>) -> Result<(), ContextError> {
        set_once(&self.trace_id, trace_id.into(), "trace_id")
    }

    /// Returns the span ID if set.
    #[must_use]
    pub fn span_id(&self) -> Option<&str> {
        self.span_id.get().map(String::as_str)
    }

    /// Sets the span ID.
    pub fn set_span_id(&self, span_id: impl Into<String>) -> Result<(), ContextError> {
        set_once(&self.span_id, span_id.into(), "span_id")
    }

    /// Returns the resolved operation ID if set.
    #[must_use]
    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.get().map(String::as_str)
    }

    /// Sets the resolved operation ID.
    pub fn set_operation_id(&self, operation_id: impl Into<String>) -> Result<(), ContextError> {
        set_once(&self.operation_id, operation_id.into(), "operation_id")
    }

    /// Returns the coerced path parameters, if validation has run.
    #[must_use]
    pub fn path_params(&self) -> Option<&ParamValues> {
        self.path_params.get()
    }

    /// Returns a single coerced path parameter.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&serde_json::Value> {
        self.path_params.get().and_then(|params| params.get(name))
    }

    /// Sets the coerced path parameters.
    pub fn set_path_params(&self, params: ParamValues) -> Result<(), ContextError> {
        set_once(&self.path_params, params, "path_params")
    }

    /// Returns the coerced query parameters, if validation has run.
    #[must_use]
    pub fn query_params(&self) -> Option<&ParamValues> {
        self.query_params.get()
    }

    /// Returns a single coerced query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&serde_json::Value> {
        self.query_params.get().and_then(|params| params.get(name))
    }

    /// Sets the coerced query parameters.
    pub fn set_query_params(&self, params: ParamValues) -> Result<(), ContextError> {
        set_once(&self.query_params, params, "query_params")
    }

    /// Returns the caller identity if resolved.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.get()
    }

    /// Sets the caller identity.
    pub fn set_identity(&self, identity: Identity) -> Result<(), ContextError> {
        set_once(&self.identity, identity, "identity")
    }

    /// Returns the authorization decision if made.
    #[must_use]
    pub fn decision(&self) -> Option<&AuthorizationDecision> {
        self.decision.get()
    }

    /// Sets the authorization decision.
    pub fn set_decision(&self, decision: AuthorizationDecision) -> Result<(), ContextError> {
        set_once(&self.decision, decision, "decision")
    }

    /// Returns when the context was created.
    #[must_use]
    pub const fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Returns the elapsed time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.created_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_new_generates_unique_ids() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();
        assert_ne!(id1, id2, "Each RequestId should be unique");
    }

    #[test]
    fn test_request_id_display() {
        let id = RequestId::new();
        let display = id.to_string();
        assert_eq!(display.len(), 36, "UUID string should be 36 characters");
        assert!(Uuid::parse_str(&display).is_ok());
    }

    #[test]
    fn test_inbound_request_id_is_kept_verbatim() {
        let id = RequestId::from_inbound("client-chosen-id");
        assert_eq!(id.as_str(), "client-chosen-id");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"client-chosen-id\"");
    }

    #[test]
    fn test_fields_start_unset() {
        let ctx = RequestContext::mock();
        assert!(ctx.trace_id().is_none());
        assert!(ctx.span_id().is_none());
        assert!(ctx.operation_id().is_none());
        assert!(ctx.path_params().is_none());
        assert!(ctx.query_params().is_none());
        assert!(ctx.identity().is_none());
        assert!(ctx.decision().is_none());
    }

    #[test]
    fn test_fields_are_set_once() {
        let ctx = RequestContext::mock();

        ctx.set_operation_id("getUser").unwrap();
        assert_eq!(
            ctx.set_operation_id("deleteUser"),
            Err(ContextError::AlreadySet("operation_id"))
        );
        assert_eq!(ctx.operation_id(), Some("getUser"));

        ctx.set_decision(AuthorizationDecision::Allow).unwrap();
        assert!(ctx.set_decision(AuthorizationDecision::deny("x")).is_err());
        assert_eq!(ctx.decision(), Some(&AuthorizationDecision::Allow));

        ctx.set_trace_id("abc").unwrap();
        assert!(ctx.set_trace_id("def").is_err());
        assert_eq!(ctx.trace_id(), Some("abc"));
    }

    #[test]
    fn test_param_lookup() {
        let ctx = RequestContext::mock();
        let mut params = ParamValues::new();
        params.insert("userId".to_string(), serde_json::json!(42));
        ctx.set_path_params(params).unwrap();

        assert_eq!(ctx.path_param("userId"), Some(&serde_json::json!(42)));
        assert!(ctx.path_param("other").is_none());
        assert!(ctx.query_param("userId").is_none());
    }

    #[test]
    fn test_request_context_elapsed() {
        let ctx = RequestContext::mock();
        std::thread::sleep(Duration::from_millis(10));
        assert!(ctx.elapsed() >= Duration::from_millis(10));
    }
}
