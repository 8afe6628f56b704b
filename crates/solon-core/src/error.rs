//! Error types for Solon.
//!
//! This module provides [`SolonError`], the single error taxonomy used across
//! the framework. Variants fall into three groups:
//!
//! | Group | Variants | Effect |
//! |---|---|---|
//! | Per-request | `RouteNotFound`, `MethodNotAllowed`, `Validation`, `AuthenticationMissing`, `AuthorizationDenied`, `PolicyUnavailable`, `Handler`, `ServiceUnavailable` | Request is rejected with a JSON error body |
//! | Registration | `DuplicateOperationId`, `DuplicateBinding`, `UnboundOperation`, `RouteConflict` | Server never reaches `Running` |
//! | Load | `SchemaCompile`, `LifecycleHookFailure` | Server never reaches `Running` |
//!
//! Per-request errors are rendered with [`SolonError::to_envelope`]; the
//! message of a [`SolonError::Handler`] is replaced by a generic one so that
//! handler internals never reach the client.

use http::StatusCode;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using [`SolonError`].
pub type SolonResult<T> = Result<T, SolonError>;

/// Message returned to clients in place of handler failure details.
pub const GENERIC_HANDLER_MESSAGE: &str = "The request could not be completed";

/// Standard error type for Solon.
///
/// # Example
///
/// ```
/// use solon_core::SolonError;
/// use http::StatusCode;
///
/// let err = SolonError::route_not_found("GET", "/missing");
/// assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
/// assert_eq!(err.error_code(), "ROUTE_NOT_FOUND");
/// ```
#[derive(Error, Debug)]
pub enum SolonError {
    /// No operation matches the request path.
    #[error("No route for {method} {path}")]
    RouteNotFound {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
    },

    /// The path matches an operation, but under a different method.
    #[error("Method {method} not allowed for {path}")]
    MethodNotAllowed {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
        /// Methods the path is registered under.
        allowed: Vec<String>,
    },

    /// Request or response failed schema validation.
    #[error("Validation failed: {field_errors}")]
    Validation {
        /// Every offending field, in discovery order.
        field_errors: FieldErrors,
    },

    /// The operation requires a caller identity and none was supplied.
    #[error("Authentication required for operation '{operation_id}'")]
    AuthenticationMissing {
        /// The operation that was called.
        operation_id: String,
    },

    /// The decision point denied the request.
    #[error("Authorization denied: {reason}")]
    AuthorizationDenied {
        /// Reason reported by the decision point.
        reason: String,
    },

    /// The decision point could not be consulted.
    #[error("Policy decision unavailable: {reason}")]
    PolicyUnavailable {
        /// Why the decision point was unavailable.
        reason: String,
    },

    /// The bound handler failed. The source is logged, never returned to callers.
    #[error("Handler failed for operation '{operation_id}'")]
    Handler {
        /// The operation whose handler failed.
        operation_id: String,
        /// The underlying failure.
        #[source]
        source: anyhow::Error,
    },

    /// The server is not in the `Running` state.
    #[error("Service unavailable: {state}")]
    ServiceUnavailable {
        /// Current lifecycle state name.
        state: String,
    },

    /// An operation id was registered twice.
    #[error("Duplicate operation id '{operation_id}'")]
    DuplicateOperationId {
        /// The duplicated identifier.
        operation_id: String,
    },

    /// A handler was bound twice for the same operation.
    #[error("Operation '{operation_id}' already has a handler bound")]
    DuplicateBinding {
        /// The operation bound twice.
        operation_id: String,
    },

    /// An operation has no handler, or a handler names an unknown operation.
    #[error("Unbound operation '{operation_id}': {message}")]
    UnboundOperation {
        /// The operation concerned.
        operation_id: String,
        /// What is wrong with the binding.
        message: String,
    },

    /// Two path patterns can match the same concrete path.
    #[error("Route conflict: {method} {path} overlaps {existing} (operation '{existing_operation}')")]
    RouteConflict {
        /// Method of the rejected registration.
        method: String,
        /// Pattern of the rejected registration.
        path: String,
        /// Pattern already in the table.
        existing: String,
        /// Operation owning the existing pattern.
        existing_operation: String,
    },

    /// The contract document could not be compiled.
    #[error("Schema compile error: {message}")]
    SchemaCompile {
        /// What failed to compile.
        message: String,
    },

    /// A startup hook failed.
    #[error("Lifecycle hook '{hook}' failed: {message}")]
    LifecycleHookFailure {
        /// Hook name.
        hook: String,
        /// Failure message.
        message: String,
    },
}

impl SolonError {
    /// Creates a route not found error.
    #[must_use]
    pub fn route_not_found(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self::RouteNotFound {
            method: method.into(),
            path: path.into(),
        }
    }

    /// Creates a method not allowed error.
    #[must_use]
    pub fn method_not_allowed(
        method: impl Into<String>,
        path: impl Into<String>,
        allowed: Vec<String>,
    ) -> Self {
        Self::MethodNotAllowed {
            method: method.into(),
            path: path.into(),
            allowed,
        }
    }

    /// Creates a validation error from collected field errors.
    #[must_use]
    pub fn validation(field_errors: FieldErrors) -> Self {
        Self::Validation { field_errors }
    }

    /// Creates a validation error for a single field.
    #[must_use]
    pub fn validation_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut field_errors = FieldErrors::new();
        field_errors.add(field, message);
        Self::Validation { field_errors }
    }

    /// Creates an authentication missing error.
    #[must_use]
    pub fn authentication_missing(operation_id: impl Into<String>) -> Self {
        Self::AuthenticationMissing {
            operation_id: operation_id.into(),
        }
    }

    /// Creates an authorization denied error.
    #[must_use]
    pub fn authorization_denied(reason: impl Into<String>) -> Self {
        Self::AuthorizationDenied {
            reason: reason.into(),
        }
    }

    /// Creates a policy unavailable error.
    #[must_use]
    pub fn policy_unavailable(reason: impl Into<String>) -> Self {
        Self::PolicyUnavailable {
            reason: reason.into(),
        }
    }

    /// Wraps a handler failure.
    pub fn handler(operation_id: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Handler {
            operation_id: operation_id.into(),
            source: source.into(),
        }
    }

    /// Creates a service unavailable error.
    #[must_use]
    pub fn service_unavailable(state: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            state: state.into(),
        }
    }

    /// Creates a schema compile error.
    #[must_use]
    pub fn schema_compile(message: impl Into<String>) -> Self {
        Self::SchemaCompile {
            message: message.into(),
        }
    }

    /// Returns the HTTP status code for this error.
    ///
    /// Registration and load errors never reach a client; they map to 500.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::AuthenticationMissing { .. } => StatusCode::UNAUTHORIZED,
            Self::AuthorizationDenied { .. } => StatusCode::FORBIDDEN,
            Self::PolicyUnavailable { .. } | Self::ServiceUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Handler { .. }
            | Self::DuplicateOperationId { .. }
            | Self::DuplicateBinding { .. }
            | Self::UnboundOperation { .. }
            | Self::RouteConflict { .. }
            | Self::SchemaCompile { .. }
            | Self::LifecycleHookFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the stable machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::RouteNotFound { .. } => "ROUTE_NOT_FOUND",
            Self::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::AuthenticationMissing { .. } => "AUTHENTICATION_MISSING",
            Self::AuthorizationDenied { .. } => "AUTHORIZATION_DENIED",
            Self::PolicyUnavailable { .. } => "POLICY_UNAVAILABLE",
            Self::Handler { .. } => "HANDLER_ERROR",
            Self::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
            Self::DuplicateOperationId { .. } => "DUPLICATE_OPERATION_ID",
            Self::DuplicateBinding { .. } => "DUPLICATE_BINDING",
            Self::UnboundOperation { .. } => "UNBOUND_OPERATION",
            Self::RouteConflict { .. } => "ROUTE_CONFLICT",
            Self::SchemaCompile { .. } => "SCHEMA_COMPILE_ERROR",
            Self::LifecycleHookFailure { .. } => "LIFECYCLE_HOOK_FAILURE",
        }
    }

    /// Returns `true` for errors produced while serving a request.
    #[must_use]
    pub const fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::RouteNotFound { .. }
                | Self::MethodNotAllowed { .. }
                | Self::Validation { .. }
                | Self::AuthenticationMissing { .. }
                | Self::AuthorizationDenied { .. }
                | Self::PolicyUnavailable { .. }
                | Self::Handler { .. }
                | Self::ServiceUnavailable { .. }
        )
    }

    /// Converts this error to a serializable error envelope.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        let message = match self {
            Self::Handler { .. } => GENERIC_HANDLER_MESSAGE.to_string(),
            other => other.to_string(),
        };

        ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message,
                request_id: request_id.map(ToString::to_string),
                details: self.error_details(),
            },
        }
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Validation { field_errors } => serde_json::to_value(field_errors).ok(),
            Self::MethodNotAllowed { allowed, .. } => Some(serde_json::json!({
                "allowed": allowed
            })),
            _ => None,
        }
    }
}

/// Field-specific validation errors, kept in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors {
    /// Map of field path to list of error messages.
    pub fields: IndexMap<String, Vec<String>>,
}

impl FieldErrors {
    /// Creates a new empty `FieldErrors`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an error for a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Moves every error of `other` into `self`.
    pub fn extend(&mut self, other: Self) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    /// Returns `true` if the named field has at least one error.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Returns `true` if there are no field errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the number of fields with errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Converts into `Ok(())` when empty, a validation error otherwise.
    pub fn into_result(self) -> SolonResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(SolonError::validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Serializable error envelope for HTTP responses.
///
/// Serializes as `{"error":{"code":..,"message":..,"request_id":..}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
