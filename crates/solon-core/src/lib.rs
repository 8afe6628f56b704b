//! # Solon Core
//!
//! Core types for the Solon contract-first server framework.
//!
//! This crate provides the foundational types used throughout Solon:
//!
//! - [`ContractRegistry`] - Compiled operations loaded from a contract document
//! - [`Operation`] - A declared operation with its path pattern and schemas
//! - [`Schema`] - Body schemas and parameter coercion
//! - [`RequestContext`] - Per-request, set-once state
//! - [`Identity`] - Closed set of caller identities
//! - [`HandlerRegistry`] - Operation id to handler bindings
//! - [`SolonError`] - The framework error taxonomy
//!
//! # Example
//!
//! ```
//! use solon_core::{ContractRegistry, HandlerRegistry, HandlerResponse};
//!
//! let registry = ContractRegistry::from_json_str(r#"{
//!     "name": "status",
//!     "operations": [{"id": "getStatus", "method": "GET", "path": "/status"}]
//! }"#).unwrap();
//!
//! let mut handlers = HandlerRegistry::new();
//! handlers
//!     .bind_fn("getStatus", |_ctx, _body| Ok(HandlerResponse::ok(serde_json::json!("ok"))))
//!     .unwrap();
//!
//! handlers
//!     .ensure_bound(registry.operations().map(|op| op.id()))
//!     .unwrap();
//! ```

#![doc(html_root_url = "https://docs.rs/solon-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod contract;
mod context;
mod decision;
mod error;
pub mod handler;
mod identity;
pub mod schema;

pub use context::{ContextError, ParamValues, RequestContext, RequestId};
pub use contract::{ContractRegistry, Operation, PathPattern, PathSegment};
pub use decision::{AuthorizationDecision, POLICY_UNAVAILABLE};
pub use error::{
    ErrorDetail, ErrorEnvelope, FieldErrors, SolonError, SolonResult, GENERIC_HANDLER_MESSAGE,
};
pub use handler::{HandlerError, HandlerRegistry, HandlerResponse};
pub use identity::Identity;
pub use schema::{ParamType, Schema};
