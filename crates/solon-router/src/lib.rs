//! Radix tree router for Solon contract operations.
//!
//! This crate maps `(method, path)` pairs to the [`Operation`]s of a
//! contract. Patterns are made of literal segments and `{name}`
//! placeholders; each placeholder matches exactly one non-empty segment.
//!
//! # Features
//!
//! - **Radix Tree Matching**: lookup cost grows with path depth, not route count
//! - **Conflict Detection**: overlapping patterns are rejected at registration
//! - **Composition**: prefix, tag, merge and mount sub-routers
//! - **405 Support**: resolution distinguishes unknown paths from wrong methods
//!
//! # Example
//!
//! ```rust
//! use solon_router::Router;
//! use solon_core::{Operation, SolonError};
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.register(Operation::builder("listUsers").path("/users").build()?)?;
//! router.register(
//!     Operation::builder("getOrgUser")
//!         .path("/orgs/{orgId}/users/{userId}")
//!         .build()?,
//! )?;
//!
//! let m = router.resolve(&Method::GET, "/orgs/acme/users/123")?;
//! assert_eq!(m.operation_id(), "getOrgUser");
//! assert_eq!(m.params.get("orgId"), Some("acme"));
//!
//! let err = router.resolve(&Method::DELETE, "/users").unwrap_err();
//! assert!(matches!(err, SolonError::MethodNotAllowed { .. }));
//! # Ok::<(), SolonError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//!                    (root)
//!                      │
//!              ┌───────┴───────┐
//!              │               │
//!            "users"         "orgs"
//!              │               │
//!        ┌─────┴─────┐      "{orgId}"
//!        │           │         │
//!       (leaf)   "{userId}"  "users"
//!   [GET,POST]      │          │
//!                 (leaf)    "{userId}"
//!              [GET,DELETE]    │
//!                            (leaf)
//!                            [GET]
//! ```

#![doc(html_root_url = "https://docs.rs/solon-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod method_router;
mod node;
mod params;
mod router;

use std::sync::Arc;

pub use method_router::MethodRouter;
pub use node::{Endpoint, Node, SegmentKind};
pub use params::Params;
pub use router::Router;

use solon_core::Operation;

/// A matched route with its operation and extracted parameters.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    /// The matched operation
    pub operation: &'a Arc<Operation>,
    /// Extracted path parameters, as raw strings
    pub params: Params,
}

impl<'a> RouteMatch<'a> {
    /// Creates a new route match.
    #[must_use]
    pub fn new(operation: &'a Arc<Operation>, params: Params) -> Self {
        Self { operation, params }
    }

    /// Returns the matched operation id.
    #[must_use]
    pub fn operation_id(&self) -> &'a str {
        self.operation.id()
    }
}
