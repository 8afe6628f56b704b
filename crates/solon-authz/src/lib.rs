//! Solon Authorization - the policy enforcement boundary
//!
//! This crate decides whether a resolved request may reach its handler.
//!
//! # Overview
//!
//! - [`DecisionPoint`]: the seam to an external authority. Built in:
//!   [`AllowAll`], [`DenyAll`], [`RbacDecisionPoint`] and
//!   [`HttpDecisionPoint`].
//! - [`AuthorizationGate`]: wraps a decision point with a mandatory timeout
//!   and a fail-closed (default) or fail-open policy.
//!
//! # Architecture
//!
//! ```text
//!     ┌────────────┐  DecisionQuery   ┌──────────────────────┐
//!     │  Pipeline  │─────────────────▶│  AuthorizationGate   │
//!     │ (authorize │                  │  timeout + fail mode │
//!     │   stage)   │◀─────────────────│                      │
//!     └────────────┘  Allow / Deny    └──────────┬───────────┘
//!                                                │ decide
//!                                     ┌──────────▼───────────┐
//!                                     │    DecisionPoint     │
//!                                     │ rbac / http / custom │
//!                                     └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use solon_authz::{AuthorizationGate, DecisionQuery, GateConfig, RbacDecisionPoint};
//! use solon_core::{Identity, Operation};
//!
//! # tokio_test::block_on(async {
//! let rbac = RbacDecisionPoint::builder()
//!     .allow_role("user", ["getUser"])
//!     .build();
//! let gate = AuthorizationGate::with_config(rbac, GateConfig::default());
//!
//! let operation = Operation::builder("getUser").path("/users/{userId}").build().unwrap();
//! let query = DecisionQuery::new(Identity::user("u-1", ["user"]), &operation, "/users/7");
//!
//! let decision = gate.authorize(&query).await;
//! assert!(AuthorizationGate::enforce(&decision).is_ok());
//! # });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod decision_point;
pub mod error;
pub mod gate;
pub mod remote;
pub mod rbac;

pub use config::{FailMode, GateConfig, DEFAULT_TIMEOUT};
pub use decision_point::{AllowAll, DecisionPoint, DecisionQuery, DenyAll};
pub use error::{AuthzError, AuthzResult};
pub use gate::AuthorizationGate;
pub use remote::HttpDecisionPoint;
pub use rbac::{RbacBuilder, RbacDecisionPoint};
