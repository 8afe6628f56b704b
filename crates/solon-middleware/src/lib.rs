//! # Solon Middleware
//!
//! The per-request pipeline of the Solon framework.
//!
//! Every request follows the same fixed sequence of stages. The order is
//! immutable and no stage can be disabled:
//!
//! ```text
//! Request → RequestId → Tracing → Identity → Validation → Authorization → Handler
//!                                                                           ↓
//! Response ← ErrorNormalization ← Telemetry ← ResponseCheck ←───────────────┘
//! ```
//!
//! | Stage          | Outcome on failure            |
//! |----------------|-------------------------------|
//! | Identity       | never fails, falls back to anonymous |
//! | Validation     | 400 with every offending field |
//! | Authorization  | 401, 403, or 503 when the decision point is down |
//! | Dispatch       | 500 with a generic message    |
//! | Response check | logged, or 500 in strict mode |
//!
//! Progress is tracked by [`PipelineState`]: transitions only move
//! forward, and a request ends in exactly one of `Completed` or
//! `Rejected`, each producing exactly one telemetry record.
//!
//! ## Example
//!
//! ```
//! use solon_middleware::{PipelineState, Stage};
//!
//! let stages = Stage::all();
//! assert_eq!(stages[1].name(), "validation");
//! assert_eq!(stages[2].name(), "authorization");
//!
//! let state = PipelineState::Created.advance(PipelineState::Identified).unwrap();
//! assert!(state.can_reject());
//! ```

#![doc(html_root_url = "https://docs.rs/solon-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod pipeline;
pub mod stages;
pub mod state;
pub mod types;

pub use pipeline::{Pipeline, PipelineBuilder, UNMATCHED_OPERATION};
pub use stages::{IdentityResolver, ResponseValidationMode, Stage, Validator};
pub use state::{InvalidTransition, PipelineState};
pub use types::{Request, Response, ResponseExt};
