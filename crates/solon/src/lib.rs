//! # Solon
//!
//! **Contract-first HTTP services with a fixed, enforced request pipeline.**
//!
//! A service declares its operations in a contract document. Solon routes
//! each request to its operation and runs it through the same stages, in the
//! same order, every time:
//!
//! ```text
//! Request → RequestId/Trace → Identity → Validation → Authorization → Handler
//!                                                                        ↓
//! Response ← ErrorNorm ← Telemetry ← ResponseCheck ←─────────────────────┘
//! ```
//!
//! Handlers only ever see requests that are routed, valid and authorized.
//! Every request ends in exactly one telemetry record.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use serde::{Deserialize, Serialize};
//! use solon::prelude::*;
//!
//! #[derive(Deserialize)]
//! struct NewUser {
//!     name: String,
//! }
//!
//! #[derive(Serialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new()
//!         .with_file("solon.toml")?
//!         .with_env_prefix("SOLON")
//!         .load()?;
//!     let _telemetry = init_telemetry(config.telemetry.to_telemetry_config())?;
//!
//!     let mut handlers = HandlerRegistry::new();
//!     handlers.bind_json("createUser", |_ctx, new: NewUser| async move {
//!         Ok(User { id: 1, name: new.name })
//!     })?;
//!
//!     let app = App::builder()
//!         .config(config)
//!         .handlers(handlers)
//!         .load_contract()
//!         .await?
//!         .build()?;
//!
//!     Server::from_app(Arc::new(app))?.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Crates
//!
//! | Module | Crate |
//! |--------|-------|
//! | [`core`] | errors, contracts, schemas, identity, handler registry |
//! | [`router`] | route table and composition |
//! | [`authz`] | authorization gate and decision points |
//! | [`middleware`] | the request pipeline |
//! | [`telemetry`] | logging, metrics, tracing, telemetry records |
//! | [`config`] | layered configuration |
//! | [`server`] | application assembly, lifecycle, HTTP transport |

#![doc(html_root_url = "https://docs.rs/solon/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use solon_authz as authz;
pub use solon_config as config;
pub use solon_core as core;
pub use solon_middleware as middleware;
pub use solon_router as router;
pub use solon_server as server;
pub use solon_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// ```rust
/// use solon::prelude::*;
///
/// let mut handlers = HandlerRegistry::new();
/// handlers
///     .bind_fn("ping", |_ctx, _body| Ok(HandlerResponse::no_content()))
///     .unwrap();
/// assert!(handlers.contains("ping"));
/// ```
pub mod prelude {
    pub use solon_core::{
        ContractRegistry, HandlerError, HandlerRegistry, HandlerResponse, Identity, Operation,
        ParamType, RequestContext, RequestId, Schema, SolonError, SolonResult,
    };

    pub use solon_router::Router;

    pub use solon_authz::{
        AllowAll, DecisionPoint, DecisionQuery, DenyAll, FailMode, HttpDecisionPoint,
        RbacDecisionPoint,
    };

    pub use solon_middleware::{Request, Response, ResponseExt};

    pub use solon_telemetry::{init_telemetry, TelemetryEmitter, TelemetryRecord};

    pub use solon_config::{ConfigLoader, SolonConfig};

    pub use solon_server::{
        App, AppBuilder, LifecycleError, LifecycleResult, LifecycleState, Server, ServerError,
        ShutdownSignal,
    };
}
