//! # Solon Server
//!
//! Turns a contract, its handlers and a configuration into a running
//! service:
//!
//! - [`App`] / [`AppBuilder`]: assembly, and the transport-independent
//!   [`App::handle`] entry point
//! - [`LifecycleManager`]: `Idle → Starting → Running → Stopping → Stopped`
//!   with named startup and shutdown hooks
//! - [`Server`]: hyper HTTP/1.1 transport with a request body limit,
//!   `/health` and `/ready`, and graceful shutdown on SIGINT/SIGTERM or a
//!   [`ShutdownSignal`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use solon_config::ConfigLoader;
//! use solon_core::HandlerRegistry;
//! use solon_server::{App, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().with_env_prefix("SOLON").load()?;
//!     let handlers = HandlerRegistry::new();
//!
//!     let app = App::builder()
//!         .config(config)
//!         .handlers(handlers)
//!         .on_startup("connect-db", || async { Ok(()) })
//!         .on_shutdown("close-db", || async { Ok(()) })
//!         .load_contract()
//!         .await?
//!         .build()?;
//!
//!     Server::from_app(Arc::new(app))?.run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/solon-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod app;
pub mod config;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod server;
pub mod shutdown;

pub use app::{App, AppBuilder};
pub use config::{TransportConfig, TransportConfigBuilder};
pub use error::{ServerError, ServerResult};
pub use health::{HealthCheck, HealthStatus, ReadinessStatus};
pub use lifecycle::{
    HookFailure, LifecycleError, LifecycleHook, LifecycleManager, LifecycleResult, LifecycleState,
};
pub use server::Server;
pub use shutdown::{ConnectionTracker, ConnectionToken, ShutdownReceiver, ShutdownSignal};
