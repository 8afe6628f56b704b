//! Handler binding and dispatch.
//!
//! Every operation in the contract is served by exactly one handler. Handlers
//! are bound by operation id into a [`HandlerRegistry`], which erases their
//! concrete types behind a single contract: a boxed `Send` future resolving to
//! a [`HandlerResponse`] or a [`HandlerError`]. Synchronous handlers are
//! wrapped into an already-completed future, so dispatch never distinguishes
//! the two.
//!
//! # Example
//!
//! ```
//! use solon_core::handler::{HandlerRegistry, HandlerError};
//! use solon_core::RequestContext;
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Deserialize)]
//! struct Greet { name: String }
//!
//! #[derive(Serialize)]
//! struct Greeting { message: String }
//!
//! async fn greet(_ctx: Arc<RequestContext>, req: Greet) -> Result<Greeting, HandlerError> {
//!     Ok(Greeting { message: format!("Hello, {}!", req.name) })
//! }
//!
//! let mut registry = HandlerRegistry::new();
//! registry.bind_json("greet", greet).unwrap();
//! assert!(registry.bind_json("greet", greet).is_err());
//! ```

use crate::context::RequestContext;
use crate::error::{SolonError, SolonResult};
use bytes::Bytes;
use http::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Boxed future returned by every bound handler.
pub type BoxedHandlerResult =
    Pin<Box<dyn Future<Output = Result<HandlerResponse, HandlerError>> + Send>>;

/// A type-erased handler function.
pub type ErasedHandler =
    Arc<dyn Fn(Arc<RequestContext>, Bytes) -> BoxedHandlerResult + Send + Sync>;

/// A handler's successful result: a status code and an optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response body, serialized as JSON when present.
    pub body: Option<serde_json::Value>,
}

impl HandlerResponse {
    /// Creates a response with the given status and body.
    #[must_use]
    pub const fn new(status: StatusCode, body: Option<serde_json::Value>) -> Self {
        Self { status, body }
    }

    /// `200 OK` with a JSON body.
    #[must_use]
    pub const fn ok(body: serde_json::Value) -> Self {
        Self::new(StatusCode::OK, Some(body))
    }

    /// `201 Created` with a JSON body.
    #[must_use]
    pub const fn created(body: serde_json::Value) -> Self {
        Self::new(StatusCode::CREATED, Some(body))
    }

    /// `204 No Content`.
    #[must_use]
    pub const fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT, None)
    }
}

/// Errors that can occur during handler execution.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The request body could not be decoded into the handler's input type.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// The handler's output could not be encoded as JSON.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The handler exceeded its deadline.
    #[error("Handler timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The handler itself failed.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl HandlerError {
    /// Wraps any error as a handler failure.
    pub fn failed(err: impl Into<anyhow::Error>) -> Self {
        Self::Failed(err.into())
    }

    /// Creates a handler failure from a message.
    #[must_use]
    pub fn msg(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self::Failed(anyhow::Error::msg(message))
    }
}

/// Registry for operation handlers.
///
/// Binding is append-only: a second binding for the same operation is
/// refused. Once the server is running the registry is shared behind an
/// `Arc` and never mutated again.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, ErasedHandler>,
}

impl HandlerRegistry {
    /// Creates a new empty handler registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Binds a raw handler receiving the request body bytes.
    pub fn bind<F, Fut>(&mut self, operation_id: impl Into<String>, handler: F) -> SolonResult<()>
    where
        F: Fn(Arc<RequestContext>, Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HandlerResponse, HandlerError>> + Send + 'static,
    {
        let erased: ErasedHandler = Arc::new(
            move |ctx: Arc<RequestContext>, body: Bytes| -> BoxedHandlerResult {
                Box::pin(handler(ctx, body))
            },
        );
        self.insert(operation_id.into(), erased)
    }

    /// Binds a typed handler. The body is decoded from JSON into `Req` and
    /// the `Res` value is encoded as a `200 OK` JSON body.
    ///
    /// An empty request body is decoded as JSON `null`, so `Req = ()` or
    /// `Option<T>` serve body-less operations.
    pub fn bind_json<Req, Res, F, Fut>(
        &mut self,
        operation_id: impl Into<String>,
        handler: F,
    ) -> SolonResult<()>
    where
        Req: DeserializeOwned + Send + 'static,
        Res: Serialize + Send + 'static,
        F: Fn(Arc<RequestContext>, Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, HandlerError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let erased: ErasedHandler = Arc::new(
            move |ctx: Arc<RequestContext>, body: Bytes| -> BoxedHandlerResult {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    let request: Req = if body.is_empty() {
                        serde_json::from_value(serde_json::Value::Null)
                    } else {
                        serde_json::from_slice(&body)
                    }
                    .map_err(|e| HandlerError::Deserialization(e.to_string()))?;

                    let response = handler(ctx, request).await?;

                    let value = serde_json::to_value(&response)
                        .map_err(|e| HandlerError::Serialization(e.to_string()))?;
                    Ok(HandlerResponse::ok(value))
                })
            },
        );
        self.insert(operation_id.into(), erased)
    }

    /// Binds a synchronous handler. Its result is delivered as a ready future.
    pub fn bind_fn<F>(&mut self, operation_id: impl Into<String>, handler: F) -> SolonResult<()>
    where
        F: Fn(&RequestContext, Bytes) -> Result<HandlerResponse, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        let erased: ErasedHandler = Arc::new(
            move |ctx: Arc<RequestContext>, body: Bytes| -> BoxedHandlerResult {
                Box::pin(std::future::ready(handler(&ctx, body)))
            },
        );
        self.insert(operation_id.into(), erased)
    }

    fn insert(&mut self, operation_id: String, handler: ErasedHandler) -> SolonResult<()> {
        if self.handlers.contains_key(&operation_id) {
            return Err(SolonError::DuplicateBinding { operation_id });
        }
        tracing::debug!(operation_id = %operation_id, "Bound handler");
        self.handlers.insert(operation_id, handler);
        Ok(())
    }

    /// Returns the handler for an operation.
    #[must_use]
    pub fn get(&self, operation_id: &str) -> Option<&ErasedHandler> {
        self.handlers.get(operation_id)
    }

    /// Returns `true` if the operation has a handler.
    #[must_use]
    pub fn contains(&self, operation_id: &str) -> bool {
        self.handlers.contains_key(operation_id)
    }

    /// Returns the number of bound handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Returns the bound operation ids, sorted.
    #[must_use]
    pub fn operation_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Checks that the bindings match `operation_ids` exactly.
    ///
    /// Fails with [`SolonError::UnboundOperation`] for the first operation
    /// (in sorted order) without a handler, or for a handler whose operation
    /// is not in the set.
    pub fn ensure_bound<'a>(
        &self,
        operation_ids: impl IntoIterator<Item = &'a str>,
    ) -> SolonResult<()> {
        let expected: BTreeSet<&str> = operation_ids.into_iter().collect();

        if let Some(missing) = expected.iter().find(|id| !self.handlers.contains_key(**id)) {
            return Err(SolonError::UnboundOperation {
                operation_id: (*missing).to_string(),
                message: "no handler bound".to_string(),
            });
        }

        if let Some(extra) = self
            .operation_ids()
            .into_iter()
            .find(|id| !expected.contains(id))
        {
            return Err(SolonError::UnboundOperation {
                operation_id: extra.to_string(),
                message: "handler bound to an operation that is not routed".to_string(),
            });
        }

        Ok(())
    }

    /// Invokes the handler for an operation.
    pub async fn invoke(
        &self,
        operation_id: &str,
        ctx: Arc<RequestContext>,
        body: Bytes,
    ) -> SolonResult<HandlerResponse> {
        let handler = self
            .handlers
            .get(operation_id)
            .ok_or_else(|| SolonError::UnboundOperation {
                operation_id: operation_id.to_string(),
                message: "no handler bound".to_string(),
            })?;

        handler(ctx, body)
            .await
            .map_err(|e| SolonError::handler(operation_id, e))
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("operations", &self.operation_ids())
            .finish()
    }
}
