//! Handler dispatch stage.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::FutureExt;
use solon_core::{
    HandlerError, HandlerRegistry, HandlerResponse, RequestContext, SolonError, SolonResult,
};
use tracing::error;

/// Invokes the handler bound to an operation.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    handlers: Arc<HandlerRegistry>,
    timeout: Option<Duration>,
}

impl Dispatcher {
    /// Creates a dispatcher without a handler timeout.
    #[must_use]
    pub fn new(handlers: Arc<HandlerRegistry>) -> Self {
        Self {
            handlers,
            timeout: None,
        }
    }

    /// Bounds each handler invocation.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Runs the handler for `operation_id`.
    ///
    /// A handler that exceeds the timeout is dropped and reported as a
    /// handler failure. So is a handler that panics; the panic payload is
    /// logged and never reaches the client.
    pub async fn dispatch(
        &self,
        operation_id: &str,
        ctx: Arc<RequestContext>,
        body: Bytes,
    ) -> SolonResult<HandlerResponse> {
        let call = AssertUnwindSafe(self.handlers.invoke(operation_id, ctx, body))
            .catch_unwind()
            .map(|outcome| {
                outcome.unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    error!(operation_id, panic = %message, "Handler panicked");
                    Err(SolonError::handler(
                        operation_id,
                        HandlerError::msg(format!("handler panicked: {message}")),
                    ))
                })
            });
        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(SolonError::handler(
                    operation_id,
                    HandlerError::Timeout(limit),
                )),
            },
            None => call.await,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
