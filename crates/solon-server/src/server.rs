//! HTTP/1.1 transport on hyper.
//!
//! [`Server`] owns the accept loop for one [`App`]:
//!
//! 1. starts the application (binding verification and startup hooks);
//! 2. accepts connections until the [`ShutdownSignal`] fires;
//! 3. lets open connections finish their in-flight requests, up to the
//!    configured drain period;
//! 4. stops the application (shutdown hooks).
//!
//! Request bodies above the configured limit are answered with `413`
//! before the pipeline sees them. `GET /health` and `GET /ready` are
//! answered by the transport directly.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use solon_server::{App, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = App::builder().config(config).handlers(handlers).load_contract().await?.build()?;
//!     Server::from_app(Arc::new(app))?.run().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use http::{HeaderMap, Method, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use solon_middleware::{Request, Response, ResponseExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::app::App;
use crate::config::TransportConfig;
use crate::error::{ServerError, ServerResult};
use crate::health::{HEALTH_PATH, READY_PATH};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Serves an [`App`] over HTTP/1.1.
#[derive(Debug)]
pub struct Server {
    app: Arc<App>,
    config: TransportConfig,
}

impl Server {
    /// Creates a server with explicit transport settings.
    #[must_use]
    pub fn new(app: Arc<App>, config: TransportConfig) -> Self {
        Self { app, config }
    }

    /// Creates a server using the application's `server` configuration.
    ///
    /// # Errors
    ///
    /// [`ServerError::InvalidAddress`] for an unparsable `http_addr`.
    pub fn from_app(app: Arc<App>) -> ServerResult<Self> {
        let config = TransportConfig::from_settings(&app.config().server)?;
        Ok(Self::new(app, config))
    }

    /// The served application.
    #[must_use]
    pub fn app(&self) -> &Arc<App> {
        &self.app
    }

    /// Transport settings.
    #[must_use]
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Serves until SIGINT or SIGTERM.
    ///
    /// # Errors
    ///
    /// See [`serve`](Self::serve).
    pub async fn run(self) -> ServerResult<()> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals())
            .await
    }

    /// Binds the configured address and serves until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// [`ServerError::Bind`] if the address cannot be bound, otherwise see
    /// [`serve`](Self::serve).
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> ServerResult<()> {
        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener, shutdown).await
    }

    /// Serves connections from `listener` until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// - [`ServerError::Lifecycle`] if startup fails; no connection is
    ///   accepted in that case.
    /// - [`ServerError::Lifecycle`] if shutdown hooks fail, after every
    ///   hook has run.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> ServerResult<()> {
        self.app.start().await?;

        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "Listening");

        let tracker = ConnectionTracker::new();
        let stop_accepting = shutdown.recv();
        tokio::pin!(stop_accepting);

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let token = tracker.acquire();
                        let app = Arc::clone(&self.app);
                        let config = self.config.clone();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = serve_connection(app, &config, stream, shutdown).await {
                                debug!(remote_addr = %remote_addr, error = %e, "Connection closed with error");
                            }
                            drop(token);
                        });
                    }
                    Err(e) => warn!(error = %e, "Failed to accept connection"),
                },
                () = &mut stop_accepting => break,
            }
        }
        drop(listener);

        let drain = self.config.shutdown_timeout();
        info!(
            connections = tracker.active_connections(),
            timeout = ?drain,
            "Shutdown requested, draining connections"
        );
        if tokio::time::timeout(drain, tracker.drained()).await.is_err() {
            warn!(
                connections = tracker.active_connections(),
                "Drain period elapsed with connections still open"
            );
        }

        self.app.stop().await?;
        Ok(())
    }
}

async fn serve_connection(
    app: Arc<App>,
    config: &TransportConfig,
    stream: TcpStream,
    shutdown: ShutdownSignal,
) -> Result<(), hyper::Error> {
    let limit = config.max_body_bytes();
    let service = service_fn(move |request: http::Request<Incoming>| {
        let app = Arc::clone(&app);
        async move { Ok::<_, Infallible>(route(&app, request, limit).await) }
    });

    let conn = http1::Builder::new()
        .keep_alive(config.keep_alive())
        .serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let closing = shutdown.recv();
    tokio::pin!(closing);
    let mut draining = false;

    loop {
        tokio::select! {
            result = conn.as_mut() => return result,
            () = &mut closing, if !draining => {
                // Finish the in-flight request, then close.
                draining = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    }
}

async fn route(app: &App, request: http::Request<Incoming>, limit: usize) -> Response {
    if request.method() == Method::GET {
        match request.uri().path() {
            HEALTH_PATH => return app.health(),
            READY_PATH => return app.ready(),
            _ => {}
        }
    }

    let (parts, body) = request.into_parts();
    match Limited::new(body, limit).collect().await {
        Ok(collected) => {
            let request = Request::from_parts(parts, Full::new(collected.to_bytes()));
            app.handle(request).await
        }
        Err(e) if e.is::<LengthLimitError>() => {
            debug!(limit, path = parts.uri.path(), "Request body over limit");
            refuse(
                app,
                &parts.headers,
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                &format!("request body exceeds {limit} bytes"),
            )
        }
        Err(e) => {
            error!(error = %e, "Failed to read request body");
            refuse(
                app,
                &parts.headers,
                StatusCode::BAD_REQUEST,
                "BODY_READ_ERROR",
                "request body could not be read",
            )
        }
    }
}

fn refuse(
    app: &App,
    headers: &HeaderMap,
    status: StatusCode,
    code: &str,
    message: &str,
) -> Response {
    let pipeline = app.pipeline();
    pipeline.correlate(
        headers,
        pipeline.request_id(headers),
        Response::json_error(status, code, message),
    )
}
