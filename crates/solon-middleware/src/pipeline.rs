//! The request pipeline.
//!
//! A [`Pipeline`] is built once and shared by every connection. For each
//! request it resolves the route, then drives a fresh per-request run
//! through the fixed stage order, advancing its [`PipelineState`] after
//! every stage:
//!
//! ```text
//! ┌───────────────────┐
//! │ request id, trace │  Created ─► Identified
//! │ identity          │
//! ├───────────────────┤
//! │ validation        │  ─► Validated      (400)
//! ├───────────────────┤
//! │ authorization     │  ─► Authorized     (401 / 403 / 503)
//! ├───────────────────┤
//! │ dispatch          │  ─► Dispatched     (500)
//! ├───────────────────┤
//! │ response check    │  ─► ResponseChecked ─► Completed
//! └───────────────────┘
//! ```
//!
//! A failing stage moves the request to `Rejected` and skips every later
//! stage. Either terminal state produces exactly one telemetry record.
//! Requests that match no route (404, 405) never enter the state machine;
//! they are logged and counted under the `unmatched` operation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::HeaderMap;
use http_body_util::BodyExt;
use solon_authz::AuthorizationGate;
use solon_core::{
    HandlerRegistry, HandlerResponse, Operation, RequestContext, RequestId, SolonError,
    SolonResult,
};
use solon_router::{Params, Router};
use solon_telemetry::metrics::record_request;
use solon_telemetry::{InFlightGuard, TelemetryEmitter, TerminalState};
use tracing::{debug, error, info_span, Instrument};

use crate::stages::{
    error_response, AuthorizationStage, Dispatcher, EchoHeaders, IdentityResolver,
    RequestIdStage, ResponseValidationMode, Stage, TelemetryStage, TraceContext,
    ValidatedParams, Validator,
};
use crate::state::PipelineState;
use crate::types::{Request, Response, ResponseExt};

/// Operation label used for requests that matched no route.
pub const UNMATCHED_OPERATION: &str = "unmatched";

/// Shared, immutable request pipeline.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use bytes::Bytes;
/// use http::{Method, StatusCode};
/// use http_body_util::Full;
/// use solon_authz::{AllowAll, AuthorizationGate};
/// use solon_core::{HandlerRegistry, HandlerResponse, Operation};
/// use solon_middleware::Pipeline;
/// use solon_router::Router;
///
/// # tokio_test::block_on(async {
/// let mut router = Router::new();
/// router
///     .register(Operation::builder("ping").method(Method::GET).path("/ping").build().unwrap())
///     .unwrap();
///
/// let mut handlers = HandlerRegistry::new();
/// handlers
///     .bind("ping", |_ctx, _body| async { Ok(HandlerResponse::no_content()) })
///     .unwrap();
///
/// let pipeline = Pipeline::builder(
///     Arc::new(router),
///     Arc::new(handlers),
///     AuthorizationGate::new(AllowAll),
/// )
/// .build();
///
/// let request = http::Request::get("/ping").body(Full::new(Bytes::new())).unwrap();
/// let response = pipeline.process(request).await;
/// assert_eq!(response.status(), StatusCode::NO_CONTENT);
/// assert!(response.headers().contains_key("x-request-id"));
/// # });
/// ```
#[derive(Debug)]
pub struct Pipeline {
    router: Arc<Router>,
    request_ids: RequestIdStage,
    identity: IdentityResolver,
    validator: Validator,
    authorization: AuthorizationStage,
    dispatcher: Dispatcher,
    telemetry: TelemetryStage,
}

impl Pipeline {
    /// Starts building a pipeline over a router, its handlers and an
    /// authorization gate.
    #[must_use]
    pub fn builder(
        router: Arc<Router>,
        handlers: Arc<HandlerRegistry>,
        gate: AuthorizationGate,
    ) -> PipelineBuilder {
        PipelineBuilder::new(router, handlers, gate)
    }

    /// Returns the router.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Runs one request through every stage and returns the response.
    ///
    /// Never fails: every error becomes a JSON error envelope. The request
    /// ID, the outbound `traceparent` and, once routed, the operation ID are
    /// echoed on every response.
    pub async fn process(&self, request: Request) -> Response {
        let started = Instant::now();
        let _in_flight = InFlightGuard::new();

        let (parts, body) = request.into_parts();
        let body = collect(body).await;

        let request_id = self.request_ids.assign(&parts.headers);
        let trace = TraceContext::from_headers(&parts.headers);

        let span = info_span!(
            "request",
            request_id = %request_id,
            trace_id = %trace.trace_id,
            http.method = %parts.method,
            http.target = parts.uri.path(),
        );

        async move {
            let mut echo = EchoHeaders {
                request_id: request_id.to_string(),
                traceparent: Some(trace.traceparent()),
                operation_id: None,
            };

            let mut response = match self.router.resolve(&parts.method, parts.uri.path()) {
                Ok(route) => {
                    echo.operation_id = Some(route.operation_id().to_string());
                    let input = RequestInput {
                        headers: &parts.headers,
                        path: parts.uri.path(),
                        query: parts.uri.query(),
                        params: route.params,
                        body,
                    };
                    RequestRun::new(self, request_id, Arc::clone(route.operation))
                        .run(&trace, input)
                        .await
                }
                Err(err) => self.unrouted(&err, &echo.request_id, started.elapsed()),
            };

            echo.apply(response.headers_mut());
            response
        }
        .instrument(span)
        .await
    }

    /// Builds an error response for a request refused before routing, such
    /// as one arriving while the server is not running.
    pub fn refuse(&self, headers: &HeaderMap, err: &SolonError) -> Response {
        let request_id = self.request_ids.assign(headers);
        let response = error_response(err, request_id.as_str());
        self.correlate(headers, request_id, response)
    }

    /// Adds correlation headers to a response produced outside the
    /// pipeline.
    pub fn correlate(
        &self,
        headers: &HeaderMap,
        request_id: RequestId,
        mut response: Response,
    ) -> Response {
        let trace = TraceContext::from_headers(headers);
        EchoHeaders {
            request_id: request_id.to_string(),
            traceparent: Some(trace.traceparent()),
            operation_id: None,
        }
        .apply(response.headers_mut());
        response
    }

    /// Assigns a request ID the way [`process`](Self::process) would.
    pub fn request_id(&self, headers: &HeaderMap) -> RequestId {
        self.request_ids.assign(headers)
    }

    fn unrouted(&self, err: &SolonError, request_id: &str, elapsed: Duration) -> Response {
        debug!(
            request_id,
            error_code = err.error_code(),
            error = %err,
            "Request matched no route"
        );
        record_request(
            UNMATCHED_OPERATION,
            err.status_code().as_u16(),
            TerminalState::Rejected.as_str(),
            elapsed,
        );
        error_response(err, request_id)
    }
}

async fn collect(body: http_body_util::Full<Bytes>) -> Bytes {
    match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    }
}

/// Builder for [`Pipeline`].
#[derive(Debug)]
pub struct PipelineBuilder {
    router: Arc<Router>,
    handlers: Arc<HandlerRegistry>,
    gate: AuthorizationGate,
    request_ids: RequestIdStage,
    identity: IdentityResolver,
    validator: Validator,
    telemetry: TelemetryStage,
    handler_timeout: Option<Duration>,
}

impl PipelineBuilder {
    fn new(router: Arc<Router>, handlers: Arc<HandlerRegistry>, gate: AuthorizationGate) -> Self {
        Self {
            router,
            handlers,
            gate,
            request_ids: RequestIdStage::new(),
            identity: IdentityResolver::new(),
            validator: Validator::new(),
            telemetry: TelemetryStage::default(),
            handler_timeout: None,
        }
    }

    /// Sets how request IDs are assigned.
    pub fn request_ids(mut self, stage: RequestIdStage) -> Self {
        self.request_ids = stage;
        self
    }

    /// Sets the identity resolver.
    pub fn identity_resolver(mut self, resolver: IdentityResolver) -> Self {
        self.identity = resolver;
        self
    }

    /// Sets the validator.
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Sets how response schema mismatches are handled.
    pub fn response_mode(mut self, mode: ResponseValidationMode) -> Self {
        self.validator = self.validator.with_response_mode(mode);
        self
    }

    /// Sets the telemetry emitter. Defaults to structured logs and metrics.
    pub fn emitter(mut self, emitter: Arc<dyn TelemetryEmitter>) -> Self {
        self.telemetry = TelemetryStage::new(emitter);
        self
    }

    /// Bounds every handler invocation.
    pub fn handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = Some(timeout);
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        let dispatcher = match self.handler_timeout {
            Some(timeout) => Dispatcher::new(self.handlers).with_timeout(timeout),
            None => Dispatcher::new(self.handlers),
        };

        Pipeline {
            router: self.router,
            request_ids: self.request_ids,
            identity: self.identity,
            validator: self.validator,
            authorization: AuthorizationStage::new(self.gate),
            dispatcher,
            telemetry: self.telemetry,
        }
    }
}

/// The parts of a routed request the stages read.
struct RequestInput<'r> {
    headers: &'r HeaderMap,
    path: &'r str,
    query: Option<&'r str>,
    params: Params,
    body: Bytes,
}

/// One request's trip through the pipeline. Never shared between requests.
struct RequestRun<'p> {
    pipeline: &'p Pipeline,
    state: PipelineState,
    ctx: Arc<RequestContext>,
    operation: Arc<Operation>,
}

impl<'p> RequestRun<'p> {
    fn new(pipeline: &'p Pipeline, request_id: RequestId, operation: Arc<Operation>) -> Self {
        Self {
            pipeline,
            state: PipelineState::Created,
            ctx: Arc::new(RequestContext::new(request_id)),
            operation,
        }
    }

    async fn run(mut self, trace: &TraceContext, input: RequestInput<'_>) -> Response {
        if let Err(err) = self.identify(trace, input.headers) {
            return self.reject(Stage::Identity, &err).await;
        }

        let validated = match self.validate(&input) {
            Ok(validated) => validated,
            Err(err) => return self.reject(Stage::Validation, &err).await,
        };

        if let Err(err) = self.authorize(input.path, validated).await {
            return self.reject(Stage::Authorization, &err).await;
        }

        match self.dispatch(input.body).await {
            Ok(handler_response) => self.complete(handler_response).await,
            Err(err) => self.reject(Stage::Dispatch, &err).await,
        }
    }

    fn identify(&mut self, trace: &TraceContext, headers: &HeaderMap) -> SolonResult<()> {
        let identity = self.pipeline.identity.resolve_headers(headers);
        debug!(identity = %identity, "Caller identified");

        self.context(self.ctx.set_trace_id(trace.trace_id.clone()))?;
        self.context(self.ctx.set_span_id(trace.span_id.clone()))?;
        self.context(self.ctx.set_operation_id(self.operation.id()))?;
        self.context(self.ctx.set_identity(identity))?;
        self.step(PipelineState::Identified)
    }

    fn validate(&mut self, input: &RequestInput<'_>) -> SolonResult<ValidatedParams> {
        let validated = self.pipeline.validator.validate_request(
            &self.operation,
            &input.params,
            input.query,
            &input.body,
        )?;

        self.context(self.ctx.set_path_params(validated.path.clone()))?;
        self.context(self.ctx.set_query_params(validated.query.clone()))?;
        self.step(PipelineState::Validated)?;
        Ok(validated)
    }

    async fn authorize(&mut self, path: &str, validated: ValidatedParams) -> SolonResult<()> {
        self.pipeline
            .authorization
            .authorize(&self.ctx, &self.operation, path, validated.path)
            .await?;
        self.step(PipelineState::Authorized)
    }

    async fn dispatch(&mut self, body: Bytes) -> SolonResult<HandlerResponse> {
        let response = self
            .pipeline
            .dispatcher
            .dispatch(self.operation.id(), Arc::clone(&self.ctx), body)
            .await?;
        self.step(PipelineState::Dispatched)?;
        Ok(response)
    }

    /// Checks the handler's response and finishes the request.
    async fn complete(mut self, handler_response: HandlerResponse) -> Response {
        let status = handler_response.status;
        let checked = self.pipeline.validator.check_response(
            &self.operation,
            status.as_u16(),
            handler_response.body.as_ref(),
        );

        let (response, error_code) = match checked {
            Ok(()) => {
                let response = match &handler_response.body {
                    Some(body) => Response::json(status, body),
                    None => Response::empty(status),
                };
                (response, None)
            }
            Err(err) => (
                error_response(&err, self.ctx.request_id().as_str()),
                Some(err.error_code()),
            ),
        };

        for next in [PipelineState::ResponseChecked, PipelineState::Completed] {
            if let Err(err) = self.step(next) {
                error!(error = %err, "Pipeline could not complete request");
            }
        }

        self.emit(
            TerminalState::Completed,
            Stage::ResponseCheck,
            response.status().as_u16(),
            error_code,
        )
        .await;
        response
    }

    async fn reject(mut self, stage: Stage, err: &SolonError) -> Response {
        match self.state.reject() {
            Ok(rejected) => self.state = rejected,
            Err(transition) => error!(error = %transition, "Pipeline could not reject request"),
        }

        let response = error_response(err, self.ctx.request_id().as_str());
        self.emit(
            TerminalState::Rejected,
            stage,
            response.status().as_u16(),
            Some(err.error_code()),
        )
        .await;
        response
    }

    async fn emit(
        &self,
        terminal: TerminalState,
        stage: Stage,
        status: u16,
        error_code: Option<&'static str>,
    ) {
        let record = TelemetryStage::record(terminal, stage, &self.ctx, status, error_code);
        self.pipeline.telemetry.emit(&record).await;
    }

    fn step(&mut self, next: PipelineState) -> SolonResult<()> {
        self.state = self
            .state
            .advance(next)
            .map_err(|e| SolonError::handler(self.operation.id(), e))?;
        Ok(())
    }

    fn context<E>(&self, result: Result<(), E>) -> SolonResult<()>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        result.map_err(|e| SolonError::handler(self.operation.id(), e))
    }
}
