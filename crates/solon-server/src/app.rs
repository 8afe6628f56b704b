//! Application assembly.
//!
//! An [`App`] ties a contract, its handlers, a decision point and the
//! configuration into one request pipeline guarded by a
//! [`LifecycleManager`]. [`App::handle`] is the transport-independent entry
//! point; the hyper server in [`crate::server`] and the scenario tests both
//! go through it.
//!
//! # Example
//!
//! ```rust
//! use solon_core::{ContractRegistry, HandlerRegistry, HandlerResponse};
//! use solon_authz::AllowAll;
//! use solon_server::App;
//!
//! # tokio_test::block_on(async {
//! let contract = ContractRegistry::from_json_str(r#"{
//!     "name": "demo",
//!     "version": "1.0.0",
//!     "operations": [{"id": "ping", "method": "GET", "path": "/ping"}]
//! }"#).unwrap();
//!
//! let mut handlers = HandlerRegistry::new();
//! handlers
//!     .bind_fn("ping", |_ctx, _body| Ok(HandlerResponse::ok(serde_json::json!("pong"))))
//!     .unwrap();
//!
//! let app = App::builder()
//!     .contract(contract)
//!     .handlers(handlers)
//!     .decision_point(AllowAll)
//!     .build()
//!     .unwrap();
//!
//! app.start().await.unwrap();
//! assert!(app.is_running());
//! app.stop().await.unwrap();
//! # });
//! ```

use std::fmt;
use std::sync::Arc;

use solon_authz::{
    AllowAll, AuthorizationGate, AuthzError, DecisionPoint, DenyAll, HttpDecisionPoint,
    RbacDecisionPoint,
};
use solon_config::{AuthorizationConfig, DecisionPointKind, ResponseMode, SolonConfig};
use solon_core::{ContractRegistry, HandlerRegistry, SolonError};
use solon_middleware::stages::RequestIdStage;
use solon_middleware::{
    IdentityResolver, Pipeline, Request, ResponseValidationMode, Response, Validator,
};
use http::Method;
use solon_router::Router;
use solon_telemetry::TelemetryEmitter;
use tracing::{debug, info};

use crate::error::ServerResult;
use crate::health::{readiness_response, HealthCheck, HEALTH_PATH, READY_PATH};
use crate::lifecycle::{LifecycleManager, LifecycleResult, LifecycleState};

/// An assembled application.
#[derive(Debug)]
pub struct App {
    pipeline: Pipeline,
    handlers: Arc<HandlerRegistry>,
    lifecycle: LifecycleManager,
    health: HealthCheck,
    config: SolonConfig,
}

impl App {
    /// Starts assembling an application.
    #[must_use]
    pub fn builder() -> AppBuilder {
        AppBuilder::default()
    }

    /// Performs `Starting`: verifies that every operation has exactly one
    /// handler, then runs the startup hooks in order.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Startup`](crate::LifecycleError::Startup) with
    /// [`SolonError::UnboundOperation`] or
    /// [`SolonError::LifecycleHookFailure`]; the application is then
    /// `Stopped` and never serves a request.
    pub async fn start(&self) -> LifecycleResult {
        let router = self.pipeline.router();
        self.lifecycle
            .start_with(|| self.handlers.ensure_bound(router.operation_ids()))
            .await
    }

    /// Processes one request.
    ///
    /// Outside `Running` the request is refused with `503` before any stage
    /// runs.
    pub async fn handle(&self, request: Request) -> Response {
        let state = self.lifecycle.state();
        if state != LifecycleState::Running {
            debug!(state = %state, "Refusing request outside Running");
            return self.pipeline.refuse(
                request.headers(),
                &SolonError::service_unavailable(state.as_str()),
            );
        }
        self.pipeline.process(request).await
    }

    /// Performs `Stopping`: runs the shutdown hooks in reverse order.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Shutdown`](crate::LifecycleError::Shutdown) listing
    /// failed hooks; the application is `Stopped` regardless.
    pub async fn stop(&self) -> LifecycleResult {
        self.lifecycle.stop().await
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Returns `true` while requests are processed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    /// The `/health` response.
    #[must_use]
    pub fn health(&self) -> Response {
        self.health.response()
    }

    /// The `/ready` response: `200` only while `Running`.
    #[must_use]
    pub fn ready(&self) -> Response {
        readiness_response(self.state())
    }

    /// Effective configuration.
    #[must_use]
    pub fn config(&self) -> &SolonConfig {
        &self.config
    }

    /// Route table.
    #[must_use]
    pub fn router(&self) -> &Router {
        self.pipeline.router()
    }

    /// Request pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

/// Builder for [`App`].
#[must_use]
#[derive(Default)]
pub struct AppBuilder {
    contract: Option<ContractRegistry>,
    routers: Vec<Router>,
    handlers: Option<HandlerRegistry>,
    decision_point: Option<Arc<dyn DecisionPoint>>,
    emitter: Option<Arc<dyn TelemetryEmitter>>,
    identity: Option<IdentityResolver>,
    config: SolonConfig,
    lifecycle: LifecycleManager,
}

impl fmt::Debug for AppBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppBuilder")
            .field("contract", &self.contract.as_ref().map(ContractRegistry::name))
            .field("routers", &self.routers.len())
            .field("handlers", &self.handlers)
            .field("decision_point", &self.decision_point)
            .field("emitter", &self.emitter.is_some())
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl AppBuilder {
    /// Routes every operation of `contract`.
    pub fn contract(mut self, contract: ContractRegistry) -> Self {
        self.contract = Some(contract);
        self
    }

    /// Merges an additional router into the route table.
    pub fn router(mut self, router: Router) -> Self {
        self.routers.push(router);
        self
    }

    /// Sets the handler bindings.
    pub fn handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = Some(handlers);
        self
    }

    /// Sets the decision point, overriding the configured one.
    pub fn decision_point(mut self, point: impl DecisionPoint) -> Self {
        self.decision_point = Some(Arc::new(point));
        self
    }

    /// Sets a shared decision point, overriding the configured one.
    pub fn shared_decision_point(mut self, point: Arc<dyn DecisionPoint>) -> Self {
        self.decision_point = Some(point);
        self
    }

    /// Sets the telemetry emitter.
    pub fn emitter(mut self, emitter: impl TelemetryEmitter) -> Self {
        self.emitter = Some(Arc::new(emitter));
        self
    }

    /// Sets a shared telemetry emitter.
    pub fn shared_emitter(mut self, emitter: Arc<dyn TelemetryEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Sets the identity resolver.
    pub fn identity_resolver(mut self, resolver: IdentityResolver) -> Self {
        self.identity = Some(resolver);
        self
    }

    /// Sets the configuration.
    pub fn config(mut self, config: SolonConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a startup hook.
    pub fn on_startup<F, Fut>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = LifecycleResult> + Send + 'static,
    {
        self.lifecycle = self.lifecycle.on_startup(name, hook);
        self
    }

    /// Registers a shutdown hook.
    pub fn on_shutdown<F, Fut>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = LifecycleResult> + Send + 'static,
    {
        self.lifecycle = self.lifecycle.on_shutdown(name, hook);
        self
    }

    /// Loads the contract named by `contract.path` unless one was given.
    ///
    /// # Errors
    ///
    /// [`ServerError::Assembly`](crate::ServerError::Assembly) with a schema
    /// compile error.
    pub async fn load_contract(mut self) -> ServerResult<Self> {
        if self.contract.is_none() {
            if let Some(path) = self.config.contract.path.clone() {
                self.contract = Some(ContractRegistry::from_file(path).await?);
            }
        }
        Ok(self)
    }

    /// Assembles the application in the `Idle` state.
    ///
    /// # Errors
    ///
    /// - [`ServerError::Config`](crate::ServerError::Config) for an invalid
    ///   configuration.
    /// - [`ServerError::Assembly`](crate::ServerError::Assembly) for route
    ///   conflicts between the contract and added routers, or with the
    ///   `GET /health` and `GET /ready` probes.
    /// - [`ServerError::Authz`](crate::ServerError::Authz) if the configured
    ///   decision point cannot be built.
    pub fn build(self) -> ServerResult<App> {
        self.config.validate()?;

        let mut router = match &self.contract {
            Some(contract) => Router::from_registry(contract)?,
            None => Router::new(),
        };
        for extra in self.routers {
            router.merge(extra)?;
        }
        reject_probe_shadowing(&router)?;

        let decision_point = match self.decision_point {
            Some(point) => point,
            None => configured_decision_point(&self.config.authorization)?,
        };
        let gate = AuthorizationGate::from_shared(
            decision_point,
            self.config.authorization.gate_config(),
        );
        let decision_point = gate.decision_point();

        let validation = &self.config.validation;
        let validator = Validator::new()
            .with_response_validation(validation.validate_responses)
            .with_response_mode(match validation.response_mode {
                ResponseMode::Observe => ResponseValidationMode::Observe,
                ResponseMode::Strict => ResponseValidationMode::Strict,
            });

        let handlers = Arc::new(self.handlers.unwrap_or_default());
        let mut pipeline = Pipeline::builder(Arc::new(router), Arc::clone(&handlers), gate)
            .request_ids(RequestIdStage::new())
            .identity_resolver(self.identity.unwrap_or_default())
            .validator(validator)
            .handler_timeout(self.config.server.request_timeout());
        if let Some(emitter) = self.emitter {
            pipeline = pipeline.emitter(emitter);
        }
        let pipeline = pipeline.build();

        let telemetry = &self.config.telemetry;
        let health = HealthCheck::new(
            telemetry.service_name.clone(),
            telemetry
                .service_version
                .clone()
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
        );

        info!(
            operations = pipeline.router().len(),
            handlers = handlers.len(),
            decision_point,
            "Application assembled"
        );

        Ok(App {
            pipeline,
            handlers,
            lifecycle: self.lifecycle,
            health,
            config: self.config,
        })
    }
}

/// The server answers the probe paths before routing, so a `GET` operation
/// declared on exactly one of them would never be reached. Templated paths
/// that merely match a probe path keep every other value and are allowed.
fn reject_probe_shadowing(router: &Router) -> Result<(), SolonError> {
    for probe in [HEALTH_PATH, READY_PATH] {
        let Ok(route) = router.resolve(&Method::GET, probe) else {
            continue;
        };
        let pattern = route.operation.path().to_string();
        if pattern == probe {
            return Err(SolonError::RouteConflict {
                method: Method::GET.to_string(),
                path: probe.to_string(),
                existing: pattern,
                existing_operation: route.operation_id().to_string(),
            });
        }
    }
    Ok(())
}

fn configured_decision_point(
    config: &AuthorizationConfig,
) -> ServerResult<Arc<dyn DecisionPoint>> {
    let point: Arc<dyn DecisionPoint> = match config.decision_point {
        DecisionPointKind::AllowAll => Arc::new(AllowAll),
        DecisionPointKind::DenyAll => Arc::new(DenyAll),
        DecisionPointKind::Rbac => {
            let rbac = config.roles.iter().fold(
                RbacDecisionPoint::builder()
                    .allow_anonymous_operations(config.allow_anonymous.iter().cloned()),
                |rbac, (role, operations)| rbac.allow_role(role.clone(), operations.iter().cloned()),
            );
            Arc::new(rbac.build())
        }
        DecisionPointKind::Http => {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                AuthzError::Config("the http decision point needs an endpoint".to_string())
            })?;
            Arc::new(HttpDecisionPoint::new(endpoint)?)
        }
    };
    Ok(point)
}
