//! Application assembly and lifecycle scenarios, driven through
//! `App::handle` without a socket.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::{Method, Request as HttpRequest, StatusCode};
use http_body_util::{BodyExt, Full};
use serde_json::{json, Value};
use solon_authz::{AllowAll, DenyAll};
use solon_config::{ResponseMode, SolonConfig, ValidationConfig};
use solon_core::{ContractRegistry, HandlerRegistry, HandlerResponse, SolonError};
use solon_middleware::{Request, Response};
use solon_server::{App, AppBuilder, LifecycleError, LifecycleState};

const CONTRACT: &str = r#"{
    "name": "users",
    "version": "2.0.0",
    "operations": [
        {
            "id": "getUser",
            "method": "GET",
            "path": "/users/{userId}",
            "parameters": [{"name": "userId", "in": "path", "type": "integer"}],
            "responses": {
                "200": {
                    "type": "object",
                    "properties": {"id": {"type": "integer"}, "name": {"type": "string"}},
                    "required": ["id", "name"]
                }
            },
            "scopes": ["users:read"]
        },
        {
            "id": "createUser",
            "method": "POST",
            "path": "/users",
            "request": {
                "type": "object",
                "properties": {"name": {"type": "string"}, "email": {"type": "string"}},
                "required": ["name", "email"]
            },
            "scopes": ["users:write"]
        },
        {"id": "ping", "method": "GET", "path": "/ping"}
    ]
}"#;

const READER: &str = r#"{"type":"user","user_id":"u-1","roles":["reader"]}"#;
const ADMIN: &str = r#"{"type":"user","user_id":"u-9","roles":["admin"]}"#;

type Journal = Arc<Mutex<Vec<String>>>;

fn contract() -> ContractRegistry {
    ContractRegistry::from_json_str(CONTRACT).unwrap()
}

fn handlers(calls: &Arc<AtomicUsize>, user_name: Value) -> HandlerRegistry {
    let mut handlers = HandlerRegistry::new();

    let counter = Arc::clone(calls);
    handlers
        .bind("getUser", move |ctx, _body| {
            counter.fetch_add(1, Ordering::SeqCst);
            let id = ctx.path_param("userId").cloned().unwrap_or(Value::Null);
            let name = user_name.clone();
            async move { Ok(HandlerResponse::ok(json!({"id": id, "name": name}))) }
        })
        .unwrap();

    let counter = Arc::clone(calls);
    handlers
        .bind("createUser", move |_ctx, _body: Bytes| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(HandlerResponse::created(json!({"id": 7}))) }
        })
        .unwrap();

    let counter = Arc::clone(calls);
    handlers
        .bind_fn("ping", move |_ctx, _body| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(HandlerResponse::ok(json!({"pong": true})))
        })
        .unwrap();

    handlers
}

/// A hook that records its name and optionally fails.
fn hook(
    journal: &Journal,
    name: &'static str,
    fail: bool,
) -> impl Fn() -> std::future::Ready<Result<(), LifecycleError>> {
    let journal = Arc::clone(journal);
    move || {
        journal.lock().unwrap().push(name.to_string());
        std::future::ready(if fail {
            Err(LifecycleError::new(format!("{name} failed")))
        } else {
            Ok(())
        })
    }
}

fn builder(calls: &Arc<AtomicUsize>) -> AppBuilder {
    App::builder()
        .contract(contract())
        .handlers(handlers(calls, json!("Ada")))
        .decision_point(AllowAll)
}

fn request(method: Method, uri: &str, identity: Option<&str>, body: &str) -> Request {
    let mut builder = HttpRequest::builder().method(method).uri(uri);
    if let Some(identity) = identity {
        builder = builder.header("x-caller-identity", identity);
    }
    if !body.is_empty() {
        builder = builder.header("content-type", "application/json");
    }
    builder
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_failed_startup_hook_aborts_remaining_hooks() {
    let calls = Arc::new(AtomicUsize::new(0));
    let journal = Journal::default();
    let app = builder(&calls)
        .on_startup("a", hook(&journal, "a", true))
        .on_startup("b", hook(&journal, "b", false))
        .build()
        .unwrap();

    let err = app.start().await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Startup(SolonError::LifecycleHookFailure { ref hook, .. }) if hook == "a"
    ));
    assert_eq!(*journal.lock().unwrap(), vec!["a"]);
    assert_eq!(app.state(), LifecycleState::Stopped);

    let response = app.handle(request(Method::GET, "/ping", None, "")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(app.ready().status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_shutdown_hooks_run_in_reverse_registration_order() {
    let calls = Arc::new(AtomicUsize::new(0));
    let journal = Journal::default();
    let app = builder(&calls)
        .on_startup("open", hook(&journal, "open", false))
        .on_shutdown("c", hook(&journal, "c", false))
        .on_shutdown("d", hook(&journal, "d", false))
        .build()
        .unwrap();

    app.start().await.unwrap();
    app.stop().await.unwrap();

    assert_eq!(*journal.lock().unwrap(), vec!["open", "d", "c"]);
    assert_eq!(app.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn test_requests_outside_running_are_refused() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = builder(&calls).build().unwrap();

    let mut before = request(Method::GET, "/ping", None, "");
    before
        .headers_mut()
        .insert("x-request-id", "req-early".parse().unwrap());
    let response = app.handle(before).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.headers()["x-request-id"], "req-early");
    assert!(response.headers().contains_key("traceparent"));
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");

    app.start().await.unwrap();
    let response = app.handle(request(Method::GET, "/ping", None, "")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.ready().status(), StatusCode::OK);

    app.stop().await.unwrap();
    let response = app.handle(request(Method::GET, "/ping", None, "")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unbound_operation_fails_startup_before_hooks() {
    let calls = Arc::new(AtomicUsize::new(0));
    let journal = Journal::default();
    let mut partial = HandlerRegistry::new();
    partial
        .bind_fn("ping", |_ctx, _body| Ok(HandlerResponse::no_content()))
        .unwrap();

    let app = App::builder()
        .contract(contract())
        .handlers(partial)
        .decision_point(AllowAll)
        .on_startup("a", hook(&journal, "a", false))
        .build()
        .unwrap();

    let err = app.start().await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Startup(SolonError::UnboundOperation { ref operation_id, .. })
            if operation_id == "createUser"
    ));
    assert!(journal.lock().unwrap().is_empty());
    assert_eq!(app.state(), LifecycleState::Stopped);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_body_field_never_reaches_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = builder(&calls).build().unwrap();
    app.start().await.unwrap();

    let response = app
        .handle(request(
            Method::POST,
            "/users",
            Some(READER),
            r#"{"name": "Ada"}"#,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()["x-operation-id"], "createUser");
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("body.email"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_denied_request_never_reaches_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = App::builder()
        .contract(contract())
        .handlers(handlers(&calls, json!("Ada")))
        .decision_point(DenyAll)
        .build()
        .unwrap();
    app.start().await.unwrap();

    let response = app
        .handle(request(Method::GET, "/users/42", Some(READER), ""))
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_configured_rbac_allows_listed_anonymous_operations() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut config = SolonConfig::default();
    config.authorization.allow_anonymous = vec!["ping".to_string()];

    let app = App::builder()
        .contract(contract())
        .handlers(handlers(&calls, json!("Ada")))
        .config(config)
        .build()
        .unwrap();
    app.start().await.unwrap();

    let ping = app.handle(request(Method::GET, "/ping", None, "")).await;
    assert_eq!(ping.status(), StatusCode::OK);

    let anonymous = app.handle(request(Method::GET, "/users/1", None, "")).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    // No role grants are configured.
    let reader = app
        .handle(request(Method::GET, "/users/1", Some(READER), ""))
        .await;
    assert_eq!(reader.status(), StatusCode::FORBIDDEN);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_configured_role_grants_admit_users() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut config = SolonConfig::default();
    config
        .authorization
        .roles
        .insert("reader".to_string(), vec!["getUser".to_string()]);
    config
        .authorization
        .roles
        .insert("admin".to_string(), vec!["*".to_string()]);

    let app = App::builder()
        .contract(contract())
        .handlers(handlers(&calls, json!("Ada")))
        .config(config)
        .build()
        .unwrap();
    app.start().await.unwrap();

    let read = app
        .handle(request(Method::GET, "/users/1", Some(READER), ""))
        .await;
    assert_eq!(read.status(), StatusCode::OK);

    let write = app
        .handle(request(
            Method::POST,
            "/users",
            Some(READER),
            r#"{"name": "Ada", "email": "ada@example.com"}"#,
        ))
        .await;
    assert_eq!(write.status(), StatusCode::FORBIDDEN);

    let admin_write = app
        .handle(request(
            Method::POST,
            "/users",
            Some(ADMIN),
            r#"{"name": "Ada", "email": "ada@example.com"}"#,
        ))
        .await;
    assert_eq!(admin_write.status(), StatusCode::CREATED);

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_strict_response_mode_from_config() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = SolonConfig {
        validation: ValidationConfig {
            response_mode: ResponseMode::Strict,
            ..Default::default()
        },
        ..Default::default()
    };

    let app = App::builder()
        .contract(contract())
        .handlers(handlers(&calls, json!(17)))
        .decision_point(AllowAll)
        .config(config)
        .build()
        .unwrap();
    app.start().await.unwrap();

    let response = app
        .handle(request(Method::GET, "/users/5", Some(READER), ""))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "HANDLER_ERROR");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_contract_loaded_from_configured_path() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(CONTRACT.as_bytes()).unwrap();

    let mut config = SolonConfig::default();
    config.contract.path = Some(file.path().display().to_string());

    let calls = Arc::new(AtomicUsize::new(0));
    let app = App::builder()
        .handlers(handlers(&calls, json!("Ada")))
        .decision_point(AllowAll)
        .config(config)
        .load_contract()
        .await
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(app.router().len(), 3);
    app.start().await.unwrap();

    let response = app
        .handle(request(Method::GET, "/users/42", Some(READER), ""))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body, json!({"id": 42, "name": "Ada"}));
}

#[test]
fn test_invalid_config_is_rejected_at_build() {
    let mut config = SolonConfig::default();
    config.authorization.timeout_ms = 0;

    let err = App::builder()
        .contract(contract())
        .config(config)
        .build()
        .unwrap_err();
    assert!(matches!(err, solon_server::ServerError::Config(_)));
}

#[test]
fn test_operation_on_health_path_is_rejected_at_build() {
    let shadowed = ContractRegistry::from_json_str(
        r#"{"name": "ops", "version": "1.0.0", "operations": [
            {"id": "readiness", "method": "GET", "path": "/ready"}
        ]}"#,
    )
    .unwrap();

    let err = App::builder().contract(shadowed).build().unwrap_err();
    match err {
        solon_server::ServerError::Assembly(SolonError::RouteConflict {
            path,
            existing_operation,
            ..
        }) => {
            assert_eq!(path, "/ready");
            assert_eq!(existing_operation, "readiness");
        }
        other => panic!("expected a route conflict, got {other:?}"),
    }

    // Other methods and templated paths are accepted.
    for operation in [
        r#"{"id": "resetHealth", "method": "POST", "path": "/health"}"#,
        r#"{"id": "getPage", "method": "GET", "path": "/{slug}"}"#,
    ] {
        let allowed = ContractRegistry::from_json_str(&format!(
            r#"{{"name": "ops", "version": "1.0.0", "operations": [{operation}]}}"#
        ))
        .unwrap();
        assert!(App::builder().contract(allowed).build().is_ok(), "{operation}");
    }
}

#[test]
fn test_health_reports_configured_service() {
    let mut config = SolonConfig::default();
    config.telemetry.service_name = "users".to_string();
    config.telemetry.service_version = Some("2.0.0".to_string());

    let app = App::builder().config(config).build().unwrap();
    assert_eq!(app.health().status(), StatusCode::OK);
}
