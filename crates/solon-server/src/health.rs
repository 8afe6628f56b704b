//! Built-in probe endpoints.
//!
//! - `GET /health`: liveness. Always `200` with service name, version and
//!   uptime while the process can answer.
//! - `GET /ready`: readiness. `200` only while the application is
//!   [`Running`](crate::LifecycleState::Running), `503` otherwise.

use std::time::{Duration, Instant};

use http::StatusCode;
use serde::{Deserialize, Serialize};
use solon_middleware::{Response, ResponseExt};

use crate::lifecycle::LifecycleState;

/// Path of the liveness probe.
pub const HEALTH_PATH: &str = "/health";

/// Path of the readiness probe.
pub const READY_PATH: &str = "/ready";

/// Body of a `/health` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    /// Always `"healthy"` when the process answers.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Seconds since the application was built.
    pub uptime_seconds: u64,
}

/// Body of a `/ready` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadinessStatus {
    /// Whether requests are being processed.
    pub ready: bool,
    /// Current lifecycle state name.
    pub state: String,
}

impl ReadinessStatus {
    /// Readiness for `state`.
    #[must_use]
    pub fn from_state(state: LifecycleState) -> Self {
        Self {
            ready: state == LifecycleState::Running,
            state: state.as_str().to_string(),
        }
    }

    /// `200` when ready, `503` otherwise.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        if self.ready {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Liveness reporter.
///
/// ```rust
/// use solon_server::HealthCheck;
///
/// let health = HealthCheck::new("users", "1.4.0");
/// let status = health.status();
/// assert_eq!(status.status, "healthy");
/// assert_eq!(status.service, "users");
/// ```
#[derive(Debug, Clone)]
pub struct HealthCheck {
    service: String,
    version: String,
    started: Instant,
}

impl HealthCheck {
    /// Starts the uptime clock for `service` at `version`.
    #[must_use]
    pub fn new(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
            started: Instant::now(),
        }
    }

    /// Current liveness report.
    #[must_use]
    pub fn status(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy".to_string(),
            service: self.service.clone(),
            version: self.version.clone(),
            uptime_seconds: self.uptime().as_secs(),
        }
    }

    /// Time since construction.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Renders the `/health` response.
    #[must_use]
    pub fn response(&self) -> Response {
        Response::json(StatusCode::OK, &self.status())
    }
}

/// Renders the `/ready` response for `state`.
#[must_use]
pub fn readiness_response(state: LifecycleState) -> Response {
    let status = ReadinessStatus::from_state(state);
    Response::json(status.status_code(), &status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_only_running_is_ready() {
        for state in [
            LifecycleState::Idle,
            LifecycleState::Starting,
            LifecycleState::Stopping,
            LifecycleState::Stopped,
        ] {
            let status = ReadinessStatus::from_state(state);
            assert!(!status.ready, "{state} should not be ready");
            assert_eq!(status.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        }

        let running = ReadinessStatus::from_state(LifecycleState::Running);
        assert!(running.ready);
        assert_eq!(running.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_response_body() {
        let response = readiness_response(LifecycleState::Stopping);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = body_json(response).await;
        assert_eq!(body["ready"], false);
        assert_eq!(body["state"], "stopping");
    }

    #[tokio::test]
    async fn test_health_response_body() {
        let response = HealthCheck::new("users", "1.0.0").response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "users");
        assert_eq!(body["version"], "1.0.0");
        assert!(body["uptime_seconds"].is_u64());
    }
}
