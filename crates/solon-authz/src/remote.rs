//! Remote decision point over HTTP.
//!
//! The [`DecisionQuery`] is POSTed as JSON to a fixed endpoint. The endpoint
//! must answer 2xx with `{"allow": bool, "reason": string?}`. Any other
//! status, a transport error, or an unparseable body means no decision.

use futures_util::future::BoxFuture;
use serde::Deserialize;
use solon_core::AuthorizationDecision;
use tracing::debug;

use crate::decision_point::{DecisionPoint, DecisionQuery};
use crate::error::{AuthzError, AuthzResult};

/// Reason used when the endpoint denies without giving one.
const DEFAULT_DENY_REASON: &str = "denied by policy";

#[derive(Debug, Deserialize)]
struct DecisionResponse {
    allow: bool,
    #[serde(default)]
    reason: Option<String>,
}

impl From<DecisionResponse> for AuthorizationDecision {
    fn from(response: DecisionResponse) -> Self {
        if response.allow {
            Self::Allow
        } else {
            Self::deny(
                response
                    .reason
                    .unwrap_or_else(|| DEFAULT_DENY_REASON.to_string()),
            )
        }
    }
}

/// Decision point backed by an HTTP policy service.
#[derive(Debug, Clone)]
pub struct HttpDecisionPoint {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpDecisionPoint {
    /// Creates a decision point for `endpoint` with a default client.
    pub fn new(endpoint: impl Into<String>) -> AuthzResult<Self> {
        let endpoint = endpoint.into();
        reqwest::Url::parse(&endpoint)
            .map_err(|e| AuthzError::Config(format!("invalid endpoint '{endpoint}': {e}")))?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AuthzError::Config(e.to_string()))?;
        Ok(Self { client, endpoint })
    }

    /// Creates a decision point sharing an existing client.
    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Returns the endpoint queried.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn query(&self, query: &DecisionQuery) -> AuthzResult<AuthorizationDecision> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(query)
            .send()
            .await
            .map_err(|e| AuthzError::unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthzError::Status {
                status: status.as_u16(),
            });
        }

        let body: DecisionResponse = response
            .json()
            .await
            .map_err(|e| AuthzError::InvalidResponse(e.to_string()))?;

        debug!(
            operation_id = %query.operation_id,
            allow = body.allow,
            "Remote decision received"
        );
        Ok(body.into())
    }
}

impl DecisionPoint for HttpDecisionPoint {
    fn name(&self) -> &'static str {
        "http"
    }

    fn decide<'a>(
        &'a self,
        query: &'a DecisionQuery,
    ) -> BoxFuture<'a, AuthzResult<AuthorizationDecision>> {
        Box::pin(self.query(query))
    }
}
