//! Error normalization.
//!
//! Every failure leaves the pipeline as the same JSON envelope:
//!
//! ```json
//! {
//!   "error": {
//!     "code": "VALIDATION_ERROR",
//!     "message": "Validation failed: path.userId: expected integer",
//!     "request_id": "0192f0c4-...",
//!     "details": { "fields": { "path.userId": ["expected integer"] } }
//!   }
//! }
//! ```
//!
//! Handler failures are logged in full with the request ID and sent to the
//! caller as a generic message.

use http::header::{HeaderValue, ALLOW};
use solon_core::SolonError;
use tracing::error;

use crate::types::{Response, ResponseExt};

/// Converts `err` into an error response.
pub fn error_response(err: &SolonError, request_id: &str) -> Response {
    if let SolonError::Handler {
        operation_id,
        source,
    } = err
    {
        let detail = format!("{source:#}");
        error!(
            request_id,
            operation_id = %operation_id,
            error = %detail,
            "Handler failed"
        );
    } else if !err.is_request_error() {
        error!(request_id, error = %err, "Request failed with an internal error");
    }

    let mut response = Response::json(err.status_code(), &err.to_envelope(Some(request_id)));

    if let SolonError::MethodNotAllowed { allowed, .. } = err {
        if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
            response.headers_mut().insert(ALLOW, value);
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use solon_core::GENERIC_HANDLER_MESSAGE;

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_envelope() {
        let err = SolonError::validation_field("path.userId", "expected integer");
        let response = error_response(&err, "req-1");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["request_id"], "req-1");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("path.userId: expected integer"));
    }

    #[tokio::test]
    async fn test_handler_error_is_not_leaked() {
        let err = SolonError::handler("getUser", anyhow::anyhow!("db password rejected"));
        let response = error_response(&err, "req-2");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "HANDLER_ERROR");
        assert_eq!(body["error"]["message"], GENERIC_HANDLER_MESSAGE);
        assert!(!body.to_string().contains("password"));
    }

    #[tokio::test]
    async fn test_method_not_allowed_sets_allow() {
        let err = SolonError::method_not_allowed(
            "DELETE",
            "/users/1",
            vec!["GET".to_string(), "PUT".to_string()],
        );
        let response = error_response(&err, "req-3");

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(ALLOW).unwrap(), "GET, PUT");
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (SolonError::route_not_found("GET", "/x"), StatusCode::NOT_FOUND),
            (SolonError::authentication_missing("op"), StatusCode::UNAUTHORIZED),
            (SolonError::authorization_denied("no"), StatusCode::FORBIDDEN),
            (SolonError::policy_unavailable("down"), StatusCode::SERVICE_UNAVAILABLE),
            (SolonError::service_unavailable("stopping"), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(error_response(&err, "req").status(), status);
        }
    }
}
