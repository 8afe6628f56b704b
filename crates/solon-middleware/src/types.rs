//! HTTP types shared by the pipeline and the server.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;

/// The HTTP request type handled by the pipeline.
///
/// The server collects the body before the pipeline runs, so every request
/// carries a `Full<Bytes>` body.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type produced by the pipeline.
pub type Response = http::Response<Full<Bytes>>;

const APPLICATION_JSON: HeaderValue = HeaderValue::from_static("application/json");

/// Extension trait for building responses without the fallible builder.
pub trait ResponseExt {
    /// Creates a response with a JSON body.
    ///
    /// Falls back to an empty 500 response if `body` cannot be serialized.
    fn json<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> Response;

    /// Creates a JSON error response in the standard envelope.
    fn json_error(status: StatusCode, code: &str, message: &str) -> Response;

    /// Creates a response without a body.
    fn empty(status: StatusCode) -> Response;
}

impl ResponseExt for Response {
    fn json<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> Response {
        match serde_json::to_vec(body) {
            Ok(bytes) => {
                let mut response = Response::new(Full::new(Bytes::from(bytes)));
                *response.status_mut() = status;
                response.headers_mut().insert(CONTENT_TYPE, APPLICATION_JSON);
                response
            }
            Err(error) => {
                tracing::error!(error = %error, "Failed to serialize response body");
                Self::empty(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    fn json_error(status: StatusCode, code: &str, message: &str) -> Response {
        let body = serde_json::json!({
            "error": {
                "code": code,
                "message": message
            }
        });
        Self::json(status, &body)
    }

    fn empty(status: StatusCode) -> Response {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = status;
        response
    }
}
