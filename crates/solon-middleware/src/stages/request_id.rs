//! Request ID stage.
//!
//! Every request gets an identifier before anything else runs. An inbound
//! `x-request-id` is reused when it is present and non-empty, so callers
//! can correlate their own logs; otherwise a UUID v7 is generated. The
//! identifier, the outbound `traceparent` and the resolved operation ID are
//! echoed on every response, including errors.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use solon_core::RequestId;

use super::tracing::TRACEPARENT_HEADER;

/// The header carrying the request ID in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Response header naming the operation the request resolved to.
pub const OPERATION_ID_HEADER: &str = "x-operation-id";

/// Assigns request IDs.
#[derive(Debug, Clone, Copy)]
pub struct RequestIdStage {
    trust_inbound: bool,
}

impl Default for RequestIdStage {
    fn default() -> Self {
        Self {
            trust_inbound: true,
        }
    }
}

impl RequestIdStage {
    /// Creates a stage that reuses inbound request IDs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stage that always generates a fresh ID.
    #[must_use]
    pub fn generate_only() -> Self {
        Self {
            trust_inbound: false,
        }
    }

    /// Returns the inbound ID if usable, a new one otherwise.
    pub fn assign(&self, headers: &HeaderMap) -> RequestId {
        if !self.trust_inbound {
            return RequestId::new();
        }

        headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map_or_else(RequestId::new, RequestId::from_inbound)
    }
}

/// Correlation headers copied onto the response.
#[derive(Debug, Clone, Default)]
pub struct EchoHeaders {
    /// Request ID.
    pub request_id: String,
    /// Outbound `traceparent` for this hop.
    pub traceparent: Option<String>,
    /// Operation ID, once routing has succeeded.
    pub operation_id: Option<String>,
}

impl EchoHeaders {
    /// Writes the headers into `headers`, skipping values that are not
    /// valid header text.
    pub fn apply(&self, headers: &mut HeaderMap) {
        insert(headers, REQUEST_ID_HEADER, &self.request_id);
        if let Some(traceparent) = &self.traceparent {
            insert(headers, TRACEPARENT_HEADER, traceparent);
        }
        if let Some(operation_id) = &self.operation_id {
            insert(headers, OPERATION_ID_HEADER, operation_id);
        }
    }
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(HeaderName::from_static(name), value);
        }
        Err(_) => tracing::debug!(header = name, "Skipping echo of non-ASCII header value"),
    }
}
