//! Trace context stage.
//!
//! Implements the [W3C Trace Context](https://www.w3.org/TR/trace-context/)
//! `traceparent` header: an inbound trace ID is continued, otherwise a new
//! trace starts. Each request gets its own span ID, which becomes the parent
//! span ID of the outbound `traceparent`.

use http::header::HeaderMap;
use uuid::Uuid;

/// The W3C Trace Context header for trace propagation.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Parsed or generated trace context for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    /// The 128-bit trace ID as 32 lowercase hex characters.
    pub trace_id: String,
    /// Span ID of the upstream caller, if propagated.
    pub parent_span_id: Option<String>,
    /// Span ID of this hop.
    pub span_id: String,
    /// Trace flags.
    pub flags: TraceFlags,
}

impl TraceContext {
    /// Continues the trace named by an inbound `traceparent`, or starts a
    /// new sampled trace when the header is absent or malformed.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let inbound = headers
            .get(TRACEPARENT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(Self::parse);

        match inbound {
            Some(parent) => Self {
                span_id: generate_span_id(),
                ..parent
            },
            None => Self::generate(),
        }
    }

    /// Starts a new sampled trace.
    pub fn generate() -> Self {
        Self {
            trace_id: generate_trace_id(),
            parent_span_id: None,
            span_id: generate_span_id(),
            flags: TraceFlags::SAMPLED,
        }
    }

    /// Parses a `traceparent` header value.
    ///
    /// Format: `{version}-{trace-id}-{parent-span-id}-{flags}`. The span ID
    /// of the result is freshly generated.
    pub fn parse(value: &str) -> Option<Self> {
        let parts: Vec<&str> = value.trim().split('-').collect();
        if parts.len() != 4 {
            return None;
        }

        if parts[0] != "00" {
            return None;
        }

        let trace_id = parts[1];
        if !is_hex(trace_id, 32) || is_zero(trace_id) {
            return None;
        }

        let parent_span_id = parts[2];
        if !is_hex(parent_span_id, 16) || is_zero(parent_span_id) {
            return None;
        }

        let flags = parts[3];
        if !is_hex(flags, 2) {
            return None;
        }
        let flags_byte = u8::from_str_radix(flags, 16).ok()?;

        Some(Self {
            trace_id: trace_id.to_ascii_lowercase(),
            parent_span_id: Some(parent_span_id.to_ascii_lowercase()),
            span_id: generate_span_id(),
            flags: TraceFlags(flags_byte),
        })
    }

    /// Formats the outbound `traceparent`, with this hop as the parent.
    pub fn traceparent(&self) -> String {
        format!("00-{}-{}-{:02x}", self.trace_id, self.span_id, self.flags.0)
    }
}

/// W3C trace flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceFlags(pub u8);

impl TraceFlags {
    /// The sampled flag.
    pub const SAMPLED: Self = Self(0x01);

    /// Returns `true` if the trace is sampled.
    #[must_use]
    pub const fn is_sampled(self) -> bool {
        self.0 & 0x01 != 0
    }
}

fn is_hex(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_zero(value: &str) -> bool {
    value.chars().all(|c| c == '0')
}

fn generate_trace_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn generate_span_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    uuid[..16].to_string()
}
