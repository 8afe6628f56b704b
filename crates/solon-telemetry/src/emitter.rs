//! Per-request telemetry records.
//!
//! The request pipeline hands exactly one [`TelemetryRecord`] to a
//! [`TelemetryEmitter`] when a request reaches a terminal state. The default
//! [`LogEmitter`] turns the record into a structured log line;
//! [`RecordingEmitter`] keeps records in memory for assertions. Request
//! metrics are recorded by the pipeline before any emitter runs.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;


/// Terminal state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalState {
    /// Every stage ran; the response may still carry an error status.
    Completed,
    /// A stage failed and the remaining stages were skipped.
    Rejected,
}

impl TerminalState {
    /// Returns the lowercase label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one request, emitted once per terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryRecord {
    /// Terminal state reached.
    pub terminal: TerminalState,
    /// Pipeline stage in effect when the terminal state was reached.
    pub stage: &'static str,
    /// Time since the request context was created.
    pub elapsed: Duration,
    /// Request identifier.
    pub request_id: String,
    /// Trace identifier, if one was assigned.
    pub trace_id: Option<String>,
    /// Resolved operation, if routing succeeded.
    pub operation_id: Option<String>,
    /// Response status code.
    pub status: u16,
    /// Error code for rejected or failed requests.
    pub error_code: Option<&'static str>,
}

/// Sink for per-request telemetry records.
///
/// Emission is a suspension point of the pipeline. Implementations must not
/// fail the request; errors are theirs to log.
pub trait TelemetryEmitter: Send + Sync + 'static {
    /// Records one terminal outcome.
    fn emit<'a>(&'a self, record: &'a TelemetryRecord) -> BoxFuture<'a, ()>;
}

impl<T: TelemetryEmitter + ?Sized> TelemetryEmitter for Arc<T> {
    fn emit<'a>(&'a self, record: &'a TelemetryRecord) -> BoxFuture<'a, ()> {
        (**self).emit(record)
    }
}

/// Default emitter: one structured log line per record.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEmitter;

impl LogEmitter {
    /// Creates a new log emitter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TelemetryEmitter for LogEmitter {
    fn emit<'a>(&'a self, record: &'a TelemetryRecord) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let operation = record.operation_id.as_deref().unwrap_or("unknown");
            let duration_ms = record.elapsed.as_secs_f64() * 1000.0;

            match record.terminal {
                TerminalState::Completed => tracing::info!(
                    request_id = %record.request_id,
                    trace_id = record.trace_id.as_deref().unwrap_or(""),
                    operation_id = operation,
                    stage = record.stage,
                    http.status_code = record.status,
                    duration_ms,
                    "Request completed"
                ),
                TerminalState::Rejected => tracing::info!(
                    request_id = %record.request_id,
                    trace_id = record.trace_id.as_deref().unwrap_or(""),
                    operation_id = operation,
                    stage = record.stage,
                    http.status_code = record.status,
                    error = record.error_code.unwrap_or(""),
                    duration_ms,
                    "Request rejected"
                ),
            }
        })
    }
}

/// Emitter that stores every record in memory.
///
/// Clones share the same storage, so a clone handed to the pipeline can be
/// inspected through the original.
#[derive(Debug, Clone, Default)]
pub struct RecordingEmitter {
    records: Arc<Mutex<Vec<TelemetryRecord>>>,
}

impl RecordingEmitter {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the records emitted so far.
    #[must_use]
    pub fn records(&self) -> Vec<TelemetryRecord> {
        self.records.lock().clone()
    }

    /// Returns the number of records emitted so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns `true` if nothing has been emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl TelemetryEmitter for RecordingEmitter {
    fn emit<'a>(&'a self, record: &'a TelemetryRecord) -> BoxFuture<'a, ()> {
        self.records.lock().push(record.clone());
        Box::pin(std::future::ready(()))
    }
}
