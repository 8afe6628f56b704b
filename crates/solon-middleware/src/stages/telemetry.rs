//! Telemetry stage.
//!
//! Builds the single [`TelemetryRecord`] for a request that reached a
//! terminal state, counts it in the request metrics and hands it to the
//! configured emitter.

use std::fmt;
use std::sync::Arc;

use solon_core::RequestContext;
use solon_telemetry::metrics::record_request;
use solon_telemetry::{LogEmitter, TelemetryEmitter, TelemetryRecord, TerminalState};

use super::Stage;
use crate::pipeline::UNMATCHED_OPERATION;

/// Emits per-request telemetry records.
#[derive(Clone)]
pub struct TelemetryStage {
    emitter: Arc<dyn TelemetryEmitter>,
}

impl Default for TelemetryStage {
    fn default() -> Self {
        Self::new(Arc::new(LogEmitter::new()))
    }
}

impl fmt::Debug for TelemetryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryStage").finish_non_exhaustive()
    }
}

impl TelemetryStage {
    /// Creates a stage that emits through `emitter`.
    #[must_use]
    pub fn new(emitter: Arc<dyn TelemetryEmitter>) -> Self {
        Self { emitter }
    }

    /// Builds the record for a terminal request.
    #[must_use]
    pub fn record(
        terminal: TerminalState,
        stage: Stage,
        ctx: &RequestContext,
        status: u16,
        error_code: Option<&'static str>,
    ) -> TelemetryRecord {
        TelemetryRecord {
            terminal,
            stage: stage.name(),
            elapsed: ctx.elapsed(),
            request_id: ctx.request_id().to_string(),
            trace_id: ctx.trace_id().map(ToString::to_string),
            operation_id: ctx.operation_id().map(ToString::to_string),
            status,
            error_code,
        }
    }

    /// Records request metrics for `record`, then emits it.
    ///
    /// Metrics do not depend on the emitter, so a custom emitter still
    /// feeds `solon_requests_total`.
    pub async fn emit(&self, record: &TelemetryRecord) {
        record_request(
            record.operation_id.as_deref().unwrap_or(UNMATCHED_OPERATION),
            record.status,
            record.terminal.as_str(),
            record.elapsed,
        );
        self.emitter.emit(record).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use solon_telemetry::metrics::REQUESTS_TOTAL;
    use solon_telemetry::RecordingEmitter;

    #[tokio::test]
    async fn test_record_carries_context() {
        let ctx = RequestContext::mock();
        ctx.set_trace_id("0af7651916cd43dd8448eb211c80319c").unwrap();
        ctx.set_operation_id("getUser").unwrap();

        let recorder = Arc::new(RecordingEmitter::new());
        let stage = TelemetryStage::new(recorder.clone());

        let record = TelemetryStage::record(
            TerminalState::Rejected,
            Stage::Validation,
            &ctx,
            400,
            Some("VALIDATION_ERROR"),
        );
        stage.emit(&record).await;

        let records = recorder.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].stage, "validation");
        assert_eq!(records[0].request_id, ctx.request_id().as_str());
        assert_eq!(records[0].operation_id.as_deref(), Some("getUser"));
        assert_eq!(records[0].error_code, Some("VALIDATION_ERROR"));
    }

    #[test]
    fn test_custom_emitter_still_counts_requests() {
        let ctx = RequestContext::mock();
        ctx.set_operation_id("deleteUser").unwrap();

        let recorder = Arc::new(RecordingEmitter::new());
        let stage = TelemetryStage::new(recorder.clone());
        let record = TelemetryStage::record(
            TerminalState::Rejected,
            Stage::Authorization,
            &ctx,
            403,
            Some("FORBIDDEN"),
        );

        let prometheus = PrometheusBuilder::new().build_recorder();
        let handle = prometheus.handle();
        metrics::with_local_recorder(&prometheus, || {
            stage.emit(&record).now_or_never().unwrap();
        });

        assert_eq!(recorder.records().len(), 1);
        let rendered = handle.render();
        let line = rendered
            .lines()
            .find(|line| line.starts_with(&format!("{REQUESTS_TOTAL}{{")))
            .unwrap_or_else(|| panic!("no request counter in:\n{rendered}"));
        assert!(line.contains(r#"operation="deleteUser""#), "{line}");
        assert!(line.contains(r#"status="403""#), "{line}");
        assert!(line.contains(r#"outcome="rejected""#), "{line}");
        assert!(line.ends_with(" 1"), "{line}");
    }
}
