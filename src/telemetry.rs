//! Telemetry and structured logging for PDF exports.

use crate::job::{ExportRecord, ExportStage};
use opentelemetry::trace::{Span, Tracer};
use opentelemetry::{global, KeyValue};
use tracing::{debug, info, warn};

const TRACER_NAME: &str = "report-export";

/// Exports slower than this are logged as warnings.
const SLOW_EXPORT_THRESHOLD_MS: i64 = 5000;

/// Records telemetry for a finished export call.
///
/// Emits one OpenTelemetry span and a matching structured log line with
/// the job id, final stage, duration and, for failures, the stage that was
/// in progress and the error text.
pub fn record_export_telemetry(record: &ExportRecord) {
    let tracer = global::tracer(TRACER_NAME);
    let mut span = tracer.start("pdf_export");

    span.set_attribute(KeyValue::new("job_id", record.job_id.to_string()));
    span.set_attribute(KeyValue::new("stage", record.stage.to_string()));
    span.set_attribute(KeyValue::new(
        "output_path",
        record.output_path.display().to_string(),
    ));

    if let Some(duration_ms) = record.processing_duration_ms() {
        span.set_attribute(KeyValue::new("duration_ms", duration_ms));

        info!(
            job_id = %record.job_id,
            duration_ms = duration_ms,
            stage = %record.stage,
            "PDF export finished"
        );

        if duration_ms > SLOW_EXPORT_THRESHOLD_MS {
            warn!(
                job_id = %record.job_id,
                duration_ms = duration_ms,
                "PDF export exceeded performance threshold ({}ms)",
                SLOW_EXPORT_THRESHOLD_MS
            );
        }
    }

    if record.stage == ExportStage::Failed {
        if let Some(failed_during) = record.failed_during {
            span.set_attribute(KeyValue::new("failed_during", failed_during.to_string()));
        }
        if let Some(ref error) = record.error {
            span.set_attribute(KeyValue::new("error", error.clone()));
            warn!(
                job_id = %record.job_id,
                failed_during = ?record.failed_during,
                error = %error,
                "PDF export failed"
            );
        }
    }

    match record_json(record) {
        Ok(json) => debug!(job_id = %record.job_id, record = %json, "PDF export record"),
        Err(err) => warn!(job_id = %record.job_id, error = %err, "Failed to serialize export record"),
    }

    span.end();
}

/// Serializes the record as a single JSON line for log shippers.
pub fn record_json(record: &ExportRecord) -> serde_json::Result<String> {
    serde_json::to_string(record)
}

/// Initializes OpenTelemetry with an OTLP exporter.
///
/// Call once at startup, inside a tokio runtime. Reads:
/// - `OTEL_EXPORTER_OTLP_ENDPOINT` - collector endpoint (default: http://localhost:4317)
/// - `OTEL_SERVICE_NAME` - service name (default: report-export)
pub fn init_telemetry() -> Result<(), Box<dyn std::error::Error>> {
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::Config;

    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| TRACER_NAME.to_string());

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(&endpoint),
        )
        .with_trace_config(Config::default().with_resource(
            opentelemetry_sdk::Resource::new(vec![
                KeyValue::new("service.name", service_name),
                KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            ]),
        ))
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;

    if let Some(provider) = tracer.provider() {
        global::set_tracer_provider(provider);
    }

    info!("Telemetry initialized: endpoint={}", endpoint);
    Ok(())
}

/// Flushes pending spans before exit.
pub fn shutdown_telemetry() {
    global::shutdown_tracer_provider();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_record_completed_export() {
        let mut record = ExportRecord::new(PathBuf::from("/tmp/test.pdf"));
        while !record.stage.is_terminal() {
            record.advance();
        }

        // No provider installed: spans go to the no-op tracer.
        record_export_telemetry(&record);
    }

    #[test]
    fn test_record_failed_export() {
        let mut record = ExportRecord::new(PathBuf::from("/tmp/test.pdf"));
        record.advance();
        record.mark_failed("renderer exceeded timeout of 1s".to_string());

        record_export_telemetry(&record);
        assert_eq!(record.failed_during, Some(ExportStage::ScriptGenerated));
    }

    #[test]
    fn test_record_json_fields() {
        let mut record = ExportRecord::new(PathBuf::from("/tmp/test.pdf"));
        record.advance();
        record.mark_failed("boom".to_string());

        let value: serde_json::Value =
            serde_json::from_str(&record_json(&record).unwrap()).unwrap();
        assert_eq!(value["job_id"], record.job_id.to_string());
        assert_eq!(value["output_path"], "/tmp/test.pdf");
        assert_eq!(value["stage"], "failed");
        assert_eq!(value["failed_during"], "script_generated");
        assert_eq!(value["error"], "boom");
    }
}
