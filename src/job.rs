//! Render job model and export state tracking.

use crate::artifacts::TempArtifacts;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Paths and limits for a single renderer invocation.
///
/// Created fresh for each export call and consumed by the runner, which
/// releases `artifacts` whatever the outcome.
#[derive(Debug)]
pub struct RenderJob {
    pub job_id: Uuid,
    pub binary_path: PathBuf,
    pub script_path: PathBuf,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub working_dir: PathBuf,
    pub timeout: Duration,
    pub artifacts: TempArtifacts,
}

/// What the renderer process left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub exited_cleanly: bool,
    pub exit_code: Option<i32>,
    pub stdout_text: String,
    pub stderr_text: String,
}

/// Linear stages of one export call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStage {
    Configured,
    DocumentPrepared,
    ScriptGenerated,
    CommandBuilt,
    ProcessRun,
    Completed,
    Failed,
}

impl ExportStage {
    /// Stage that follows this one on the success path.
    pub fn next(self) -> Option<Self> {
        match self {
            ExportStage::Configured => Some(ExportStage::DocumentPrepared),
            ExportStage::DocumentPrepared => Some(ExportStage::ScriptGenerated),
            ExportStage::ScriptGenerated => Some(ExportStage::CommandBuilt),
            ExportStage::CommandBuilt => Some(ExportStage::ProcessRun),
            ExportStage::ProcessRun => Some(ExportStage::Completed),
            ExportStage::Completed | ExportStage::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ExportStage::Completed | ExportStage::Failed)
    }
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportStage::Configured => write!(f, "configured"),
            ExportStage::DocumentPrepared => write!(f, "document_prepared"),
            ExportStage::ScriptGenerated => write!(f, "script_generated"),
            ExportStage::CommandBuilt => write!(f, "command_built"),
            ExportStage::ProcessRun => write!(f, "process_run"),
            ExportStage::Completed => write!(f, "completed"),
            ExportStage::Failed => write!(f, "failed"),
        }
    }
}

/// Progress record for one export call, used for logging and telemetry.
#[derive(Debug, Clone, Serialize)]
pub struct ExportRecord {
    pub job_id: Uuid,
    pub output_path: PathBuf,
    pub stage: ExportStage,
    /// Stage that was in progress when the export failed.
    pub failed_during: Option<ExportStage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl ExportRecord {
    pub fn new(output_path: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4(),
            output_path,
            stage: ExportStage::Configured,
            failed_during: None,
            created_at: now,
            updated_at: now,
            error: None,
        }
    }

    /// Moves to the next stage. Terminal records stay where they are.
    pub fn advance(&mut self) -> ExportStage {
        if let Some(next) = self.stage.next() {
            self.stage = next;
            self.updated_at = Utc::now();
        }
        self.stage
    }

    pub fn mark_failed(&mut self, error: String) {
        if self.stage.is_terminal() {
            return;
        }
        self.failed_during = self.stage.next();
        self.stage = ExportStage::Failed;
        self.updated_at = Utc::now();
        self.error = Some(error);
    }

    pub fn processing_duration_ms(&self) -> Option<i64> {
        if self.stage.is_terminal() {
            Some(
                self.updated_at
                    .signed_duration_since(self.created_at)
                    .num_milliseconds(),
            )
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_walks_linear_stages() {
        let mut record = ExportRecord::new(PathBuf::from("/tmp/out.pdf"));
        assert_eq!(record.stage, ExportStage::Configured);
        assert!(record.processing_duration_ms().is_none());

        let visited: Vec<_> = (0..6).map(|_| record.advance()).collect();
        assert_eq!(
            visited,
            vec![
                ExportStage::DocumentPrepared,
                ExportStage::ScriptGenerated,
                ExportStage::CommandBuilt,
                ExportStage::ProcessRun,
                ExportStage::Completed,
                ExportStage::Completed,
            ]
        );
        assert!(record.processing_duration_ms().is_some());
    }

    #[test]
    fn test_failure_records_stage_in_progress() {
        let mut record = ExportRecord::new(PathBuf::from("/tmp/out.pdf"));
        record.advance();
        record.mark_failed("boom".to_string());

        assert_eq!(record.stage, ExportStage::Failed);
        assert_eq!(record.failed_during, Some(ExportStage::ScriptGenerated));
        assert_eq!(record.error.as_deref(), Some("boom"));

        // Failed is terminal.
        assert_eq!(record.advance(), ExportStage::Failed);
        record.mark_failed("again".to_string());
        assert_eq!(record.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(ExportStage::DocumentPrepared.to_string(), "document_prepared");
        assert_eq!(ExportStage::Failed.to_string(), "failed");
    }
}
