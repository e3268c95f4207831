//! End-to-end PDF export: document in, PDF path out.

use crate::artifacts::TempArtifacts;
use crate::command::CommandBuilder;
use crate::config::ExportConfig;
use crate::document::{
    BinaryLocator, BodyPersister, DocumentSource, RenderedDocument, TempFileBodyPersister,
};
use crate::error::{ExportError, Result};
use crate::job::{ExportRecord, ExportStage, RenderJob};
use crate::path::PlatformFamily;
use crate::process::ProcessRunner;
use crate::script::LayoutScriptGenerator;
use crate::telemetry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};

/// Drives one export call through every stage.
///
/// The pipeline holds only read-only collaborators, so one instance can
/// serve concurrent export calls. Each call gets its own [`RenderJob`] and
/// its own temporary files.
#[derive(Clone)]
pub struct PdfExportPipeline {
    locator: Arc<dyn BinaryLocator>,
    persister: Arc<dyn BodyPersister>,
    builder: CommandBuilder,
    runner: ProcessRunner,
}

impl PdfExportPipeline {
    pub fn new(locator: Arc<dyn BinaryLocator>) -> Self {
        Self {
            locator,
            persister: Arc::new(TempFileBodyPersister),
            builder: CommandBuilder::default(),
            runner: ProcessRunner::new(),
        }
    }

    pub fn with_persister(mut self, persister: Arc<dyn BodyPersister>) -> Self {
        self.persister = persister;
        self
    }

    pub fn with_platform(mut self, platform: PlatformFamily) -> Self {
        self.builder = CommandBuilder::new(platform);
        self
    }

    /// Exports `source` to a PDF at `output_path` and returns that path.
    ///
    /// Any failure aborts the call after the temporary files created so far
    /// have been removed. Nothing is retried.
    pub async fn export<D>(
        &self,
        source: &D,
        config: &ExportConfig,
        output_path: impl AsRef<Path>,
    ) -> Result<PathBuf>
    where
        D: DocumentSource + ?Sized,
    {
        let mut record = ExportRecord::new(output_path.as_ref().to_path_buf());
        let span = info_span!("pdf_export", job_id = %record.job_id);

        let result = self
            .run_stages(source, config, output_path.as_ref(), &mut record)
            .instrument(span)
            .await;

        match &result {
            Ok(output) => {
                record.advance();
                info!(
                    job_id = %record.job_id,
                    output = %output.display(),
                    duration_ms = ?record.processing_duration_ms(),
                    "PDF export completed"
                );
            }
            Err(err) => record.mark_failed(err.to_string()),
        }
        telemetry::record_export_telemetry(&record);

        result
    }

    async fn run_stages<D>(
        &self,
        source: &D,
        config: &ExportConfig,
        output_path: &Path,
        record: &mut ExportRecord,
    ) -> Result<PathBuf>
    where
        D: DocumentSource + ?Sized,
    {
        let options = config.command_options()?;
        let binary_path = self.locator.locate()?;
        let output_path = absolute(output_path)?;
        let working_dir = match &config.working_dir {
            Some(dir) => dir.clone(),
            None => output_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        if !working_dir.is_dir() {
            return Err(ExportError::Config(format!(
                "renderer working directory {} does not exist",
                working_dir.display()
            )));
        }
        let temp_dir = config.temp_dir();
        let mut artifacts = TempArtifacts::new();

        let body_path = self.persister.persist(&source.content(), &temp_dir)?;
        let document = RenderedDocument::new(
            artifacts.track(body_path).to_path_buf(),
            &source.header(),
            &source.footer(),
        );
        self.enter(record, ExportStage::DocumentPrepared);

        let script_path = LayoutScriptGenerator::new(&temp_dir)
            .generate(&config.page_layout(), &document)?;
        let script_path = artifacts.track(script_path).to_path_buf();
        self.enter(record, ExportStage::ScriptGenerated);

        let command = self.builder.build(
            &binary_path,
            &options,
            &script_path,
            document.body_path(),
            &output_path,
        );
        let job = RenderJob {
            job_id: record.job_id,
            binary_path,
            script_path,
            input_path: document.body_path().to_path_buf(),
            output_path,
            working_dir,
            timeout: config.timeout(),
            artifacts,
        };
        self.enter(record, ExportStage::CommandBuilt);

        let output = self.runner.run(&command, job).await?;
        self.enter(record, ExportStage::ProcessRun);
        Ok(output)
    }

    fn enter(&self, record: &mut ExportRecord, expected: ExportStage) {
        let stage = record.advance();
        debug_assert_eq!(stage, expected);
        debug!(job_id = %record.job_id, stage = %stage, "Export stage reached");
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|e| ExportError::Config(format!("cannot resolve {}: {}", path.display(), e)))
}
