//! Report PDF Export CLI
//!
//! Renders one HTML report to PDF through the headless renderer.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `PHANTOMJS_BIN`: renderer binary (default: `phantomjs` on PATH)
//! - `REPORT_EXPORT_CONFIG`: JSON configuration file
//! - `REPORT_EXPORT_LOG_FORMAT`: `json` for JSON log lines
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP collector endpoint
//! - `RUST_LOG`: Log level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use report_export::config::ExportConfig;
use report_export::document::{BinaryLocator, EnvBinaryLocator, HtmlDocument, StaticBinaryLocator};
use report_export::pipeline::PdfExportPipeline;
use report_export::telemetry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "report-export", version, about = "Export an HTML report to PDF")]
struct Cli {
    /// Rendered report body.
    #[arg(value_name = "BODY_HTML")]
    body: PathBuf,

    /// Destination PDF.
    #[arg(value_name = "OUTPUT_PDF")]
    output: PathBuf,

    /// Header fragment; `@{{numPage}}` and `@{{totalPages}}` are expanded per page.
    #[arg(long, value_name = "FILE")]
    header: Option<PathBuf>,

    /// Footer fragment.
    #[arg(long, value_name = "FILE")]
    footer: Option<PathBuf>,

    /// JSON export configuration.
    #[arg(long, env = "REPORT_EXPORT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Renderer binary; overrides PHANTOMJS_BIN.
    #[arg(long, value_name = "PATH")]
    binary: Option<PathBuf>,

    /// Renderer timeout in seconds; overrides the configuration.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    if let Err(e) = telemetry::init_telemetry() {
        warn!("Failed to initialize telemetry: {}", e);
    }

    let cli = Cli::parse();
    let result = run(cli).await;

    telemetry::shutdown_telemetry();
    result
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let json = std::env::var("REPORT_EXPORT_LOG_FORMAT").is_ok_and(|v| v == "json");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => ExportConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ExportConfig::default(),
    };
    if let Some(secs) = cli.timeout {
        anyhow::ensure!(secs > 0, "--timeout must be positive");
        config.timeout_secs = secs;
    }

    let document = HtmlDocument {
        content: read_fragment(&cli.body)?,
        header: cli.header.as_deref().map(read_fragment).transpose()?.unwrap_or_default(),
        footer: cli.footer.as_deref().map(read_fragment).transpose()?.unwrap_or_default(),
    };

    let locator: Arc<dyn BinaryLocator> = match cli.binary {
        Some(path) => Arc::new(StaticBinaryLocator(path)),
        None => Arc::new(EnvBinaryLocator),
    };

    info!(
        "Configuration: format={}, orientation={}, timeout_secs={}",
        config.page.format, config.page.orientation, config.timeout_secs
    );

    let output = PdfExportPipeline::new(locator)
        .export(&document, &config, &cli.output)
        .await
        .context("PDF export failed")?;

    println!("{}", output.display());
    Ok(())
}

fn read_fragment(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
