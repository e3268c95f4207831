//! Report PDF Export Library
//!
//! Converts an already-rendered HTML report (body plus optional header and
//! footer fragments) into a PDF by driving an external headless renderer.
//!
//! ## Module Overview
//!
//! - `options`: renderer option schema and the validated option set
//! - `path`: platform-aware input path normalization
//! - `template`: `@{{ ... }}` splicing for header/footer fragments
//! - `script`: layout script generation
//! - `command`: renderer command line assembly
//! - `process`: renderer process supervision with timeout
//! - `artifacts`: scoped cleanup of per-job temporary files
//! - `job`: render job model and export stages
//! - `document`: document source, body persistence and binary locator seams
//! - `config`: export configuration
//! - `pipeline`: end-to-end orchestration
//! - `telemetry`: OpenTelemetry integration and structured logging
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use report_export::{
//!     config::ExportConfig,
//!     document::{EnvBinaryLocator, HtmlDocument},
//!     pipeline::PdfExportPipeline,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let pipeline = PdfExportPipeline::new(Arc::new(EnvBinaryLocator));
//!
//!     let document = HtmlDocument::new("<h1>Quarterly report</h1>")
//!         .with_footer("Page @{{numPage}} of @{{totalPages}}");
//!
//!     let output = pipeline
//!         .export(&document, &ExportConfig::default(), "/tmp/report.pdf")
//!         .await;
//!     assert!(output.is_ok());
//! }
//! ```

pub mod artifacts;
pub mod command;
pub mod config;
pub mod document;
pub mod error;
pub mod job;
pub mod options;
pub mod path;
pub mod pipeline;
pub mod process;
pub mod script;
pub mod telemetry;
pub mod template;

pub use error::ExportError;
