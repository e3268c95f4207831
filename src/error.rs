//! Error types for the PDF export pipeline.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Every way a single export call can fail.
///
/// All variants are terminal for the job that produced them. Temporary
/// artifacts are released before any of these reach the caller.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid renderer option `{name}`: {reason}")]
    InvalidOption { name: String, reason: String },

    #[error("renderer failed (exit {exit_code:?}): {stderr}")]
    RenderProcess {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("renderer exceeded timeout of {timeout:?}")]
    TimeoutExceeded { timeout: Duration },

    #[error("failed to create temporary file: {0}")]
    TemporaryFile(#[source] io::Error),

    #[error("failed to spawn renderer {binary}: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("renderer binary not found: {0}")]
    BinaryNotFound(String),

    #[error("layout script is malformed: {0}")]
    MalformedScript(String),

    #[error("renderer reported success but produced no output at {0}")]
    MissingOutput(PathBuf),

    #[error("invalid export configuration: {0}")]
    Config(String),
}

impl ExportError {
    pub(crate) fn invalid_option(name: &str, reason: impl Into<String>) -> Self {
        ExportError::InvalidOption {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = ExportError> = std::result::Result<T, E>;
