//! Scoped ownership of the temporary files created for one render job.

use crate::error::{ExportError, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Writes `contents` to a new uniquely named file in `dir`.
///
/// The file outlives this call; register it with [`TempArtifacts`] so it
/// is removed when the job ends.
pub fn write_temp_file(dir: &Path, prefix: &str, suffix: &str, contents: &str) -> Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(suffix)
        .tempfile_in(dir)
        .map_err(ExportError::TemporaryFile)?;
    file.write_all(contents.as_bytes())
        .map_err(ExportError::TemporaryFile)?;
    file.flush().map_err(ExportError::TemporaryFile)?;

    file.into_temp_path()
        .keep()
        .map_err(|err| ExportError::TemporaryFile(err.error))
}

/// Temporary files owned by a single job.
///
/// Each tracked path is deleted exactly once, either by [`release`] or,
/// on any early exit, when the guard is dropped. Deletion failures are
/// logged and swallowed.
///
/// [`release`]: TempArtifacts::release
#[derive(Debug, Default)]
pub struct TempArtifacts {
    paths: Vec<PathBuf>,
}

impl TempArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, path: PathBuf) -> &Path {
        self.paths.push(path);
        &self.paths[self.paths.len() - 1]
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Deletes every tracked file now.
    pub fn release(mut self) {
        self.remove_all();
    }

    fn remove_all(&mut self) {
        for path in self.paths.drain(..) {
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "Removed temporary file"),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => warn!(
                    path = %path.display(),
                    error = %err,
                    "Failed to remove temporary file"
                ),
            }
        }
    }
}

impl Drop for TempArtifacts {
    fn drop(&mut self) {
        self.remove_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_temp_file_unique_names() {
        let dir = TempDir::new().unwrap();
        let a = write_temp_file(dir.path(), "report-script-", ".js", "a").unwrap();
        let b = write_temp_file(dir.path(), "report-script-", ".js", "b").unwrap();

        assert_ne!(a, b);
        assert_eq!(fs::read_to_string(&a).unwrap(), "a");
        assert!(a.file_name().unwrap().to_str().unwrap().starts_with("report-script-"));
        assert_eq!(a.extension().unwrap(), "js");
    }

    #[test]
    fn test_release_removes_files() {
        let dir = TempDir::new().unwrap();
        let mut artifacts = TempArtifacts::new();
        let path = artifacts
            .track(write_temp_file(dir.path(), "body-", ".html", "<p/>").unwrap())
            .to_path_buf();

        artifacts.release();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_files_and_tolerates_missing() {
        let dir = TempDir::new().unwrap();
        let kept = write_temp_file(dir.path(), "body-", ".html", "x").unwrap();
        {
            let mut artifacts = TempArtifacts::new();
            artifacts.track(kept.clone());
            artifacts.track(dir.path().join("never-created.js"));
        }
        assert!(!kept.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_write_into_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = write_temp_file(&missing, "s-", ".js", "x").unwrap_err();
        assert!(matches!(err, ExportError::TemporaryFile(_)));
    }
}
