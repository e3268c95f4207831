//! Renderer process supervision.

use crate::command::CommandLine;
use crate::error::{ExportError, Result};
use crate::job::{ProcessOutcome, RenderJob};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Runs renderer commands under a wall-clock timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    /// Runs `command` for `job` and returns the job's output path.
    ///
    /// The job's temporary files are released on every path out of this
    /// function: success, renderer failure, spawn failure or timeout.
    ///
    /// On timeout only the direct child is killed. Processes the renderer
    /// spawned itself are not in a group we signal and may outlive the job.
    pub async fn run(&self, command: &CommandLine, job: RenderJob) -> Result<PathBuf> {
        let RenderJob {
            job_id,
            binary_path,
            script_path,
            input_path,
            output_path,
            working_dir,
            timeout,
            artifacts,
        } = job;

        debug!(
            %job_id,
            binary = %binary_path.display(),
            script = %script_path.display(),
            input = %input_path.display(),
            timeout_ms = timeout.as_millis() as u64,
            "Starting render job"
        );

        let started_at = Instant::now();
        let result = execute(command, &working_dir, timeout).await;
        artifacts.release();

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    %job_id,
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    error = %err,
                    "Renderer did not complete"
                );
                return Err(err);
            }
        };

        if !outcome.stdout_text.trim().is_empty() {
            debug!(%job_id, stdout = %outcome.stdout_text.trim(), "Renderer output");
        }

        check_outcome(&outcome, &output_path)?;

        info!(
            %job_id,
            output = %output_path.display(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Renderer finished"
        );
        Ok(output_path)
    }
}

/// Turns a finished process into success or the matching error.
fn check_outcome(outcome: &ProcessOutcome, output_path: &Path) -> Result<()> {
    if !outcome.stderr_text.is_empty() || !outcome.exited_cleanly {
        return Err(ExportError::RenderProcess {
            exit_code: outcome.exit_code,
            stderr: outcome.stderr_text.clone(),
        });
    }
    if !output_path.exists() {
        return Err(ExportError::MissingOutput(output_path.to_path_buf()));
    }
    Ok(())
}

async fn execute(
    command: &CommandLine,
    working_dir: &Path,
    timeout: Duration,
) -> Result<ProcessOutcome> {
    debug!(command = %command, working_dir = %working_dir.display(), "Spawning renderer");

    let mut child = Command::new(command.program())
        .args(command.args())
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ExportError::Spawn {
            binary: command.program().to_path_buf(),
            source,
        })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let waited = tokio::time::timeout(timeout, async {
        tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr))
    })
    .await;

    match waited {
        Ok((status, stdout_text, stderr_text)) => {
            let status = status.map_err(|source| ExportError::Spawn {
                binary: command.program().to_path_buf(),
                source,
            })?;
            Ok(ProcessOutcome {
                exited_cleanly: status.success(),
                exit_code: status.code(),
                stdout_text,
                stderr_text,
            })
        }
        Err(_) => {
            if let Err(err) = child.kill().await {
                warn!(error = %err, "Failed to kill timed out renderer");
            }
            Err(ExportError::TimeoutExceeded { timeout })
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(err) = pipe.read_to_end(&mut buf).await {
            warn!(error = %err, "Failed to read renderer output");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::artifacts::{write_temp_file, TempArtifacts};
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn fake_renderer(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-renderer");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn job(dir: &TempDir, binary: PathBuf, timeout: Duration) -> (RenderJob, CommandLine) {
        let mut artifacts = TempArtifacts::new();
        let script_path = artifacts
            .track(write_temp_file(dir.path(), "report-script-", ".js", "//").unwrap())
            .to_path_buf();
        let input_path = artifacts
            .track(write_temp_file(dir.path(), "report-body-", ".html", "<p/>").unwrap())
            .to_path_buf();
        let output_path = dir.path().join("out.pdf");

        let command = crate::command::CommandBuilder::new(crate::path::PlatformFamily::Other)
            .build(
                &binary,
                &Default::default(),
                &script_path,
                &input_path,
                &output_path,
            );
        let job = RenderJob {
            job_id: Uuid::new_v4(),
            binary_path: binary,
            script_path,
            input_path,
            output_path,
            working_dir: dir.path().to_path_buf(),
            timeout,
            artifacts,
        };
        (job, command)
    }

    fn leftover_temp_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("report-"))
            .collect()
    }

    #[tokio::test]
    async fn test_success_returns_output_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let binary = fake_renderer(dir.path(), "echo 'Status: success'\necho '%PDF-1.4' > \"$3\"");
        let (job, command) = job(&dir, binary, Duration::from_secs(10));

        let output = ProcessRunner::new().run(&command, job).await.unwrap();

        assert_eq!(output, dir.path().join("out.pdf"));
        assert!(output.exists());
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_stderr_fails_render() {
        let dir = TempDir::new().unwrap();
        let binary = fake_renderer(dir.path(), "echo 'ReferenceError: boom' >&2\necho x > \"$3\"");
        let (job, command) = job(&dir, binary, Duration::from_secs(10));

        let err = ProcessRunner::new().run(&command, job).await.unwrap_err();

        match err {
            ExportError::RenderProcess { exit_code, stderr } => {
                assert_eq!(exit_code, Some(0));
                assert_eq!(stderr, "ReferenceError: boom\n");
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_whitespace_only_stderr_fails_render() {
        let dir = TempDir::new().unwrap();
        let binary = fake_renderer(dir.path(), "printf '\\n  \\n' >&2\necho x > \"$3\"");
        let (job, command) = job(&dir, binary, Duration::from_secs(10));

        let err = ProcessRunner::new().run(&command, job).await.unwrap_err();

        match err {
            ExportError::RenderProcess { stderr, .. } => assert_eq!(stderr, "\n  \n"),
            other => panic!("unexpected error variant: {other:?}"),
        }
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_stderr_passed_through_verbatim() {
        let dir = TempDir::new().unwrap();
        let binary = fake_renderer(dir.path(), "printf '  Warning: x\\n' >&2\necho x > \"$3\"");
        let (job, command) = job(&dir, binary, Duration::from_secs(10));

        let err = ProcessRunner::new().run(&command, job).await.unwrap_err();
        assert!(matches!(
            err,
            ExportError::RenderProcess { ref stderr, .. } if stderr == "  Warning: x\n"
        ));
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails_render() {
        let dir = TempDir::new().unwrap();
        let binary = fake_renderer(dir.path(), "exit 3");
        let (job, command) = job(&dir, binary, Duration::from_secs(10));

        let err = ProcessRunner::new().run(&command, job).await.unwrap_err();
        assert!(matches!(
            err,
            ExportError::RenderProcess {
                exit_code: Some(3),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_output_detected() {
        let dir = TempDir::new().unwrap();
        let binary = fake_renderer(dir.path(), "exit 0");
        let (job, command) = job(&dir, binary, Duration::from_secs(10));

        let err = ProcessRunner::new().run(&command, job).await.unwrap_err();
        assert!(matches!(err, ExportError::MissingOutput(_)));
    }

    #[tokio::test]
    async fn test_timeout_kills_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let binary = fake_renderer(dir.path(), "exec sleep 30");
        let (job, command) = job(&dir, binary, Duration::from_millis(200));

        let started = Instant::now();
        let err = ProcessRunner::new().run(&command, job).await.unwrap_err();

        assert!(matches!(err, ExportError::TimeoutExceeded { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_spawn_failure_cleans_up() {
        let dir = TempDir::new().unwrap();
        let (job, command) = job(&dir, dir.path().join("missing"), Duration::from_secs(1));

        let err = ProcessRunner::new().run(&command, job).await.unwrap_err();
        assert!(matches!(err, ExportError::Spawn { .. }));
        assert!(leftover_temp_files(dir.path()).is_empty());
    }
}
