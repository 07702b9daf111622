//! The external worker process.
//!
//! The sync hands its task to a headless assistant invocation with a
//! restricted tool surface and a hard wall-clock budget. Timeout is a
//! distinct failure class from a nonzero exit: the process is killed
//! outright, no graceful shutdown.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::stream::{collect_stream, ToolAction};

/// Tools the worker may use; everything else is denied.
const ALLOWED_TOOLS: &str = "Write,Read,Edit";

#[derive(Debug, Default, Clone)]
pub struct WorkerOutput {
    pub actions: Vec<ToolAction>,
    pub result_text: Option<String>,
    pub result_error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("worker binary not found: {0}")]
    NotFound(String),
    #[error("failed to spawn worker: {0}")]
    Spawn(String),
    #[error("worker timed out after {0:?}")]
    TimedOut(Duration),
    #[error("worker exited with code {code:?}")]
    Nonzero { code: Option<i32> },
}

#[async_trait]
pub trait WorkerLauncher: Send + Sync {
    async fn run(
        &self,
        prompt: &str,
        cwd: &Path,
        timeout: Duration,
    ) -> Result<WorkerOutput, WorkerError>;
}

/// Real launcher: `<bin> -p` reading the prompt from stdin, stream-json
/// on stdout.
pub struct ClaudeWorker {
    bin: PathBuf,
}

impl ClaudeWorker {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }
}

#[async_trait]
impl WorkerLauncher for ClaudeWorker {
    async fn run(
        &self,
        prompt: &str,
        cwd: &Path,
        timeout: Duration,
    ) -> Result<WorkerOutput, WorkerError> {
        let mut cmd = tokio::process::Command::new(&self.bin);
        cmd.arg("-p")
            .arg("--output-format")
            .arg("stream-json")
            .arg("--verbose")
            .arg("--allowedTools")
            .arg(ALLOWED_TOOLS)
            .arg("--dangerously-skip-permissions")
            .arg("--no-session-persistence")
            .arg("--setting-sources")
            .arg("user")
            .current_dir(cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            // The nesting marker would stop the assistant from spawning
            // inside a hook.
            .env_remove("CLAUDECODE");

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WorkerError::NotFound(self.bin.display().to_string())
            } else {
                WorkerError::Spawn(e.to_string())
            }
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(prompt.as_bytes()).await;
            // Dropped here: the worker sees EOF and starts.
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkerError::Spawn("failed to capture stdout".into()))?;

        tokio::select! {
            collected = collect_stream(stdout) => {
                let output = collected.map_err(|e| WorkerError::Spawn(e.to_string()))?;
                let status = child
                    .wait()
                    .await
                    .map_err(|e| WorkerError::Spawn(e.to_string()))?;
                if status.success() {
                    Ok(output)
                } else {
                    Err(WorkerError::Nonzero { code: status.code() })
                }
            }
            _ = tokio::time::sleep(timeout) => {
                child.kill().await.ok();
                Err(WorkerError::TimedOut(timeout))
            }
        }
    }
}

/// Test launcher: pops configured results, counts invocations, and can run
/// an observer mid-"run" (e.g. to assert the lock is held).
pub struct MockWorker {
    results: std::sync::Mutex<Vec<Result<WorkerOutput, WorkerError>>>,
    calls: std::sync::atomic::AtomicUsize,
    observer: Option<Box<dyn Fn() + Send + Sync>>,
}

impl Default for MockWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWorker {
    pub fn new() -> Self {
        Self {
            results: std::sync::Mutex::new(Vec::new()),
            calls: std::sync::atomic::AtomicUsize::new(0),
            observer: None,
        }
    }

    pub fn with_results(mut self, results: Vec<Result<WorkerOutput, WorkerError>>) -> Self {
        self.results = std::sync::Mutex::new(results);
        self
    }

    pub fn with_observer(mut self, observer: impl Fn() + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkerLauncher for MockWorker {
    async fn run(
        &self,
        _prompt: &str,
        _cwd: &Path,
        _timeout: Duration,
    ) -> Result<WorkerOutput, WorkerError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(observer) = &self.observer {
            observer();
        }
        let mut results = self.results.lock().unwrap();
        if results.is_empty() {
            Ok(WorkerOutput::default())
        } else {
            results.remove(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_defaults_to_success() {
        let worker = MockWorker::new();
        let out = worker
            .run("p", Path::new("."), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(out.actions.is_empty());
        assert_eq!(worker.calls(), 1);
    }

    #[tokio::test]
    async fn mock_pops_configured_results() {
        let worker = MockWorker::new().with_results(vec![
            Err(WorkerError::TimedOut(Duration::from_secs(180))),
            Ok(WorkerOutput::default()),
        ]);
        let first = worker.run("p", Path::new("."), Duration::from_secs(1)).await;
        assert!(matches!(first, Err(WorkerError::TimedOut(_))));
        let second = worker.run("p", Path::new("."), Duration::from_secs(1)).await;
        assert!(second.is_ok());
        assert_eq!(worker.calls(), 2);
    }

    #[tokio::test]
    async fn missing_binary_is_its_own_error_class() {
        let worker = ClaudeWorker::new("/definitely/not/a/real/binary");
        let result = worker
            .run("p", Path::new("."), Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(WorkerError::NotFound(_))));
    }
}
