//! The sync orchestrator.
//!
//! Drives one workspace sync per qualifying lifecycle event: dedup check,
//! lock, transcript resolution, segment extraction, worker run, run record,
//! release. The lock guard releases on drop, so every path out of every
//! step after acquisition — timeout, spawn failure, panic — ends with the
//! lock absent.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use vigil_store::{AuditLog, Config, StateDir, WorkspaceLock, LAST_SYNC_MARK, RUN_LOG};
use vigil_transcript::{extract_entries, segment_for, TriggerKind};

use crate::diff::{self, DiffSummary};
use crate::prompt;
use crate::worker::{WorkerError, WorkerLauncher, WorkerOutput};
use crate::workspace;

/// Within this many seconds of a successful sync, a second qualifying event
/// is the same underlying transcript: /clear fires SessionEnd and
/// SessionStart(clear) as overlapping notifications.
const DEDUP_WINDOW_SECS: u64 = 30;
const RUN_LOG_MAX: usize = 50;
const RESULT_TEXT_CAP: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// SessionStart with source=compact.
    Compact,
    /// SessionStart with source=clear.
    Clear,
    SessionEnd,
}

impl SyncEvent {
    fn trigger_kind(self) -> TriggerKind {
        match self {
            SyncEvent::Compact => TriggerKind::Compaction,
            SyncEvent::Clear | SyncEvent::SessionEnd => TriggerKind::Other,
        }
    }

    /// Compact/clear run alongside the context injector, which polls for
    /// the lock before reading the workspace.
    fn has_waiting_consumer(self) -> bool {
        matches!(self, SyncEvent::Compact | SyncEvent::Clear)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyncEvent::Compact => "compact",
            SyncEvent::Clear => "clear",
            SyncEvent::SessionEnd => "session_end",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced,
    /// Normal non-error conditions: lock held elsewhere, dedup window,
    /// nothing worth syncing.
    Skipped(&'static str),
    /// Worker-level soft failure: logged and recorded, never propagated as
    /// a hard error to the hook.
    Failed(String),
}

pub struct Orchestrator {
    dir: StateDir,
    config: Config,
    worker: Arc<dyn WorkerLauncher>,
}

impl Orchestrator {
    pub fn new(dir: StateDir, config: Config, worker: Arc<dyn WorkerLauncher>) -> Self {
        Self {
            dir,
            config,
            worker,
        }
    }

    /// Synchronous entry point for hook processes.
    pub fn run(&self, event: SyncEvent, payload_transcript: Option<&str>) -> SyncOutcome {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => return SyncOutcome::Failed(format!("runtime: {e}")),
        };
        runtime.block_on(self.run_inner(event, payload_transcript))
    }

    async fn run_inner(&self, event: SyncEvent, payload_transcript: Option<&str>) -> SyncOutcome {
        if !self.config.sync_enabled {
            return SyncOutcome::Skipped("sync disabled");
        }
        if let Some(age) = self.dir.mark_age_secs(LAST_SYNC_MARK) {
            if age < DEDUP_WINDOW_SECS {
                return SyncOutcome::Skipped("recently synced");
            }
        }
        if self.dir.ensure().is_err() {
            return SyncOutcome::Skipped("state dir unavailable");
        }

        let lock = WorkspaceLock::new(&self.dir, self.config.lock_stale());
        let mut guard = None;

        // When a consumer is waiting, the lock must exist before any slow
        // transcript work, so the consumer's appear-grace poll finds it and
        // waits instead of racing ahead with stale documents.
        if event.has_waiting_consumer() {
            guard = match lock.try_acquire() {
                Some(g) => Some(g),
                None => return SyncOutcome::Skipped("lock held"),
            };
        }

        let transcript = match self.resolve_transcript(event, payload_transcript) {
            Some(p) => p,
            None => return SyncOutcome::Skipped("no transcript"),
        };
        if !transcript.exists() {
            return SyncOutcome::Skipped("transcript missing");
        }

        if guard.is_none() {
            guard = match lock.try_acquire() {
                Some(g) => Some(g),
                None => return SyncOutcome::Skipped("lock held"),
            };
        }
        // Held until return; drop releases on every path below.
        let _guard = guard;

        let (start, end) = segment_for(&transcript, event.trigger_kind());
        let entries = extract_entries(&transcript, start, end);
        let meaningful = entries.iter().filter(|e| e.is_meaningful()).count();
        if meaningful < self.config.min_entries {
            return SyncOutcome::Skipped("too few entries");
        }

        let snapshot = workspace::load(&self.dir);
        let task = prompt::build(&entries, &snapshot);

        tracing::info!(
            event = event.as_str(),
            entries = entries.len(),
            segment_start = start,
            segment_end = end,
            "running workspace sync"
        );
        let started = Instant::now();
        let result = self
            .worker
            .run(&task, self.dir.project_dir(), self.config.worker_timeout())
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let diff = diff::capture(self.dir.project_dir());
        self.record_run(
            event,
            &transcript,
            (start, end),
            entries.len(),
            &result,
            duration_ms,
            &diff,
        );

        match result {
            Ok(_) => {
                self.dir.mark_now(LAST_SYNC_MARK);
                SyncOutcome::Synced
            }
            Err(e) => {
                tracing::warn!(event = event.as_str(), error = %e, "workspace sync failed");
                SyncOutcome::Failed(e.to_string())
            }
        }
    }

    /// On /clear the event payload names the rotated, fresh transcript; the
    /// material to preserve is in the file recorded by the pointer.
    fn resolve_transcript(
        &self,
        event: SyncEvent,
        payload_transcript: Option<&str>,
    ) -> Option<PathBuf> {
        match event {
            SyncEvent::Clear => self.dir.load_transcript_pointer().map(PathBuf::from),
            SyncEvent::Compact | SyncEvent::SessionEnd => payload_transcript
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn record_run(
        &self,
        event: SyncEvent,
        transcript: &Path,
        segment: (usize, usize),
        entry_count: usize,
        result: &Result<WorkerOutput, WorkerError>,
        duration_ms: u64,
        diff: &DiffSummary,
    ) {
        let status = match result {
            Ok(_) => "completed",
            Err(WorkerError::TimedOut(_)) => "timed_out",
            Err(WorkerError::Nonzero { .. }) => "failed",
            Err(WorkerError::NotFound(_)) | Err(WorkerError::Spawn(_)) => "spawn_failed",
        };
        let mut entry = json!({
            "ts": now_rfc3339(),
            "run_id": ulid::Ulid::new().to_string(),
            "event": event.as_str(),
            "transcript": transcript.display().to_string(),
            "segment": [segment.0, segment.1],
            "entries": entry_count,
            "status": status,
            "duration_ms": duration_ms,
            "diff": diff,
        });
        match result {
            Ok(output) => {
                entry["actions"] = json!(output.actions);
                if let Some(text) = &output.result_text {
                    entry["result"] = json!(cap(text, RESULT_TEXT_CAP));
                }
                if let Some(error) = &output.result_error {
                    entry["error"] = json!(error);
                }
            }
            Err(e) => {
                entry["error"] = json!(e.to_string());
            }
        }
        AuditLog::new(&self.dir, RUN_LOG, RUN_LOG_MAX).append(&entry);
    }
}

fn cap(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .expect("RFC3339 formatting should not fail")
}
