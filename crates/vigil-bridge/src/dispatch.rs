//! Role dispatch and the fail-open boundary.
//!
//! Each configured hook command is one role; the host runs them as
//! independent processes, possibly in parallel, for the same lifecycle
//! event. `hook_entrypoint` is the single place where "never throw out of
//! a hook" is enforced: everything below returns errors, and exactly here
//! they degrade to an empty result plus a trace event.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use vigil_store::{Config, StateDir};
use vigil_sync::{ClaudeWorker, Orchestrator, SyncEvent, SyncOutcome};

use crate::payload::{HookPayload, HookResult};
use crate::{cleanup, guard, inject};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Workspace sync orchestrator (SessionStart compact/clear, SessionEnd).
    Sync,
    /// Context injector — the lock-waiting consumer (SessionStart).
    Inject,
    /// PreToolUse gates: context acknowledgment + usage threshold.
    Guard,
    /// Per-event ephemeral state cleanup.
    Cleanup,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Sync => "sync",
            Role::Inject => "inject",
            Role::Guard => "guard",
            Role::Cleanup => "cleanup",
        }
    }
}

/// Fail-open entry point: any error below becomes an empty result. A hook
/// that crashes would break the assistant's turn-taking loop entirely;
/// degraded coordination is the better failure.
pub fn hook_entrypoint(role: Role, stdin: &str) -> HookResult {
    let project_dir = resolve_project_dir(stdin);
    hook_entrypoint_in(role, stdin, &project_dir)
}

/// Same, with an explicit project dir (tests, unusual hosts).
pub fn hook_entrypoint_in(role: Role, stdin: &str, project_dir: &Path) -> HookResult {
    match dispatch(role, stdin, project_dir) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(role = role.as_str(), error = %e, "hook dispatch failed");
            HookResult::empty()
        }
    }
}

fn dispatch(role: Role, stdin: &str, project_dir: &Path) -> anyhow::Result<HookResult> {
    let Some(payload) = HookPayload::parse(stdin)? else {
        return Ok(HookResult::empty());
    };
    let dir = StateDir::new(project_dir);
    let config = Config::load(&dir);

    match role {
        Role::Sync => Ok(sync_role(&dir, config, &payload)),
        Role::Inject => inject::run(&dir, &config, &payload),
        Role::Guard => guard::run(&dir, &config, &payload),
        Role::Cleanup => Ok(cleanup::run(&dir, &payload)),
    }
}

fn sync_role(dir: &StateDir, config: Config, payload: &HookPayload) -> HookResult {
    let event = match (payload.event().as_str(), payload.source().as_str()) {
        ("SessionStart", "compact") => SyncEvent::Compact,
        ("SessionStart", "clear") => SyncEvent::Clear,
        ("SessionEnd", _) => SyncEvent::SessionEnd,
        _ => return HookResult::empty(),
    };

    let worker = Arc::new(ClaudeWorker::new(&config.worker_bin));
    let orchestrator = Orchestrator::new(dir.clone(), config, worker);
    let transcript = payload.transcript_path();
    let transcript = (!transcript.is_empty()).then_some(transcript.as_str());

    match orchestrator.run(event, transcript) {
        SyncOutcome::Synced => {
            tracing::info!(event = event.as_str(), "workspace updated");
            HookResult::empty()
        }
        SyncOutcome::Skipped(reason) => {
            tracing::debug!(event = event.as_str(), reason, "workspace sync skipped");
            HookResult::empty()
        }
        SyncOutcome::Failed(reason) => {
            HookResult::warning(format!("[vigil] workspace sync failed: {reason}"))
        }
    }
}

/// The host exports the project root; payload cwd and the process cwd are
/// the fallbacks.
fn resolve_project_dir(stdin: &str) -> PathBuf {
    if let Some(dir) = std::env::var_os("CLAUDE_PROJECT_DIR").filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    if let Ok(Some(payload)) = HookPayload::parse(stdin) {
        let cwd = payload.cwd();
        if !cwd.is_empty() {
            return PathBuf::from(cwd);
        }
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
