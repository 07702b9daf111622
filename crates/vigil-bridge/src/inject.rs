//! SessionStart context injection — the lock-waiting consumer.
//!
//! On compact/clear a sync may be rewriting the workspace documents in a
//! sibling hook process. Injecting before it finishes would hand the new
//! session stale knowledge, so this side waits on the sync lock first:
//! briefly for it to appear (hook scheduling order is unspecified), then —
//! only if it exists — for it to be released, bounded above the worker's
//! own budget. Past the bound it proceeds anyway; staleness must never
//! become a permanent block.

use std::time::Duration;

use serde_json::json;
use vigil_store::{Config, StateDir, WorkspaceLock, INJECTED_COPY};
use vigil_sync::workspace;
use vigil_transcript::CONTEXT_MARKER;

use crate::gates;
use crate::payload::{HookPayload, HookResult};

const APPEAR_GRACE: Duration = Duration::from_secs(5);
const POLL: Duration = Duration::from_millis(250);

pub fn run(dir: &StateDir, config: &Config, payload: &HookPayload) -> anyhow::Result<HookResult> {
    if payload.event() != "SessionStart" {
        return Ok(HookResult::empty());
    }
    let source = payload.source();

    if matches!(source.as_str(), "compact" | "clear") {
        let lock = WorkspaceLock::new(dir, config.lock_stale());
        let released = lock.wait_until_released(APPEAR_GRACE, config.release_wait_bound(), POLL);
        if !released {
            tracing::warn!("sync lock still held past the wait bound, injecting anyway");
        }
    }

    dir.ensure()?;
    // The pointer must reflect the transcript of the session that is
    // starting, so a later /clear can find it after rotation.
    dir.save_transcript_pointer(&payload.transcript_path());

    let snapshot = workspace::load(dir);
    if snapshot.is_empty() {
        return Ok(HookResult::empty()); // nothing to inject, nothing to acknowledge
    }

    let context = render_context(&snapshot);
    // Debug copy for postmortems; best-effort.
    let _ = vigil_store::write_atomic(&dir.state_path(INJECTED_COPY), context.as_bytes());

    gates::context_ack(dir).request();

    let output = json!({
        "hookSpecificOutput": {
            "hookEventName": "SessionStart",
            "additionalContext": context,
        }
    });
    Ok(HookResult::output(output.to_string()))
}

/// Wrap the workspace documents in the boundary marker the transcript
/// noise filter matches, so injected context is never re-summarised as
/// organic conversation.
fn render_context(snapshot: &workspace::WorkspaceSnapshot) -> String {
    let mut parts: Vec<String> = Vec::new();
    parts.push(CONTEXT_MARKER.to_string());
    parts.push(
        "Project knowledge base, injected at session start. Read it before \
         responding; acknowledge what you understand about the current \
         project state."
            .into(),
    );
    if !snapshot.root.trim().is_empty() {
        parts.push("<file path=\".vigil/WORKSPACE.md\">".into());
        parts.push(snapshot.root.trim_end().to_string());
        parts.push("</file>".into());
    }
    for (path, content) in &snapshot.pages {
        parts.push(format!("<file path=\"{path}\">"));
        parts.push(content.trim_end().to_string());
        parts.push("</file>".into());
    }
    parts.push("</vigil:project-context>".into());
    parts.join("\n")
}
