//! PreToolUse guards.
//!
//! Two gate consumers run here, in order:
//!
//! 1. Context acknowledgment: taking the gate is the very first action, so
//!    even a crash right after cannot double-fire the block.
//! 2. Threshold: when token usage crosses the configured threshold, the
//!    `context-saved` gate is raised FIRST and the tool call denied once;
//!    its presence keeps the decision monotonic until a lifecycle event
//!    clears it.

use std::path::Path;

use serde_json::json;
use vigil_store::{AuditLog, Config, StateDir, ESTIMATE_LOG};
use vigil_transcript::{estimate_and_log, should_trigger};

use crate::gates;
use crate::payload::{HookPayload, HookResult};

const ESTIMATE_LOG_MAX: usize = 200;

pub fn run(dir: &StateDir, config: &Config, payload: &HookPayload) -> anyhow::Result<HookResult> {
    if payload.event() != "PreToolUse" {
        return Ok(HookResult::empty());
    }

    if gates::context_ack(dir).take() {
        return Ok(deny(ACK_REASON.to_string()));
    }

    if !config.sync_enabled {
        return Ok(HookResult::empty());
    }

    // Every estimation is logged, even when the gate is already armed —
    // the audit trail is the only way to reconstruct threshold decisions.
    let transcript = payload.transcript_path();
    let transcript = (!transcript.is_empty()).then(|| Path::new(&transcript).to_path_buf());
    let log = AuditLog::new(dir, ESTIMATE_LOG, ESTIMATE_LOG_MAX);
    let estimate = estimate_and_log(transcript.as_deref(), config.sync_threshold, &log);

    let saved = gates::context_saved(dir);
    if saved.pending() {
        return Ok(HookResult::empty()); // fires once per session
    }
    if !estimate.found || !should_trigger(estimate.total, config.sync_threshold) {
        return Ok(HookResult::empty());
    }

    saved.request();
    Ok(deny(save_reason(estimate.total, config.sync_threshold)))
}

fn deny(reason: String) -> HookResult {
    let output = json!({
        "hookSpecificOutput": {
            "hookEventName": "PreToolUse",
            "permissionDecision": "deny",
            "permissionDecisionReason": reason,
        }
    });
    HookResult::output(output.to_string())
}

const ACK_REASON: &str = "**CONTEXT ACKNOWLEDGMENT REQUIRED**\n\n\
Project context has been injected into this session. Before using any \
tools, acknowledge what you see — briefly state what you understand about \
the current project state.\n\n\
**IMPORTANT**: After acknowledging, retry the same action that was just \
blocked. Do not skip it or move on to something else.";

fn save_reason(total: u64, threshold: u64) -> String {
    format!(
        "**CONTEXT PRESERVATION REQUIRED** (token usage: {total} / {threshold})\n\n\
         The conversation is approaching compaction. Before continuing, save \
         your current work so the agent that continues after compaction has \
         what it needs.\n\n\
         Append a dated entry to `.vigil/session-context.md` covering:\n\
         - Concrete decisions with rationale\n\
         - Specific file paths and line numbers\n\
         - Error messages that took time to debug\n\
         - Explicit next steps, with assumptions stated\n\n\
         Write as if briefing a new agent with zero context. Vague summaries \
         and references to \"the code we discussed\" do not survive \
         compaction.\n\n\
         After saving, retry the blocked action and continue."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::fs;

    fn payload_with_transcript(path: &str) -> HookPayload {
        HookPayload::parse(&format!(
            r#"{{"hook_event_name":"PreToolUse","tool_name":"Edit","transcript_path":"{path}"}}"#
        ))
        .unwrap()
        .unwrap()
    }

    fn transcript_with_total(dir: &Path, input_tokens: u64) -> String {
        let path = dir.join("t.jsonl");
        let line = json!({"type":"assistant","requestId":"req_t","message":{
            "role":"assistant",
            "usage":{"input_tokens":input_tokens,"cache_creation_input_tokens":0,
                     "cache_read_input_tokens":0,"output_tokens":0}}});
        fs::write(&path, format!("{line}\n")).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn decision(result: &HookResult) -> Option<String> {
        let v: Value = serde_json::from_str(result.stdout.as_ref()?).ok()?;
        v["hookSpecificOutput"]["permissionDecision"]
            .as_str()
            .map(String::from)
    }

    #[test]
    fn ack_gate_denies_exactly_once() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::new(tmp.path());
        let config = Config::default();
        gates::context_ack(&dir).request();
        let payload = payload_with_transcript("/nonexistent.jsonl");

        let first = run(&dir, &config, &payload).unwrap();
        assert_eq!(decision(&first).as_deref(), Some("deny"));
        let second = run(&dir, &config, &payload).unwrap();
        assert!(second.stdout.is_none());
    }

    #[test]
    fn over_threshold_denies_and_arms_the_gate() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::new(tmp.path());
        let config = Config {
            sync_threshold: 100,
            ..Config::default()
        };
        let transcript = transcript_with_total(tmp.path(), 150);
        let payload = payload_with_transcript(&transcript);

        let first = run(&dir, &config, &payload).unwrap();
        assert_eq!(decision(&first).as_deref(), Some("deny"));
        assert!(gates::context_saved(&dir).pending());

        // Monotonic: armed gate means no repeated blocking.
        let second = run(&dir, &config, &payload).unwrap();
        assert!(second.stdout.is_none());
    }

    #[test]
    fn under_threshold_allows_without_arming() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::new(tmp.path());
        let config = Config {
            sync_threshold: 1000,
            ..Config::default()
        };
        let transcript = transcript_with_total(tmp.path(), 150);
        let payload = payload_with_transcript(&transcript);

        let result = run(&dir, &config, &payload).unwrap();
        assert!(result.stdout.is_none());
        assert!(!gates::context_saved(&dir).pending());
    }

    #[test]
    fn equality_triggers() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::new(tmp.path());
        let config = Config {
            sync_threshold: 150,
            ..Config::default()
        };
        let transcript = transcript_with_total(tmp.path(), 150);
        let result = run(&dir, &config, &payload_with_transcript(&transcript)).unwrap();
        assert_eq!(decision(&result).as_deref(), Some("deny"));
    }

    #[test]
    fn non_pre_tool_use_events_pass_through() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::new(tmp.path());
        let payload = HookPayload::parse(r#"{"hook_event_name":"SessionStart"}"#)
            .unwrap()
            .unwrap();
        let result = run(&dir, &Config::default(), &payload).unwrap();
        assert!(result.stdout.is_none());
    }

    #[test]
    fn every_call_lands_in_the_estimate_log() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::new(tmp.path());
        let config = Config {
            sync_threshold: 100,
            ..Config::default()
        };
        let transcript = transcript_with_total(tmp.path(), 150);
        let payload = payload_with_transcript(&transcript);
        run(&dir, &config, &payload).unwrap();
        run(&dir, &config, &payload).unwrap(); // gate armed, still logged

        let entries = AuditLog::new(&dir, ESTIMATE_LOG, ESTIMATE_LOG_MAX).entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["triggered"], true);
    }
}
