//! Per-event ephemeral state cleanup.
//!
//! The threshold gate is session-scoped: any event that opens a fresh
//! context window (startup, compact, clear) re-arms it so the save
//! instruction can fire again as usage grows back.

use vigil_store::StateDir;

use crate::gates;
use crate::payload::{HookPayload, HookResult};

pub fn run(dir: &StateDir, payload: &HookPayload) -> HookResult {
    match (payload.event().as_str(), payload.source().as_str()) {
        ("SessionStart", "startup") | ("SessionStart", "compact") | ("SessionStart", "clear") => {
            gates::context_saved(dir).clear();
        }
        _ => {}
    }
    HookResult::empty()
}
