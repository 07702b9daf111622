//! The two gate instances this bridge participates in.
//!
//! Both ride the same one-shot request/take primitive; only the key and
//! the out-of-band explanation differ.

use vigil_store::{Gate, StateDir, CONTEXT_ACK_GATE, CONTEXT_SAVED_GATE};

/// Raised by the injector after context injection; taken by the guard on
/// the first tool call so the agent acknowledges before acting.
pub fn context_ack(dir: &StateDir) -> Gate {
    Gate::new(dir, CONTEXT_ACK_GATE)
}

/// Raised by the guard when token usage crosses the threshold; its
/// presence means "already triggered this session" until a lifecycle
/// event clears it.
pub fn context_saved(dir: &StateDir) -> Gate {
    Gate::new(dir, CONTEXT_SAVED_GATE)
}
