mod extract;
mod record;
mod revscan;
mod segment;
mod usage;

pub use extract::{extract_entries, Entry, CONTEXT_MARKER};
pub use record::{Block, Content, Message, RawRecord, Usage};
pub use revscan::RevLines;
pub use segment::{find_boundaries, segment_for, TriggerKind};
pub use usage::{estimate_and_log, estimate_total, should_trigger, UsageEstimate};
