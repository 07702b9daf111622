mod diff;
mod orchestrator;
mod prompt;
mod stream;
mod worker;
pub mod workspace;

pub use diff::DiffSummary;
pub use orchestrator::{Orchestrator, SyncEvent, SyncOutcome};
pub use stream::{StreamCollector, ToolAction};
pub use worker::{ClaudeWorker, MockWorker, WorkerError, WorkerLauncher, WorkerOutput};
