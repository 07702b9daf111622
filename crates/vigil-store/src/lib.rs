mod audit;
mod config;
mod flag;
mod lock;
mod paths;

pub use audit::AuditLog;
pub use config::Config;
pub use flag::{Flag, Gate};
pub use lock::{LockGuard, WorkspaceLock};
pub use paths::{write_atomic, StateDir};
pub use paths::{
    CONTEXT_ACK_GATE, CONTEXT_SAVED_GATE, ESTIMATE_LOG, INJECTED_COPY, LAST_SYNC_MARK, RUN_LOG,
    SYNC_LOCK, TRANSCRIPT_POINTER,
};
