//! `vigil log <runs|estimates>` — print an audit log.

use vigil_store::{AuditLog, StateDir, ESTIMATE_LOG, RUN_LOG};

use crate::cmd_status::project_dir;
use crate::LogArg;

pub fn run(which: LogArg) -> anyhow::Result<()> {
    let dir = StateDir::new(project_dir());
    let (name, max) = match which {
        LogArg::Runs => (RUN_LOG, 50),
        LogArg::Estimates => (ESTIMATE_LOG, 200),
    };
    let entries = AuditLog::new(&dir, name, max).entries();
    if entries.is_empty() {
        println!("(no entries)");
        return Ok(());
    }
    for entry in entries {
        println!("{}", serde_json::to_string(&entry)?);
    }
    Ok(())
}
