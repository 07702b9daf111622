//! `vigil status` — coordinator state at a glance.

use std::path::PathBuf;

use vigil_store::{
    Config, StateDir, WorkspaceLock, CONTEXT_ACK_GATE, CONTEXT_SAVED_GATE, LAST_SYNC_MARK,
};

pub fn run() -> anyhow::Result<()> {
    let dir = StateDir::new(project_dir());
    let config = Config::load(&dir);

    println!("project:   {}", dir.project_dir().display());
    println!("state dir: {}", dir.state_dir().display());

    let lock = WorkspaceLock::new(&dir, config.lock_stale());
    if lock.exists() {
        let age = lock
            .age()
            .map(|a| format!("{}s", a.as_secs()))
            .unwrap_or_else(|| "?".into());
        let pid = lock
            .owner_pid()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "?".into());
        println!("sync lock: held (pid {pid}, age {age})");
    } else {
        println!("sync lock: free");
    }

    for (label, name) in [
        ("ack gate", CONTEXT_ACK_GATE),
        ("saved gate", CONTEXT_SAVED_GATE),
    ] {
        let state = if dir.state_path(name).exists() {
            "pending"
        } else {
            "clear"
        };
        println!("{label}: {state}");
    }

    match dir.mark_age_secs(LAST_SYNC_MARK) {
        Some(age) => println!("last sync: {age}s ago"),
        None => println!("last sync: never"),
    }
    match dir.load_transcript_pointer() {
        Some(p) => println!("transcript pointer: {p}"),
        None => println!("transcript pointer: none"),
    }
    println!(
        "config: threshold={} worker_timeout={}s stale_window={}s enabled={}",
        config.sync_threshold, config.worker_timeout_secs, config.lock_stale_secs,
        config.sync_enabled
    );
    Ok(())
}

pub(crate) fn project_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("CLAUDE_PROJECT_DIR").filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
