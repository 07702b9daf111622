//! Bounded JSONL audit logs.
//!
//! Append-only from the callers' point of view; past a fixed entry count
//! the oldest lines are dropped. Concurrent hook processes may append at
//! the same time, so appends serialise on an flock'd sidecar.

use fs2::FileExt;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::paths::{write_atomic, StateDir};

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
    max_entries: usize,
}

impl AuditLog {
    pub fn new(dir: &StateDir, name: &str, max_entries: usize) -> Self {
        Self {
            path: dir.state_path(name),
            max_entries,
        }
    }

    /// Append one entry, then trim to the newest `max_entries`. Best-effort:
    /// a failed append must never surface to the hook.
    pub fn append(&self, entry: &serde_json::Value) {
        if let Err(e) = self.append_inner(entry) {
            tracing::debug!(log = %self.path.display(), error = %e, "audit append failed");
        }
    }

    fn append_inner(&self, entry: &serde_json::Value) -> anyhow::Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", self.path.display()))?;
        fs::create_dir_all(parent)?;

        // Sidecar flock: the log file itself gets atomically replaced on
        // trim, which would strand a lock held on the old inode.
        let sidecar = self.path.with_extension("jsonl.lock");
        let lock_file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&sidecar)?;
        lock_file.lock_exclusive()?;

        let line = serde_json::to_string(entry)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        drop(file);

        self.trim()?;
        FileExt::unlock(&lock_file)?;
        Ok(())
    }

    fn trim(&self) -> anyhow::Result<()> {
        let content = fs::read_to_string(&self.path)?;
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() <= self.max_entries {
            return Ok(());
        }
        let keep = &lines[lines.len() - self.max_entries..];
        let mut out = keep.join("\n");
        out.push('\n');
        write_atomic(&self.path, out.as_bytes())
    }

    /// Best-effort read for inspection commands. Unparseable lines skip.
    pub fn entries(&self) -> Vec<serde_json::Value> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };
        content
            .lines()
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect()
    }
}
