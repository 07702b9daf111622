//! `.vigil/` directory layout.
//!
//! Everything the coordinator persists lives under `<project>/.vigil/`.
//! The `state/` subdirectory is ephemeral: deleting it wholesale at any
//! lifecycle boundary is always safe.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const VIGIL_DIR: &str = ".vigil";
pub const STATE_SUBDIR: &str = "state";
pub const CONFIG_FILE: &str = "config.yaml";
pub const WORKSPACE_ROOT: &str = "WORKSPACE.md";
pub const WORKSPACE_PAGES: &str = "workspace";

// state/ entries
pub const SYNC_LOCK: &str = "workspace-sync.lock";
pub const CONTEXT_ACK_GATE: &str = "context-ack-pending";
pub const CONTEXT_SAVED_GATE: &str = "context-saved";
pub const LAST_SYNC_MARK: &str = "last-workspace-sync";
pub const TRANSCRIPT_POINTER: &str = "transcript-path";
pub const INJECTED_COPY: &str = "injected-context";
pub const ESTIMATE_LOG: &str = "estimates.jsonl";
pub const RUN_LOG: &str = "sync-runs.jsonl";

/// Handle on one project's `.vigil/` tree.
#[derive(Debug, Clone)]
pub struct StateDir {
    project_dir: PathBuf,
}

impl StateDir {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn vigil_dir(&self) -> PathBuf {
        self.project_dir.join(VIGIL_DIR)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.vigil_dir().join(STATE_SUBDIR)
    }

    /// Path of one entry under `state/`.
    pub fn state_path(&self, name: &str) -> PathBuf {
        self.state_dir().join(name)
    }

    pub fn config_path(&self) -> PathBuf {
        self.vigil_dir().join(CONFIG_FILE)
    }

    pub fn workspace_root_path(&self) -> PathBuf {
        self.vigil_dir().join(WORKSPACE_ROOT)
    }

    pub fn workspace_pages_dir(&self) -> PathBuf {
        self.vigil_dir().join(WORKSPACE_PAGES)
    }

    pub fn ensure(&self) -> anyhow::Result<()> {
        fs::create_dir_all(self.state_dir())?;
        Ok(())
    }

    // ── Pointer file ──

    /// Remember which transcript was active before a /clear rotates the path.
    /// Best-effort: failures degrade to "no pointer".
    pub fn save_transcript_pointer(&self, transcript_path: &str) {
        if transcript_path.is_empty() {
            return;
        }
        let path = self.state_path(TRANSCRIPT_POINTER);
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(e) = fs::write(&path, transcript_path) {
            tracing::debug!(error = %e, "failed to save transcript pointer");
        }
    }

    pub fn load_transcript_pointer(&self) -> Option<String> {
        let content = fs::read_to_string(self.state_path(TRANSCRIPT_POINTER)).ok()?;
        let trimmed = content.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }

    // ── Timestamp marks ──

    /// Stamp a named mark with the current unix time. Best-effort.
    pub fn mark_now(&self, name: &str) {
        let path = self.state_path(name);
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        if let Err(e) = fs::write(&path, now.to_string()) {
            tracing::debug!(mark = name, error = %e, "failed to write mark");
        }
    }

    /// Age of a named mark in seconds, or `None` if absent/unreadable.
    pub fn mark_age_secs(&self, name: &str) -> Option<u64> {
        let content = fs::read_to_string(self.state_path(name)).ok()?;
        let stamped: i64 = content.trim().parse().ok()?;
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        Some(now.saturating_sub(stamped).max(0) as u64)
    }
}

/// Atomic write: temp file in the same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_paths_nest_under_vigil_dir() {
        let dir = StateDir::new("/proj");
        assert_eq!(dir.state_path(SYNC_LOCK), PathBuf::from("/proj/.vigil/state/workspace-sync.lock"));
        assert_eq!(dir.config_path(), PathBuf::from("/proj/.vigil/config.yaml"));
    }

    #[test]
    fn transcript_pointer_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::new(tmp.path());
        assert!(dir.load_transcript_pointer().is_none());
        dir.save_transcript_pointer("/tmp/session.jsonl");
        assert_eq!(dir.load_transcript_pointer().unwrap(), "/tmp/session.jsonl");
    }

    #[test]
    fn empty_pointer_is_not_saved() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::new(tmp.path());
        dir.save_transcript_pointer("");
        assert!(dir.load_transcript_pointer().is_none());
    }

    #[test]
    fn mark_age_fresh_and_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::new(tmp.path());
        assert!(dir.mark_age_secs("m").is_none());
        dir.mark_now("m");
        assert!(dir.mark_age_secs("m").unwrap() < 5);
    }

    #[test]
    fn mark_age_unparseable_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::new(tmp.path());
        dir.ensure().unwrap();
        fs::write(dir.state_path("m"), "not-a-number").unwrap();
        assert!(dir.mark_age_secs("m").is_none());
    }

    #[test]
    fn write_atomic_replaces_content() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("f.txt");
        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
    }
}
