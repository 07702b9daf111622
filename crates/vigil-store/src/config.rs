//! Coordinator configuration.
//!
//! Read from `.vigil/config.yaml`; a missing or malformed file means
//! defaults. A few knobs also take `VIGIL_*` env overrides so tests and
//! one-off runs can retune without editing the project.

use std::fs;
use std::time::Duration;

use serde::Deserialize;

use crate::paths::StateDir;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync_enabled: bool,
    /// Token total at which the save-before-compaction gate fires.
    pub sync_threshold: u64,
    pub lock_stale_secs: u64,
    pub worker_timeout_secs: u64,
    /// Minimum meaningful transcript entries worth a worker run.
    pub min_entries: usize,
    pub worker_bin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync_enabled: true,
            sync_threshold: 150_000,
            lock_stale_secs: 300,
            worker_timeout_secs: 180,
            min_entries: 5,
            worker_bin: "claude".into(),
        }
    }
}

impl Config {
    pub fn load(dir: &StateDir) -> Self {
        let mut config: Config = fs::read_to_string(dir.config_path())
            .ok()
            .and_then(|content| match serde_yaml::from_str(&content) {
                Ok(c) => Some(c),
                Err(e) => {
                    tracing::warn!(error = %e, "malformed config, using defaults");
                    None
                }
            })
            .unwrap_or_default();

        if let Some(bin) = std::env::var("VIGIL_WORKER_BIN").ok().filter(|v| !v.is_empty()) {
            config.worker_bin = bin;
        }
        if let Some(secs) = env_u64("VIGIL_WORKER_TIMEOUT_SECS") {
            config.worker_timeout_secs = secs;
        }
        if let Some(secs) = env_u64("VIGIL_LOCK_STALE_SECS") {
            config.lock_stale_secs = secs;
        }
        config
    }

    pub fn lock_stale(&self) -> Duration {
        Duration::from_secs(self.lock_stale_secs)
    }

    pub fn worker_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_timeout_secs)
    }

    /// How long the consumer outwaits a running sync: the worker budget
    /// plus slack, so reconfiguring the budget keeps the invariant.
    pub fn release_wait_bound(&self) -> Duration {
        Duration::from_secs(self.worker_timeout_secs + 10)
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_file_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&StateDir::new(tmp.path()));
        assert!(config.sync_enabled);
        assert_eq!(config.sync_threshold, 150_000);
        assert_eq!(config.worker_timeout_secs, 180);
        assert_eq!(config.min_entries, 5);
        assert_eq!(config.worker_bin, "claude");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::new(tmp.path());
        fs::create_dir_all(dir.vigil_dir()).unwrap();
        fs::write(dir.config_path(), "sync_threshold: 90000\nsync_enabled: false\n").unwrap();
        let config = Config::load(&dir);
        assert_eq!(config.sync_threshold, 90_000);
        assert!(!config.sync_enabled);
        assert_eq!(config.lock_stale_secs, 300);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = StateDir::new(tmp.path());
        fs::create_dir_all(dir.vigil_dir()).unwrap();
        fs::write(dir.config_path(), ": not yaml [").unwrap();
        let config = Config::load(&dir);
        assert_eq!(config.sync_threshold, 150_000);
    }

    #[test]
    fn release_wait_outlasts_worker_budget() {
        let config = Config::default();
        assert!(config.release_wait_bound() > config.worker_timeout());
    }
}
