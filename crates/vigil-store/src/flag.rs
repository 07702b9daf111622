//! Flag files and the one-shot gate handshake built on them.
//!
//! A flag is a boolean marker with no payload: it exists or it does not.
//! All operations are soft — an I/O failure degrades to "no coordination"
//! rather than surfacing an error to the calling hook.

use std::fs;
use std::path::PathBuf;

use crate::paths::StateDir;

#[derive(Debug, Clone)]
pub struct Flag {
    path: PathBuf,
}

impl Flag {
    pub fn new(dir: &StateDir, name: &str) -> Self {
        Self {
            path: dir.state_path(name),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Idempotent create. Creating an existing flag is not an error.
    pub fn create(&self) {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(e) = fs::write(&self.path, b"") {
            tracing::debug!(flag = %self.path.display(), error = %e, "flag create failed");
        }
    }

    /// Idempotent clear. Clearing a missing flag is not an error.
    pub fn clear(&self) {
        let _ = fs::remove_file(&self.path);
    }

    /// Observe-and-clear in one step. The successful delete IS the
    /// observation, so two concurrent takers cannot both see `true`.
    pub fn take(&self) -> bool {
        fs::remove_file(&self.path).is_ok()
    }
}

/// One-shot request/acknowledge handshake.
///
/// One participant `request`s the gate; the counterpart `take`s it on its
/// next turn and is expected to act before resuming. Once taken, the gate
/// stays clear until a new `request` re-arms it.
#[derive(Debug, Clone)]
pub struct Gate {
    flag: Flag,
}

impl Gate {
    pub fn new(dir: &StateDir, name: &str) -> Self {
        Self {
            flag: Flag::new(dir, name),
        }
    }

    pub fn request(&self) {
        self.flag.create();
    }

    pub fn pending(&self) -> bool {
        self.flag.exists()
    }

    pub fn take(&self) -> bool {
        self.flag.take()
    }

    pub fn clear(&self) {
        self.flag.clear();
    }
}
