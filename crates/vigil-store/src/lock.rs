//! The workspace lock.
//!
//! Existence-based so a concurrently-running consumer can poll for it, and
//! exclusive-create so two acquirers cannot both win a fresh lock. The file
//! payload is the owner's pid (advisory). A lock is only stolen when it is
//! BOTH older than the stale window and its recorded owner is gone — age
//! alone is not proof of death.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::paths::{StateDir, SYNC_LOCK};

#[derive(Debug, Clone)]
pub struct WorkspaceLock {
    path: PathBuf,
    stale_window: Duration,
}

/// Held lock. Dropping the guard releases the lock, so release happens on
/// every exit path out of the holder, panics included.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

impl WorkspaceLock {
    pub fn new(dir: &StateDir, stale_window: Duration) -> Self {
        Self {
            path: dir.state_path(SYNC_LOCK),
            stale_window,
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Owner pid recorded in the lock file, if readable.
    pub fn owner_pid(&self) -> Option<u32> {
        let content = fs::read_to_string(&self.path).ok()?;
        content.trim().parse().ok()
    }

    /// Age of the lock file per its mtime.
    pub fn age(&self) -> Option<Duration> {
        let meta = fs::metadata(&self.path).ok()?;
        meta.modified().ok()?.elapsed().ok()
    }

    /// Try to take the lock. Returns `None` when another live owner holds
    /// a fresh lock, or on any I/O failure (soft — no coordination beats a
    /// crashed hook).
    pub fn try_acquire(&self) -> Option<LockGuard> {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match self.create_exclusive() {
            Ok(guard) => Some(guard),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if !self.is_abandoned() {
                    return None;
                }
                // Steal: remove then retry the exclusive create once. The
                // window between remove and create is racy, but at most one
                // of the racing stealers wins the create.
                tracing::warn!(lock = %self.path.display(), "overriding abandoned lock");
                let _ = fs::remove_file(&self.path);
                self.create_exclusive().ok()
            }
            Err(e) => {
                tracing::debug!(lock = %self.path.display(), error = %e, "lock acquire failed");
                None
            }
        }
    }

    /// Unconditional release. Never blocks; releasing a missing lock is fine.
    pub fn release(&self) {
        let _ = fs::remove_file(&self.path);
    }

    /// Consumer side: wait up to `appear_grace` for the lock to appear
    /// (parallel hook batches may schedule the holder after us), then up to
    /// `release_bound` for it to vanish. Always returns; `true` means the
    /// lock is clear, `false` means the bound was exceeded and the caller
    /// should proceed anyway rather than hang.
    pub fn wait_until_released(
        &self,
        appear_grace: Duration,
        release_bound: Duration,
        poll: Duration,
    ) -> bool {
        let appear_deadline = Instant::now() + appear_grace;
        while !self.exists() && Instant::now() < appear_deadline {
            std::thread::sleep(poll);
        }
        if !self.exists() {
            return true; // no holder running, or already finished
        }
        let deadline = Instant::now() + release_bound;
        while self.exists() && Instant::now() < deadline {
            std::thread::sleep(poll);
        }
        !self.exists()
    }

    fn create_exclusive(&self) -> std::io::Result<LockGuard> {
        use std::io::Write;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)?;
        write!(file, "{}", std::process::id())?;
        Ok(LockGuard {
            path: self.path.clone(),
        })
    }

    /// Past the stale window AND the owner is gone. An unreadable owner
    /// token counts as gone.
    fn is_abandoned(&self) -> bool {
        match self.age() {
            Some(age) if age > self.stale_window => {}
            _ => return false,
        }
        match self.owner_pid() {
            Some(pid) => !pid_alive(pid),
            None => true,
        }
    }
}

fn pid_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        // SAFETY: kill with signal 0 only probes for existence.
        unsafe { libc::kill(pid as i32, 0) == 0 }
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}
