//! Post-run working-tree diff capture.
//!
//! Independent corroboration of what the worker actually changed, next to
//! what its output stream claimed. Evidence only — nothing is enforced.

use std::path::Path;
use std::process::Command;

use serde::Serialize;

#[derive(Debug, Default, Clone, Serialize)]
pub struct DiffSummary {
    /// Paths from `git status --porcelain` (includes untracked).
    pub changed_files: Vec<String>,
    /// `git diff --shortstat` line, e.g. "2 files changed, 10 insertions(+)".
    pub shortstat: String,
}

impl DiffSummary {
    pub fn is_empty(&self) -> bool {
        self.changed_files.is_empty() && self.shortstat.is_empty()
    }
}

/// Best-effort: not a git repo, or git missing, yields an empty summary.
pub fn capture(project_dir: &Path) -> DiffSummary {
    let changed_files = run_git(project_dir, &["status", "--porcelain"])
        .map(|out| {
            out.lines()
                .filter(|l| l.len() > 3)
                .map(|l| l[3..].to_string())
                .collect()
        })
        .unwrap_or_default();

    let shortstat = run_git(project_dir, &["diff", "--shortstat"])
        .map(|out| out.trim().to_string())
        .unwrap_or_default();

    DiffSummary {
        changed_files,
        shortstat,
    }
}

fn run_git(cwd: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).current_dir(cwd).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}
