//! Knowledge-document snapshot.
//!
//! The workspace is a small set of markdown documents the worker maintains:
//! a root index plus topic pages. Content is opaque to the coordinator.

use std::fs;
use std::path::{Path, PathBuf};

use vigil_store::StateDir;

#[derive(Debug, Default, Clone)]
pub struct WorkspaceSnapshot {
    pub root: String,
    /// `(path relative to the project, content)`, sorted by path.
    pub pages: Vec<(String, String)>,
}

impl WorkspaceSnapshot {
    pub fn is_empty(&self) -> bool {
        self.root.trim().is_empty() && self.pages.is_empty()
    }
}

pub fn load(dir: &StateDir) -> WorkspaceSnapshot {
    let root = fs::read_to_string(dir.workspace_root_path()).unwrap_or_default();

    let mut page_paths = Vec::new();
    collect_md(&dir.workspace_pages_dir(), &mut page_paths);
    page_paths.sort();

    let pages = page_paths
        .into_iter()
        .filter_map(|path| {
            let content = fs::read_to_string(&path).ok()?;
            let rel = path
                .strip_prefix(dir.project_dir())
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();
            Some((rel, content))
        })
        .collect();

    WorkspaceSnapshot { root, pages }
}

fn collect_md(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_md(&path, out);
        } else if path.extension().is_some_and(|e| e == "md") {
            out.push(path);
        }
    }
}
