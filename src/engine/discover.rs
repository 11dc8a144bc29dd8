//! engine::discover
//!
//! Find repositories under a root directory.
//!
//! A directory is a repository candidate when it has a `.git` entry, which
//! may be a directory or a gitdir file (worktrees, submodules). The walk
//! keeps going below a repository, so nested repositories are found too.
//! Hidden directories and configured names (e.g. `node_modules`) are never
//! entered.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Discover repositories under `root`, in sorted walk order.
///
/// # Example
///
/// ```ignore
/// let repos = discover(Path::new("~/src"), &["node_modules".to_string()]);
/// ```
pub fn discover(root: &Path, ignore: &[String]) -> Vec<PathBuf> {
    let ignore: HashSet<&str> = ignore.iter().map(String::as_str).collect();

    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || is_walkable(entry, &ignore))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir() && entry.path().join(".git").exists())
        .map(|entry| entry.into_path())
        .collect()
}

fn is_walkable(entry: &DirEntry, ignore: &HashSet<&str>) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    match entry.file_name().to_str() {
        Some(name) => !name.starts_with('.') && !ignore.contains(name),
        None => true,
    }
}
