// src/paths.rs

use crate::error::StatsError;
use crate::model::ESSENCE_EXTENSION;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

pub fn count_lines(path: &Path) -> io::Result<usize> {
    Ok(fs::read_to_string(path)?.lines().count())
}

/// Lexically normalize a path: drop `.` segments and fold `..` into its parent.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Format `path`, keeping only its last `depth` segments. A depth of 0, or one
/// at least as long as the path, yields the whole normalized path.
pub fn trim_path(path: &Path, depth: usize) -> String {
    let normalized = normalize(path);
    let segments: Vec<_> = normalized
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();

    if depth == 0 || depth >= segments.len() {
        return normalized.display().to_string();
    }

    segments[segments.len() - depth..]
        .iter()
        .collect::<PathBuf>()
        .display()
        .to_string()
}

pub fn has_essence_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == ESSENCE_EXTENSION)
}

/// Keep readable walk entries. Unreadable ones are logged and dropped, so the
/// rest of the tree is still walked.
pub fn readable_entry(entry: walkdir::Result<DirEntry>) -> Option<DirEntry> {
    match entry {
        Ok(entry) => Some(entry),
        Err(e) => {
            let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
            warn!(%path, error = %e, "skipping unreadable entry");
            None
        }
    }
}

/// All `.essence` files under `dir`, in a stable (name-sorted, depth-first) order.
pub fn find_essence_files(dir: &Path) -> Result<impl Iterator<Item = PathBuf>, StatsError> {
    if !dir.is_dir() {
        return Err(StatsError::InvalidDirectory(dir.to_path_buf()));
    }

    Ok(WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(readable_entry)
        .filter(|e| e.file_type().is_file() && has_essence_extension(e.path()))
        .map(|e| e.into_path()))
}
