use ignore::{DirEntry, WalkBuilder};
use std::path::{Path, PathBuf};

use crate::catalog::is_archive_name;
use crate::error::{IndexError, Result};

/// Archive files (`.jar`/`.war`, any case) under `root`, sorted by path.
/// Without `recursive` only the direct children of `root` are considered.
pub fn find_archives(root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(IndexError::NotFound(root.to_path_buf()));
    }

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .ignore(false)
        .parents(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false);
    if !recursive {
        builder.max_depth(Some(1));
    }

    let mut archives = Vec::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        if !is_file_entry(&entry) {
            continue;
        }
        let path = entry.path();
        if path
            .file_name()
            .is_some_and(|name| is_archive_name(&name.to_string_lossy()))
        {
            archives.push(path.to_path_buf());
        }
    }

    archives.sort();
    Ok(archives)
}

/// Regular files, and symlinks whose target is a regular file.
fn is_file_entry(entry: &DirEntry) -> bool {
    match entry.file_type() {
        Some(t) if t.is_file() => true,
        Some(t) if t.is_symlink() => entry.path().metadata().is_ok_and(|m| m.is_file()),
        _ => false,
    }
}
