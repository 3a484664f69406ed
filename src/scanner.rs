//! Directory scanner: list files of a directory, or of a whole tree.

use anyhow::{Context, Result};

use crate::fs::{DirHandle, Entry, FileHandle, MediaFs};
use crate::model::FileEntry;

/// Direct file children of `dir`, in provider order.
///
/// Files that disappear (or cannot be stat'ed) between listing and reading
/// are skipped.
pub fn scan_top<F: MediaFs + ?Sized>(fs: &F, dir: &DirHandle) -> Result<Vec<FileEntry>> {
    let entries = fs
        .entries(dir)
        .with_context(|| format!("cannot list {}", dir.path().display()))?;

    let mut files = Vec::new();
    let mut skipped = 0usize;
    for entry in entries {
        if let Entry::File { name, handle } = entry {
            match stat(fs, dir, name, handle) {
                Some(f) => files.push(f),
                None => skipped += 1,
            }
        }
    }
    log::debug!(
        "scan_top {}: {} files, {} skipped",
        dir.path().display(),
        files.len(),
        skipped
    );
    Ok(files)
}

/// Files of `dir` and of every subdirectory, flattened.
///
/// Same-named files from different directories are all kept; only their
/// handles tell them apart.
pub fn scan_deep<F: MediaFs + ?Sized>(fs: &F, dir: &DirHandle) -> Result<Vec<FileEntry>> {
    let found = fs
        .walk_files(dir)
        .with_context(|| format!("cannot walk {}", dir.path().display()))?;

    let mut files = Vec::with_capacity(found.len());
    let mut skipped = 0usize;
    for (parent, name, handle) in found {
        match stat(fs, &parent, name, handle) {
            Some(f) => files.push(f),
            None => skipped += 1,
        }
    }
    log::debug!(
        "scan_deep {}: {} files, {} skipped",
        dir.path().display(),
        files.len(),
        skipped
    );
    Ok(files)
}

fn stat<F: MediaFs + ?Sized>(
    fs: &F,
    parent: &DirHandle,
    name: String,
    handle: FileHandle,
) -> Option<FileEntry> {
    match fs.file_info(&handle) {
        Ok(info) => Some(FileEntry {
            name,
            handle,
            parent: parent.clone(),
            date: info.modified_ms,
        }),
        Err(e) => {
            log::debug!("scan: skipping {}: {}", name, e);
            None
        }
    }
}
