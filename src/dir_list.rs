//! Directory listing helpers shared by the locator and the reconciler.
//!
//! [`list_directory`] is non-recursive: it returns the immediate children of
//! a directory with just enough metadata to tell projects (directories)
//! from loose files. [`tree_size`] and [`has_file_matching`] walk recursively.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum DirListError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
}

impl DirListError {
    fn from_io(e: std::io::Error, path: &Path) -> Self {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            DirListError::PermissionDenied(path.to_path_buf())
        } else {
            DirListError::Io(e)
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DirListError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEntry {
    pub name: String,
    pub metadata: EntryMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryMetadata {
    File { size: u64 },
    Dir,
    Symlink,
}

/// Immediate children of `root`, sorted by name. Names that are not valid
/// UTF-8 are skipped since they cannot be project identifiers.
pub fn list_directory(root: &Path) -> Result<Vec<FsEntry>, DirListError> {
    let read_dir = std::fs::read_dir(root).map_err(|e| DirListError::from_io(e, root))?;

    let mut entries = Vec::new();

    for entry in read_dir {
        let entry = entry.map_err(DirListError::Io)?;
        let path = entry.path();

        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };

        let metadata =
            std::fs::symlink_metadata(&path).map_err(|e| DirListError::from_io(e, &path))?;
        let file_type = metadata.file_type();

        let entry_metadata = if file_type.is_symlink() {
            EntryMetadata::Symlink
        } else if file_type.is_dir() {
            EntryMetadata::Dir
        } else {
            EntryMetadata::File {
                size: metadata.len(),
            }
        };

        entries.push(FsEntry {
            name,
            metadata: entry_metadata,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(entries)
}

/// Names of the immediate sub-directories of `root`. A missing `root` yields
/// an empty list rather than an error.
pub fn list_subdirectories(root: &Path) -> Result<Vec<String>, DirListError> {
    match list_directory(root) {
        Ok(entries) => Ok(entries
            .into_iter()
            .filter(|e| e.metadata == EntryMetadata::Dir)
            .map(|e| e.name)
            .collect()),
        Err(e) if e.is_not_found() => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Total size in bytes of all regular files below `root`. Symlinks are not
/// followed. A missing `root` has size zero.
pub fn tree_size(root: &Path) -> Result<u64, DirListError> {
    if !root.exists() {
        return Ok(0);
    }

    let mut total = 0u64;
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| walk_error(e, root))?;
        if entry.file_type().is_file() {
            let metadata = entry.metadata().map_err(|e| walk_error(e, root))?;
            total = total.saturating_add(metadata.len());
        }
    }
    Ok(total)
}

/// Whether any regular file below `root` (recursively when `recursive`)
/// satisfies `predicate`.
pub fn has_file_matching<F>(root: &Path, recursive: bool, predicate: F) -> bool
where
    F: Fn(&Path) -> bool,
{
    let max_depth = if recursive { usize::MAX } else { 1 };
    WalkDir::new(root)
        .max_depth(max_depth)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .any(|e| e.file_type().is_file() && predicate(e.path()))
}

/// Lower-cased extension of `path`, without the dot.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(OsStr::to_str)
        .map(str::to_lowercase)
}

fn walk_error(e: walkdir::Error, root: &Path) -> DirListError {
    let path = e.path().unwrap_or(root).to_path_buf();
    match e.into_io_error() {
        Some(io) => DirListError::from_io(io, &path),
        None => DirListError::Io(std::io::Error::other(format!(
            "filesystem loop detected under {}",
            path.display()
        ))),
    }
}
