//! Local tree to local tree, equality by size.

use super::{Outcome, SyncError, SyncReport, display_relative};
use crate::exclude::ExclusionPolicy;
use crate::util::atomic;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Per-file filter applied after exclusion; `false` leaves the file out of
/// the transfer entirely.
pub type FileFilter<'a> = &'a dyn Fn(&Path) -> bool;

/// Copies every file under `src` into the same relative place under `dst`
/// unless a file of the same size is already there.
pub fn sync_tree(
    src: &Path,
    dst: &Path,
    policy: &ExclusionPolicy,
    dry_run: bool,
    filter: Option<FileFilter<'_>>,
) -> Result<SyncReport, SyncError> {
    if !src.is_dir() {
        return Err(SyncError::SourceMissing(src.to_path_buf()));
    }

    let mut report = SyncReport::new(dry_run);
    let walker = WalkDir::new(src)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry
                .path()
                .strip_prefix(src)
                .map(|rel| !policy.is_excluded(rel))
                .unwrap_or(true)
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .and_then(|p| p.strip_prefix(src).ok())
                    .map(display_relative)
                    .unwrap_or_default();
                warn!("Cannot read {}: {}", path, e);
                report.record(path, 0, Outcome::Failed(e.to_string()));
                continue;
            }
        };

        if !entry.file_type().is_file() {
            if entry.file_type().is_symlink() {
                debug!("Skipping symlink {}", entry.path().display());
            }
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        if filter.is_some_and(|keep| !keep(relative)) {
            continue;
        }

        let name = display_relative(relative);
        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                report.record(name, 0, Outcome::Failed(e.to_string()));
                continue;
            }
        };

        let dest = dst.join(relative);
        let outcome = transfer_file(entry.path(), &dest, size, dry_run);
        if let Outcome::Failed(reason) = &outcome {
            warn!("Failed to copy {}: {}", name, reason);
        }
        report.record(name, size, outcome);
    }

    Ok(report)
}

fn transfer_file(src: &Path, dest: &Path, size: u64, dry_run: bool) -> Outcome {
    match std::fs::metadata(dest) {
        Ok(existing) if existing.is_file() && existing.len() == size => {
            debug!("Up to date: {}", dest.display());
            return Outcome::Skipped;
        }
        _ => {}
    }

    if dry_run {
        debug!("Would copy {} -> {}", src.display(), dest.display());
        return Outcome::Transferred;
    }

    match atomic::copy_file(src, dest) {
        Ok(_) => {
            debug!("Copied {} -> {}", src.display(), dest.display());
            Outcome::Transferred
        }
        Err(e) => Outcome::Failed(e.to_string()),
    }
}
