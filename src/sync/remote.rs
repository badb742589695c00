//! Staging folder to object store and back, equality by content.
//!
//! A project's staging folder is `<project>/s3-staging/`; its objects live
//! under `<key_prefix><project_id>/`. Local files are compared with remote
//! objects by recomputing the object's ETag from the file.

use super::{Outcome, SyncError, SyncReport, display_relative};
use crate::checksum::etag_matches;
use crate::config::{BrandProfile, TransferSettings};
use crate::exclude::ExclusionPolicy;
use crate::store::{
    ObjectMeta, ObjectStore, build_key, project_prefix, relative_from_key, relative_key_to_path,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const STAGING_DIR: &str = "s3-staging";

pub fn staging_dir(profile: &BrandProfile, project_id: &str) -> PathBuf {
    profile.project_dir().join(project_id).join(STAGING_DIR)
}

/// Everything a remote transfer needs besides the project itself.
pub struct RemoteSync<'a> {
    pub store: &'a dyn ObjectStore,
    pub key_prefix: &'a str,
    pub transfer: TransferSettings,
    pub policy: &'a ExclusionPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    LocalOnly,
    RemoteOnly,
    Synced,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub path: String,
    pub state: FileState,
    pub local_size: Option<u64>,
    pub remote_size: Option<u64>,
}

impl RemoteSync<'_> {
    /// Uploads the staging folder, skipping files whose content already
    /// matches the stored object.
    pub fn upload(
        &self,
        project_id: &str,
        staging: &Path,
        dry_run: bool,
    ) -> Result<SyncReport, SyncError> {
        if !staging.is_dir() {
            return Err(SyncError::SourceMissing(staging.to_path_buf()));
        }
        info!(
            "Uploading {} to {}",
            staging.display(),
            self.store.describe()
        );

        let mut report = SyncReport::new(dry_run);
        for (relative, size) in self.local_files(staging, &mut report) {
            let name = display_relative(&relative);
            let Some(key) = build_key(self.key_prefix, project_id, &relative) else {
                report.record(name, size, Outcome::Failed("path cannot be stored".to_string()));
                continue;
            };

            let outcome = self.upload_file(&staging.join(&relative), &key, size, dry_run);
            if let Outcome::Failed(reason) = &outcome {
                warn!("Failed to upload {}: {}", name, reason);
            }
            report.record(name, size, outcome);
        }
        Ok(report)
    }

    fn upload_file(&self, path: &Path, key: &str, size: u64, dry_run: bool) -> Outcome {
        match self.store.head(key) {
            Ok(Some(remote)) => match self.same_content(path, size, &remote) {
                Ok(true) => {
                    debug!("Unchanged: {}", key);
                    return Outcome::Skipped;
                }
                Ok(false) => {}
                Err(reason) => return Outcome::Failed(reason),
            },
            Ok(None) => {}
            Err(e) => return Outcome::Failed(e.to_string()),
        }

        if dry_run {
            debug!("Would upload {}", key);
            return Outcome::Transferred;
        }

        let result = if size > self.transfer.multipart_threshold {
            self.store.put_multipart(key, path, self.transfer.part_size)
        } else {
            self.store.put(key, path)
        };
        match result {
            Ok(()) => {
                debug!("Uploaded {}", key);
                Outcome::Transferred
            }
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }

    /// Downloads every object of the project into the staging folder.
    pub fn download(
        &self,
        project_id: &str,
        staging: &Path,
        dry_run: bool,
    ) -> Result<SyncReport, SyncError> {
        let objects = self.remote_files(project_id)?;
        info!(
            "Downloading {} objects from {}",
            objects.len(),
            self.store.describe()
        );
        if objects.is_empty() {
            warn!("No objects stored for {}", project_id);
        }

        let mut report = SyncReport::new(dry_run);
        for (relative, object) in objects {
            let Some(local) = relative_key_to_path(&relative) else {
                report.record(relative, object.size, Outcome::Failed("unsafe object key".to_string()));
                continue;
            };
            let dest = staging.join(local);
            let outcome = self.download_file(&object, &dest, dry_run);
            if let Outcome::Failed(reason) = &outcome {
                warn!("Failed to download {}: {}", relative, reason);
            }
            report.record(relative, object.size, outcome);
        }
        Ok(report)
    }

    fn download_file(&self, object: &ObjectMeta, dest: &Path, dry_run: bool) -> Outcome {
        if let Ok(metadata) = std::fs::metadata(dest)
            && metadata.is_file()
        {
            match self.same_content(dest, metadata.len(), object) {
                Ok(true) => {
                    debug!("Unchanged: {}", dest.display());
                    return Outcome::Skipped;
                }
                Ok(false) => {}
                Err(reason) => return Outcome::Failed(reason),
            }
        }

        if dry_run {
            debug!("Would download {}", object.key);
            return Outcome::Transferred;
        }

        match self.store.get(&object.key, dest) {
            Ok(_) => {
                debug!("Downloaded {}", object.key);
                Outcome::Transferred
            }
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }

    /// Per-file comparison of the staging folder with the stored objects,
    /// sorted by path.
    pub fn status(&self, project_id: &str, staging: &Path) -> Result<Vec<StatusEntry>, SyncError> {
        let mut ignored = SyncReport::new(true);
        let local: BTreeMap<String, (PathBuf, u64)> = if staging.is_dir() {
            self.local_files(staging, &mut ignored)
                .into_iter()
                .map(|(rel, size)| (display_relative(&rel), (rel, size)))
                .collect()
        } else {
            BTreeMap::new()
        };
        let mut remote = self.remote_files(project_id)?;

        let mut entries = Vec::new();
        for (name, (relative, size)) in local {
            let entry = match remote.remove(&name) {
                None => StatusEntry {
                    path: name,
                    state: FileState::LocalOnly,
                    local_size: Some(size),
                    remote_size: None,
                },
                Some(object) => {
                    let same = self
                        .same_content(&staging.join(&relative), size, &object)
                        .map_err(|reason| {
                            SyncError::Io(std::io::Error::other(format!("{name}: {reason}")))
                        })?;
                    StatusEntry {
                        path: name,
                        state: if same {
                            FileState::Synced
                        } else {
                            FileState::Modified
                        },
                        local_size: Some(size),
                        remote_size: Some(object.size),
                    }
                }
            };
            entries.push(entry);
        }
        entries.extend(remote.into_iter().map(|(name, object)| StatusEntry {
            path: name,
            state: FileState::RemoteOnly,
            local_size: None,
            remote_size: Some(object.size),
        }));
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    /// Deletes every stored object of the project.
    pub fn cleanup_remote(
        &self,
        project_id: &str,
        force: bool,
        dry_run: bool,
    ) -> Result<SyncReport, SyncError> {
        if !force && !dry_run {
            return Err(SyncError::ForceRequired);
        }

        let mut report = SyncReport::new(dry_run);
        for (relative, object) in self.remote_objects(project_id)? {
            if dry_run {
                report.record(relative, object.size, Outcome::Transferred);
                continue;
            }
            match self.store.delete(&object.key) {
                Ok(()) => report.record(relative, object.size, Outcome::Transferred),
                Err(e) => {
                    warn!("Failed to delete {}: {}", object.key, e);
                    report.record(relative, object.size, Outcome::Failed(e.to_string()));
                }
            }
        }
        Ok(report)
    }

    fn same_content(&self, path: &Path, size: u64, remote: &ObjectMeta) -> Result<bool, String> {
        if remote.size != size {
            return Ok(false);
        }
        match remote.etag.as_deref() {
            Some(etag) => {
                etag_matches(path, etag, self.transfer.part_size).map_err(|e| e.to_string())
            }
            None => Ok(false),
        }
    }

    /// Non-excluded regular files under `root` as (relative path, size).
    /// Unreadable entries are recorded as failures in `report`.
    fn local_files(&self, root: &Path, report: &mut SyncReport) -> Vec<(PathBuf, u64)> {
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry
                    .path()
                    .strip_prefix(root)
                    .map(|rel| !self.policy.is_excluded(rel))
                    .unwrap_or(true)
            });

        let mut files = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    let Ok(relative) = entry.path().strip_prefix(root) else {
                        continue;
                    };
                    match entry.metadata() {
                        Ok(metadata) => files.push((relative.to_path_buf(), metadata.len())),
                        Err(e) => report.record(
                            display_relative(relative),
                            0,
                            Outcome::Failed(e.to_string()),
                        ),
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    let name = e
                        .path()
                        .and_then(|p| p.strip_prefix(root).ok())
                        .map(display_relative)
                        .unwrap_or_default();
                    report.record(name, 0, Outcome::Failed(e.to_string()));
                }
            }
        }
        files
    }

    /// Every stored object of the project keyed by its relative path.
    fn remote_objects(&self, project_id: &str) -> Result<BTreeMap<String, ObjectMeta>, SyncError> {
        let prefix = project_prefix(self.key_prefix, project_id);
        let mut objects = BTreeMap::new();
        for object in self.store.list(&prefix)? {
            if let Some(relative) = relative_from_key(self.key_prefix, project_id, &object.key) {
                objects.insert(relative, object);
            }
        }
        Ok(objects)
    }

    /// Stored objects that pass the exclusion policy.
    fn remote_files(&self, project_id: &str) -> Result<BTreeMap<String, ObjectMeta>, SyncError> {
        let mut objects = self.remote_objects(project_id)?;
        objects.retain(|relative, _| {
            let keep = !self.policy.is_excluded_key(relative);
            if !keep {
                debug!("Excluded remote object {}", relative);
            }
            keep
        });
        Ok(objects)
    }
}

/// Deletes the local staging folder.
pub fn cleanup_local(staging: &Path, force: bool, dry_run: bool) -> Result<SyncReport, SyncError> {
    if !force && !dry_run {
        return Err(SyncError::ForceRequired);
    }

    let mut report = SyncReport::new(dry_run);
    if !staging.is_dir() {
        info!("No staging folder at {}", staging.display());
        return Ok(report);
    }

    for entry in WalkDir::new(staging).sort_by_file_name() {
        let entry = entry.map_err(|e| SyncError::Io(e.into()))?;
        if entry.file_type().is_dir() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(staging) else {
            continue;
        };
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        report.record(display_relative(relative), size, Outcome::Transferred);
    }

    if !dry_run {
        std::fs::remove_dir_all(staging)?;
        info!("Removed {}", staging.display());
    }
    Ok(report)
}
