//! Copies the light files of backed-up projects into the local archive so
//! they can be browsed without the backup drive.

use crate::bucket::bucket_for;
use crate::config::BrandProfile;
use crate::exclude::ExclusionPolicy;
use crate::manifest::is_light;
use crate::manifest_file::{Manifest, Structure};
use crate::sync::local::{FileFilter, sync_tree};
use crate::sync::{SyncError, SyncReport, Tier, ensure_tier_available};
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    #[error("Brand '{brand}' has no backup location configured (set locations.ssd_backup)")]
    NoBackupConfigured { brand: String },
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
}

#[derive(Debug, Clone)]
pub struct RestoredProject {
    pub id: String,
    pub report: SyncReport,
}

#[derive(Debug, Clone, Default)]
pub struct RestoreSummary {
    pub restored: Vec<RestoredProject>,
    /// Project id and the reason it was left alone.
    pub skipped: Vec<(String, String)>,
}

impl RestoreSummary {
    pub fn files_copied(&self) -> usize {
        self.restored.iter().map(|p| p.report.transferred()).sum()
    }

    pub fn files_failed(&self) -> usize {
        self.restored.iter().map(|p| p.report.failed()).sum()
    }
}

pub fn restore_from_backup(
    profile: &BrandProfile,
    manifest: &Manifest,
    policy: &ExclusionPolicy,
    dry_run: bool,
) -> Result<RestoreSummary, RestoreError> {
    let backup_root = profile
        .backup_root
        .as_deref()
        .ok_or_else(|| RestoreError::NoBackupConfigured {
            brand: profile.key.clone(),
        })?;
    ensure_tier_available(Tier::Backup, backup_root)?;

    let light_only: FileFilter = &|path| is_light(path);
    let mut summary = RestoreSummary::default();

    for entry in &manifest.projects {
        let Some(relative) = entry.storage.ssd.path.as_deref() else {
            continue;
        };
        if !entry.storage.ssd.exists {
            continue;
        }

        let mut skip = |reason: String| {
            warn!("Skipping {}: {}", entry.id, reason);
            summary.skipped.push((entry.id.clone(), reason));
        };

        if entry.storage.local.structure == Some(Structure::Flat)
            || profile.project_dir().join(&entry.id).is_dir()
        {
            skip("project is in the working directory".to_string());
            continue;
        }

        let source = backup_root.join(relative);
        if !source.is_dir() {
            skip(format!("backup path {} is missing", source.display()));
            continue;
        }

        let destination = profile
            .archived_dir()
            .join(bucket_for(&entry.id))
            .join(&entry.id);
        let report = match sync_tree(&source, &destination, policy, dry_run, Some(light_only)) {
            Ok(report) => report,
            Err(e) => {
                skip(e.to_string());
                continue;
            }
        };
        info!("{}: {}", entry.id, report.summary("copied"));
        summary.restored.push(RestoredProject {
            id: entry.id.clone(),
            report,
        });
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::generate;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, BrandProfile, PathBuf) {
        let temp = TempDir::new().unwrap();
        let local = temp.path().join("v-appydave");
        let backup = temp.path().join("T7");
        fs::create_dir_all(&local).unwrap();

        let old = backup.join("b00-b49/b40-old");
        fs::create_dir_all(old.join("subs")).unwrap();
        fs::write(old.join("final.mp4"), vec![0u8; 512]).unwrap();
        fs::write(old.join("subs/final.srt"), "subs").unwrap();
        fs::write(old.join("thumb.png"), "png").unwrap();

        let profile = BrandProfile {
            key: "appydave".to_string(),
            name: "AppyDave".to_string(),
            shortcuts: vec![],
            video_projects: local,
            backup_root: Some(backup.clone()),
            object_store: None,
            projects_subfolder: None,
        };
        (temp, profile, backup)
    }

    #[test]
    fn test_copies_light_files_into_archive() {
        let (_temp, profile, _backup) = fixture();
        let manifest = generate(&profile).unwrap().manifest;

        let summary =
            restore_from_backup(&profile, &manifest, &ExclusionPolicy::default(), false).unwrap();

        let dest = profile.archived_dir().join("b00-b49/b40-old");
        assert_eq!(summary.files_copied(), 2);
        assert!(dest.join("subs/final.srt").is_file());
        assert!(dest.join("thumb.png").is_file());
        assert!(!dest.join("final.mp4").exists());

        let again =
            restore_from_backup(&profile, &manifest, &ExclusionPolicy::default(), false).unwrap();
        assert_eq!(again.files_copied(), 0);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let (_temp, profile, _backup) = fixture();
        let manifest = generate(&profile).unwrap().manifest;

        let summary =
            restore_from_backup(&profile, &manifest, &ExclusionPolicy::default(), true).unwrap();

        assert_eq!(summary.files_copied(), 2);
        assert!(!profile.archived_dir().exists());
    }

    #[test]
    fn test_skips_flat_projects_and_missing_backup_paths() {
        let (_temp, profile, backup) = fixture();
        let manifest = generate(&profile).unwrap().manifest;

        fs::create_dir_all(profile.project_dir().join("b40-old")).unwrap();
        let summary =
            restore_from_backup(&profile, &manifest, &ExclusionPolicy::default(), false).unwrap();
        assert_eq!(summary.skipped.len(), 1);
        assert!(summary.skipped[0].1.contains("working directory"));

        fs::remove_dir_all(profile.project_dir().join("b40-old")).unwrap();
        fs::remove_dir_all(backup.join("b00-b49/b40-old")).unwrap();
        let summary =
            restore_from_backup(&profile, &manifest, &ExclusionPolicy::default(), false).unwrap();
        assert!(summary.skipped[0].1.contains("missing"));
        assert!(summary.restored.is_empty());
    }

    #[test]
    fn test_unmounted_backup_is_a_hard_stop() {
        let (_temp, mut profile, backup) = fixture();
        let manifest = generate(&profile).unwrap().manifest;
        fs::remove_dir_all(&backup).unwrap();
        profile.backup_root = Some(backup);

        assert!(matches!(
            restore_from_backup(&profile, &manifest, &ExclusionPolicy::default(), false),
            Err(RestoreError::Sync(SyncError::TierUnavailable { .. }))
        ));
    }
}
