//! Moves a project from the hot tier to the backup drive.
//!
//! The hot copy is only ever deleted after the backup copy exists and a
//! size comparison against it finds nothing left to copy.

use crate::bucket::bucket_for;
use crate::config::BrandProfile;
use crate::dir_list::{DirListError, tree_size};
use crate::exclude::ExclusionPolicy;
use crate::sync::local::sync_tree;
use crate::sync::{SyncError, SyncReport, Tier, ensure_tier_available};
use crate::util::size::format_size;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Brand '{brand}' has no backup location configured (set locations.ssd_backup)")]
    NoBackupConfigured { brand: String },
    #[error("Project not found in the working directory: {}", .0.display())]
    SourceMissing(PathBuf),
    #[error("Copy of '{project}' incomplete ({failed} files failed); source kept")]
    CopyIncomplete { project: String, failed: usize },
    #[error(
        "Backup of '{project}' at {} does not match the source ({outstanding} files differ); source kept",
        .destination.display()
    )]
    NotVerified {
        project: String,
        destination: PathBuf,
        outstanding: usize,
    },
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
    #[error("Directory listing error: {0}")]
    DirList(#[from] DirListError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// Delete the hot copy once the backup is confirmed.
    pub force: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveStatus {
    /// Dry run; nothing was touched.
    Planned,
    AlreadyArchived,
    Copied,
}

#[derive(Debug, Clone)]
pub struct ArchiveResult {
    pub project_id: String,
    pub destination: PathBuf,
    pub bytes: u64,
    pub status: ArchiveStatus,
    pub copy: Option<SyncReport>,
    pub source_removed: bool,
}

pub fn archive_project(
    profile: &BrandProfile,
    policy: &ExclusionPolicy,
    project_id: &str,
    options: ArchiveOptions,
) -> Result<ArchiveResult, ArchiveError> {
    let backup_root = profile
        .backup_root
        .as_deref()
        .ok_or_else(|| ArchiveError::NoBackupConfigured {
            brand: profile.key.clone(),
        })?;
    ensure_tier_available(Tier::Backup, backup_root)?;
    ensure_tier_available(Tier::LocalFlat, &profile.project_dir())?;

    let source = profile.project_dir().join(project_id);
    if !source.is_dir() {
        return Err(ArchiveError::SourceMissing(source));
    }

    let destination = backup_root.join(bucket_for(project_id)).join(project_id);
    let bytes = tree_size(&source)?;

    let mut result = ArchiveResult {
        project_id: project_id.to_string(),
        destination: destination.clone(),
        bytes,
        status: ArchiveStatus::Planned,
        copy: None,
        source_removed: false,
    };

    if options.dry_run {
        info!(
            "Would archive {} ({}) to {}{}",
            project_id,
            format_size(bytes),
            destination.display(),
            if options.force {
                " and delete the local copy"
            } else {
                ""
            }
        );
        return Ok(result);
    }

    if destination.exists() {
        info!(
            "{} already archived at {}; skipping copy",
            project_id,
            destination.display()
        );
        result.status = ArchiveStatus::AlreadyArchived;
    } else {
        info!(
            "Archiving {} ({}) to {}",
            project_id,
            format_size(bytes),
            destination.display()
        );
        let report = sync_tree(&source, &destination, policy, false, None)?;
        if report.has_failures() {
            for failure in report.failures() {
                warn!("Not archived: {}", failure.path);
            }
            return Err(ArchiveError::CopyIncomplete {
                project: project_id.to_string(),
                failed: report.failed(),
            });
        }
        // A project with nothing left after exclusion still gets its folder.
        std::fs::create_dir_all(&destination)?;
        result.status = ArchiveStatus::Copied;
        result.copy = Some(report);
    }

    if options.force {
        verify_copy(project_id, &source, &destination, policy)?;
        std::fs::remove_dir_all(&source)?;
        info!("Removed local copy {}", source.display());
        result.source_removed = true;
    }

    Ok(result)
}

/// The backup must exist and a dry-run comparison must find nothing to copy.
fn verify_copy(
    project_id: &str,
    source: &Path,
    destination: &Path,
    policy: &ExclusionPolicy,
) -> Result<(), ArchiveError> {
    let not_verified = |outstanding| ArchiveError::NotVerified {
        project: project_id.to_string(),
        destination: destination.to_path_buf(),
        outstanding,
    };

    if !destination.is_dir() {
        return Err(not_verified(0));
    }
    let pending = sync_tree(source, destination, policy, true, None)?;
    let outstanding = pending.transferred() + pending.failed();
    if outstanding > 0 {
        return Err(not_verified(outstanding));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        profile: BrandProfile,
        backup: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let local = temp.path().join("v-appydave");
        let backup = temp.path().join("T7");
        fs::create_dir_all(local.join("b65-sample/node_modules/x")).unwrap();
        fs::create_dir_all(&backup).unwrap();
        fs::write(local.join("b65-sample/recording.mp4"), vec![0u8; 2048]).unwrap();
        fs::write(local.join("b65-sample/notes.md"), "notes").unwrap();
        fs::write(local.join("b65-sample/node_modules/x/i.js"), "js").unwrap();

        let profile = BrandProfile {
            key: "appydave".to_string(),
            name: "AppyDave".to_string(),
            shortcuts: vec![],
            video_projects: local,
            backup_root: Some(backup.clone()),
            object_store: None,
            projects_subfolder: None,
        };
        Fixture {
            _temp: temp,
            profile,
            backup,
        }
    }

    fn source(fx: &Fixture) -> PathBuf {
        fx.profile.project_dir().join("b65-sample")
    }

    fn run(fx: &Fixture, force: bool, dry_run: bool) -> Result<ArchiveResult, ArchiveError> {
        archive_project(
            &fx.profile,
            &ExclusionPolicy::default(),
            "b65-sample",
            ArchiveOptions { force, dry_run },
        )
    }

    #[test]
    fn test_copies_to_computed_bucket_and_keeps_source() {
        let fx = fixture();
        let result = run(&fx, false, false).unwrap();

        assert_eq!(result.status, ArchiveStatus::Copied);
        assert_eq!(result.destination, fx.backup.join("b50-b99/b65-sample"));
        assert!(fx.backup.join("b50-b99/b65-sample/recording.mp4").is_file());
        assert!(!fx.backup.join("b50-b99/b65-sample/node_modules").exists());
        assert!(source(&fx).is_dir());
        assert!(!result.source_removed);
    }

    #[test]
    fn test_second_run_is_already_archived() {
        let fx = fixture();
        run(&fx, false, false).unwrap();
        let again = run(&fx, false, false).unwrap();
        assert_eq!(again.status, ArchiveStatus::AlreadyArchived);
        assert!(again.copy.is_none());
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let fx = fixture();
        let result = run(&fx, true, true).unwrap();

        assert_eq!(result.status, ArchiveStatus::Planned);
        assert_eq!(result.bytes, 2048 + 5 + 2);
        assert!(!fx.backup.join("b50-b99").exists());
        assert!(source(&fx).is_dir());
    }

    #[test]
    fn test_force_deletes_after_confirmed_copy() {
        let fx = fixture();
        let result = run(&fx, true, false).unwrap();

        assert!(result.source_removed);
        assert!(!source(&fx).exists());
        assert_eq!(
            fs::read_to_string(fx.backup.join("b50-b99/b65-sample/notes.md")).unwrap(),
            "notes"
        );
    }

    #[test]
    fn test_failed_copy_never_deletes_source() {
        let fx = fixture();
        // A regular file where the bucket folder should be.
        fs::write(fx.backup.join("b50-b99"), "not a directory").unwrap();

        let result = run(&fx, true, false);

        assert!(matches!(result, Err(ArchiveError::CopyIncomplete { .. })));
        assert!(source(&fx).join("recording.mp4").is_file());
    }

    #[test]
    fn test_force_on_stale_backup_keeps_source() {
        let fx = fixture();
        let stale = fx.backup.join("b50-b99/b65-sample");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("notes.md"), "old").unwrap();

        let result = run(&fx, true, false);

        assert!(matches!(
            result,
            Err(ArchiveError::NotVerified { outstanding: 2, .. })
        ));
        assert!(source(&fx).is_dir());
    }

    fn only_excluded_files(fx: &Fixture) {
        let src = source(fx);
        fs::remove_file(src.join("recording.mp4")).unwrap();
        fs::remove_file(src.join("notes.md")).unwrap();
    }

    #[test]
    fn test_project_with_only_excluded_files_creates_destination() {
        let fx = fixture();
        only_excluded_files(&fx);

        let result = run(&fx, false, false).unwrap();
        assert_eq!(result.status, ArchiveStatus::Copied);
        assert!(result.destination.is_dir());
        assert!(!result.destination.join("node_modules").exists());

        let forced = run(&fx, true, false).unwrap();
        assert_eq!(forced.status, ArchiveStatus::AlreadyArchived);
        assert!(forced.source_removed);
        assert!(!source(&fx).exists());
    }

    #[test]
    fn test_empty_project_is_archived_and_removed() {
        let fx = fixture();
        fs::remove_dir_all(source(&fx)).unwrap();
        fs::create_dir(source(&fx)).unwrap();

        let result = run(&fx, true, false).unwrap();
        assert_eq!(result.status, ArchiveStatus::Copied);
        assert_eq!(result.bytes, 0);
        assert!(fx.backup.join("b50-b99/b65-sample").is_dir());
        assert!(result.source_removed);
    }

    #[test]
    fn test_unmounted_backup_is_a_hard_stop() {
        let mut fx = fixture();
        fx.profile.backup_root = Some(Path::new("/Volumes/absent-dam-test").to_path_buf());
        assert!(matches!(
            run(&fx, false, false),
            Err(ArchiveError::Sync(SyncError::TierUnavailable { .. }))
        ));
    }

    #[test]
    fn test_missing_working_directory_is_a_hard_stop() {
        let mut fx = fixture();
        fx.profile.video_projects = fx.backup.join("no-such-working-dir");
        assert!(matches!(
            run(&fx, false, false),
            Err(ArchiveError::Sync(SyncError::TierUnavailable {
                tier: Tier::LocalFlat,
                ..
            }))
        ));
    }

    #[test]
    fn test_missing_project_and_missing_backup_config() {
        let mut fx = fixture();
        assert!(matches!(
            archive_project(
                &fx.profile,
                &ExclusionPolicy::default(),
                "b99-nope",
                ArchiveOptions::default()
            ),
            Err(ArchiveError::SourceMissing(_))
        ));

        fx.profile.backup_root = None;
        assert!(matches!(
            run(&fx, false, false),
            Err(ArchiveError::NoBackupConfigured { .. })
        ));
    }
}
