//! Rebuilds the cross-tier manifest of a brand from a full scan.
//!
//! The scan never modifies any tier. Problems that a human has to look at
//! (odd identifiers, projects in unexpected buckets, archived projects that
//! collide with the active range) are collected as warnings instead of
//! failing the scan.

use crate::bucket::{self, IdentifierKind, bucket_bounds, bucket_for, is_bucket_name};
use crate::config::BrandProfile;
use crate::dir_list::{self, DirListError, extension_of, has_file_matching, list_subdirectories};
use crate::locator::{self, INFRASTRUCTURE_DIRS, LocateError};
use crate::manifest_file::{
    DiskUsage, LocalStorage, Manifest, ManifestConfig, ManifestEntry, ManifestFileError,
    ProjectType, SsdStorage, StagingStorage, Storage, Structure, UsageTotals,
};
use crate::sync::remote::STAGING_DIR;
use chrono::{SecondsFormat, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// Marker file identifying a storyline project.
pub const STORYLINE_MARKER: &str = "data/source.json";
pub const HEAVY_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm", "m4v"];
pub const LIGHT_EXTENSIONS: &[&str] = &[
    "srt", "vtt", "txt", "md", "json", "yml", "yaml", "jpg", "jpeg", "png", "webp",
];

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Directory listing error: {0}")]
    DirList(#[from] DirListError),
    #[error("Project lookup error: {0}")]
    Locate(#[from] LocateError),
    #[error("Manifest file error: {0}")]
    File(#[from] ManifestFileError),
}

/// A freshly generated manifest plus the warnings found while building it.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub manifest: Manifest,
    pub warnings: Vec<String>,
}

pub fn is_heavy(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| HEAVY_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_light(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| LIGHT_EXTENSIONS.contains(&ext.as_str()))
}

/// Where one project was found on the backup tier.
struct BackupHit {
    relative: String,
    misplaced_in: Option<String>,
}

pub fn generate(profile: &BrandProfile) -> Result<Reconciliation, ManifestError> {
    let mut warnings = Vec::new();
    let backup_root = mounted_backup_root(profile, &mut warnings);

    let candidates = candidate_ids(profile, backup_root)?;
    debug!("{} candidate projects for {}", candidates.len(), profile.key);

    let mut projects = Vec::with_capacity(candidates.len());
    let mut local_bytes = 0u64;
    let mut ssd_bytes = 0u64;

    for id in &candidates {
        let bucket = bucket_for(id);
        let flat_dir = profile.project_dir().join(id);
        let archived_dir = profile.archived_dir().join(&bucket).join(id);
        let flat = flat_dir.is_dir();
        let archived = archived_dir.is_dir();

        let backup = match backup_root {
            Some(root) => find_in_backup(root, id, &bucket)?,
            None => None,
        };
        if let Some(hit) = &backup
            && let Some(found_in) = &hit.misplaced_in
        {
            warnings.push(format!(
                "{id}: backup found in bucket {found_in}, expected {bucket} (migrate it)"
            ));
        }

        let local_dir = if flat {
            Some(&flat_dir)
        } else if archived {
            Some(&archived_dir)
        } else {
            None
        };

        let staging = [&flat_dir, &archived_dir]
            .iter()
            .any(|dir| dir.join(STAGING_DIR).is_dir());

        let type_dir = local_dir.cloned().or_else(|| {
            backup_root
                .zip(backup.as_ref())
                .map(|(root, hit)| root.join(&hit.relative))
        });

        for dir in [flat.then_some(&flat_dir), archived.then_some(&archived_dir)]
            .into_iter()
            .flatten()
        {
            local_bytes = local_bytes.saturating_add(sized(dir, &mut warnings));
        }
        if let (Some(root), Some(hit)) = (backup_root, &backup) {
            ssd_bytes = ssd_bytes.saturating_add(sized(&root.join(&hit.relative), &mut warnings));
        }

        projects.push(ManifestEntry {
            id: id.clone(),
            project_type: project_type(id, type_dir.as_deref()),
            storage: Storage {
                local: LocalStorage {
                    exists: flat || archived,
                    structure: if flat {
                        Some(Structure::Flat)
                    } else if archived {
                        Some(Structure::Archived)
                    } else {
                        None
                    },
                    has_heavy_files: local_dir
                        .is_some_and(|dir| has_file_matching(dir, false, is_heavy)),
                    has_light_files: local_dir
                        .is_some_and(|dir| has_file_matching(dir, true, is_light)),
                },
                ssd: SsdStorage {
                    exists: backup.is_some(),
                    path: backup.map(|hit| hit.relative),
                },
                staging: StagingStorage { exists: staging },
            },
        });
    }

    warnings.extend(candidates.iter().filter_map(|id| bucket::format_warning(id)));
    warnings.extend(range_overlap_warnings(&projects));

    let manifest = Manifest {
        config: ManifestConfig {
            brand: profile.key.clone(),
            local_base: profile.video_projects.clone(),
            ssd_base: profile.backup_root.clone(),
            last_updated: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            disk_usage: DiskUsage {
                local: UsageTotals::from_bytes(local_bytes),
                ssd: UsageTotals::from_bytes(ssd_bytes),
            },
        },
        projects,
    };

    Ok(Reconciliation { manifest, warnings })
}

/// Generates the manifest and, unless `dry_run`, replaces the brand's
/// manifest file with it.
pub fn regenerate(profile: &BrandProfile, dry_run: bool) -> Result<Reconciliation, ManifestError> {
    let reconciliation = generate(profile)?;
    for warning in &reconciliation.warnings {
        warn!("{}", warning);
    }

    let path = profile.manifest_path();
    if dry_run {
        info!("Dry run: not writing {}", path.display());
    } else {
        reconciliation.manifest.save(&path)?;
        info!(
            "Wrote {} ({} projects)",
            path.display(),
            reconciliation.manifest.projects.len()
        );
    }
    Ok(reconciliation)
}

fn mounted_backup_root<'a>(
    profile: &'a BrandProfile,
    warnings: &mut Vec<String>,
) -> Option<&'a Path> {
    let root = profile.backup_root.as_deref()?;
    if root.is_dir() {
        Some(root)
    } else {
        warnings.push(format!(
            "Backup root {} is not mounted; backup state not scanned",
            root.display()
        ));
        None
    }
}

fn is_candidate_name(name: &str) -> bool {
    !name.starts_with('.') && !INFRASTRUCTURE_DIRS.contains(&name)
}

/// Union of project names found on the backup, flat and archived tiers.
fn candidate_ids(
    profile: &BrandProfile,
    backup_root: Option<&Path>,
) -> Result<BTreeSet<String>, ManifestError> {
    let mut ids = BTreeSet::new();

    if let Some(root) = backup_root {
        for name in list_subdirectories(root)? {
            if is_bucket_name(&name) {
                ids.extend(
                    list_subdirectories(&root.join(&name))?
                        .into_iter()
                        .filter(|n| is_candidate_name(n)),
                );
            } else if is_candidate_name(&name) {
                ids.insert(name);
            }
        }
    }

    ids.extend(locator::list_projects(profile)?);

    let archived = profile.archived_dir();
    for bucket in list_subdirectories(&archived)? {
        if bucket.starts_with('.') {
            continue;
        }
        ids.extend(
            list_subdirectories(&archived.join(&bucket))?
                .into_iter()
                .filter(|n| is_candidate_name(n)),
        );
    }

    Ok(ids)
}

/// Flat backup path, then the computed bucket, then every other bucket.
fn find_in_backup(root: &Path, id: &str, bucket: &str) -> Result<Option<BackupHit>, ManifestError> {
    if !is_bucket_name(id) && root.join(id).is_dir() {
        return Ok(Some(BackupHit {
            relative: id.to_string(),
            misplaced_in: None,
        }));
    }

    if root.join(bucket).join(id).is_dir() {
        return Ok(Some(BackupHit {
            relative: format!("{bucket}/{id}"),
            misplaced_in: None,
        }));
    }

    for other in list_subdirectories(root)? {
        if other != bucket && is_bucket_name(&other) && root.join(&other).join(id).is_dir() {
            return Ok(Some(BackupHit {
                relative: format!("{other}/{id}"),
                misplaced_in: Some(other),
            }));
        }
    }

    Ok(None)
}

fn project_type(id: &str, dir: Option<&Path>) -> ProjectType {
    if dir.is_some_and(|d| d.join(STORYLINE_MARKER).is_file()) {
        return ProjectType::Storyline;
    }
    match bucket::classify(id) {
        IdentifierKind::Coded => ProjectType::Flivideo,
        IdentifierKind::Legacy => ProjectType::Ecamm,
        IdentifierKind::FreeForm => ProjectType::General,
    }
}

fn sized(dir: &Path, warnings: &mut Vec<String>) -> u64 {
    dir_list::tree_size(dir).unwrap_or_else(|e| {
        warnings.push(format!("Cannot size {}: {}", dir.display(), e));
        0
    })
}

/// Archived projects whose bucket overlaps the range of projects still in
/// the flat tier for the same letter.
fn range_overlap_warnings(projects: &[ManifestEntry]) -> Vec<String> {
    let mut active: BTreeMap<char, (u32, u32)> = BTreeMap::new();
    for entry in projects {
        if entry.storage.local.structure == Some(Structure::Flat)
            && let Some((letter, number)) = bucket::coded_parts(&entry.id)
        {
            let range = active.entry(letter).or_insert((number, number));
            range.0 = range.0.min(number);
            range.1 = range.1.max(number);
        }
    }

    projects
        .iter()
        .filter(|e| e.storage.local.structure == Some(Structure::Archived))
        .filter_map(|entry| {
            let bucket = bucket_for(&entry.id);
            let (letter, start, end) = bucket_bounds(&bucket)?;
            let (low, high) = *active.get(&letter)?;
            (start <= high && low <= end).then(|| {
                format!(
                    "{}: archived in {} which overlaps the active range {letter}{low:02}-{letter}{high:02}",
                    entry.id, bucket
                )
            })
        })
        .collect()
}
