//! One-way transfers between tiers.
//!
//! Every transfer walks its source through the shared exclusion policy,
//! skips files whose destination already matches, and records a per-file
//! [`Outcome`]. A failed file is recorded and the batch continues; only
//! tier-level problems abort before any per-file work.

pub mod local;
pub mod remote;

use crate::checksum::ChecksumError;
use crate::store::StoreError;
use crate::util::size::format_size;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// The working directory holding flat projects.
    LocalFlat,
    Backup,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::LocalFlat => "local",
            Tier::Backup => "backup",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("The {tier} tier is not available at {} (is the drive mounted?)", .path.display())]
    TierUnavailable { tier: Tier, path: PathBuf },
    #[error("Source directory does not exist: {0}")]
    SourceMissing(PathBuf),
    #[error("Refusing to delete without --force")]
    ForceRequired,
    #[error("Object store error: {0}")]
    Store(#[from] StoreError),
    #[error("Checksum error: {0}")]
    Checksum(#[from] ChecksumError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fails if the root of `tier` is not a reachable directory.
pub fn ensure_tier_available(tier: Tier, path: &Path) -> Result<(), SyncError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(SyncError::TierUnavailable {
            tier,
            path: path.to_path_buf(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Destination already matches.
    Skipped,
    /// Transferred, or would be in a dry run. Cleanup reports removals here.
    Transferred,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    /// Relative to the tree being transferred, `/`-separated.
    pub path: String,
    pub bytes: u64,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub dry_run: bool,
    pub files: Vec<FileOutcome>,
}

impl SyncReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            files: Vec::new(),
        }
    }

    pub fn record(&mut self, path: impl Into<String>, bytes: u64, outcome: Outcome) {
        self.files.push(FileOutcome {
            path: path.into(),
            bytes,
            outcome,
        });
    }

    pub fn transferred(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Transferred))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.files
            .iter()
            .filter(|f| f.outcome == Outcome::Transferred)
            .map(|f| f.bytes)
            .sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, Outcome::Failed(_)))
    }

    /// One-line summary, e.g. `3 transferred (1.2 MB), 2 skipped, 0 failed`.
    pub fn summary(&self, verb: &str) -> String {
        let prefix = if self.dry_run { "[dry run] " } else { "" };
        format!(
            "{}{} {} ({}), {} skipped, {} failed",
            prefix,
            self.transferred(),
            verb,
            format_size(self.bytes_transferred()),
            self.skipped(),
            self.failed()
        )
    }

    fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.files.iter().filter(|f| predicate(&f.outcome)).count()
    }
}

/// `/`-separated form of a relative path for reports and keys.
pub(crate) fn display_relative(relative: &Path) -> String {
    relative
        .iter()
        .map(|s| s.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
