use crate::util::hashing::{
    hash_bool_field, hash_opt_str_field, hash_str_field, hash_u64_field,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ManifestFileError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Manifest not found: {0} (run `dam manifest <brand>` first)")]
    NotFound(PathBuf),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ManifestFileError {
    fn from_io(e: std::io::Error, path: &Path) -> Self {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                ManifestFileError::PermissionDenied(path.to_path_buf())
            }
            std::io::ErrorKind::NotFound => ManifestFileError::NotFound(path.to_path_buf()),
            _ => ManifestFileError::Io(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    /// Carries the `data/source.json` marker.
    Storyline,
    /// Coded identifier.
    Flivideo,
    /// Digit-prefixed legacy identifier.
    Ecamm,
    General,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Storyline => "storyline",
            ProjectType::Flivideo => "flivideo",
            ProjectType::Ecamm => "ecamm",
            ProjectType::General => "general",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Structure {
    Flat,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalStorage {
    pub exists: bool,
    pub structure: Option<Structure>,
    pub has_heavy_files: bool,
    pub has_light_files: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsdStorage {
    pub exists: bool,
    /// Relative to the backup root, `/`-separated.
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingStorage {
    pub exists: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    pub local: LocalStorage,
    pub ssd: SsdStorage,
    #[serde(alias = "s3")]
    pub staging: StagingStorage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    pub storage: Storage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageTotals {
    pub total_bytes: u64,
    pub total_mb: f64,
    pub total_gb: f64,
}

impl UsageTotals {
    pub fn from_bytes(total_bytes: u64) -> Self {
        UsageTotals {
            total_bytes,
            total_mb: crate::util::size::to_mb(total_bytes),
            total_gb: crate::util::size::to_gb(total_bytes),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub local: UsageTotals,
    pub ssd: UsageTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestConfig {
    pub brand: String,
    pub local_base: PathBuf,
    pub ssd_base: Option<PathBuf>,
    /// RFC 3339, UTC.
    pub last_updated: String,
    pub disk_usage: DiskUsage,
}

/// Snapshot of where every project of a brand lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub config: ManifestConfig,
    pub projects: Vec<ManifestEntry>,
}

impl Manifest {
    #[cfg(test)]
    pub fn entry(&self, id: &str) -> Option<&ManifestEntry> {
        self.projects
            .binary_search_by(|e| e.id.as_str().cmp(id))
            .ok()
            .map(|i| &self.projects[i])
    }

    pub fn from_json(content: &str) -> Result<Self, ManifestFileError> {
        let mut manifest: Manifest = serde_json::from_str(content)?;
        manifest.projects.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(manifest)
    }

    pub fn to_json(&self) -> Result<String, ManifestFileError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestFileError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ManifestFileError::from_io(e, path))?;
        Self::from_json(&content)
    }

    /// Replaces the manifest at `path` atomically.
    ///
    /// Writes to a temporary file, fsyncs it, then atomically renames it into place.
    pub fn save(&self, path: &Path) -> Result<(), ManifestFileError> {
        use std::io::Write;

        let content = self.to_json()?;
        let parent = path.parent().unwrap_or(Path::new("."));

        let mut temp_file = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| ManifestFileError::from_io(e, parent))?;

        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| ManifestFileError::from_io(e, path))?;

        temp_file
            .as_file()
            .sync_all()
            .map_err(ManifestFileError::Io)?;

        temp_file
            .persist(path)
            .map_err(|e| ManifestFileError::from_io(e.error, path))?;

        Ok(())
    }

    /// Content fingerprint over everything except `last_updated`, so two
    /// reconciliations of unchanged tiers compare equal.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hash_str_field(&mut hasher, &self.config.brand);
        hash_str_field(&mut hasher, &self.config.local_base.to_string_lossy());
        hash_opt_str_field(
            &mut hasher,
            self.config
                .ssd_base
                .as_ref()
                .map(|p| p.to_string_lossy())
                .as_deref(),
        );
        hash_u64_field(&mut hasher, self.config.disk_usage.local.total_bytes);
        hash_u64_field(&mut hasher, self.config.disk_usage.ssd.total_bytes);

        hash_u64_field(&mut hasher, self.projects.len() as u64);
        for entry in &self.projects {
            let storage = &entry.storage;
            hash_str_field(&mut hasher, &entry.id);
            hash_str_field(&mut hasher, entry.project_type.as_str());
            hash_bool_field(&mut hasher, storage.local.exists);
            hash_opt_str_field(
                &mut hasher,
                storage.local.structure.map(|s| match s {
                    Structure::Flat => "flat",
                    Structure::Archived => "archived",
                }),
            );
            hash_bool_field(&mut hasher, storage.local.has_heavy_files);
            hash_bool_field(&mut hasher, storage.local.has_light_files);
            hash_bool_field(&mut hasher, storage.ssd.exists);
            hash_opt_str_field(&mut hasher, storage.ssd.path.as_deref());
            hash_bool_field(&mut hasher, storage.staging.exists);
        }

        base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
    }
}
