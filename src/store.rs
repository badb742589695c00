//! Object-store seam.
//!
//! The sync engine talks to staging storage only through [`ObjectStore`].
//! Keys follow `<key_prefix><project_id>/<relative path>` with `/`
//! separators; [`build_key`] and [`relative_from_key`] are inverses.

pub mod credentials;
pub mod dir;
pub mod s3;

use crate::checksum::ChecksumError;
use crate::config::BrandProfile;
use std::path::{Component, Path, PathBuf};
use tracing::info;

pub use dir::DirStore;
pub use s3::S3Store;

const FILE_URL_SCHEME: &str = "file://";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(
        "Brand '{brand}' has no object store configured (add an \"aws\" block with s3_bucket and s3_prefix)"
    )]
    NotConfigured { brand: String },
    #[error(
        "Credential profile '{profile}' is not configured in {}: {reason} (run `aws configure --profile {profile}`)",
        .path.display()
    )]
    ProfileNotConfigured {
        profile: String,
        path: PathBuf,
        reason: String,
    },
    #[error("Object store unreachable: {0}")]
    Unreachable(String),
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Checksum error: {0}")]
    Checksum(#[from] ChecksumError),
    #[error("Object store error: {0}")]
    Remote(#[from] opendal::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    /// Integrity token as reported by the store, quotes included if any.
    pub etag: Option<String>,
}

/// Blocking object-store operations used by the sync engine.
pub trait ObjectStore {
    fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StoreError>;

    /// Every object whose key starts with `prefix`.
    fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError>;

    /// Single-request upload.
    fn put(&self, key: &str, source: &Path) -> Result<(), StoreError>;

    /// Chunked upload in parts of `part_size` bytes.
    fn put_multipart(&self, key: &str, source: &Path, part_size: u64) -> Result<(), StoreError>;

    /// Downloads `key` to `dest`, returning the byte count.
    fn get(&self, key: &str, dest: &Path) -> Result<u64, StoreError>;

    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// `<key_prefix><project_id>/`
pub fn project_prefix(key_prefix: &str, project_id: &str) -> String {
    format!("{key_prefix}{project_id}/")
}

/// Object key for a file at `relative` inside a project's staging folder.
/// Returns `None` for paths that cannot round-trip (non-UTF-8, `..`,
/// absolute, empty).
pub fn build_key(key_prefix: &str, project_id: &str, relative: &Path) -> Option<String> {
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if segments.is_empty() {
        return None;
    }
    Some(format!(
        "{}{}",
        project_prefix(key_prefix, project_id),
        segments.join("/")
    ))
}

/// Inverse of [`build_key`]: the `/`-separated path below the project prefix.
pub fn relative_from_key(key_prefix: &str, project_id: &str, key: &str) -> Option<String> {
    let prefix = project_prefix(key_prefix, project_id);
    let rest = key.strip_prefix(&prefix)?;
    if rest.is_empty() || rest.ends_with('/') {
        return None;
    }
    Some(rest.to_string())
}

/// Converts a `/`-separated relative key into a path that stays below its
/// base directory.
pub fn relative_key_to_path(relative: &str) -> Option<PathBuf> {
    let mut path = PathBuf::new();
    for segment in relative.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
            return None;
        }
        path.push(segment);
    }
    (!path.as_os_str().is_empty()).then_some(path)
}

/// Opens the object store configured for `profile`. Fails before any
/// transfer work if the store or its credentials are not configured.
pub fn open(profile: &BrandProfile) -> Result<Box<dyn ObjectStore>, StoreError> {
    let target = profile
        .object_store
        .as_ref()
        .ok_or_else(|| StoreError::NotConfigured {
            brand: profile.key.clone(),
        })?;

    if let Some(root) = target.bucket.strip_prefix(FILE_URL_SCHEME) {
        let store = DirStore::new(Path::new(root))?;
        info!("Using directory store {}", store.describe());
        return Ok(Box::new(store));
    }

    let profile_name = target.profile.as_deref().unwrap_or("default");
    let credentials = credentials::load_profile(profile_name)?;
    let store = S3Store::new(target, &credentials)?;
    info!("Using object store {}", store.describe());
    Ok(Box::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_key_layout() {
        assert_eq!(
            build_key("staging/v-appydave/", "b65-sample", Path::new("clips/intro.mp4")),
            Some("staging/v-appydave/b65-sample/clips/intro.mp4".to_string())
        );
        assert_eq!(
            build_key("", "b65-sample", Path::new("a.srt")),
            Some("b65-sample/a.srt".to_string())
        );
    }

    #[test]
    fn test_key_round_trips() {
        for rel in ["a.mp4", "nested/dir/b.srt", "with space/c d.txt", "./x.json"] {
            let key = build_key("p/", "id", Path::new(rel)).unwrap();
            let back = relative_from_key("p/", "id", &key).unwrap();
            let expected: PathBuf = Path::new(rel)
                .components()
                .filter(|c| !matches!(c, Component::CurDir))
                .collect();
            assert_eq!(relative_key_to_path(&back).unwrap(), expected);
        }
        let key = build_key("p/", "id", Path::new("./x.json")).unwrap();
        assert_eq!(relative_from_key("p/", "id", &key).as_deref(), Some("x.json"));
    }

    #[test]
    fn test_build_key_rejects_escaping_paths() {
        assert_eq!(build_key("p/", "id", Path::new("../x")), None);
        assert_eq!(build_key("p/", "id", Path::new("/etc/passwd")), None);
        assert_eq!(build_key("p/", "id", Path::new("")), None);
    }

    #[test]
    fn test_relative_from_key_requires_project_prefix() {
        assert_eq!(relative_from_key("p/", "id", "p/other/a.mp4"), None);
        assert_eq!(relative_from_key("p/", "id", "p/id-longer/a.mp4"), None);
        assert_eq!(relative_from_key("p/", "id", "p/id/"), None);
        assert_eq!(relative_from_key("p/", "id", "p/id/sub/"), None);
    }

    #[test]
    fn test_relative_key_to_path_rejects_traversal() {
        assert_eq!(relative_key_to_path("a/../b"), None);
        assert_eq!(relative_key_to_path("a//b"), None);
        assert_eq!(relative_key_to_path(""), None);
        assert_eq!(relative_key_to_path("a/b"), Some(PathBuf::from("a/b")));
    }
}
