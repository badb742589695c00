//! Object store backed by a local directory, selected with a `file://`
//! bucket. Object keys map to paths below the root.
//!
//! Objects written through `put_multipart` get a sidecar under
//! `<root>/.multipart/<key>` holding the part size, so their ETag has the
//! same `<md5>-<parts>` form an S3 multipart upload would report.

use super::{ObjectMeta, ObjectStore, StoreError, relative_key_to_path};
use crate::checksum::digest_file;
use crate::util::atomic;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

const PARTS_DIR: &str = ".multipart";

#[derive(Debug)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// The root must exist; a missing root means the store is unreachable.
    pub fn new(root: &Path) -> Result<Self, StoreError> {
        if !root.is_dir() {
            return Err(StoreError::Unreachable(root.display().to_string()));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        relative_key_to_path(key)
            .filter(|rel| !rel.starts_with(PARTS_DIR))
            .map(|rel| self.root.join(rel))
            .ok_or_else(|| StoreError::InvalidKey(key.to_string()))
    }

    fn sidecar_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        relative_key_to_path(key)
            .map(|rel| self.root.join(PARTS_DIR).join(rel))
            .ok_or_else(|| StoreError::InvalidKey(key.to_string()))
    }

    /// Part size the object was uploaded with, if it was a multipart upload.
    fn part_size(&self, key: &str) -> Result<Option<u64>, StoreError> {
        match std::fs::read_to_string(self.sidecar_path(key)?) {
            Ok(content) => Ok(content.trim().parse().ok()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove_sidecar(&self, key: &str) -> Result<(), StoreError> {
        let sidecar = self.sidecar_path(key)?;
        match std::fs::remove_file(&sidecar) {
            Ok(()) => {
                self.prune_empty_parents(&sidecar);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn meta_for(&self, key: &str, path: &Path) -> Result<ObjectMeta, StoreError> {
        let digest = digest_file(path, self.part_size(key)?)?;
        let etag = digest.multipart_etag.unwrap_or(digest.md5);
        Ok(ObjectMeta {
            key: key.to_string(),
            size: digest.size,
            etag: Some(format!("\"{etag}\"")),
        })
    }

    fn prune_empty_parents(&self, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir == self.root || std::fs::remove_dir(dir).is_err() {
                break;
            }
            current = dir.parent();
        }
    }
}

impl ObjectStore for DirStore {
    fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StoreError> {
        let path = self.object_path(key)?;
        if !path.is_file() {
            return Ok(None);
        }
        self.meta_for(key, &path).map(Some)
    }

    fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError> {
        let mut objects = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.path() != self.root.join(PARTS_DIR));
        for entry in walker {
            let entry = entry.map_err(|e| StoreError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let Some(key) = relative
                .iter()
                .map(|s| s.to_str())
                .collect::<Option<Vec<_>>>()
                .map(|segments| segments.join("/"))
            else {
                continue;
            };
            if key.starts_with(prefix) {
                objects.push(self.meta_for(&key, entry.path())?);
            }
        }
        Ok(objects)
    }

    fn put(&self, key: &str, source: &Path) -> Result<(), StoreError> {
        let dest = self.object_path(key)?;
        let written = atomic::copy_file(source, &dest)?;
        self.remove_sidecar(key)?;
        debug!("Stored {} ({} bytes)", key, written);
        Ok(())
    }

    fn put_multipart(&self, key: &str, source: &Path, part_size: u64) -> Result<(), StoreError> {
        let dest = self.object_path(key)?;
        let written = atomic::copy_file(source, &dest)?;
        let record = part_size.to_string();
        atomic::write_from_reader(&mut record.as_bytes(), &self.sidecar_path(key)?)?;
        debug!(
            "Stored {} ({} bytes, {} byte parts)",
            key, written, part_size
        );
        Ok(())
    }

    fn get(&self, key: &str, dest: &Path) -> Result<u64, StoreError> {
        let path = self.object_path(key)?;
        Ok(atomic::copy_file(&path, dest)?)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.object_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }
        self.prune_empty_parents(&path);
        self.remove_sidecar(key)
    }

    fn describe(&self) -> String {
        format!("file://{}", self.root.display())
    }
}
