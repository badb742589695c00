//! Content digests compatible with object-store integrity tokens.
//!
//! S3-style stores report an ETag that is the hex MD5 of the object for a
//! single-part upload, and `md5(concat(md5(part_i)))-N` for an N-part
//! upload. [`etag_matches`] recomputes whichever form the remote reports.

use md5::{Digest, Md5};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

const BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("File modified during checksumming: {0}")]
    ConcurrentModification(PathBuf),
}

impl ChecksumError {
    fn from_io(e: std::io::Error, path: &Path) -> Self {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            ChecksumError::PermissionDenied(path.to_path_buf())
        } else {
            ChecksumError::Io(e)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    /// Hex encoded MD5 of the whole file.
    pub md5: String,
    /// Multipart ETag, only when one was requested and the file spans more
    /// than one part.
    pub multipart_etag: Option<String>,
    pub size: u64,
}

/// Streams `path` once, computing the whole-file MD5 and, when `part_size` is
/// given, the multipart ETag for that part size.
///
/// Returns `ConcurrentModification` if the file's mtime or size changed while
/// it was being read. The absence of that error is *not* a guarantee that the
/// file was not modified.
pub fn digest_file(path: &Path, part_size: Option<u64>) -> Result<FileDigest, ChecksumError> {
    debug!("Checksumming {}", path.display());

    let metadata_before = std::fs::metadata(path).map_err(|e| ChecksumError::from_io(e, path))?;
    let mtime_before = metadata_before.modified().map_err(ChecksumError::Io)?;

    let mut file = File::open(path).map_err(|e| ChecksumError::from_io(e, path))?;
    let mut whole = Md5::new();
    let mut part = Md5::new();
    let mut part_digests: Vec<u8> = Vec::new();
    let mut part_filled = 0u64;
    let mut parts = 0u64;
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(ChecksumError::Io)?;
        if bytes_read == 0 {
            break;
        }
        let chunk = &buffer[..bytes_read];
        whole.update(chunk);

        if let Some(part_size) = part_size.filter(|s| *s > 0) {
            let mut rest = chunk;
            while !rest.is_empty() {
                let room = usize::try_from(part_size - part_filled).unwrap_or(usize::MAX);
                let take = room.min(rest.len());
                part.update(&rest[..take]);
                part_filled += take as u64;
                rest = &rest[take..];
                if part_filled == part_size {
                    part_digests.extend_from_slice(&part.finalize_reset());
                    parts += 1;
                    part_filled = 0;
                }
            }
        }
    }

    if part_filled > 0 {
        part_digests.extend_from_slice(&part.finalize_reset());
        parts += 1;
    }

    let metadata_after = std::fs::metadata(path).map_err(ChecksumError::Io)?;
    let mtime_after = metadata_after.modified().map_err(ChecksumError::Io)?;

    if mtime_before != mtime_after || metadata_before.len() != metadata_after.len() {
        return Err(ChecksumError::ConcurrentModification(path.to_path_buf()));
    }

    let md5 = format!("{:x}", whole.finalize());
    let multipart_etag = (parts > 1).then(|| {
        let combined = Md5::digest(&part_digests);
        format!("{:x}-{}", combined, parts)
    });

    debug!("MD5 of {} is {}", path.display(), md5);

    Ok(FileDigest {
        md5,
        multipart_etag,
        size: metadata_after.len(),
    })
}

/// Strips the quotes S3 puts around ETags and lower-cases the hex.
pub fn normalize_etag(etag: &str) -> String {
    etag.trim().trim_matches('"').to_ascii_lowercase()
}

/// Whether the local file's content matches a remote ETag.
///
/// Multipart ETags are recomputed with `part_size`; an object uploaded with a
/// different part size therefore compares unequal and is transferred again.
pub fn etag_matches(path: &Path, etag: &str, part_size: u64) -> Result<bool, ChecksumError> {
    let etag = normalize_etag(etag);

    if etag.contains('-') {
        let digest = digest_file(path, Some(part_size))?;
        Ok(digest.multipart_etag.as_deref() == Some(etag.as_str()))
    } else {
        let digest = digest_file(path, None)?;
        Ok(digest.md5 == etag)
    }
}
