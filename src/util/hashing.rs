//! Canonical hashing helpers for stable fingerprints.
//!
//! Provides canonical encodings for byte fields, strings, integers and flags
//! used by manifest fingerprint construction.

use sha2::{Digest, Sha256};

/// Hashes a byte field with an explicit length prefix.
///
/// Length-prefixing avoids delimiter ambiguities (for example embedded `|` or
/// newlines) that can otherwise make distinct data serialize to identical byte
/// streams before hashing.
pub(crate) fn hash_field(hasher: &mut Sha256, bytes: &[u8]) {
    let len = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    hasher.update(len.to_be_bytes());
    hasher.update(bytes);
}

pub(crate) fn hash_str_field(hasher: &mut Sha256, value: &str) {
    hash_field(hasher, value.as_bytes());
}

/// Hashes an optional string, distinguishing `None` from `Some("")`.
pub(crate) fn hash_opt_str_field(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update([1u8]);
            hash_str_field(hasher, v);
        }
        None => hasher.update([0u8]),
    }
}

/// Hashes a fixed-width integer field.
pub(crate) fn hash_u64_field(hasher: &mut Sha256, value: u64) {
    hasher.update(value.to_be_bytes());
}

pub(crate) fn hash_bool_field(hasher: &mut Sha256, value: bool) {
    hasher.update([u8::from(value)]);
}
