//! Range buckets for archived and backed-up projects.
//!
//! Coded identifiers (`b65-title`) are grouped 50 at a time per letter:
//! `b00-b49`, `b50-b99`, `b100-b149`, ... Everything else lands in a fixed
//! sentinel bucket. Buckets are only used for cold and backup placement,
//! never for the hot working tier.

use regex::Regex;
use std::sync::LazyLock;

pub const BUCKET_WIDTH: u32 = 50;
pub const SENTINEL_BUCKET: &str = "000-099";

static CODED_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z])(\d+)").expect("static regex"));
static CODED_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]\d{2}-[a-z0-9][a-z0-9-]*$").expect("static regex"));
static LEGACY_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+-?[a-z0-9][a-z0-9-]*$").expect("static regex"));
static FREE_FORM_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").expect("static regex"));
static BUCKET_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z])(\d+)-([a-z])(\d+)$").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// Letter, two digits, hyphen, slug.
    Coded,
    /// Digit-prefixed slug from before the coded scheme.
    Legacy,
    FreeForm,
}

/// Leading letter and number of a coded identifier, if it has one.
pub fn coded_parts(id: &str) -> Option<(char, u32)> {
    let caps = CODED_PREFIX.captures(id)?;
    let letter = caps[1].chars().next()?;
    let number = caps[2].parse().ok()?;
    Some((letter, number))
}

/// Bucket folder name for a project identifier. Never fails.
pub fn bucket_for(id: &str) -> String {
    match coded_parts(id) {
        Some((letter, number)) => {
            let start = number / BUCKET_WIDTH * BUCKET_WIDTH;
            let end = start + (BUCKET_WIDTH - 1);
            format!("{letter}{start:02}-{letter}{end:02}")
        }
        None => SENTINEL_BUCKET.to_string(),
    }
}

/// Parses a bucket name back into `(letter, start, end)`.
pub fn bucket_bounds(bucket: &str) -> Option<(char, u32, u32)> {
    let caps = BUCKET_NAME.captures(bucket)?;
    if caps[1] != caps[3] {
        return None;
    }
    let letter = caps[1].chars().next()?;
    let start: u32 = caps[2].parse().ok()?;
    let end: u32 = caps[4].parse().ok()?;
    (start <= end).then_some((letter, start, end))
}

/// Whether a backup/archive sub-directory name looks like a bucket folder.
pub fn is_bucket_name(name: &str) -> bool {
    name == SENTINEL_BUCKET || bucket_bounds(name).is_some()
}

pub fn classify(id: &str) -> IdentifierKind {
    if CODED_ID.is_match(id) {
        IdentifierKind::Coded
    } else if id.starts_with(|c: char| c.is_ascii_digit()) {
        IdentifierKind::Legacy
    } else {
        IdentifierKind::FreeForm
    }
}

/// A human-readable complaint if `id` fits neither naming convention.
pub fn format_warning(id: &str) -> Option<String> {
    if CODED_ID.is_match(id) || LEGACY_ID.is_match(id) {
        return None;
    }
    if coded_parts(id).is_some() {
        return Some(format!(
            "{id}: looks coded but does not match <letter><2 digits>-<slug>"
        ));
    }
    if FREE_FORM_ID.is_match(id) {
        return None;
    }
    Some(format!(
        "{id}: contains characters outside lowercase letters, digits and hyphens"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_for_coded() {
        assert_eq!(bucket_for("b40-x"), "b00-b49");
        assert_eq!(bucket_for("b00-first"), "b00-b49");
        assert_eq!(bucket_for("b49-last"), "b00-b49");
        assert_eq!(bucket_for("b50-x"), "b50-b99");
        assert_eq!(bucket_for("b65-sample"), "b50-b99");
        assert_eq!(bucket_for("a07-intro"), "a00-a49");
        assert_eq!(bucket_for("c123-long"), "c100-c149");
    }

    #[test]
    fn test_bucket_for_is_deterministic_within_range() {
        assert_eq!(bucket_for("b40-x"), bucket_for("b41-x"));
        assert_ne!(bucket_for("b65-x"), bucket_for("b40-x"));
    }

    #[test]
    fn test_bucket_for_malformed_uses_sentinel() {
        for id in ["", "legacy-project", "2019-recap", "B40-upper", "-b40", "b", "b99999999999999-x"]
        {
            assert_eq!(bucket_for(id), SENTINEL_BUCKET, "id {id:?}");
        }
    }

    #[test]
    fn test_bucket_bounds() {
        assert_eq!(bucket_bounds("b50-b99"), Some(('b', 50, 99)));
        assert_eq!(bucket_bounds("c100-c149"), Some(('c', 100, 149)));
        assert_eq!(bucket_bounds("b50-c99"), None);
        assert_eq!(bucket_bounds("b99-b50"), None);
        assert_eq!(bucket_bounds(SENTINEL_BUCKET), None);
        assert!(is_bucket_name(SENTINEL_BUCKET));
        assert!(is_bucket_name("a00-a49"));
        assert!(!is_bucket_name("b65-sample"));
    }

    #[test]
    fn test_bucket_round_trips_through_bounds() {
        for id in ["a01-x", "b65-y", "z149-z"] {
            let (letter, number) = coded_parts(id).unwrap();
            let (l, start, end) = bucket_bounds(&bucket_for(id)).unwrap();
            assert_eq!(l, letter);
            assert!(start <= number && number <= end);
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("b65-sample"), IdentifierKind::Coded);
        assert_eq!(classify("2019-recap"), IdentifierKind::Legacy);
        assert_eq!(classify("my-project"), IdentifierKind::FreeForm);
        assert_eq!(classify("b65"), IdentifierKind::FreeForm);
    }

    #[test]
    fn test_format_warning() {
        assert_eq!(format_warning("b65-sample"), None);
        assert_eq!(format_warning("2019-recap"), None);
        assert_eq!(format_warning("free-form"), None);
        assert!(format_warning("b6-short").is_some());
        assert!(format_warning("Has Spaces").is_some());
    }
}
