//! The single exclusion policy applied before any transfer work.
//!
//! Every transfer path (archive copy, backup restore, object-store upload and
//! download) filters files through the same [`ExclusionPolicy`]. A file is
//! excluded if any segment of its relative path matches one of the patterns.

use glob::{MatchOptions, Pattern, PatternError};
use std::path::{Component, Path};

/// Dependency caches, VCS metadata, build output and OS metadata.
pub const DEFAULT_PATTERNS: &[&str] = &[
    "node_modules",
    ".git",
    ".svn",
    ".hg",
    ".next",
    ".nuxt",
    ".turbo",
    ".vercel",
    ".cache",
    ".parcel-cache",
    "__pycache__",
    ".venv",
    "dist",
    "build",
    "out",
    "coverage",
    "target",
    ".DS_Store",
    "._*",
    "Thumbs.db",
    "desktop.ini",
    "*.tmp",
    "*.swp",
];

const SEGMENT_MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
pub struct ExclusionPolicy {
    patterns: Vec<Pattern>,
}

impl ExclusionPolicy {
    pub fn new<'a, I>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let patterns = patterns
            .into_iter()
            .map(Pattern::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// The default patterns plus user-configured extras.
    pub fn with_extra(extra: &[String]) -> Result<Self, PatternError> {
        Self::new(
            DEFAULT_PATTERNS
                .iter()
                .copied()
                .chain(extra.iter().map(String::as_str)),
        )
    }

    /// Whether `relative` (relative to the tree being transferred) is excluded.
    pub fn is_excluded(&self, relative: &Path) -> bool {
        relative.components().any(|component| match component {
            Component::Normal(segment) => segment
                .to_str()
                .is_some_and(|s| self.matches_segment(s)),
            _ => false,
        })
    }

    /// Same check for `/`-separated object keys.
    pub fn is_excluded_key(&self, relative_key: &str) -> bool {
        relative_key
            .split('/')
            .filter(|s| !s.is_empty())
            .any(|s| self.matches_segment(s))
    }

    fn matches_segment(&self, segment: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_with(segment, SEGMENT_MATCH))
    }
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        let patterns = DEFAULT_PATTERNS
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect();
        Self { patterns }
    }
}
