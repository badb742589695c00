//! Brand identity resolution.
//!
//! Users refer to a brand by its config key (`appydave`), a shortcut (`ad`),
//! or the folder/display name (`v-appydave`). [`BrandResolver`] maps any of
//! these onto the canonical config key.

use crate::config::{BrandProfile, Config};
use crate::fuzzy;
use std::fmt;

const DISPLAY_PREFIX: &str = "v-";

/// Shortcuts that are not a simple prefix of the brand key.
const LEGACY_SHORTCUTS: &[(&str, &str)] = &[
    ("ad", "appydave"),
    ("joy", "beauty-and-joy"),
    ("ss", "supportsignal"),
];

#[derive(Debug, thiserror::Error)]
pub enum BrandError {
    #[error("{}", format_not_found(.input, .reason, .available, .suggestions))]
    NotFound {
        input: String,
        reason: NotFoundReason,
        available: Vec<String>,
        suggestions: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundReason {
    NotConfigured,
    /// The brand is configured but its working directory is missing.
    MissingDirectory(String),
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundReason::NotConfigured => write!(f, "no such brand is configured"),
            NotFoundReason::MissingDirectory(path) => {
                write!(f, "working directory does not exist: {path}")
            }
        }
    }
}

fn format_not_found(
    input: &str,
    reason: &NotFoundReason,
    available: &[String],
    suggestions: &[String],
) -> String {
    let mut msg = format!("Brand '{input}' not found ({reason})");
    if !suggestions.is_empty() {
        msg.push_str(&format!(". Did you mean: {}?", suggestions.join(", ")));
    }
    if available.is_empty() {
        msg.push_str(". No brands are configured");
    } else {
        msg.push_str(&format!(". Available brands: {}", available.join(", ")));
    }
    msg
}

pub struct BrandResolver<'a> {
    config: &'a Config,
}

impl<'a> BrandResolver<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Folder/display name for a brand, e.g. `ad` -> `v-appydave`.
    pub fn expand(&self, input: &str) -> String {
        format!("{DISPLAY_PREFIX}{}", self.to_config_key(input))
    }

    /// Strips the display prefix and lower-cases.
    pub fn normalize(name: &str) -> String {
        let lowered = name.trim().to_lowercase();
        match lowered.strip_prefix(DISPLAY_PREFIX) {
            Some(rest) => rest.to_string(),
            None => lowered,
        }
    }

    pub fn to_config_key(&self, input: &str) -> String {
        let key = Self::normalize(input);

        if self.config.brand(&key).is_some() {
            return key;
        }

        if let Some(brand) = self
            .config
            .brands()
            .find(|b| b.shortcuts.iter().any(|s| *s == key))
        {
            return brand.key.clone();
        }

        if let Some((_, target)) = LEGACY_SHORTCUTS.iter().find(|(short, _)| *short == key) {
            return (*target).to_string();
        }

        key
    }

    pub fn validate(&self, input: &str) -> Result<&'a BrandProfile, BrandError> {
        let key = self.to_config_key(input);

        let Some(brand) = self.config.brand(&key) else {
            return Err(self.not_found(input, NotFoundReason::NotConfigured));
        };

        if !brand.video_projects.is_dir() {
            return Err(self.not_found(
                input,
                NotFoundReason::MissingDirectory(brand.video_projects.display().to_string()),
            ));
        }

        Ok(brand)
    }

    pub fn exists(&self, input: &str) -> bool {
        self.validate(input).is_ok()
    }

    /// Sorted `key (shortcuts)` lines, one per configured brand.
    pub fn available(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .config
            .brands()
            .map(|b| {
                if b.shortcuts.is_empty() {
                    b.key.clone()
                } else {
                    format!("{} ({})", b.key, b.shortcuts.join(", "))
                }
            })
            .collect();
        lines.sort();
        lines
    }

    fn not_found(&self, input: &str, reason: NotFoundReason) -> BrandError {
        let normalized = Self::normalize(input);
        let candidates = self
            .config
            .brands()
            .flat_map(|b| std::iter::once(b.key.as_str()).chain(b.shortcuts.iter().map(String::as_str)));
        let suggestions = if reason == NotFoundReason::NotConfigured {
            fuzzy::suggestions(&normalized, candidates, fuzzy::DEFAULT_MAX_DISTANCE)
        } else {
            Vec::new()
        };

        BrandError::NotFound {
            input: input.to_string(),
            reason,
            available: self.available(),
            suggestions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_for(root: &std::path::Path) -> Config {
        let json = format!(
            r#"{{
                "brands": {{
                    "appydave": {{ "shortcut": "ad", "locations": {{ "video_projects": "{0}/v-appydave" }} }},
                    "voz": {{ "shortcut": "vz", "locations": {{ "video_projects": "{0}/v-voz" }} }},
                    "beauty-and-joy": {{ "locations": {{ "video_projects": "{0}/v-beauty-and-joy" }} }},
                    "ghost": {{ "locations": {{ "video_projects": "{0}/missing" }} }}
                }}
            }}"#,
            root.display()
        );
        Config::from_json(&json).unwrap()
    }

    fn fixture() -> (TempDir, Config) {
        let temp = TempDir::new().unwrap();
        for dir in ["v-appydave", "v-voz", "v-beauty-and-joy"] {
            std::fs::create_dir(temp.path().join(dir)).unwrap();
        }
        let config = config_for(temp.path());
        (temp, config)
    }

    #[test]
    fn test_normalize_strips_display_prefix() {
        assert_eq!(BrandResolver::normalize("v-AppyDave"), "appydave");
        assert_eq!(BrandResolver::normalize("  Voz "), "voz");
    }

    #[test]
    fn test_to_config_key_resolution_order() {
        let (_temp, config) = fixture();
        let resolver = BrandResolver::new(&config);

        assert_eq!(resolver.to_config_key("appydave"), "appydave");
        assert_eq!(resolver.to_config_key("V-APPYDAVE"), "appydave");
        assert_eq!(resolver.to_config_key("VZ"), "voz");
        assert_eq!(resolver.to_config_key("joy"), "beauty-and-joy");
        assert_eq!(resolver.to_config_key("Unknown"), "unknown");
    }

    #[test]
    fn test_expand() {
        let (_temp, config) = fixture();
        let resolver = BrandResolver::new(&config);
        assert_eq!(resolver.expand("ad"), "v-appydave");
        assert_eq!(resolver.expand("v-voz"), "v-voz");
    }

    #[test]
    fn test_validate_success() {
        let (_temp, config) = fixture();
        let resolver = BrandResolver::new(&config);
        let brand = resolver.validate("ad").unwrap();
        assert_eq!(brand.key, "appydave");
        assert!(resolver.exists("voz"));
    }

    #[test]
    fn test_validate_unknown_lists_brands_and_suggests() {
        let (_temp, config) = fixture();
        let resolver = BrandResolver::new(&config);

        let err = resolver.validate("appydav").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'appydav'"));
        assert!(msg.contains("Did you mean: appydave"));
        assert!(msg.contains(
            "Available brands: appydave (ad), beauty-and-joy, ghost, voz (vz)"
        ));
        assert!(!resolver.exists("appydav"));
    }

    #[test]
    fn test_validate_missing_directory() {
        let (_temp, config) = fixture();
        let resolver = BrandResolver::new(&config);

        match resolver.validate("ghost") {
            Err(BrandError::NotFound {
                input,
                reason: NotFoundReason::MissingDirectory(_),
                available,
                ..
            }) => {
                assert_eq!(input, "ghost");
                assert_eq!(available.len(), 4);
            }
            other => panic!("Expected MissingDirectory, got {:?}", other.map(|b| &b.key)),
        }
    }
}
