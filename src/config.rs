//! Brand configuration.
//!
//! The configuration document is JSON keyed by brand. It is parsed into raw
//! serde structs and then validated eagerly into [`BrandProfile`] values, so
//! every other module works with fully-resolved paths and never has to
//! re-check optional fields.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const CONFIG_ENV: &str = "DAM_CONFIG";
const UNSET_MARKER: &str = "NOT-SET";
const MIB: u64 = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Config file not found: {0} (create it, pass --config, or set DAM_CONFIG)")]
    NotFound(PathBuf),
    #[error("JSON parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Brand '{brand}' is invalid: {reason}")]
    InvalidBrand { brand: String, reason: String },
    #[error("Could not determine a default config location (no config directory)")]
    NoConfigDir,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    brands: BTreeMap<String, RawBrand>,
    #[serde(default)]
    transfer: RawTransfer,
}

#[derive(Debug, Deserialize)]
struct RawBrand {
    name: Option<String>,
    #[serde(alias = "shortcuts")]
    shortcut: Option<OneOrMany>,
    locations: RawLocations,
    #[serde(alias = "object_store")]
    aws: Option<RawObjectStore>,
    #[serde(default)]
    settings: RawSettings,
}

#[derive(Debug, Deserialize)]
struct RawLocations {
    video_projects: Option<String>,
    #[serde(alias = "backup")]
    ssd_backup: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawObjectStore {
    profile: Option<String>,
    region: Option<String>,
    #[serde(alias = "bucket")]
    s3_bucket: Option<String>,
    #[serde(alias = "key_prefix")]
    s3_prefix: Option<String>,
    endpoint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    projects_subfolder: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTransfer {
    multipart_threshold_mb: Option<u64>,
    part_size_mb: Option<u64>,
    #[serde(default)]
    exclude: Vec<String>,
}

/// Where a brand's staging objects live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStoreTarget {
    pub bucket: String,
    /// Always empty or ending in `/`.
    pub key_prefix: String,
    pub profile: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandProfile {
    pub key: String,
    pub name: String,
    pub shortcuts: Vec<String>,
    /// Hot working directory (the brand root).
    pub video_projects: PathBuf,
    pub backup_root: Option<PathBuf>,
    pub object_store: Option<ObjectStoreTarget>,
    pub projects_subfolder: Option<String>,
}

impl BrandProfile {
    /// Directory holding the brand's flat (hot) projects.
    pub fn project_dir(&self) -> PathBuf {
        match &self.projects_subfolder {
            Some(sub) => self.video_projects.join(sub),
            None => self.video_projects.clone(),
        }
    }

    pub fn archived_dir(&self) -> PathBuf {
        self.video_projects.join("archived")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.video_projects.join("projects.json")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSettings {
    /// Files strictly larger than this go through the multipart path.
    pub multipart_threshold: u64,
    pub part_size: u64,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            multipart_threshold: 100 * MIB,
            part_size: 8 * MIB,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    brands: BTreeMap<String, BrandProfile>,
    pub transfer: TransferSettings,
    /// Exclusion patterns added to the built-in list.
    pub extra_exclusions: Vec<String>,
}

impl Config {
    /// Resolve the config path from an explicit flag, `DAM_CONFIG`, or the
    /// platform config directory.
    pub fn locate(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        if let Ok(v) = std::env::var(CONFIG_ENV)
            && !v.trim().is_empty()
        {
            return Ok(expand_home(v.trim()));
        }
        dirs::config_dir()
            .map(|d| d.join("dam").join("brands.json"))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        Self::from_json(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            source: e,
        })?;

        let mut brands = BTreeMap::new();
        for (key, raw_brand) in raw.brands {
            let profile = validate_brand(&key, raw_brand)?;
            if brands.contains_key(&profile.key) {
                return Err(ConfigError::InvalidBrand {
                    brand: key,
                    reason: format!(
                        "duplicates brand '{}' (keys are case-insensitive)",
                        profile.key
                    ),
                });
            }
            brands.insert(profile.key.clone(), profile);
        }

        let defaults = TransferSettings::default();
        let transfer = TransferSettings {
            multipart_threshold: raw
                .transfer
                .multipart_threshold_mb
                .map(|mb| mb.saturating_mul(MIB))
                .unwrap_or(defaults.multipart_threshold),
            part_size: raw
                .transfer
                .part_size_mb
                .map(|mb| mb.max(5).saturating_mul(MIB))
                .unwrap_or(defaults.part_size),
        };

        Ok(Config {
            brands,
            transfer,
            extra_exclusions: raw.transfer.exclude,
        })
    }

    pub fn brand(&self, key: &str) -> Option<&BrandProfile> {
        self.brands.get(key)
    }

    /// Brands sorted by key.
    pub fn brands(&self) -> impl Iterator<Item = &BrandProfile> {
        self.brands.values()
    }
}

fn validate_brand(key: &str, raw: RawBrand) -> Result<BrandProfile, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidBrand {
        brand: key.to_string(),
        reason: reason.to_string(),
    };

    let normalized_key = key.trim().to_lowercase();
    if normalized_key.is_empty() {
        return Err(invalid("empty brand key"));
    }

    let video_projects = raw
        .locations
        .video_projects
        .as_deref()
        .and_then(non_placeholder)
        .map(expand_home)
        .ok_or_else(|| invalid("locations.video_projects is required"))?;

    let backup_root = raw
        .locations
        .ssd_backup
        .as_deref()
        .and_then(non_placeholder)
        .map(expand_home);

    let object_store = match raw.aws {
        Some(store) => match store.s3_bucket.as_deref().and_then(non_placeholder) {
            Some(bucket) => Some(ObjectStoreTarget {
                bucket: bucket.to_string(),
                key_prefix: normalize_prefix(store.s3_prefix.as_deref().unwrap_or("")),
                profile: store.profile.filter(|p| !p.trim().is_empty()),
                region: store.region.filter(|r| !r.trim().is_empty()),
                endpoint: store.endpoint.filter(|e| !e.trim().is_empty()),
            }),
            None => None,
        },
        None => None,
    };

    let shortcuts = raw
        .shortcut
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    let projects_subfolder = raw
        .settings
        .projects_subfolder
        .map(|s| s.trim().trim_matches('/').to_string())
        .filter(|s| !s.is_empty());

    if let Some(sub) = &projects_subfolder
        && Path::new(sub).components().count() != 1
    {
        return Err(invalid("settings.projects_subfolder must be a single folder name"));
    }

    Ok(BrandProfile {
        name: raw.name.unwrap_or_else(|| normalized_key.clone()),
        key: normalized_key,
        shortcuts,
        video_projects,
        backup_root,
        object_store,
        projects_subfolder,
    })
}

fn non_placeholder(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == UNSET_MARKER {
        None
    } else {
        Some(trimmed)
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "brands": {
            "appydave": {
                "name": "AppyDave",
                "shortcut": "ad",
                "locations": {
                    "video_projects": "/v/v-appydave",
                    "ssd_backup": "/ssd/appydave"
                },
                "aws": {
                    "profile": "appydave",
                    "region": "ap-southeast-1",
                    "s3_bucket": "video-projects",
                    "s3_prefix": "staging/v-appydave"
                },
                "settings": { "projects_subfolder": "" }
            },
            "Voz": {
                "shortcuts": ["vz", "VOZZY"],
                "locations": { "video_projects": "/v/v-voz", "ssd_backup": "NOT-SET" },
                "settings": { "projects_subfolder": "projects" }
            }
        },
        "transfer": { "multipart_threshold_mb": 50, "exclude": ["*.wav"] }
    }"#;

    #[test]
    fn test_parse_sample_config() {
        let config = Config::from_json(SAMPLE).unwrap();

        let ad = config.brand("appydave").unwrap();
        assert_eq!(ad.name, "AppyDave");
        assert_eq!(ad.shortcuts, vec!["ad"]);
        assert_eq!(ad.backup_root, Some(PathBuf::from("/ssd/appydave")));
        assert_eq!(ad.project_dir(), PathBuf::from("/v/v-appydave"));

        let store = ad.object_store.as_ref().unwrap();
        assert_eq!(store.key_prefix, "staging/v-appydave/");
        assert_eq!(store.profile.as_deref(), Some("appydave"));

        let voz = config.brand("voz").unwrap();
        assert_eq!(voz.name, "voz");
        assert_eq!(voz.shortcuts, vec!["vz", "vozzy"]);
        assert_eq!(voz.backup_root, None);
        assert!(voz.object_store.is_none());
        assert_eq!(voz.project_dir(), PathBuf::from("/v/v-voz/projects"));

        assert_eq!(config.transfer.multipart_threshold, 50 * MIB);
        assert_eq!(config.transfer.part_size, 8 * MIB);
        assert_eq!(config.extra_exclusions, vec!["*.wav"]);
    }

    #[test]
    fn test_brands_sorted_by_key() {
        let config = Config::from_json(SAMPLE).unwrap();
        let keys: Vec<_> = config.brands().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["appydave", "voz"]);
    }

    #[test]
    fn test_missing_video_projects_rejected_at_load() {
        let json = r#"{ "brands": { "x": { "locations": { "ssd_backup": "/ssd" } } } }"#;
        match Config::from_json(json) {
            Err(ConfigError::InvalidBrand { brand, reason }) => {
                assert_eq!(brand, "x");
                assert!(reason.contains("video_projects"));
            }
            other => panic!("Expected InvalidBrand, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_subfolder_rejected() {
        let json = r#"{ "brands": { "x": {
            "locations": { "video_projects": "/v" },
            "settings": { "projects_subfolder": "a/b" } } } }"#;
        assert!(matches!(
            Config::from_json(json),
            Err(ConfigError::InvalidBrand { .. })
        ));
    }

    #[test]
    fn test_keys_differing_only_in_case_rejected() {
        let json = r#"{ "brands": {
            "Voz": { "locations": { "video_projects": "/v/a" } },
            "voz": { "locations": { "video_projects": "/v/b" } } } }"#;
        match Config::from_json(json) {
            Err(ConfigError::InvalidBrand { reason, .. }) => {
                assert!(reason.contains("duplicates brand 'voz'"), "{reason}");
            }
            other => panic!("Expected InvalidBrand, got {:?}", other),
        }
    }

    #[test]
    fn test_huge_transfer_sizes_saturate() {
        let json = r#"{ "brands": {},
            "transfer": { "multipart_threshold_mb": 18446744073709551615,
                          "part_size_mb": 18446744073709551615 } }"#;
        let config = Config::from_json(json).unwrap();
        assert_eq!(config.transfer.multipart_threshold, u64::MAX);
        assert_eq!(config.transfer.part_size, u64::MAX);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            Config::from_json("{ not json"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("brands.json");
        assert!(matches!(Config::load(&path), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("staging/x"), "staging/x/");
        assert_eq!(normalize_prefix("/staging/x/"), "staging/x/");
    }
}
