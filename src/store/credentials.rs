//! Static credentials from the AWS shared credentials file.

use super::StoreError;
use std::path::{Path, PathBuf};

const CREDENTIALS_ENV: &str = "AWS_SHARED_CREDENTIALS_FILE";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// `$AWS_SHARED_CREDENTIALS_FILE`, else `~/.aws/credentials`.
pub fn credentials_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CREDENTIALS_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    dirs::home_dir()
        .unwrap_or_default()
        .join(".aws")
        .join("credentials")
}

pub fn load_profile(profile: &str) -> Result<Credentials, StoreError> {
    load_profile_from(&credentials_path(), profile)
}

pub fn load_profile_from(path: &Path, profile: &str) -> Result<Credentials, StoreError> {
    let not_configured = |reason: &str| StoreError::ProfileNotConfigured {
        profile: profile.to_string(),
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(not_configured("credentials file not found"));
        }
        Err(e) => return Err(StoreError::Io(e)),
    };

    parse_profile(&content, profile).map_err(not_configured)
}

/// Extracts `profile` from INI-style credentials content.
pub fn parse_profile(content: &str, profile: &str) -> Result<Credentials, &'static str> {
    let mut in_profile = false;
    let mut found = false;
    let mut access_key_id = None;
    let mut secret_access_key = None;
    let mut session_token = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let section = section.trim();
            let section = section.strip_prefix("profile ").unwrap_or(section).trim();
            in_profile = section == profile;
            found |= in_profile;
            continue;
        }

        if !in_profile {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().to_string();
            match key.trim().to_ascii_lowercase().as_str() {
                "aws_access_key_id" => access_key_id = Some(value),
                "aws_secret_access_key" => secret_access_key = Some(value),
                "aws_session_token" => session_token = Some(value),
                _ => {}
            }
        }
    }

    if !found {
        return Err("profile not found");
    }

    match (access_key_id, secret_access_key) {
        (Some(access_key_id), Some(secret_access_key))
            if !access_key_id.is_empty() && !secret_access_key.is_empty() =>
        {
            Ok(Credentials {
                access_key_id,
                secret_access_key,
                session_token: session_token.filter(|t| !t.is_empty()),
            })
        }
        _ => Err("profile has no access key pair"),
    }
}
