//! Expands short project hints into full project identifiers.

use crate::config::BrandProfile;
use crate::dir_list::{DirListError, list_subdirectories};
use crate::fuzzy;
use glob::{MatchOptions, Pattern};
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Directory names under a brand root that are never projects.
pub const INFRASTRUCTURE_DIRS: &[&str] = &[
    "archived",
    "assets",
    "docs",
    "final",
    "node_modules",
    "s3-staging",
    ".git",
    ".github",
    ".idea",
    ".vscode",
];

static SHORT_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]\d{2}$").expect("static regex"));

#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error("Directory listing error: {0}")]
    DirList(#[from] DirListError),
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("No projects match '{pattern}' in {}", .dir.display())]
    NoMatches { pattern: String, dir: PathBuf },
    #[error("{}", format_not_found(.hint, .dir, .suggestions))]
    NotFound {
        hint: String,
        dir: PathBuf,
        suggestions: Vec<String>,
    },
    #[error("Invalid selection '{answer}' (expected a number from 1 to {max})")]
    InvalidSelection { answer: String, max: usize },
}

fn format_not_found(hint: &str, dir: &std::path::Path, suggestions: &[String]) -> String {
    let mut msg = format!("No project matching '{hint}' in {}", dir.display());
    if !suggestions.is_empty() {
        msg.push_str(&format!(". Did you mean: {}?", suggestions.join(", ")));
    }
    msg
}

/// Outcome of resolving a hint. Ambiguity is returned as data so the caller
/// decides how to ask the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Single(String),
    /// Every match of a wildcard pattern.
    Many(Vec<String>),
    /// A short code matched several projects; exactly one must be chosen.
    Ambiguous(Vec<String>),
}

pub fn is_wildcard(hint: &str) -> bool {
    hint.contains(['*', '?', '['])
}

fn is_project_name(name: &str) -> bool {
    !name.starts_with('.') && !INFRASTRUCTURE_DIRS.contains(&name)
}

/// Sorted flat projects of a brand, infrastructure folders excluded.
pub fn list_projects(profile: &BrandProfile) -> Result<Vec<String>, LocateError> {
    Ok(list_subdirectories(&profile.project_dir())?
        .into_iter()
        .filter(|name| is_project_name(name))
        .collect())
}

pub fn resolve(profile: &BrandProfile, hint: &str) -> Result<Resolution, LocateError> {
    let hint = hint.trim();

    if is_wildcard(hint) {
        return resolve_pattern(profile, hint).map(Resolution::Many);
    }

    let dir = profile.project_dir();
    if is_project_name(hint) && dir.join(hint).is_dir() {
        return Ok(Resolution::Single(hint.to_string()));
    }

    if !SHORT_CODE.is_match(hint) {
        return Ok(Resolution::Single(hint.to_string()));
    }

    let projects = list_projects(profile)?;
    let prefix = format!("{hint}-");
    let matches: Vec<String> = projects
        .iter()
        .filter(|p| p.starts_with(&prefix))
        .cloned()
        .collect();

    match matches.len() {
        0 => Err(LocateError::NotFound {
            hint: hint.to_string(),
            dir,
            suggestions: short_code_suggestions(hint, &projects),
        }),
        1 => Ok(Resolution::Single(matches.into_iter().next().unwrap_or_default())),
        _ => Ok(Resolution::Ambiguous(matches)),
    }
}

/// Case-sensitive glob over the brand's projects. Fails if nothing matches.
pub fn resolve_pattern(profile: &BrandProfile, pattern: &str) -> Result<Vec<String>, LocateError> {
    let compiled = Pattern::new(pattern).map_err(|e| LocateError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.msg.to_string(),
    })?;

    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let matches: Vec<String> = list_projects(profile)?
        .into_iter()
        .filter(|name| compiled.matches_with(name, options))
        .collect();

    if matches.is_empty() {
        return Err(LocateError::NoMatches {
            pattern: pattern.to_string(),
            dir: profile.project_dir(),
        });
    }

    Ok(matches)
}

/// Validates a 1-based numeric choice among `candidates`.
pub fn select(candidates: &[String], answer: &str) -> Result<String, LocateError> {
    let invalid = || LocateError::InvalidSelection {
        answer: answer.trim().to_string(),
        max: candidates.len(),
    };

    let index: usize = answer.trim().parse().map_err(|_| invalid())?;
    if index == 0 {
        return Err(invalid());
    }
    candidates.get(index - 1).cloned().ok_or_else(invalid)
}

/// Suggest projects whose code part is close to the short code.
fn short_code_suggestions(hint: &str, projects: &[String]) -> Vec<String> {
    let codes: Vec<&str> = projects
        .iter()
        .filter_map(|p| p.split_once('-').map(|(code, _)| code))
        .collect();
    let close_codes = fuzzy::suggestions(hint, codes, 1);

    projects
        .iter()
        .filter(|p| {
            p.split_once('-')
                .is_some_and(|(code, _)| close_codes.iter().any(|c| c == code))
        })
        .take(5)
        .cloned()
        .collect()
}
