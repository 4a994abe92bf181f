//! Git remote URL validation
//!
//! Accepts `scheme://host/path[.git]` (http, https, git, ssh) and scp-style
//! `user@host:path[.git]` remotes, and derives the organization and
//! repository name used by the CI templates.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

const SUPPORTED_SCHEMES: [&str; 4] = ["http", "https", "git", "ssh"];

static SCHEME_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.-]*)://(?:[^@/]+@)?(?P<host>[^/:]*)(?::\d+)?(?P<path>/.*)?$",
    )
    .unwrap_or_else(|e| panic!("invalid scheme url pattern: {e}"))
});

static SCP_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]+@(?P<host>[A-Za-z0-9.-]*):(?P<path>[^/].*)?$")
        .unwrap_or_else(|e| panic!("invalid scp url pattern: {e}"))
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Repository URL cannot be empty")]
    Empty,
    #[error("Repository URL must include a scheme (http://, https://, or git@)")]
    MissingScheme,
    #[error("Invalid URL scheme '{0}'. Must be one of: http, https, git, ssh or git@ format")]
    UnsupportedScheme(String),
    #[error("Repository URL has an empty host")]
    EmptyHost,
    #[error("Repository URL has no repository path")]
    EmptyPath,
}

/// A validated git remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryUrl {
    pub raw: String,
    pub host: String,
    /// Second to last path segment, e.g. `example` in `github.com/example/repo`
    pub organization: Option<String>,
    /// Last path segment without the `.git` suffix
    pub name: String,
}

impl RepositoryUrl {
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(UrlError::Empty);
        }

        let (host, path) = if let Some(caps) = SCHEME_URL.captures(raw) {
            let scheme = caps["scheme"].to_ascii_lowercase();
            if !SUPPORTED_SCHEMES.contains(&scheme.as_str()) {
                return Err(UrlError::UnsupportedScheme(scheme));
            }
            (
                caps["host"].to_string(),
                caps.name("path").map(|m| m.as_str()).unwrap_or_default().to_string(),
            )
        } else if let Some(caps) = SCP_URL.captures(raw) {
            (
                caps["host"].to_string(),
                caps.name("path").map(|m| m.as_str()).unwrap_or_default().to_string(),
            )
        } else {
            return Err(UrlError::MissingScheme);
        };

        if host.is_empty() {
            return Err(UrlError::EmptyHost);
        }

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let name = segments
            .last()
            .map(|s| s.strip_suffix(".git").unwrap_or(s))
            .filter(|s| !s.is_empty())
            .ok_or(UrlError::EmptyPath)?
            .to_string();
        let organization = segments
            .len()
            .checked_sub(2)
            .map(|idx| segments[idx].to_string());

        Ok(Self {
            raw: raw.to_string(),
            host,
            organization,
            name,
        })
    }
}
