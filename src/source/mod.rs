//! Source mode detection
//!
//! Decides whether a configured source is a JSON metadata endpoint or a
//! GitHub repository whose releases carry the updates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

use crate::fetch::error::FetchError;

/// Configured fetch strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SourceMode {
    /// Detect from the source URL
    #[default]
    Auto,
    Json,
    GitHubRelease,
}

impl SourceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceMode::Auto => "auto",
            SourceMode::Json => "json",
            SourceMode::GitHubRelease => "github_release",
        }
    }

    /// Parse a mode leniently: surrounding whitespace and case are ignored
    /// and unknown values fall back to `Auto`.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl FromStr for SourceMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(SourceMode::Auto),
            "json" => Ok(SourceMode::Json),
            "github_release" => Ok(SourceMode::GitHubRelease),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SourceMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SourceMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SourceMode::parse_lenient(&raw))
    }
}

/// Strategy actually used for a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedMode {
    Json,
    GitHubRelease,
}

/// Decide the fetch strategy for a source.
///
/// Explicit modes are honored unconditionally. In `Auto` mode only a GitHub
/// repository root (`https://github.com/{owner}/{repo}`) selects GitHub
/// Releases; every other URL, including non-root GitHub URLs and anything
/// ending in `.json`, selects JSON.
pub fn decide_mode(source_url: &str, explicit: SourceMode) -> ResolvedMode {
    match explicit {
        SourceMode::Json => ResolvedMode::Json,
        SourceMode::GitHubRelease => ResolvedMode::GitHubRelease,
        SourceMode::Auto if is_github_repo_root(source_url) => ResolvedMode::GitHubRelease,
        SourceMode::Auto => ResolvedMode::Json,
    }
}

/// Whether `url` names a static `.json` file (case-insensitive)
pub fn is_json_file(url: &str) -> bool {
    url.trim().to_ascii_lowercase().ends_with(".json")
}

/// Whether `url` is exactly a GitHub repository root
pub fn is_github_repo_root(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() || is_json_file(url) {
        return false;
    }
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if parsed.host_str() != Some("github.com") {
        return false;
    }

    let path = parsed.path().trim_matches('/');
    if path.is_empty() {
        return false;
    }
    let segments: Vec<&str> = path.split('/').collect();
    segments.len() == 2 && segments.iter().all(|s| !s.is_empty())
}

/// `owner/repo` pair of a GitHub repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GitHubRepo {
    pub owner: String,
    pub repo: String,
}

impl GitHubRepo {
    /// Extract the repository from a GitHub URL.
    ///
    /// The first two path segments name the repository, so an explicitly
    /// configured non-root URL such as `.../owner/repo/releases` still
    /// resolves to `owner/repo`.
    pub fn from_url(url: &str) -> Result<Self, FetchError> {
        let parsed = Url::parse(url.trim())
            .map_err(|e| FetchError::InvalidSource(format!("{url}: {e}")))?;

        let mut segments = parsed
            .path_segments()
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty());

        match (segments.next(), segments.next()) {
            (Some(owner), Some(repo)) => Ok(Self {
                owner: owner.to_string(),
                repo: repo.trim_end_matches(".git").to_string(),
            }),
            _ => Err(FetchError::InvalidSource(format!(
                "{url}: expected https://github.com/{{owner}}/{{repo}}"
            ))),
        }
    }

    /// `owner/repo`
    pub fn path(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for GitHubRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
