//! Remote update metadata and GitHub release payloads

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::component::VisualAssets;

/// Resolved description of the latest remote version
///
/// Field names follow the JSON metadata document served by update servers:
/// `slug, version, author, author_homepage, requires_php, requires, tested,
/// sections, last_updated, download_url, banners, icons`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMetadata {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub version: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub download_url: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub homepage: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub author: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub author_homepage: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tested: String,
    /// Minimum host (WordPress) version
    #[serde(default, alias = "min_wp_version", deserialize_with = "lenient_string")]
    pub requires: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub requires_php: String,
    #[serde(default, deserialize_with = "lenient_map")]
    pub sections: IndexMap<String, String>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub icons: IndexMap<String, String>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub banners: IndexMap<String, String>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub screenshots: IndexMap<String, String>,
    #[serde(default)]
    pub screenshot: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_updated: String,
}

impl UpdateMetadata {
    /// Fill branding fields the metadata leaves empty. Metadata always wins.
    pub fn fill_visual_assets(&mut self, assets: &VisualAssets) {
        if self.icons.is_empty() {
            self.icons = assets.icons.clone();
        }
        if self.banners.is_empty() {
            self.banners = assets.banners.clone();
        }
        if self.screenshots.is_empty() {
            self.screenshots = assets.screenshots.clone();
        }
        if self.screenshot.as_deref().is_none_or(str::is_empty)
            && assets.screenshot.as_deref().is_some_and(|s| !s.is_empty())
        {
            self.screenshot = assets.screenshot.clone();
        }
    }

    pub fn changelog(&self) -> &str {
        self.sections.get("changelog").map_or("", String::as_str)
    }
}

/// Asset attached to a GitHub release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubAsset {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub browser_download_url: String,
}

/// Subset of `GET /repos/{owner}/{repo}/releases/latest` used for updates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubReleasePayload {
    #[serde(default)]
    pub tag_name: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub assets: Vec<GitHubAsset>,
    #[serde(default)]
    pub zipball_url: Option<String>,
}

impl GitHubReleasePayload {
    /// Tag name when present and non-empty
    pub fn tag(&self) -> Option<&str> {
        self.tag_name.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Accept strings, numbers and booleans; anything else becomes empty.
///
/// Hand-written metadata files often carry `"tested": 6.4` as a number.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// Accept an object or an array (keyed by position); anything else is empty.
fn lenient_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<IndexMap<String, String>, D::Error> {
    let entries: Vec<(String, Value)> = match Value::deserialize(deserializer)? {
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| ((i + 1).to_string(), v))
            .collect(),
        _ => Vec::new(),
    };

    Ok(entries
        .into_iter()
        .filter_map(|(k, v)| match v {
            Value::String(s) => Some((k, s)),
            Value::Number(n) => Some((k, n.to_string())),
            _ => None,
        })
        .collect())
}
