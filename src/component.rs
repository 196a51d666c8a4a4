//! Tracked component identity and policy

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_CACHE_PREFIX;
use crate::source::SourceMode;

/// Whether the tracked component is a plugin or a theme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    #[default]
    Plugin,
    Theme,
}

/// Branding shown next to an update (icons, banners, screenshots)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualAssets {
    pub icons: IndexMap<String, String>,
    pub banners: IndexMap<String, String>,
    pub screenshots: IndexMap<String, String>,
    pub screenshot: Option<String>,
}

impl VisualAssets {
    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
            && self.banners.is_empty()
            && self.screenshots.is_empty()
            && self.screenshot.as_deref().is_none_or(str::is_empty)
    }
}

/// Identity and update policy of one tracked plugin or theme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentConfig {
    /// Unique key of the component; also the cache key suffix
    pub slug: String,
    #[serde(rename = "name", default)]
    pub display_name: String,
    #[serde(rename = "version", default)]
    pub installed_version: String,
    /// JSON metadata endpoint or GitHub repository URL
    #[serde(rename = "server", default)]
    pub source_url: String,
    #[serde(default)]
    pub mode: SourceMode,
    #[serde(default)]
    pub allow_prerelease: bool,
    /// GitHub token for private repositories and assets
    #[serde(rename = "githubToken", default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,
    #[serde(rename = "githubAssetName", default)]
    pub asset_name_override: Option<String>,
    #[serde(default)]
    pub kind: ComponentKind,
    /// Theme folder name when it differs from `slug`
    #[serde(default)]
    pub real_slug: Option<String>,
    /// License key sent to private JSON endpoints
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub success_ttl: Option<u64>,
    #[serde(default)]
    pub error_ttl: Option<u64>,
    #[serde(flatten)]
    pub assets: VisualAssets,
}

fn default_cache_prefix() -> String {
    DEFAULT_CACHE_PREFIX.to_string()
}

impl ComponentConfig {
    pub fn new(slug: &str, installed_version: &str, source_url: &str) -> Self {
        Self {
            slug: slug.to_string(),
            display_name: slug.to_string(),
            installed_version: installed_version.to_string(),
            source_url: source_url.to_string(),
            mode: SourceMode::Auto,
            allow_prerelease: false,
            auth_token: None,
            cache_prefix: default_cache_prefix(),
            asset_name_override: None,
            kind: ComponentKind::Plugin,
            real_slug: None,
            key: None,
            success_ttl: None,
            error_ttl: None,
            assets: VisualAssets::default(),
        }
    }

    pub fn with_mode(mut self, mode: SourceMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_string());
        self
    }

    pub fn with_prerelease(mut self, allow: bool) -> Self {
        self.allow_prerelease = allow;
        self
    }

    pub fn with_asset_name(mut self, name: &str) -> Self {
        self.asset_name_override = Some(name.to_string());
        self
    }

    /// Slug the host knows the component by (theme folder for themes)
    pub fn host_slug(&self) -> &str {
        match self.kind {
            ComponentKind::Theme => self.real_slug.as_deref().unwrap_or(&self.slug),
            ComponentKind::Plugin => &self.slug,
        }
    }
}
