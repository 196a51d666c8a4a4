//! Per-slug tunables consulted at resolution time
//!
//! Every method receives the slug and the value the engine would otherwise
//! use, and returns the value to use. Methods are called on every resolution,
//! so a policy can change its answers between calls (e.g. a live
//! "allow pre-release" toggle) without touching [`ComponentConfig`].
//!
//! [`ComponentConfig`]: crate::component::ComponentConfig

use std::collections::HashMap;
use std::sync::RwLock;

use crate::component::VisualAssets;
use crate::config::{AppConfig, GITHUB_TOKEN_ENV};
use crate::metadata::UpdateMetadata;

/// Overridable resolution tunables
///
/// All methods have pass-through default implementations.
pub trait ResolutionPolicy: Send + Sync {
    /// Source URL of the component
    fn server_url(&self, _slug: &str, configured: &str) -> String {
        configured.to_string()
    }

    /// Final JSON request URL, after slug/key/domain were appended
    fn remote_url(&self, _slug: &str, built: &str) -> String {
        built.to_string()
    }

    /// GitHub token; empty tokens count as none
    fn github_token(&self, _slug: &str, configured: Option<&str>) -> Option<String> {
        non_empty(configured)
    }

    fn allow_prerelease(&self, _slug: &str, configured: bool) -> bool {
        configured
    }

    fn cache_prefix(&self, _slug: &str, configured: &str) -> String {
        configured.to_string()
    }

    /// TTL in seconds of cached metadata
    fn success_ttl(&self, _slug: &str, default: u64) -> u64 {
        default
    }

    /// TTL in seconds of cached failure markers
    fn error_ttl(&self, _slug: &str, default: u64) -> u64 {
        default
    }

    /// Branding used where fetched metadata has none
    fn visual_assets(&self, _slug: &str, configured: &VisualAssets) -> VisualAssets {
        configured.clone()
    }

    /// Rewrite freshly fetched JSON metadata before it is cached
    fn metadata_result(&self, _slug: &str, metadata: UpdateMetadata) -> UpdateMetadata {
        metadata
    }
}

fn non_empty(token: Option<&str>) -> Option<String> {
    token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Keeps every configured value
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl ResolutionPolicy for DefaultPolicy {}

/// Policy driven by the resolver configuration file
///
/// - Token lookup falls back from the component token to the global
///   `githubToken`, then to the `GITHUB_TOKEN` environment variable.
/// - Pre-release eligibility can be toggled per slug while running.
#[derive(Debug, Default)]
pub struct ConfigPolicy {
    global_token: Option<String>,
    prerelease_overrides: RwLock<HashMap<String, bool>>,
}

impl ConfigPolicy {
    pub fn new(global_token: Option<String>) -> Self {
        Self {
            global_token: non_empty(global_token.as_deref()),
            prerelease_overrides: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.github_token.clone())
    }

    /// Force pre-release eligibility of `slug`, regardless of its config
    pub fn set_allow_prerelease(&self, slug: &str, allow: bool) {
        if let Ok(mut overrides) = self.prerelease_overrides.write() {
            overrides.insert(slug.to_string(), allow);
        }
    }

    /// Drop a toggle set with [`Self::set_allow_prerelease`]
    pub fn clear_allow_prerelease(&self, slug: &str) {
        if let Ok(mut overrides) = self.prerelease_overrides.write() {
            overrides.remove(slug);
        }
    }
}

impl ResolutionPolicy for ConfigPolicy {
    fn github_token(&self, _slug: &str, configured: Option<&str>) -> Option<String> {
        non_empty(configured)
            .or_else(|| self.global_token.clone())
            .or_else(|| non_empty(std::env::var(GITHUB_TOKEN_ENV).ok().as_deref()))
    }

    fn allow_prerelease(&self, slug: &str, configured: bool) -> bool {
        self.prerelease_overrides
            .read()
            .ok()
            .and_then(|overrides| overrides.get(slug).copied())
            .unwrap_or(configured)
    }
}
