use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::component::ComponentConfig;
use crate::fetch::github::DEFAULT_API_BASE;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default TTL of cached metadata in seconds (6 hours)
pub const DEFAULT_SUCCESS_TTL_SECS: u64 = 6 * 60 * 60;

/// Default TTL of cached fetch failures in seconds (6 hours)
pub const DEFAULT_ERROR_TTL_SECS: u64 = 6 * 60 * 60;

/// Timeout for fetch operations in seconds
pub const FETCH_TIMEOUT_SECS: u64 = 15;

// =============================================================================
// Naming constants
// =============================================================================

/// Default prefix of metadata cache keys
pub const DEFAULT_CACHE_PREFIX: &str = "upd_";

/// User agent sent with every request
pub const USER_AGENT: &str = "update-resolver";

/// Environment variable consulted for a global GitHub token
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Resolver configuration structure
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub cache: CacheConfig,
    pub site: SiteConfig,
    /// Fallback token for every GitHub component
    pub github_token: Option<String>,
    /// Shared secret a manual re-check must present
    pub recheck_secret: Option<String>,
    pub github_api_base: String,
    pub components: Vec<ComponentConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            site: SiteConfig::default(),
            github_token: None,
            recheck_secret: None,
            github_api_base: DEFAULT_API_BASE.to_string(),
            components: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn component(&self, slug: &str) -> Option<&ComponentConfig> {
        self.components.iter().find(|c| c.slug == slug)
    }
}

/// Which store backs the result cache
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    #[default]
    Sqlite,
}

/// Cache-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// TTL of cached metadata in seconds
    pub success_ttl: u64,
    /// TTL of cached failures in seconds
    pub error_ttl: u64,
    /// Database location; defaults to [`db_path`]
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            success_ttl: DEFAULT_SUCCESS_TTL_SECS,
            error_ttl: DEFAULT_ERROR_TTL_SECS,
            path: None,
        }
    }
}

/// The site the components are installed on
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    /// Site URL or host, sent to JSON update servers as `domain`
    pub host: String,
}

/// Returns the path to the data directory for update-resolver.
/// Uses $XDG_DATA_HOME/update-resolver if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/update-resolver,
/// or ./update-resolver if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the database file.
pub fn db_path() -> PathBuf {
    data_dir().join("cache.db")
}

/// Returns the directory log files are written to.
pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("update-resolver")
}
