//! Result cache over an injected key/value/TTL store
//!
//! Successful metadata and failure markers live under distinct keys so a
//! cached failure never shadows a still-valid success and each expires on its
//! own TTL. GitHub release payloads are cached separately, keyed by
//! repository URL, because one release can serve several derived decisions.
//!
//! # Modules
//!
//! - [`memory`]: in-process store
//! - [`sqlite`]: persistent store backed by SQLite
//! - [`error`]: store error type

pub mod error;
pub mod memory;
pub mod sqlite;

use md5::{Digest, Md5};
#[cfg(test)]
use mockall::automock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use crate::cache::error::CacheError;
use crate::metadata::{GitHubReleasePayload, UpdateMetadata};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Source of the current time in seconds since the UNIX epoch
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Key/value store whose entries expire after a TTL
#[cfg_attr(test, automock)]
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, or `None` when missing or expired
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Store `value` under `key` for `ttl_secs` seconds, replacing any entry
    fn set(&self, key: &str, value: Value, ttl_secs: u64) -> Result<(), CacheError>;

    /// Remove `key`; removing a missing key is not an error
    fn delete(&self, key: &str) -> Result<(), CacheError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Value, ttl_secs: u64) -> Result<(), CacheError> {
        (**self).set(key, value, ttl_secs)
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        (**self).delete(key)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Value, ttl_secs: u64) -> Result<(), CacheError> {
        (**self).set(key, value, ttl_secs)
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        (**self).delete(key)
    }
}

/// Hex MD5 of a repository URL, as used in release cache keys
pub fn url_hash(repo_url: &str) -> String {
    hex::encode(Md5::digest(repo_url.as_bytes()))
}

/// Key namespace of one tracked component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    /// `{prefix}{slug}`
    pub metadata: String,
    /// `{prefix}{slug}_error`
    pub error: String,
    /// `uupd_github_release_{slug}_{md5(repo_url)}`
    pub release: String,
    /// `uupd_github_release_{md5(repo_url)}`, written by older deployments
    pub legacy_release: String,
}

impl CacheKeys {
    /// Build the keys; `source_url` has trailing slashes removed before hashing
    pub fn new(cache_prefix: &str, slug: &str, source_url: &str) -> Self {
        let metadata = format!("{cache_prefix}{slug}");
        let hash = url_hash(source_url.trim_end_matches('/'));
        Self {
            error: format!("{metadata}_error"),
            metadata,
            release: format!("uupd_github_release_{slug}_{hash}"),
            legacy_release: format!("uupd_github_release_{hash}"),
        }
    }
}

/// Typed access to metadata, failure markers and release payloads
///
/// Store failures are logged and degrade to cache misses; they never abort a
/// resolution.
pub struct ResultCache<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> ResultCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn get_metadata(&self, keys: &CacheKeys) -> Option<UpdateMetadata> {
        self.get_typed(&keys.metadata)
    }

    /// Cache metadata and clear any failure marker
    pub fn put_metadata(&self, keys: &CacheKeys, meta: &UpdateMetadata, ttl_secs: u64) {
        self.set_typed(&keys.metadata, meta, ttl_secs);
        self.remove(&keys.error);
    }

    pub fn has_error(&self, keys: &CacheKeys) -> bool {
        self.get_raw(&keys.error).is_some()
    }

    /// Record a failure marker holding the failure timestamp
    pub fn put_error(&self, keys: &CacheKeys, timestamp: i64, ttl_secs: u64) {
        self.set_typed(&keys.error, &timestamp, ttl_secs);
    }

    pub fn get_release(&self, keys: &CacheKeys) -> Option<GitHubReleasePayload> {
        self.get_typed(&keys.release)
    }

    pub fn put_release(&self, keys: &CacheKeys, release: &GitHubReleasePayload, ttl_secs: u64) {
        self.set_typed(&keys.release, release, ttl_secs);
    }

    /// Delete every entry of the component.
    ///
    /// Release keys are only touched when `include_release` is set.
    pub fn invalidate(&self, keys: &CacheKeys, include_release: bool) -> Result<(), CacheError> {
        self.store.delete(&keys.metadata)?;
        self.store.delete(&keys.error)?;
        if include_release {
            self.store.delete(&keys.release)?;
            self.store.delete(&keys.legacy_release)?;
        }
        debug!("Invalidated cache entries for {}", keys.metadata);
        Ok(())
    }

    fn get_raw(&self, key: &str) -> Option<Value> {
        self.store
            .get(key)
            .inspect_err(|e| error!("Failed to read cache entry {}: {}", key, e))
            .ok()
            .flatten()
    }

    fn get_typed<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_raw(key)?;
        serde_json::from_value(value)
            .inspect_err(|e| error!("Discarding undecodable cache entry {}: {}", key, e))
            .ok()
    }

    fn set_typed<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let result = serde_json::to_value(value)
            .map_err(CacheError::from)
            .and_then(|value| self.store.set(key, value, ttl_secs));
        if let Err(e) = result {
            error!("Failed to write cache entry {}: {}", key, e);
        }
    }

    fn remove(&self, key: &str) {
        let _ = self
            .store
            .delete(key)
            .inspect_err(|e| error!("Failed to delete cache entry {}: {}", key, e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cache_keys_follow_naming_convention() {
        let keys = CacheKeys::new("upd_", "my-plugin", "https://github.com/owner/repo/");
        let hash = url_hash("https://github.com/owner/repo");

        assert_eq!(keys.metadata, "upd_my-plugin");
        assert_eq!(keys.error, "upd_my-plugin_error");
        assert_eq!(keys.release, format!("uupd_github_release_my-plugin_{hash}"));
        assert_eq!(keys.legacy_release, format!("uupd_github_release_{hash}"));
    }

    #[test]
    fn url_hash_is_hex_md5() {
        assert_eq!(url_hash(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(url_hash("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn put_metadata_clears_error_marker() {
        let cache = ResultCache::new(MemoryStore::default());
        let keys = CacheKeys::new("upd_", "p", "https://example.com/index.json");

        cache.put_error(&keys, 1_700_000_000, 60);
        assert!(cache.has_error(&keys));

        let meta = UpdateMetadata {
            version: "1.0.0".to_string(),
            ..Default::default()
        };
        cache.put_metadata(&keys, &meta, 60);

        assert!(!cache.has_error(&keys));
        assert_eq!(cache.get_metadata(&keys), Some(meta));
    }

    #[test]
    fn error_marker_does_not_shadow_metadata() {
        let cache = ResultCache::new(MemoryStore::default());
        let keys = CacheKeys::new("upd_", "p", "");
        let meta = UpdateMetadata {
            version: "2.0.0".to_string(),
            ..Default::default()
        };

        cache.put_metadata(&keys, &meta, 60);
        cache.put_error(&keys, 1, 60);

        assert_eq!(cache.get_metadata(&keys), Some(meta));
        assert!(cache.has_error(&keys));
    }

    #[test]
    fn store_read_failure_is_a_miss() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_get()
            .returning(|_| Err(CacheError::LockPoisoned));

        let cache = ResultCache::new(store);
        let keys = CacheKeys::new("upd_", "p", "");

        assert_eq!(cache.get_metadata(&keys), None);
        assert!(!cache.has_error(&keys));
    }

    #[test]
    fn undecodable_entry_is_a_miss() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_get()
            .withf(|k: &str| k == "upd_p")
            .returning(|_| Ok(Some(json!({ "no_version": true }))));

        let cache = ResultCache::new(store);
        assert_eq!(cache.get_metadata(&CacheKeys::new("upd_", "p", "")), None);
    }

    #[test]
    fn invalidate_deletes_release_keys_only_when_requested() {
        let keys = CacheKeys::new("upd_", "p", "https://github.com/o/r");

        let mut store = MockKeyValueStore::new();
        store
            .expect_delete()
            .withf(|k: &str| k == "upd_p")
            .times(2)
            .returning(|_| Ok(()));
        store
            .expect_delete()
            .withf(|k: &str| k == "upd_p_error")
            .times(2)
            .returning(|_| Ok(()));
        let release_key = keys.release.clone();
        store
            .expect_delete()
            .withf(move |k: &str| k == release_key)
            .times(1)
            .returning(|_| Ok(()));
        let legacy_key = keys.legacy_release.clone();
        store
            .expect_delete()
            .withf(move |k: &str| k == legacy_key)
            .times(1)
            .returning(|_| Ok(()));

        let cache = ResultCache::new(store);
        cache.invalidate(&keys, false).unwrap();
        cache.invalidate(&keys, true).unwrap();
    }
}
