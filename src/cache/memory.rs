//! In-process key/value store with TTLs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::cache::error::CacheError;
use crate::cache::{Clock, KeyValueStore, SystemClock};

struct Entry {
    value: Value,
    expires_at: i64,
}

/// Store kept in memory for the lifetime of the process
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn lock_entries(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, CacheError> {
        self.entries.lock().map_err(|_| CacheError::LockPoisoned)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.lock_entries()
            .map(|entries| entries.values().filter(|e| e.expires_at > now).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let now = self.clock.now();
        let mut entries = self.lock_entries()?;

        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: Value, ttl_secs: u64) -> Result<(), CacheError> {
        let expires_at = self
            .clock
            .now()
            .saturating_add(i64::try_from(ttl_secs).unwrap_or(i64::MAX));
        self.lock_entries()?
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.lock_entries()?.remove(key);
        Ok(())
    }
}
