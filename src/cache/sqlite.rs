//! SQLite-backed key/value store with TTLs

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use tracing::{debug, info};

use crate::cache::error::CacheError;
use crate::cache::{Clock, KeyValueStore, SystemClock};

/// Schema migrations
/// Each version contains a list of SQL statements to execute
const MIGRATIONS: &[&[&str]] = &[
    // v1: expiry index for purging
    &["CREATE INDEX IF NOT EXISTS idx_entries_expires_at ON entries(expires_at)"],
];

pub struct SqliteStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl SqliteStore {
    pub fn new(db_path: &Path) -> Result<Self, CacheError> {
        Self::with_clock(db_path, Arc::new(SystemClock))
    }

    pub fn with_clock(db_path: &Path, clock: Arc<dyn Clock>) -> Result<Self, CacheError> {
        info!("Initializing cache database at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let store = Self {
            conn: Mutex::new(conn),
            clock,
        };

        store.create_schema()?;
        info!("Cache initialized successfully");

        Ok(store)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), CacheError> {
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        Self::apply_migrations(&conn)?;

        debug!("Database schema created successfully");
        Ok(())
    }

    /// Apply pending migrations based on user_version pragma
    fn apply_migrations(conn: &Connection) -> Result<(), CacheError> {
        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (i, statements) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                for sql in *statements {
                    conn.execute(sql, [])?;
                }
                debug!("Applied migration v{}", version);
            }
        }

        let target_version = MIGRATIONS.len() as i32;
        if target_version > current_version {
            conn.pragma_update(None, "user_version", target_version)?;
        }

        Ok(())
    }

    /// Delete expired entries, returning how many were removed
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = self.clock.now();
        let conn = self.lock_conn()?;
        let removed = conn.execute("DELETE FROM entries WHERE expires_at <= ?1", [now])?;
        if removed > 0 {
            debug!("Purged {} expired cache entries", removed);
        }
        Ok(removed)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let now = self.clock.now();
        let conn = self.lock_conn()?;

        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM entries WHERE key = ?1 AND expires_at > ?2",
                (key, now),
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(CacheError::from)
    }

    fn set(&self, key: &str, value: Value, ttl_secs: u64) -> Result<(), CacheError> {
        let expires_at = self
            .clock
            .now()
            .saturating_add(i64::try_from(ttl_secs).unwrap_or(i64::MAX));
        let raw = serde_json::to_string(&value)?;

        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO entries (key, value, expires_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
            "#,
            (key, raw, expires_at),
        )?;

        debug!("Stored cache entry {} (ttl {}s)", key, ttl_secs);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM entries WHERE key = ?1", [key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::tests::ManualClock;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_at(now: i64) -> (TempDir, Arc<ManualClock>, SqliteStore) {
        let temp_dir = TempDir::new().unwrap();
        let clock = ManualClock::at(now);
        let store = SqliteStore::with_clock(&temp_dir.path().join("test.db"), clock.clone()).unwrap();
        (temp_dir, clock, store)
    }

    #[test]
    fn set_then_get_returns_value() {
        let (_dir, _clock, store) = store_at(100);

        store
            .set("upd_p", json!({ "version": "1.0.0" }), 60)
            .unwrap();

        assert_eq!(
            store.get("upd_p").unwrap(),
            Some(json!({ "version": "1.0.0" }))
        );
    }

    #[test]
    fn expired_entries_are_invisible_and_purged() {
        let (_dir, clock, store) = store_at(100);

        store.set("short", json!(1), 10).unwrap();
        store.set("long", json!(2), 1_000).unwrap();
        clock.advance(10);

        assert_eq!(store.get("short").unwrap(), None);
        assert_eq!(store.get("long").unwrap(), Some(json!(2)));
        assert_eq!(store.purge_expired().unwrap(), 1);
    }

    #[test]
    fn set_overwrites_existing_entry() {
        let (_dir, _clock, store) = store_at(0);

        store.set("k", json!("old"), 10).unwrap();
        store.set("k", json!("new"), 10).unwrap();

        assert_eq!(store.get("k").unwrap(), Some(json!("new")));
    }

    #[test]
    fn delete_removes_entry() {
        let (_dir, _clock, store) = store_at(0);

        store.set("k", json!(1), 10).unwrap();
        store.delete("k").unwrap();
        store.delete("never-set").unwrap();

        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn reopening_database_keeps_entries() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let clock = ManualClock::at(0);

        {
            let store = SqliteStore::with_clock(&db_path, clock.clone()).unwrap();
            store.set("k", json!("persisted"), 60).unwrap();
        }

        let store = SqliteStore::with_clock(&db_path, clock).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!("persisted")));
    }
}
