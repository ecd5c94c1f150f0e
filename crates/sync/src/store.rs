// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable key-value persistence for queue state.
//!
//! Three backends:
//! - [`SqliteStore`]: one `kv` table in a WAL-mode SQLite database
//! - [`FileStore`]: one JSON file per key, replaced atomically
//! - [`MemoryStore`]: process-local, with write-failure injection for tests
//!
//! Write failures always propagate to the caller.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("invalid store key '{0}'\n  hint: keys may contain letters, digits, '-', '_' and '.'")]
    InvalidKey(String),

    /// Value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Write refused by the backend.
    #[error("write rejected: {0}")]
    WriteRejected(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed persistence that survives process restart.
pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removing an absent key succeeds.
    fn remove(&self, key: &str) -> StoreResult<()>;
}

fn validate_key(key: &str) -> StoreResult<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `set` and `remove` fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(StoreError::WriteRejected("memory store is read-only".to_string()));
        }
        Ok(())
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        validate_key(key)?;
        Ok(self.entries.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        validate_key(key)?;
        self.check_writable()?;
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        validate_key(key)?;
        self.check_writable()?;
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).remove(key);
        Ok(())
    }
}

/// One file per key under a directory.
///
/// Writes go to `<key>.json.tmp`, are fsynced, then renamed over
/// `<key>.json`, so a crash leaves either the old or the new value.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(FileStore { dir: dir.to_path_buf() })
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// SQL schema for the key-value table.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens a database at `path`, creating parent directories and schema.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = FULL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteStore { conn: Mutex::new(conn) })
    }

    /// Opens an in-memory database (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteStore { conn: Mutex::new(conn) })
    }

    /// Last write time of `key`, as RFC 3339.
    pub fn updated_at(&self, key: &str) -> StoreResult<Option<String>> {
        validate_key(key)?;
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let ts = conn
            .query_row("SELECT updated_at FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(ts)
    }
}

impl DurableStore for SqliteStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        validate_key(key)?;
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        validate_key(key)?;
        let now = chrono::Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        validate_key(key)?;
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
