//! Key-value blob stores.
//!
//! The registry only needs `get`/`set` of whole JSON collections:
//! - `timers`: the active set
//! - `completedTimers`: the history log
//!
//! [`SqliteStore`] persists them in a `kv` table; [`MemoryStore`] keeps them
//! in a map for tests and embedding.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::data_dir;
use crate::error::PersistenceError;

/// Key holding the active timer set.
pub const TIMERS_KEY: &str = "timers";

/// Key holding the completion history.
pub const HISTORY_KEY: &str = "completedTimers";

/// Blob storage addressed by string keys.
pub trait KeyValueStore {
    /// # Errors
    /// Returns [`PersistenceError::Read`] if the backend fails.
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// # Errors
    /// Returns [`PersistenceError::Write`] if the backend fails.
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

/// Read and decode a JSON collection. Missing keys yield `None`.
///
/// # Errors
/// Returns [`PersistenceError::Corrupt`] if the blob does not decode.
pub fn load_json<T, S>(store: &S, key: &str) -> Result<Option<T>, PersistenceError>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get(key)? {
        Some(blob) => serde_json::from_str(&blob)
            .map(Some)
            .map_err(|source| {
                warn!(key, error = %source, "stored collection does not decode");
                PersistenceError::Corrupt {
                    key: key.to_string(),
                    source,
                }
            }),
        None => Ok(None),
    }
}

/// Encode and write a whole JSON collection.
///
/// # Errors
/// Returns [`PersistenceError::Write`] if encoding or the write fails.
pub fn save_json<T, S>(store: &mut S, key: &str, value: &T) -> Result<(), PersistenceError>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let blob = serde_json::to_string(value).map_err(|e| PersistenceError::Write {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    store.set(key, &blob)
}

/// In-memory store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        (**self).set(key, value)
    }
}

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open the store at `<data_dir>/countroom.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened.
    pub fn open() -> Result<Self, PersistenceError> {
        let dir = data_dir().map_err(|e| PersistenceError::Open {
            path: "countroom.db".into(),
            message: e.to_string(),
        })?;
        Self::open_at(&dir.join("countroom.db"))
    }

    /// Open the store at an explicit path.
    ///
    /// # Errors
    /// Returns [`PersistenceError::Open`] if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, PersistenceError> {
        let open_failed = |e: rusqlite::Error| PersistenceError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        let conn = Connection::open(path).map_err(open_failed)?;
        let store = Self { conn };
        store.migrate().map_err(open_failed)?;
        Ok(store)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns [`PersistenceError::Open`] if SQLite cannot allocate it.
    pub fn open_memory() -> Result<Self, PersistenceError> {
        let open_failed = |e: rusqlite::Error| PersistenceError::Open {
            path: ":memory:".into(),
            message: e.to_string(),
        };
        let conn = Connection::open_in_memory().map_err(open_failed)?;
        let store = Self { conn };
        store.migrate().map_err(open_failed)?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let read_failed = |e: rusqlite::Error| PersistenceError::Read {
            key: key.to_string(),
            message: e.to_string(),
        };
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM kv WHERE key = ?1")
            .map_err(read_failed)?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(read_failed(e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .map_err(|e| PersistenceError::Write {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}
