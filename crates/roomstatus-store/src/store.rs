//! Main store implementation.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::schema;

/// A stored preference row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preference {
    pub key: String,
    pub value: String,
    /// When the value was last written.
    pub updated_at: OffsetDateTime,
}

/// SQLite-based preference store.
pub struct Store {
    conn: Connection,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Read a preference value.
    pub fn get_preference(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Write a preference value, replacing any previous one.
    pub fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        debug!(key, value, "Saving preference");
        self.conn.execute(
            "INSERT INTO preferences (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
            rusqlite::params![key, value, OffsetDateTime::now_utc().unix_timestamp()],
        )?;
        Ok(())
    }

    /// Remove a preference. Returns whether it existed.
    pub fn delete_preference(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM preferences WHERE key = ?", [key])?;
        Ok(rows > 0)
    }

    /// All preferences, ordered by key.
    pub fn list_preferences(&self) -> Result<Vec<Preference>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value, updated_at FROM preferences ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            let updated_at: i64 = row.get(2)?;
            Ok(Preference {
                key: row.get(0)?,
                value: row.get(1)?,
                updated_at: OffsetDateTime::from_unix_timestamp(updated_at)
                    .unwrap_or(OffsetDateTime::UNIX_EPOCH),
            })
        })?;

        let mut preferences = Vec::new();
        for row in rows {
            preferences.push(row?);
        }
        Ok(preferences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.list_preferences().unwrap().is_empty());
    }

    #[test]
    fn test_missing_preference() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.get_preference("gain").unwrap(), None);
    }

    #[test]
    fn test_set_overwrites() {
        let store = Store::open_in_memory().unwrap();
        store.set_preference("gain", "0.1").unwrap();
        store.set_preference("gain", "0.7").unwrap();

        assert_eq!(store.get_preference("gain").unwrap().as_deref(), Some("0.7"));
        assert_eq!(store.list_preferences().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_preference() {
        let store = Store::open_in_memory().unwrap();
        store.set_preference("gain", "0.1").unwrap();
        assert!(store.delete_preference("gain").unwrap());
        assert!(!store.delete_preference("gain").unwrap());
        assert_eq!(store.get_preference("gain").unwrap(), None);
    }

    #[test]
    fn test_empty_key_rejected() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(store.set_preference("", "x"), Err(Error::EmptyKey)));
    }

    #[test]
    fn test_list_is_sorted() {
        let store = Store::open_in_memory().unwrap();
        store.set_preference("z", "1").unwrap();
        store.set_preference("a", "2").unwrap();
        let keys: Vec<_> = store
            .list_preferences()
            .unwrap()
            .into_iter()
            .map(|p| p.key)
            .collect();
        assert_eq!(keys, vec!["a", "z"]);
    }
}
