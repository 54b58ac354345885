//! Preference database schema.
//!
//! A single `schema_version` row records the layout; databases written by a
//! newer release are refused rather than guessed at.

use rusqlite::Connection;

use crate::error::{Error, Result};

/// Layout version this build writes.
pub const SCHEMA_VERSION: i32 = 1;

/// Create the tables on a fresh database and check the version otherwise.
pub fn initialize(conn: &Connection) -> Result<()> {
    let version = stored_version(conn)?;

    if version == 0 {
        create_tables_v1(conn)?;
        record_version(conn, SCHEMA_VERSION)?;
    } else if version > SCHEMA_VERSION {
        return Err(Error::UnsupportedSchema {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }

    Ok(())
}

/// Version recorded in the database, 0 when nothing has been created yet.
pub fn stored_version(conn: &Connection) -> Result<i32> {
    let tables: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
        [],
        |row| row.get(0),
    )?;
    if tables == 0 {
        return Ok(0);
    }

    Ok(conn.query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| row.get(0))?)
}

fn record_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_version (id, version) VALUES (1, ?1)
         ON CONFLICT(id) DO UPDATE SET version = ?1",
        [version],
    )?;
    Ok(())
}

fn create_tables_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        CREATE TABLE preferences (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
        "#,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_gets_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        assert_eq!(stored_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        initialize(&conn).unwrap();
        assert_eq!(stored_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        record_version(&conn, SCHEMA_VERSION + 1).unwrap();
        assert!(matches!(
            initialize(&conn),
            Err(Error::UnsupportedSchema { .. })
        ));
    }
}
