//! Error types for roomstatus-store.

use std::path::PathBuf;

/// Result type for roomstatus-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in roomstatus-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Database written by a newer version.
    #[error("Unsupported schema version {found} (newest known is {supported})")]
    UnsupportedSchema { found: i32, supported: i32 },

    /// Empty preference key.
    #[error("Preference key must not be empty")]
    EmptyKey,
}
