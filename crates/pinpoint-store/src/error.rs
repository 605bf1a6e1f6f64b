//! Error types for pinpoint-store.

use std::path::PathBuf;

/// Result type for pinpoint-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pinpoint-store.
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

    /// A stored category string did not parse.
    #[error("Invalid stored category: {0}")]
    InvalidCategory(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
