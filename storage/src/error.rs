//! Storage error types.
//!
//! Used by repository implementations and callers of storage APIs.

use thiserror::Error;

/// Errors that can occur when using storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Corrupt embedding for recipe {recipe_id}: {byte_len} bytes is not a whole number of f32 values")]
    CorruptVector { recipe_id: String, byte_len: usize },
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Maps a unique-constraint violation to [`StorageError::Conflict`]; other errors pass through.
    pub(crate) fn from_insert(err: sqlx::Error, what: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StorageError::Conflict(what.into())
            }
            _ => StorageError::Database(err),
        }
    }
}
