//! Storage error types

use thiserror::Error;

/// Errors that can occur when reading or writing onboarding records.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying SQLite failure
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Referenced record does not exist
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint could not be satisfied
    #[error("Conflict: {0}")]
    Conflict(String),

    /// JSON column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Whether this error means the referenced record is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
