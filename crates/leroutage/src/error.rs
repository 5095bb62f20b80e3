//! Engine error types

use lestockage::StorageError;
use thiserror::Error;

/// Result type for lifecycle and routing operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Failures surfaced by the lifecycle engine and intake router
#[derive(Debug, Error)]
pub enum EngineError {
    /// Referenced request does not exist
    #[error("Onboarding request not found: {0}")]
    NotFound(String),

    /// Malformed input rejected before touching storage
    #[error("Validation error: {0}")]
    Validation(String),

    /// A store read or write failed
    #[error("Persistence failure: {0}")]
    Persistence(#[source] StorageError),

    /// Shared storage handle could not be acquired
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl EngineError {
    /// Whether this error means the referenced request is absent
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(_))
    }
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => EngineError::NotFound(what),
            other => EngineError::Persistence(other),
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        EngineError::Persistence(StorageError::Database(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_not_found_maps_to_not_found() {
        let err = EngineError::from(StorageError::NotFound("onboarding request x".to_string()));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_storage_conflict_maps_to_persistence() {
        let err = EngineError::from(StorageError::Conflict("reference".to_string()));
        assert!(matches!(err, EngineError::Persistence(_)));
        assert!(err.to_string().starts_with("Persistence failure"));
    }
}
