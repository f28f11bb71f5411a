//! Error types for rating-state

use thiserror::Error;

/// Errors that can occur in the session persistence layer.
///
/// A missing session is not an error: store operations report it as
/// `Ok(None)` or `Ok(false)`.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend read/write failure
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Database connection error
    #[error("database connection failed: {0}")]
    Connection(String),

    /// Schema setup error
    #[error("schema setup failed: {0}")]
    SchemaSetup(String),

    /// Serialization error
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A backend is configured but cannot be used as configured
    #[error("invalid store configuration: {0}")]
    Configuration(String),
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_errors_map_to_serialization() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = StorageError::from(err);
        assert!(matches!(err, StorageError::Serialization(_)));
        assert!(err.to_string().starts_with("serialization failed"));
    }

    #[test]
    fn configuration_error_display() {
        let err = StorageError::Configuration("SURREALDB_USERNAME not set".to_string());
        assert!(err.to_string().contains("SURREALDB_USERNAME"));
    }
}
