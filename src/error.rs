//! Error types shared by the model, storage and language layers.

use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in core operations.
///
/// Every core operation is all-or-nothing: any of these aborts the enclosing
/// transaction.
#[derive(Debug, Error)]
pub enum Error {
    /// A field value failed its category's coercion rule or its validator.
    #[error("invalid value for '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// Structural violation of the language-set invariants.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A required record does not exist.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record does not match its schema.
    #[error("invalid stored data: {0}")]
    InvalidData(String),

    /// A thread panicked while holding a shared lock.
    #[error("lock poisoned")]
    LockPoisoned,
}

impl Error {
    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        Error::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Error::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Stable machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "validation_error",
            Error::InvalidInput(_) => "invalid_input",
            Error::NotFound { .. } => "not_found",
            _ => "internal_error",
        }
    }
}
