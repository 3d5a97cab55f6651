//! Error types for on-device persistence.

use thiserror::Error;

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur while reading or writing persisted documents.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An imported backup file that is not a valid user document
    #[error("Invalid backup file: {0}")]
    InvalidBackup(String),

    /// In-memory backend lock was poisoned by a panicking writer
    #[error("Storage lock is poisoned")]
    Poisoned,
}
