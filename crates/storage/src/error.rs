//! Error types for remote and local storage.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The remote store has no object at this path
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Any other remote failure (network, throttling, server error)
    #[error("Transport error for {path}: {message}")]
    Transport { path: String, message: String },

    #[error("Artifact already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Invalid storage configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}
