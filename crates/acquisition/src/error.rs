//! Error types for acquisition.

use thiserror::Error;

use himawari_common::CommonError;
use storage::StorageError;

/// Result type alias using AcquisitionError.
pub type AcquisitionResult<T> = Result<T, AcquisitionError>;

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("Invalid key space: {0}")]
    InvalidKeySpace(String),

    #[error(transparent)]
    Common(#[from] CommonError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
