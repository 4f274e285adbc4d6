//! Error types for the extraction crate.

use std::path::PathBuf;

use thiserror::Error;

use himawari_common::{CommonError, ObservationTime};
use storage::StorageError;

use crate::decode::DecodeError;

/// Errors that can occur during extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decompression failed for {path}: {message}")]
    Decompression { path: PathBuf, message: String },

    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Observation {0} already recorded")]
    DuplicateRecord(ObservationTime),

    #[error("Record for {time} has {actual} values, expected {expected}")]
    RecordShape {
        time: ObservationTime,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to write output: {0}")]
    Output(#[from] csv::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Extraction cancelled")]
    Cancelled,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Common(#[from] CommonError),
}

/// Result type for extraction operations.
pub type ExtractionResult<T> = std::result::Result<T, ExtractionError>;
