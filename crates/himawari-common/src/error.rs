//! Error types for shared configuration and naming.

use thiserror::Error;

/// Result type alias using CommonError.
pub type CommonResult<T> = Result<T, CommonError>;

#[derive(Debug, Error)]
pub enum CommonError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid band: {0}")]
    InvalidBand(String),

    #[error("Invalid segment: {0}")]
    InvalidSegment(String),

    #[error("Invalid time specification: {0}")]
    InvalidTime(String),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
