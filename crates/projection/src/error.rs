//! Error types for projection operations.

use thiserror::Error;

/// Result type for projection operations.
pub type ProjectionResult<T> = Result<T, ProjectionError>;

#[derive(Error, Debug)]
pub enum ProjectionError {
    /// Extent or shape cannot describe a grid
    #[error("Invalid area definition: {0}")]
    InvalidArea(String),
}
