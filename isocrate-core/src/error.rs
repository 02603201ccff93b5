//! Error types for isocrate

use thiserror::Error;

/// Main error type for isocrate operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid volume dimensions {dims:?}: {reason}")]
    InvalidDimensions { dims: [usize; 3], reason: String },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),
}

/// Result type alias for isocrate operations
pub type Result<T> = std::result::Result<T, Error>;
