//! Error types shared by attachsync crates

use thiserror::Error;

/// Result type alias for shared operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors raised while parsing shared configuration values
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Invalid field mapping: {0}")]
    InvalidMapping(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),
}
