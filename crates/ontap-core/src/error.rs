//! Error types for ontap-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid refresh settings: {0}")]
    InvalidSettings(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
