//! Sync engine error types.

use ontap_client::ClientError;
use ontap_core::CoreError;
use thiserror::Error;

/// Fatal-to-bootstrap failures. Poll cycle failures never surface as errors.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Invalid location identifier: {0}")]
    InvalidIdentifier(#[from] CoreError),

    #[error("Failed to load refresh settings: {0}")]
    Settings(ClientError),

    #[error("Location not found: {0}")]
    LocationNotFound(ClientError),

    #[error("Failed to load location: {0}")]
    Location(ClientError),

    #[error("Failed to load taps: {0}")]
    Taps(ClientError),
}

impl SyncError {
    /// Bootstrap stage label for logs and metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier(_) | Self::LocationNotFound(_) => "location_not_found",
            Self::Settings(_) => "settings_failed",
            Self::Location(_) => "location_failed",
            Self::Taps(_) => "taps_failed",
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
