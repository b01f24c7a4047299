//! Error types for GlobalPlatform operations

use seclink_apdu_core::prelude::*;
use thiserror::Error;

/// Result type for GlobalPlatform operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for GlobalPlatform command parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Response indicates an error condition
    #[error("Card returned error status: {0}")]
    CardStatus(StatusWord),

    /// Response data does not have the expected layout
    #[error("Invalid response: {0}")]
    InvalidResponse(&'static str),

    /// Wrong data length
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Command could not be encoded
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl From<Error> for SecureChannelError {
    fn from(error: Error) -> Self {
        match error {
            Error::CardStatus(status) => Self::Rejected(status),
            Error::InvalidResponse(reason) => Self::InvalidResponse(reason),
            Error::InvalidLength { .. } => Self::InvalidResponse("unexpected response length"),
            Error::Codec(error) => Self::Codec(error),
        }
    }
}
