//! Error types for SE05x operations

use iso7816_tlv::TlvError;
use seclink_apdu_core::prelude::*;

/// Result type for SE05x operations
pub type Result<T> = std::result::Result<T, ChipError>;

/// Error type for SE05x commands and sessions
///
/// Status words are mapped through a single table (see [`crate::status`]),
/// so every command reports the same variant for the same status word.
#[derive(Debug, thiserror::Error)]
pub enum ChipError {
    /// The addressed object does not exist
    #[error("Object not found")]
    NotFound,

    /// The session lacks the authentication the command requires
    #[error("Security condition not satisfied")]
    SecurityConditionNotSatisfied,

    /// Command data or Le has the wrong length
    #[error("Wrong length")]
    WrongLength,

    /// The applet does not support the command in its current mode
    #[error("Command not supported in the current mode")]
    Unsupported,

    /// A success response did not have the expected layout
    #[error("Malformed response: {0}")]
    MalformedResponse(&'static str),

    /// Any status word the table does not name
    #[error("Unexpected status word: {0}")]
    Unexpected(StatusWord),

    /// The session was closed or invalidated by an earlier failure
    #[error("Session is closed")]
    SessionClosed,

    /// Transport-related errors
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Codec-related errors
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Secure channel errors
    #[error(transparent)]
    SecureChannel(#[from] SecureChannelError),

    /// TLV encoding errors
    #[error("TLV error: {0}")]
    Tlv(TlvError),
}

impl From<TlvError> for ChipError {
    fn from(error: TlvError) -> Self {
        Self::Tlv(error)
    }
}

impl ChipError {
    /// Whether this error leaves the session unusable
    ///
    /// Transport and secure channel failures may have left the card and the
    /// host out of step, so the session is closed instead of retried.
    /// A frame the link refused before sending leaves it intact.
    pub const fn invalidates_session(&self) -> bool {
        match self {
            Self::Transport(TransportError::FrameTooLarge { .. }) => false,
            Self::Transport(_) | Self::SecureChannel(_) => true,
            _ => false,
        }
    }

    /// Whether this error breaks an established secure channel
    ///
    /// The channel advances its counter and MAC chain when it wraps a
    /// command. A wrapped command that never reached the card, or a reply
    /// that could not be decoded, leaves both sides out of step.
    pub const fn breaks_secure_channel(&self) -> bool {
        matches!(
            self,
            Self::Codec(_) | Self::Transport(TransportError::FrameTooLarge { .. })
        )
    }
}

/// Errors raised while opening a session
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// The connect string could not be parsed
    #[error("Invalid connect string: {0}")]
    InvalidConnectString(String),

    /// No transport could be created for the connect string
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// The transport came up but session setup failed
    #[error("Session setup failed: {0}")]
    Setup(#[source] ChipError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_invalidation() {
        let too_large = ChipError::Transport(TransportError::FrameTooLarge {
            length: 70_000,
            limit: 65_535,
        });
        assert!(!too_large.invalidates_session());
        assert!(too_large.breaks_secure_channel());

        assert!(ChipError::Transport(TransportError::ConnectionLost).invalidates_session());
        assert!(ChipError::SecureChannel(SecureChannelError::MacMismatch).invalidates_session());

        let truncated = ChipError::Codec(CodecError::Truncated(1));
        assert!(!truncated.invalidates_session());
        assert!(truncated.breaks_secure_channel());

        assert!(!ChipError::NotFound.invalidates_session());
        assert!(!ChipError::NotFound.breaks_secure_channel());
    }
}
