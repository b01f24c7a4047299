//! Error types for APDU operations
//!
//! Errors are split by layer: the transport (physical link), the codec
//! (ISO/IEC 7816-4 framing) and the secure channel (message protection).
//! Each layer's errors propagate unchanged to the layer above it.

use std::time::Duration;

use crate::response::status::StatusWord;

/// Errors raised by a [`CardTransport`](crate::CardTransport)
///
/// Every variant but [`FrameTooLarge`](Self::FrameTooLarge) is terminal for
/// the session that owns the transport: the caller has to reopen rather than
/// retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The link to the device is gone
    #[error("Connection lost")]
    ConnectionLost,

    /// No response arrived within the allowed time
    #[error("Timed out after {0:?} waiting for a response")]
    Timeout(Duration),

    /// The link closed in the middle of a frame
    #[error("Short read: expected {expected} bytes, received {received}")]
    ShortRead {
        /// Bytes announced by the frame
        expected: usize,
        /// Bytes actually received
        received: usize,
    },

    /// The frame is larger than the link can carry; nothing was sent
    #[error("Frame of {length} bytes exceeds the link limit of {limit}")]
    FrameTooLarge {
        /// Length of the rejected frame
        length: usize,
        /// Largest frame the link accepts
        limit: usize,
    },
}

/// Errors raised while encoding or decoding APDUs
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// A response is shorter than the two status word bytes
    #[error("Truncated response: {0} bytes, need at least 2")]
    Truncated(usize),

    /// A length does not fit the extended length encoding
    #[error("{field} of {length} exceeds the extended length limit")]
    LengthOverflow {
        /// Which field overflowed (`"Lc"` or `"Le"`)
        field: &'static str,
        /// The offending length
        length: usize,
    },

    /// A command frame could not be parsed
    #[error("Malformed command: {0}")]
    Malformed(&'static str),
}

/// Errors raised by a [`SecureChannel`](crate::SecureChannel) strategy
#[derive(Debug, thiserror::Error)]
pub enum SecureChannelError {
    /// The channel was used before the handshake completed
    #[error("Secure channel not established")]
    NotEstablished,

    /// The card refused a handshake command
    #[error("Card rejected secure channel command: {0}")]
    Rejected(StatusWord),

    /// Cryptograms did not match during the handshake
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(&'static str),

    /// The card announced a protocol this host does not implement
    #[error("Unsupported secure channel protocol: {0:#04X}")]
    UnsupportedProtocol(u8),

    /// A response MAC did not verify
    #[error("Response MAC verification failed")]
    MacMismatch,

    /// Decrypted data did not carry valid padding
    #[error("Invalid padding in protected data")]
    Padding,

    /// A protected response had an impossible layout
    #[error("Invalid secure channel response: {0}")]
    InvalidResponse(&'static str),

    /// Transport failure during the handshake
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Codec failure while protecting a command
    #[error(transparent)]
    Codec(#[from] CodecError),
}
