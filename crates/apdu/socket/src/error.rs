//! Error types for the socket transport

use std::io;

/// Errors raised while connecting a socket transport
///
/// Once connected, failures are reported as
/// [`TransportError`](seclink_apdu_core::TransportError).
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    /// The address did not resolve to anything usable
    #[error("Cannot resolve address: {0}")]
    AddressResolution(String),

    /// The connection could not be established
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
