//! Socket transport for secure element simulators
//!
//! Simulators expose the secure element over TCP. Every message is a 4 byte
//! header (message type, node address, big-endian payload length) followed
//! by the payload, which carries one APDU or one response.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod transport;

pub use config::SocketConfig;
pub use error::SocketError;
pub use transport::SocketTransport;
