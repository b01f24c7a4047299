//! Core traits and types for APDU (Application Protocol Data Unit) operations
//!
//! This crate provides the foundational types and traits for working with smart card
//! APDU commands and responses according to ISO/IEC 7816-4.
//!
//! ## Overview
//!
//! - [`Command`] and [`Response`] value types, and the [`ApduCommand`] trait for typed commands
//! - A pure [`codec`] choosing short or extended length encoding automatically
//! - The [`CardTransport`] trait for byte-level links to a device
//! - The [`SecureChannel`] strategy trait with a pass-through [`PlainChannel`]
//! - Layered error types for transport, codec and secure channel failures
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub use bytes::{Bytes, BytesMut};

pub mod codec;
pub mod command;
pub mod error;
pub mod response;
pub mod secure_channel;
pub mod transport;

pub use command::{ApduCommand, Command, ExpectedLength};
pub use error::{CodecError, SecureChannelError, TransportError};
pub use response::Response;
pub use response::status::StatusWord;
pub use secure_channel::{PlainChannel, SecureChannel, SecurityLevel};
pub use transport::{CardTransport, MockTransport};

/// Glob-importable set of the types every command or channel implementation needs
pub mod prelude {
    pub use crate::command::{ApduCommand, Command, ExpectedLength};
    pub use crate::error::{CodecError, SecureChannelError, TransportError};
    pub use crate::response::Response;
    pub use crate::response::status::{StatusWord, common as status};
    pub use crate::secure_channel::{PlainChannel, SecureChannel, SecurityLevel};
    pub use crate::transport::CardTransport;
    pub use crate::{Bytes, BytesMut};
}
