//! GlobalPlatform SCP03 secure channel
//!
//! This crate provides the commands and cryptography needed to open an SCP03
//! session (AES-128) with a secure element and protect the APDUs exchanged
//! on it. The resulting [`Scp03Channel`] plugs into any session through the
//! [`SecureChannel`](seclink_apdu_core::SecureChannel) trait.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod commands;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod secure_channel;
pub mod session;

pub use commands::{
    ExternalAuthenticateCommand, InitializeUpdateCommand, InitializeUpdateResponse, SelectCommand,
};
pub use error::{Error, Result};
pub use secure_channel::Scp03Channel;
pub use session::{SessionKeys, StaticKeys};
