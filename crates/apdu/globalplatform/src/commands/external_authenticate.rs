//! EXTERNAL AUTHENTICATE command for GlobalPlatform
//!
//! Completes the secure channel handshake. The command is always sent with a
//! C-MAC, which the secure channel appends when wrapping it.

use seclink_apdu_core::prelude::*;

use crate::constants::*;
use crate::error::Error;

/// EXTERNAL AUTHENTICATE carrying the host cryptogram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalAuthenticateCommand {
    security_level: SecurityLevel,
    host_cryptogram: [u8; scp03::CRYPTOGRAM_LENGTH],
}

impl ExternalAuthenticateCommand {
    /// Create the command requesting `security_level` for the session
    pub const fn new(
        security_level: SecurityLevel,
        host_cryptogram: [u8; scp03::CRYPTOGRAM_LENGTH],
    ) -> Self {
        Self {
            security_level,
            host_cryptogram,
        }
    }

    /// The requested security level
    pub const fn security_level(&self) -> SecurityLevel {
        self.security_level
    }
}

impl ApduCommand for ExternalAuthenticateCommand {
    type Success = ();
    type Error = Error;

    fn class(&self) -> u8 {
        cla::GP
    }

    fn instruction(&self) -> u8 {
        ins::EXTERNAL_AUTHENTICATE
    }

    fn p1(&self) -> u8 {
        self.security_level.bits()
    }

    fn p2(&self) -> u8 {
        0x00
    }

    fn data(&self) -> Option<&[u8]> {
        Some(self.host_cryptogram.as_slice())
    }

    fn expected_length(&self) -> Option<ExpectedLength> {
        None
    }

    fn parse_response(response: Response) -> Result<Self::Success, Self::Error> {
        match response.status() {
            status::SW_NO_ERROR => Ok(()),
            other => Err(Error::CardStatus(other)),
        }
    }
}
