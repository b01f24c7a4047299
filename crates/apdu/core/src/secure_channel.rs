//! Secure channel strategies
//!
//! A secure channel protects commands on their way out and verifies
//! responses on their way back. The session that owns the transport applies
//! whichever strategy is active, so command code never needs to know if the
//! link is protected.

use std::fmt;

use crate::command::Command;
use crate::error::SecureChannelError;
use crate::response::Response;

/// Protection applied by a secure channel, using the GlobalPlatform bit layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct SecurityLevel {
    /// Commands carry a MAC
    pub command_mac: bool,
    /// Command data is encrypted
    pub command_encryption: bool,
    /// Responses carry a MAC
    pub response_mac: bool,
    /// Response data is encrypted
    pub response_encryption: bool,
}

impl SecurityLevel {
    const C_MAC: u8 = 0x01;
    const C_DECRYPTION: u8 = 0x02;
    const R_MAC: u8 = 0x10;
    const R_ENCRYPTION: u8 = 0x20;

    /// No protection
    pub const fn none() -> Self {
        Self {
            command_mac: false,
            command_encryption: false,
            response_mac: false,
            response_encryption: false,
        }
    }

    /// Command MAC only
    pub const fn mac() -> Self {
        Self {
            command_mac: true,
            ..Self::none()
        }
    }

    /// Command MAC and command encryption
    pub const fn enc_mac() -> Self {
        Self {
            command_encryption: true,
            ..Self::mac()
        }
    }

    /// MAC and encryption in both directions
    pub const fn full() -> Self {
        Self {
            command_mac: true,
            command_encryption: true,
            response_mac: true,
            response_encryption: true,
        }
    }

    /// Decode the P1 byte of EXTERNAL AUTHENTICATE
    ///
    /// Returns `None` for combinations GlobalPlatform forbids (encryption
    /// without the matching MAC) and for unknown bits.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        let known = Self::C_MAC | Self::C_DECRYPTION | Self::R_MAC | Self::R_ENCRYPTION;
        if bits & !known != 0 {
            return None;
        }
        let level = Self {
            command_mac: bits & Self::C_MAC != 0,
            command_encryption: bits & Self::C_DECRYPTION != 0,
            response_mac: bits & Self::R_MAC != 0,
            response_encryption: bits & Self::R_ENCRYPTION != 0,
        };
        if (level.command_encryption && !level.command_mac)
            || (level.response_encryption && !level.response_mac)
        {
            return None;
        }
        Some(level)
    }

    /// Encode as the P1 byte of EXTERNAL AUTHENTICATE
    pub const fn bits(&self) -> u8 {
        let mut bits = 0;
        if self.command_mac {
            bits |= Self::C_MAC;
        }
        if self.command_encryption {
            bits |= Self::C_DECRYPTION;
        }
        if self.response_mac {
            bits |= Self::R_MAC;
        }
        if self.response_encryption {
            bits |= Self::R_ENCRYPTION;
        }
        bits
    }

    /// Whether no protection is applied at all
    pub const fn is_none(&self) -> bool {
        self.bits() == 0
    }

    /// Whether this level provides at least everything `other` provides
    pub const fn satisfies(&self, other: &Self) -> bool {
        self.bits() & other.bits() == other.bits()
    }
}

/// Strategy wrapping outgoing commands and unwrapping incoming responses
pub trait SecureChannel: fmt::Debug + Send {
    /// Protection currently applied
    fn security_level(&self) -> SecurityLevel;

    /// Whether the channel has completed its handshake
    fn is_established(&self) -> bool;

    /// Protect a command before it is encoded and sent
    fn wrap(&mut self, command: &Command) -> Result<Command, SecureChannelError>;

    /// Verify and strip protection from the response to `command`
    ///
    /// `command` is the unprotected command passed to [`wrap`](Self::wrap).
    fn unwrap(
        &mut self,
        command: &Command,
        response: Response,
    ) -> Result<Response, SecureChannelError>;
}

/// Pass-through strategy used while a session is unauthenticated
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainChannel;

impl SecureChannel for PlainChannel {
    fn security_level(&self) -> SecurityLevel {
        SecurityLevel::none()
    }

    fn is_established(&self) -> bool {
        false
    }

    fn wrap(&mut self, command: &Command) -> Result<Command, SecureChannelError> {
        Ok(command.clone())
    }

    fn unwrap(
        &mut self,
        _command: &Command,
        response: Response,
    ) -> Result<Response, SecureChannelError> {
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_level_bits() {
        assert_eq!(SecurityLevel::none().bits(), 0x00);
        assert_eq!(SecurityLevel::mac().bits(), 0x01);
        assert_eq!(SecurityLevel::enc_mac().bits(), 0x03);
        assert_eq!(SecurityLevel::full().bits(), 0x33);

        assert_eq!(SecurityLevel::from_bits(0x33), Some(SecurityLevel::full()));
        assert_eq!(SecurityLevel::from_bits(0x11).map(|l| l.response_mac), Some(true));
        // Encryption without MAC is not a valid GlobalPlatform level
        assert_eq!(SecurityLevel::from_bits(0x02), None);
        assert_eq!(SecurityLevel::from_bits(0x21), None);
        assert_eq!(SecurityLevel::from_bits(0x40), None);
    }

    #[test]
    fn test_security_level_ordering() {
        assert!(SecurityLevel::full().satisfies(&SecurityLevel::enc_mac()));
        assert!(SecurityLevel::mac().satisfies(&SecurityLevel::none()));
        assert!(!SecurityLevel::mac().satisfies(&SecurityLevel::enc_mac()));
    }

    #[test]
    fn test_plain_channel_is_transparent() {
        let mut channel = PlainChannel;
        let command = Command::new_with_le(0x80, 0x04, 0x00, 0x20, 256);
        assert_eq!(channel.wrap(&command).unwrap(), command);

        let response = Response::success(vec![0x01]);
        assert_eq!(channel.unwrap(&command, response.clone()).unwrap(), response);
        assert!(channel.security_level().is_none());
    }
}
