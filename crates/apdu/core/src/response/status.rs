//! Status words
//!
//! Every APDU response ends with a two byte status word (SW1 SW2).

use std::fmt;

/// Status word returned by the card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord {
    /// First status byte
    pub sw1: u8,
    /// Second status byte
    pub sw2: u8,
}

impl StatusWord {
    /// Create a status word from its two bytes
    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    /// Create a status word from its 16-bit value
    pub const fn from_u16(value: u16) -> Self {
        Self::new((value >> 8) as u8, value as u8)
    }

    /// The 16-bit value of this status word
    pub const fn to_u16(self) -> u16 {
        ((self.sw1 as u16) << 8) | self.sw2 as u16
    }

    /// Whether this is `90 00`
    pub const fn is_success(self) -> bool {
        self.sw1 == 0x90 && self.sw2 == 0x00
    }

    /// Status word as bytes in wire order
    pub const fn to_bytes(self) -> [u8; 2] {
        [self.sw1, self.sw2]
    }
}

impl From<u16> for StatusWord {
    fn from(value: u16) -> Self {
        Self::from_u16(value)
    }
}

impl From<StatusWord> for u16 {
    fn from(sw: StatusWord) -> Self {
        sw.to_u16()
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.sw1, self.sw2)
    }
}

/// Common ISO/IEC 7816-4 status words
pub mod common {
    use super::StatusWord;

    /// Normal processing
    pub const SW_NO_ERROR: StatusWord = StatusWord::new(0x90, 0x00);
    /// Wrong length
    pub const SW_WRONG_LENGTH: StatusWord = StatusWord::new(0x67, 0x00);
    /// Security condition not satisfied
    pub const SW_SECURITY_STATUS_NOT_SATISFIED: StatusWord = StatusWord::new(0x69, 0x82);
    /// Conditions of use not satisfied
    pub const SW_CONDITIONS_NOT_SATISFIED: StatusWord = StatusWord::new(0x69, 0x85);
    /// Wrong data
    pub const SW_WRONG_DATA: StatusWord = StatusWord::new(0x6A, 0x80);
    /// File or application not found
    pub const SW_FILE_NOT_FOUND: StatusWord = StatusWord::new(0x6A, 0x82);
    /// Referenced data not found
    pub const SW_REFERENCED_DATA_NOT_FOUND: StatusWord = StatusWord::new(0x6A, 0x88);
    /// Incorrect P1/P2
    pub const SW_INCORRECT_P1P2: StatusWord = StatusWord::new(0x6A, 0x86);
    /// Instruction not supported or invalid
    pub const SW_INS_NOT_SUPPORTED: StatusWord = StatusWord::new(0x6D, 0x00);
    /// Class not supported
    pub const SW_CLA_NOT_SUPPORTED: StatusWord = StatusWord::new(0x6E, 0x00);
    /// No precise diagnosis
    pub const SW_UNKNOWN: StatusWord = StatusWord::new(0x6F, 0x00);
}
