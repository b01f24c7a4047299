//! Constants used in GlobalPlatform secure channel operations

/// Class bytes
pub mod cla {
    /// ISO inter-industry class
    pub const ISO7816: u8 = 0x00;
    /// GlobalPlatform proprietary class
    pub const GP: u8 = 0x80;
    /// GlobalPlatform class with secure messaging indicated
    pub const MAC: u8 = 0x84;
    /// Bit set in CLA when secure messaging is applied
    pub const SECURE_MESSAGING: u8 = 0x04;
}

/// Instruction bytes
pub mod ins {
    /// SELECT
    pub const SELECT: u8 = 0xA4;
    /// INITIALIZE UPDATE
    pub const INITIALIZE_UPDATE: u8 = 0x50;
    /// EXTERNAL AUTHENTICATE
    pub const EXTERNAL_AUTHENTICATE: u8 = 0x82;
}

/// SELECT parameters
pub mod select_p1 {
    /// Select by DF name (AID)
    pub const BY_NAME: u8 = 0x04;
}

/// SCP03 parameters
pub mod scp03 {
    /// Protocol identifier reported in the key information
    pub const IDENTIFIER: u8 = 0x03;
    /// Length of host and card challenges
    pub const CHALLENGE_LENGTH: usize = 8;
    /// Length of host and card cryptograms
    pub const CRYPTOGRAM_LENGTH: usize = 8;
    /// Length of the truncated C-MAC and R-MAC
    pub const MAC_LENGTH: usize = 8;
    /// AES block and key length
    pub const BLOCK_LENGTH: usize = 16;
    /// INITIALIZE UPDATE response length without sequence counter
    pub const INITIALIZE_UPDATE_RESPONSE_LENGTH: usize = 29;
    /// INITIALIZE UPDATE response length with pseudo-random challenge counter
    pub const INITIALIZE_UPDATE_RESPONSE_LENGTH_WITH_COUNTER: usize = 32;
}

/// Derivation constants of the SCP03 key derivation function
pub mod derivation {
    /// Card cryptogram
    pub const CARD_CRYPTOGRAM: u8 = 0x00;
    /// Host cryptogram
    pub const HOST_CRYPTOGRAM: u8 = 0x01;
    /// Card challenge generation
    pub const CARD_CHALLENGE: u8 = 0x02;
    /// Session encryption key
    pub const S_ENC: u8 = 0x04;
    /// Session command MAC key
    pub const S_MAC: u8 = 0x06;
    /// Session response MAC key
    pub const S_RMAC: u8 = 0x07;
}
