//! SE05x applet constants

/// Class byte of SE05x applet commands
pub const CLA_SE05X: u8 = 0x80;

/// Instruction bytes
pub mod ins {
    /// Read an object or attribute
    pub const READ: u8 = 0x02;
    /// Management commands (version, existence checks, ...)
    pub const MGMT: u8 = 0x04;
}

/// P1 values
pub mod p1 {
    /// No specific object type
    pub const DEFAULT: u8 = 0x00;
}

/// P2 values
pub mod p2 {
    /// No specific operation
    pub const DEFAULT: u8 = 0x00;
    /// Applet version
    pub const VERSION: u8 = 0x20;
    /// Object existence
    pub const EXIST: u8 = 0x27;
}

/// TLV tags used in command and response data
pub mod tags {
    /// First TLV: object identifier in commands, payload in responses
    pub const TAG_1: u8 = 0x41;
    /// Second TLV: read offset
    pub const TAG_2: u8 = 0x42;
    /// Third TLV: read length
    pub const TAG_3: u8 = 0x43;
}

/// Result byte of boolean queries
pub mod result {
    /// Condition holds
    pub const SUCCESS: u8 = 0x01;
    /// Condition does not hold
    pub const FAILURE: u8 = 0x02;
}

/// AID of the SE05x IoT applet
pub const IOT_APPLET_AID: [u8; 16] = [
    0xA0, 0x00, 0x00, 0x03, 0x96, 0x54, 0x53, 0x00, 0x00, 0x00, 0x01, 0x03, 0x00, 0x00, 0x00, 0x00,
];

/// Length of the module unique identifier
pub const UNIQUE_ID_LENGTH: u16 = 18;

/// Length of the applet version record
pub const VERSION_INFO_LENGTH: usize = 7;
