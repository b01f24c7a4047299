//! Command APDUs
//!
//! [`ApduCommand`] is implemented by every typed command in the workspace.
//! [`Command`] is the untyped form handed to secure channels and the codec.

use std::fmt;

use bytes::Bytes;

use crate::codec;
use crate::error::CodecError;
use crate::response::Response;

/// Number of response bytes expected by a command (Ne)
///
/// Values up to 256 use the short Le encoding, values up to 65536 the
/// extended one. Zero is accepted as the short-form wildcard and means 256.
pub type ExpectedLength = u32;

/// A typed command: header, optional body, and how to read its reply
pub trait ApduCommand {
    /// Value produced from a successful reply
    type Success;

    /// Error produced while interpreting the reply
    type Error: fmt::Debug;

    /// CLA byte
    fn class(&self) -> u8;

    /// INS byte
    fn instruction(&self) -> u8;

    /// P1 byte
    fn p1(&self) -> u8;

    /// P2 byte
    fn p2(&self) -> u8;

    /// Body of the command, `None` when there is no Lc field
    fn data(&self) -> Option<&[u8]>;

    /// Ne, `None` when there is no Le field
    fn expected_length(&self) -> Option<ExpectedLength>;

    /// Header bytes in wire order
    fn header(&self) -> [u8; 4] {
        [self.class(), self.instruction(), self.p1(), self.p2()]
    }

    /// Encode to a wire frame
    fn to_bytes(&self) -> Result<Bytes, CodecError> {
        codec::encode(self)
    }

    /// Copy into an untyped [`Command`]
    fn to_command(&self) -> Command {
        let [cla, ins, p1, p2] = self.header();
        Command {
            cla,
            ins,
            p1,
            p2,
            data: self.data().map(Bytes::copy_from_slice),
            le: self.expected_length(),
        }
    }

    /// Interpret the reply to this command
    fn parse_response(response: Response) -> Result<Self::Success, Self::Error>;
}

/// Untyped command APDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// CLA
    pub cla: u8,
    /// INS
    pub ins: u8,
    /// P1
    pub p1: u8,
    /// P2
    pub p2: u8,
    /// Body, never empty when present
    pub data: Option<Bytes>,
    /// Ne
    pub le: Option<ExpectedLength>,
}

impl Command {
    /// Header-only command (case 1)
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Command expecting a reply but carrying no body (case 2)
    pub const fn new_with_le(cla: u8, ins: u8, p1: u8, p2: u8, le: ExpectedLength) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: Some(le),
        }
    }

    /// Command carrying a body and expecting no reply data (case 3)
    pub fn new_with_data<T: Into<Bytes>>(cla: u8, ins: u8, p1: u8, p2: u8, data: T) -> Self {
        Self::new(cla, ins, p1, p2).with_data(data)
    }

    /// Command carrying a body and expecting reply data (case 4)
    pub fn new_with_data_and_le<T: Into<Bytes>>(
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: T,
        le: ExpectedLength,
    ) -> Self {
        Self::new_with_data(cla, ins, p1, p2, data).with_le(le)
    }

    /// Replace the body
    ///
    /// An empty payload clears the field, as ISO 7816-4 has no zero Lc.
    pub fn with_data<T: Into<Bytes>>(mut self, data: T) -> Self {
        let data = data.into();
        self.data = (!data.is_empty()).then_some(data);
        self
    }

    /// Replace Ne
    pub const fn with_le(mut self, le: ExpectedLength) -> Self {
        self.le = Some(le);
        self
    }

    /// Decode a wire frame
    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        codec::parse_command(data)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X} {:02X} {:02X} {:02X}",
            self.cla, self.ins, self.p1, self.p2
        )?;
        if let Some(data) = &self.data {
            write!(f, " [{} bytes]", data.len())?;
        }
        if let Some(le) = self.le {
            write!(f, " Ne={le}")?;
        }
        Ok(())
    }
}

impl ApduCommand for Command {
    type Success = Response;
    type Error = CodecError;

    fn class(&self) -> u8 {
        self.cla
    }

    fn instruction(&self) -> u8 {
        self.ins
    }

    fn p1(&self) -> u8 {
        self.p1
    }

    fn p2(&self) -> u8 {
        self.p2
    }

    fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    fn expected_length(&self) -> Option<ExpectedLength> {
        self.le
    }

    fn parse_response(response: Response) -> Result<Self::Success, Self::Error> {
        Ok(response)
    }
}
