//! ISO/IEC 7816-4 APDU codec
//!
//! Pure functions turning commands into wire frames and wire frames into
//! responses. Nothing in here touches a transport.
//!
//! Lengths use the short form (one byte Lc, one byte Le) whenever the data
//! is at most 255 bytes and at most 256 response bytes are expected. Anything
//! larger switches the whole command to the extended form (`00 Lc1 Lc2`,
//! two byte Le), as mixing forms within one command is not allowed.

use bytes::{BufMut, Bytes, BytesMut};

use crate::command::{ApduCommand, Command, ExpectedLength};
use crate::error::CodecError;
use crate::response::Response;
use crate::response::status::StatusWord;

/// Largest data field expressible with a short Lc
pub const MAX_SHORT_DATA: usize = 255;
/// Largest data field expressible with an extended Lc
pub const MAX_EXTENDED_DATA: usize = 65_535;
/// Largest Ne expressible with a short Le (encoded as `00`)
pub const MAX_SHORT_LE: ExpectedLength = 256;
/// Largest Ne expressible with an extended Le (encoded as `00 00`)
pub const MAX_EXTENDED_LE: ExpectedLength = 65_536;

/// Whether a command with this data length and Ne needs the extended form
pub fn is_extended(data_len: usize, le: Option<ExpectedLength>) -> bool {
    data_len > MAX_SHORT_DATA || le.is_some_and(|ne| normalize_le(ne) > MAX_SHORT_LE)
}

// A zero Ne is the short-form wildcard and means 256
const fn normalize_le(ne: ExpectedLength) -> ExpectedLength {
    if ne == 0 { MAX_SHORT_LE } else { ne }
}

/// Encode the Lc field for a data field of `data_len` bytes
///
/// Returns an empty buffer when there is no data.
pub fn lc_field(data_len: usize, extended: bool) -> Result<Bytes, CodecError> {
    if data_len == 0 {
        return Ok(Bytes::new());
    }
    if data_len > MAX_EXTENDED_DATA {
        return Err(CodecError::LengthOverflow {
            field: "Lc",
            length: data_len,
        });
    }

    let mut buffer = BytesMut::with_capacity(3);
    if extended {
        buffer.put_u8(0x00);
        buffer.put_u16(data_len as u16);
    } else {
        buffer.put_u8(data_len as u8);
    }
    Ok(buffer.freeze())
}

/// Encode a command into its wire frame
pub fn encode<C: ApduCommand + ?Sized>(command: &C) -> Result<Bytes, CodecError> {
    let data = command.data().unwrap_or(&[]);
    let le = command.expected_length().map(normalize_le);

    if let Some(ne) = le {
        if ne > MAX_EXTENDED_LE {
            return Err(CodecError::LengthOverflow {
                field: "Le",
                length: ne as usize,
            });
        }
    }

    let extended = is_extended(data.len(), le);
    let lc = lc_field(data.len(), extended)?;

    let mut buffer = BytesMut::with_capacity(4 + lc.len() + data.len() + 3);

    // Header: CLA, INS, P1, P2
    buffer.put_u8(command.class());
    buffer.put_u8(command.instruction());
    buffer.put_u8(command.p1());
    buffer.put_u8(command.p2());

    buffer.put_slice(&lc);
    buffer.put_slice(data);

    if let Some(ne) = le {
        if extended {
            // Case 2E carries its own leading zero, 4E reuses the one from Lc
            if data.is_empty() {
                buffer.put_u8(0x00);
            }
            buffer.put_u16(if ne == MAX_EXTENDED_LE { 0 } else { ne as u16 });
        } else {
            buffer.put_u8(if ne == MAX_SHORT_LE { 0 } else { ne as u8 });
        }
    }

    Ok(buffer.freeze())
}

/// Decode a response frame: the last two bytes are the status word
pub fn decode(bytes: &[u8]) -> Result<Response, CodecError> {
    if bytes.len() < 2 {
        return Err(CodecError::Truncated(bytes.len()));
    }

    let (data, sw) = bytes.split_at(bytes.len() - 2);
    Ok(Response::new(
        Bytes::copy_from_slice(data),
        StatusWord::new(sw[0], sw[1]),
    ))
}

/// Parse a command frame, covering every ISO case (1, 2S/E, 3S/E, 4S/E)
pub fn parse_command(frame: &[u8]) -> Result<Command, CodecError> {
    if frame.len() < 4 {
        return Err(CodecError::Malformed("command shorter than header"));
    }

    let mut command = Command::new(frame[0], frame[1], frame[2], frame[3]);
    let body = &frame[4..];

    match body {
        // Case 1
        [] => {}
        // Case 2S
        [le] => command.le = Some(short_le(*le)),
        // Extended forms start with a zero byte and are at least 3 bytes long
        [0x00, rest @ ..] if rest.len() >= 2 => {
            let first = u16::from_be_bytes([rest[0], rest[1]]) as usize;
            let rest = &rest[2..];

            if rest.is_empty() {
                // Case 2E
                command.le = Some(extended_le(first as u16));
            } else if first == 0 {
                return Err(CodecError::Malformed("extended Lc of zero"));
            } else if rest.len() == first {
                // Case 3E
                command.data = Some(Bytes::copy_from_slice(rest));
            } else if rest.len() == first + 2 {
                // Case 4E
                command.data = Some(Bytes::copy_from_slice(&rest[..first]));
                command.le = Some(extended_le(u16::from_be_bytes([
                    rest[first],
                    rest[first + 1],
                ])));
            } else {
                return Err(CodecError::Malformed("extended Lc does not match body"));
            }
        }
        [0x00, ..] => return Err(CodecError::Malformed("short Lc of zero")),
        [lc, rest @ ..] => {
            let lc = *lc as usize;
            if rest.len() == lc {
                // Case 3S
                command.data = Some(Bytes::copy_from_slice(rest));
            } else if rest.len() == lc + 1 {
                // Case 4S
                command.data = Some(Bytes::copy_from_slice(&rest[..lc]));
                command.le = Some(short_le(rest[lc]));
            } else {
                return Err(CodecError::Malformed("short Lc does not match body"));
            }
        }
    }

    Ok(command)
}

const fn short_le(byte: u8) -> ExpectedLength {
    if byte == 0 { MAX_SHORT_LE } else { byte as ExpectedLength }
}

const fn extended_le(value: u16) -> ExpectedLength {
    if value == 0 {
        MAX_EXTENDED_LE
    } else {
        value as ExpectedLength
    }
}
