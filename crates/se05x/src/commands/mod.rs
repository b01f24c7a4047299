//! SE05x applet commands
//!
//! Each command encodes its TLV payload when it is built and interprets the
//! response through the central status table in [`crate::status`].

mod check_object_exists;
mod get_version;
mod read_object;

pub use check_object_exists::CheckObjectExistsCommand;
pub use get_version::GetVersionCommand;
pub use read_object::ReadObjectCommand;

use bytes::Bytes;
use iso7816_tlv::ber::{Tag, Tlv, Value};
use seclink_apdu_core::ExpectedLength;

use crate::error::{ChipError, Result};

/// Largest Ne that still encodes as a short Le
const SHORT_EXPECTED_LENGTH: ExpectedLength = 256;

/// Ne meaning "as much as the applet has"
const EXTENDED_EXPECTED_LENGTH: ExpectedLength = 65536;

// Tag, up to three length bytes and the result byte
const RESPONSE_OVERHEAD: usize = 5;

/// Encode a primitive TLV
pub(crate) fn encode_tlv(tag: u8, value: &[u8]) -> Result<Vec<u8>> {
    Ok(Tlv::new(Tag::try_from(tag)?, Value::Primitive(value.to_vec()))?.to_vec())
}

/// Find the primitive value carried under `tag` in a response payload
pub(crate) fn find_tlv(data: &[u8], tag: u8) -> Result<Bytes> {
    let tag = Tag::try_from(tag)?;
    Tlv::parse_all(data)
        .into_iter()
        .find(|tlv| tlv.tag() == &tag)
        .ok_or(ChipError::MalformedResponse("missing response TLV"))
        .and_then(|tlv| match tlv.value() {
            Value::Primitive(bytes) => Ok(Bytes::copy_from_slice(bytes)),
            Value::Constructed(_) => Err(ChipError::MalformedResponse("constructed response TLV")),
        })
}

/// Smallest Le covering `payload` response bytes wrapped in one TLV
pub(crate) const fn expected_length_for(payload: usize) -> ExpectedLength {
    if payload != 0 && payload + RESPONSE_OVERHEAD <= SHORT_EXPECTED_LENGTH as usize {
        SHORT_EXPECTED_LENGTH
    } else {
        EXTENDED_EXPECTED_LENGTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_encode_tlv() {
        assert_eq!(encode_tlv(0x41, &hex!("7FFF0206")).unwrap(), hex!("41 04 7FFF0206"));
        // Long values switch to the multi byte BER length
        let long = encode_tlv(0x41, &[0xAA; 200]).unwrap();
        assert_eq!(&long[..3], &hex!("41 81 C8"));
        assert_eq!(long.len(), 203);
    }

    #[test]
    fn test_find_tlv() {
        let data = hex!("42 02 0010 41 03 010203");
        assert_eq!(find_tlv(&data, 0x41).unwrap().as_ref(), &hex!("010203"));
        assert_eq!(find_tlv(&data, 0x42).unwrap().as_ref(), &hex!("0010"));
        assert!(matches!(
            find_tlv(&data, 0x43),
            Err(ChipError::MalformedResponse(_))
        ));
        assert!(matches!(
            find_tlv(&[], 0x41),
            Err(ChipError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_expected_length() {
        assert_eq!(expected_length_for(7), 256);
        assert_eq!(expected_length_for(251), 256);
        assert_eq!(expected_length_for(252), 65536);
        assert_eq!(expected_length_for(0), 65536);
    }
}
