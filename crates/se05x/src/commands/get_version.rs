//! GET VERSION command

use seclink_apdu_core::prelude::*;

use super::{expected_length_for, find_tlv};
use crate::constants::{CLA_SE05X, VERSION_INFO_LENGTH, ins, p1, p2, tags};
use crate::error::ChipError;
use crate::status;
use crate::types::VersionInfo;

/// Read the applet version and configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetVersionCommand;

impl ApduCommand for GetVersionCommand {
    type Success = VersionInfo;
    type Error = ChipError;

    fn class(&self) -> u8 {
        CLA_SE05X
    }

    fn instruction(&self) -> u8 {
        ins::MGMT
    }

    fn p1(&self) -> u8 {
        p1::DEFAULT
    }

    fn p2(&self) -> u8 {
        p2::VERSION
    }

    fn data(&self) -> Option<&[u8]> {
        None
    }

    fn expected_length(&self) -> Option<ExpectedLength> {
        Some(expected_length_for(VERSION_INFO_LENGTH))
    }

    fn parse_response(response: Response) -> Result<Self::Success, Self::Error> {
        let data = status::check(response)?;
        VersionInfo::from_bytes(&find_tlv(&data, tags::TAG_1)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_encoding() {
        assert_eq!(
            GetVersionCommand.to_bytes().unwrap().as_ref(),
            &hex!("80 04 00 20 00")
        );
    }

    #[test]
    fn test_parse_response() {
        let response = Response::success(hex!("41 07 03030102000001").to_vec());
        let version = GetVersionCommand::parse_response(response).unwrap();
        assert_eq!((version.major, version.minor, version.patch), (3, 3, 1));
        assert_eq!(version.applet_config.bits(), 0x0200);
        assert_eq!(version.secure_box_version, 0x0001);
    }

    #[test]
    fn test_unsupported_and_malformed() {
        let unsupported = Response::status_only(StatusWord::from_u16(0x6D00));
        assert!(matches!(
            GetVersionCommand::parse_response(unsupported),
            Err(ChipError::Unsupported)
        ));

        let short = Response::success(hex!("41 06 030301020000").to_vec());
        assert!(matches!(
            GetVersionCommand::parse_response(short),
            Err(ChipError::MalformedResponse(_))
        ));
    }
}
