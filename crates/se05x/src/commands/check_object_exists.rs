//! CHECK OBJECT EXISTS command

use seclink_apdu_core::prelude::*;

use super::{encode_tlv, expected_length_for, find_tlv};
use crate::constants::{CLA_SE05X, ins, p1, p2, result, tags};
use crate::error::{ChipError, Result};
use crate::status::{self, StatusCategory};
use crate::types::ObjectId;

/// Ask the applet whether an object exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckObjectExistsCommand {
    object_id: ObjectId,
    data: Vec<u8>,
}

impl CheckObjectExistsCommand {
    /// Check for the object with the given identifier
    pub fn new(object_id: ObjectId) -> Result<Self> {
        let data = encode_tlv(tags::TAG_1, &object_id.to_be_bytes())?;
        Ok(Self { object_id, data })
    }

    /// Object being checked
    pub const fn object_id(&self) -> ObjectId {
        self.object_id
    }
}

impl ApduCommand for CheckObjectExistsCommand {
    type Success = bool;
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
        p2::EXIST
    }

    fn data(&self) -> Option<&[u8]> {
        Some(&self.data)
    }

    fn expected_length(&self) -> Option<ExpectedLength> {
        Some(expected_length_for(1))
    }

    fn parse_response(response: Response) -> std::result::Result<Self::Success, Self::Error> {
        match status::categorize(response.status()) {
            StatusCategory::Success => {
                match find_tlv(response.data(), tags::TAG_1)?.as_ref() {
                    [result::SUCCESS] => Ok(true),
                    [result::FAILURE] => Ok(false),
                    _ => Err(ChipError::MalformedResponse("invalid existence result")),
                }
            }
            StatusCategory::NotFound => Ok(false),
            _ => Err(ChipError::from_status(response.status())),
        }
    }
}
