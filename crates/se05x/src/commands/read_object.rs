//! READ OBJECT command

use bytes::Bytes;
use seclink_apdu_core::prelude::*;

use super::{encode_tlv, expected_length_for, find_tlv};
use crate::constants::{CLA_SE05X, ins, p1, p2, tags};
use crate::error::{ChipError, Result};
use crate::status;
use crate::types::ObjectId;

/// Read the contents of an object
///
/// A zero offset or length is left out of the command, in which case the
/// applet reads from the start or up to the end of the object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadObjectCommand {
    object_id: ObjectId,
    length: u16,
    data: Vec<u8>,
}

impl ReadObjectCommand {
    /// Read `length` bytes of the object starting at `offset`
    pub fn new(object_id: ObjectId, offset: u16, length: u16) -> Result<Self> {
        let mut data = encode_tlv(tags::TAG_1, &object_id.to_be_bytes())?;
        if offset != 0 {
            data.extend(encode_tlv(tags::TAG_2, &offset.to_be_bytes())?);
        }
        if length != 0 {
            data.extend(encode_tlv(tags::TAG_3, &length.to_be_bytes())?);
        }

        Ok(Self {
            object_id,
            length,
            data,
        })
    }

    /// Read the whole object
    pub fn whole(object_id: ObjectId) -> Result<Self> {
        Self::new(object_id, 0, 0)
    }

    /// Object being read
    pub const fn object_id(&self) -> ObjectId {
        self.object_id
    }
}

impl ApduCommand for ReadObjectCommand {
    type Success = Bytes;
    type Error = ChipError;

    fn class(&self) -> u8 {
        CLA_SE05X
    }

    fn instruction(&self) -> u8 {
        ins::READ
    }

    fn p1(&self) -> u8 {
        p1::DEFAULT
    }

    fn p2(&self) -> u8 {
        p2::DEFAULT
    }

    fn data(&self) -> Option<&[u8]> {
        Some(&self.data)
    }

    fn expected_length(&self) -> Option<ExpectedLength> {
        Some(expected_length_for(self.length as usize))
    }

    fn parse_response(response: Response) -> std::result::Result<Self::Success, Self::Error> {
        let data = status::check(response)?;
        find_tlv(&data, tags::TAG_1)
    }
}
