//! SELECT command
//!
//! Selects an application by its AID. The response data, if any, is the
//! file control information of the selected application.

use bytes::Bytes;
use seclink_apdu_core::prelude::*;

use crate::constants::*;
use crate::error::Error;

/// SELECT by DF name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectCommand {
    aid: Bytes,
}

impl SelectCommand {
    /// Select the application with the given AID
    pub fn by_aid(aid: impl Into<Bytes>) -> Self {
        Self { aid: aid.into() }
    }

    /// The AID being selected
    pub const fn aid(&self) -> &Bytes {
        &self.aid
    }

    /// Whether a raw command is a SELECT, which is never protected
    pub const fn is_select(command: &Command) -> bool {
        command.cla == cla::ISO7816 && command.ins == ins::SELECT
    }
}

impl ApduCommand for SelectCommand {
    type Success = Bytes;
    type Error = Error;

    fn class(&self) -> u8 {
        cla::ISO7816
    }

    fn instruction(&self) -> u8 {
        ins::SELECT
    }

    fn p1(&self) -> u8 {
        select_p1::BY_NAME
    }

    fn p2(&self) -> u8 {
        0x00
    }

    fn data(&self) -> Option<&[u8]> {
        Some(self.aid.as_ref())
    }

    fn expected_length(&self) -> Option<ExpectedLength> {
        Some(256)
    }

    fn parse_response(response: Response) -> Result<Self::Success, Self::Error> {
        if !response.is_success() {
            return Err(Error::CardStatus(response.status()));
        }
        Ok(response.data().clone())
    }
}
