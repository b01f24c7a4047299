//! Central status word table
//!
//! Every SE05x command interprets status words through [`categorize`], so
//! new commands inherit the same error semantics.

use bytes::Bytes;
use derive_more::Display;
use seclink_apdu_core::prelude::*;

use crate::error::ChipError;

/// Outcome class of a status word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum StatusCategory {
    /// `90 00`
    Success,
    /// File or referenced data not found
    NotFound,
    /// Security status not satisfied
    SecurityConditionNotSatisfied,
    /// Wrong length
    WrongLength,
    /// Instruction or class not supported
    Unsupported,
    /// Anything else
    Unexpected,
}

const STATUS_TABLE: &[(StatusWord, StatusCategory)] = &[
    (status::SW_NO_ERROR, StatusCategory::Success),
    (status::SW_FILE_NOT_FOUND, StatusCategory::NotFound),
    (status::SW_REFERENCED_DATA_NOT_FOUND, StatusCategory::NotFound),
    (status::SW_SECURITY_STATUS_NOT_SATISFIED, StatusCategory::SecurityConditionNotSatisfied),
    (status::SW_WRONG_LENGTH, StatusCategory::WrongLength),
    (status::SW_INS_NOT_SUPPORTED, StatusCategory::Unsupported),
    (status::SW_CLA_NOT_SUPPORTED, StatusCategory::Unsupported),
];

/// Classify a status word
pub fn categorize(status: StatusWord) -> StatusCategory {
    STATUS_TABLE
        .iter()
        .find(|(sw, _)| *sw == status)
        .map_or(StatusCategory::Unexpected, |(_, category)| *category)
}

impl ChipError {
    /// Error for a non-success status word
    ///
    /// A success status word maps to [`ChipError::Unexpected`], since callers
    /// only reach for this after deciding the response is not a success.
    pub fn from_status(status: StatusWord) -> Self {
        match categorize(status) {
            StatusCategory::NotFound => Self::NotFound,
            StatusCategory::SecurityConditionNotSatisfied => Self::SecurityConditionNotSatisfied,
            StatusCategory::WrongLength => Self::WrongLength,
            StatusCategory::Unsupported => Self::Unsupported,
            StatusCategory::Success | StatusCategory::Unexpected => Self::Unexpected(status),
        }
    }
}

/// Return the response data on success, the mapped error otherwise
pub fn check(response: Response) -> Result<Bytes, ChipError> {
    let (data, status) = response.into_parts();
    match categorize(status) {
        StatusCategory::Success => Ok(data),
        _ => Err(ChipError::from_status(status)),
    }
}
