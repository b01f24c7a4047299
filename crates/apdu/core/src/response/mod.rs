//! APDU response definitions
//!
//! A response is the data returned by the card followed by the status word.

pub mod status;

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec;
use crate::error::CodecError;
use status::StatusWord;

/// APDU response: response data and trailing status word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    data: Bytes,
    status: StatusWord,
}

impl Response {
    /// Create a response from data and status word
    pub fn new(data: impl Into<Bytes>, status: StatusWord) -> Self {
        Self {
            data: data.into(),
            status,
        }
    }

    /// Create a `90 00` response with the given data
    pub fn success(data: impl Into<Bytes>) -> Self {
        Self::new(data, status::common::SW_NO_ERROR)
    }

    /// Create a response with only a status word
    pub const fn status_only(status: StatusWord) -> Self {
        Self {
            data: Bytes::new(),
            status,
        }
    }

    /// Parse a raw response frame
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        codec::decode(bytes)
    }

    /// Serialize back to the raw frame layout (data followed by SW1 SW2)
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::with_capacity(self.data.len() + 2);
        buffer.put_slice(&self.data);
        buffer.put_u8(self.status.sw1);
        buffer.put_u8(self.status.sw2);
        buffer.freeze()
    }

    /// Response data, without the status word
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// The status word
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Whether the status word is `90 00`
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Split into data and status word
    pub fn into_parts(self) -> (Bytes, StatusWord) {
        (self.data, self.status)
    }
}

impl From<Response> for Bytes {
    fn from(response: Response) -> Self {
        response.to_bytes()
    }
}
