//! INITIALIZE UPDATE command for GlobalPlatform
//!
//! This command is used to start a secure channel session.

use bytes::Bytes;
use seclink_apdu_core::prelude::*;

use crate::constants::*;
use crate::error::Error;

/// INITIALIZE UPDATE command carrying the host challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializeUpdateCommand {
    key_version: u8,
    host_challenge: [u8; scp03::CHALLENGE_LENGTH],
}

impl InitializeUpdateCommand {
    /// Create a new INITIALIZE UPDATE command with a host challenge
    ///
    /// A key version of zero lets the card pick its default key set.
    pub const fn with_challenge(
        key_version: u8,
        host_challenge: [u8; scp03::CHALLENGE_LENGTH],
    ) -> Self {
        Self {
            key_version,
            host_challenge,
        }
    }

    /// Create a new INITIALIZE UPDATE command with random host challenge
    pub fn with_random_challenge(key_version: u8) -> Self {
        let mut challenge = [0u8; scp03::CHALLENGE_LENGTH];
        rand::RngCore::fill_bytes(&mut rand::rng(), &mut challenge);
        Self::with_challenge(key_version, challenge)
    }

    /// The host challenge sent to the card
    pub const fn host_challenge(&self) -> &[u8; scp03::CHALLENGE_LENGTH] {
        &self.host_challenge
    }
}

impl ApduCommand for InitializeUpdateCommand {
    type Success = InitializeUpdateResponse;
    type Error = Error;

    fn class(&self) -> u8 {
        cla::GP
    }

    fn instruction(&self) -> u8 {
        ins::INITIALIZE_UPDATE
    }

    fn p1(&self) -> u8 {
        self.key_version
    }

    fn p2(&self) -> u8 {
        0x00
    }

    fn data(&self) -> Option<&[u8]> {
        Some(self.host_challenge.as_slice())
    }

    fn expected_length(&self) -> Option<ExpectedLength> {
        Some(256)
    }

    fn parse_response(response: Response) -> Result<Self::Success, Self::Error> {
        if !response.is_success() {
            return Err(Error::CardStatus(response.status()));
        }
        InitializeUpdateResponse::from_bytes(response.data())
    }
}

/// Successful INITIALIZE UPDATE response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializeUpdateResponse {
    /// Key diversification data
    pub key_diversification_data: [u8; 10],
    /// Key version number of the key set the card chose
    pub key_version: u8,
    /// Secure channel protocol identifier
    pub scp_identifier: u8,
    /// Secure channel protocol option "i"
    pub scp_parameter: u8,
    /// Card challenge
    pub card_challenge: [u8; scp03::CHALLENGE_LENGTH],
    /// Card cryptogram
    pub card_cryptogram: [u8; scp03::CRYPTOGRAM_LENGTH],
    /// Sequence counter, present when the card uses pseudo-random challenges
    pub sequence_counter: Option<[u8; 3]>,
}

impl InitializeUpdateResponse {
    /// Parse the response data
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        let sequence_counter = match data.len() {
            scp03::INITIALIZE_UPDATE_RESPONSE_LENGTH => None,
            scp03::INITIALIZE_UPDATE_RESPONSE_LENGTH_WITH_COUNTER => {
                let mut counter = [0u8; 3];
                counter.copy_from_slice(&data[29..32]);
                Some(counter)
            }
            actual => {
                return Err(Error::InvalidLength {
                    expected: scp03::INITIALIZE_UPDATE_RESPONSE_LENGTH,
                    actual,
                });
            }
        };

        let mut key_diversification_data = [0u8; 10];
        key_diversification_data.copy_from_slice(&data[0..10]);
        let mut card_challenge = [0u8; scp03::CHALLENGE_LENGTH];
        card_challenge.copy_from_slice(&data[13..21]);
        let mut card_cryptogram = [0u8; scp03::CRYPTOGRAM_LENGTH];
        card_cryptogram.copy_from_slice(&data[21..29]);

        Ok(Self {
            key_diversification_data,
            key_version: data[10],
            scp_identifier: data[11],
            scp_parameter: data[12],
            card_challenge,
            card_cryptogram,
            sequence_counter,
        })
    }

    /// Serialize back into response data
    pub fn to_bytes(&self) -> Bytes {
        let mut data = Vec::with_capacity(scp03::INITIALIZE_UPDATE_RESPONSE_LENGTH_WITH_COUNTER);
        data.extend_from_slice(&self.key_diversification_data);
        data.extend_from_slice(&[self.key_version, self.scp_identifier, self.scp_parameter]);
        data.extend_from_slice(&self.card_challenge);
        data.extend_from_slice(&self.card_cryptogram);
        if let Some(counter) = &self.sequence_counter {
            data.extend_from_slice(counter);
        }
        data.into()
    }
}
