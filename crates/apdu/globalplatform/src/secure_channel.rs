//! SCP03 secure channel
//!
//! [`Scp03Channel`] runs the INITIALIZE UPDATE / EXTERNAL AUTHENTICATE
//! handshake over a caller supplied exchange function, then wraps commands
//! and unwraps responses at the negotiated security level.
//!
//! SELECT commands travel in the clear and advance neither the MAC chain
//! nor the encryption counter.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use seclink_apdu_core::codec;
use seclink_apdu_core::prelude::*;
use tracing::{debug, instrument, trace, warn};

use crate::commands::{ExternalAuthenticateCommand, InitializeUpdateCommand, SelectCommand};
use crate::constants::{cla, scp03};
use crate::crypto;
use crate::session::{SessionKeys, StaticKeys};

/// An established SCP03 session
pub struct Scp03Channel {
    keys: SessionKeys,
    security_level: SecurityLevel,
    /// MAC chaining value: the full C-MAC of the previous command
    chaining: [u8; scp03::BLOCK_LENGTH],
    /// Encryption counter, incremented for every wrapped command
    counter: u64,
    established: bool,
}

impl fmt::Debug for Scp03Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scp03Channel")
            .field("established", &self.established)
            .field("security_level", &self.security_level)
            .field("counter", &self.counter)
            .finish()
    }
}

impl Scp03Channel {
    /// Open a secure channel with a random host challenge
    ///
    /// `exchange` sends one command to the card and returns its response.
    pub fn establish<F>(
        keys: &StaticKeys,
        security_level: SecurityLevel,
        exchange: F,
    ) -> Result<Self, SecureChannelError>
    where
        F: FnMut(&Command) -> Result<Response, SecureChannelError>,
    {
        let initialize = InitializeUpdateCommand::with_random_challenge(keys.key_version());
        Self::handshake(keys, security_level, initialize, exchange)
    }

    /// Open a secure channel with a fixed host challenge
    pub fn establish_with_challenge<F>(
        keys: &StaticKeys,
        security_level: SecurityLevel,
        host_challenge: [u8; scp03::CHALLENGE_LENGTH],
        exchange: F,
    ) -> Result<Self, SecureChannelError>
    where
        F: FnMut(&Command) -> Result<Response, SecureChannelError>,
    {
        let initialize = InitializeUpdateCommand::with_challenge(keys.key_version(), host_challenge);
        Self::handshake(keys, security_level, initialize, exchange)
    }

    #[instrument(level = "debug", skip_all, fields(security_level = security_level.bits()))]
    fn handshake<F>(
        keys: &StaticKeys,
        security_level: SecurityLevel,
        initialize: InitializeUpdateCommand,
        mut exchange: F,
    ) -> Result<Self, SecureChannelError>
    where
        F: FnMut(&Command) -> Result<Response, SecureChannelError>,
    {
        let response = exchange(&initialize.to_command())?;
        let card = InitializeUpdateCommand::parse_response(response)?;

        if card.scp_identifier != scp03::IDENTIFIER {
            warn!(scp = card.scp_identifier, "Card does not speak SCP03");
            return Err(SecureChannelError::UnsupportedProtocol(card.scp_identifier));
        }

        let mut context = [0u8; 2 * scp03::CHALLENGE_LENGTH];
        context[..scp03::CHALLENGE_LENGTH].copy_from_slice(initialize.host_challenge());
        context[scp03::CHALLENGE_LENGTH..].copy_from_slice(&card.card_challenge);
        trace!(
            key_version = card.key_version,
            card_challenge = %hex::encode(card.card_challenge),
            "Received INITIALIZE UPDATE response"
        );

        let session_keys = SessionKeys::derive(keys, &context);
        if !session_keys.verify_card_cryptogram(&context, &card.card_cryptogram) {
            warn!("Card cryptogram verification failed");
            return Err(SecureChannelError::AuthenticationFailed(
                "card cryptogram mismatch",
            ));
        }
        let host_cryptogram = session_keys.host_cryptogram(&context);

        // EXTERNAL AUTHENTICATE itself is always sent with a C-MAC only
        let mut channel = Self {
            keys: session_keys,
            security_level: SecurityLevel::mac(),
            chaining: [0u8; scp03::BLOCK_LENGTH],
            counter: 0,
            established: false,
        };

        let authenticate =
            ExternalAuthenticateCommand::new(security_level, host_cryptogram).to_command();
        let wrapped = channel.mac_command(&authenticate)?;
        let response = exchange(&wrapped)?;
        ExternalAuthenticateCommand::parse_response(response)?;

        channel.security_level = security_level;
        channel.established = true;
        debug!("SCP03 secure channel established");
        Ok(channel)
    }

    /// Number of commands wrapped since the handshake
    pub const fn counter(&self) -> u64 {
        self.counter
    }

    /// Append a C-MAC to a command and advance the MAC chain
    fn mac_command(&mut self, command: &Command) -> Result<Command, SecureChannelError> {
        let data = command.data.as_deref().unwrap_or(&[]);
        let cla = command.cla | cla::SECURE_MESSAGING;

        let lc_len = data.len() + scp03::MAC_LENGTH;
        let lc = codec::lc_field(lc_len, codec::is_extended(lc_len, command.le))?;

        let mut mac_input = BytesMut::with_capacity(scp03::BLOCK_LENGTH + 4 + lc.len() + data.len());
        mac_input.put_slice(&self.chaining);
        mac_input.put_slice(&[cla, command.ins, command.p1, command.p2]);
        mac_input.put_slice(&lc);
        mac_input.put_slice(data);

        let mac = crypto::cmac(self.keys.mac(), &mac_input);
        self.chaining = mac;

        let mut protected = BytesMut::with_capacity(lc_len);
        protected.put_slice(data);
        protected.put_slice(&mac[..scp03::MAC_LENGTH]);

        Ok(Command {
            cla,
            ins: command.ins,
            p1: command.p1,
            p2: command.p2,
            data: Some(protected.freeze()),
            le: command.le,
        })
    }
}

impl SecureChannel for Scp03Channel {
    fn security_level(&self) -> SecurityLevel {
        self.security_level
    }

    fn is_established(&self) -> bool {
        self.established
    }

    fn wrap(&mut self, command: &Command) -> Result<Command, SecureChannelError> {
        if !self.established {
            return Err(SecureChannelError::NotEstablished);
        }
        if SelectCommand::is_select(command) {
            return Ok(command.clone());
        }

        self.counter += 1;
        trace!(counter = self.counter, "Wrapping command");

        let mut wrapped = command.clone();
        if self.security_level.command_encryption {
            if let Some(data) = &command.data {
                let icv = crypto::command_icv(self.keys.enc(), self.counter);
                wrapped.data = Some(crypto::encrypt_cbc(self.keys.enc(), &icv, data));
            }
        }

        if self.security_level.command_mac {
            self.mac_command(&wrapped)
        } else {
            Ok(wrapped)
        }
    }

    fn unwrap(
        &mut self,
        command: &Command,
        response: Response,
    ) -> Result<Response, SecureChannelError> {
        if !self.established {
            return Err(SecureChannelError::NotEstablished);
        }
        if SelectCommand::is_select(command) || !self.security_level.response_mac {
            return Ok(response);
        }

        let (data, status) = response.into_parts();

        // Error responses carry no R-MAC
        if data.is_empty() && !status.is_success() {
            return Ok(Response::status_only(status));
        }
        if data.len() < scp03::MAC_LENGTH {
            return Err(SecureChannelError::InvalidResponse(
                "response shorter than its R-MAC",
            ));
        }

        let (body, mac) = data.split_at(data.len() - scp03::MAC_LENGTH);

        let mut mac_input = BytesMut::with_capacity(scp03::BLOCK_LENGTH + body.len() + 2);
        mac_input.put_slice(&self.chaining);
        mac_input.put_slice(body);
        mac_input.put_slice(&status.to_bytes());

        if !crypto::verify_mac(self.keys.rmac(), &mac_input, mac) {
            warn!(counter = self.counter, "R-MAC verification failed");
            return Err(SecureChannelError::MacMismatch);
        }

        let body = if self.security_level.response_encryption && !body.is_empty() {
            let icv = crypto::response_icv(self.keys.enc(), self.counter);
            crypto::decrypt_cbc(self.keys.enc(), &icv, body).ok_or(SecureChannelError::Padding)?
        } else {
            Bytes::copy_from_slice(body)
        };

        Ok(Response::new(body, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::InitializeUpdateResponse;
    use crate::constants::{derivation, ins};
    use hex_literal::hex;

    const KEY: [u8; 16] = hex!("404142434445464748494A4B4C4D4E4F");
    const HOST_CHALLENGE: [u8; 8] = hex!("0001020304050607");
    const CARD_CHALLENGE: [u8; 8] = hex!("1011121314151617");

    /// Card side of an SCP03 session, enough to echo protected data back
    struct Card {
        keys: StaticKeys,
        session: Option<SessionKeys>,
        level: SecurityLevel,
        chaining: [u8; 16],
        counter: u64,
        scp_identifier: u8,
        context: Vec<u8>,
    }

    impl Card {
        fn new() -> Self {
            Self {
                keys: StaticKeys::from_single_key(KEY),
                session: None,
                level: SecurityLevel::none(),
                chaining: [0u8; 16],
                counter: 0,
                scp_identifier: scp03::IDENTIFIER,
                context: Vec::new(),
            }
        }

        fn check_mac(&mut self, command: &Command) -> Bytes {
            let session = self.session.as_ref().unwrap();
            let data = command.data.clone().unwrap();
            let (body, mac) = data.split_at(data.len() - 8);

            let lc = codec::lc_field(data.len(), codec::is_extended(data.len(), command.le)).unwrap();
            let header = [command.cla, command.ins, command.p1, command.p2];
            let input = [&self.chaining[..], &header[..], &lc[..], body].concat();
            let expected = crypto::cmac(session.mac(), &input);
            assert_eq!(&expected[..8], mac, "C-MAC mismatch");
            self.chaining = expected;
            Bytes::copy_from_slice(body)
        }

        fn respond(&mut self, command: &Command) -> Response {
            match command.ins {
                ins::INITIALIZE_UPDATE => {
                    let host_challenge = command.data.as_deref().unwrap();
                    let context = [host_challenge, &CARD_CHALLENGE[..]].concat();
                    let session = SessionKeys::derive(&self.keys, &context);
                    let response = InitializeUpdateResponse {
                        key_diversification_data: [0u8; 10],
                        key_version: 0x30,
                        scp_identifier: self.scp_identifier,
                        scp_parameter: 0x70,
                        card_challenge: CARD_CHALLENGE,
                        card_cryptogram: session.card_cryptogram(&context),
                        sequence_counter: None,
                    };
                    self.session = Some(session);
                    self.context = context;
                    self.chaining = [0u8; 16];
                    Response::success(response.to_bytes())
                }
                ins::EXTERNAL_AUTHENTICATE => {
                    assert_eq!(command.cla, cla::MAC);
                    let cryptogram = self.check_mac(command);
                    let expected = crypto::derive_cryptogram(
                        self.session.as_ref().unwrap().mac(),
                        derivation::HOST_CRYPTOGRAM,
                        &self.context,
                    );
                    if cryptogram.as_ref() != expected.as_slice() {
                        return Response::status_only(status::SW_SECURITY_STATUS_NOT_SATISFIED);
                    }
                    self.level = SecurityLevel::from_bits(command.p1).unwrap();
                    Response::success(Vec::new())
                }
                ins::SELECT => {
                    assert_eq!(command.cla, 0x00, "SELECT must stay in the clear");
                    Response::success(Vec::new())
                }
                _ => self.echo(command),
            }
        }

        fn echo(&mut self, command: &Command) -> Response {
            self.counter += 1;
            let session = self.session.clone().unwrap();

            let mut data = if self.level.command_mac {
                self.check_mac(command)
            } else {
                command.data.clone().unwrap_or_default()
            };
            if self.level.command_encryption && !data.is_empty() {
                let icv = crypto::command_icv(session.enc(), self.counter);
                data = crypto::decrypt_cbc(session.enc(), &icv, &data).unwrap();
            }

            if data.as_ref() == b"fail" {
                return Response::status_only(status::SW_FILE_NOT_FOUND);
            }

            let mut body = data.to_vec();
            if self.level.response_encryption && !body.is_empty() {
                let icv = crypto::response_icv(session.enc(), self.counter);
                body = crypto::encrypt_cbc(session.enc(), &icv, &body).to_vec();
            }
            if self.level.response_mac {
                let input = [&self.chaining[..], &body[..], &[0x90, 0x00][..]].concat();
                let mac = crypto::cmac(session.rmac(), &input);
                body.extend_from_slice(&mac[..8]);
            }
            Response::success(body)
        }
    }

    fn open(card: &mut Card, level: SecurityLevel) -> Result<Scp03Channel, SecureChannelError> {
        Scp03Channel::establish_with_challenge(
            &StaticKeys::from_single_key(KEY),
            level,
            HOST_CHALLENGE,
            |command| Ok(card.respond(command)),
        )
    }

    fn exchange(channel: &mut Scp03Channel, card: &mut Card, command: &Command) -> Response {
        let wrapped = channel.wrap(command).unwrap();
        let response = card.respond(&wrapped);
        channel.unwrap(command, response).unwrap()
    }

    #[test]
    fn test_handshake_and_full_protection() {
        let mut card = Card::new();
        let mut channel = open(&mut card, SecurityLevel::full()).unwrap();
        assert!(channel.is_established());
        assert_eq!(card.level, SecurityLevel::full());

        // Several commands keep both MAC chains and counters in step
        let payloads: [&[u8]; 3] = [b"hello", &[0xAB; 16], &[0x01; 300]];
        for payload in payloads {
            let command = Command::new_with_data_and_le(0x80, 0x02, 0x00, 0x00, payload.to_vec(), 256);
            let response = exchange(&mut channel, &mut card, &command);
            assert!(response.is_success());
            assert_eq!(response.data().as_ref(), payload);
        }
        assert_eq!(channel.counter(), 3);
    }

    #[test]
    fn test_mac_only_leaves_data_readable() {
        let mut card = Card::new();
        let mut channel = open(&mut card, SecurityLevel::mac()).unwrap();

        let command = Command::new_with_data(0x80, 0x04, 0x00, 0x27, b"plain".to_vec());
        let wrapped = channel.wrap(&command).unwrap();
        assert_eq!(wrapped.cla, 0x84);
        assert_eq!(&wrapped.data.as_deref().unwrap()[..5], b"plain");
        assert_eq!(wrapped.data.as_ref().map(Bytes::len), Some(13));

        let response = card.respond(&wrapped);
        assert_eq!(channel.unwrap(&command, response).unwrap().data().as_ref(), b"plain");
    }

    #[test]
    fn test_error_status_passes_through() {
        let mut card = Card::new();
        let mut channel = open(&mut card, SecurityLevel::full()).unwrap();

        let command = Command::new_with_data(0x80, 0x02, 0x00, 0x00, b"fail".to_vec());
        let response = exchange(&mut channel, &mut card, &command);
        assert_eq!(response.status(), status::SW_FILE_NOT_FOUND);
        assert!(response.data().is_empty());
    }

    #[test]
    fn test_select_is_not_wrapped() {
        let mut card = Card::new();
        let mut channel = open(&mut card, SecurityLevel::full()).unwrap();

        let select = SelectCommand::by_aid(hex!("A000000396").to_vec()).to_command();
        assert_eq!(channel.wrap(&select).unwrap(), select);
        assert_eq!(channel.counter(), 0);
    }

    #[test]
    fn test_tampered_response_is_rejected() {
        let mut card = Card::new();
        let mut channel = open(&mut card, SecurityLevel::full()).unwrap();

        let command = Command::new_with_data(0x80, 0x02, 0x00, 0x00, b"data".to_vec());
        let response = card.respond(&channel.wrap(&command).unwrap());
        let mut tampered = response.data().to_vec();
        tampered[0] ^= 0x01;

        let err = channel
            .unwrap(&command, Response::new(tampered, response.status()))
            .unwrap_err();
        assert!(matches!(err, SecureChannelError::MacMismatch));

        let err = channel
            .unwrap(&command, Response::success(vec![0x01, 0x02]))
            .unwrap_err();
        assert!(matches!(err, SecureChannelError::InvalidResponse(_)));
    }

    #[test]
    fn test_handshake_failures() {
        // Wrong static keys: the card cryptogram does not verify
        let mut card = Card::new();
        card.keys = StaticKeys::from_single_key([0x11; 16]);
        let err = open(&mut card, SecurityLevel::full()).unwrap_err();
        assert!(matches!(err, SecureChannelError::AuthenticationFailed(_)));

        let mut card = Card::new();
        card.scp_identifier = 0x02;
        let err = open(&mut card, SecurityLevel::full()).unwrap_err();
        assert!(matches!(err, SecureChannelError::UnsupportedProtocol(0x02)));

        // The card refuses INITIALIZE UPDATE altogether
        let err = Scp03Channel::establish(
            &StaticKeys::from_single_key(KEY),
            SecurityLevel::mac(),
            |_| Ok(Response::status_only(status::SW_CONDITIONS_NOT_SATISFIED)),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SecureChannelError::Rejected(sw) if sw == status::SW_CONDITIONS_NOT_SATISFIED
        ));

        // Transport failures surface unchanged
        let err = Scp03Channel::establish(
            &StaticKeys::from_single_key(KEY),
            SecurityLevel::mac(),
            |_| Err(TransportError::ConnectionLost.into()),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SecureChannelError::Transport(TransportError::ConnectionLost)
        ));
    }
}
