//! Simulated SE05x chip shared by the integration tests
//!
//! The chip answers the applet commands from an in-memory object store and
//! runs the card side of SCP03, so sessions can be exercised end to end
//! without hardware.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use hex_literal::hex;
use seclink_apdu_core::codec;
use seclink_apdu_core::prelude::*;
use seclink_apdu_globalplatform::constants::{cla, derivation, ins as gp_ins, scp03};
use seclink_apdu_globalplatform::{InitializeUpdateResponse, SessionKeys, StaticKeys, crypto};
use seclink_se05x::constants::IOT_APPLET_AID;
use seclink_se05x::{
    ConnectError, ConnectString, ReservedObject, SessionEvent, SessionId, SessionObserver,
    TransportFactory,
};
use tracing_subscriber::EnvFilter;

pub const KEY: [u8; 16] = hex!("404142434445464748494A4B4C4D4E4F");
pub const UNIQUE_ID: [u8; 18] = hex!("04005001 A1B2C3D4E5F60718 29303132 4142");
pub const VERSION: [u8; 7] = hex!("03030102000001");
const CARD_CHALLENGE: [u8; 8] = hex!("C0C1C2C3C4C5C6C7");

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Card side of an SCP03 session
#[derive(Debug)]
pub struct CardChannel {
    keys: SessionKeys,
    context: Vec<u8>,
    level: SecurityLevel,
    chaining: [u8; 16],
    pub counter: u64,
    established: bool,
}

/// Everything the chip knows, shared between the transport and the test
#[derive(Debug)]
pub struct ChipState {
    pub objects: HashMap<u32, Vec<u8>>,
    pub version: [u8; 7],
    /// Answer GET VERSION with this status word instead of the version
    pub get_version_status: Option<u16>,
    /// Data returned by SELECT, the version record when unset
    pub select_response: Option<Vec<u8>>,
    /// Answer every existence check with this status word
    pub exists_status: Option<u16>,
    /// Answer every read with this status word
    pub read_status: Option<u16>,
    pub keys: StaticKeys,
    pub channel: Option<CardChannel>,
    /// Every frame received, exactly as sent on the wire
    pub frames: Vec<Bytes>,
    pub closed: bool,
    /// Fail the next receive with this error
    pub fail_receive: Option<TransportError>,
    /// Flip a bit in every R-MAC
    pub corrupt_rmac: bool,
}

impl Default for ChipState {
    fn default() -> Self {
        let mut objects = HashMap::new();
        objects.insert(ReservedObject::UniqueId.id().value(), UNIQUE_ID.to_vec());
        Self {
            objects,
            version: VERSION,
            get_version_status: None,
            select_response: None,
            exists_status: None,
            read_status: None,
            keys: StaticKeys::from_single_key(KEY),
            channel: None,
            frames: Vec::new(),
            closed: false,
            fail_receive: None,
            corrupt_rmac: false,
        }
    }
}

fn status_only(sw: u16) -> Response {
    Response::status_only(StatusWord::from_u16(sw))
}

/// Encode a TLV with a BER length
pub fn tlv(tag: u8, value: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    match value.len() {
        len @ 0..=0x7F => out.push(len as u8),
        len @ 0x80..=0xFF => out.extend_from_slice(&[0x81, len as u8]),
        len => {
            out.push(0x82);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        }
    }
    out.extend_from_slice(value);
    out
}

/// Split command data into short TLVs
fn parse_tlvs(mut data: &[u8]) -> HashMap<u8, Vec<u8>> {
    let mut tlvs = HashMap::new();
    while let [tag, len, rest @ ..] = data {
        let len = *len as usize;
        tlvs.insert(*tag, rest[..len].to_vec());
        data = &rest[len..];
    }
    tlvs
}

impl ChipState {
    pub fn respond(&mut self, frame: &[u8]) -> Response {
        let Ok(command) = codec::parse_command(frame) else {
            return status_only(0x6700);
        };

        match (command.cla, command.ins) {
            (cla::ISO7816, gp_ins::SELECT) => self.select(&command),
            (cla::GP, gp_ins::INITIALIZE_UPDATE) => self.initialize_update(&command),
            (cla::MAC, gp_ins::EXTERNAL_AUTHENTICATE) => self.external_authenticate(&command),
            _ => self.applet_command(command),
        }
    }

    fn select(&mut self, command: &Command) -> Response {
        if command.data.as_deref() != Some(&IOT_APPLET_AID[..]) {
            return status_only(0x6A82);
        }
        // Selecting the applet ends any secure channel session
        self.channel = None;
        let data = self
            .select_response
            .clone()
            .unwrap_or_else(|| self.version.to_vec());
        Response::success(data)
    }

    fn initialize_update(&mut self, command: &Command) -> Response {
        let host_challenge = command.data.clone().unwrap_or_default();
        let context = [&host_challenge[..], &CARD_CHALLENGE[..]].concat();
        let keys = SessionKeys::derive(&self.keys, &context);

        let response = InitializeUpdateResponse {
            key_diversification_data: [0x11; 10],
            key_version: 0x01,
            scp_identifier: scp03::IDENTIFIER,
            scp_parameter: 0x00,
            card_challenge: CARD_CHALLENGE,
            card_cryptogram: keys.card_cryptogram(&context),
            sequence_counter: None,
        };
        self.channel = Some(CardChannel {
            keys,
            context,
            level: SecurityLevel::none(),
            chaining: [0u8; 16],
            counter: 0,
            established: false,
        });
        Response::success(response.to_bytes())
    }

    fn external_authenticate(&mut self, command: &Command) -> Response {
        let Some(channel) = self.channel.as_mut() else {
            return status_only(0x6985);
        };
        let Some(cryptogram) = channel.check_mac(command) else {
            self.channel = None;
            return status_only(0x6982);
        };

        let expected = crypto::derive_cryptogram(
            channel.keys.mac(),
            derivation::HOST_CRYPTOGRAM,
            &channel.context,
        );
        match SecurityLevel::from_bits(command.p1) {
            Some(level) if cryptogram.as_ref() == expected.as_slice() => {
                channel.level = level;
                channel.established = true;
                Response::success(Vec::new())
            }
            _ => {
                self.channel = None;
                status_only(0x6982)
            }
        }
    }

    fn applet_command(&mut self, mut command: Command) -> Response {
        let protected = self.channel.as_ref().is_some_and(|channel| channel.established);
        if protected {
            let Some(data) = self.channel.as_mut().and_then(|channel| channel.open(&command)) else {
                return status_only(0x6982);
            };
            command.cla &= !cla::SECURE_MESSAGING;
            command.data = (!data.is_empty()).then_some(data);
        }

        let response = self.process(&command);

        let corrupt = self.corrupt_rmac;
        match self.channel.as_mut() {
            Some(channel) if protected => channel.protect(response, corrupt),
            _ => response,
        }
    }

    fn process(&mut self, command: &Command) -> Response {
        let tlvs = parse_tlvs(command.data.as_deref().unwrap_or(&[]));
        let object_id = tlvs
            .get(&0x41)
            .and_then(|id| <[u8; 4]>::try_from(id.as_slice()).ok())
            .map(u32::from_be_bytes);

        match (command.cla, command.ins, command.p2) {
            (0x80, 0x04, 0x20) => match self.get_version_status {
                Some(sw) => status_only(sw),
                None => Response::success(tlv(0x41, &self.version)),
            },
            (0x80, 0x04, 0x27) => match (self.exists_status, object_id) {
                (Some(sw), _) => status_only(sw),
                (None, Some(id)) => {
                    let result = if self.objects.contains_key(&id) { 0x01 } else { 0x02 };
                    Response::success(tlv(0x41, &[result]))
                }
                (None, None) => status_only(0x6A80),
            },
            (0x80, 0x02, 0x00) => {
                if let Some(sw) = self.read_status {
                    return status_only(sw);
                }
                let Some(object) = object_id.and_then(|id| self.objects.get(&id)) else {
                    return status_only(0x6A82);
                };
                let field = |tag: u8| {
                    tlvs.get(&tag)
                        .map_or(0, |value: &Vec<u8>| u16::from_be_bytes([value[0], value[1]]) as usize)
                };
                let offset = field(0x42).min(object.len());
                let end = match field(0x43) {
                    0 => object.len(),
                    length => (offset + length).min(object.len()),
                };
                Response::success(tlv(0x41, &object[offset..end]))
            }
            _ => status_only(0x6D00),
        }
    }
}

impl CardChannel {
    /// Verify and strip the C-MAC, advancing the chaining value
    fn check_mac(&mut self, command: &Command) -> Option<Bytes> {
        let data = command.data.clone()?;
        if data.len() < scp03::MAC_LENGTH {
            return None;
        }
        let (body, mac) = data.split_at(data.len() - scp03::MAC_LENGTH);

        let lc = codec::lc_field(data.len(), codec::is_extended(data.len(), command.le)).ok()?;
        let header = [command.cla, command.ins, command.p1, command.p2];
        let input = [&self.chaining[..], &header[..], &lc[..], body].concat();
        let expected = crypto::cmac(self.keys.mac(), &input);
        if &expected[..scp03::MAC_LENGTH] != mac {
            return None;
        }
        self.chaining = expected;
        Some(Bytes::copy_from_slice(body))
    }

    /// Remove command protection, returning the plain data
    fn open(&mut self, command: &Command) -> Option<Bytes> {
        self.counter += 1;
        let mut data = if self.level.command_mac {
            if command.cla & cla::SECURE_MESSAGING == 0 {
                return None;
            }
            self.check_mac(command)?
        } else {
            command.data.clone().unwrap_or_default()
        };
        if self.level.command_encryption && !data.is_empty() {
            let icv = crypto::command_icv(self.keys.enc(), self.counter);
            data = crypto::decrypt_cbc(self.keys.enc(), &icv, &data)?;
        }
        Some(data)
    }

    /// Add response protection
    fn protect(&self, response: Response, corrupt: bool) -> Response {
        let (data, status) = response.into_parts();
        if !self.level.response_mac || (data.is_empty() && !status.is_success()) {
            return Response::new(data, status);
        }

        let mut body = data.to_vec();
        if self.level.response_encryption && !body.is_empty() {
            let icv = crypto::response_icv(self.keys.enc(), self.counter);
            body = crypto::encrypt_cbc(self.keys.enc(), &icv, &body).to_vec();
        }
        let input = [&self.chaining[..], &body[..], &status.to_bytes()[..]].concat();
        let mut mac = crypto::cmac(self.keys.rmac(), &input);
        if corrupt {
            mac[0] ^= 0x01;
        }
        body.extend_from_slice(&mac[..scp03::MAC_LENGTH]);
        Response::new(body, status)
    }
}

/// Transport end of the simulated chip
#[derive(Debug)]
pub struct SimulatedChip {
    state: Arc<Mutex<ChipState>>,
    pending: Option<Bytes>,
}

/// Test side view of a simulated chip
#[derive(Debug, Clone)]
pub struct ChipHandle(Arc<Mutex<ChipState>>);

impl ChipHandle {
    pub fn state(&self) -> MutexGuard<'_, ChipState> {
        self.0.lock().unwrap()
    }

    pub fn frames(&self) -> Vec<Bytes> {
        self.state().frames.clone()
    }

    pub fn frame_count(&self) -> usize {
        self.state().frames.len()
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

pub fn chip(state: ChipState) -> (SimulatedChip, ChipHandle) {
    let state = Arc::new(Mutex::new(state));
    (
        SimulatedChip {
            state: state.clone(),
            pending: None,
        },
        ChipHandle(state),
    )
}

impl CardTransport for SimulatedChip {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(TransportError::ConnectionLost);
        }
        state.frames.push(Bytes::copy_from_slice(frame));
        self.pending = Some(state.respond(frame).to_bytes());
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Bytes, TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(TransportError::ConnectionLost);
        }
        if let Some(err) = state.fail_receive.take() {
            self.pending = None;
            return Err(err);
        }
        self.pending.take().ok_or(TransportError::Timeout(timeout))
    }

    fn is_connected(&self) -> bool {
        !self.state.lock().unwrap().closed
    }

    fn close(&mut self) {
        self.state.lock().unwrap().closed = true;
    }
}

/// Factory handing out one simulated chip
#[derive(Debug)]
pub struct ChipFactory {
    chip: Mutex<Option<SimulatedChip>>,
    pub requested: Mutex<Vec<ConnectString>>,
}

impl ChipFactory {
    pub fn new(chip: SimulatedChip) -> Self {
        Self {
            chip: Mutex::new(Some(chip)),
            requested: Mutex::new(Vec::new()),
        }
    }
}

impl TransportFactory for ChipFactory {
    type Transport = SimulatedChip;

    fn create(&self, connect_string: &ConnectString) -> Result<SimulatedChip, ConnectError> {
        self.requested.lock().unwrap().push(connect_string.clone());
        self.chip
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ConnectError::TransportUnavailable("chip already taken".into()))
    }
}

/// Observer keeping every event for later assertions
#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<SessionEvent>>>);

impl Recorder {
    pub fn events(&self) -> Vec<SessionEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &SessionEvent) -> usize {
        self.events().iter().filter(|seen| *seen == event).count()
    }
}

impl SessionObserver for Recorder {
    fn on_event(&self, _session: SessionId, event: &SessionEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}
