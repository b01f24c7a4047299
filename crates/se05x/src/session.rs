//! Session lifecycle
//!
//! A [`Session`] owns one transport and moves through
//! `Opening -> Open -> Closed`. Every command goes through
//! [`Session::transmit`], which applies the active secure channel strategy.
//! Transport and secure channel failures close the session: a half finished
//! exchange may have left the card's counters out of step with ours, so
//! nothing is retried.

use std::collections::HashSet;
use std::fmt;

use bytes::Bytes;
use derive_more::{Display, From, Into};
use seclink_apdu_core::codec;
use seclink_apdu_core::prelude::*;
use seclink_apdu_globalplatform::{Scp03Channel, SelectCommand, StaticKeys};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::connect::{TransportFactory, resolve_connect_string};
use crate::error::{ChipError, ConnectError, Result};
use crate::observer::{SessionEvent, SessionObserver, TracingObserver};
use crate::status;
use crate::types::ObjectId;

/// Unique identifier of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Into)]
pub struct SessionId(Uuid);

impl SessionId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

/// Authentication state of an open session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthState {
    /// Commands travel unprotected
    Unauthenticated,
    /// An established secure channel protects commands
    SecureChannelEstablished,
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No transport; every command fails
    Closed,
    /// Transport acquired, setup still running
    Opening,
    /// Ready for commands
    Open(AuthState),
}

impl SessionState {
    /// Whether commands may be sent
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// A connection to one secure element
pub struct Session<T: CardTransport> {
    id: SessionId,
    transport: Option<T>,
    state: SessionState,
    channel: Box<dyn SecureChannel>,
    /// Selected applet and its SELECT response
    selected: Option<(Bytes, Bytes)>,
    /// Objects the card reported missing since the last select
    missing: HashSet<ObjectId>,
    config: SessionConfig,
    observer: Box<dyn SessionObserver>,
}

impl<T: CardTransport> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("channel", &self.channel)
            .field(
                "selected",
                &self.selected.as_ref().map(|(aid, _)| hex::encode(aid)),
            )
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

impl<T: CardTransport> Session<T> {
    fn with_state(
        transport: T,
        config: SessionConfig,
        observer: Box<dyn SessionObserver>,
        state: SessionState,
    ) -> Self {
        Self {
            id: SessionId::generate(),
            transport: Some(transport),
            state,
            channel: Box::new(PlainChannel),
            selected: None,
            missing: HashSet::new(),
            config,
            observer,
        }
    }

    /// Open a session on the link named by `connect_string`
    ///
    /// Without a connect string, `SE05X_PORT` and then the local simulator
    /// address are used. When [`SessionConfig::select_on_open`] is set the
    /// applet is selected before the session is handed out; if that fails the
    /// transport is released and [`ConnectError::Setup`] is returned.
    pub fn open<F>(
        factory: &F,
        connect_string: Option<&str>,
        config: SessionConfig,
    ) -> std::result::Result<Self, ConnectError>
    where
        F: TransportFactory<Transport = T>,
    {
        Self::open_with_observer(factory, connect_string, config, Box::new(TracingObserver))
    }

    /// Open a session reporting its events to `observer`
    pub fn open_with_observer<F>(
        factory: &F,
        connect_string: Option<&str>,
        config: SessionConfig,
        observer: Box<dyn SessionObserver>,
    ) -> std::result::Result<Self, ConnectError>
    where
        F: TransportFactory<Transport = T>,
    {
        let connect_string = resolve_connect_string(connect_string)?;
        debug!(%connect_string, kind = connect_string.kind(), "Opening session");
        let transport = factory.create(&connect_string)?;

        let mut session = Self::with_state(transport, config, observer, SessionState::Opening);
        if session.config.select_on_open {
            let applet = session.config.applet.clone();
            if let Err(err) = session.select_applet(applet, false) {
                session.close();
                return Err(ConnectError::Setup(err));
            }
        }

        session.state = SessionState::Open(AuthState::Unauthenticated);
        session.emit(SessionEvent::Opened);
        Ok(session)
    }

    /// Adopt an already connected transport without talking to the card
    pub fn from_transport(transport: T, config: SessionConfig) -> Self {
        Self::from_transport_with_observer(transport, config, Box::new(TracingObserver))
    }

    /// Adopt a transport, reporting events to `observer`
    pub fn from_transport_with_observer(
        transport: T,
        config: SessionConfig,
        observer: Box<dyn SessionObserver>,
    ) -> Self {
        let session = Self::with_state(
            transport,
            config,
            observer,
            SessionState::Open(AuthState::Unauthenticated),
        );
        session.emit(SessionEvent::Opened);
        session
    }

    /// Session identifier
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Lifecycle state
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Authentication state, `None` unless the session is open
    pub const fn auth_state(&self) -> Option<AuthState> {
        match self.state {
            SessionState::Open(auth) => Some(auth),
            _ => None,
        }
    }

    /// Protection applied by the active secure channel
    pub fn security_level(&self) -> SecurityLevel {
        self.channel.security_level()
    }

    /// Configuration of this session
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// AID of the selected applet
    pub fn selected_applet(&self) -> Option<&Bytes> {
        self.selected.as_ref().map(|(aid, _)| aid)
    }

    /// The transport, `None` once released
    pub const fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        self.observer.on_event(self.id, &event);
    }

    /// Select an applet by AID
    ///
    /// With `skip_if_selected` set and the same applet already selected, the
    /// cached SELECT response is returned without talking to the card.
    /// A SELECT that reaches the card ends any secure channel, leaving the
    /// session unauthenticated.
    pub fn select_applet(&mut self, aid: impl Into<Bytes>, skip_if_selected: bool) -> Result<Bytes> {
        let aid = aid.into();

        let cached = self
            .selected
            .as_ref()
            .filter(|(selected, _)| skip_if_selected && *selected == aid)
            .map(|(_, response)| response.clone());
        if let Some(response) = cached {
            self.emit(SessionEvent::SelectSkipped { aid });
            return Ok(response);
        }

        // A failed SELECT leaves nothing selected on the card either
        self.selected = None;
        self.missing.clear();

        let command = SelectCommand::by_aid(aid.clone()).to_command();
        let response = status::check(self.transmit(&command)?)?;

        // The card drops its secure channel session on a successful SELECT
        if self.channel.is_established() {
            self.channel = Box::new(PlainChannel);
            self.state = SessionState::Open(AuthState::Unauthenticated);
            self.emit(SessionEvent::SecureChannelEnded);
        }

        self.selected = Some((aid.clone(), response.clone()));
        self.emit(SessionEvent::AppletSelected { aid });
        Ok(response)
    }

    /// Open an SCP03 secure channel and protect every later command with it
    ///
    /// The handshake runs over the raw link. Any failure closes the session.
    #[instrument(level = "debug", skip_all, fields(session = %self.id, level = level.bits()))]
    pub fn authenticate(&mut self, keys: &StaticKeys, level: SecurityLevel) -> Result<()> {
        if !self.state.is_active() {
            return Err(ChipError::SessionClosed);
        }

        let id = self.id;
        let timeout = self.config.response_timeout;
        let observer = &self.observer;
        let transport = self.transport.as_mut().ok_or(ChipError::SessionClosed)?;

        let established = Scp03Channel::establish(keys, level, |command| {
            observer.on_event(
                id,
                &SessionEvent::CommandIssued {
                    cla: command.cla,
                    ins: command.ins,
                    p1: command.p1,
                    p2: command.p2,
                },
            );
            let frame = codec::encode(command)?;
            let raw = transport.transmit_raw(&frame, timeout)?;
            let response = codec::decode(&raw)?;
            observer.on_event(id, &SessionEvent::StatusReceived(response.status()));
            Ok(response)
        });

        match established {
            Ok(channel) => {
                self.channel = Box::new(channel);
                self.state = SessionState::Open(AuthState::SecureChannelEstablished);
                self.emit(SessionEvent::SecureChannelEstablished { level });
                Ok(())
            }
            Err(err) => {
                let err = ChipError::SecureChannel(err);
                self.invalidate(&err);
                Err(err)
            }
        }
    }

    /// Replace the secure channel strategy
    pub fn install_channel(&mut self, channel: Box<dyn SecureChannel>) -> Result<()> {
        if !self.state.is_active() {
            return Err(ChipError::SessionClosed);
        }

        let auth = if channel.is_established() && !channel.security_level().is_none() {
            AuthState::SecureChannelEstablished
        } else {
            AuthState::Unauthenticated
        };
        debug!(session = %self.id, channel = ?channel, "Installing secure channel");
        self.channel = channel;
        if matches!(self.state, SessionState::Open(_)) {
            self.state = SessionState::Open(auth);
        }
        Ok(())
    }

    /// Send one command and return its response, whatever the status word
    #[instrument(level = "debug", skip_all, fields(session = %self.id, command = %command))]
    pub fn transmit(&mut self, command: &Command) -> Result<Response> {
        if !self.state.is_active() {
            return Err(ChipError::SessionClosed);
        }

        self.emit(SessionEvent::CommandIssued {
            cla: command.cla,
            ins: command.ins,
            p1: command.p1,
            p2: command.p2,
        });

        match self.exchange(command) {
            Ok(response) => {
                self.emit(SessionEvent::StatusReceived(response.status()));
                Ok(response)
            }
            Err(err) => {
                let broken = self.channel.is_established() && err.breaks_secure_channel();
                if err.invalidates_session() || broken {
                    self.invalidate(&err);
                }
                Err(err)
            }
        }
    }

    fn exchange(&mut self, command: &Command) -> Result<Response> {
        let timeout = self.config.response_timeout;
        let transport = self.transport.as_mut().ok_or(ChipError::SessionClosed)?;

        let wrapped = self.channel.wrap(command)?;
        let frame = codec::encode(&wrapped)?;
        let raw = transport.transmit_raw(&frame, timeout)?;
        let response = codec::decode(&raw)?;
        Ok(self.channel.unwrap(command, response)?)
    }

    /// Send a typed command and parse its response
    pub fn execute<C>(&mut self, command: &C) -> Result<C::Success>
    where
        C: ApduCommand<Error = ChipError>,
    {
        let response = self.transmit(&command.to_command())?;
        C::parse_response(response)
    }

    pub(crate) fn known_missing(&self, object_id: ObjectId) -> bool {
        self.missing.contains(&object_id)
    }

    pub(crate) fn record_existence(&mut self, object_id: ObjectId, exists: bool) {
        if exists {
            self.missing.remove(&object_id);
        } else {
            self.missing.insert(object_id);
        }
    }

    fn invalidate(&mut self, reason: &ChipError) {
        warn!(session = %self.id, error = %reason, "Invalidating session");
        self.emit(SessionEvent::Invalidated {
            reason: reason.to_string(),
        });
        self.close();
    }

    /// Release the transport. Closing a closed session does nothing.
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }

        if self.state.is_active() {
            self.state = SessionState::Closed;
            self.channel = Box::new(PlainChannel);
            self.selected = None;
            self.missing.clear();
            self.emit(SessionEvent::Closed);
        }
    }
}

impl<T: CardTransport> Drop for Session<T> {
    fn drop(&mut self) {
        self.close();
    }
}
