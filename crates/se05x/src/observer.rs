//! Structured session events
//!
//! Sessions report what they do through a [`SessionObserver`] instead of
//! printing. The default [`TracingObserver`] forwards every event to
//! `tracing`.

use bytes::Bytes;
use seclink_apdu_core::prelude::*;
use tracing::{debug, info, trace, warn};

use crate::session::SessionId;

/// Something a session did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session is ready for commands
    Opened,
    /// A command is about to be sent, header shown before protection
    CommandIssued {
        /// Class byte
        cla: u8,
        /// Instruction byte
        ins: u8,
        /// Parameter 1
        p1: u8,
        /// Parameter 2
        p2: u8,
    },
    /// A response arrived with this status word
    StatusReceived(StatusWord),
    /// An applet was selected
    AppletSelected {
        /// AID of the applet
        aid: Bytes,
    },
    /// A select was answered from the cached response
    SelectSkipped {
        /// AID of the applet
        aid: Bytes,
    },
    /// GET VERSION is unsupported and the version is read from SELECT instead
    FallbackTriggered,
    /// An authenticated secure channel is now protecting commands
    SecureChannelEstablished {
        /// Negotiated protection
        level: SecurityLevel,
    },
    /// Selecting an applet ended the secure channel; commands go out in the clear
    SecureChannelEnded,
    /// A transport or secure channel failure ended the session
    Invalidated {
        /// Description of the failure
        reason: String,
    },
    /// The transport was released
    Closed,
}

/// Receives the events of every session it is attached to
pub trait SessionObserver: Send {
    /// Handle one event of `session`
    fn on_event(&self, session: SessionId, event: &SessionEvent);
}

/// Observer forwarding events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn on_event(&self, session: SessionId, event: &SessionEvent) {
        match event {
            SessionEvent::Opened => debug!(%session, "Session opened"),
            SessionEvent::CommandIssued { cla, ins, p1, p2 } => trace!(
                %session,
                header = %hex::encode([*cla, *ins, *p1, *p2]),
                "Command issued"
            ),
            SessionEvent::StatusReceived(status) => trace!(%session, %status, "Status received"),
            SessionEvent::AppletSelected { aid } => {
                debug!(%session, aid = %hex::encode(aid), "Applet selected")
            }
            SessionEvent::SelectSkipped { aid } => {
                trace!(%session, aid = %hex::encode(aid), "Applet already selected")
            }
            SessionEvent::FallbackTriggered => info!(
                %session,
                "GET VERSION unsupported, reading version from SELECT response"
            ),
            SessionEvent::SecureChannelEstablished { level } => {
                debug!(%session, level = level.bits(), "Secure channel established")
            }
            SessionEvent::SecureChannelEnded => {
                info!(%session, "Secure channel ended by applet selection")
            }
            SessionEvent::Invalidated { reason } => warn!(%session, %reason, "Session invalidated"),
            SessionEvent::Closed => debug!(%session, "Session closed"),
        }
    }
}
