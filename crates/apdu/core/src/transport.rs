//! Card transport abstraction
//!
//! A transport moves opaque frames to and from the device. It knows nothing
//! about APDU framing, status words or secure messaging. One exchange is in
//! flight at a time: `send` is always followed by `receive`.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, instrument, trace};

use crate::error::TransportError;

/// Byte-level link to a secure element
pub trait CardTransport: fmt::Debug + Send {
    /// Send one raw frame to the device
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError>;

    /// Receive one raw frame, waiting at most `timeout`
    fn receive(&mut self, timeout: Duration) -> Result<Bytes, TransportError>;

    /// Whether the link is currently usable
    fn is_connected(&self) -> bool;

    /// Release the link. Closing twice is a no-op.
    fn close(&mut self);

    /// Send a frame and wait for the matching response frame
    #[instrument(level = "trace", skip(self, frame), fields(transport = std::any::type_name::<Self>()))]
    fn transmit_raw(&mut self, frame: &[u8], timeout: Duration) -> Result<Bytes, TransportError> {
        trace!(command = %hex::encode(frame), "Transmitting raw frame");
        let response = self.send(frame).and_then(|()| self.receive(timeout));
        match &response {
            Ok(bytes) => trace!(response = %hex::encode(bytes), "Received raw frame"),
            Err(err) => debug!(error = %err, "Error during raw transmission"),
        }
        response
    }
}

impl<T: CardTransport + ?Sized> CardTransport for Box<T> {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        (**self).send(frame)
    }

    fn receive(&mut self, timeout: Duration) -> Result<Bytes, TransportError> {
        (**self).receive(timeout)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Scripted transport for tests
///
/// Responses are returned in the order they were queued. Every sent frame
/// is recorded so tests can assert on the exact bytes put on the wire.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: VecDeque<Result<Bytes, TransportError>>,
    sent: Vec<Bytes>,
    closed: bool,
}

impl MockTransport {
    /// Create a transport with no queued responses
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport answering once with `response`
    pub fn with_response(response: impl Into<Bytes>) -> Self {
        Self::new().then_respond(response)
    }

    /// Queue another response frame
    pub fn then_respond(mut self, response: impl Into<Bytes>) -> Self {
        self.responses.push_back(Ok(response.into()));
        self
    }

    /// Queue a transport failure
    pub fn then_fail(mut self, error: TransportError) -> Self {
        self.responses.push_back(Err(error));
        self
    }

    /// Queue another response frame on an existing transport
    pub fn push_response(&mut self, response: impl Into<Bytes>) {
        self.responses.push_back(Ok(response.into()));
    }

    /// Frames sent so far
    pub fn sent(&self) -> &[Bytes] {
        &self.sent
    }

    /// Number of queued responses not yet consumed
    pub fn pending(&self) -> usize {
        self.responses.len()
    }
}

impl CardTransport for MockTransport {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::ConnectionLost);
        }
        self.sent.push(Bytes::copy_from_slice(frame));
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Bytes, TransportError> {
        if self.closed {
            return Err(TransportError::ConnectionLost);
        }
        self.responses
            .pop_front()
            .unwrap_or(Err(TransportError::Timeout(timeout)))
    }

    fn is_connected(&self) -> bool {
        !self.closed
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
