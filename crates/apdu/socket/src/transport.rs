//! Socket transport implementation

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use bytes::{BufMut, Bytes, BytesMut};
use seclink_apdu_core::prelude::*;
use tracing::{debug, trace, warn};

use crate::{config::SocketConfig, error::SocketError};

/// Message type carrying an APDU or its response
pub const MESSAGE_TYPE_APDU: u8 = 0x01;
/// Node address of the secure element behind the simulator
pub const NODE_ADDRESS: u8 = 0x00;
/// Length of the frame header
pub const HEADER_LENGTH: usize = 4;

/// Largest payload a header can announce
const MAX_PAYLOAD: usize = u16::MAX as usize;

// Read timeouts of zero are rejected by the OS
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

// Longest wait a receive deadline is computed for
const MAX_READ_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Transport implementation over a TCP connection to a simulator
pub struct SocketTransport {
    /// Connection, `None` once closed
    stream: Option<TcpStream>,
    /// Remote peer
    peer: SocketAddr,
    /// Configuration
    config: SocketConfig,
}

impl fmt::Debug for SocketTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketTransport")
            .field("peer", &self.peer)
            .field("connected", &self.stream.is_some())
            .field("config", &self.config)
            .finish()
    }
}

enum ReadFailure {
    /// Peer closed after this many bytes
    Eof(usize),
    /// Read failed after this many bytes
    Io(usize, io::Error),
}

impl SocketTransport {
    /// Connect to a simulator listening on `address` (`host:port`)
    pub fn connect(address: &str, config: SocketConfig) -> Result<Self, SocketError> {
        let candidates = address
            .to_socket_addrs()
            .map_err(|_| SocketError::AddressResolution(address.to_string()))?;

        let mut last_error = None;
        for peer in candidates {
            match TcpStream::connect_timeout(&peer, config.connect_timeout) {
                Ok(stream) => return Self::from_stream(stream, config),
                Err(err) => {
                    debug!(%peer, error = %err, "Connection attempt failed");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.map_or_else(
            || SocketError::AddressResolution(address.to_string()),
            SocketError::Io,
        ))
    }

    /// Wrap an already connected stream
    pub fn from_stream(stream: TcpStream, config: SocketConfig) -> Result<Self, SocketError> {
        stream.set_nodelay(config.nodelay)?;
        stream.set_write_timeout(config.write_timeout)?;
        let peer = stream.peer_addr()?;
        debug!(%peer, "Socket transport connected");

        Ok(Self {
            stream: Some(stream),
            peer,
            config,
        })
    }

    /// Address of the simulator
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    fn stream(&mut self) -> Result<&mut TcpStream, TransportError> {
        self.stream.as_mut().ok_or(TransportError::ConnectionLost)
    }

    /// Fill `buffer`, giving up once `deadline` has passed
    ///
    /// Each read waits only for what is left of the deadline, so a peer
    /// trickling bytes cannot stretch the receive past it.
    fn read_full(
        stream: &mut TcpStream,
        buffer: &mut [u8],
        deadline: Instant,
    ) -> Result<(), ReadFailure> {
        let mut received = 0;
        while received < buffer.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ReadFailure::Io(received, io::ErrorKind::TimedOut.into()));
            }
            stream
                .set_read_timeout(Some(remaining.max(MIN_READ_TIMEOUT)))
                .map_err(|err| ReadFailure::Io(received, err))?;

            match stream.read(&mut buffer[received..]) {
                Ok(0) => return Err(ReadFailure::Eof(received)),
                Ok(n) => received += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(ReadFailure::Io(received, err)),
            }
        }
        Ok(())
    }

    fn map_read_failure(failure: ReadFailure, expected: usize, timeout: Duration) -> TransportError {
        match failure {
            ReadFailure::Eof(received) => TransportError::ShortRead { expected, received },
            ReadFailure::Io(_, err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                TransportError::Timeout(timeout)
            }
            ReadFailure::Io(received, err) => {
                debug!(error = %err, received, "Socket read failed");
                TransportError::ConnectionLost
            }
        }
    }
}

impl CardTransport for SocketTransport {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        if frame.len() > MAX_PAYLOAD {
            warn!(length = frame.len(), "Frame too large for socket header");
            return Err(TransportError::FrameTooLarge {
                length: frame.len(),
                limit: MAX_PAYLOAD,
            });
        }

        let mut message = BytesMut::with_capacity(HEADER_LENGTH + frame.len());
        message.put_u8(MESSAGE_TYPE_APDU);
        message.put_u8(NODE_ADDRESS);
        message.put_u16(frame.len() as u16);
        message.put_slice(frame);

        let stream = self.stream()?;
        stream.write_all(&message).and_then(|()| stream.flush()).map_err(|err| {
            debug!(error = %err, "Socket write failed");
            TransportError::ConnectionLost
        })
    }

    fn receive(&mut self, timeout: Duration) -> Result<Bytes, TransportError> {
        let deadline = Instant::now() + timeout.min(MAX_READ_TIMEOUT);
        let stream = self.stream()?;

        let mut header = [0u8; HEADER_LENGTH];
        Self::read_full(stream, &mut header, deadline).map_err(|failure| match failure {
            ReadFailure::Eof(0) => TransportError::ConnectionLost,
            other => Self::map_read_failure(other, HEADER_LENGTH, timeout),
        })?;

        if header[0] != MESSAGE_TYPE_APDU {
            debug!(message_type = header[0], "Unexpected message type from simulator");
        }

        let length = u16::from_be_bytes([header[2], header[3]]) as usize;
        let mut payload = vec![0u8; length];
        Self::read_full(stream, &mut payload, deadline)
            .map_err(|failure| Self::map_read_failure(failure, length, timeout))?;

        trace!(length, "Received socket frame");
        Ok(payload.into())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            debug!(peer = %self.peer, "Socket transport closed");
        }
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        self.close();
    }
}
