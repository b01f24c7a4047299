//! Configuration options for the socket transport

use std::time::Duration;

/// Default time allowed for the TCP connection to be established
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time allowed for a frame to be written
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration options for the socket transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketConfig {
    /// Time allowed for the TCP connection to be established
    pub connect_timeout: Duration,

    /// Time allowed for a frame to be written, `None` to block
    pub write_timeout: Option<Duration>,

    /// Disable Nagle's algorithm so small frames go out immediately
    pub nodelay: bool,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            write_timeout: Some(DEFAULT_WRITE_TIMEOUT),
            nodelay: true,
        }
    }
}

impl SocketConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect timeout
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the write timeout
    pub const fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set whether `TCP_NODELAY` is enabled
    pub const fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }
}
