//! Session configuration

use std::time::Duration;

use bytes::Bytes;

use crate::constants::IOT_APPLET_AID;

/// Default time to wait for each response
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration options for a [`Session`](crate::Session)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// AID of the applet the session works with
    pub applet: Bytes,

    /// Time to wait for each response before the session is invalidated
    pub response_timeout: Duration,

    /// Select the applet while opening the session
    pub select_on_open: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            applet: Bytes::from_static(&IOT_APPLET_AID),
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            select_on_open: true,
        }
    }
}

impl SessionConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the applet AID
    pub fn with_applet(mut self, aid: impl Into<Bytes>) -> Self {
        self.applet = aid.into();
        self
    }

    /// Set the response timeout
    pub const fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Set whether the applet is selected while opening
    pub const fn with_select_on_open(mut self, select: bool) -> Self {
        self.select_on_open = select;
        self
    }
}
