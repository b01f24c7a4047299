//! Host-side command and session layer for SE05x secure elements
//!
//! A [`Session`] owns the link to the chip, tracks the selected applet and
//! applies the active secure channel. [`Se05x`] borrows a session and offers
//! the applet operations: existence checks, object reads, the version query
//! with its SELECT fallback, and the identify flow built on them.
//!
//! ```no_run
//! use seclink_se05x::{Se05x, Session, SessionConfig, SocketTransportFactory};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = Session::open(&SocketTransportFactory::default(), None, SessionConfig::default())?;
//! let identity = Se05x::new(&mut session).identify(true)?;
//! println!("applet {} ({})", identity.version, identity.version.applet_config);
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

mod application;
pub mod commands;
mod config;
mod connect;
pub mod constants;
mod error;
mod observer;
mod session;
pub mod status;
pub mod types;

pub use application::Se05x;
pub use config::{DEFAULT_RESPONSE_TIMEOUT, SessionConfig};
pub use connect::{
    CONNECT_STRING_ENV, ConnectString, DEFAULT_CONNECT_STRING, SocketTransportFactory,
    TransportFactory, resolve_connect_string,
};
pub use error::{ChipError, ConnectError, Result};
pub use observer::{SessionEvent, SessionObserver, TracingObserver};
pub use session::{AuthState, Session, SessionId, SessionState};
pub use status::StatusCategory;
pub use types::{
    AppletConfig, AppletFeature, AppletIdentity, ObjectId, ReservedObject, VersionInfo,
    VersionSource,
};

// Secure channel building blocks callers need to authenticate a session
pub use seclink_apdu_core::{SecureChannel, SecurityLevel};
pub use seclink_apdu_globalplatform::StaticKeys;
