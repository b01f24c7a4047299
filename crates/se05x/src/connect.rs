//! Connect strings and transport factories
//!
//! A connect string names the link to a secure element:
//!
//! | Form | Link |
//! |---|---|
//! | `host:port`, `[v6]:port` | simulator socket |
//! | `/dev/i2c-N`, `/dev/i2c-N:0x48` | I2C bus with an optional device address |
//! | `/dev/spidev*` | SPI |
//! | `/dev/tty*`, `COMn` | serial (T=1 over UART) |

use std::env;
use std::fmt;
use std::str::FromStr;

use seclink_apdu_core::CardTransport;
use seclink_apdu_transport_socket::{SocketConfig, SocketTransport};
use tracing::debug;

use crate::error::ConnectError;

/// Environment variable consulted when no connect string is given
pub const CONNECT_STRING_ENV: &str = "SE05X_PORT";

/// Connect string used when neither an argument nor the environment names one
pub const DEFAULT_CONNECT_STRING: &str = "127.0.0.1:8050";

/// Parsed connect string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConnectString {
    /// TCP link to a simulator, as `host:port`
    Socket(String),
    /// I2C bus device node
    I2c {
        /// Device node, e.g. `/dev/i2c-1`
        device: String,
        /// 7-bit device address, the driver default when absent
        address: Option<u8>,
    },
    /// SPI device node
    Spi(String),
    /// Serial device node or COM port
    Serial(String),
}

impl ConnectString {
    /// Short name of the link kind
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Socket(_) => "socket",
            Self::I2c { .. } => "i2c",
            Self::Spi(_) => "spi",
            Self::Serial(_) => "serial",
        }
    }
}

fn invalid(input: &str) -> ConnectError {
    ConnectError::InvalidConnectString(input.to_string())
}

fn parse_i2c(input: &str, rest: &str) -> Result<ConnectString, ConnectError> {
    let (bus, address) = match rest.split_once(':') {
        Some((bus, address)) => {
            let digits = address
                .strip_prefix("0x")
                .or_else(|| address.strip_prefix("0X"))
                .ok_or_else(|| invalid(input))?;
            let address = u8::from_str_radix(digits, 16).map_err(|_| invalid(input))?;
            if address > 0x7F {
                return Err(invalid(input));
            }
            (bus, Some(address))
        }
        None => (rest, None),
    };

    if bus.is_empty() || !bus.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(input));
    }

    Ok(ConnectString::I2c {
        device: format!("/dev/i2c-{bus}"),
        address,
    })
}

fn parse_socket(input: &str) -> Result<ConnectString, ConnectError> {
    let (host, port) = match input.strip_prefix('[') {
        Some(rest) => rest.split_once("]:").ok_or_else(|| invalid(input))?,
        None => input.rsplit_once(':').ok_or_else(|| invalid(input))?,
    };

    let valid_host = !host.is_empty() && !host.contains(char::is_whitespace);
    // An unbracketed IPv6 address is ambiguous
    let bracketed = input.starts_with('[');
    if !valid_host || (!bracketed && host.contains(':')) || port.parse::<u16>().is_err() {
        return Err(invalid(input));
    }

    Ok(ConnectString::Socket(input.to_string()))
}

impl FromStr for ConnectString {
    type Err = ConnectError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();

        if let Some(rest) = input.strip_prefix("/dev/i2c-") {
            parse_i2c(input, rest)
        } else if input.starts_with("/dev/spidev") {
            Ok(Self::Spi(input.to_string()))
        } else if input.starts_with("/dev/tty") {
            Ok(Self::Serial(input.to_string()))
        } else if input
            .strip_prefix("COM")
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
        {
            Ok(Self::Serial(input.to_string()))
        } else if input.starts_with('/') {
            Err(invalid(input))
        } else {
            parse_socket(input)
        }
    }
}

impl fmt::Display for ConnectString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Socket(address) => f.write_str(address),
            Self::I2c {
                device,
                address: Some(address),
            } => write!(f, "{device}:{address:#04x}"),
            Self::I2c { device, .. } => f.write_str(device),
            Self::Spi(device) | Self::Serial(device) => f.write_str(device),
        }
    }
}

fn resolve_with(
    argument: Option<&str>,
    environment: Option<String>,
) -> Result<ConnectString, ConnectError> {
    if let Some(argument) = argument.filter(|s| !s.trim().is_empty()) {
        return argument.parse();
    }
    if let Some(value) = environment.filter(|s| !s.trim().is_empty()) {
        debug!(connect_string = %value, "Using connect string from {CONNECT_STRING_ENV}");
        return value.parse();
    }
    DEFAULT_CONNECT_STRING.parse()
}

/// Resolve the connect string to use
///
/// An explicit argument wins, then the `SE05X_PORT` environment variable,
/// then the local simulator at [`DEFAULT_CONNECT_STRING`].
pub fn resolve_connect_string(argument: Option<&str>) -> Result<ConnectString, ConnectError> {
    resolve_with(argument, env::var(CONNECT_STRING_ENV).ok())
}

/// Creates live transports from connect strings
pub trait TransportFactory {
    /// Transport produced by this factory
    type Transport: CardTransport;

    /// Open the link named by `connect_string`
    fn create(&self, connect_string: &ConnectString) -> Result<Self::Transport, ConnectError>;
}

/// Factory for simulator sockets
///
/// Physical links have no driver here and are reported as unavailable.
#[derive(Debug, Clone, Default)]
pub struct SocketTransportFactory {
    config: SocketConfig,
}

impl SocketTransportFactory {
    /// Create a factory using `config` for every connection
    pub const fn new(config: SocketConfig) -> Self {
        Self { config }
    }
}

impl TransportFactory for SocketTransportFactory {
    type Transport = SocketTransport;

    fn create(&self, connect_string: &ConnectString) -> Result<Self::Transport, ConnectError> {
        match connect_string {
            ConnectString::Socket(address) => SocketTransport::connect(address, self.config.clone())
                .map_err(|err| ConnectError::TransportUnavailable(format!("{address}: {err}"))),
            other => Err(ConnectError::TransportUnavailable(format!(
                "no {} driver for {other}",
                other.kind()
            ))),
        }
    }
}
