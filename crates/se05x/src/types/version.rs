//! Applet version record

use bytes::Bytes;
use derive_more::Display;

use crate::constants::VERSION_INFO_LENGTH;
use crate::error::ChipError;
use crate::types::AppletConfig;

/// Applet version and configuration, as returned by GET VERSION
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("{major}.{minor}.{patch}")]
pub struct VersionInfo {
    /// Major applet version
    pub major: u8,
    /// Minor applet version
    pub minor: u8,
    /// Patch applet version
    pub patch: u8,
    /// Supported applet features
    pub applet_config: AppletConfig,
    /// Secure Box version, major in the high byte and minor in the low byte
    pub secure_box_version: u16,
}

impl VersionInfo {
    /// Parse the 7 byte version record
    pub fn from_bytes(data: &[u8]) -> Result<Self, ChipError> {
        let [major, minor, patch, config_hi, config_lo, box_hi, box_lo] = data else {
            return Err(ChipError::MalformedResponse("version record must be 7 bytes"));
        };

        Ok(Self {
            major: *major,
            minor: *minor,
            patch: *patch,
            applet_config: AppletConfig::new(u16::from_be_bytes([*config_hi, *config_lo])),
            secure_box_version: u16::from_be_bytes([*box_hi, *box_lo]),
        })
    }

    /// Encode back into the 7 byte record
    pub const fn to_bytes(&self) -> [u8; VERSION_INFO_LENGTH] {
        let config = self.applet_config.bits().to_be_bytes();
        let secure_box = self.secure_box_version.to_be_bytes();
        [
            self.major,
            self.minor,
            self.patch,
            config[0],
            config[1],
            secure_box[0],
            secure_box[1],
        ]
    }
}

impl TryFrom<&[u8]> for VersionInfo {
    type Error = ChipError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(data)
    }
}

/// Where a [`VersionInfo`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum VersionSource {
    /// The GET VERSION command
    #[display("GET VERSION")]
    GetVersion,
    /// The response to re-selecting the applet
    #[display("SELECT response")]
    SelectResponse,
}

/// Identity of the applet on a chip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppletIdentity {
    /// Module unique identifier, if it was requested and could be read
    pub unique_id: Option<Bytes>,
    /// Applet version
    pub version: VersionInfo,
    /// How the version was obtained
    pub version_source: VersionSource,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AppletFeature;

    #[test]
    fn test_parse_version() {
        let version = VersionInfo::from_bytes(&[0x03, 0x03, 0x01, 0x02, 0x00, 0x00, 0x01]).unwrap();
        assert_eq!(version.major, 3);
        assert_eq!(version.minor, 3);
        assert_eq!(version.patch, 1);
        assert_eq!(version.applet_config.bits(), 0x0200);
        assert!(version.applet_config.has(AppletFeature::EcdsaEcdhEcdhe));
        assert_eq!(version.secure_box_version, 0x0001);
        assert_eq!(version.to_string(), "3.3.1");
        assert_eq!(version.to_bytes(), [0x03, 0x03, 0x01, 0x02, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn test_wrong_length_is_malformed() {
        for len in [0usize, 6, 8] {
            let err = VersionInfo::try_from(&vec![0u8; len][..]).unwrap_err();
            assert!(matches!(err, ChipError::MalformedResponse(_)), "{len} bytes");
        }
    }
}
