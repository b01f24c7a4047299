//! Applet configuration bitmask

use std::fmt;

use derive_more::{From, Into};

/// Optional applet feature, as reported in the version record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppletFeature {
    /// ECDAA
    Ecdaa,
    /// ECDSA, ECDH and ECDHE
    EcdsaEcdhEcdhe,
    /// EdDSA
    Eddsa,
    /// Diffie-Hellman on Montgomery curves
    DhMont,
    /// HMAC
    Hmac,
    /// RSA with plain keys
    RsaPlain,
    /// RSA with CRT keys
    RsaCrt,
    /// AES
    Aes,
    /// DES
    Des,
    /// PBKDF
    Pbkdf,
    /// TLS PRF support
    Tls,
    /// MIFARE DESFire support
    Mifare,
    /// Set when FIPS approved mode is disabled
    FipsModeDisabled,
    /// I2C master
    I2cm,
}

const FEATURE_TABLE: &[(AppletFeature, u16, &str)] = &[
    (AppletFeature::Ecdaa, 0x0100, "ECDAA"),
    (AppletFeature::EcdsaEcdhEcdhe, 0x0200, "ECDSA_ECDH_ECDHE"),
    (AppletFeature::Eddsa, 0x0400, "EDDSA"),
    (AppletFeature::DhMont, 0x0800, "DH_MONT"),
    (AppletFeature::Hmac, 0x1000, "HMAC"),
    (AppletFeature::RsaPlain, 0x2000, "RSA_PLAIN"),
    (AppletFeature::RsaCrt, 0x4000, "RSA_CRT"),
    (AppletFeature::Aes, 0x8000, "AES"),
    (AppletFeature::Des, 0x0001, "DES"),
    (AppletFeature::Pbkdf, 0x0002, "PBKDF"),
    (AppletFeature::Tls, 0x0004, "TLS"),
    (AppletFeature::Mifare, 0x0008, "MIFARE"),
    (AppletFeature::FipsModeDisabled, 0x0010, "FIPS_MODE_DISABLED"),
    (AppletFeature::I2cm, 0x0020, "I2CM"),
];

impl AppletFeature {
    // FEATURE_TABLE lists the variants in declaration order
    const fn entry(self) -> (Self, u16, &'static str) {
        FEATURE_TABLE[self as usize]
    }

    /// Every known feature
    pub fn all() -> impl Iterator<Item = Self> {
        FEATURE_TABLE.iter().map(|(feature, _, _)| *feature)
    }

    /// Bit of the feature in the configuration bitmask
    pub const fn bit(self) -> u16 {
        self.entry().1
    }

    /// Symbolic name of the feature
    pub const fn name(self) -> &'static str {
        self.entry().2
    }
}

impl fmt::Display for AppletFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Applet configuration bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, From, Into)]
pub struct AppletConfig(u16);

impl AppletConfig {
    /// Wrap a raw bitmask
    pub const fn new(bits: u16) -> Self {
        Self(bits)
    }

    /// Raw bitmask
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Whether the feature's bit is set
    pub const fn has(self, feature: AppletFeature) -> bool {
        self.0 & feature.bit() == feature.bit()
    }

    /// Every known feature with its presence, in table order
    pub fn report(self) -> impl Iterator<Item = (AppletFeature, bool)> {
        AppletFeature::all().map(move |feature| (feature, self.has(feature)))
    }

    /// Features whose bit is set
    pub fn features(self) -> impl Iterator<Item = AppletFeature> {
        self.report()
            .filter_map(|(feature, present)| present.then_some(feature))
    }
}

impl fmt::Display for AppletConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let features: Vec<&str> = self.features().map(AppletFeature::name).collect();
        write!(f, "{:04X} [{}]", self.0, features.join(", "))
    }
}
