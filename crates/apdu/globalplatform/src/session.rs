//! SCP03 key material
//!
//! Static keys are provisioned on the card; session keys are derived from
//! them for each handshake and wiped when dropped.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::derivation;
use crate::crypto::{self, AesKey};

/// Static SCP03 key set (ENC, MAC, DEK)
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct StaticKeys {
    enc: AesKey,
    mac: AesKey,
    dek: AesKey,
    key_version: u8,
}

impl StaticKeys {
    /// Create a key set from its three keys
    pub const fn new(enc: AesKey, mac: AesKey, dek: AesKey) -> Self {
        Self {
            enc,
            mac,
            dek,
            key_version: 0x00,
        }
    }

    /// Create a key set using the same key for ENC, MAC and DEK
    pub const fn from_single_key(key: AesKey) -> Self {
        Self::new(key, key, key)
    }

    /// Request a specific key version during INITIALIZE UPDATE
    pub fn with_key_version(mut self, key_version: u8) -> Self {
        self.key_version = key_version;
        self
    }

    /// Static encryption key
    pub const fn enc(&self) -> &AesKey {
        &self.enc
    }

    /// Static MAC key
    pub const fn mac(&self) -> &AesKey {
        &self.mac
    }

    /// Static data encryption key
    pub const fn dek(&self) -> &AesKey {
        &self.dek
    }

    /// Requested key version, zero for the card default
    pub const fn key_version(&self) -> u8 {
        self.key_version
    }
}

impl fmt::Debug for StaticKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticKeys")
            .field("key_version", &self.key_version)
            .finish_non_exhaustive()
    }
}

/// Session keys derived for one secure channel
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    enc: AesKey,
    mac: AesKey,
    rmac: AesKey,
}

impl SessionKeys {
    /// Derive session keys from the static keys and the handshake context
    ///
    /// The context is the host challenge followed by the card challenge.
    pub fn derive(keys: &StaticKeys, context: &[u8]) -> Self {
        Self {
            enc: crypto::derive_key(keys.enc(), derivation::S_ENC, context),
            mac: crypto::derive_key(keys.mac(), derivation::S_MAC, context),
            rmac: crypto::derive_key(keys.mac(), derivation::S_RMAC, context),
        }
    }

    /// Session encryption key (S-ENC)
    pub const fn enc(&self) -> &AesKey {
        &self.enc
    }

    /// Session command MAC key (S-MAC)
    pub const fn mac(&self) -> &AesKey {
        &self.mac
    }

    /// Session response MAC key (S-RMAC)
    pub const fn rmac(&self) -> &AesKey {
        &self.rmac
    }

    /// Card cryptogram expected for this session
    pub fn card_cryptogram(&self, context: &[u8]) -> [u8; 8] {
        crypto::derive_cryptogram(&self.mac, derivation::CARD_CRYPTOGRAM, context)
    }

    /// Whether `cryptogram` is the card cryptogram for this session
    pub fn verify_card_cryptogram(&self, context: &[u8], cryptogram: &[u8]) -> bool {
        crypto::verify_cryptogram(&self.mac, derivation::CARD_CRYPTOGRAM, context, cryptogram)
    }

    /// Host cryptogram proving knowledge of the static keys
    pub fn host_cryptogram(&self, context: &[u8]) -> [u8; 8] {
        crypto::derive_cryptogram(&self.mac, derivation::HOST_CRYPTOGRAM, context)
    }
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKeys { .. }")
    }
}
