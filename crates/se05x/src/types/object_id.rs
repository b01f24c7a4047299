//! Object identifiers and the registry of applet-reserved objects

use std::fmt;

use derive_more::{Display, From, Into};

/// 4 byte identifier of a secure object, big-endian on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
#[display("{_0:#010X}")]
pub struct ObjectId(u32);

impl ObjectId {
    /// First identifier of the range reserved by the applet
    pub const RESERVED_START: u32 = 0x7FFF_0000;
    /// Last identifier of the range reserved by the applet
    pub const RESERVED_END: u32 = 0x7FFF_FFFF;

    /// Wrap a raw identifier
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Identifier for a user-provisioned object
    ///
    /// Returns `None` for identifiers inside the applet-reserved range.
    pub const fn user(id: u32) -> Option<Self> {
        if Self(id).is_reserved() {
            None
        } else {
            Some(Self(id))
        }
    }

    /// Raw value
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Whether the identifier lies in the applet-reserved range
    pub const fn is_reserved(self) -> bool {
        self.0 >= Self::RESERVED_START && self.0 <= Self::RESERVED_END
    }

    /// Wire encoding
    pub const fn to_be_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// The registry entry for this identifier, if any
    pub fn reserved_object(self) -> Option<ReservedObject> {
        ReservedObject::from_id(self)
    }
}

impl From<ReservedObject> for ObjectId {
    fn from(object: ReservedObject) -> Self {
        object.id()
    }
}

/// Well-known objects managed by the applet itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservedObject {
    /// Transport lock key
    Transport,
    /// Key pair for user authentication with ECKey
    KpEcKeyUser,
    /// Key pair used to import keys with ECKey
    KpEcKeyImport,
    /// Feature configuration
    Feature,
    /// Authentication object permitting a factory reset
    FactoryReset,
    /// Module unique identifier
    UniqueId,
    /// Platform SCP keys
    PlatformScp,
    /// Authentication object for I2C master access
    I2cmAccess,
    /// Authentication object permitting applet restrictions
    Restrict,
}

const REGISTRY: &[(ReservedObject, &str, u32)] = &[
    (ReservedObject::Transport, "TRANSPORT", 0x7FFF_0200),
    (ReservedObject::KpEcKeyUser, "KP_ECKEY_USER", 0x7FFF_0201),
    (ReservedObject::KpEcKeyImport, "KP_ECKEY_IMPORT", 0x7FFF_0202),
    (ReservedObject::Feature, "FEATURE", 0x7FFF_0204),
    (ReservedObject::FactoryReset, "FACTORY_RESET", 0x7FFF_0205),
    (ReservedObject::UniqueId, "UNIQUE_ID", 0x7FFF_0206),
    (ReservedObject::PlatformScp, "PLATFORM_SCP", 0x7FFF_0207),
    (ReservedObject::I2cmAccess, "I2CM_ACCESS", 0x7FFF_0208),
    (ReservedObject::Restrict, "RESTRICT", 0x7FFF_020A),
];

impl ReservedObject {
    // REGISTRY lists the variants in declaration order
    const fn entry(self) -> (ReservedObject, &'static str, u32) {
        REGISTRY[self as usize]
    }

    /// Every registered object, in identifier order
    pub fn all() -> impl Iterator<Item = Self> {
        REGISTRY.iter().map(|(object, _, _)| *object)
    }

    /// Identifier of the object
    pub const fn id(self) -> ObjectId {
        ObjectId(self.entry().2)
    }

    /// Symbolic name of the object
    pub const fn name(self) -> &'static str {
        self.entry().1
    }

    /// Look up an object by its symbolic name, ignoring ASCII case
    pub fn from_name(name: &str) -> Option<Self> {
        REGISTRY
            .iter()
            .find(|(_, entry, _)| entry.eq_ignore_ascii_case(name))
            .map(|(object, _, _)| *object)
    }

    /// Look up an object by its identifier
    pub fn from_id(id: ObjectId) -> Option<Self> {
        REGISTRY
            .iter()
            .find(|(_, _, value)| *value == id.value())
            .map(|(object, _, _)| *object)
    }
}

impl fmt::Display for ReservedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookups() {
        assert_eq!(ReservedObject::UniqueId.id(), ObjectId::new(0x7FFF_0206));
        assert_eq!(ReservedObject::UniqueId.name(), "UNIQUE_ID");
        assert_eq!(ReservedObject::from_name("unique_id"), Some(ReservedObject::UniqueId));
        assert_eq!(
            ReservedObject::from_id(ObjectId::new(0x7FFF_020A)),
            Some(ReservedObject::Restrict)
        );
        assert_eq!(ReservedObject::from_id(ObjectId::new(0x7FFF_0203)), None);
        assert_eq!(ReservedObject::from_name("NOPE"), None);
    }

    #[test]
    fn test_registry_is_consistent() {
        assert_eq!(ReservedObject::all().count(), 9);
        for (index, object) in ReservedObject::all().enumerate() {
            assert_eq!(object as usize, index);
            assert!(object.id().is_reserved(), "{object}");
            assert_eq!(ReservedObject::from_id(object.id()), Some(object));
            assert_eq!(ReservedObject::from_name(object.name()), Some(object));
        }
    }

    #[test]
    fn test_user_ids_exclude_reserved_range() {
        assert_eq!(ObjectId::user(0x1000_0001), Some(ObjectId::new(0x1000_0001)));
        assert_eq!(ObjectId::user(0x7FFF_0000), None);
        assert_eq!(ObjectId::user(0x7FFF_FFFF), None);
        assert!(ObjectId::user(0x7FFE_FFFF).is_some());
        assert!(ObjectId::user(0x8000_0000).is_some());
    }

    #[test]
    fn test_object_id_encoding() {
        let id = ObjectId::from(ReservedObject::UniqueId);
        assert_eq!(id.to_be_bytes(), [0x7F, 0xFF, 0x02, 0x06]);
        assert_eq!(id.to_string(), "0x7FFF0206");
        assert_eq!(u32::from(id), 0x7FFF_0206);
    }
}
