//! SE05x applet operations
//!
//! [`Se05x`] borrows a caller owned [`Session`] and turns each operation into
//! one or more typed commands. It never touches the transport itself.

use bytes::Bytes;
use seclink_apdu_core::CardTransport;
use tracing::{debug, warn};

use crate::commands::{CheckObjectExistsCommand, GetVersionCommand, ReadObjectCommand};
use crate::constants::UNIQUE_ID_LENGTH;
use crate::error::{ChipError, Result};
use crate::observer::SessionEvent;
use crate::session::Session;
use crate::types::{AppletIdentity, ObjectId, ReservedObject, VersionInfo, VersionSource};

/// Operations on the SE05x applet of a session
#[derive(Debug)]
pub struct Se05x<'a, T: CardTransport> {
    session: &'a mut Session<T>,
}

impl<'a, T: CardTransport> Se05x<'a, T> {
    /// Work with the applet through `session`
    pub const fn new(session: &'a mut Session<T>) -> Self {
        Self { session }
    }

    /// The underlying session
    pub fn session(&mut self) -> &mut Session<T> {
        &mut *self.session
    }

    /// Select the configured applet
    pub fn select_applet(&mut self, skip_if_selected: bool) -> Result<Bytes> {
        let applet = self.session.config().applet.clone();
        self.session.select_applet(applet, skip_if_selected)
    }

    /// Whether an object exists
    ///
    /// Always asks the card. A negative answer lets a later
    /// [`read_object`](Self::read_object) fail without a round trip.
    pub fn check_object_exists(&mut self, object_id: ObjectId) -> Result<bool> {
        let exists = self
            .session
            .execute(&CheckObjectExistsCommand::new(object_id)?)?;
        debug!(%object_id, exists, "Checked object existence");
        self.session.record_existence(object_id, exists);
        Ok(exists)
    }

    /// Read up to `max_length` bytes of an object starting at `offset`
    ///
    /// A `max_length` of zero reads to the end of the object. An object
    /// already known to be missing fails without a round trip.
    pub fn read_object(&mut self, object_id: ObjectId, offset: u16, max_length: u16) -> Result<Bytes> {
        if self.session.known_missing(object_id) {
            return Err(ChipError::NotFound);
        }

        let command = ReadObjectCommand::new(object_id, offset, max_length)?;
        let mut data = match self.session.execute(&command) {
            Ok(data) => data,
            Err(ChipError::NotFound) => {
                self.session.record_existence(object_id, false);
                return Err(ChipError::NotFound);
            }
            Err(err) => return Err(err),
        };

        if max_length != 0 {
            data.truncate(max_length as usize);
        }
        Ok(data)
    }

    /// Read the module unique identifier
    pub fn read_unique_id(&mut self) -> Result<Bytes> {
        let unique_id = ObjectId::from(ReservedObject::UniqueId);
        if !self.check_object_exists(unique_id)? {
            return Err(ChipError::NotFound);
        }
        self.read_object(unique_id, 0, UNIQUE_ID_LENGTH)
    }

    /// Read the applet version
    ///
    /// Applets running in a restricted mode reject GET VERSION as unsupported;
    /// the version is then taken from the response to re-selecting the applet.
    pub fn get_version(&mut self) -> Result<VersionInfo> {
        self.version_with_source().map(|(version, _)| version)
    }

    fn version_with_source(&mut self) -> Result<(VersionInfo, VersionSource)> {
        match self.session.execute(&GetVersionCommand) {
            Ok(version) => Ok((version, VersionSource::GetVersion)),
            Err(ChipError::Unsupported) => {
                self.session.emit(SessionEvent::FallbackTriggered);
                let response = self.select_applet(false)?;
                let version = VersionInfo::from_bytes(&response)?;
                Ok((version, VersionSource::SelectResponse))
            }
            Err(err) => Err(err),
        }
    }

    /// Read the unique identifier (optionally) and the version
    ///
    /// A failed existence check for the unique identifier is logged and the
    /// identifier left out, unless it ended the session. A failed read of an
    /// identifier that exists is an error.
    pub fn identify(&mut self, read_unique_id: bool) -> Result<AppletIdentity> {
        let unique_id = if read_unique_id {
            let id = ObjectId::from(ReservedObject::UniqueId);
            match self.check_object_exists(id) {
                Ok(true) => Some(self.read_object(id, 0, UNIQUE_ID_LENGTH)?),
                Ok(false) => {
                    warn!(%id, "Unique identifier object not found");
                    None
                }
                Err(err) if err.invalidates_session() => return Err(err),
                Err(err) => {
                    warn!(%id, error = %err, "Could not check for the unique identifier");
                    None
                }
            }
        } else {
            None
        };

        let (version, version_source) = self.version_with_source()?;
        debug!(%version, %version_source, config = %version.applet_config, "Applet identified");

        Ok(AppletIdentity {
            unique_id,
            version,
            version_source,
        })
    }
}
