//! SE05x data types

mod applet_config;
mod object_id;
mod version;

pub use applet_config::{AppletConfig, AppletFeature};
pub use object_id::{ObjectId, ReservedObject};
pub use version::{AppletIdentity, VersionInfo, VersionSource};
