//! GlobalPlatform command definitions
//!
//! Only the commands needed to select an applet and open an SCP03 session.

pub mod external_authenticate;
pub mod initialize_update;
pub mod select;

pub use external_authenticate::ExternalAuthenticateCommand;
pub use initialize_update::{InitializeUpdateCommand, InitializeUpdateResponse};
pub use select::SelectCommand;
