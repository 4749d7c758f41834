//! Configuration loading for dirsync.
//!
//! The desired directory state is described by a settings file plus two
//! directory trees:
//!
//! - the **people tree**: every sub-directory is an organizational unit,
//!   every file a posix group with its accounts;
//! - the **group tree**: every sub-directory is an organizational unit,
//!   every file a group of names, except files named `SUDOers` which hold
//!   sudo roles.
//!
//! [`Settings::load`] reads and validates the settings file;
//! [`load_desired_state`] turns both trees into a
//! [`DirectoryState`](dirsync_types::DirectoryState). Any defect in the
//! files is a [`ConfigError`] naming the file or DN involved.

mod error;
pub mod files;
pub mod loader;
pub mod settings;
pub mod ssh;
pub mod template;

pub use error::{ConfigError, ConfigResult, SshKeyError};
pub use loader::{container_dn, load_desired_state, SUDOERS_FILE};
pub use settings::{AccountDefaults, Overrides, Settings, DEFAULT_SETTINGS_FILE};
pub use ssh::validate_authorized_key;
