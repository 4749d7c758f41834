//! Error types for configuration loading.

use dirsync_types::Dn;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that make the desired state unusable. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file or directory could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file is not valid YAML for its kind.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Walking a configuration tree failed.
    #[error("failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// A required setting is absent from the settings file and the overrides.
    #[error("missing required setting `{0}`")]
    MissingSetting(&'static str),

    /// A DN-valued setting is malformed.
    #[error("setting `{setting}` is not a valid DN: {source}")]
    InvalidDn {
        setting: &'static str,
        #[source]
        source: dirsync_types::Error,
    },

    /// `min_uid` is above `max_uid`.
    #[error("min_uid {min} is greater than max_uid {max}")]
    InvalidIdRange { min: u32, max: u32 },

    /// A people file has no `gid_number`.
    #[error("gid_number missing in {}", path.display())]
    MissingGidNumber { path: PathBuf },

    /// An account entry lacks a required field.
    #[error("account #{index} in {} is missing `{field}`", path.display())]
    MissingField {
        path: PathBuf,
        index: usize,
        field: &'static str,
    },

    /// An account has no `uid_number` while id generation is disabled.
    #[error("{0} has no uid_number and generate_uid is disabled")]
    MissingUidNumber(Dn),

    /// An account field is unset and no default pattern exists for it.
    #[error("{field} not set for {dn} and no default is defined")]
    NoDefault { dn: Dn, field: &'static str },

    /// The same username is declared twice across the people tree.
    #[error("username '{uid}' is declared again in {}", path.display())]
    DuplicateUser { uid: String, path: PathBuf },

    /// Two files resolve to the same DN.
    #[error("{dn} is declared again in {}", path.display())]
    DuplicateDn { dn: Dn, path: PathBuf },

    /// A group lists a member twice.
    #[error("duplicated member '{uid}' in group {group}")]
    DuplicateMember { uid: String, group: Dn },

    /// A group lists a member that is not a configured account.
    #[error("member '{uid}' in group {group} is not a configured account")]
    UnknownMember { uid: String, group: Dn },

    /// A sudo role entry has no `name`.
    #[error("sudo role #{index} in {} is missing `name`", path.display())]
    MissingRoleName { path: PathBuf, index: usize },
}

/// Reasons an `ssh_public_key` value is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SshKeyError {
    #[error("key is empty")]
    Empty,

    #[error("unknown key type '{0}'")]
    UnknownKeyType(String),

    #[error("key data missing after key type")]
    MissingKeyData,

    #[error("key data is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("key data is truncated")]
    Truncated,

    #[error("key type '{declared}' does not match encoded type '{encoded}'")]
    TypeMismatch { declared: String, encoded: String },
}
