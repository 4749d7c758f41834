//! Core type definitions for dirsync.
//!
//! This crate defines the directory objects that both sides of a
//! reconciliation run are built from:
//! - Distinguished names ([`Dn`]) as identity and depth proxy
//! - The five managed object kinds (organizational units, posix groups and
//!   accounts, groups of names, sudo roles)
//! - [`DirectoryState`], one complete snapshot (desired or observed)
//! - [`IdAllocator`], the numeric user id generator
//!
//! Loading these from files or from a directory server is the job of the
//! `dirsync-config` and `dirsync-ldap` crates; comparing them is the job of
//! `dirsync-sync`.

mod dn;
mod entity;
mod id_alloc;
mod state;

pub use dn::Dn;
pub use entity::{
    GroupOfNames, OrganizationalUnit, PosixAccount, PosixGroup, SudoRole, DUMMY_MEMBER,
    MANAGED_DESCRIPTION,
};
pub use id_alloc::IdAllocator;
pub use state::DirectoryState;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid DN: {0:?}")]
    InvalidDn(String),

    #[error("numeric user id limit reached (max {max})")]
    IdLimitExceeded { max: u32 },
}
