//! LDAP backend for dirsync.
//!
//! [`LdapStore`] implements both sides of the store interface of
//! `dirsync-sync`: [`DirectoryReader`](dirsync_sync::DirectoryReader) by
//! searching the people and group subtrees, and
//! [`DirectoryStore`](dirsync_sync::DirectoryStore) by issuing one add,
//! modify or delete per task.
//!
//! Request building ([`request`]) and entry parsing ([`entry`]) are pure
//! functions; only [`store`] talks to the server.

pub mod config;
pub mod entry;
pub mod request;
pub mod store;

pub use config::{LdapConfig, DEFAULT_CONNECT_TIMEOUT};
pub use entry::{read_groups, read_people, EntryKind};
pub use store::LdapStore;
