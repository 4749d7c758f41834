//! Error types for the reconciliation engine and the directory store.

use crate::driver::Stage;
use dirsync_types::Dn;
use thiserror::Error;

/// Result type for reconciliation operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type for directory store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a [`DirectoryStore`](crate::store::DirectoryStore) or
/// [`DirectoryReader`](crate::store::DirectoryReader).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Could not reach or authenticate to the directory server.
    #[error("connection error: {0}")]
    Connection(String),

    /// The server refused an operation.
    #[error("{operation} {dn} rejected: {message}")]
    Rejected {
        operation: &'static str,
        dn: Dn,
        message: String,
    },

    /// The target entry does not exist.
    #[error("no such entry: {0}")]
    NotFound(Dn),

    /// An entry with this DN exists already.
    #[error("entry already exists: {0}")]
    AlreadyExists(Dn),

    /// A search base configured for reading does not exist.
    #[error("search base {0} does not exist")]
    MissingBase(Dn),

    /// The server answered with something that could not be interpreted.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Errors that abort a reconciliation run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Two accounts with different usernames were handed to the account comparison.
    #[error("cannot compare accounts with different uids ({local} vs {remote})")]
    UidMismatch { local: String, remote: String },

    /// A store operation failed while applying a task.
    #[error("stage '{stage}' failed at {dn}: {source}")]
    Apply {
        stage: Stage,
        dn: Dn,
        #[source]
        source: StoreError,
    },

    /// No numeric user id could be assigned to a new account.
    #[error("cannot assign uidNumber to {dn}: {source}")]
    IdAllocation {
        dn: Dn,
        #[source]
        source: dirsync_types::Error,
    },

    /// An account without a `uidNumber` was queued while id generation is off.
    #[error("account {0} has no uidNumber and id generation is disabled")]
    MissingUidNumber(Dn),

    /// Store error outside of task application (e.g. while reading state).
    #[error(transparent)]
    Store(#[from] StoreError),
}
