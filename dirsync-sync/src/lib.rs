//! Reconciliation engine for dirsync.
//!
//! Converges a directory server to a declarative description of its
//! contents.
//!
//! # Architecture
//!
//! A run has three strictly sequential phases:
//!
//! 1. **Load**: the desired state comes from configuration files, the
//!    observed state from a [`DirectoryReader`]. Both are plain
//!    [`DirectoryState`](dirsync_types::DirectoryState) values.
//! 2. **Compare**: [`reconcile`] computes a [`TaskSet`], one ordered
//!    [`TaskQueue`] per (object kind, action) pair.
//! 3. **Apply or render**: [`SyncDriver::apply`] drains the queues into a
//!    [`DirectoryStore`] in a fixed [`Stage`] order, or [`render`] prints
//!    them.
//!
//! ## Ordering
//!
//! Queues are ordered by DN length, so parents come before children. The
//! stage order puts container creation first and container deletion last,
//! removes stale memberships before the accounts they reference, and
//! creates accounts before adding them to groups.
//!
//! ## Failure
//!
//! Apply is fail-fast with no rollback. Re-running after a failure is the
//! recovery path: the comparison then yields only what is still missing.
//!
//! # Example
//!
//! ```
//! use dirsync_sync::{reconcile, CompareOptions, SyncDriver};
//! use dirsync_sync::store::mock::MemoryStore;
//! use dirsync_types::{DirectoryState, Dn, OrganizationalUnit};
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let mut desired = DirectoryState::new();
//! desired
//!     .organizational_units
//!     .push(OrganizationalUnit::new(Dn::new("ou=eng"), "eng"));
//!
//! let mut store = MemoryStore::new();
//! let tasks = reconcile(&desired, &DirectoryState::new(), CompareOptions::default()).unwrap();
//! let report = SyncDriver::new().apply(&tasks, &mut store).await.unwrap();
//! assert_eq!(report.applied(), 1);
//! # });
//! ```

pub mod compare;
pub mod driver;
mod error;
pub mod queue;
pub mod render;
pub mod store;
pub mod task;

pub use compare::{compare_posix_account, compare_sudo_role, reconcile, CompareOptions};
pub use driver::{Stage, SyncDriver, SyncReport};
pub use error::{StoreError, StoreResult, SyncError, SyncResult};
pub use queue::{Task, TaskHandle, TaskQueue};
pub use store::{DirectoryReader, DirectoryStore};
pub use task::{
    DeleteAccountTask, DeleteTask, FieldChange, GroupOfNamesPatch, MemberTask, PosixAccountPatch,
    PosixGroupPatch, TaskRef, TaskSet,
};
