//! A complete snapshot of the managed directory objects.

use crate::{Dn, GroupOfNames, OrganizationalUnit, PosixAccount, PosixGroup, SudoRole};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One side of a reconciliation: either the desired state built from
/// configuration files, or the observed state read from the directory.
///
/// Posix groups and groups of names are keyed by DN so iteration order is
/// deterministic across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryState {
    pub organizational_units: Vec<OrganizationalUnit>,
    pub posix_groups: BTreeMap<Dn, PosixGroup>,
    pub groups_of_names: BTreeMap<Dn, GroupOfNames>,
    pub sudo_roles: Vec<SudoRole>,
}

impl DirectoryState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterates all accounts across all posix groups.
    pub fn accounts(&self) -> impl Iterator<Item = &PosixAccount> {
        self.posix_groups.values().flat_map(|g| g.accounts.iter())
    }

    /// Finds an account by username.
    pub fn account_by_uid(&self, uid: &str) -> Option<&PosixAccount> {
        self.accounts().find(|a| a.uid == uid)
    }

    /// Builds a username to account DN index.
    pub fn uid_index(&self) -> HashMap<&str, &Dn> {
        self.accounts().map(|a| (a.uid.as_str(), &a.dn)).collect()
    }

    /// Highest `uidNumber` carried by any account.
    pub fn highest_uid_number(&self) -> Option<u32> {
        self.accounts().filter_map(|a| a.uid_number).max()
    }

    /// Names of all groups of names that list `uid` as a member, shortest DN first.
    pub fn memberships_of(&self, uid: &str) -> Vec<&Dn> {
        let mut dns: Vec<&Dn> = self
            .groups_of_names
            .values()
            .filter(|g| g.members.iter().any(|m| m == uid))
            .map(|g| &g.dn)
            .collect();
        dns.sort_by_key(|dn| dn.len());
        dns
    }

    /// Total number of objects in this snapshot.
    pub fn object_count(&self) -> usize {
        self.organizational_units.len()
            + self.posix_groups.len()
            + self.accounts().count()
            + self.groups_of_names.len()
            + self.sudo_roles.len()
    }

    /// Returns true when the snapshot holds no objects.
    pub fn is_empty(&self) -> bool {
        self.object_count() == 0
    }
}
