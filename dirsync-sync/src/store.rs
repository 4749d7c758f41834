//! Directory store abstraction.
//!
//! Defines the write operations the driver needs and the read operation that
//! produces the observed state, so the engine works against any backend.

use crate::error::StoreResult;
use crate::task::{DeleteAccountTask, GroupOfNamesPatch, PosixAccountPatch, PosixGroupPatch};
use async_trait::async_trait;
use dirsync_types::{DirectoryState, Dn, GroupOfNames, OrganizationalUnit, PosixAccount, PosixGroup, SudoRole};

/// Write side of a directory. Each call applies one independent change.
#[async_trait]
pub trait DirectoryStore: Send {
    /// Creates an organizational unit.
    async fn create_organizational_unit(&mut self, ou: &OrganizationalUnit) -> StoreResult<()>;

    /// Deletes a leaf entry of any kind.
    async fn delete_object(&mut self, dn: &Dn) -> StoreResult<()>;

    /// Creates a posix group without accounts.
    async fn create_posix_group(&mut self, group: &PosixGroup) -> StoreResult<()>;

    /// Applies a sparse posix group update.
    async fn update_posix_group(&mut self, patch: &PosixGroupPatch) -> StoreResult<()>;

    /// Creates an account. `uid_number` is always set by the time this is called.
    async fn create_posix_account(&mut self, account: &PosixAccount) -> StoreResult<()>;

    /// Deletes an account.
    async fn delete_posix_account(&mut self, task: &DeleteAccountTask) -> StoreResult<()>;

    /// Applies a sparse account update.
    async fn update_posix_account(&mut self, patch: &PosixAccountPatch) -> StoreResult<()>;

    /// Creates a group of names holding only the placeholder member.
    async fn create_group_of_names(&mut self, group: &GroupOfNames) -> StoreResult<()>;

    /// Applies a sparse group of names update.
    async fn update_group_of_names(&mut self, patch: &GroupOfNamesPatch) -> StoreResult<()>;

    /// Adds one member DN to a group of names.
    async fn add_member(&mut self, group_dn: &Dn, member_dn: &Dn) -> StoreResult<()>;

    /// Removes one member DN from a group of names.
    async fn delete_member(&mut self, group_dn: &Dn, member_dn: &Dn) -> StoreResult<()>;

    /// Creates a sudo role.
    async fn create_sudo_role(&mut self, role: &SudoRole) -> StoreResult<()>;

    /// Replaces every attribute of a sudo role with the given values.
    async fn update_sudo_role(&mut self, role: &SudoRole) -> StoreResult<()>;
}

/// Read side of a directory.
#[async_trait]
pub trait DirectoryReader: Send {
    /// Reads every managed object below the configured bases.
    async fn read_state(&mut self) -> StoreResult<DirectoryState>;
}

/// An in-memory store for testing.
pub mod mock {
    use super::*;
    use crate::error::StoreError;
    use crate::task::FieldChange;

    /// One successfully applied store operation.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Operation {
        CreateOrganizationalUnit(Dn),
        DeleteObject(Dn),
        CreatePosixGroup(Dn),
        UpdatePosixGroup(Dn),
        CreatePosixAccount(Dn),
        UpdatePosixAccount(Dn),
        DeletePosixAccount(Dn),
        CreateGroupOfNames(Dn),
        UpdateGroupOfNames(Dn),
        AddMember { group: Dn, member: Dn },
        DeleteMember { group: Dn, member: Dn },
        CreateSudoRole(Dn),
        UpdateSudoRole(Dn),
    }

    impl Operation {
        /// The DN of the entry the operation modified.
        pub fn dn(&self) -> &Dn {
            match self {
                Operation::AddMember { group, .. } | Operation::DeleteMember { group, .. } => group,
                Operation::CreateOrganizationalUnit(dn)
                | Operation::DeleteObject(dn)
                | Operation::CreatePosixGroup(dn)
                | Operation::UpdatePosixGroup(dn)
                | Operation::CreatePosixAccount(dn)
                | Operation::UpdatePosixAccount(dn)
                | Operation::DeletePosixAccount(dn)
                | Operation::CreateGroupOfNames(dn)
                | Operation::UpdateGroupOfNames(dn)
                | Operation::CreateSudoRole(dn)
                | Operation::UpdateSudoRole(dn) => dn,
            }
        }
    }

    /// A directory held in memory.
    ///
    /// Enforces the structural rules of a real server that ordering depends
    /// on: a created entry's parent must exist and only leaves can be
    /// deleted. Every successful operation is recorded.
    #[derive(Debug, Clone, Default)]
    pub struct MemoryStore {
        bases: Vec<Dn>,
        state: DirectoryState,
        operations: Vec<Operation>,
        fail_at: Option<Dn>,
    }

    impl MemoryStore {
        /// Creates an empty store. Single-component DNs and children of
        /// registered bases need no parent entry.
        pub fn new() -> Self {
            Self::default()
        }

        /// Registers base entries that exist outside the managed state.
        pub fn with_bases(mut self, bases: impl IntoIterator<Item = Dn>) -> Self {
            self.bases.extend(bases);
            self
        }

        /// Seeds the store with an existing state.
        pub fn with_state(mut self, state: DirectoryState) -> Self {
            self.state = state;
            self
        }

        /// Makes every operation on `dn` fail.
        pub fn fail_at(&mut self, dn: Dn) {
            self.fail_at = Some(dn);
        }

        /// Current contents.
        pub fn state(&self) -> &DirectoryState {
            &self.state
        }

        /// Operations applied so far, in order.
        pub fn operations(&self) -> &[Operation] {
            &self.operations
        }

        fn check_failure(&self, operation: &'static str, dn: &Dn) -> StoreResult<()> {
            if self.fail_at.as_ref() == Some(dn) {
                return Err(StoreError::Rejected {
                    operation,
                    dn: dn.clone(),
                    message: "injected failure".into(),
                });
            }
            Ok(())
        }

        fn exists(&self, dn: &Dn) -> bool {
            self.bases.contains(dn)
                || self.state.organizational_units.iter().any(|ou| &ou.dn == dn)
                || self.state.posix_groups.contains_key(dn)
                || self.state.accounts().any(|a| &a.dn == dn)
                || self.state.groups_of_names.contains_key(dn)
                || self.state.sudo_roles.iter().any(|r| &r.dn == dn)
        }

        fn has_children(&self, dn: &Dn) -> bool {
            let below = |other: &Dn| dn.is_ancestor_of(other);
            self.state.organizational_units.iter().any(|ou| below(&ou.dn))
                || self.state.posix_groups.keys().any(below)
                || self.state.accounts().any(|a| below(&a.dn))
                || self.state.groups_of_names.keys().any(below)
                || self.state.sudo_roles.iter().any(|r| below(&r.dn))
        }

        fn check_create(&self, operation: &'static str, dn: &Dn) -> StoreResult<()> {
            self.check_failure(operation, dn)?;
            if self.exists(dn) {
                return Err(StoreError::AlreadyExists(dn.clone()));
            }
            match dn.parent() {
                Some(parent) if !self.exists(&parent) => Err(StoreError::Rejected {
                    operation,
                    dn: dn.clone(),
                    message: format!("parent {parent} does not exist"),
                }),
                _ => Ok(()),
            }
        }

        fn group_mut(&mut self, dn: &Dn) -> StoreResult<&mut GroupOfNames> {
            self.state
                .groups_of_names
                .get_mut(dn)
                .ok_or_else(|| StoreError::NotFound(dn.clone()))
        }
    }

    #[async_trait]
    impl DirectoryStore for MemoryStore {
        async fn create_organizational_unit(&mut self, ou: &OrganizationalUnit) -> StoreResult<()> {
            self.check_create("create", &ou.dn)?;
            self.state.organizational_units.push(ou.clone());
            self.operations.push(Operation::CreateOrganizationalUnit(ou.dn.clone()));
            Ok(())
        }

        async fn delete_object(&mut self, dn: &Dn) -> StoreResult<()> {
            self.check_failure("delete", dn)?;
            if !self.exists(dn) || self.bases.contains(dn) {
                return Err(StoreError::NotFound(dn.clone()));
            }
            if self.has_children(dn) {
                return Err(StoreError::Rejected {
                    operation: "delete",
                    dn: dn.clone(),
                    message: "entry has children".into(),
                });
            }
            self.state.organizational_units.retain(|ou| &ou.dn != dn);
            self.state.posix_groups.remove(dn);
            for group in self.state.posix_groups.values_mut() {
                group.accounts.retain(|a| &a.dn != dn);
            }
            self.state.groups_of_names.remove(dn);
            self.state.sudo_roles.retain(|r| &r.dn != dn);
            self.operations.push(Operation::DeleteObject(dn.clone()));
            Ok(())
        }

        async fn create_posix_group(&mut self, group: &PosixGroup) -> StoreResult<()> {
            self.check_create("create", &group.dn)?;
            let group = PosixGroup {
                accounts: Vec::new(),
                ..group.clone()
            };
            self.operations.push(Operation::CreatePosixGroup(group.dn.clone()));
            self.state.posix_groups.insert(group.dn.clone(), group);
            Ok(())
        }

        async fn update_posix_group(&mut self, patch: &PosixGroupPatch) -> StoreResult<()> {
            self.check_failure("modify", &patch.dn)?;
            let group = self
                .state
                .posix_groups
                .get_mut(&patch.dn)
                .ok_or_else(|| StoreError::NotFound(patch.dn.clone()))?;
            if let Some(gid) = patch.gid_number {
                group.gid_number = gid;
            }
            if let Some(description) = &patch.description {
                group.description.clone_from(description);
            }
            self.operations.push(Operation::UpdatePosixGroup(patch.dn.clone()));
            Ok(())
        }

        async fn create_posix_account(&mut self, account: &PosixAccount) -> StoreResult<()> {
            self.check_create("create", &account.dn)?;
            let parent = account.dn.parent().unwrap_or_default();
            let group = self.state.posix_groups.get_mut(&parent).ok_or_else(|| StoreError::Rejected {
                operation: "create",
                dn: account.dn.clone(),
                message: format!("parent {parent} is not a posix group"),
            })?;
            group.accounts.push(account.clone());
            self.operations.push(Operation::CreatePosixAccount(account.dn.clone()));
            Ok(())
        }

        async fn delete_posix_account(&mut self, task: &DeleteAccountTask) -> StoreResult<()> {
            self.check_failure("delete", &task.dn)?;
            let parent = task.dn.parent().unwrap_or_default();
            let group = self
                .state
                .posix_groups
                .get_mut(&parent)
                .ok_or_else(|| StoreError::NotFound(task.dn.clone()))?;
            let before = group.accounts.len();
            group.accounts.retain(|a| a.dn != task.dn);
            if group.accounts.len() == before {
                return Err(StoreError::NotFound(task.dn.clone()));
            }
            self.operations.push(Operation::DeletePosixAccount(task.dn.clone()));
            Ok(())
        }

        async fn update_posix_account(&mut self, patch: &PosixAccountPatch) -> StoreResult<()> {
            self.check_failure("modify", &patch.dn)?;
            let parent = patch.dn.parent().unwrap_or_default();
            let account = self
                .state
                .posix_groups
                .get_mut(&parent)
                .and_then(|g| g.accounts.iter_mut().find(|a| a.dn == patch.dn))
                .ok_or_else(|| StoreError::NotFound(patch.dn.clone()))?;

            if let Some(v) = patch.uid_number {
                account.uid_number = Some(v);
            }
            if let Some(v) = patch.gid_number {
                account.gid_number = v;
            }
            let strings = [
                (&patch.given_name, &mut account.given_name),
                (&patch.surname, &mut account.surname),
                (&patch.display_name, &mut account.display_name),
                (&patch.login_shell, &mut account.login_shell),
                (&patch.mail, &mut account.mail),
                (&patch.home_dir, &mut account.home_dir),
                (&patch.user_password, &mut account.user_password),
            ];
            for (change, field) in strings {
                if let Some(value) = change {
                    field.clone_from(value);
                }
            }
            match &patch.ssh_public_key {
                FieldChange::Unchanged => {}
                FieldChange::Set(key) => account.ssh_public_key = Some(key.clone()),
                FieldChange::Cleared => account.ssh_public_key = None,
            }
            self.operations.push(Operation::UpdatePosixAccount(patch.dn.clone()));
            Ok(())
        }

        async fn create_group_of_names(&mut self, group: &GroupOfNames) -> StoreResult<()> {
            self.check_create("create", &group.dn)?;
            let group = GroupOfNames {
                members: Vec::new(),
                ..group.clone()
            };
            self.operations.push(Operation::CreateGroupOfNames(group.dn.clone()));
            self.state.groups_of_names.insert(group.dn.clone(), group);
            Ok(())
        }

        async fn update_group_of_names(&mut self, patch: &GroupOfNamesPatch) -> StoreResult<()> {
            self.check_failure("modify", &patch.dn)?;
            let group = self.group_mut(&patch.dn)?;
            if let Some(description) = &patch.description {
                group.description.clone_from(description);
            }
            self.operations.push(Operation::UpdateGroupOfNames(patch.dn.clone()));
            Ok(())
        }

        async fn add_member(&mut self, group_dn: &Dn, member_dn: &Dn) -> StoreResult<()> {
            self.check_failure("modify", member_dn)?;
            self.check_failure("modify", group_dn)?;
            if !self.state.accounts().any(|a| &a.dn == member_dn) {
                return Err(StoreError::Rejected {
                    operation: "modify",
                    dn: group_dn.clone(),
                    message: format!("member {member_dn} does not exist"),
                });
            }
            let uid = member_dn.rdn_value().to_string();
            let group = self.group_mut(group_dn)?;
            if group.members.contains(&uid) {
                return Err(StoreError::Rejected {
                    operation: "modify",
                    dn: group_dn.clone(),
                    message: format!("{member_dn} is already a member"),
                });
            }
            group.members.push(uid);
            self.operations.push(Operation::AddMember {
                group: group_dn.clone(),
                member: member_dn.clone(),
            });
            Ok(())
        }

        async fn delete_member(&mut self, group_dn: &Dn, member_dn: &Dn) -> StoreResult<()> {
            self.check_failure("modify", member_dn)?;
            self.check_failure("modify", group_dn)?;
            let uid = member_dn.rdn_value().to_string();
            let group = self.group_mut(group_dn)?;
            let before = group.members.len();
            group.members.retain(|m| *m != uid);
            if group.members.len() == before {
                return Err(StoreError::Rejected {
                    operation: "modify",
                    dn: group_dn.clone(),
                    message: format!("{member_dn} is not a member"),
                });
            }
            self.operations.push(Operation::DeleteMember {
                group: group_dn.clone(),
                member: member_dn.clone(),
            });
            Ok(())
        }

        async fn create_sudo_role(&mut self, role: &SudoRole) -> StoreResult<()> {
            self.check_create("create", &role.dn)?;
            self.state.sudo_roles.push(role.clone());
            self.operations.push(Operation::CreateSudoRole(role.dn.clone()));
            Ok(())
        }

        async fn update_sudo_role(&mut self, role: &SudoRole) -> StoreResult<()> {
            self.check_failure("modify", &role.dn)?;
            let existing = self
                .state
                .sudo_roles
                .iter_mut()
                .find(|r| r.dn == role.dn)
                .ok_or_else(|| StoreError::NotFound(role.dn.clone()))?;
            *existing = SudoRole {
                cn: existing.cn.clone(),
                ..role.clone()
            };
            self.operations.push(Operation::UpdateSudoRole(role.dn.clone()));
            Ok(())
        }
    }

    #[async_trait]
    impl DirectoryReader for MemoryStore {
        async fn read_state(&mut self) -> StoreResult<DirectoryState> {
            Ok(self.state.clone())
        }
    }
}
