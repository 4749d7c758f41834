//! Task payloads and the full set of queues produced by one comparison.

use crate::driver::Stage;
use crate::queue::{Task, TaskQueue};
use dirsync_types::{Dn, GroupOfNames, OrganizationalUnit, PosixAccount, PosixGroup, SudoRole};
use serde::Serialize;

/// Deletion of any object that needs nothing but its DN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteTask {
    pub dn: Dn,
}

/// Deletion of an account. The username is kept so the store can clean up
/// the parent group's `memberUid` and the renderer can name the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteAccountTask {
    pub dn: Dn,
    pub uid: String,
}

/// Change to an optional attribute that distinguishes "leave alone" from
/// "remove".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "change", content = "value")]
pub enum FieldChange<T> {
    #[default]
    Unchanged,
    Set(T),
    Cleared,
}

impl<T> FieldChange<T> {
    /// Returns true if the attribute is left alone.
    pub fn is_unchanged(&self) -> bool {
        matches!(self, FieldChange::Unchanged)
    }
}

/// Sparse update of a posix group. `None` fields are not touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PosixGroupPatch {
    pub dn: Dn,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gid_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Sparse update of an account. `None` fields are not touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PosixAccountPatch {
    pub dn: Dn,
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gid_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_shell: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_password: Option<String>,
    #[serde(skip_serializing_if = "FieldChange::is_unchanged")]
    pub ssh_public_key: FieldChange<String>,
}

impl PosixAccountPatch {
    /// An empty patch for the given account.
    pub fn new(dn: Dn, uid: impl Into<String>) -> Self {
        Self {
            dn,
            uid: uid.into(),
            uid_number: None,
            gid_number: None,
            given_name: None,
            surname: None,
            display_name: None,
            login_shell: None,
            mail: None,
            home_dir: None,
            user_password: None,
            ssh_public_key: FieldChange::Unchanged,
        }
    }

    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.uid_number.is_none()
            && self.gid_number.is_none()
            && self.given_name.is_none()
            && self.surname.is_none()
            && self.display_name.is_none()
            && self.login_shell.is_none()
            && self.mail.is_none()
            && self.home_dir.is_none()
            && self.user_password.is_none()
            && self.ssh_public_key.is_unchanged()
    }

    /// Names of the attributes this patch touches, in a fixed order.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let checks = [
            ("uid_number", self.uid_number.is_some()),
            ("gid_number", self.gid_number.is_some()),
            ("given_name", self.given_name.is_some()),
            ("surname", self.surname.is_some()),
            ("display_name", self.display_name.is_some()),
            ("login_shell", self.login_shell.is_some()),
            ("mail", self.mail.is_some()),
            ("home_dir", self.home_dir.is_some()),
            ("user_password", self.user_password.is_some()),
            ("ssh_public_key", !self.ssh_public_key.is_unchanged()),
        ];
        for (name, changed) in checks {
            if changed {
                fields.push(name);
            }
        }
        fields
    }
}

/// Sparse update of a group of names. Only the description is mutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupOfNamesPatch {
    pub dn: Dn,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Addition or removal of one member of a group of names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberTask {
    pub group_dn: Dn,
    pub member_dn: Dn,
    pub uid: String,
}

impl Task for OrganizationalUnit {
    fn dn(&self) -> &Dn {
        &self.dn
    }
}

impl Task for PosixGroup {
    fn dn(&self) -> &Dn {
        &self.dn
    }
}

impl Task for PosixAccount {
    fn dn(&self) -> &Dn {
        &self.dn
    }
}

impl Task for GroupOfNames {
    fn dn(&self) -> &Dn {
        &self.dn
    }
}

impl Task for SudoRole {
    fn dn(&self) -> &Dn {
        &self.dn
    }
}

impl Task for DeleteTask {
    fn dn(&self) -> &Dn {
        &self.dn
    }
}

impl Task for DeleteAccountTask {
    fn dn(&self) -> &Dn {
        &self.dn
    }
}

impl Task for PosixGroupPatch {
    fn dn(&self) -> &Dn {
        &self.dn
    }
}

impl Task for PosixAccountPatch {
    fn dn(&self) -> &Dn {
        &self.dn
    }
}

impl Task for GroupOfNamesPatch {
    fn dn(&self) -> &Dn {
        &self.dn
    }
}

impl Task for MemberTask {
    fn dn(&self) -> &Dn {
        &self.group_dn
    }
}

/// Every queue filled by one comparison pass.
///
/// Create payloads for posix groups and groups of names carry no children:
/// accounts and memberships travel in their own queues.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskSet {
    pub create_organizational_units: TaskQueue<OrganizationalUnit>,
    pub delete_organizational_units: TaskQueue<DeleteTask>,
    pub create_posix_groups: TaskQueue<PosixGroup>,
    pub update_posix_groups: TaskQueue<PosixGroupPatch>,
    pub delete_posix_groups: TaskQueue<DeleteTask>,
    pub create_posix_accounts: TaskQueue<PosixAccount>,
    pub update_posix_accounts: TaskQueue<PosixAccountPatch>,
    pub delete_posix_accounts: TaskQueue<DeleteAccountTask>,
    pub create_groups_of_names: TaskQueue<GroupOfNames>,
    pub update_groups_of_names: TaskQueue<GroupOfNamesPatch>,
    pub delete_groups_of_names: TaskQueue<DeleteTask>,
    pub add_members: TaskQueue<MemberTask>,
    pub delete_members: TaskQueue<MemberTask>,
    pub create_sudo_roles: TaskQueue<SudoRole>,
    pub update_sudo_roles: TaskQueue<SudoRole>,
    pub delete_sudo_roles: TaskQueue<DeleteTask>,
}

/// A borrowed task tagged with what it does.
#[derive(Debug, Clone, Copy)]
pub enum TaskRef<'a> {
    CreateOrganizationalUnit(&'a OrganizationalUnit),
    DeleteOrganizationalUnit(&'a DeleteTask),
    CreatePosixGroup(&'a PosixGroup),
    UpdatePosixGroup(&'a PosixGroupPatch),
    DeletePosixGroup(&'a DeleteTask),
    CreatePosixAccount(&'a PosixAccount),
    UpdatePosixAccount(&'a PosixAccountPatch),
    DeletePosixAccount(&'a DeleteAccountTask),
    CreateGroupOfNames(&'a GroupOfNames),
    UpdateGroupOfNames(&'a GroupOfNamesPatch),
    DeleteGroupOfNames(&'a DeleteTask),
    AddMember(&'a MemberTask),
    DeleteMember(&'a MemberTask),
    CreateSudoRole(&'a SudoRole),
    UpdateSudoRole(&'a SudoRole),
    DeleteSudoRole(&'a DeleteTask),
}

impl TaskRef<'_> {
    /// DN of the entry this task acts on. For member tasks this is the member.
    pub fn dn(&self) -> &Dn {
        match self {
            TaskRef::CreateOrganizationalUnit(t) => &t.dn,
            TaskRef::CreatePosixGroup(t) => &t.dn,
            TaskRef::UpdatePosixGroup(t) => &t.dn,
            TaskRef::CreatePosixAccount(t) => &t.dn,
            TaskRef::UpdatePosixAccount(t) => &t.dn,
            TaskRef::DeletePosixAccount(t) => &t.dn,
            TaskRef::CreateGroupOfNames(t) => &t.dn,
            TaskRef::UpdateGroupOfNames(t) => &t.dn,
            TaskRef::AddMember(t) | TaskRef::DeleteMember(t) => &t.member_dn,
            TaskRef::CreateSudoRole(t) | TaskRef::UpdateSudoRole(t) => &t.dn,
            TaskRef::DeleteOrganizationalUnit(t)
            | TaskRef::DeletePosixGroup(t)
            | TaskRef::DeleteGroupOfNames(t)
            | TaskRef::DeleteSudoRole(t) => &t.dn,
        }
    }
}

fn collect<'a, T: 'a>(
    iter: impl Iterator<Item = &'a T>,
    wrap: fn(&'a T) -> TaskRef<'a>,
) -> Vec<TaskRef<'a>> {
    iter.map(wrap).collect()
}

impl TaskSet {
    /// Creates an empty task set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks of one stage in the order they must be applied.
    ///
    /// Every stage drains its queue forward except organizational unit
    /// deletion, which drains backward so the deepest containers go first.
    pub fn stage_tasks(&self, stage: Stage) -> Vec<TaskRef<'_>> {
        match stage {
            Stage::CreateOrganizationalUnits => collect(
                self.create_organizational_units.iter(),
                TaskRef::CreateOrganizationalUnit,
            ),
            Stage::DeleteMembers => collect(self.delete_members.iter(), TaskRef::DeleteMember),
            Stage::DeletePosixAccounts => {
                collect(self.delete_posix_accounts.iter(), TaskRef::DeletePosixAccount)
            }
            Stage::CreatePosixGroups => {
                collect(self.create_posix_groups.iter(), TaskRef::CreatePosixGroup)
            }
            Stage::DeletePosixGroups => {
                collect(self.delete_posix_groups.iter(), TaskRef::DeletePosixGroup)
            }
            Stage::UpdatePosixGroups => {
                collect(self.update_posix_groups.iter(), TaskRef::UpdatePosixGroup)
            }
            Stage::CreatePosixAccounts => {
                collect(self.create_posix_accounts.iter(), TaskRef::CreatePosixAccount)
            }
            Stage::UpdatePosixAccounts => {
                collect(self.update_posix_accounts.iter(), TaskRef::UpdatePosixAccount)
            }
            Stage::CreateGroupsOfNames => {
                collect(self.create_groups_of_names.iter(), TaskRef::CreateGroupOfNames)
            }
            Stage::UpdateGroupsOfNames => {
                collect(self.update_groups_of_names.iter(), TaskRef::UpdateGroupOfNames)
            }
            Stage::AddMembers => collect(self.add_members.iter(), TaskRef::AddMember),
            Stage::CreateSudoRoles => {
                collect(self.create_sudo_roles.iter(), TaskRef::CreateSudoRole)
            }
            Stage::UpdateSudoRoles => {
                collect(self.update_sudo_roles.iter(), TaskRef::UpdateSudoRole)
            }
            Stage::DeleteSudoRoles => {
                collect(self.delete_sudo_roles.iter(), TaskRef::DeleteSudoRole)
            }
            Stage::DeleteGroupsOfNames => {
                collect(self.delete_groups_of_names.iter(), TaskRef::DeleteGroupOfNames)
            }
            Stage::DeleteOrganizationalUnits => collect(
                self.delete_organizational_units.iter().rev(),
                TaskRef::DeleteOrganizationalUnit,
            ),
        }
    }

    /// Number of tasks queued for one stage.
    pub fn stage_len(&self, stage: Stage) -> usize {
        match stage {
            Stage::CreateOrganizationalUnits => self.create_organizational_units.len(),
            Stage::DeleteMembers => self.delete_members.len(),
            Stage::DeletePosixAccounts => self.delete_posix_accounts.len(),
            Stage::CreatePosixGroups => self.create_posix_groups.len(),
            Stage::DeletePosixGroups => self.delete_posix_groups.len(),
            Stage::UpdatePosixGroups => self.update_posix_groups.len(),
            Stage::CreatePosixAccounts => self.create_posix_accounts.len(),
            Stage::UpdatePosixAccounts => self.update_posix_accounts.len(),
            Stage::CreateGroupsOfNames => self.create_groups_of_names.len(),
            Stage::UpdateGroupsOfNames => self.update_groups_of_names.len(),
            Stage::AddMembers => self.add_members.len(),
            Stage::CreateSudoRoles => self.create_sudo_roles.len(),
            Stage::UpdateSudoRoles => self.update_sudo_roles.len(),
            Stage::DeleteSudoRoles => self.delete_sudo_roles.len(),
            Stage::DeleteGroupsOfNames => self.delete_groups_of_names.len(),
            Stage::DeleteOrganizationalUnits => self.delete_organizational_units.len(),
        }
    }

    /// Total number of queued tasks.
    pub fn total_len(&self) -> usize {
        Stage::ALL.iter().map(|s| self.stage_len(*s)).sum()
    }

    /// Returns true if nothing needs to change.
    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }
}
