//! Stage driver: drains a [`TaskSet`] into a [`DirectoryStore`].

use crate::error::{SyncError, SyncResult};
use crate::store::DirectoryStore;
use crate::task::{TaskRef, TaskSet};
use dirsync_types::IdAllocator;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// One step of the fixed application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CreateOrganizationalUnits,
    DeleteMembers,
    DeletePosixAccounts,
    CreatePosixGroups,
    DeletePosixGroups,
    UpdatePosixGroups,
    CreatePosixAccounts,
    UpdatePosixAccounts,
    CreateGroupsOfNames,
    UpdateGroupsOfNames,
    AddMembers,
    CreateSudoRoles,
    UpdateSudoRoles,
    DeleteSudoRoles,
    DeleteGroupsOfNames,
    DeleteOrganizationalUnits,
}

impl Stage {
    /// All stages in application order.
    pub const ALL: [Stage; 16] = [
        Stage::CreateOrganizationalUnits,
        Stage::DeleteMembers,
        Stage::DeletePosixAccounts,
        Stage::CreatePosixGroups,
        Stage::DeletePosixGroups,
        Stage::UpdatePosixGroups,
        Stage::CreatePosixAccounts,
        Stage::UpdatePosixAccounts,
        Stage::CreateGroupsOfNames,
        Stage::UpdateGroupsOfNames,
        Stage::AddMembers,
        Stage::CreateSudoRoles,
        Stage::UpdateSudoRoles,
        Stage::DeleteSudoRoles,
        Stage::DeleteGroupsOfNames,
        Stage::DeleteOrganizationalUnits,
    ];

    /// Human readable stage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::CreateOrganizationalUnits => "create organizational units",
            Stage::DeleteMembers => "delete groupOfNames members",
            Stage::DeletePosixAccounts => "delete posix accounts",
            Stage::CreatePosixGroups => "create posix groups",
            Stage::DeletePosixGroups => "delete posix groups",
            Stage::UpdatePosixGroups => "update posix groups",
            Stage::CreatePosixAccounts => "create posix accounts",
            Stage::UpdatePosixAccounts => "update posix accounts",
            Stage::CreateGroupsOfNames => "create groupOfNames",
            Stage::UpdateGroupsOfNames => "update groupOfNames",
            Stage::AddMembers => "add groupOfNames members",
            Stage::CreateSudoRoles => "create sudo roles",
            Stage::UpdateSudoRoles => "update sudo roles",
            Stage::DeleteSudoRoles => "delete sudo roles",
            Stage::DeleteGroupsOfNames => "delete groupOfNames",
            Stage::DeleteOrganizationalUnits => "delete organizational units",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful apply run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Number of tasks applied per non-empty stage, in application order.
    pub stages: Vec<(Stage, usize)>,
}

impl SyncReport {
    /// Total number of tasks applied.
    pub fn applied(&self) -> usize {
        self.stages.iter().map(|(_, n)| n).sum()
    }
}

/// Applies task sets stage by stage.
///
/// The driver is fail-fast: the first store error aborts the run and is
/// returned annotated with the stage and DN. Tasks applied before the
/// failure stay applied; re-running the comparison yields the remainder.
#[derive(Debug, Clone, Default)]
pub struct SyncDriver {
    id_allocator: Option<IdAllocator>,
}

impl SyncDriver {
    /// A driver that passes account `uidNumber`s through unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// A driver that assigns a fresh `uidNumber` to every created account
    /// that has none.
    pub fn with_id_allocator(allocator: IdAllocator) -> Self {
        Self {
            id_allocator: Some(allocator),
        }
    }

    /// Current allocator state, if id generation is enabled.
    pub fn id_allocator(&self) -> Option<&IdAllocator> {
        self.id_allocator.as_ref()
    }

    /// Applies every task in stage order.
    pub async fn apply<S>(&mut self, tasks: &TaskSet, store: &mut S) -> SyncResult<SyncReport>
    where
        S: DirectoryStore + ?Sized,
    {
        let mut report = SyncReport::default();

        for stage in Stage::ALL {
            let stage_tasks = tasks.stage_tasks(stage);
            if stage_tasks.is_empty() {
                continue;
            }
            info!("{}: {} task(s)", stage, stage_tasks.len());

            for task in &stage_tasks {
                self.apply_task(stage, *task, store).await?;
            }
            report.stages.push((stage, stage_tasks.len()));
        }

        info!("applied {} task(s)", report.applied());
        Ok(report)
    }

    async fn apply_task<S>(&mut self, stage: Stage, task: TaskRef<'_>, store: &mut S) -> SyncResult<()>
    where
        S: DirectoryStore + ?Sized,
    {
        debug!("{stage}: {}", task.dn());

        let result = match task {
            TaskRef::CreateOrganizationalUnit(ou) => store.create_organizational_unit(ou).await,
            TaskRef::DeleteOrganizationalUnit(t)
            | TaskRef::DeletePosixGroup(t)
            | TaskRef::DeleteGroupOfNames(t)
            | TaskRef::DeleteSudoRole(t) => store.delete_object(&t.dn).await,
            TaskRef::CreatePosixGroup(group) => store.create_posix_group(group).await,
            TaskRef::UpdatePosixGroup(patch) => store.update_posix_group(patch).await,
            TaskRef::CreatePosixAccount(account) => {
                let mut account = account.clone();
                if account.uid_number.is_none() {
                    let allocator = self
                        .id_allocator
                        .as_mut()
                        .ok_or_else(|| SyncError::MissingUidNumber(account.dn.clone()))?;
                    let id = allocator.next_id().map_err(|source| SyncError::IdAllocation {
                        dn: account.dn.clone(),
                        source,
                    })?;
                    debug!("assigned uidNumber {id} to {}", account.dn);
                    account.uid_number = Some(id);
                }
                store.create_posix_account(&account).await
            }
            TaskRef::UpdatePosixAccount(patch) => store.update_posix_account(patch).await,
            TaskRef::DeletePosixAccount(t) => store.delete_posix_account(t).await,
            TaskRef::CreateGroupOfNames(group) => store.create_group_of_names(group).await,
            TaskRef::UpdateGroupOfNames(patch) => store.update_group_of_names(patch).await,
            TaskRef::AddMember(m) => store.add_member(&m.group_dn, &m.member_dn).await,
            TaskRef::DeleteMember(m) => store.delete_member(&m.group_dn, &m.member_dn).await,
            TaskRef::CreateSudoRole(role) => store.create_sudo_role(role).await,
            TaskRef::UpdateSudoRole(role) => store.update_sudo_role(role).await,
        };

        result.map_err(|source| SyncError::Apply {
            stage,
            dn: task.dn().clone(),
            source,
        })
    }
}
