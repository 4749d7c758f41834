//! Comparator: turns a desired and an observed [`DirectoryState`] into the
//! [`TaskSet`] that converges the directory.
//!
//! The comparison is a pure function of its inputs. Running it twice on the
//! same states yields the same queues in the same order.

use crate::error::{SyncError, SyncResult};
use crate::task::{
    DeleteAccountTask, DeleteTask, FieldChange, GroupOfNamesPatch, MemberTask, PosixAccountPatch,
    PosixGroupPatch, TaskSet,
};
use dirsync_types::{
    DirectoryState, Dn, GroupOfNames, OrganizationalUnit, PosixAccount, PosixGroup, SudoRole,
    DUMMY_MEMBER,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, info, warn};

/// Name of the unit that holds a directory's sudo roles.
const SUDOERS_OU: &str = "SUDOers";

/// Feature switches that change what is compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompareOptions {
    /// Compare `sshPublicKey` on accounts.
    pub ssh_public_keys: bool,
    /// Compare sudo roles. When off, observed roles and the units holding
    /// them are left alone.
    pub sudo: bool,
}

/// Computes every task needed to converge `observed` to `desired`.
pub fn reconcile(
    desired: &DirectoryState,
    observed: &DirectoryState,
    options: CompareOptions,
) -> SyncResult<TaskSet> {
    let mut tasks = TaskSet::new();

    compare_organizational_units(
        &desired.organizational_units,
        &observed.organizational_units,
        (!options.sudo).then_some(observed.sudo_roles.as_slice()),
        &mut tasks,
    );
    compare_posix_groups(desired, observed, options, &mut tasks)?;
    compare_groups_of_names(desired, observed, &mut tasks);
    if options.sudo {
        compare_sudo_roles(&desired.sudo_roles, &observed.sudo_roles, &mut tasks);
    }

    info!("comparison finished with {} task(s)", tasks.total_len());
    Ok(tasks)
}

fn sorted_by_dn_len<T>(items: &[T], dn: impl Fn(&T) -> &Dn) -> Vec<&T> {
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by_key(|item| dn(item).len());
    sorted
}

/// Organizational units are only ever created or deleted.
///
/// `unmanaged_roles` is set when sudo roles are not compared. Observed
/// `SUDOers` units and any unit holding one of those roles are then kept.
fn compare_organizational_units(
    desired: &[OrganizationalUnit],
    observed: &[OrganizationalUnit],
    unmanaged_roles: Option<&[SudoRole]>,
    tasks: &mut TaskSet,
) {
    info!("comparing organizational units");

    let desired = sorted_by_dn_len(desired, |ou| &ou.dn);
    let observed = sorted_by_dn_len(observed, |ou| &ou.dn);
    let desired_dns: HashSet<&Dn> = desired.iter().map(|ou| &ou.dn).collect();
    let observed_dns: HashSet<&Dn> = observed.iter().map(|ou| &ou.dn).collect();

    for ou in &desired {
        if !observed_dns.contains(&ou.dn) {
            debug!("marked organizational unit for creation {}", ou.dn);
            tasks.create_organizational_units.push((*ou).clone());
        }
    }

    for ou in &observed {
        if desired_dns.contains(&ou.dn) {
            continue;
        }
        if unmanaged_roles.is_some_and(|roles| holds_sudo_roles(&ou.dn, roles)) {
            debug!("kept organizational unit {} holding sudo roles", ou.dn);
        } else {
            debug!("marked organizational unit for deletion {}", ou.dn);
            tasks.delete_organizational_units.push(DeleteTask { dn: ou.dn.clone() });
        }
    }
}

fn holds_sudo_roles(dn: &Dn, roles: &[SudoRole]) -> bool {
    dn.rdn_value().eq_ignore_ascii_case(SUDOERS_OU)
        || roles.iter().any(|role| dn.is_ancestor_of(&role.dn))
}

/// Posix groups and the accounts below them. Accounts are matched by
/// username within the same group; a move between groups is a delete plus
/// a create.
fn compare_posix_groups(
    desired: &DirectoryState,
    observed: &DirectoryState,
    options: CompareOptions,
    tasks: &mut TaskSet,
) -> SyncResult<()> {
    info!("comparing posix groups");

    for (dn, local) in &desired.posix_groups {
        let remote = observed.posix_groups.get(dn);

        match remote {
            None => {
                debug!("marked posix group for creation {dn}");
                tasks.create_posix_groups.push(PosixGroup {
                    accounts: Vec::new(),
                    ..local.clone()
                });
            }
            Some(remote) => {
                if let Some(patch) = compare_posix_group(local, remote) {
                    debug!("marked posix group for update {dn}");
                    tasks.update_posix_groups.push(patch);
                }
            }
        }

        let remote_accounts = remote.map_or(&[][..], |g| g.accounts.as_slice());
        for account in &local.accounts {
            match remote_accounts.iter().find(|r| r.uid == account.uid) {
                Some(existing) => {
                    if let Some(patch) =
                        compare_posix_account(account, existing, options.ssh_public_keys)?
                    {
                        debug!("marked posix account for update {}", existing.dn);
                        tasks.update_posix_accounts.push(patch);
                    }
                }
                None => {
                    debug!("marked posix account for creation {}", account.dn);
                    tasks.create_posix_accounts.push(account.clone());
                }
            }
        }
    }

    for (dn, remote) in &observed.posix_groups {
        let local = desired.posix_groups.get(dn);
        if local.is_none() {
            debug!("marked posix group for deletion {dn}");
            tasks.delete_posix_groups.push(DeleteTask { dn: dn.clone() });
        }

        let local_accounts = local.map_or(&[][..], |g| g.accounts.as_slice());
        for account in &remote.accounts {
            if !local_accounts.iter().any(|l| l.uid == account.uid) {
                debug!("marked posix account for deletion {}", account.dn);
                tasks.delete_posix_accounts.push(DeleteAccountTask {
                    dn: account.dn.clone(),
                    uid: account.uid.clone(),
                });
            }
        }
    }

    Ok(())
}

fn compare_posix_group(local: &PosixGroup, remote: &PosixGroup) -> Option<PosixGroupPatch> {
    let patch = PosixGroupPatch {
        dn: remote.dn.clone(),
        gid_number: (local.gid_number != remote.gid_number).then_some(local.gid_number),
        description: (local.description != remote.description).then(|| local.description.clone()),
    };
    (patch.gid_number.is_some() || patch.description.is_some()).then_some(patch)
}

/// Compares two accounts with the same username and returns the sparse
/// patch that turns `remote` into `local`, or `None` if they match.
///
/// `uid_number` is only compared when `local` carries one; `gid_number` is
/// always compared. The SSH key is only compared when `ssh_public_keys` is
/// set, and a key missing locally but present remotely yields
/// [`FieldChange::Cleared`].
pub fn compare_posix_account(
    local: &PosixAccount,
    remote: &PosixAccount,
    ssh_public_keys: bool,
) -> SyncResult<Option<PosixAccountPatch>> {
    if local.uid != remote.uid {
        return Err(SyncError::UidMismatch {
            local: local.uid.clone(),
            remote: remote.uid.clone(),
        });
    }

    fn changed(local: &str, remote: &str) -> Option<String> {
        (local != remote).then(|| local.to_string())
    }

    let mut patch = PosixAccountPatch::new(remote.dn.clone(), &local.uid);
    patch.given_name = changed(&local.given_name, &remote.given_name);
    patch.surname = changed(&local.surname, &remote.surname);
    patch.display_name = changed(&local.display_name, &remote.display_name);
    patch.login_shell = changed(&local.login_shell, &remote.login_shell);
    patch.mail = changed(&local.mail, &remote.mail);
    patch.home_dir = changed(&local.home_dir, &remote.home_dir);
    patch.user_password = changed(&local.user_password, &remote.user_password);

    if ssh_public_keys {
        patch.ssh_public_key = match (&local.ssh_public_key, &remote.ssh_public_key) {
            (None, Some(_)) => FieldChange::Cleared,
            (Some(l), Some(r)) if l != r => FieldChange::Set(l.clone()),
            (Some(l), None) => FieldChange::Set(l.clone()),
            _ => FieldChange::Unchanged,
        };
    }

    if let Some(uid_number) = local.uid_number
        && Some(uid_number) != remote.uid_number
    {
        patch.uid_number = Some(uid_number);
    }

    if local.gid_number != remote.gid_number {
        patch.gid_number = Some(local.gid_number);
    }

    Ok((!patch.is_empty()).then_some(patch))
}

fn is_placeholder(member: &str) -> bool {
    member == DUMMY_MEMBER || Dn::new(DUMMY_MEMBER).rdn_value() == member
}

fn member_task(
    group_dn: &Dn,
    uid: &str,
    index: &HashMap<&str, &Dn>,
) -> Option<MemberTask> {
    index.get(uid).map(|member_dn| MemberTask {
        group_dn: group_dn.clone(),
        member_dn: (*member_dn).clone(),
        uid: uid.to_string(),
    })
}

/// Groups of names and their memberships.
///
/// Members to add are resolved against the desired accounts; members to
/// remove against the observed accounts, since they may no longer exist in
/// the desired state. An unresolvable username is logged and skipped.
fn compare_groups_of_names(
    desired: &DirectoryState,
    observed: &DirectoryState,
    tasks: &mut TaskSet,
) {
    info!("comparing groupOfNames");

    let desired_index = desired.uid_index();
    let observed_index = observed.uid_index();

    for (dn, local) in &desired.groups_of_names {
        let remote_members: &[String] = match observed.groups_of_names.get(dn) {
            None => {
                debug!("marked groupOfNames for creation {dn}");
                tasks.create_groups_of_names.push(GroupOfNames {
                    members: Vec::new(),
                    ..local.clone()
                });
                &[]
            }
            Some(remote) => {
                if local.description != remote.description {
                    debug!("marked groupOfNames for update {dn}");
                    tasks.update_groups_of_names.push(GroupOfNamesPatch {
                        dn: dn.clone(),
                        description: Some(local.description.clone()),
                    });
                }
                &remote.members
            }
        };

        for uid in &local.members {
            if remote_members.contains(uid) {
                continue;
            }
            match member_task(dn, uid, &desired_index) {
                Some(task) => {
                    debug!("marked member {} for addition to {dn}", task.member_dn);
                    tasks.add_members.push(task);
                }
                None => error!("unknown username {uid} for member of {dn}"),
            }
        }
    }

    for (dn, remote) in &observed.groups_of_names {
        let Some(local) = desired.groups_of_names.get(dn) else {
            debug!("marked groupOfNames for deletion {dn}");
            tasks.delete_groups_of_names.push(DeleteTask { dn: dn.clone() });
            continue;
        };

        for uid in &remote.members {
            if is_placeholder(uid) || local.members.contains(uid) {
                continue;
            }
            match member_task(dn, uid, &observed_index) {
                Some(task) => {
                    debug!("marked member {} for removal from {dn}", task.member_dn);
                    tasks.delete_members.push(task);
                }
                None => warn!("member {uid} of {dn} has no account in the directory; skipped"),
            }
        }
    }
}

fn compare_sudo_roles(desired: &[SudoRole], observed: &[SudoRole], tasks: &mut TaskSet) {
    info!("comparing sudo roles");

    let desired = sorted_by_dn_len(desired, |r| &r.dn);
    let observed = sorted_by_dn_len(observed, |r| &r.dn);
    let observed_by_dn: HashMap<&Dn, &SudoRole> = observed.iter().map(|r| (&r.dn, *r)).collect();
    let desired_dns: HashSet<&Dn> = desired.iter().map(|r| &r.dn).collect();

    for role in &desired {
        match observed_by_dn.get(&role.dn) {
            Some(remote) => {
                if let Some(update) = compare_sudo_role(role, remote) {
                    debug!("marked sudo role for update {}", role.dn);
                    tasks.update_sudo_roles.push(update);
                }
            }
            None => {
                debug!("marked sudo role for creation {}", role.dn);
                tasks.create_sudo_roles.push((*role).clone());
            }
        }
    }

    for role in &observed {
        if !desired_dns.contains(&role.dn) {
            debug!("marked sudo role for deletion {}", role.dn);
            tasks.delete_sudo_roles.push(DeleteTask { dn: role.dn.clone() });
        }
    }
}

/// Compares two sudo roles, ignoring the order of list attributes.
///
/// On mismatch the whole desired role is returned (with sorted lists), since
/// applying it must also clear attributes that are absent locally.
pub fn compare_sudo_role(local: &SudoRole, remote: &SudoRole) -> Option<SudoRole> {
    let local = local.normalized();
    let remote = remote.normalized();

    let mismatch = local.description != remote.description
        || local.sudo_order != remote.sudo_order
        || local
            .list_attributes()
            .iter()
            .zip(remote.list_attributes().iter())
            .any(|((_, l), (_, r))| l != r);

    mismatch.then_some(local)
}
