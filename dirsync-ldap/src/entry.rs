//! Turns search results into directory objects.

use dirsync_sync::{StoreError, StoreResult};
use dirsync_types::{
    DirectoryState, Dn, GroupOfNames, OrganizationalUnit, PosixAccount, PosixGroup, SudoRole,
    DUMMY_MEMBER,
};
use ldap3::SearchEntry;
use std::str::FromStr;
use tracing::{debug, warn};

/// Object kinds recognised below the managed bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    OrganizationalUnit,
    PosixGroup,
    PosixAccount,
    GroupOfNames,
    SudoRole,
}

impl EntryKind {
    /// Classifies an entry by its structural object class.
    pub fn of(entry: &SearchEntry) -> Option<Self> {
        let classes = values(entry, "objectClass");
        let has = |class: &str| classes.iter().any(|c| c.eq_ignore_ascii_case(class));
        if has("posixAccount") {
            Some(EntryKind::PosixAccount)
        } else if has("posixGroup") {
            Some(EntryKind::PosixGroup)
        } else if has("groupOfNames") {
            Some(EntryKind::GroupOfNames)
        } else if has("sudoRole") {
            Some(EntryKind::SudoRole)
        } else if has("organizationalUnit") {
            Some(EntryKind::OrganizationalUnit)
        } else {
            None
        }
    }
}

/// All values of an attribute, matched case-insensitively.
pub fn values<'a>(entry: &'a SearchEntry, attr: &str) -> &'a [String] {
    entry
        .attrs
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(attr))
        .map(|(_, v)| v.as_slice())
        .unwrap_or_default()
}

fn first(entry: &SearchEntry, attr: &str) -> Option<String> {
    values(entry, attr).first().cloned()
}

fn text(entry: &SearchEntry, attr: &str) -> String {
    first(entry, attr).unwrap_or_default()
}

fn number<T: FromStr>(entry: &SearchEntry, attr: &str) -> StoreResult<Option<T>> {
    first(entry, attr)
        .map(|v| {
            v.trim().parse().map_err(|_| {
                StoreError::Protocol(format!("{}: {attr} is not a number: {v:?}", entry.dn))
            })
        })
        .transpose()
}

/// Reduces a member DN to the username it names.
pub fn member_uid(member: &str) -> Option<&str> {
    if member.eq_ignore_ascii_case(DUMMY_MEMBER) {
        return None;
    }
    let rdn = member.split(',').next()?;
    rdn.split_once('=').map(|(_, value)| value.trim())
}

/// Adds every entry of the people subtree to `state`.
///
/// Accounts are attached to the posix group named by their parent DN;
/// accounts without such a group are skipped with a warning.
pub fn read_people(
    base: &Dn,
    entries: impl IntoIterator<Item = SearchEntry>,
    state: &mut DirectoryState,
) -> StoreResult<()> {
    let mut accounts = Vec::new();
    for entry in entries {
        if entry.dn.eq_ignore_ascii_case(base.as_str()) {
            continue;
        }
        match EntryKind::of(&entry) {
            Some(EntryKind::OrganizationalUnit) => {
                debug!("found OU {}", entry.dn);
                state.organizational_units.push(organizational_unit(&entry));
            }
            Some(EntryKind::PosixGroup) => {
                debug!("found posixGroup {}", entry.dn);
                let group = posix_group(&entry)?;
                state.posix_groups.insert(group.dn.clone(), group);
            }
            Some(EntryKind::PosixAccount) => {
                debug!("found posixAccount {}", entry.dn);
                accounts.push(posix_account(&entry)?);
            }
            _ => warn!("skipping {} with unexpected objectClass", entry.dn),
        }
    }

    for account in accounts {
        let parent = account.dn.parent().unwrap_or_default();
        match state.posix_groups.get_mut(&parent) {
            Some(group) => group.accounts.push(account),
            None => warn!("skipping {}: parent is not a posixGroup", account.dn),
        }
    }
    Ok(())
}

/// Adds every entry of the group subtree to `state`.
pub fn read_groups(
    base: &Dn,
    entries: impl IntoIterator<Item = SearchEntry>,
    state: &mut DirectoryState,
) -> StoreResult<()> {
    for entry in entries {
        if entry.dn.eq_ignore_ascii_case(base.as_str()) {
            continue;
        }
        match EntryKind::of(&entry) {
            Some(EntryKind::OrganizationalUnit) => {
                debug!("found OU {}", entry.dn);
                state.organizational_units.push(organizational_unit(&entry));
            }
            Some(EntryKind::GroupOfNames) => {
                debug!("found groupOfNames {}", entry.dn);
                let group = group_of_names(&entry);
                state.groups_of_names.insert(group.dn.clone(), group);
            }
            Some(EntryKind::SudoRole) => {
                debug!("found sudoRole {}", entry.dn);
                state.sudo_roles.push(sudo_role(&entry)?);
            }
            _ => warn!("skipping {} with unexpected objectClass", entry.dn),
        }
    }
    Ok(())
}

pub fn organizational_unit(entry: &SearchEntry) -> OrganizationalUnit {
    let dn = Dn::new(entry.dn.clone());
    OrganizationalUnit {
        name: first(entry, "ou").unwrap_or_else(|| dn.rdn_value().to_string()),
        description: text(entry, "description"),
        dn,
    }
}

pub fn posix_group(entry: &SearchEntry) -> StoreResult<PosixGroup> {
    let dn = Dn::new(entry.dn.clone());
    Ok(PosixGroup {
        cn: first(entry, "cn").unwrap_or_else(|| dn.rdn_value().to_string()),
        gid_number: number(entry, "gidNumber")?.unwrap_or_default(),
        description: text(entry, "description"),
        accounts: Vec::new(),
        dn,
    })
}

pub fn posix_account(entry: &SearchEntry) -> StoreResult<PosixAccount> {
    let dn = Dn::new(entry.dn.clone());
    let uid = first(entry, "uid")
        .or_else(|| first(entry, "cn"))
        .unwrap_or_else(|| dn.rdn_value().to_string());
    Ok(PosixAccount {
        uid,
        uid_number: number(entry, "uidNumber")?,
        gid_number: number(entry, "gidNumber")?.unwrap_or_default(),
        given_name: text(entry, "givenName"),
        surname: text(entry, "sn"),
        display_name: text(entry, "displayName"),
        login_shell: text(entry, "loginShell"),
        mail: text(entry, "mail"),
        ssh_public_key: first(entry, "sshPublicKey"),
        home_dir: text(entry, "homeDirectory"),
        user_password: text(entry, "userPassword"),
        dn,
    })
}

pub fn group_of_names(entry: &SearchEntry) -> GroupOfNames {
    let dn = Dn::new(entry.dn.clone());
    GroupOfNames {
        cn: first(entry, "cn").unwrap_or_else(|| dn.rdn_value().to_string()),
        description: text(entry, "description"),
        members: values(entry, "member")
            .iter()
            .filter_map(|m| member_uid(m))
            .map(str::to_string)
            .collect(),
        dn,
    }
}

pub fn sudo_role(entry: &SearchEntry) -> StoreResult<SudoRole> {
    let dn = Dn::new(entry.dn.clone());
    let mut role = SudoRole {
        cn: first(entry, "cn").unwrap_or_else(|| dn.rdn_value().to_string()),
        description: text(entry, "description"),
        sudo_order: number(entry, "sudoOrder")?,
        dn,
        ..Default::default()
    };
    for (attr, values) in entry.attrs.iter() {
        if let Some(list) = role.list_attribute_mut(attr) {
            list.clone_from(values);
        }
    }
    Ok(role)
}
