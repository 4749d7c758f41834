//! Builds add and modify requests for every managed object kind.
//!
//! Everything here is pure so the exact attributes written can be checked
//! without a server.

use dirsync_sync::{FieldChange, GroupOfNamesPatch, PosixAccountPatch, PosixGroupPatch};
use dirsync_types::{
    GroupOfNames, OrganizationalUnit, PosixAccount, PosixGroup, SudoRole, DUMMY_MEMBER,
};
use ldap3::Mod;
use std::collections::HashSet;

/// Object classes of a posix account entry.
pub const ACCOUNT_CLASSES: [&str; 7] = [
    "inetOrgPerson",
    "ldapPublicKey",
    "organizationalPerson",
    "person",
    "posixAccount",
    "shadowAccount",
    "top",
];

/// An add request with owned attribute values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddRequest {
    pub attrs: Vec<(String, HashSet<String>)>,
}

impl AddRequest {
    fn with_classes(classes: &[&str]) -> Self {
        let mut request = Self::default();
        request.attrs.push((
            "objectClass".to_string(),
            classes.iter().map(|c| c.to_string()).collect(),
        ));
        request
    }

    fn set(&mut self, attr: &str, value: impl ToString) {
        self.attrs
            .push((attr.to_string(), HashSet::from([value.to_string()])));
    }

    fn set_all(&mut self, attr: &str, values: &[String]) {
        if !values.is_empty() {
            self.attrs
                .push((attr.to_string(), values.iter().cloned().collect()));
        }
    }

    /// Values of one attribute, if present.
    pub fn get(&self, attr: &str) -> Option<&HashSet<String>> {
        self.attrs
            .iter()
            .find(|(name, _)| name == attr)
            .map(|(_, values)| values)
    }

    /// Borrowed form accepted by `ldap3::Ldap::add`.
    pub fn as_ldap(&self) -> Vec<(&str, HashSet<&str>)> {
        self.attrs
            .iter()
            .map(|(name, values)| (name.as_str(), values.iter().map(String::as_str).collect()))
            .collect()
    }
}

fn replace(attr: &str, value: impl ToString) -> Mod<String> {
    Mod::Replace(attr.to_string(), HashSet::from([value.to_string()]))
}

fn clear(attr: &str) -> Mod<String> {
    Mod::Replace(attr.to_string(), HashSet::new())
}

// ── Organizational units ─────────────────────────────────────────

pub fn organizational_unit(ou: &OrganizationalUnit) -> AddRequest {
    let mut request = AddRequest::with_classes(&["organizationalUnit", "top"]);
    request.set("ou", &ou.name);
    request.set("description", &ou.description);
    request
}

// ── Posix groups and accounts ────────────────────────────────────

pub fn posix_group(group: &PosixGroup) -> AddRequest {
    let mut request = AddRequest::with_classes(&["posixGroup", "top"]);
    request.set("cn", &group.cn);
    request.set("gidNumber", group.gid_number);
    request.set("description", &group.description);
    request
}

pub fn posix_group_mods(patch: &PosixGroupPatch) -> Vec<Mod<String>> {
    let mut mods = Vec::new();
    if let Some(gid) = patch.gid_number {
        mods.push(replace("gidNumber", gid));
    }
    if let Some(description) = &patch.description {
        mods.push(replace("description", description));
    }
    mods
}

/// Add request for an account. `uid_number` must already be assigned; the
/// key is only written when `ssh_public_keys` is on.
pub fn posix_account(account: &PosixAccount, uid_number: u32, ssh_public_keys: bool) -> AddRequest {
    let mut request = AddRequest::with_classes(&ACCOUNT_CLASSES);
    request.set("cn", &account.uid);
    request.set("gidNumber", account.gid_number);
    request.set("uidNumber", uid_number);
    request.set("homeDirectory", &account.home_dir);
    request.set("sn", &account.surname);
    request.set("uid", &account.uid);
    request.set("displayName", &account.display_name);
    request.set("givenName", &account.given_name);
    request.set("loginShell", &account.login_shell);
    request.set("mail", &account.mail);
    request.set("userPassword", &account.user_password);
    if ssh_public_keys && let Some(key) = &account.ssh_public_key {
        request.set("sshPublicKey", key);
    }
    request
}

pub fn posix_account_mods(patch: &PosixAccountPatch, ssh_public_keys: bool) -> Vec<Mod<String>> {
    let mut mods = Vec::new();
    if let Some(v) = patch.gid_number {
        mods.push(replace("gidNumber", v));
    }
    if let Some(v) = patch.uid_number {
        mods.push(replace("uidNumber", v));
    }
    let strings = [
        ("homeDirectory", &patch.home_dir),
        ("sn", &patch.surname),
        ("displayName", &patch.display_name),
        ("givenName", &patch.given_name),
        ("loginShell", &patch.login_shell),
        ("mail", &patch.mail),
        ("userPassword", &patch.user_password),
    ];
    for (attr, value) in strings {
        if let Some(value) = value {
            mods.push(replace(attr, value));
        }
    }
    if ssh_public_keys {
        match &patch.ssh_public_key {
            FieldChange::Unchanged => {}
            FieldChange::Set(key) => mods.push(replace("sshPublicKey", key)),
            FieldChange::Cleared => mods.push(clear("sshPublicKey")),
        }
    }
    mods
}

/// Registers `uid` as a `memberUid` of its posix group.
pub fn member_uid_add(uid: &str) -> Vec<Mod<String>> {
    vec![Mod::Add("memberUid".to_string(), HashSet::from([uid.to_string()]))]
}

/// Removes `uid` from the `memberUid` list of its posix group.
pub fn member_uid_delete(uid: &str) -> Vec<Mod<String>> {
    vec![Mod::Delete("memberUid".to_string(), HashSet::from([uid.to_string()]))]
}

// ── Groups of names ──────────────────────────────────────────────

/// Add request for a group of names. Only the placeholder member is written;
/// real members are added by separate tasks.
pub fn group_of_names(group: &GroupOfNames) -> AddRequest {
    let mut request = AddRequest::with_classes(&["groupOfNames", "top"]);
    request.set("cn", &group.cn);
    request.set("member", DUMMY_MEMBER);
    request.set("description", &group.description);
    request
}

pub fn group_of_names_mods(patch: &GroupOfNamesPatch) -> Vec<Mod<String>> {
    patch
        .description
        .iter()
        .map(|d| replace("description", d))
        .collect()
}

pub fn member_add(member_dn: &str) -> Vec<Mod<String>> {
    vec![Mod::Add("member".to_string(), HashSet::from([member_dn.to_string()]))]
}

pub fn member_delete(member_dn: &str) -> Vec<Mod<String>> {
    vec![Mod::Delete("member".to_string(), HashSet::from([member_dn.to_string()]))]
}

// ── Sudo roles ───────────────────────────────────────────────────

/// Add request for a sudo role. Empty lists and an unset order are omitted.
pub fn sudo_role(role: &SudoRole) -> AddRequest {
    let mut request = AddRequest::with_classes(&["sudoRole", "top"]);
    request.set("cn", &role.cn);
    if !role.description.is_empty() {
        request.set("description", &role.description);
    }
    if let Some(order) = role.sudo_order {
        request.set("sudoOrder", order);
    }
    for (attr, values) in role.list_attributes() {
        request.set_all(attr, values);
    }
    request
}

/// Replaces every attribute of a sudo role. An empty list or unset order
/// clears the attribute.
pub fn sudo_role_mods(role: &SudoRole) -> Vec<Mod<String>> {
    let mut mods = Vec::new();
    match role.sudo_order {
        Some(order) => mods.push(replace("sudoOrder", order)),
        None => mods.push(clear("sudoOrder")),
    }
    if !role.description.is_empty() {
        mods.push(replace("description", &role.description));
    }
    for (attr, values) in role.list_attributes() {
        mods.push(Mod::Replace(attr.to_string(), values.iter().cloned().collect()));
    }
    mods
}
