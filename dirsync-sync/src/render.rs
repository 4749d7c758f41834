//! Human readable rendering of task sets (diff) and desired state (audit).
//!
//! Rendering only walks queues in their stored order; it never sorts.

use crate::task::{FieldChange, MemberTask, TaskSet};
use dirsync_types::{DirectoryState, Dn, SudoRole};
use std::io::{self, Write};

const KNOWN_AFTER_SYNC: &str = "*known after sync*";
const TO_BE_REMOVED: &str = "*to be removed*";
const NONE: &str = "*none*";

fn field(out: &mut dyn Write, indent: &str, name: &str, value: impl std::fmt::Display) -> io::Result<()> {
    writeln!(out, "{indent}{:<16}{value}", format!("{name}:"))
}

fn header(out: &mut dyn Write, title: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "==> {title} <==")
}

/// Writes a diff of every queued change, grouped by object kind.
///
/// `ssh_public_keys` controls whether key values are shown at all.
pub fn write_diff(out: &mut dyn Write, tasks: &TaskSet, ssh_public_keys: bool) -> io::Result<()> {
    write_organizational_units(out, tasks)?;
    write_posix_groups(out, tasks)?;
    write_posix_accounts(out, tasks, ssh_public_keys)?;
    write_groups_of_names(out, tasks)?;
    write_sudo_roles(out, tasks)?;
    writeln!(out)
}

fn write_organizational_units(out: &mut dyn Write, tasks: &TaskSet) -> io::Result<()> {
    header(out, "OrganizationalUnits")?;
    tasks
        .create_organizational_units
        .try_for_each(|ou| writeln!(out, "++ dn: {}", ou.dn))?;
    tasks
        .delete_organizational_units
        .try_for_each_rev(|t| writeln!(out, "-- dn: {}", t.dn))
}

fn write_posix_groups(out: &mut dyn Write, tasks: &TaskSet) -> io::Result<()> {
    header(out, "PosixGroups")?;
    tasks.create_posix_groups.try_for_each(|g| {
        writeln!(out, "++ dn: {}", g.dn)?;
        field(out, "   ", "name", &g.cn)?;
        field(out, "   ", "gid_number", g.gid_number)?;
        field(out, "   ", "description", &g.description)
    })?;
    tasks.update_posix_groups.try_for_each(|p| {
        writeln!(out, "~~ dn: {}", p.dn)?;
        if let Some(gid) = p.gid_number {
            field(out, "   ", "gid_number", gid)?;
        }
        if let Some(description) = &p.description {
            field(out, "   ", "description", description)?;
        }
        Ok::<(), io::Error>(())
    })?;
    tasks
        .delete_posix_groups
        .try_for_each(|t| writeln!(out, "-- dn: {}", t.dn))
}

fn write_posix_accounts(out: &mut dyn Write, tasks: &TaskSet, ssh_public_keys: bool) -> io::Result<()> {
    header(out, "PosixAccounts")?;
    tasks.create_posix_accounts.try_for_each(|a| {
        writeln!(out, "++ dn: {}", a.dn)?;
        field(out, "   ", "username", &a.uid)?;
        field(out, "   ", "given_name", &a.given_name)?;
        field(out, "   ", "surname", &a.surname)?;
        field(out, "   ", "display_name", &a.display_name)?;
        match a.uid_number {
            Some(n) => field(out, "   ", "uid_number", n)?,
            None => field(out, "   ", "uid_number", KNOWN_AFTER_SYNC)?,
        }
        field(out, "   ", "gid_number", a.gid_number)?;
        field(out, "   ", "login_shell", &a.login_shell)?;
        field(out, "   ", "mail", &a.mail)?;
        field(out, "   ", "home_dir", &a.home_dir)?;
        if ssh_public_keys {
            field(out, "   ", "ssh_public_key", a.ssh_public_key.as_deref().unwrap_or(NONE))?;
        }
        field(out, "   ", "user_password", &a.user_password)
    })?;
    tasks.update_posix_accounts.try_for_each(|p| {
        writeln!(out, "~~ dn: {}", p.dn)?;
        let strings = [
            ("given_name", &p.given_name),
            ("surname", &p.surname),
            ("display_name", &p.display_name),
        ];
        for (name, value) in strings {
            if let Some(value) = value {
                field(out, "   ", name, value)?;
            }
        }
        if let Some(n) = p.uid_number {
            field(out, "   ", "uid_number", n)?;
        }
        if let Some(n) = p.gid_number {
            field(out, "   ", "gid_number", n)?;
        }
        let strings = [
            ("login_shell", &p.login_shell),
            ("mail", &p.mail),
            ("home_dir", &p.home_dir),
        ];
        for (name, value) in strings {
            if let Some(value) = value {
                field(out, "   ", name, value)?;
            }
        }
        if ssh_public_keys {
            match &p.ssh_public_key {
                FieldChange::Unchanged => {}
                FieldChange::Set(key) => field(out, "   ", "ssh_public_key", key)?,
                FieldChange::Cleared => field(out, "   ", "ssh_public_key", TO_BE_REMOVED)?,
            }
        }
        if let Some(password) = &p.user_password {
            field(out, "   ", "user_password", password)?;
        }
        Ok::<(), io::Error>(())
    })?;
    tasks
        .delete_posix_accounts
        .try_for_each(|t| writeln!(out, "-- dn: {}", t.dn))
}

fn write_members(out: &mut dyn Write, group: &Dn, adds: &[&MemberTask], removes: &[&MemberTask]) -> io::Result<()> {
    let adds: Vec<_> = adds.iter().filter(|m| &m.group_dn == group).collect();
    let removes: Vec<_> = removes.iter().filter(|m| &m.group_dn == group).collect();
    if adds.is_empty() && removes.is_empty() {
        return Ok(());
    }
    writeln!(out, "   members:")?;
    for m in adds {
        writeln!(out, "     ++ dn: {}", m.member_dn)?;
    }
    for m in removes {
        writeln!(out, "     -- dn: {}", m.member_dn)?;
    }
    Ok(())
}

fn write_groups_of_names(out: &mut dyn Write, tasks: &TaskSet) -> io::Result<()> {
    header(out, "GroupOfNames")?;

    let adds: Vec<&MemberTask> = tasks.add_members.iter().collect();
    let removes: Vec<&MemberTask> = tasks.delete_members.iter().collect();
    let mut shown: Vec<&Dn> = Vec::new();

    for g in tasks.create_groups_of_names.iter() {
        shown.push(&g.dn);
        writeln!(out, "++ dn: {}", g.dn)?;
        field(out, "   ", "cn", &g.cn)?;
        field(out, "   ", "description", &g.description)?;
        write_members(out, &g.dn, &adds, &[])?;
    }

    for p in tasks.update_groups_of_names.iter() {
        shown.push(&p.dn);
        writeln!(out, "~~ dn: {}", p.dn)?;
        if let Some(description) = &p.description {
            field(out, "   ", "description", description)?;
        }
        write_members(out, &p.dn, &adds, &removes)?;
    }

    // groups whose only change is membership
    for m in adds.iter().chain(removes.iter()) {
        if shown.contains(&&m.group_dn) {
            continue;
        }
        shown.push(&m.group_dn);
        writeln!(out, "~~ dn: {}", m.group_dn)?;
        write_members(out, &m.group_dn, &adds, &removes)?;
    }

    tasks
        .delete_groups_of_names
        .try_for_each(|t| writeln!(out, "-- dn: {}", t.dn))
}

fn write_sudo_role(out: &mut dyn Write, prefix: &str, role: &SudoRole) -> io::Result<()> {
    writeln!(out, "{prefix}dn: {}", role.dn)?;
    field(out, "   ", "name", &role.cn)?;
    if !role.description.is_empty() {
        field(out, "   ", "description", &role.description)?;
    }
    for (attr, values) in role.list_attributes() {
        if values.is_empty() {
            continue;
        }
        writeln!(out, "   {attr}:")?;
        for value in values {
            writeln!(out, "     - {value}")?;
        }
    }
    if let Some(order) = role.sudo_order {
        field(out, "   ", "sudoOrder", order)?;
    }
    Ok(())
}

fn write_sudo_roles(out: &mut dyn Write, tasks: &TaskSet) -> io::Result<()> {
    header(out, "SUDOers")?;
    tasks
        .create_sudo_roles
        .try_for_each(|r| write_sudo_role(out, "++ ", r))?;
    tasks
        .update_sudo_roles
        .try_for_each(|r| write_sudo_role(out, "~~ ", r))?;
    tasks
        .delete_sudo_roles
        .try_for_each(|t| writeln!(out, "-- dn: {}", t.dn))
}

/// Writes every desired posix group with its accounts and each account's
/// groupOfNames memberships, followed by the groups of names and sudo roles.
pub fn write_audit(out: &mut dyn Write, desired: &DirectoryState) -> io::Result<()> {
    writeln!(out, "====== START AUDIT ======")?;

    for group in desired.posix_groups.values() {
        writeln!(out)?;
        writeln!(out, "====== POSIXGROUP {} ======", group.cn)?;
        field(out, "", "dn", &group.dn)?;
        field(out, "", "name", &group.cn)?;
        field(out, "", "description", &group.description)?;
        field(out, "", "gid_number", group.gid_number)?;
        writeln!(out, "members:")?;

        for account in &group.accounts {
            writeln!(out)?;
            field(out, "  ", "dn", &account.dn)?;
            field(out, "  ", "username", &account.uid)?;
            field(out, "  ", "given_name", &account.given_name)?;
            field(out, "  ", "surname", &account.surname)?;
            field(out, "  ", "display_name", &account.display_name)?;
            match account.uid_number {
                Some(n) => field(out, "  ", "uid_number", n)?,
                None => field(out, "  ", "uid_number", KNOWN_AFTER_SYNC)?,
            }
            field(out, "  ", "gid_number", account.gid_number)?;
            field(out, "  ", "login_shell", &account.login_shell)?;
            field(out, "  ", "mail", &account.mail)?;
            field(out, "  ", "home_dir", &account.home_dir)?;
            field(
                out,
                "  ",
                "ssh_public_key",
                account.ssh_public_key.as_deref().unwrap_or(NONE),
            )?;
            writeln!(out, "  group_memberships:")?;
            for dn in desired.memberships_of(&account.uid) {
                writeln!(out, "    {dn}")?;
            }
        }
    }

    writeln!(out)?;
    writeln!(out, "====== GROUPOFNAMES ======")?;
    for group in desired.groups_of_names.values() {
        writeln!(out)?;
        field(out, "", "dn", &group.dn)?;
        field(out, "", "description", &group.description)?;
        writeln!(out, "members:")?;
        for uid in &group.members {
            writeln!(out, "  {uid}")?;
        }
    }

    if !desired.sudo_roles.is_empty() {
        writeln!(out)?;
        writeln!(out, "====== SUDOERS ======")?;
        for role in &desired.sudo_roles {
            writeln!(out)?;
            write_sudo_role(out, "", role)?;
        }
    }

    writeln!(out)?;
    writeln!(out, "====== END AUDIT ======")
}
