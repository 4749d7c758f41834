//! Loads the desired directory state from the people and group trees.
//!
//! Each sub-directory becomes an organizational unit nested under its parent
//! directory's OU. Files are read in sorted path order so the resulting state
//! does not depend on the filesystem's listing order.

use crate::error::{ConfigError, ConfigResult};
use crate::files::{AccountEntry, GroupFile, PeopleFile, SudoersFile};
use crate::settings::{Settings, DEFAULT_SUDO_ROLE};
use crate::ssh::validate_authorized_key;
use crate::template::Placeholders;
use dirsync_types::{
    DirectoryState, Dn, GroupOfNames, OrganizationalUnit, PosixAccount, PosixGroup,
    MANAGED_DESCRIPTION,
};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use walkdir::WalkDir;

/// File name that marks a sudo file inside the group tree.
pub const SUDOERS_FILE: &str = "SUDOers";

/// Reads both trees and returns the complete desired state.
pub fn load_desired_state(settings: &Settings) -> ConfigResult<DirectoryState> {
    let mut state = DirectoryState::new();
    load_people(settings, &mut state)?;
    load_groups(settings, &mut state)?;
    info!(
        "loaded {} object(s) from configuration",
        state.object_count()
    );
    Ok(state)
}

/// A configuration tree split into directories and files, both relative to
/// the tree root.
struct Tree {
    root: PathBuf,
    dirs: Vec<PathBuf>,
    files: Vec<PathBuf>,
}

impl Tree {
    fn walk(root: &Path) -> ConfigResult<Self> {
        let mut tree = Tree {
            root: root.to_path_buf(),
            dirs: Vec::new(),
            files: Vec::new(),
        };
        for entry in WalkDir::new(root).sort_by_file_name().min_depth(1) {
            let entry = entry.map_err(|source| ConfigError::Walk {
                path: root.to_path_buf(),
                source,
            })?;
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf();
            if entry.file_type().is_dir() {
                tree.dirs.push(relative);
            } else {
                tree.files.push(relative);
            }
        }
        Ok(tree)
    }

    fn read<T: DeserializeOwned + Default>(&self, relative: &Path) -> ConfigResult<T> {
        let path = self.root.join(relative);
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        if contents.trim().is_empty() {
            return Ok(T::default());
        }
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
    }
}

/// DN of the OU chain for a relative directory: `a/b` under `base` is
/// `ou=b,ou=a,<base>`.
pub fn container_dn(base: &Dn, relative_dir: &Path) -> Dn {
    relative_dir
        .components()
        .fold(base.clone(), |dn, c| dn.child("ou", &c.as_os_str().to_string_lossy()))
}

fn parent_container(base: &Dn, relative_file: &Path) -> Dn {
    container_dn(base, relative_file.parent().unwrap_or(Path::new("")))
}

fn file_name(relative: &Path) -> String {
    relative
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn push_organizational_units(tree: &Tree, base: &Dn, state: &mut DirectoryState) {
    for dir in &tree.dirs {
        let ou = OrganizationalUnit::new(container_dn(base, dir), file_name(dir));
        debug!("found OU {}", ou.dn);
        state.organizational_units.push(ou);
    }
}

// ── People ───────────────────────────────────────────────────────

fn load_people(settings: &Settings, state: &mut DirectoryState) -> ConfigResult<()> {
    info!("reading people configuration from {}", settings.people_dir.display());
    let tree = Tree::walk(&settings.people_dir)?;
    push_organizational_units(&tree, &settings.people_base, state);

    let mut known_users: HashSet<String> = HashSet::new();
    for relative in &tree.files {
        let path = tree.root.join(relative);
        info!("reading people file {}", path.display());
        let file: PeopleFile = tree.read(relative)?;

        let cn = file.cn.unwrap_or_else(|| file_name(relative));
        let dn = parent_container(&settings.people_base, relative).child("cn", &cn);
        let gid_number = file
            .gid_number
            .ok_or_else(|| ConfigError::MissingGidNumber { path: path.clone() })?;
        if state.posix_groups.contains_key(&dn) {
            return Err(ConfigError::DuplicateDn { dn, path });
        }

        let mut group = PosixGroup {
            dn: dn.clone(),
            cn,
            gid_number,
            description: file
                .description
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| MANAGED_DESCRIPTION.to_string()),
            accounts: Vec::with_capacity(file.objects.len()),
        };

        for (index, entry) in file.objects.into_iter().enumerate() {
            let account = build_account(settings, &group, &path, index, entry)?;
            if !known_users.insert(account.uid.clone()) {
                return Err(ConfigError::DuplicateUser {
                    uid: account.uid,
                    path,
                });
            }
            debug!("loaded account {}", account.dn);
            group.accounts.push(account);
        }

        state.posix_groups.insert(dn, group);
    }
    Ok(())
}

fn build_account(
    settings: &Settings,
    group: &PosixGroup,
    path: &Path,
    index: usize,
    entry: AccountEntry,
) -> ConfigResult<PosixAccount> {
    let required = |value: Option<String>, field: &'static str| {
        value.ok_or_else(|| ConfigError::MissingField {
            path: path.to_path_buf(),
            index,
            field,
        })
    };
    let uid = required(entry.username, "username")?;
    let given_name = required(entry.given_name, "given_name")?;
    let surname = required(entry.surname, "surname")?;
    let dn = group.dn.child("uid", &uid);

    if entry.uid_number.is_none() && !settings.generate_uid {
        return Err(ConfigError::MissingUidNumber(dn));
    }

    let ssh_public_key = match entry.ssh_public_key {
        Some(key) if settings.enable_ssh_public_keys => match validate_authorized_key(&key) {
            Ok(()) => Some(key),
            Err(e) => {
                error!("dropping ssh_public_key of {dn}: {e}");
                None
            }
        },
        other => other,
    };

    let placeholders = Placeholders {
        username: &uid,
        given_name: &given_name,
        surname: &surname,
    };
    let defaults = &settings.defaults;
    let no_default = |field: &'static str| ConfigError::NoDefault {
        dn: dn.clone(),
        field,
    };

    let display_name = or_default(entry.display_name, &defaults.display_name, |p| {
        placeholders.expand(p)
    })
    .ok_or_else(|| no_default("display_name"))?;
    let login_shell = or_default(entry.login_shell, &defaults.login_shell, str::to_string)
        .ok_or_else(|| no_default("login_shell"))?;
    let mail = or_default(entry.mail, &defaults.mail, |p| placeholders.expand_lowercase(p))
        .ok_or_else(|| no_default("mail"))?;
    let home_dir = or_default(entry.home_dir, &defaults.home_dir, |p| placeholders.expand(p))
        .ok_or_else(|| no_default("home_dir"))?;
    let user_password = or_default(entry.user_password, &defaults.user_password, |p| {
        placeholders.expand_username(p)
    })
    .ok_or_else(|| no_default("user_password"))?;

    Ok(PosixAccount {
        dn,
        uid,
        uid_number: entry.uid_number,
        gid_number: entry.gid_number.unwrap_or(group.gid_number),
        given_name,
        surname,
        display_name,
        login_shell,
        mail,
        ssh_public_key,
        home_dir,
        user_password,
    })
}

fn or_default(
    value: Option<String>,
    pattern: &Option<String>,
    expand: impl FnOnce(&str) -> String,
) -> Option<String> {
    value.or_else(|| pattern.as_deref().map(expand))
}

// ── Groups ───────────────────────────────────────────────────────

fn load_groups(settings: &Settings, state: &mut DirectoryState) -> ConfigResult<()> {
    info!("reading group configuration from {}", settings.group_dir.display());
    let tree = Tree::walk(&settings.group_dir)?;
    push_organizational_units(&tree, &settings.group_base, state);

    let known_users: HashSet<String> = state.accounts().map(|a| a.uid.clone()).collect();

    for relative in &tree.files {
        let path = tree.root.join(relative);
        if file_name(relative) == SUDOERS_FILE {
            if settings.enable_sudo {
                load_sudoers(settings, &tree, relative, state)?;
            } else {
                debug!("sudo disabled, skipping {}", path.display());
            }
            continue;
        }

        info!("reading group file {}", path.display());
        let file: GroupFile = tree.read(relative)?;
        let cn = file.cn.unwrap_or_else(|| file_name(relative));
        let dn = parent_container(&settings.group_base, relative).child("cn", &cn);
        if state.groups_of_names.contains_key(&dn) {
            return Err(ConfigError::DuplicateDn { dn, path });
        }

        let mut seen = HashSet::new();
        for uid in &file.members {
            if !seen.insert(uid.as_str()) {
                return Err(ConfigError::DuplicateMember {
                    uid: uid.clone(),
                    group: dn,
                });
            }
            if !known_users.contains(uid) {
                return Err(ConfigError::UnknownMember {
                    uid: uid.clone(),
                    group: dn,
                });
            }
        }

        debug!("loaded group {} with {} member(s)", dn, file.members.len());
        state.groups_of_names.insert(
            dn.clone(),
            GroupOfNames {
                dn,
                cn,
                description: file
                    .description
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| MANAGED_DESCRIPTION.to_string()),
                members: file.members,
            },
        );
    }
    Ok(())
}

fn load_sudoers(
    settings: &Settings,
    tree: &Tree,
    relative: &Path,
    state: &mut DirectoryState,
) -> ConfigResult<()> {
    let path = tree.root.join(relative);
    info!("reading sudo file {}", path.display());
    let file: SudoersFile = tree.read(relative)?;
    if file.roles.is_empty() {
        debug!("skipping sudo file without roles {}", path.display());
        return Ok(());
    }

    let ou = parent_container(&settings.group_base, relative).child("ou", SUDOERS_FILE);
    debug!("found OU {ou}");
    state
        .organizational_units
        .push(OrganizationalUnit::new(ou.clone(), SUDOERS_FILE));

    if file.disable_defaults {
        debug!("default sudo role disabled in {}", path.display());
    } else if let Some(defaults) = &settings.default_sudo_role {
        let role = dirsync_types::SudoRole {
            dn: ou.child("cn", DEFAULT_SUDO_ROLE),
            ..defaults.clone()
        };
        debug!("loaded default sudo role {}", role.dn);
        state.sudo_roles.push(role);
    }

    for (index, mut entry) in file.roles.into_iter().enumerate() {
        if entry.name.is_empty() {
            return Err(ConfigError::MissingRoleName { path, index });
        }
        if entry.description.is_empty() {
            entry.description = MANAGED_DESCRIPTION.to_string();
        }
        let dn = ou.child("cn", &entry.name);
        debug!("loaded sudo role {dn}");
        state.sudo_roles.push(entry.into_role(dn));
    }
    Ok(())
}
