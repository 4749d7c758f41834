//! On-disk formats of the configuration tree.
//!
//! These mirror the YAML files one to one. Every field is optional here;
//! required fields and defaults are enforced by the loader, which knows the
//! file path to report.

use dirsync_types::{Dn, SudoRole};
use serde::{Deserialize, Deserializer};

/// A file in the people tree: one posix group and its accounts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeopleFile {
    pub cn: Option<String>,
    pub gid_number: Option<u32>,
    pub description: Option<String>,
    #[serde(default)]
    pub objects: Vec<AccountEntry>,
}

/// One account inside a people file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountEntry {
    pub username: Option<String>,
    pub uid_number: Option<u32>,
    pub gid_number: Option<u32>,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub display_name: Option<String>,
    pub login_shell: Option<String>,
    pub mail: Option<String>,
    pub ssh_public_key: Option<String>,
    pub home_dir: Option<String>,
    pub user_password: Option<String>,
}

/// A file in the group tree describing one group of names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupFile {
    pub cn: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
}

/// A `SUDOers` file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SudoersFile {
    #[serde(default)]
    pub disable_defaults: bool,
    #[serde(default)]
    pub roles: Vec<SudoRoleEntry>,
}

/// A sudo role as written in a `SUDOers` file or in `defaults.sudo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SudoRoleEntry {
    pub name: String,
    pub description: String,
    pub sudo_user: StringList,
    pub sudo_host: StringList,
    pub sudo_command: StringList,
    pub sudo_option: StringList,
    pub sudo_run_as_user: StringList,
    pub sudo_run_as_group: StringList,
    pub sudo_not_before: StringList,
    pub sudo_not_after: StringList,
    pub sudo_order: Option<i64>,
}

impl SudoRoleEntry {
    /// Converts the entry into a role placed at `dn`.
    pub fn into_role(self, dn: Dn) -> SudoRole {
        SudoRole {
            dn,
            cn: self.name,
            description: self.description,
            sudo_user: self.sudo_user.0,
            sudo_host: self.sudo_host.0,
            sudo_command: self.sudo_command.0,
            sudo_option: self.sudo_option.0,
            sudo_run_as_user: self.sudo_run_as_user.0,
            sudo_run_as_group: self.sudo_run_as_group.0,
            sudo_not_before: self.sudo_not_before.0,
            sudo_not_after: self.sudo_not_after.0,
            sudo_order: self.sudo_order,
        }
    }
}

/// A list attribute that may be written as a single string or a sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringList(pub Vec<String>);

impl<'de> Deserialize<'de> for StringList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(value) => StringList(vec![value]),
            OneOrMany::Many(values) => StringList(values),
        })
    }
}
