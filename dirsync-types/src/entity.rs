//! Directory object kinds managed by dirsync.
//!
//! The same structs describe both the desired state (loaded from files) and
//! the observed state (read from the directory server). Optional attributes
//! are `Option`s so "unset" stays distinct from an empty string.

use crate::Dn;
use serde::{Deserialize, Serialize};

/// Description written to containers and objects that carry none of their own.
pub const MANAGED_DESCRIPTION: &str = "Managed by dirsync";

/// Placeholder member written on group creation so the `member` attribute is
/// never empty. Ignored wherever memberships are compared.
pub const DUMMY_MEMBER: &str = "uid=DirsyncDummyMember";

/// A container entry mirroring a directory of the configuration tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationalUnit {
    pub dn: Dn,
    /// Value of the `ou` attribute.
    pub name: String,
    pub description: String,
}

impl OrganizationalUnit {
    /// Creates an OU with the managed description.
    pub fn new(dn: Dn, name: impl Into<String>) -> Self {
        Self {
            dn,
            name: name.into(),
            description: MANAGED_DESCRIPTION.to_string(),
        }
    }
}

/// A posix group owning zero or more user accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosixGroup {
    pub dn: Dn,
    pub cn: String,
    pub gid_number: u32,
    pub description: String,
    /// Accounts placed directly below this group.
    pub accounts: Vec<PosixAccount>,
}

/// A user account. `uid` is the stable cross-reference key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosixAccount {
    pub dn: Dn,
    pub uid: String,
    /// `None` on the desired side means the generator owns this value.
    pub uid_number: Option<u32>,
    pub gid_number: u32,
    pub given_name: String,
    pub surname: String,
    pub display_name: String,
    pub login_shell: String,
    pub mail: String,
    pub ssh_public_key: Option<String>,
    pub home_dir: String,
    pub user_password: String,
}

/// A named group whose members are account usernames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupOfNames {
    pub dn: Dn,
    pub cn: String,
    pub description: String,
    /// Member usernames, resolved to account DNs when written.
    pub members: Vec<String>,
}

/// A sudo policy entry. List attributes are order-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SudoRole {
    pub dn: Dn,
    pub cn: String,
    pub description: String,
    pub sudo_user: Vec<String>,
    pub sudo_host: Vec<String>,
    pub sudo_command: Vec<String>,
    pub sudo_option: Vec<String>,
    pub sudo_run_as_user: Vec<String>,
    pub sudo_run_as_group: Vec<String>,
    pub sudo_not_before: Vec<String>,
    pub sudo_not_after: Vec<String>,
    pub sudo_order: Option<i64>,
}

impl SudoRole {
    /// The eight list attributes, keyed by their LDAP attribute name.
    pub fn list_attributes(&self) -> [(&'static str, &[String]); 8] {
        [
            ("sudoUser", &self.sudo_user),
            ("sudoHost", &self.sudo_host),
            ("sudoCommand", &self.sudo_command),
            ("sudoOption", &self.sudo_option),
            ("sudoRunAsUser", &self.sudo_run_as_user),
            ("sudoRunAsGroup", &self.sudo_run_as_group),
            ("sudoNotBefore", &self.sudo_not_before),
            ("sudoNotAfter", &self.sudo_not_after),
        ]
    }

    fn list_attributes_mut(&mut self) -> [&mut Vec<String>; 8] {
        [
            &mut self.sudo_user,
            &mut self.sudo_host,
            &mut self.sudo_command,
            &mut self.sudo_option,
            &mut self.sudo_run_as_user,
            &mut self.sudo_run_as_group,
            &mut self.sudo_not_before,
            &mut self.sudo_not_after,
        ]
    }

    /// Returns a copy with every list attribute sorted.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut role = self.clone();
        for list in role.list_attributes_mut() {
            list.sort();
        }
        role
    }

    /// Mutable access to a list attribute by its LDAP name, ignoring case.
    pub fn list_attribute_mut(&mut self, attr: &str) -> Option<&mut Vec<String>> {
        let idx = Self::LIST_ATTRIBUTE_NAMES
            .iter()
            .position(|name| name.eq_ignore_ascii_case(attr))?;
        self.list_attributes_mut().into_iter().nth(idx)
    }

    const LIST_ATTRIBUTE_NAMES: [&'static str; 8] = [
        "sudoUser",
        "sudoHost",
        "sudoCommand",
        "sudoOption",
        "sudoRunAsUser",
        "sudoRunAsGroup",
        "sudoNotBefore",
        "sudoNotAfter",
    ];
}
