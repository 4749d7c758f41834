//! Connection parameters.

use dirsync_types::Dn;
use std::time::Duration;

/// Default timeout for establishing the connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything needed to connect, bind and locate the managed subtrees.
#[derive(Debug, Clone)]
pub struct LdapConfig {
    /// `ldap://` or `ldaps://` URL of the server.
    pub url: String,
    pub bind_dn: String,
    pub bind_password: String,
    /// Base of the people subtree (OUs, posix groups and accounts).
    pub people_base: Dn,
    /// Base of the group subtree (OUs, groups of names and sudo roles).
    pub group_base: Dn,
    /// Write `sshPublicKey` attributes.
    pub ssh_public_keys: bool,
    pub connect_timeout: Duration,
}

impl LdapConfig {
    /// Creates a config with SSH keys disabled and the default timeout.
    pub fn new(
        url: impl Into<String>,
        bind_dn: impl Into<String>,
        bind_password: impl Into<String>,
        people_base: Dn,
        group_base: Dn,
    ) -> Self {
        Self {
            url: url.into(),
            bind_dn: bind_dn.into(),
            bind_password: bind_password.into(),
            people_base,
            group_base,
            ssh_public_keys: false,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Enables or disables writing SSH keys.
    #[must_use]
    pub fn with_ssh_public_keys(mut self, enabled: bool) -> Self {
        self.ssh_public_keys = enabled;
        self
    }
}
