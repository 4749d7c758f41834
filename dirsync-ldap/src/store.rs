//! Directory store backed by an LDAP server.

use crate::config::LdapConfig;
use crate::{entry, request};
use async_trait::async_trait;
use dirsync_sync::{
    DeleteAccountTask, DirectoryReader, DirectoryStore, GroupOfNamesPatch, PosixAccountPatch,
    PosixGroupPatch, StoreError, StoreResult,
};
use dirsync_types::{
    DirectoryState, Dn, GroupOfNames, OrganizationalUnit, PosixAccount, PosixGroup, SudoRole,
};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, LdapResult, Mod, Scope, SearchEntry};
use tracing::{debug, info, warn};

const RC_SUCCESS: u32 = 0;
const RC_NO_SUCH_OBJECT: u32 = 32;
const RC_INVALID_CREDENTIALS: u32 = 49;
const RC_ALREADY_EXISTS: u32 = 68;

/// A bound connection to the directory server.
pub struct LdapStore {
    ldap: Ldap,
    config: LdapConfig,
}

impl std::fmt::Debug for LdapStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapStore")
            .field("url", &self.config.url)
            .field("bind_dn", &self.config.bind_dn)
            .finish_non_exhaustive()
    }
}

fn transport(context: &str, err: LdapError) -> StoreError {
    StoreError::Connection(format!("{context}: {err}"))
}

/// Maps a server result code onto the store error space.
pub fn check(result: LdapResult, operation: &'static str, dn: &Dn) -> StoreResult<()> {
    match result.rc {
        RC_SUCCESS => Ok(()),
        RC_NO_SUCH_OBJECT => Err(StoreError::NotFound(dn.clone())),
        RC_ALREADY_EXISTS => Err(StoreError::AlreadyExists(dn.clone())),
        rc => Err(StoreError::Rejected {
            operation,
            dn: dn.clone(),
            message: format!("code {rc}: {}", result.text),
        }),
    }
}

impl LdapStore {
    /// Connects and binds with the configured credentials.
    pub async fn connect(config: LdapConfig) -> StoreResult<Self> {
        debug!("connecting to {}", config.url);
        let settings = LdapConnSettings::new().set_conn_timeout(config.connect_timeout);
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &config.url)
            .await
            .map_err(|e| transport(&format!("failed to connect to {}", config.url), e))?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!("LDAP connection driver error: {e}");
            }
        });

        debug!("binding as {}", config.bind_dn);
        let result = ldap
            .simple_bind(&config.bind_dn, &config.bind_password)
            .await
            .map_err(|e| transport(&format!("bind as {} failed", config.bind_dn), e))?;
        match result.rc {
            RC_SUCCESS => {}
            RC_INVALID_CREDENTIALS => {
                return Err(StoreError::Connection(format!(
                    "invalid credentials for {}",
                    config.bind_dn
                )));
            }
            rc => {
                return Err(StoreError::Connection(format!(
                    "bind as {} failed with code {rc}: {}",
                    config.bind_dn, result.text
                )));
            }
        }

        info!("connected to {}", config.url);
        Ok(Self { ldap, config })
    }

    pub fn config(&self) -> &LdapConfig {
        &self.config
    }

    /// Closes the connection.
    pub async fn unbind(mut self) -> StoreResult<()> {
        self.ldap
            .unbind()
            .await
            .map_err(|e| transport("unbind failed", e))
    }

    async fn search_subtree(&mut self, base: &Dn) -> StoreResult<Vec<SearchEntry>> {
        debug!("searching below {base}");
        let result = self
            .ldap
            .search(base.as_str(), Scope::Subtree, "(objectClass=*)", vec!["*"])
            .await
            .map_err(|e| transport(&format!("search below {base} failed"), e))?;
        let ldap3::SearchResult(entries, status) = result;
        match status.rc {
            RC_SUCCESS => Ok(entries.into_iter().map(SearchEntry::construct).collect()),
            RC_NO_SUCH_OBJECT => Err(StoreError::MissingBase(base.clone())),
            _ => {
                check(status, "search", base)?;
                Ok(Vec::new())
            }
        }
    }

    async fn add(&mut self, dn: &Dn, add: request::AddRequest) -> StoreResult<()> {
        debug!("add {dn}");
        let result = self
            .ldap
            .add(dn.as_str(), add.as_ldap())
            .await
            .map_err(|e| transport(&format!("add {dn} failed"), e))?;
        check(result, "create", dn)
    }

    async fn modify(&mut self, dn: &Dn, mods: Vec<Mod<String>>) -> StoreResult<()> {
        if mods.is_empty() {
            debug!("nothing to modify on {dn}");
            return Ok(());
        }
        debug!("modify {dn} ({} change(s))", mods.len());
        let result = self
            .ldap
            .modify(dn.as_str(), mods)
            .await
            .map_err(|e| transport(&format!("modify {dn} failed"), e))?;
        check(result, "modify", dn)
    }

    async fn delete(&mut self, dn: &Dn) -> StoreResult<()> {
        debug!("delete {dn}");
        let result = self
            .ldap
            .delete(dn.as_str())
            .await
            .map_err(|e| transport(&format!("delete {dn} failed"), e))?;
        check(result, "delete", dn)
    }
}

fn parent_group(dn: &Dn) -> StoreResult<Dn> {
    dn.parent().ok_or_else(|| StoreError::Rejected {
        operation: "create",
        dn: dn.clone(),
        message: "account has no parent group".into(),
    })
}

#[async_trait]
impl DirectoryStore for LdapStore {
    async fn create_organizational_unit(&mut self, ou: &OrganizationalUnit) -> StoreResult<()> {
        self.add(&ou.dn, request::organizational_unit(ou)).await
    }

    async fn delete_object(&mut self, dn: &Dn) -> StoreResult<()> {
        self.delete(dn).await
    }

    async fn create_posix_group(&mut self, group: &PosixGroup) -> StoreResult<()> {
        self.add(&group.dn, request::posix_group(group)).await
    }

    async fn update_posix_group(&mut self, patch: &PosixGroupPatch) -> StoreResult<()> {
        self.modify(&patch.dn, request::posix_group_mods(patch)).await
    }

    async fn create_posix_account(&mut self, account: &PosixAccount) -> StoreResult<()> {
        let uid_number = account.uid_number.ok_or_else(|| StoreError::Rejected {
            operation: "create",
            dn: account.dn.clone(),
            message: "no uidNumber assigned".into(),
        })?;
        let group = parent_group(&account.dn)?;
        let add = request::posix_account(account, uid_number, self.config.ssh_public_keys);
        self.add(&account.dn, add).await?;
        self.modify(&group, request::member_uid_add(&account.uid)).await
    }

    async fn delete_posix_account(&mut self, task: &DeleteAccountTask) -> StoreResult<()> {
        let group = parent_group(&task.dn)?;
        self.delete(&task.dn).await?;
        self.modify(&group, request::member_uid_delete(&task.uid)).await
    }

    async fn update_posix_account(&mut self, patch: &PosixAccountPatch) -> StoreResult<()> {
        let mods = request::posix_account_mods(patch, self.config.ssh_public_keys);
        self.modify(&patch.dn, mods).await
    }

    async fn create_group_of_names(&mut self, group: &GroupOfNames) -> StoreResult<()> {
        self.add(&group.dn, request::group_of_names(group)).await
    }

    async fn update_group_of_names(&mut self, patch: &GroupOfNamesPatch) -> StoreResult<()> {
        self.modify(&patch.dn, request::group_of_names_mods(patch)).await
    }

    async fn add_member(&mut self, group_dn: &Dn, member_dn: &Dn) -> StoreResult<()> {
        self.modify(group_dn, request::member_add(member_dn.as_str())).await
    }

    async fn delete_member(&mut self, group_dn: &Dn, member_dn: &Dn) -> StoreResult<()> {
        self.modify(group_dn, request::member_delete(member_dn.as_str())).await
    }

    async fn create_sudo_role(&mut self, role: &SudoRole) -> StoreResult<()> {
        self.add(&role.dn, request::sudo_role(role)).await
    }

    async fn update_sudo_role(&mut self, role: &SudoRole) -> StoreResult<()> {
        self.modify(&role.dn, request::sudo_role_mods(role)).await
    }
}

#[async_trait]
impl DirectoryReader for LdapStore {
    async fn read_state(&mut self) -> StoreResult<DirectoryState> {
        let people_base = self.config.people_base.clone();
        let group_base = self.config.group_base.clone();
        let mut state = DirectoryState::new();

        let people = self.search_subtree(&people_base).await?;
        debug!("{} entries below {people_base}", people.len());
        entry::read_people(&people_base, people, &mut state)?;

        let groups = self.search_subtree(&group_base).await?;
        debug!("{} entries below {group_base}", groups.len());
        entry::read_groups(&group_base, groups, &mut state)?;

        info!("read {} objects from the directory", state.object_count());
        Ok(state)
    }
}
