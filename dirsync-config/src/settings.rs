//! The main settings file.

use crate::error::{ConfigError, ConfigResult};
use crate::files::SudoRoleEntry;
use dirsync_types::{Dn, IdAllocator, SudoRole};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default settings file name, relative to the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "config.yaml";

/// Name given to the default sudo role in every `SUDOers` OU.
pub const DEFAULT_SUDO_ROLE: &str = "Defaults";

/// The settings file as written.
#[derive(Debug, Clone, Default, Deserialize)]
struct SettingsFile {
    host_uri: Option<String>,
    user_dn: Option<String>,
    user_password: Option<String>,
    #[serde(default)]
    enable_ssh_public_keys: bool,
    people_dir: Option<PathBuf>,
    group_dir: Option<PathBuf>,
    root_dn: Option<String>,
    people_rdn: Option<String>,
    group_rdn: Option<String>,
    #[serde(default)]
    generate_uid: bool,
    min_uid: Option<u32>,
    max_uid: Option<u32>,
    #[serde(default)]
    enable_sudo: bool,
    #[serde(default)]
    defaults: DefaultsFile,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DefaultsFile {
    display_name: Option<String>,
    login_shell: Option<String>,
    mail: Option<String>,
    home_dir: Option<String>,
    user_password: Option<String>,
    sudo: Option<SudoRoleEntry>,
}

/// Credentials given on the command line or through the environment. They
/// take precedence over the settings file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub user_dn: Option<String>,
    pub user_password: Option<String>,
}

/// Patterns used for account fields a people file leaves unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountDefaults {
    pub display_name: Option<String>,
    pub login_shell: Option<String>,
    pub mail: Option<String>,
    pub home_dir: Option<String>,
    pub user_password: Option<String>,
}

/// Validated settings with every path absolute and every base DN resolved.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host_uri: String,
    pub user_dn: String,
    pub user_password: String,
    pub enable_ssh_public_keys: bool,
    pub people_dir: PathBuf,
    pub group_dir: PathBuf,
    pub root_dn: Dn,
    /// `people_rdn,root_dn`, or `root_dn` alone.
    pub people_base: Dn,
    /// `group_rdn,root_dn`, or `root_dn` alone.
    pub group_base: Dn,
    pub generate_uid: bool,
    pub min_uid: Option<u32>,
    pub max_uid: Option<u32>,
    pub enable_sudo: bool,
    pub defaults: AccountDefaults,
    /// Role added to every `SUDOers` OU unless the file disables it.
    pub default_sudo_role: Option<SudoRole>,
}

impl Settings {
    /// Reads and validates the settings file at `path`.
    ///
    /// Relative `people_dir` and `group_dir` are resolved against the
    /// directory containing the file.
    pub fn load(path: &Path, overrides: &Overrides) -> ConfigResult<Self> {
        info!("reading settings file {}", path.display());

        let path = std::path::absolute(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or(Path::new("/"));

        let settings = Self::from_yaml(&contents, base_dir, overrides).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse { path: path.clone(), source },
            other => other,
        })?;
        settings.log();
        Ok(settings)
    }

    /// Parses settings from a YAML string. `base_dir` anchors relative
    /// directory settings.
    pub fn from_yaml(contents: &str, base_dir: &Path, overrides: &Overrides) -> ConfigResult<Self> {
        let file: SettingsFile = if contents.trim().is_empty() {
            SettingsFile::default()
        } else {
            serde_yaml::from_str(contents).map_err(|source| ConfigError::Parse {
                path: PathBuf::new(),
                source,
            })?
        };
        Self::resolve(file, base_dir, overrides)
    }

    fn resolve(file: SettingsFile, base_dir: &Path, overrides: &Overrides) -> ConfigResult<Self> {
        let user_dn = overrides
            .user_dn
            .clone()
            .or(file.user_dn)
            .ok_or(ConfigError::MissingSetting("user_dn"))?;
        let user_password = overrides
            .user_password
            .clone()
            .or(file.user_password)
            .ok_or(ConfigError::MissingSetting("user_password"))?;
        let host_uri = file.host_uri.ok_or(ConfigError::MissingSetting("host_uri"))?;

        let anchor = |dir: PathBuf| if dir.is_absolute() { dir } else { base_dir.join(dir) };
        let group_dir = anchor(file.group_dir.ok_or(ConfigError::MissingSetting("group_dir"))?);
        let people_dir = anchor(file.people_dir.ok_or(ConfigError::MissingSetting("people_dir"))?);

        let root_dn = file.root_dn.ok_or(ConfigError::MissingSetting("root_dn"))?;
        let root_dn = parse_dn("root_dn", &root_dn)?;
        let people_base = match &file.people_rdn {
            Some(rdn) => parse_dn("people_rdn", &format!("{rdn},{root_dn}"))?,
            None => root_dn.clone(),
        };
        let group_base = match &file.group_rdn {
            Some(rdn) => parse_dn("group_rdn", &format!("{rdn},{root_dn}"))?,
            None => root_dn.clone(),
        };

        // zero means unset, as in a bare `min_uid:` key
        let min_uid = file.min_uid.filter(|v| *v != 0);
        let max_uid = file.max_uid.filter(|v| *v != 0);
        if let (Some(min), Some(max)) = (min_uid, max_uid)
            && min > max
        {
            return Err(ConfigError::InvalidIdRange { min, max });
        }

        let default_sudo_role = file.defaults.sudo.map(|entry| SudoRole {
            cn: DEFAULT_SUDO_ROLE.to_string(),
            ..entry.into_role(Dn::default())
        });

        Ok(Self {
            host_uri,
            user_dn,
            user_password,
            enable_ssh_public_keys: file.enable_ssh_public_keys,
            people_dir,
            group_dir,
            root_dn,
            people_base,
            group_base,
            generate_uid: file.generate_uid,
            min_uid,
            max_uid,
            enable_sudo: file.enable_sudo,
            defaults: AccountDefaults {
                display_name: file.defaults.display_name,
                login_shell: file.defaults.login_shell,
                mail: file.defaults.mail,
                home_dir: file.defaults.home_dir,
                user_password: file.defaults.user_password,
            },
            default_sudo_role,
        })
    }

    /// A fresh id allocator when `generate_uid` is on.
    pub fn id_allocator(&self) -> Option<IdAllocator> {
        self.generate_uid
            .then(|| IdAllocator::new(self.min_uid, self.max_uid))
    }

    /// The two search bases read from the directory.
    pub fn bases(&self) -> [&Dn; 2] {
        [&self.people_base, &self.group_base]
    }

    fn log(&self) {
        debug!("host_uri: {}", self.host_uri);
        debug!("user_dn: {}", self.user_dn);
        debug!("user_password: {}", self.user_password);
        debug!("enable_ssh_public_keys: {}", self.enable_ssh_public_keys);
        debug!("people_dir: {}", self.people_dir.display());
        debug!("group_dir: {}", self.group_dir.display());
        debug!("people base: {}", self.people_base);
        debug!("group base: {}", self.group_base);
        debug!("enable_sudo: {}", self.enable_sudo);
        debug!(
            "generate_uid: {} (min {:?}, max {:?})",
            self.generate_uid, self.min_uid, self.max_uid
        );
        debug!("defaults: {:?}", self.defaults);
    }
}

fn parse_dn(setting: &'static str, value: &str) -> ConfigResult<Dn> {
    Dn::parse(value).map_err(|source| ConfigError::InvalidDn { setting, source })
}
