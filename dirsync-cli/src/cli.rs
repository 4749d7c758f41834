use clap::{Parser, Subcommand};
use dirsync_config::{Overrides, DEFAULT_SETTINGS_FILE};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dirsync", version)]
#[command(about = "Converge an LDAP directory to a tree of YAML files")]
pub struct Cli {
    /// Log level: debug, info, warning or error
    #[arg(long, env = "DIRSYNC_LOG_LEVEL", default_value = "warning", global = true)]
    pub log_level: String,

    /// Path to the settings file
    #[arg(short, long, env = "DIRSYNC_CONFIG", default_value = DEFAULT_SETTINGS_FILE, global = true)]
    pub config: PathBuf,

    /// Bind DN, overrides the settings file
    #[arg(long, env = "DIRSYNC_USER_DN", global = true)]
    pub user_dn: Option<String>,

    /// Bind password, overrides the settings file
    #[arg(long, env = "DIRSYNC_USER_PASSWORD", hide_env_values = true, global = true)]
    pub user_pass: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Apply every change needed to converge the directory
    Sync,
    /// Show the changes a sync would apply
    Diff {
        /// Print the task set as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load the configuration and report errors
    Validate,
    /// List every desired group with its accounts and memberships
    Audit,
}

impl Cli {
    /// Credentials given on the command line or in the environment.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            user_dn: self.user_dn.clone(),
            user_password: self.user_pass.clone(),
        }
    }
}
