//! dirsync: keep an LDAP directory in sync with a tree of YAML files.
//!
//! Usage:
//!   dirsync --config config.yaml diff
//!   dirsync --config config.yaml sync

use anyhow::Result;
use clap::Parser;
use dirsync_cli::{commands, logging, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);
    commands::run(&cli).await
}
