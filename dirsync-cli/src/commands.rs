//! The four subcommands.

use crate::cli::{Cli, Command};
use anyhow::{Context, Result};
use dirsync_config::{load_desired_state, Settings};
use dirsync_ldap::{LdapConfig, LdapStore};
use dirsync_sync::render::{write_audit, write_diff};
use dirsync_sync::{reconcile, CompareOptions, DirectoryReader, SyncDriver, TaskSet};
use dirsync_types::{DirectoryState, IdAllocator};
use std::io::{self, Write};
use tracing::{info, warn};

/// Runs the selected command, writing reports to stdout.
pub async fn run(cli: &Cli) -> Result<()> {
    let settings = Settings::load(&cli.config, &cli.overrides())
        .with_context(|| format!("failed to read configuration {}", cli.config.display()))?;
    let mut out = io::stdout();

    match &cli.command {
        Command::Sync => sync(&settings, &mut out).await,
        Command::Diff { json } => diff(&settings, *json, &mut out).await,
        Command::Validate => validate(&settings, &mut out),
        Command::Audit => audit(&settings, &mut out),
    }
}

/// Loads the desired state from the people and group trees.
pub fn load_desired(settings: &Settings) -> Result<DirectoryState> {
    let desired = load_desired_state(settings).context("failed to load desired state")?;
    info!("loaded {} desired objects", desired.object_count());
    Ok(desired)
}

pub fn compare_options(settings: &Settings) -> CompareOptions {
    CompareOptions {
        ssh_public_keys: settings.enable_ssh_public_keys,
        sudo: settings.enable_sudo,
    }
}

pub fn ldap_config(settings: &Settings) -> LdapConfig {
    LdapConfig::new(
        settings.host_uri.as_str(),
        settings.user_dn.as_str(),
        settings.user_password.as_str(),
        settings.people_base.clone(),
        settings.group_base.clone(),
    )
    .with_ssh_public_keys(settings.enable_ssh_public_keys)
}

/// The allocator for a run, raised past every `uidNumber` already in use.
pub fn seeded_allocator(settings: &Settings, observed: &DirectoryState) -> Option<IdAllocator> {
    let mut ids = settings.id_allocator()?;
    if let Some(highest) = observed.highest_uid_number() {
        ids.observe(highest);
    }
    Some(ids)
}

struct Plan {
    store: LdapStore,
    observed: DirectoryState,
    tasks: TaskSet,
}

async fn plan(settings: &Settings) -> Result<Plan> {
    let desired = load_desired(settings)?;

    let mut store = LdapStore::connect(ldap_config(settings))
        .await
        .with_context(|| format!("failed to connect to {}", settings.host_uri))?;
    let observed = store
        .read_state()
        .await
        .context("failed to read directory")?;
    info!("read {} observed objects", observed.object_count());

    let tasks = reconcile(&desired, &observed, compare_options(settings))
        .context("failed to compare desired and observed state")?;
    Ok(Plan {
        store,
        observed,
        tasks,
    })
}

async fn close(store: LdapStore) {
    if let Err(e) = store.unbind().await {
        warn!("unbind failed: {e}");
    }
}

async fn sync(settings: &Settings, out: &mut dyn Write) -> Result<()> {
    let Plan {
        mut store,
        observed,
        tasks,
    } = plan(settings).await?;

    if tasks.is_empty() {
        info!("no changes");
        writeln!(out, "no changes")?;
        close(store).await;
        return Ok(());
    }

    let mut driver = match seeded_allocator(settings, &observed) {
        Some(ids) => SyncDriver::with_id_allocator(ids),
        None => SyncDriver::new(),
    };
    let report = driver
        .apply(&tasks, &mut store)
        .await
        .context("sync failed")?;
    close(store).await;

    info!("applied {} change(s)", report.applied());
    for (stage, count) in &report.stages {
        writeln!(out, "{stage}: {count}")?;
    }
    writeln!(out, "{} change(s) applied", report.applied())?;
    Ok(())
}

async fn diff(settings: &Settings, json: bool, out: &mut dyn Write) -> Result<()> {
    let Plan { store, tasks, .. } = plan(settings).await?;
    close(store).await;
    render_tasks(settings, &tasks, json, out)
}

/// Writes a task set as a diff, or as JSON when `json` is set.
pub fn render_tasks(settings: &Settings, tasks: &TaskSet, json: bool, out: &mut dyn Write) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, tasks).context("failed to encode tasks")?;
        writeln!(out)?;
    } else if tasks.is_empty() {
        writeln!(out, "no changes")?;
    } else {
        write_diff(out, tasks, settings.enable_ssh_public_keys)?;
    }
    Ok(())
}

pub fn validate(settings: &Settings, out: &mut dyn Write) -> Result<()> {
    let desired = load_desired(settings)?;
    writeln!(
        out,
        "configuration is valid: {} objects, {} accounts",
        desired.object_count(),
        desired.accounts().count()
    )?;
    Ok(())
}

pub fn audit(settings: &Settings, out: &mut dyn Write) -> Result<()> {
    let desired = load_desired(settings)?;
    write_audit(out, &desired).context("failed to write audit")?;
    Ok(())
}
