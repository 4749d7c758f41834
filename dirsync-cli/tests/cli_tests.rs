use clap::Parser;
use dirsync_cli::commands::{
    audit, compare_options, ldap_config, render_tasks, seeded_allocator, validate,
};
use dirsync_cli::logging::LogLevel;
use dirsync_cli::{Cli, Command};
use dirsync_config::{Overrides, Settings};
use dirsync_sync::TaskSet;
use dirsync_types::{DirectoryState, Dn, OrganizationalUnit, PosixAccount, PosixGroup};
use pretty_assertions::assert_eq;
use std::path::Path;
use tempfile::TempDir;

fn settings_in(dir: &TempDir, extra: &str) -> Settings {
    let yaml = format!(
        "host_uri: ldap://localhost
user_dn: cn=admin,dc=x
user_password: pw
people_dir: people
group_dir: groups
root_dn: dc=x
people_rdn: ou=people
group_rdn: ou=groups
defaults:
  login_shell: /bin/bash
  display_name: '%g %l'
  mail: '%u@example.org'
  home_dir: /home/%u
  user_password: '{{CRYPT}}!'
{extra}"
    );
    Settings::from_yaml(&yaml, dir.path(), &Overrides::default()).unwrap()
}

fn tree() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let write = |relative: &str, contents: &str| {
        let path = dir.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    };
    write(
        "people/eng/dev",
        "gid_number: 500\nobjects:\n  - username: ada\n    uid_number: 1000\n    given_name: Ada\n    surname: Lovelace\n",
    );
    write("groups/admins", "members:\n  - ada\n");
    dir
}

fn output(f: impl FnOnce(&mut Vec<u8>) -> anyhow::Result<()>) -> String {
    let mut out = Vec::new();
    f(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

// ── Argument parsing ─────────────────────────────────────────────

#[test]
fn defaults() {
    let cli = Cli::try_parse_from(["dirsync", "validate"]).unwrap();
    assert_eq!(cli.command, Command::Validate);
    assert_eq!(cli.config, Path::new("config.yaml"));
    assert_eq!(cli.log_level, "warning");
    let overrides = cli.overrides();
    assert_eq!(overrides.user_dn, None);
    assert_eq!(overrides.user_password, None);
}

#[test]
fn global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "dirsync",
        "diff",
        "--json",
        "--config",
        "/etc/dirsync.yaml",
        "--user-dn",
        "cn=ops",
        "--user-pass",
        "pw",
        "--log-level",
        "debug",
    ])
    .unwrap();
    assert_eq!(cli.command, Command::Diff { json: true });
    assert_eq!(cli.config, Path::new("/etc/dirsync.yaml"));
    assert_eq!(cli.log_level, "debug");

    let overrides = cli.overrides();
    assert_eq!(overrides.user_dn.as_deref(), Some("cn=ops"));
    assert_eq!(overrides.user_password.as_deref(), Some("pw"));
}

#[test]
fn subcommand_is_required() {
    assert!(Cli::try_parse_from(["dirsync"]).is_err());
    assert!(Cli::try_parse_from(["dirsync", "frobnicate"]).is_err());
}

#[test]
fn log_levels() {
    assert_eq!(LogLevel::parse("debug"), Some(LogLevel::Debug));
    assert_eq!(LogLevel::parse("INFO"), Some(LogLevel::Info));
    assert_eq!(LogLevel::parse("warn"), Some(LogLevel::Warning));
    assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warning));
    assert_eq!(LogLevel::parse("error"), Some(LogLevel::Error));
    assert_eq!(LogLevel::parse("trace"), None);
    assert_eq!(LogLevel::Warning.directive(), "warn");
}

// ── Commands without a server ────────────────────────────────────

#[test]
fn validate_reports_counts() {
    let dir = tree();
    let settings = settings_in(&dir, "");
    let text = output(|out| validate(&settings, out));
    // ou=eng, cn=dev, uid=ada, cn=admins
    assert_eq!(text, "configuration is valid: 4 objects, 1 accounts\n");
}

#[test]
fn validate_fails_on_unknown_member() {
    let dir = tree();
    std::fs::write(dir.path().join("groups/admins"), "members:\n  - bob\n").unwrap();
    let settings = settings_in(&dir, "");
    let mut out = Vec::new();
    let err = validate(&settings, &mut out).unwrap_err();
    assert!(format!("{err:#}").contains("bob"));
}

#[test]
fn audit_lists_memberships() {
    let dir = tree();
    let settings = settings_in(&dir, "");
    let text = output(|out| audit(&settings, out));
    assert!(text.starts_with("====== START AUDIT ======"));
    assert!(text.contains("====== POSIXGROUP dev ======"));
    assert!(text.contains("cn=admins,ou=groups,dc=x"));
}

#[test]
fn render_empty_task_set() {
    let dir = tree();
    let settings = settings_in(&dir, "");
    let text = output(|out| render_tasks(&settings, &TaskSet::new(), false, out));
    assert_eq!(text, "no changes\n");
}

#[test]
fn render_json() {
    let dir = tree();
    let settings = settings_in(&dir, "");
    let mut tasks = TaskSet::new();
    tasks
        .create_organizational_units
        .push(OrganizationalUnit::new(Dn::new("ou=eng,ou=people,dc=x"), "eng"));

    let text = output(|out| render_tasks(&settings, &tasks, true, out));
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert!(value["create_organizational_units"].to_string().contains("ou=eng"));
}

// ── Wiring ───────────────────────────────────────────────────────

#[test]
fn options_follow_settings() {
    let dir = tree();
    let settings = settings_in(&dir, "enable_ssh_public_keys: true\nenable_sudo: true\n");
    let options = compare_options(&settings);
    assert!(options.ssh_public_keys);
    assert!(options.sudo);

    let config = ldap_config(&settings);
    assert_eq!(config.url, "ldap://localhost");
    assert_eq!(config.people_base, Dn::new("ou=people,dc=x"));
    assert_eq!(config.group_base, Dn::new("ou=groups,dc=x"));
    assert!(config.ssh_public_keys);
}

#[test]
fn allocator_starts_after_observed_ids() {
    let dir = tree();
    let settings = settings_in(&dir, "generate_uid: true\nmin_uid: 1000\n");

    let mut observed = DirectoryState::new();
    let group = Dn::new("cn=dev,ou=people,dc=x");
    observed.posix_groups.insert(
        group.clone(),
        PosixGroup {
            dn: group.clone(),
            cn: "dev".into(),
            gid_number: 500,
            description: String::new(),
            accounts: vec![PosixAccount {
                dn: group.child("uid", "ada"),
                uid: "ada".into(),
                uid_number: Some(1500),
                gid_number: 500,
                given_name: String::new(),
                surname: String::new(),
                display_name: String::new(),
                login_shell: String::new(),
                mail: String::new(),
                ssh_public_key: None,
                home_dir: String::new(),
                user_password: String::new(),
            }],
        },
    );

    let mut ids = seeded_allocator(&settings, &observed).unwrap();
    assert_eq!(ids.next_id().unwrap(), 1501);

    let mut fresh = seeded_allocator(&settings, &DirectoryState::new()).unwrap();
    assert_eq!(fresh.next_id().unwrap(), 1000);
}

#[test]
fn no_allocator_without_generation() {
    let dir = tree();
    let settings = settings_in(&dir, "");
    assert!(seeded_allocator(&settings, &DirectoryState::new()).is_none());
}
