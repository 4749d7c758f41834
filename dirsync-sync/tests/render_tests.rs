use dirsync_sync::render::{write_audit, write_diff};
use dirsync_sync::{
    DeleteAccountTask, DeleteTask, FieldChange, MemberTask, PosixAccountPatch, PosixGroupPatch,
    TaskSet,
};
use dirsync_types::{
    DirectoryState, Dn, GroupOfNames, OrganizationalUnit, PosixAccount, PosixGroup, SudoRole,
    MANAGED_DESCRIPTION,
};

fn make_account(uid: &str, group: &Dn) -> PosixAccount {
    PosixAccount {
        dn: group.child("uid", uid),
        uid: uid.to_string(),
        uid_number: None,
        gid_number: 100,
        given_name: "Ada".into(),
        surname: "Lovelace".into(),
        display_name: "Ada Lovelace".into(),
        login_shell: "/bin/bash".into(),
        mail: format!("{uid}@example.org"),
        ssh_public_key: Some("ssh-ed25519 AAAAkey".into()),
        home_dir: format!("/home/{uid}"),
        user_password: "{CRYPT}!".into(),
    }
}

fn diff(tasks: &TaskSet, ssh_public_keys: bool) -> String {
    let mut out = Vec::new();
    write_diff(&mut out, tasks, ssh_public_keys).unwrap();
    String::from_utf8(out).unwrap()
}

fn audit(state: &DirectoryState) -> String {
    let mut out = Vec::new();
    write_audit(&mut out, state).unwrap();
    String::from_utf8(out).unwrap()
}

fn line_index(text: &str, needle: &str) -> usize {
    text.lines()
        .position(|l| l == needle)
        .unwrap_or_else(|| panic!("line {needle:?} missing from\n{text}"))
}

// ── Diff ─────────────────────────────────────────────────────────

#[test]
fn empty_diff_prints_only_headers() {
    let text = diff(&TaskSet::new(), true);
    let headers: Vec<&str> = text.lines().filter(|l| l.starts_with("==>")).collect();
    assert_eq!(
        headers,
        vec![
            "==> OrganizationalUnits <==",
            "==> PosixGroups <==",
            "==> PosixAccounts <==",
            "==> GroupOfNames <==",
            "==> SUDOers <==",
        ]
    );
    assert!(!text.contains("dn:"));
}

#[test]
fn markers_follow_action() {
    let mut tasks = TaskSet::new();
    tasks
        .create_organizational_units
        .push(OrganizationalUnit::new(Dn::new("ou=new,dc=x"), "new"));
    tasks.delete_posix_groups.push(DeleteTask {
        dn: Dn::new("cn=old,dc=x"),
    });
    let mut patch = PosixAccountPatch::new(Dn::new("uid=bob,cn=dev,dc=x"), "bob");
    patch.mail = Some("bob@new.org".into());
    tasks.update_posix_accounts.push(patch);

    let text = diff(&tasks, true);
    line_index(&text, "++ dn: ou=new,dc=x");
    line_index(&text, "-- dn: cn=old,dc=x");
    line_index(&text, "~~ dn: uid=bob,cn=dev,dc=x");
    line_index(&text, "   mail:           bob@new.org");
    assert!(!text.contains("given_name"));
}

#[test]
fn group_update_prints_changed_fields() {
    let mut tasks = TaskSet::new();
    tasks.update_posix_groups.push(PosixGroupPatch {
        dn: Dn::new("cn=dev,dc=x"),
        gid_number: Some(600),
        description: None,
    });

    let text = diff(&tasks, false);
    let at = line_index(&text, "~~ dn: cn=dev,dc=x");
    assert_eq!(text.lines().nth(at + 1), Some("   gid_number:     600"));
    assert!(!text.contains("description:"));
}

#[test]
fn nested_ou_deletes_print_deepest_first() {
    let mut tasks = TaskSet::new();
    for dn in ["ou=a,dc=x", "ou=b,ou=a,dc=x"] {
        tasks
            .delete_organizational_units
            .push(DeleteTask { dn: Dn::new(dn) });
    }
    let text = diff(&tasks, true);
    assert!(line_index(&text, "-- dn: ou=b,ou=a,dc=x") < line_index(&text, "-- dn: ou=a,dc=x"));
}

#[test]
fn created_account_without_uid_number() {
    let mut tasks = TaskSet::new();
    tasks
        .create_posix_accounts
        .push(make_account("ada", &Dn::new("cn=dev,dc=x")));

    let text = diff(&tasks, true);
    line_index(&text, "   uid_number:     *known after sync*");
    line_index(&text, "   ssh_public_key: ssh-ed25519 AAAAkey");

    let hidden = diff(&tasks, false);
    assert!(!hidden.contains("ssh_public_key"));
}

#[test]
fn cleared_key_is_marked_for_removal() {
    let mut tasks = TaskSet::new();
    let mut patch = PosixAccountPatch::new(Dn::new("uid=bob,cn=dev,dc=x"), "bob");
    patch.ssh_public_key = FieldChange::Cleared;
    tasks.update_posix_accounts.push(patch);

    let text = diff(&tasks, true);
    line_index(&text, "   ssh_public_key: *to be removed*");
    assert!(!diff(&tasks, false).contains("*to be removed*"));
}

#[test]
fn member_changes_fold_under_their_group() {
    let group = Dn::new("cn=admins,ou=groups,dc=x");
    let mut tasks = TaskSet::new();
    tasks.add_members.push(MemberTask {
        group_dn: group.clone(),
        member_dn: Dn::new("uid=ada,cn=dev,dc=x"),
        uid: "ada".into(),
    });
    tasks.delete_members.push(MemberTask {
        group_dn: group.clone(),
        member_dn: Dn::new("uid=bob,cn=dev,dc=x"),
        uid: "bob".into(),
    });

    let text = diff(&tasks, true);
    let header = line_index(&text, "~~ dn: cn=admins,ou=groups,dc=x");
    assert_eq!(line_index(&text, "   members:"), header + 1);
    assert_eq!(line_index(&text, "     ++ dn: uid=ada,cn=dev,dc=x"), header + 2);
    assert_eq!(line_index(&text, "     -- dn: uid=bob,cn=dev,dc=x"), header + 3);
    assert_eq!(text.matches("cn=admins").count(), 1);
}

#[test]
fn new_group_lists_its_members() {
    let group = Dn::new("cn=ops,dc=x");
    let mut tasks = TaskSet::new();
    tasks.create_groups_of_names.push(GroupOfNames {
        dn: group.clone(),
        cn: "ops".into(),
        description: MANAGED_DESCRIPTION.into(),
        members: Vec::new(),
    });
    tasks.add_members.push(MemberTask {
        group_dn: group,
        member_dn: Dn::new("uid=ada,cn=dev,dc=x"),
        uid: "ada".into(),
    });

    let text = diff(&tasks, true);
    let header = line_index(&text, "++ dn: cn=ops,dc=x");
    assert!(line_index(&text, "     ++ dn: uid=ada,cn=dev,dc=x") > header);
    assert!(!text.contains("~~ dn: cn=ops,dc=x"));
}

#[test]
fn sudo_role_lists_non_empty_attributes() {
    let mut tasks = TaskSet::new();
    tasks.create_sudo_roles.push(SudoRole {
        dn: Dn::new("cn=web,ou=SUDOers,dc=x"),
        cn: "web".into(),
        sudo_user: vec!["ada".into()],
        sudo_command: vec!["/usr/bin/systemctl".into()],
        sudo_order: Some(3),
        ..Default::default()
    });
    tasks.delete_sudo_roles.push(DeleteTask {
        dn: Dn::new("cn=old,ou=SUDOers,dc=x"),
    });

    let text = diff(&tasks, true);
    line_index(&text, "++ dn: cn=web,ou=SUDOers,dc=x");
    line_index(&text, "   sudoUser:");
    line_index(&text, "     - ada");
    line_index(&text, "   sudoOrder:      3");
    line_index(&text, "-- dn: cn=old,ou=SUDOers,dc=x");
    assert!(!text.contains("sudoHost"));
}

#[test]
fn task_set_serializes_to_json() {
    let mut tasks = TaskSet::new();
    tasks.delete_posix_accounts.push(DeleteAccountTask {
        dn: Dn::new("uid=bob,cn=dev,dc=x"),
        uid: "bob".into(),
    });
    let json = serde_json::to_value(&tasks).unwrap();
    assert_eq!(
        json["delete_posix_accounts"],
        serde_json::json!([{ "dn": "uid=bob,cn=dev,dc=x", "uid": "bob" }])
    );
    assert_eq!(json["create_organizational_units"], serde_json::json!([]));
}

// ── Audit ────────────────────────────────────────────────────────

fn audit_state() -> DirectoryState {
    let dev = Dn::new("cn=dev,ou=people,dc=x");
    let mut state = DirectoryState::new();
    state.posix_groups.insert(
        dev.clone(),
        PosixGroup {
            dn: dev.clone(),
            cn: "dev".into(),
            gid_number: 100,
            description: MANAGED_DESCRIPTION.into(),
            accounts: vec![make_account("ada", &dev)],
        },
    );
    for (dn, cn) in [
        ("cn=admins,ou=groups,dc=x", "admins"),
        ("cn=a,dc=x", "a"),
    ] {
        state.groups_of_names.insert(
            Dn::new(dn),
            GroupOfNames {
                dn: Dn::new(dn),
                cn: cn.into(),
                description: MANAGED_DESCRIPTION.into(),
                members: vec!["ada".into()],
            },
        );
    }
    state
}

#[test]
fn audit_lists_accounts_with_memberships() {
    let text = audit(&audit_state());
    assert!(text.starts_with("====== START AUDIT ======"));
    assert!(text.trim_end().ends_with("====== END AUDIT ======"));

    line_index(&text, "====== POSIXGROUP dev ======");
    line_index(&text, "  username:       ada");
    line_index(&text, "  uid_number:     *known after sync*");

    let memberships = line_index(&text, "  group_memberships:");
    assert_eq!(line_index(&text, "    cn=a,dc=x"), memberships + 1);
    assert_eq!(line_index(&text, "    cn=admins,ou=groups,dc=x"), memberships + 2);
}

#[test]
fn audit_omits_sudo_section_without_roles() {
    let text = audit(&audit_state());
    line_index(&text, "====== GROUPOFNAMES ======");
    assert!(!text.contains("SUDOERS"));

    let mut state = audit_state();
    state.sudo_roles.push(SudoRole {
        dn: Dn::new("cn=web,ou=SUDOers,dc=x"),
        cn: "web".into(),
        ..Default::default()
    });
    let text = audit(&state);
    line_index(&text, "====== SUDOERS ======");
    line_index(&text, "dn: cn=web,ou=SUDOers,dc=x");
}
