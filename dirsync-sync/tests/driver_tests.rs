use dirsync_sync::store::mock::{MemoryStore, Operation};
use dirsync_sync::{
    reconcile, CompareOptions, DirectoryReader, Stage, StoreError, SyncDriver, SyncError,
};
use dirsync_types::{
    DirectoryState, Dn, GroupOfNames, IdAllocator, OrganizationalUnit, PosixAccount, PosixGroup,
    SudoRole, MANAGED_DESCRIPTION,
};

fn make_account(uid: &str, group: &Dn, uid_number: Option<u32>) -> PosixAccount {
    PosixAccount {
        dn: group.child("uid", uid),
        uid: uid.to_string(),
        uid_number,
        gid_number: 100,
        given_name: "Given".into(),
        surname: "Surname".into(),
        display_name: "Given Surname".into(),
        login_shell: "/bin/bash".into(),
        mail: format!("{uid}@example.org"),
        ssh_public_key: None,
        home_dir: format!("/home/{uid}"),
        user_password: "{CRYPT}!".into(),
    }
}

fn make_group(dn: &Dn, accounts: Vec<PosixAccount>) -> PosixGroup {
    PosixGroup {
        dn: dn.clone(),
        cn: dn.rdn_value().to_string(),
        gid_number: 100,
        description: MANAGED_DESCRIPTION.into(),
        accounts,
    }
}

fn options() -> CompareOptions {
    CompareOptions {
        ssh_public_keys: true,
        sudo: true,
    }
}

/// Desired: ou=eng containing cn=dev,ou=eng with account alice.
fn eng_state() -> DirectoryState {
    let ou = Dn::new("ou=eng");
    let group = ou.child("cn", "dev");
    let mut state = DirectoryState::new();
    state.organizational_units.push(OrganizationalUnit::new(ou, "eng"));
    state.posix_groups.insert(
        group.clone(),
        make_group(&group, vec![make_account("alice", &group, Some(2000))]),
    );
    state
}

fn position(ops: &[Operation], op: &Operation) -> usize {
    ops.iter()
        .position(|o| o == op)
        .unwrap_or_else(|| panic!("{op:?} not applied"))
}

// ── End to end ───────────────────────────────────────────────────

#[tokio::test]
async fn creates_ou_then_group_then_account() {
    let desired = eng_state();
    let tasks = reconcile(&desired, &DirectoryState::new(), options()).unwrap();
    assert_eq!(tasks.create_organizational_units.len(), 1);
    assert_eq!(tasks.create_posix_groups.len(), 1);
    assert_eq!(tasks.create_posix_accounts.len(), 1);
    assert_eq!(tasks.total_len(), 3);

    let mut store = MemoryStore::new();
    let report = SyncDriver::new().apply(&tasks, &mut store).await.unwrap();
    assert_eq!(report.applied(), 3);
    assert_eq!(
        report.stages,
        vec![
            (Stage::CreateOrganizationalUnits, 1),
            (Stage::CreatePosixGroups, 1),
            (Stage::CreatePosixAccounts, 1),
        ]
    );

    assert_eq!(
        store.operations(),
        &[
            Operation::CreateOrganizationalUnit(Dn::new("ou=eng")),
            Operation::CreatePosixGroup(Dn::new("cn=dev,ou=eng")),
            Operation::CreatePosixAccount(Dn::new("uid=alice,cn=dev,ou=eng")),
        ]
    );
}

#[tokio::test]
async fn membership_removed_before_account_deleted() {
    let group = Dn::new("cn=dev,ou=eng");
    let admins = Dn::new("cn=admins,ou=eng");

    let mut observed = eng_state();
    observed
        .posix_groups
        .get_mut(&group)
        .unwrap()
        .accounts
        .push(make_account("bob", &group, Some(2001)));
    observed.groups_of_names.insert(
        admins.clone(),
        GroupOfNames {
            dn: admins.clone(),
            cn: "admins".into(),
            description: MANAGED_DESCRIPTION.into(),
            members: vec!["bob".into()],
        },
    );

    let mut desired = eng_state();
    desired.groups_of_names.insert(
        admins.clone(),
        GroupOfNames {
            dn: admins.clone(),
            cn: "admins".into(),
            description: MANAGED_DESCRIPTION.into(),
            members: vec![],
        },
    );

    let tasks = reconcile(&desired, &observed, options()).unwrap();
    assert_eq!(tasks.delete_members.len(), 1);
    assert_eq!(tasks.delete_posix_accounts.len(), 1);

    let mut store = MemoryStore::new().with_state(observed);
    SyncDriver::new().apply(&tasks, &mut store).await.unwrap();

    let bob = Dn::new("uid=bob,cn=dev,ou=eng");
    let ops = store.operations();
    let removed = position(
        ops,
        &Operation::DeleteMember {
            group: admins.clone(),
            member: bob.clone(),
        },
    );
    let deleted = position(ops, &Operation::DeletePosixAccount(bob));
    assert!(removed < deleted);
}

#[tokio::test]
async fn nested_ous_deleted_deepest_first() {
    let mut observed = DirectoryState::new();
    for dn in ["ou=a", "ou=b,ou=a", "ou=c,ou=b,ou=a"] {
        observed
            .organizational_units
            .push(OrganizationalUnit::new(Dn::new(dn), "x"));
    }

    let tasks = reconcile(&DirectoryState::new(), &observed, options()).unwrap();
    let mut store = MemoryStore::new().with_state(observed);
    SyncDriver::new().apply(&tasks, &mut store).await.unwrap();

    assert_eq!(
        store.operations(),
        &[
            Operation::DeleteObject(Dn::new("ou=c,ou=b,ou=a")),
            Operation::DeleteObject(Dn::new("ou=b,ou=a")),
            Operation::DeleteObject(Dn::new("ou=a")),
        ]
    );
    assert!(store.state().is_empty());
}

#[tokio::test]
async fn sync_converges() {
    let base = Dn::new("dc=example");
    let people = base.child("ou", "people");
    let groups = base.child("ou", "groups");
    let dev = people.child("cn", "dev");
    let ops_group = people.child("cn", "ops");

    let mut observed = DirectoryState::new();
    observed.posix_groups.insert(
        ops_group.clone(),
        make_group(&ops_group, vec![make_account("carol", &ops_group, Some(3000))]),
    );
    observed
        .organizational_units
        .push(OrganizationalUnit::new(groups.child("ou", "stale"), "stale"));
    observed.sudo_roles.push(SudoRole {
        dn: groups.child("ou", "stale").child("cn", "old"),
        cn: "old".into(),
        ..Default::default()
    });

    let mut desired = DirectoryState::new();
    desired
        .organizational_units
        .push(OrganizationalUnit::new(groups.child("ou", "eng"), "eng"));
    let mut alice = make_account("alice", &dev, None);
    alice.ssh_public_key = Some("ssh-ed25519 AAAA alice".into());
    desired
        .posix_groups
        .insert(dev.clone(), make_group(&dev, vec![alice]));
    let mut carol = make_account("carol", &ops_group, Some(3000));
    carol.login_shell = "/bin/zsh".into();
    desired
        .posix_groups
        .insert(ops_group.clone(), make_group(&ops_group, vec![carol]));
    let admins = groups.child("ou", "eng").child("cn", "admins");
    desired.groups_of_names.insert(
        admins.clone(),
        GroupOfNames {
            dn: admins,
            cn: "admins".into(),
            description: MANAGED_DESCRIPTION.into(),
            members: vec!["alice".into(), "carol".into()],
        },
    );
    desired.sudo_roles.push(SudoRole {
        dn: groups.child("ou", "eng").child("cn", "web"),
        cn: "web".into(),
        description: MANAGED_DESCRIPTION.into(),
        sudo_user: vec!["alice".into()],
        sudo_command: vec!["ALL".into()],
        ..Default::default()
    });

    let mut store = MemoryStore::new()
        .with_bases([people.clone(), groups.clone()])
        .with_state(observed.clone());
    let mut allocator = IdAllocator::new(Some(10_000), None);
    if let Some(id) = observed.highest_uid_number() {
        allocator.observe(id);
    }
    let mut driver = SyncDriver::with_id_allocator(allocator);

    let tasks = reconcile(&desired, &observed, options()).unwrap();
    assert!(!tasks.is_empty());
    driver.apply(&tasks, &mut store).await.unwrap();

    let after = store.read_state().await.unwrap();
    let remaining = reconcile(&desired, &after, options()).unwrap();
    assert!(remaining.is_empty(), "{remaining:?}");
    assert_eq!(after.account_by_uid("alice").unwrap().uid_number, Some(10_000));
}

#[tokio::test]
async fn sudo_entries_survive_when_sudo_disabled() {
    let base = Dn::new("dc=example");
    let people = base.child("ou", "people");
    let groups = base.child("ou", "groups");
    let sudoers = groups.child("ou", "SUDOers");

    let mut observed = DirectoryState::new();
    observed
        .organizational_units
        .push(OrganizationalUnit::new(sudoers.clone(), "SUDOers"));
    observed.sudo_roles.push(SudoRole {
        dn: sudoers.child("cn", "web"),
        cn: "web".into(),
        sudo_user: vec!["alice".into()],
        ..Default::default()
    });

    let off = CompareOptions {
        sudo: false,
        ..options()
    };
    let mut store = MemoryStore::new()
        .with_bases([people, groups])
        .with_state(observed.clone());
    for _ in 0..2 {
        let before = store.read_state().await.unwrap();
        let tasks = reconcile(&DirectoryState::new(), &before, off).unwrap();
        SyncDriver::new().apply(&tasks, &mut store).await.unwrap();
    }

    assert!(store.operations().is_empty());
    assert_eq!(store.state().sudo_roles, observed.sudo_roles);
    assert_eq!(
        store.state().organizational_units,
        observed.organizational_units
    );
}

// ── Failure ──────────────────────────────────────────────────────

#[tokio::test]
async fn first_failure_aborts_with_stage_and_dn() {
    let desired = eng_state();
    let tasks = reconcile(&desired, &DirectoryState::new(), options()).unwrap();

    let mut store = MemoryStore::new();
    store.fail_at(Dn::new("cn=dev,ou=eng"));
    let err = SyncDriver::new().apply(&tasks, &mut store).await.unwrap_err();

    match err {
        SyncError::Apply { stage, dn, source } => {
            assert_eq!(stage, Stage::CreatePosixGroups);
            assert_eq!(dn.as_str(), "cn=dev,ou=eng");
            assert!(matches!(source, StoreError::Rejected { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }

    // the OU stays created, the account was never attempted
    assert_eq!(
        store.operations(),
        &[Operation::CreateOrganizationalUnit(Dn::new("ou=eng"))]
    );
}

#[tokio::test]
async fn rerun_after_failure_completes_the_remainder() {
    let desired = eng_state();
    let mut store = MemoryStore::new();
    store.fail_at(Dn::new("uid=alice,cn=dev,ou=eng"));

    let tasks = reconcile(&desired, &DirectoryState::new(), options()).unwrap();
    assert!(SyncDriver::new().apply(&tasks, &mut store).await.is_err());

    let observed = store.read_state().await.unwrap();
    let mut store = MemoryStore::new().with_state(observed.clone());
    let tasks = reconcile(&desired, &observed, options()).unwrap();
    assert_eq!(tasks.total_len(), 1);
    assert_eq!(tasks.create_posix_accounts.len(), 1);

    SyncDriver::new().apply(&tasks, &mut store).await.unwrap();
    let after = store.read_state().await.unwrap();
    assert!(reconcile(&desired, &after, options()).unwrap().is_empty());
}

#[tokio::test]
async fn parent_must_exist() {
    let mut desired = eng_state();
    desired.organizational_units.clear();
    let tasks = reconcile(&desired, &DirectoryState::new(), options()).unwrap();

    let err = SyncDriver::new()
        .apply(&tasks, &mut MemoryStore::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SyncError::Apply {
            stage: Stage::CreatePosixGroups,
            ..
        }
    ));
}

// ── Id allocation ────────────────────────────────────────────────

fn generated_state(uids: &[&str]) -> DirectoryState {
    let group = Dn::new("cn=dev");
    let accounts = uids.iter().map(|u| make_account(u, &group, None)).collect();
    let mut state = DirectoryState::new();
    state.posix_groups.insert(group.clone(), make_group(&group, accounts));
    state
}

#[tokio::test]
async fn generated_ids_continue_after_observed_maximum() {
    let desired = generated_state(&["a", "b"]);
    let tasks = reconcile(&desired, &DirectoryState::new(), options()).unwrap();

    let mut allocator = IdAllocator::new(Some(500), None);
    allocator.observe(700);
    let mut driver = SyncDriver::with_id_allocator(allocator);
    let mut store = MemoryStore::new();
    driver.apply(&tasks, &mut store).await.unwrap();

    let mut ids: Vec<u32> = store
        .state()
        .accounts()
        .filter_map(|a| a.uid_number)
        .collect();
    ids.sort();
    assert_eq!(ids, vec![701, 702]);
    assert_eq!(driver.id_allocator().unwrap().latest(), 702);
}

#[tokio::test]
async fn id_limit_is_fatal() {
    let desired = generated_state(&["a", "b"]);
    let tasks = reconcile(&desired, &DirectoryState::new(), options()).unwrap();

    let mut driver = SyncDriver::with_id_allocator(IdAllocator::new(Some(10), Some(10)));
    let mut store = MemoryStore::new();
    let err = driver.apply(&tasks, &mut store).await.unwrap_err();

    assert!(matches!(
        err,
        SyncError::IdAllocation {
            source: dirsync_types::Error::IdLimitExceeded { max: 10 },
            ..
        }
    ));
    assert_eq!(store.state().accounts().count(), 1);
}

#[tokio::test]
async fn missing_uid_number_without_generation_is_fatal() {
    let desired = generated_state(&["a"]);
    let tasks = reconcile(&desired, &DirectoryState::new(), options()).unwrap();

    let err = SyncDriver::new()
        .apply(&tasks, &mut MemoryStore::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::MissingUidNumber(_)));
}

// ── Stage order ──────────────────────────────────────────────────

#[test]
fn stage_order_is_fixed() {
    assert_eq!(Stage::ALL.len(), 16);
    assert_eq!(Stage::ALL[0], Stage::CreateOrganizationalUnits);
    assert_eq!(Stage::ALL[1], Stage::DeleteMembers);
    assert_eq!(Stage::ALL[2], Stage::DeletePosixAccounts);
    assert_eq!(Stage::ALL[10], Stage::AddMembers);
    assert_eq!(Stage::ALL[15], Stage::DeleteOrganizationalUnits);
    assert_eq!(Stage::DeleteMembers.to_string(), "delete groupOfNames members");
}

#[tokio::test]
async fn empty_task_set_applies_nothing() {
    let tasks = reconcile(&DirectoryState::new(), &DirectoryState::new(), options()).unwrap();
    let mut store = MemoryStore::new();
    let report = SyncDriver::new().apply(&tasks, &mut store).await.unwrap();
    assert_eq!(report.applied(), 0);
    assert!(report.stages.is_empty());
    assert!(store.operations().is_empty());
}
