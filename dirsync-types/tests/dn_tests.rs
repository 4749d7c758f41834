use dirsync_types::{Dn, Error};
use proptest::prelude::*;
use std::str::FromStr;

// ── Parsing ──────────────────────────────────────────────────────

#[test]
fn parse_valid_dn() {
    let dn = Dn::parse("uid=alice,cn=dev,ou=people,dc=example,dc=org").unwrap();
    assert_eq!(dn.as_str(), "uid=alice,cn=dev,ou=people,dc=example,dc=org");
}

#[test]
fn parse_trims_whitespace() {
    let dn = Dn::parse("  ou=eng,dc=example  ").unwrap();
    assert_eq!(dn.as_str(), "ou=eng,dc=example");
}

#[test]
fn parse_rejects_empty() {
    assert_eq!(Dn::parse(""), Err(Error::InvalidDn(String::new())));
    assert!(Dn::parse("   ").is_err());
}

#[test]
fn parse_rejects_component_without_equals() {
    assert!(Dn::parse("ou=eng,example").is_err());
}

#[test]
fn from_str_matches_parse() {
    let dn = Dn::from_str("ou=eng,dc=example").unwrap();
    assert_eq!(dn, Dn::new("ou=eng,dc=example"));
}

// ── Components ───────────────────────────────────────────────────

#[test]
fn rdn_and_value() {
    let dn = Dn::new("uid=alice,cn=dev,dc=example");
    assert_eq!(dn.rdn(), "uid=alice");
    assert_eq!(dn.rdn_value(), "alice");
}

#[test]
fn parent_strips_first_component() {
    let dn = Dn::new("uid=alice,cn=dev,dc=example");
    assert_eq!(dn.parent(), Some(Dn::new("cn=dev,dc=example")));
    assert_eq!(Dn::new("dc=example").parent(), None);
}

#[test]
fn escaped_comma_stays_in_rdn() {
    let dn = Dn::new(r"cn=Smith\, John,ou=people,dc=example");
    assert_eq!(dn.rdn(), r"cn=Smith\, John");
    assert_eq!(dn.parent(), Some(Dn::new("ou=people,dc=example")));
}

#[test]
fn child_prepends_component() {
    let base = Dn::new("ou=people,dc=example");
    assert_eq!(base.child("cn", "dev").as_str(), "cn=dev,ou=people,dc=example");
}

// ── Ancestry ─────────────────────────────────────────────────────

#[test]
fn ancestor_relationship() {
    let parent = Dn::new("ou=eng,dc=example");
    let child = Dn::new("cn=dev,ou=eng,dc=example");
    assert!(parent.is_ancestor_of(&child));
    assert!(!child.is_ancestor_of(&parent));
    assert!(!parent.is_ancestor_of(&parent));
}

#[test]
fn suffix_without_separator_is_not_ancestor() {
    let a = Dn::new("ou=eng,dc=example");
    let b = Dn::new("xou=eng,dc=example");
    assert!(!a.is_ancestor_of(&b));
}

// ── Serde ────────────────────────────────────────────────────────

#[test]
fn serializes_as_plain_string() {
    let dn = Dn::new("ou=eng,dc=example");
    let json = serde_json::to_string(&dn).unwrap();
    assert_eq!(json, r#""ou=eng,dc=example""#);
    let back: Dn = serde_json::from_str(&json).unwrap();
    assert_eq!(back, dn);
}

proptest! {
    #[test]
    fn child_is_always_longer_and_descendant(
        parent in "[a-z]{1,8}=[a-z]{1,8}(,[a-z]{1,8}=[a-z]{1,8}){0,3}",
        value in "[a-z]{1,8}",
    ) {
        let parent = Dn::new(parent);
        let child = parent.child("ou", &value);
        prop_assert!(child.len() > parent.len());
        prop_assert!(parent.is_ancestor_of(&child));
        prop_assert_eq!(child.parent(), Some(parent));
    }
}
