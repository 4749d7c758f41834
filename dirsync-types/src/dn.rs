//! Distinguished names.
//!
//! A DN is both the identity of a directory entry and an encoding of its
//! position in the tree: the parent DN is always a suffix of the child DN, so
//! the string length is a total-order proxy for depth.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Distinguished name of a directory entry, e.g. `uid=alice,cn=dev,ou=people,dc=example,dc=org`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dn(String);

impl Dn {
    /// Wraps a DN string without validation.
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self(dn.into())
    }

    /// Parses a DN, rejecting empty strings and components without `=`.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || split_components(trimmed).any(|c| !c.contains('=')) {
            return Err(crate::Error::InvalidDn(s.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Builds the DN of a child entry: `attr=value,<self>`.
    #[must_use]
    pub fn child(&self, attr: &str, value: &str) -> Self {
        Self(format!("{attr}={value},{}", self.0))
    }

    /// Returns the DN as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the DN string in bytes. Used as the depth ordering key.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true for the empty DN.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first (leftmost) component, e.g. `uid=alice`.
    #[must_use]
    pub fn rdn(&self) -> &str {
        split_components(&self.0).next().unwrap_or("")
    }

    /// The value of the first component, e.g. `alice` for `uid=alice,...`.
    #[must_use]
    pub fn rdn_value(&self) -> &str {
        let rdn = self.rdn();
        rdn.split_once('=').map_or(rdn, |(_, value)| value)
    }

    /// The DN with its first component stripped, or `None` for a single-component DN.
    #[must_use]
    pub fn parent(&self) -> Option<Dn> {
        let rdn_len = self.rdn().len();
        let rest = self.0.get(rdn_len + 1..)?;
        if rest.is_empty() {
            None
        } else {
            Some(Dn(rest.to_string()))
        }
    }

    /// Returns true if `self` is a proper ancestor of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Dn) -> bool {
        other.0.len() > self.0.len() + 1
            && other.0.ends_with(self.0.as_str())
            && other.0.as_bytes()[other.0.len() - self.0.len() - 1] == b','
    }
}

/// Splits a DN on unescaped commas.
fn split_components(dn: &str) -> impl Iterator<Item = &str> {
    let mut start = 0;
    let mut escaped = false;
    let mut pieces = Vec::new();
    for (i, c) in dn.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            ',' if !escaped => {
                pieces.push(&dn[start..i]);
                start = i + 1;
            }
            _ => escaped = false,
        }
    }
    pieces.push(&dn[start..]);
    pieces.into_iter()
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Dn {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Dn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Dn {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Dn {
    fn from(s: String) -> Self {
        Self(s)
    }
}
