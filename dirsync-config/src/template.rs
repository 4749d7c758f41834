//! Default value patterns.
//!
//! `%g` is the given name, `%l` the surname and `%u` the username.
//! Substitution is applied in that order.

/// The values an account contributes to a default pattern.
#[derive(Debug, Clone, Copy)]
pub struct Placeholders<'a> {
    pub username: &'a str,
    pub given_name: &'a str,
    pub surname: &'a str,
}

impl Placeholders<'_> {
    /// Substitutes all three placeholders.
    pub fn expand(&self, pattern: &str) -> String {
        pattern
            .replace("%g", self.given_name)
            .replace("%l", self.surname)
            .replace("%u", self.username)
    }

    /// Substitutes all three placeholders with lower-cased values.
    pub fn expand_lowercase(&self, pattern: &str) -> String {
        pattern
            .replace("%g", &self.given_name.to_lowercase())
            .replace("%l", &self.surname.to_lowercase())
            .replace("%u", &self.username.to_lowercase())
    }

    /// Substitutes only the username.
    pub fn expand_username(&self, pattern: &str) -> String {
        pattern.replace("%u", self.username)
    }
}
