//! Permission expressions.
//!
//! A permission string is split on `:` into ordered positions; each position
//! is split on `,` into a set of alternatives. The token `*` at a position
//! matches anything there, including the absence of further positions.
//!
//! ```rust
//! use realmkit_auth::Permission;
//!
//! let granted = Permission::parse("newsletter:*:13");
//! assert!(granted.implies(&Permission::parse("newsletter:edit:13")));
//! assert!(!granted.implies(&Permission::parse("printing:edit:13")));
//! ```

use std::collections::BTreeSet;
use std::convert::Infallible;

use serde::{Deserialize, Serialize};

/// Matches anything at its position.
pub const WILDCARD_TOKEN: &str = "*";

pub const PART_DIVIDER: char = ':';
pub const SUBPART_DIVIDER: char = ',';

/// How sub-parts are compared.
///
/// Insensitive parsing lowercases every sub-part, so `Newsletter:Edit` and
/// `newsletter:edit` become the same expression.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseSensitivity {
    #[default]
    Insensitive,
    Sensitive,
}

impl CaseSensitivity {
    pub fn from_flag(case_sensitive: bool) -> Self {
        if case_sensitive {
            Self::Sensitive
        } else {
            Self::Insensitive
        }
    }
}

/// Parsed, immutable permission expression.
///
/// Always has at least one position. Equality is structural: two strings that
/// differ only in sub-part order or surrounding whitespace parse equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Permission {
    parts: Vec<BTreeSet<String>>,
}

impl Permission {
    /// Parse with the default, case-insensitive comparison.
    pub fn parse(raw: &str) -> Self {
        Self::parse_with(raw, CaseSensitivity::Insensitive)
    }

    /// Parse a permission string. Never fails.
    ///
    /// An empty or all-whitespace string yields the global wildcard. Empty
    /// sub-parts (as in `a::b`) are kept as the empty string.
    pub fn parse_with(raw: &str, case: CaseSensitivity) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::all();
        }

        let parts = trimmed
            .split(PART_DIVIDER)
            .map(|part| {
                part.split(SUBPART_DIVIDER)
                    .map(|sub| normalize(sub, case))
                    .collect::<BTreeSet<_>>()
            })
            .collect();

        Self { parts }
    }

    /// The "all permissions" expression (`*`).
    pub fn all() -> Self {
        Self {
            parts: vec![BTreeSet::from([WILDCARD_TOKEN.to_string()])],
        }
    }

    pub fn parts(&self) -> &[BTreeSet<String>] {
        &self.parts
    }

    /// Number of positions.
    pub fn depth(&self) -> usize {
        self.parts.len()
    }

    /// True for the global wildcard.
    pub fn is_all(&self) -> bool {
        self.parts.len() == 1 && is_wildcard(&self.parts[0])
    }

    /// Whether this (granted) expression covers `requested`.
    pub fn implies(&self, requested: &Permission) -> bool {
        crate::matcher::implies(self, requested)
    }
}

pub(crate) fn is_wildcard(part: &BTreeSet<String>) -> bool {
    part.contains(WILDCARD_TOKEN)
}

fn normalize(sub: &str, case: CaseSensitivity) -> String {
    let sub = sub.trim();
    match case {
        CaseSensitivity::Insensitive => sub.to_lowercase(),
        CaseSensitivity::Sensitive => sub.to_string(),
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (idx, part) in self.parts.iter().enumerate() {
            if idx > 0 {
                write!(f, "{PART_DIVIDER}")?;
            }
            for (sub_idx, sub) in part.iter().enumerate() {
                if sub_idx > 0 {
                    write!(f, "{SUBPART_DIVIDER}")?;
                }
                f.write_str(sub)?;
            }
        }
        Ok(())
    }
}

impl core::str::FromStr for Permission {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for Permission {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn splits_positions_and_subparts() {
        let perm = Permission::parse("printer:print,query:lp7200");
        assert_eq!(perm.depth(), 3);
        assert_eq!(perm.parts()[0], set(&["printer"]));
        assert_eq!(perm.parts()[1], set(&["print", "query"]));
        assert_eq!(perm.parts()[2], set(&["lp7200"]));
    }

    #[test]
    fn empty_string_is_global_wildcard() {
        assert!(Permission::parse("").is_all());
        assert!(Permission::parse("   ").is_all());
        assert_eq!(Permission::parse(""), Permission::parse("*"));
    }

    #[test]
    fn never_fails_on_odd_input() {
        let perm = Permission::parse("a::b,");
        assert_eq!(perm.depth(), 3);
        assert_eq!(perm.parts()[1], set(&[""]));
        assert_eq!(perm.parts()[2], set(&["b", ""]));
    }

    #[test]
    fn trims_and_lowercases_by_default() {
        let perm = Permission::parse(" Newsletter : Edit , View ");
        assert_eq!(perm, Permission::parse("newsletter:view,edit"));
    }

    #[test]
    fn case_sensitive_parse_keeps_case() {
        let perm = Permission::parse_with("Newsletter:Edit", CaseSensitivity::Sensitive);
        assert_eq!(perm.parts()[0], set(&["Newsletter"]));
        assert_ne!(perm, Permission::parse("newsletter:edit"));
    }

    #[test]
    fn display_is_canonical() {
        let perm = Permission::parse("printer:query,print:*");
        assert_eq!(perm.to_string(), "printer:print,query:*");
        assert_eq!(Permission::parse(&perm.to_string()), perm);
    }

    #[test]
    fn serde_uses_string_form() {
        let perm: Permission = serde_json::from_str("\"newsletter:edit:*\"").unwrap();
        assert_eq!(perm, Permission::parse("newsletter:edit:*"));
        assert_eq!(
            serde_json::to_string(&perm).unwrap(),
            "\"newsletter:edit:*\""
        );
    }

    #[test]
    fn wildcard_must_be_a_whole_token() {
        let perm = Permission::parse("news*");
        assert!(!perm.is_all());
        assert!(!is_wildcard(&perm.parts()[0]));
    }
}
