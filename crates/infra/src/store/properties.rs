//! Flat property-file store.
//!
//! ```text
//! # accounts: password first, then roles
//! user.paulo = secret,administrator
//! user.editor = secret,editor
//! user.retired = secret,editor,!disabled
//!
//! # roles: permission expressions, quoted when they contain commas
//! role.administrator = *
//! role.editor = newsletter:edit:*, "printer:print,query"
//! ```
//!
//! Keys without a `user.`/`role.` prefix are read as accounts. `#` and `!`
//! start comment lines, `=`, `:` or whitespace separate key from value, and a
//! trailing backslash continues a line. Backslash escapes (`\uXXXX`, `\\`,
//! `\ `, `\=`, `\:`, ...) are decoded in keys and values after the split, so
//! `user.john\ smith` names the account `john smith`. When a key repeats, the
//! last entry wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use realmkit_auth::{AccountRecord, CaseSensitivity, GrantData, RealmType, Role};
use realmkit_core::{RealmResult, StoreError};

use super::GrantSource;
use crate::config::{PropertiesRealmConfig, ResourceLocation};

pub const USER_PREFIX: &str = "user.";
pub const ROLE_PREFIX: &str = "role.";

/// Role token that marks an account as disabled instead of granting a role.
pub const DISABLED_MARKER: &str = "!disabled";

#[derive(Debug, Clone)]
pub struct PropertiesSource {
    location: ResourceLocation,
    path: PathBuf,
    case: CaseSensitivity,
    reload_interval: Option<Duration>,
}

impl PropertiesSource {
    pub fn location(&self) -> &ResourceLocation {
        &self.location
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl GrantSource for PropertiesSource {
    type Config = PropertiesRealmConfig;

    fn realm_type() -> RealmType {
        RealmType::Properties
    }

    fn open(config: Self::Config) -> RealmResult<Self> {
        let location = config.location()?;
        let path = location.resolve();
        Ok(Self {
            location,
            path,
            case: config.case_sensitivity(),
            reload_interval: config.reload_interval()?,
        })
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.location, self.path.display())
    }

    fn case_sensitivity(&self) -> CaseSensitivity {
        self.case
    }

    fn reloadable(&self) -> bool {
        true
    }

    fn reload_interval(&self) -> Option<Duration> {
        self.reload_interval
    }

    async fn fetch(&self) -> Result<GrantData, StoreError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| StoreError::Unreadable {
                location: self.describe(),
                reason: e.to_string(),
            })?;
        parse_properties(&text, &self.location.to_string())
    }
}

/// Parse property-file text into grant data.
///
/// `location` only labels errors and log lines.
pub fn parse_properties(text: &str, location: &str) -> Result<GrantData, StoreError> {
    let mut users: BTreeMap<String, AccountRecord> = BTreeMap::new();
    let mut roles: BTreeMap<Role, Vec<String>> = BTreeMap::new();

    for entry in logical_lines(text) {
        let malformed = |reason: String| StoreError::Malformed {
            location: location.to_string(),
            line: entry.line,
            reason,
        };
        let (raw_key, raw_value) = split_entry(&entry.text);
        let key = unescape(raw_key).map_err(&malformed)?;
        let value = unescape(raw_value).map_err(&malformed)?;
        let value = value.as_str();

        if let Some(name) = key.strip_prefix(ROLE_PREFIX) {
            if name.is_empty() {
                return Err(malformed("role entry without a name".to_string()));
            }
            if roles
                .insert(Role::from(name), split_permissions(value))
                .is_some()
            {
                tracing::warn!(location, line = entry.line, role = name, "duplicate role definition; keeping the last one");
            }
            continue;
        }

        let name = key.strip_prefix(USER_PREFIX).unwrap_or(&key);
        if name.is_empty() {
            return Err(malformed("user entry without a name".to_string()));
        }
        let record = parse_account(name, value)
            .ok_or_else(|| malformed(format!("user '{name}' has no password")))?;
        if users.insert(name.to_string(), record).is_some() {
            tracing::warn!(location, line = entry.line, principal = name, "duplicate user definition; keeping the last one");
        }
    }

    Ok(GrantData {
        accounts: users.into_values().collect(),
        role_permissions: roles,
    })
}

#[derive(Debug, PartialEq, Eq)]
struct LogicalLine {
    /// 1-based number of the first physical line.
    line: usize,
    text: String,
}

fn logical_lines(text: &str) -> Vec<LogicalLine> {
    let mut lines = Vec::new();
    let mut pending: Option<LogicalLine> = None;

    for (idx, raw) in text.lines().enumerate() {
        let trimmed = raw.trim_start();
        let mut entry = match pending.take() {
            Some(entry) => entry,
            None if trimmed.is_empty() || trimmed.starts_with(['#', '!']) => continue,
            None => LogicalLine {
                line: idx + 1,
                text: String::new(),
            },
        };

        match continuation_body(trimmed) {
            Some(body) => {
                entry.text.push_str(body);
                pending = Some(entry);
            }
            None => {
                entry.text.push_str(trimmed);
                lines.push(entry);
            }
        }
    }

    if let Some(entry) = pending {
        lines.push(entry);
    }
    lines
}

/// The line without its continuation backslash, if it has one.
///
/// An odd number of trailing backslashes continues; an even number is escaped
/// backslashes.
fn continuation_body(line: &str) -> Option<&str> {
    let trailing = line.len() - line.trim_end_matches('\\').len();
    (trailing % 2 == 1).then(|| &line[..line.len() - 1])
}

/// Split a logical line at the first unescaped `=`, `:` or whitespace.
///
/// Both halves are still escaped; see [`unescape`].
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let separator = line.char_indices().find(|&(_, c)| {
        if escaped {
            escaped = false;
            return false;
        }
        if c == '\\' {
            escaped = true;
            return false;
        }
        c == '=' || c == ':' || c.is_whitespace()
    });

    match separator {
        None => (line, ""),
        Some((idx, _)) => {
            let rest = line[idx..].trim_start();
            let rest = rest.strip_prefix(['=', ':']).unwrap_or(rest);
            (&line[..idx], rest.trim_start())
        }
    }
}

/// Decode property-file escapes: `\uXXXX` (surrogate pairs included), `\t`,
/// `\n`, `\r`, `\f`, and `\x` as a literal `x` for any other character.
/// A dangling backslash at the end is dropped.
fn unescape(raw: &str) -> Result<String, String> {
    if !raw.contains('\\') {
        return Ok(raw.to_string());
    }

    let mut out = String::with_capacity(raw.len());
    let mut units: Vec<u16> = Vec::new();
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            flush_utf16(&mut units, &mut out)?;
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let unit = (hex.len() == 4 && hex.chars().all(|h| h.is_ascii_hexdigit()))
                    .then(|| u16::from_str_radix(&hex, 16).ok())
                    .flatten()
                    .ok_or_else(|| format!("malformed \\u escape '\\u{hex}'"))?;
                units.push(unit);
            }
            other => {
                flush_utf16(&mut units, &mut out)?;
                match other {
                    Some('t') => out.push('\t'),
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('f') => out.push('\u{c}'),
                    Some(literal) => out.push(literal),
                    None => {}
                }
            }
        }
    }
    flush_utf16(&mut units, &mut out)?;
    Ok(out)
}

fn flush_utf16(units: &mut Vec<u16>, out: &mut String) -> Result<(), String> {
    for decoded in char::decode_utf16(units.drain(..)) {
        let c = decoded.map_err(|e| {
            format!("unpaired surrogate {:#06x} in \\u escape", e.unpaired_surrogate())
        })?;
        out.push(c);
    }
    Ok(())
}

fn parse_account(name: &str, value: &str) -> Option<AccountRecord> {
    let mut tokens = value.split(',').map(str::trim);
    let password = tokens.next().filter(|p| !p.is_empty())?;

    let mut record = AccountRecord::new(name, password);
    for token in tokens.filter(|t| !t.is_empty()) {
        if token == DISABLED_MARKER {
            record.disabled = true;
        } else {
            record.roles.push(Role::from(token));
        }
    }
    Some(record)
}

/// Split a role's permission list on commas outside double quotes.
fn split_permissions(value: &str) -> Vec<String> {
    let mut permissions = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in value.chars() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => {
                push_token(&mut permissions, &current);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    push_token(&mut permissions, &current);
    permissions
}

fn push_token(out: &mut Vec<String>, token: &str) {
    let token = token.trim();
    if !token.is_empty() {
        out.push(token.to_string());
    }
}
