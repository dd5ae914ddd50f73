//! The realm contract.
//!
//! A realm authenticates principals against a backing store and answers role
//! and permission checks from that store's grants. It has two states:
//! `Uninitialized` until [`Realm::init`] succeeds once, then `Initialized`.
//! Every other operation fails fast with a configuration error before init.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use realmkit_core::{ConfigError, RealmError, RealmResult, StoreError};

use crate::grant::GrantSet;
use crate::{PrincipalId, Role};

/// Tag selecting a realm implementation in a registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RealmType {
    /// Flat property file.
    Properties,
    /// Inline grant set carried in configuration.
    Memory,
    /// Host-registered implementation (database, directory service, ...).
    Custom(String),
}

impl RealmType {
    pub fn as_str(&self) -> &str {
        match self {
            RealmType::Properties => "properties",
            RealmType::Memory => "memory",
            RealmType::Custom(tag) => tag,
        }
    }
}

impl core::fmt::Display for RealmType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for RealmType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl From<String> for RealmType {
    fn from(value: String) -> Self {
        let tag = value.trim().to_ascii_lowercase();
        match tag.as_str() {
            "properties" => RealmType::Properties,
            "memory" => RealmType::Memory,
            _ => RealmType::Custom(tag),
        }
    }
}

impl From<&str> for RealmType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<RealmType> for String {
    fn from(value: RealmType) -> Self {
        value.as_str().to_string()
    }
}

/// Authentication/authorization facade over one backing store.
///
/// Implementations are shared across request handlers after `init`, so they
/// must be `Send + Sync`; `init` takes `&mut self` and therefore completes
/// before the realm can be published behind an `Arc`.
#[async_trait]
pub trait Realm: Send + Sync {
    fn realm_type(&self) -> RealmType;

    /// One-time setup from a configuration bag.
    ///
    /// Fails with a configuration error on missing/unknown keys or when called
    /// twice, and with a backing store error when the store cannot be read.
    async fn init(&mut self, config: &JsonValue) -> RealmResult<()>;

    /// Validate credentials and return the principal.
    ///
    /// Every rejection is [`RealmError::AuthenticationFailed`]. Store failures
    /// surface as [`RealmError::BackingStore`], never as a rejection.
    async fn login(&self, credentials: &JsonValue) -> RealmResult<PrincipalId>;

    /// `Ok(false)` for unknown principals. Errors only before `init`.
    fn has_role(&self, principal: &PrincipalId, role: &str) -> RealmResult<bool>;

    /// `Ok(false)` for unknown principals. Errors only before `init`.
    fn has_permission(&self, principal: &PrincipalId, permission: &str) -> RealmResult<bool>;

    /// Roles held by `principal`; empty for unknown principals.
    fn roles_of(&self, principal: &PrincipalId) -> RealmResult<HashSet<Role>>;

    /// Re-read the backing store and publish a fresh grant snapshot.
    async fn reload(&self) -> RealmResult<()> {
        Err(ConfigError::Unsupported {
            realm_type: self.realm_type().to_string(),
            operation: "reload",
        }
        .into())
    }

    /// Interval at which the host should call [`Realm::reload`], if configured.
    fn reload_interval(&self) -> Option<Duration> {
        None
    }
}

/// Run `login` under a deadline.
///
/// Expiry is reported as a backing store timeout; the pending store lookup is
/// dropped (cancelled) with the future.
pub async fn login_with_timeout(
    realm: &dyn Realm,
    credentials: &JsonValue,
    timeout: Duration,
) -> RealmResult<PrincipalId> {
    match tokio::time::timeout(timeout, realm.login(credentials)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(realm_type = %realm.realm_type(), timeout_ms = timeout.as_millis() as u64, "login timed out");
            Err(StoreError::Timeout {
                millis: timeout.as_millis() as u64,
            }
            .into())
        }
    }
}

/// Two-state lifecycle holder.
#[derive(Debug)]
pub enum RealmState<T> {
    Uninitialized,
    Initialized(T),
}

impl<T> Default for RealmState<T> {
    fn default() -> Self {
        RealmState::Uninitialized
    }
}

impl<T> RealmState<T> {
    pub fn is_initialized(&self) -> bool {
        matches!(self, RealmState::Initialized(_))
    }

    /// Fail if `init` already ran.
    pub fn ensure_uninitialized(&self) -> RealmResult<()> {
        match self {
            RealmState::Uninitialized => Ok(()),
            RealmState::Initialized(_) => Err(ConfigError::AlreadyInitialized.into()),
        }
    }

    /// Transition to `Initialized`. Only valid once.
    pub fn initialize(&mut self, value: T) -> RealmResult<&T> {
        self.ensure_uninitialized()?;
        *self = RealmState::Initialized(value);
        self.ready()
    }

    /// The initialized value, or a not-initialized configuration error.
    pub fn ready(&self) -> RealmResult<&T> {
        match self {
            RealmState::Initialized(value) => Ok(value),
            RealmState::Uninitialized => Err(RealmError::not_initialized()),
        }
    }
}

/// Atomically swappable grant snapshot.
///
/// Readers get a consistent `GrantSet` without locking; reload builds a new set
/// off to the side and swaps the pointer.
#[derive(Debug)]
pub struct LiveGrants {
    snapshot: ArcSwap<GrantSet>,
}

impl LiveGrants {
    pub fn new(grants: GrantSet) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(grants),
        }
    }

    pub fn current(&self) -> Arc<GrantSet> {
        self.snapshot.load_full()
    }

    /// Publish `grants`, returning the snapshot it replaced.
    pub fn replace(&self, grants: GrantSet) -> Arc<GrantSet> {
        self.snapshot.swap(Arc::new(grants))
    }

    /// Run `f` against the current snapshot without cloning the `Arc`.
    pub fn with<R>(&self, f: impl FnOnce(&GrantSet) -> R) -> R {
        let guard = self.snapshot.load();
        f(&guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::{AccountRecord, GrantData};
    use crate::permissions::CaseSensitivity;

    #[test]
    fn realm_type_tags() {
        assert_eq!("properties".parse::<RealmType>().unwrap(), RealmType::Properties);
        assert_eq!(RealmType::from(" Memory "), RealmType::Memory);
        assert_eq!(
            RealmType::from("LDAP"),
            RealmType::Custom("ldap".to_string())
        );
        assert_eq!(RealmType::Custom("jdbc".to_string()).to_string(), "jdbc");
        let json = serde_json::to_string(&RealmType::Properties).unwrap();
        assert_eq!(json, "\"properties\"");
    }

    #[test]
    fn state_machine_transitions_once() {
        let mut state: RealmState<u8> = RealmState::default();
        assert!(!state.is_initialized());
        assert_eq!(state.ready().unwrap_err(), RealmError::not_initialized());

        assert_eq!(*state.initialize(7).unwrap(), 7);
        assert!(state.is_initialized());
        assert_eq!(
            state.initialize(8).unwrap_err(),
            RealmError::Configuration(ConfigError::AlreadyInitialized)
        );
        assert_eq!(*state.ready().unwrap(), 7);
    }

    #[test]
    fn live_grants_swap_whole_snapshot() {
        let first = GrantSet::from_data(
            GrantData::new()
                .account(AccountRecord::new("paulo", "secret").with_roles(["admin"]))
                .role("admin", ["*"]),
            CaseSensitivity::Insensitive,
        );
        let live = LiveGrants::new(first);
        let held = live.current();

        let old = live.replace(GrantSet::empty());
        assert!(old.contains("paulo"));
        assert!(held.contains("paulo"));
        assert!(!live.current().contains("paulo"));
        assert!(live.with(|g| g.is_empty()));
    }
}
