//! Store-backed realms.
//!
//! [`StoreRealm`] turns any [`GrantSource`] into a [`Realm`]: it owns the
//! lifecycle, the live grant snapshot and the parsed-permission cache, and
//! asks the source only for raw data at `init` and `reload`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use realmkit_auth::{
    ExpressionCache, GrantSet, LiveGrants, PrincipalId, Realm, RealmState, RealmType, Role,
    UsernamePassword,
};
use realmkit_core::{ConfigError, RealmResult};

use crate::config::parse_config;
use crate::store::{GrantSource, MemorySource, PropertiesSource};

/// Realm backed by a flat property file.
pub type PropertiesRealm = StoreRealm<PropertiesSource>;

/// Realm backed by an inline grant set.
pub type MemoryRealm = StoreRealm<MemorySource>;

#[derive(Debug)]
struct Ready<S> {
    source: S,
    grants: LiveGrants,
    cache: ExpressionCache,
}

#[derive(Debug)]
pub struct StoreRealm<S: GrantSource> {
    state: RealmState<Ready<S>>,
}

impl<S: GrantSource> Default for StoreRealm<S> {
    fn default() -> Self {
        Self {
            state: RealmState::Uninitialized,
        }
    }
}

impl<S: GrantSource> StoreRealm<S> {
    /// An uninitialized realm; call [`Realm::init`] before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an initialized realm straight from a source, skipping the JSON
    /// configuration step.
    pub async fn with_source(source: S) -> RealmResult<Self> {
        let mut realm = Self::new();
        realm.install(source).await?;
        Ok(realm)
    }

    async fn install(&mut self, source: S) -> RealmResult<()> {
        self.state.ensure_uninitialized()?;

        let data = source.fetch().await?;
        let case = source.case_sensitivity();
        let grants = GrantSet::from_data(data, case);
        info!(
            realm_type = %S::realm_type(),
            source = %source.describe(),
            principals = grants.len(),
            "realm initialized"
        );

        self.state.initialize(Ready {
            source,
            grants: LiveGrants::new(grants),
            cache: ExpressionCache::new(case),
        })?;
        Ok(())
    }

    /// Current grant snapshot.
    pub fn grants(&self) -> RealmResult<Arc<GrantSet>> {
        Ok(self.state.ready()?.grants.current())
    }

    pub fn source(&self) -> RealmResult<&S> {
        Ok(&self.state.ready()?.source)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_initialized()
    }
}

#[async_trait]
impl<S: GrantSource> Realm for StoreRealm<S> {
    fn realm_type(&self) -> RealmType {
        S::realm_type()
    }

    async fn init(&mut self, config: &JsonValue) -> RealmResult<()> {
        self.state.ensure_uninitialized()?;
        let config: S::Config = parse_config(config)?;
        let source = S::open(config)?;
        self.install(source).await
    }

    async fn login(&self, credentials: &JsonValue) -> RealmResult<PrincipalId> {
        let ready = self.state.ready()?;
        let credentials = UsernamePassword::from_json(credentials)?;

        let outcome = ready.grants.with(|grants| grants.authenticate(&credentials));
        match &outcome {
            Ok(principal) => debug!(realm_type = %S::realm_type(), principal = %principal, "login succeeded"),
            // The attempted username may be a mistyped password; keep it out of logs.
            Err(_) => warn!(realm_type = %S::realm_type(), "login rejected"),
        }
        outcome
    }

    fn has_role(&self, principal: &PrincipalId, role: &str) -> RealmResult<bool> {
        let ready = self.state.ready()?;
        Ok(ready
            .grants
            .with(|grants| grants.has_role(principal.as_str(), role)))
    }

    fn has_permission(&self, principal: &PrincipalId, permission: &str) -> RealmResult<bool> {
        let ready = self.state.ready()?;
        let requested = ready.cache.get_or_parse(permission);
        let granted = ready
            .grants
            .with(|grants| grants.has_permission(principal.as_str(), &requested));
        debug!(principal = %principal, permission, granted, "permission check");
        Ok(granted)
    }

    fn roles_of(&self, principal: &PrincipalId) -> RealmResult<HashSet<Role>> {
        let ready = self.state.ready()?;
        Ok(ready.grants.with(|grants| {
            grants
                .account(principal.as_str())
                .map(|account| account.roles().clone())
                .unwrap_or_default()
        }))
    }

    /// Fetch the store again and swap the snapshot in one step.
    ///
    /// On failure the previous snapshot stays live.
    async fn reload(&self) -> RealmResult<()> {
        let ready = self.state.ready()?;
        if !ready.source.reloadable() {
            return Err(ConfigError::Unsupported {
                realm_type: S::realm_type().to_string(),
                operation: "reload",
            }
            .into());
        }

        let data = match ready.source.fetch().await {
            Ok(data) => data,
            Err(e) => {
                warn!(source = %ready.source.describe(), error = %e, "reload failed; keeping previous grants");
                return Err(e.into());
            }
        };
        let grants = GrantSet::from_data(data, ready.source.case_sensitivity());
        let principals = grants.len();
        let previous = ready.grants.replace(grants);
        info!(
            source = %ready.source.describe(),
            principals,
            previous_principals = previous.len(),
            "realm grants reloaded"
        );
        Ok(())
    }

    fn reload_interval(&self) -> Option<Duration> {
        self.state
            .ready()
            .ok()
            .and_then(|ready| ready.source.reload_interval())
    }
}
