//! Realm registry: type tag → constructor.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::info;

use realmkit_auth::{Realm, RealmType};
use realmkit_core::{ConfigError, RealmResult};

use crate::config::RealmSettings;
use crate::realm::{MemoryRealm, PropertiesRealm};

/// Produces a fresh, uninitialized realm.
pub type RealmConstructor = Arc<dyn Fn() -> Box<dyn Realm> + Send + Sync>;

/// Dispatch table from [`RealmType`] to realm constructors.
///
/// `properties` and `memory` are registered by default. Hosts add their own
/// (database, directory service, ...) with [`RealmRegistry::register`].
#[derive(Clone)]
pub struct RealmRegistry {
    constructors: HashMap<RealmType, RealmConstructor>,
}

impl RealmRegistry {
    /// A registry with no realm types.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// A registry with the built-in realm types.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(RealmType::Properties, || {
            Box::new(PropertiesRealm::new()) as Box<dyn Realm>
        });
        registry.register(RealmType::Memory, || {
            Box::new(MemoryRealm::new()) as Box<dyn Realm>
        });
        registry
    }

    /// Register a constructor. Returns `true` if it replaced an existing one.
    pub fn register<F>(&mut self, realm_type: impl Into<RealmType>, constructor: F) -> bool
    where
        F: Fn() -> Box<dyn Realm> + Send + Sync + 'static,
    {
        self.constructors
            .insert(realm_type.into(), Arc::new(constructor))
            .is_some()
    }

    pub fn contains(&self, realm_type: &RealmType) -> bool {
        self.constructors.contains_key(realm_type)
    }

    /// Registered tags, sorted.
    pub fn realm_types(&self) -> Vec<RealmType> {
        let mut types: Vec<RealmType> = self.constructors.keys().cloned().collect();
        types.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        types
    }

    /// Construct an uninitialized realm.
    pub fn build(&self, realm_type: &RealmType) -> RealmResult<Box<dyn Realm>> {
        let constructor = self
            .constructors
            .get(realm_type)
            .ok_or_else(|| ConfigError::UnknownRealmType(realm_type.to_string()))?;
        Ok(constructor())
    }

    /// Construct and initialize a realm, ready to be shared.
    pub async fn create(
        &self,
        realm_type: &RealmType,
        config: &JsonValue,
    ) -> RealmResult<Arc<dyn Realm>> {
        let mut realm = self.build(realm_type)?;
        realm.init(config).await?;
        info!(realm_type = %realm_type, "realm created");
        Ok(Arc::from(realm))
    }

    pub async fn create_from_settings(&self, settings: &RealmSettings) -> RealmResult<Arc<dyn Realm>> {
        self.create(&settings.realm_type, &settings.config).await
    }
}

impl Default for RealmRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl core::fmt::Debug for RealmRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RealmRegistry")
            .field("realm_types", &self.realm_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use realmkit_auth::{PrincipalId, Role};
    use realmkit_core::{ErrorKind, RealmError};

    /// Stand-in for a directory-service realm: everyone is a "staff" member.
    #[derive(Default)]
    struct DirectoryRealm {
        base_dn: Option<String>,
    }

    #[async_trait]
    impl Realm for DirectoryRealm {
        fn realm_type(&self) -> RealmType {
            RealmType::from("directory")
        }

        async fn init(&mut self, config: &JsonValue) -> RealmResult<()> {
            let base_dn = config
                .get("base_dn")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| RealmError::invalid_config("base_dn is required"))?;
            self.base_dn = Some(base_dn.to_string());
            Ok(())
        }

        async fn login(&self, _credentials: &JsonValue) -> RealmResult<PrincipalId> {
            Err(RealmError::AuthenticationFailed)
        }

        fn has_role(&self, _principal: &PrincipalId, role: &str) -> RealmResult<bool> {
            Ok(self.base_dn.is_some() && role == "staff")
        }

        fn has_permission(&self, _principal: &PrincipalId, _permission: &str) -> RealmResult<bool> {
            Ok(false)
        }

        fn roles_of(&self, _principal: &PrincipalId) -> RealmResult<HashSet<Role>> {
            Ok(HashSet::from([Role::from("staff")]))
        }
    }

    #[test]
    fn builtin_types_are_registered() {
        let registry = RealmRegistry::default();
        assert_eq!(
            registry.realm_types(),
            vec![RealmType::Memory, RealmType::Properties]
        );
        let realm = registry.build(&RealmType::Properties).unwrap();
        assert_eq!(realm.realm_type(), RealmType::Properties);
    }

    #[tokio::test]
    async fn unknown_type_is_a_configuration_error() {
        let registry = RealmRegistry::default();
        let err = registry
            .create(&RealmType::from("ldap"), &JsonValue::Null)
            .await
            .err()
            .unwrap();
        assert_eq!(
            err,
            RealmError::Configuration(ConfigError::UnknownRealmType("ldap".to_string()))
        );
        assert!(RealmRegistry::empty().build(&RealmType::Memory).is_err());
    }

    #[tokio::test]
    async fn custom_constructor_is_used() {
        let mut registry = RealmRegistry::default();
        assert!(!registry.register("directory", || {
            Box::new(DirectoryRealm::default()) as Box<dyn Realm>
        }));
        assert!(registry.contains(&RealmType::from("directory")));

        let realm = registry
            .create(&RealmType::from("Directory"), &json!({"base_dn": "dc=example"}))
            .await
            .unwrap();
        assert!(realm.has_role(&PrincipalId::new("anyone"), "staff").unwrap());

        let err = registry
            .create(&RealmType::from("directory"), &json!({}))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn create_from_settings_initializes_memory_realm() {
        let registry = RealmRegistry::default();
        let settings = RealmSettings::new(
            "memory",
            json!({
                "users": {"paulo": {"password": "secret", "roles": ["administrator"]}},
                "roles": {"administrator": ["*"]}
            }),
        );
        let realm = registry.create_from_settings(&settings).await.unwrap();
        let paulo = realm
            .login(&json!({"username": "paulo", "password": "secret"}))
            .await
            .unwrap();
        assert!(realm.has_permission(&paulo, "do_actual_work").unwrap());
    }

    #[test]
    fn re_registering_replaces() {
        let mut registry = RealmRegistry::default();
        assert!(registry.register(RealmType::Memory, || {
            Box::new(MemoryRealm::new()) as Box<dyn Realm>
        }));
        assert_eq!(registry.realm_types().len(), 2);
    }
}
