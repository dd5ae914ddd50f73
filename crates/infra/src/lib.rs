//! Infrastructure layer: backing stores, store-backed realms, realm registry.
//!
//! ```no_run
//! # async fn run() -> realmkit_core::RealmResult<()> {
//! use realmkit_auth::{Realm, RealmType};
//! use realmkit_infra::RealmRegistry;
//! use serde_json::json;
//!
//! let registry = RealmRegistry::default();
//! let realm = registry
//!     .create(
//!         &RealmType::Properties,
//!         &json!({"properties_path": "file:/etc/app/users.properties"}),
//!     )
//!     .await?;
//!
//! let principal = realm
//!     .login(&json!({"username": "paulo", "password": "secret"}))
//!     .await?;
//! assert!(realm.has_permission(&principal, "newsletter:edit:13")?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod realm;
pub mod registry;
pub mod reload;
pub mod store;

pub use config::{
    DEFAULT_PROPERTIES_RESOURCE, MemoryRealmConfig, MemoryUser, PropertiesRealmConfig,
    RESOURCE_DIR_ENV, RealmSettings, ResourceLocation, parse_config,
};
pub use realm::{MemoryRealm, PropertiesRealm, StoreRealm};
pub use registry::{RealmConstructor, RealmRegistry};
pub use reload::{MIN_RELOAD_INTERVAL, spawn_configured_reload, spawn_reload_task};
pub use store::{GrantSource, MemorySource, PropertiesSource, parse_properties};
