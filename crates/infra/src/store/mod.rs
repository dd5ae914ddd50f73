//! Backing identity stores.
//!
//! A store is a pure data source: it reads accounts and role definitions from
//! somewhere and hands them over as [`GrantData`]. Matching, login checks and
//! snapshot management live in the realm, so a store never sees a permission
//! check.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use realmkit_auth::{CaseSensitivity, GrantData, RealmType};
use realmkit_core::{RealmResult, StoreError};

pub mod memory;
pub mod properties;

pub use memory::MemorySource;
pub use properties::{PropertiesSource, parse_properties};

/// A backing store that can be turned into a realm via
/// [`StoreRealm`](crate::realm::StoreRealm).
#[async_trait]
pub trait GrantSource: Send + Sync + 'static {
    /// Typed configuration schema for this store.
    type Config: DeserializeOwned + Send;

    fn realm_type() -> RealmType;

    /// Validate configuration and build the source. No IO.
    fn open(config: Self::Config) -> RealmResult<Self>
    where
        Self: Sized;

    /// Human-readable location for logs (never contains secrets).
    fn describe(&self) -> String;

    fn case_sensitivity(&self) -> CaseSensitivity {
        CaseSensitivity::default()
    }

    /// Whether fetching again can observe different data.
    fn reloadable(&self) -> bool {
        false
    }

    fn reload_interval(&self) -> Option<Duration> {
        None
    }

    /// Read the full grant data.
    async fn fetch(&self) -> Result<GrantData, StoreError>;
}
