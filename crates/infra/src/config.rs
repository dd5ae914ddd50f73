//! Realm configuration schemas.
//!
//! Each realm type has a typed schema deserialized from the JSON configuration
//! bag handed to `init`. Unknown keys are rejected so that typos fail at
//! startup instead of silently falling back to defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use realmkit_auth::{CaseSensitivity, RealmType};
use realmkit_core::{ConfigError, RealmResult};

/// Resource used when `properties_path` is absent.
pub const DEFAULT_PROPERTIES_RESOURCE: &str = "classpath:realm-users.properties";

/// Directory that `classpath:` resources resolve against.
pub const RESOURCE_DIR_ENV: &str = "REALMKIT_RESOURCE_DIR";

/// Deserialize a configuration bag into `T`.
///
/// `null` is treated as an empty object so that realms whose keys are all
/// optional can be initialized without configuration.
pub fn parse_config<T: DeserializeOwned>(config: &JsonValue) -> RealmResult<T> {
    let empty = JsonValue::Object(Default::default());
    let config = if config.is_null() { &empty } else { config };
    T::deserialize(config).map_err(|e| ConfigError::Invalid(e.to_string()).into())
}

/// Where a properties file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLocation {
    /// `file:/path` or a plain path.
    File(PathBuf),
    /// `classpath:name`, resolved against [`RESOURCE_DIR_ENV`] or the working
    /// directory.
    Classpath(String),
}

impl ResourceLocation {
    pub fn parse(raw: &str) -> RealmResult<Self> {
        let raw = raw.trim();
        let location = if let Some(name) = raw.strip_prefix("classpath:") {
            ResourceLocation::Classpath(name.trim_start_matches('/').to_string())
        } else if let Some(path) = raw.strip_prefix("file:") {
            ResourceLocation::File(PathBuf::from(path))
        } else {
            ResourceLocation::File(PathBuf::from(raw))
        };

        match &location {
            ResourceLocation::Classpath(name) if name.is_empty() => {
                Err(ConfigError::Invalid(format!("empty classpath resource: '{raw}'")).into())
            }
            ResourceLocation::File(path) if path.as_os_str().is_empty() => {
                Err(ConfigError::Invalid("properties_path must not be empty".to_string()).into())
            }
            _ => Ok(location),
        }
    }

    /// Resolve to a filesystem path using the process environment.
    pub fn resolve(&self) -> PathBuf {
        let base = std::env::var_os(RESOURCE_DIR_ENV).map(PathBuf::from);
        self.resolve_with(base.as_deref())
    }

    /// Resolve with an explicit base directory for `classpath:` resources.
    pub fn resolve_with(&self, base: Option<&Path>) -> PathBuf {
        match self {
            ResourceLocation::File(path) => path.clone(),
            ResourceLocation::Classpath(name) => match base {
                Some(dir) => dir.join(name),
                None => PathBuf::from(name),
            },
        }
    }
}

impl core::fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ResourceLocation::File(path) => write!(f, "file:{}", path.display()),
            ResourceLocation::Classpath(name) => write!(f, "classpath:{name}"),
        }
    }
}

/// Configuration of the `properties` realm.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertiesRealmConfig {
    #[serde(default)]
    pub properties_path: Option<String>,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub reload_interval_secs: Option<u64>,
}

impl PropertiesRealmConfig {
    pub fn location(&self) -> RealmResult<ResourceLocation> {
        ResourceLocation::parse(
            self.properties_path
                .as_deref()
                .unwrap_or(DEFAULT_PROPERTIES_RESOURCE),
        )
    }

    pub fn case_sensitivity(&self) -> CaseSensitivity {
        CaseSensitivity::from_flag(self.case_sensitive)
    }

    pub fn reload_interval(&self) -> RealmResult<Option<Duration>> {
        match self.reload_interval_secs {
            None => Ok(None),
            Some(0) => Err(ConfigError::Invalid(
                "reload_interval_secs must be greater than zero".to_string(),
            )
            .into()),
            Some(secs) => Ok(Some(Duration::from_secs(secs))),
        }
    }
}

/// One account in a `memory` realm configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryUser {
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
}

/// Configuration of the `memory` realm: the whole grant set, inline.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryRealmConfig {
    #[serde(default)]
    pub users: BTreeMap<String, MemoryUser>,
    #[serde(default)]
    pub roles: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub case_sensitive: bool,
}

/// Host-level realm selection: `{ "type": "properties", "config": { ... } }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RealmSettings {
    #[serde(rename = "type")]
    pub realm_type: RealmType,
    #[serde(default)]
    pub config: JsonValue,
}

impl RealmSettings {
    pub fn new(realm_type: impl Into<RealmType>, config: JsonValue) -> Self {
        Self {
            realm_type: realm_type.into(),
            config,
        }
    }

    pub fn from_json(settings: &JsonValue) -> RealmResult<Self> {
        parse_config(settings)
    }
}
