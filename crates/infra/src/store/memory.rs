//! Inline store: the grant set travels in configuration (or is handed over
//! programmatically by an embedding host).

use async_trait::async_trait;

use realmkit_auth::{AccountRecord, CaseSensitivity, GrantData, RealmType, Role};
use realmkit_core::{ConfigError, RealmResult, StoreError};

use super::GrantSource;
use crate::config::MemoryRealmConfig;

#[derive(Debug, Clone)]
pub struct MemorySource {
    data: GrantData,
    case: CaseSensitivity,
}

impl MemorySource {
    pub fn from_data(data: GrantData, case: CaseSensitivity) -> Self {
        Self { data, case }
    }
}

#[async_trait]
impl GrantSource for MemorySource {
    type Config = MemoryRealmConfig;

    fn realm_type() -> RealmType {
        RealmType::Memory
    }

    fn open(config: Self::Config) -> RealmResult<Self> {
        let mut data = GrantData::new();
        for (username, user) in config.users {
            if username.trim().is_empty() {
                return Err(ConfigError::Invalid("memory realm user with empty name".to_string()).into());
            }
            let mut record = AccountRecord::new(username, user.password)
                .with_roles(user.roles)
                .with_permissions(user.permissions);
            record.disabled = user.disabled;
            data.accounts.push(record);
        }
        for (role, permissions) in config.roles {
            data.role_permissions.insert(Role::from(role), permissions);
        }

        Ok(Self::from_data(
            data,
            CaseSensitivity::from_flag(config.case_sensitive),
        ))
    }

    fn describe(&self) -> String {
        format!("inline ({} accounts)", self.data.accounts.len())
    }

    fn case_sensitivity(&self) -> CaseSensitivity {
        self.case
    }

    async fn fetch(&self) -> Result<GrantData, StoreError> {
        Ok(self.data.clone())
    }
}
