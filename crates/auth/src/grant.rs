//! Grant Set: the per-principal data a backing store supplies.
//!
//! Stores produce raw [`GrantData`] (accounts plus role definitions, all as
//! strings). [`GrantSet::from_data`] resolves each account's roles into a
//! parsed [`PermissionSet`] once, at load time, so the checking path only
//! reads immutable data.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use realmkit_core::{RealmError, RealmResult};

use crate::credentials::{Secret, UsernamePassword};
use crate::matcher::PermissionSet;
use crate::permissions::{CaseSensitivity, Permission};
use crate::{PrincipalId, Role};

/// One account as read from a backing store.
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub username: String,
    pub password: Secret,
    pub roles: Vec<Role>,
    /// Permissions granted directly, in addition to those of `roles`.
    pub permissions: Vec<String>,
    pub disabled: bool,
}

impl AccountRecord {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Secret::new(password),
            roles: Vec::new(),
            permissions: Vec::new(),
            disabled: false,
        }
    }

    pub fn with_roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// Raw grant data: accounts plus role → permission-string definitions.
#[derive(Debug, Clone, Default)]
pub struct GrantData {
    pub accounts: Vec<AccountRecord>,
    pub role_permissions: BTreeMap<Role, Vec<String>>,
}

impl GrantData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(mut self, record: AccountRecord) -> Self {
        self.accounts.push(record);
        self
    }

    pub fn role<I, S>(mut self, role: impl Into<Role>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.role_permissions
            .entry(role.into())
            .or_default()
            .extend(permissions.into_iter().map(Into::into));
        self
    }
}

/// A resolved account.
#[derive(Debug, Clone)]
pub struct Account {
    principal: PrincipalId,
    secret: Secret,
    roles: HashSet<Role>,
    permissions: PermissionSet,
    disabled: bool,
}

impl Account {
    pub fn principal(&self) -> &PrincipalId {
        &self.principal
    }

    pub fn roles(&self) -> &HashSet<Role> {
        &self.roles
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}

/// Immutable snapshot of every principal's grants.
#[derive(Debug, Clone)]
pub struct GrantSet {
    accounts: HashMap<PrincipalId, Account>,
    loaded_at: DateTime<Utc>,
}

impl GrantSet {
    pub fn empty() -> Self {
        Self {
            accounts: HashMap::new(),
            loaded_at: Utc::now(),
        }
    }

    /// Resolve raw store data into a grant snapshot.
    ///
    /// Each role's permission strings are parsed once and shared between the
    /// accounts holding that role. Roles without a definition only count for
    /// role checks. A repeated username replaces the earlier account.
    pub fn from_data(data: GrantData, case: CaseSensitivity) -> Self {
        let role_grants: HashMap<Role, Vec<Arc<Permission>>> = data
            .role_permissions
            .into_iter()
            .map(|(role, raw)| {
                let parsed = raw
                    .iter()
                    .map(|p| Arc::new(Permission::parse_with(p, case)))
                    .collect();
                (role, parsed)
            })
            .collect();

        let mut accounts = HashMap::with_capacity(data.accounts.len());
        for record in data.accounts {
            let mut permissions = PermissionSet::new();
            for role in &record.roles {
                match role_grants.get(role) {
                    Some(grants) => {
                        for grant in grants {
                            permissions.insert(Arc::clone(grant));
                        }
                    }
                    None => tracing::debug!(
                        principal = %record.username,
                        role = %role,
                        "role has no permission definition"
                    ),
                }
            }
            for raw in &record.permissions {
                permissions.insert(Arc::new(Permission::parse_with(raw, case)));
            }

            let principal = PrincipalId::new(record.username);
            let account = Account {
                principal: principal.clone(),
                secret: record.password,
                roles: record.roles.into_iter().collect(),
                permissions,
                disabled: record.disabled,
            };
            if accounts.insert(principal.clone(), account).is_some() {
                tracing::warn!(principal = %principal, "duplicate account definition; keeping the last one");
            }
        }

        Self {
            accounts,
            loaded_at: Utc::now(),
        }
    }

    /// Check a username/password pair.
    ///
    /// Unknown principal, wrong secret and disabled account all yield the same
    /// [`RealmError::AuthenticationFailed`]. A secret comparison runs even when
    /// the principal is unknown.
    pub fn authenticate(&self, credentials: &UsernamePassword) -> RealmResult<PrincipalId> {
        let decoy = Secret::new("");
        let account = self.accounts.get(credentials.username.as_str());
        let stored = account.map(|a| &a.secret).unwrap_or(&decoy);
        let secret_ok = stored.matches(&credentials.password);

        match account {
            Some(account) if secret_ok && !account.disabled => Ok(account.principal.clone()),
            Some(account) if secret_ok => {
                tracing::debug!(principal = %account.principal, "login attempt on disabled account");
                Err(RealmError::AuthenticationFailed)
            }
            _ => Err(RealmError::AuthenticationFailed),
        }
    }

    pub fn account(&self, principal: &str) -> Option<&Account> {
        self.accounts.get(principal)
    }

    pub fn contains(&self, principal: &str) -> bool {
        self.accounts.contains_key(principal)
    }

    /// Unknown principal ⇒ `false`.
    pub fn has_role(&self, principal: &str, role: &str) -> bool {
        self.accounts
            .get(principal)
            .is_some_and(|a| a.roles.contains(role))
    }

    /// Unknown principal ⇒ `false`.
    pub fn has_permission(&self, principal: &str, requested: &Permission) -> bool {
        self.accounts
            .get(principal)
            .is_some_and(|a| a.permissions.implies(requested))
    }

    pub fn principals(&self) -> impl Iterator<Item = &PrincipalId> {
        self.accounts.keys()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

impl Default for GrantSet {
    fn default() -> Self {
        Self::empty()
    }
}
