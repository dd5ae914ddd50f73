//! `realmkit-auth`: the realm contract and permission semantics.
//!
//! This crate is intentionally decoupled from any backing store: stores hand
//! over raw [`GrantData`] and everything from there (role resolution,
//! wildcard matching, login checks) happens here.

pub mod authorize;
pub mod cache;
pub mod credentials;
pub mod grant;
pub mod matcher;
pub mod permissions;
pub mod principal;
pub mod realm;
pub mod roles;

pub use authorize::{AuthzError, authorize, authorize_role};
pub use cache::ExpressionCache;
pub use credentials::{Secret, UsernamePassword};
pub use grant::{Account, AccountRecord, GrantData, GrantSet};
pub use matcher::{PermissionSet, implies};
pub use permissions::{CaseSensitivity, Permission, WILDCARD_TOKEN};
pub use principal::PrincipalId;
pub use realm::{LiveGrants, Realm, RealmState, RealmType, login_with_timeout};
pub use roles::Role;

pub use realmkit_core::{ConfigError, ErrorKind, RealmError, RealmResult, StoreError};
