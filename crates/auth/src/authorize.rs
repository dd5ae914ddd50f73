use thiserror::Error;

use realmkit_core::RealmError;

use crate::{PrincipalId, Realm};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),

    #[error("forbidden: missing role '{0}'")]
    MissingRole(String),

    #[error(transparent)]
    Realm(#[from] RealmError),
}

/// Require `permission` for `principal`, as a `Result`.
///
/// Convenience for hosts that enforce at a command/request boundary and want
/// `?` instead of branching on `bool`.
///
/// - No IO
/// - No panics
pub fn authorize(
    realm: &dyn Realm,
    principal: &PrincipalId,
    permission: &str,
) -> Result<(), AuthzError> {
    if realm.has_permission(principal, permission)? {
        Ok(())
    } else {
        tracing::debug!(principal = %principal, permission, "permission denied");
        Err(AuthzError::Forbidden(permission.to_string()))
    }
}

/// Require `role` for `principal`.
pub fn authorize_role(
    realm: &dyn Realm,
    principal: &PrincipalId,
    role: &str,
) -> Result<(), AuthzError> {
    if realm.has_role(principal, role)? {
        Ok(())
    } else {
        tracing::debug!(principal = %principal, role, "role denied");
        Err(AuthzError::MissingRole(role.to_string()))
    }
}
