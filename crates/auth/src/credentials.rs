//! Credential shapes accepted by secret-based realms.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use sha2::digest::Output;
use sha2::{Digest, Sha256};

use realmkit_core::{RealmError, RealmResult};

/// A stored or supplied secret.
///
/// `Debug` never prints the value. Comparison goes through fixed-length
/// digests so its cost does not depend on where two secrets first differ.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    fn digest(&self) -> Output<Sha256> {
        Sha256::digest(self.0.as_bytes())
    }

    /// Compare two secrets without early exit.
    pub fn matches(&self, other: &Secret) -> bool {
        let (a, b) = (self.digest(), other.digest());
        a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Debug for Secret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl Eq for Secret {}

/// `{ "username": ..., "password": ... }`
#[derive(Debug, Clone, Deserialize)]
pub struct UsernamePassword {
    pub username: String,
    pub password: Secret,
}

impl UsernamePassword {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Secret::new(password),
        }
    }

    /// Extract username/password from a credentials bag.
    ///
    /// Any malformed shape is reported as a plain authentication failure; the
    /// caller learns nothing about which field was wrong.
    pub fn from_json(credentials: &JsonValue) -> RealmResult<Self> {
        let parsed = Self::deserialize(credentials).map_err(|e| {
            tracing::debug!(error = %e, "credentials rejected: unexpected shape");
            RealmError::AuthenticationFailed
        })?;

        if parsed.username.is_empty() {
            return Err(RealmError::AuthenticationFailed);
        }
        Ok(parsed)
    }
}
