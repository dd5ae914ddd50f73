//! Realm error model.

use serde::Serialize;
use thiserror::Error;

/// Result type used across realm implementations.
pub type RealmResult<T> = Result<T, RealmError>;

/// Top-level realm error.
///
/// Three kinds only: configuration problems, rejected credentials, and backing
/// store failures. Role and permission checks never produce an authorization
/// error; a denied check is `Ok(false)`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RealmError {
    /// Missing/unknown configuration or a lifecycle misuse (e.g. not initialized).
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Credentials were rejected.
    ///
    /// Carries no payload: an unknown principal and a wrong secret are
    /// indistinguishable to the caller.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The backing identity store is unreachable or returned malformed data.
    #[error("backing store error: {0}")]
    BackingStore(#[from] StoreError),
}

impl RealmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::AuthenticationFailed => ErrorKind::Authentication,
            Self::BackingStore(_) => ErrorKind::BackingStore,
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::Configuration(ConfigError::Invalid(msg.into()))
    }

    pub fn not_initialized() -> Self {
        Self::Configuration(ConfigError::NotInitialized)
    }

    /// Whether a host may reasonably retry the failed operation as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BackingStore(_))
    }
}

/// Coarse error classification for callers that only need to branch on kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Authentication,
    BackingStore,
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Authentication => "authentication",
            ErrorKind::BackingStore => "backing_store",
        })
    }
}

/// Configuration and lifecycle failures. Fatal to realm construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("realm is not initialized")]
    NotInitialized,

    #[error("realm is already initialized")]
    AlreadyInitialized,

    #[error("unknown realm type '{0}'")]
    UnknownRealmType(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("operation not supported by realm type '{realm_type}': {operation}")]
    Unsupported {
        realm_type: String,
        operation: &'static str,
    },
}

/// Failures of the external identity store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("cannot read '{location}': {reason}")]
    Unreadable { location: String, reason: String },

    #[error("malformed data in '{location}' at line {line}: {reason}")]
    Malformed {
        location: String,
        line: usize,
        reason: String,
    },

    #[error("backing store timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("backing store unavailable: {0}")]
    Unavailable(String),
}
