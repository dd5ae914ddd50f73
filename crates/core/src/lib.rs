//! `realmkit-core`: shared foundation for realm implementations.
//!
//! This crate contains the error taxonomy every realm reports through. It has
//! no knowledge of permission matching or backing stores.

pub mod error;

pub use error::{ConfigError, ErrorKind, RealmError, RealmResult, StoreError};
