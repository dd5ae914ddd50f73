//! Parsed-expression cache keyed by the raw permission string.

use std::sync::Arc;

use dashmap::DashMap;

use crate::permissions::{CaseSensitivity, Permission};

const DEFAULT_CAPACITY: usize = 1024;

/// Concurrent cache of parsed permission expressions.
///
/// Bounded: once `capacity` distinct strings are held the cache is cleared
/// and starts over. Permission checks see a small, repetitive vocabulary, so
/// this rarely triggers.
#[derive(Debug)]
pub struct ExpressionCache {
    entries: DashMap<String, Arc<Permission>>,
    capacity: usize,
    case: CaseSensitivity,
}

impl ExpressionCache {
    pub fn new(case: CaseSensitivity) -> Self {
        Self::with_capacity(case, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(case: CaseSensitivity, capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
            case,
        }
    }

    pub fn case(&self) -> CaseSensitivity {
        self.case
    }

    /// Return the cached expression for `raw`, parsing it on first use.
    pub fn get_or_parse(&self, raw: &str) -> Arc<Permission> {
        if let Some(hit) = self.entries.get(raw) {
            return Arc::clone(hit.value());
        }

        let parsed = Arc::new(Permission::parse_with(raw, self.case));
        if self.entries.len() >= self.capacity {
            tracing::debug!(capacity = self.capacity, "permission cache full; clearing");
            self.entries.clear();
        }
        self.entries
            .entry(raw.to_string())
            .or_insert_with(|| Arc::clone(&parsed));
        parsed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ExpressionCache {
    fn default() -> Self {
        Self::new(CaseSensitivity::default())
    }
}
