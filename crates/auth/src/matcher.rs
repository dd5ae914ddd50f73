//! Wildcard permission matching.
//!
//! Positions are compared left to right. A granted position holding `*` is
//! satisfied by anything; otherwise it must share at least one sub-part with
//! the requested position. A grant that runs out of positions first implies
//! everything beyond its length (`newsletter:edit` covers
//! `newsletter:edit:13`). A grant longer than the request only matches if all
//! of its extra positions are wildcards.

use std::sync::Arc;

use crate::permissions::{Permission, is_wildcard};

/// Whether `granted` implies `requested`.
pub fn implies(granted: &Permission, requested: &Permission) -> bool {
    let granted_parts = granted.parts();
    let requested_parts = requested.parts();

    for (idx, requested_part) in requested_parts.iter().enumerate() {
        let Some(granted_part) = granted_parts.get(idx) else {
            // Truncated grant: everything past its end is implied.
            return true;
        };

        if is_wildcard(granted_part) {
            continue;
        }

        if granted_part.is_disjoint(requested_part) {
            return false;
        }
    }

    granted_parts
        .iter()
        .skip(requested_parts.len())
        .all(is_wildcard)
}

/// The granted expressions of one principal.
///
/// A request is permitted if any grant implies it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    grants: Vec<Arc<Permission>>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a grant, skipping structural duplicates.
    pub fn insert(&mut self, permission: Arc<Permission>) -> bool {
        if self.grants.iter().any(|g| **g == *permission) {
            return false;
        }
        self.grants.push(permission);
        true
    }

    pub fn implies(&self, requested: &Permission) -> bool {
        self.first_implying(requested).is_some()
    }

    /// The first grant that covers `requested`, if any.
    pub fn first_implying(&self, requested: &Permission) -> Option<&Permission> {
        self.grants
            .iter()
            .map(|g| g.as_ref())
            .find(|g| implies(g, requested))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.grants.iter().map(|g| g.as_ref())
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        let mut set = Self::new();
        for permission in iter {
            set.insert(Arc::new(permission));
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn check(granted: &str, requested: &str) -> bool {
        implies(&Permission::parse(granted), &Permission::parse(requested))
    }

    #[test]
    fn exact_match() {
        assert!(check("newsletter:edit:13", "newsletter:edit:13"));
    }

    #[test]
    fn truncated_grant_implies_trailing_detail() {
        assert!(check("newsletter:edit", "newsletter:edit:13"));
        assert!(check("newsletter:edit", "newsletter:edit:anything:more"));
        assert!(!check("newsletter:edit", "newsletter:delete:13"));
    }

    #[test]
    fn wildcard_absorbs_position() {
        assert!(check("newsletter:*:13", "newsletter:edit:13"));
        assert!(check("newsletter:*:13", "newsletter:delete:13"));
        assert!(!check("newsletter:*:13", "printing:edit:13"));
        assert!(!check("newsletter:*:13", "newsletter:edit:14"));
    }

    #[test]
    fn global_wildcard_implies_everything() {
        for requested in ["do_actual_work", "newsletter:edit:13", "a:b:c:d", ""] {
            assert!(check("*", requested));
            assert!(check("", requested));
        }
    }

    #[test]
    fn mismatch_is_rejected() {
        assert!(!check("newsletter:edit:13", "newsletter:edit:14"));
    }

    #[test]
    fn longer_grant_needs_trailing_wildcards() {
        assert!(!check("newsletter:edit:13:extra", "newsletter:edit:13"));
        assert!(check("newsletter:edit:*", "newsletter:edit"));
        assert!(check("newsletter:*:*", "newsletter"));
        assert!(!check("newsletter:*:13", "newsletter"));
    }

    #[test]
    fn subparts_intersect() {
        assert!(check("printer:print,query", "printer:query"));
        assert!(check("printer:print,query", "printer:query:lp7200"));
        assert!(!check("printer:print,query", "printer:manage"));
        assert!(check("printer:query", "printer:print,query"));
    }

    #[test]
    fn scoped_editor() {
        assert!(check("newsletter:edit:*", "newsletter:edit:13"));
        assert!(!check("newsletter:edit:*", "newsletter:delete:13"));
    }

    #[test]
    fn set_is_logical_or() {
        let set: PermissionSet = ["newsletter:read", "printer:*:lp7200"]
            .into_iter()
            .map(Permission::parse)
            .collect();
        assert!(set.implies(&Permission::parse("newsletter:read:1")));
        assert!(set.implies(&Permission::parse("printer:print:lp7200")));
        assert!(!set.implies(&Permission::parse("printer:print:lp9000")));
        assert_eq!(
            set.first_implying(&Permission::parse("printer:query:lp7200")),
            Some(&Permission::parse("printer:*:lp7200"))
        );
    }

    #[test]
    fn set_skips_duplicates() {
        let mut set = PermissionSet::new();
        assert!(set.insert(Arc::new(Permission::parse("a:b,c"))));
        assert!(!set.insert(Arc::new(Permission::parse("a:c,b"))));
        assert_eq!(set.len(), 1);
        assert!(!PermissionSet::new().implies(&Permission::parse("a")));
    }

    fn segment() -> impl Strategy<Value = String> {
        "[a-z]{1,6}"
    }

    proptest! {
        #[test]
        fn every_expression_implies_itself(parts in prop::collection::vec(segment(), 1..5)) {
            let perm = Permission::parse(&parts.join(":"));
            prop_assert!(implies(&perm, &perm));
        }

        #[test]
        fn prefix_grant_implies_extensions(
            parts in prop::collection::vec(segment(), 1..4),
            extra in prop::collection::vec(segment(), 0..4),
        ) {
            let granted = Permission::parse(&parts.join(":"));
            let mut requested = parts.clone();
            requested.extend(extra);
            prop_assert!(implies(&granted, &Permission::parse(&requested.join(":"))));
        }

        #[test]
        fn wildcard_at_any_position_keeps_match(
            parts in prop::collection::vec(segment(), 1..5),
            at in 0usize..5,
        ) {
            let requested = Permission::parse(&parts.join(":"));
            let mut granted = parts.clone();
            let at = at % granted.len();
            granted[at] = "*".to_string();
            prop_assert!(implies(&Permission::parse(&granted.join(":")), &requested));
        }
    }
}
