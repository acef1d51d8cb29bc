//! Deduplication index over `(tenant_id, external_id)`.
//!
//! Grows for the lifetime of the process. Nothing is ever evicted, so an
//! identifier accepted once stays rejected even if its delivery fails later.

use std::collections::{HashMap, HashSet};

use contracts::SharedId;

/// Set of external identifiers already accepted, grouped by tenant
#[derive(Debug, Default)]
pub struct DedupIndex {
    seen: HashMap<SharedId, HashSet<String>>,
    len: usize,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether the pair was accepted before
    #[inline]
    pub fn contains(&self, tenant_id: &str, external_id: &str) -> bool {
        self.seen
            .get(tenant_id)
            .is_some_and(|ids| ids.contains(external_id))
    }

    /// Record the pair
    ///
    /// Returns `false` if it was already present.
    pub fn insert(&mut self, tenant_id: &SharedId, external_id: &str) -> bool {
        if self.contains(tenant_id.as_str(), external_id) {
            return false;
        }
        self.seen
            .entry(tenant_id.clone())
            .or_default()
            .insert(external_id.to_string());
        self.len += 1;
        true
    }

    /// Total number of recorded pairs
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_once() {
        let mut index = DedupIndex::new();
        let tenant: SharedId = "agency".into();

        assert!(index.insert(&tenant, "https://example.com/a"));
        assert!(!index.insert(&tenant, "https://example.com/a"));
        assert!(index.contains("agency", "https://example.com/a"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_scoped_per_tenant() {
        let mut index = DedupIndex::new();

        assert!(index.insert(&"t1".into(), "same"));
        assert!(index.insert(&"t2".into(), "same"));
        assert!(!index.contains("t3", "same"));
        assert_eq!(index.len(), 2);
    }
}
