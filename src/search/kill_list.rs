//! Component J (kill list half): tracks documents deleted since the index segment was
//! last built, so a query can filter them out of results without touching the doclist.
//! Grounded on `original_source/neo/core/kill_list.cpp`/`kill_list.h`
//! (`CSphKillList`): a small ordered hash up to [`MAX_SMALL_SIZE`] entries for cheap
//! single-doc kills, flushed into a sorted vector once it overflows. Membership checks
//! consult the union of both.
//!
//! Grounded on `CSphKilllist::Flush`'s read-then-upgrade pattern: [`contains`] takes only
//! a read lock; [`add`] takes a write lock and, on overflow, merges the small hash into
//! the sorted vector in one pass.

use parking_lot::RwLock;

use crate::core::types::DocId;

const MAX_SMALL_SIZE: usize = 512;

#[derive(Default)]
struct Inner {
    small: Vec<u64>,
    large: Vec<u64>, // sorted, deduplicated
}

pub struct KillList {
    inner: RwLock<Inner>,
}

impl KillList {
    pub fn new() -> Self {
        KillList { inner: RwLock::new(Inner::default()) }
    }

    pub fn contains(&self, doc_id: DocId) -> bool {
        let inner = self.inner.read();
        if inner.small.contains(&doc_id.0) {
            return true;
        }
        inner.large.binary_search(&doc_id.0).is_ok()
    }

    /// Marks `doc_id` killed. Flushes the small hash into the sorted vector once it
    /// would exceed [`MAX_SMALL_SIZE`], so lookups stay a binary search rather than a
    /// linear scan over an unbounded small set.
    pub fn add(&self, doc_id: DocId) {
        let mut inner = self.inner.write();
        if inner.small.contains(&doc_id.0) || inner.large.binary_search(&doc_id.0).is_ok() {
            return;
        }
        inner.small.push(doc_id.0);
        if inner.small.len() >= MAX_SMALL_SIZE {
            self.flush_locked(&mut inner);
        }
    }

    fn flush_locked(&self, inner: &mut Inner) {
        inner.large.extend(inner.small.drain(..));
        inner.large.sort_unstable();
        inner.large.dedup();
    }

    pub fn flush(&self) {
        let mut inner = self.inner.write();
        self.flush_locked(&mut inner);
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read();
        inner.small.len() + inner.large.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for KillList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_before_and_after_flush() {
        let kl = KillList::new();
        kl.add(DocId(5));
        assert!(kl.contains(DocId(5)));
        assert!(!kl.contains(DocId(6)));
        kl.flush();
        assert!(kl.contains(DocId(5)));
    }

    #[test]
    fn overflow_triggers_flush_and_membership_survives() {
        let kl = KillList::new();
        for i in 0..(MAX_SMALL_SIZE as u64 + 10) {
            kl.add(DocId(i));
        }
        assert!(kl.contains(DocId(0)));
        assert!(kl.contains(DocId(MAX_SMALL_SIZE as u64 + 9)));
        assert_eq!(kl.len(), MAX_SMALL_SIZE + 10);
    }

    #[test]
    fn duplicate_add_does_not_grow_set() {
        let kl = KillList::new();
        kl.add(DocId(1));
        kl.add(DocId(1));
        assert_eq!(kl.len(), 1);
    }
}
