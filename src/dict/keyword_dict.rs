//! Component E: the in-memory keyword dictionary built during indexing. Grounded on
//! `original_source/neo/dict/dict_keyword.cpp` (`CSphDictKeywords::HitblockGetID` and the
//! `m_dHash` chained table it maintains, plus `HitblockAddKeyword`'s exceptions vector and
//! `HitblockPatch`/`FindFirstGte`).
//!
//! Keywords hash into a fixed `NUM_BUCKETS`-slot table by `crc32(keyword) % NUM_BUCKETS`.
//! Each bucket holds a small chain; a lookup that hits an existing keyword moves its entry
//! to the front of the chain (move-to-front), so hot keywords stay cheap to re-find during
//! a single hitblock's worth of hits. A brand-new keyword is assigned the smallest word id
//! `crc32(keyword) + k` (`k >= 0`) not already claimed by a *different* keyword — collisions
//! on the 32-bit CRC are resolved by linear probing of `k`, never by chaining on word id.
//! Every keyword skipped over during that probe (because it belongs to someone else) and
//! the keyword that finally wins a bumped id are both recorded in an **exceptions vector**
//! keyed by word id, so a later pass can detect and repair collision runs that ended up
//! out of keyword-string order.

use std::collections::{BTreeMap, HashMap};

use crate::core::types::WordId;
use crate::io::crc32;

const NUM_BUCKETS: usize = 1 << 20;

struct ChainEntry {
    keyword: Box<[u8]>,
    word_id: WordId,
}

/// One member of a CRC-collision class: the word id it was finally assigned, the shared
/// CRC all members of its class collided on, and its keyword (needed by
/// [`KeywordDict::hitblock_patch`] to recover string order).
#[derive(Debug, Clone)]
pub struct ExceptionEntry {
    pub word_id: WordId,
    pub crc: u32,
    pub keyword: Box<[u8]>,
}

pub struct KeywordDict {
    buckets: Vec<Vec<ChainEntry>>,
    /// word id -> keyword, so a fully assigned id can be rejected from collision probing
    /// even if it lives in a different bucket than its crc would suggest after probing.
    assigned: HashMap<u64, Box<[u8]>>,
    /// Collision-class members, kept sorted by word id via the map key.
    exceptions: BTreeMap<u64, ExceptionEntry>,
}

impl KeywordDict {
    pub fn new() -> Self {
        KeywordDict {
            buckets: (0..NUM_BUCKETS).map(|_| Vec::new()).collect(),
            assigned: HashMap::new(),
            exceptions: BTreeMap::new(),
        }
    }

    fn bucket_index(crc: u32) -> usize {
        crc as usize % NUM_BUCKETS
    }

    /// Returns the word id for `keyword`, assigning a new one on first sight.
    pub fn lookup_or_insert(&mut self, keyword: &[u8]) -> WordId {
        let crc = crc32::crc32(keyword);
        let idx = Self::bucket_index(crc);
        let bucket = &mut self.buckets[idx];
        if let Some(pos) = bucket.iter().position(|e| &*e.keyword == keyword) {
            let entry = bucket.remove(pos);
            let id = entry.word_id;
            bucket.insert(0, entry);
            return id;
        }

        let mut k: u64 = 0;
        let mut collided = false;
        let word_id = loop {
            let candidate = crc as u64 + k;
            match self.assigned.get(&candidate) {
                Some(existing) if &**existing != keyword => {
                    collided = true;
                    self.exceptions.entry(candidate).or_insert_with(|| ExceptionEntry {
                        word_id: WordId(candidate),
                        crc,
                        keyword: existing.clone(),
                    });
                    k += 1;
                }
                _ => break candidate,
            }
        };
        self.assigned.insert(word_id, keyword.into());
        if collided {
            self.exceptions.entry(word_id).or_insert_with(|| ExceptionEntry {
                word_id: WordId(word_id),
                crc,
                keyword: keyword.into(),
            });
        }
        bucket.insert(0, ChainEntry { keyword: keyword.into(), word_id: WordId(word_id) });
        WordId(word_id)
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    /// All (keyword, word_id) pairs, unordered; the finalizer sorts them before writing.
    pub fn entries(&self) -> impl Iterator<Item = (&[u8], WordId)> {
        self.buckets.iter().flatten().map(|e| (&*e.keyword, e.word_id))
    }

    /// CRC-collision-class members, sorted by word id.
    pub fn exceptions(&self) -> impl Iterator<Item = &ExceptionEntry> {
        self.exceptions.values()
    }

    /// Reorders `items` (already sorted ascending by word id, e.g. a finalizer's per-run
    /// entries or a sorted hit batch) so CRC-collision runs come out in keyword-string
    /// order rather than numeric word-id order, mirroring
    /// `CSphDictKeywords::HitblockPatch`. Two-member runs are a direct swap; longer runs
    /// are materialized through a temporary buffer. A no-op if `items` doesn't actually
    /// contain every member of a given run (e.g. it only covers one hitblock).
    pub fn hitblock_patch<T: Clone>(&self, items: &mut [T], word_id_of: impl Fn(&T) -> WordId) {
        if self.exceptions.is_empty() || items.is_empty() {
            return;
        }
        let word_ids: Vec<u64> = items.iter().map(|it| word_id_of(it).0).collect();

        let mut by_crc: BTreeMap<u32, Vec<WordId>> = BTreeMap::new();
        for e in self.exceptions.values() {
            by_crc.entry(e.crc).or_default().push(e.word_id);
        }

        for run in by_crc.values() {
            if run.len() < 2 {
                continue;
            }
            let lo = find_first_gte(&word_ids, run[0].0);
            let hi = find_first_gte(&word_ids, run[run.len() - 1].0 + 1);
            if hi < lo || hi - lo != run.len() {
                continue; // this slice doesn't hold every member of the run
            }

            let mut order: Vec<usize> = (lo..hi).collect();
            order.sort_by_key(|&i| self.assigned.get(&word_id_of(&items[i]).0).cloned());

            if run.len() == 2 {
                if order[0] != lo {
                    items.swap(lo, lo + 1);
                }
                continue;
            }
            if order.iter().enumerate().any(|(k, &i)| i != lo + k) {
                let permuted: Vec<T> = order.iter().map(|&i| items[i].clone()).collect();
                for (offset, item) in permuted.into_iter().enumerate() {
                    items[lo + offset] = item;
                }
            }
        }
    }
}

/// Index of the first element of `word_ids` (sorted ascending) that is `>= target`.
/// Mirrors `FindFirstGte` from the original source.
pub fn find_first_gte(word_ids: &[u64], target: u64) -> usize {
    word_ids.partition_point(|&id| id < target)
}

impl Default for KeywordDict {
    fn default() -> Self {
        Self::new()
    }
}
