//! Component J (global IDF half): a read-only, mmap-backed table of `(word_id,
//! doc_count)` pairs sorted by word id, used to rank terms by document frequency
//! aggregated across more than one index. Grounded on
//! `original_source/neo/core/global_idf.cpp` (`CSphGlobalIDF`): the wire format is a
//! flat sorted array, looked up by binary search; an optional shift-hash index exists in
//! the original to speed up direct hits, omitted here since a binary search over a
//! mmap'd array is already O(log n) with no extra on-disk structure to maintain.

use std::path::Path;

use crate::core::error::Result;
use crate::core::types::WordId;
use crate::io::reader::MappedFile;

const ENTRY_BYTES: usize = 16; // u64 word_id + u64 doc_count, fixed width, no vlb

pub struct GlobalIdf {
    mapped: MappedFile,
    total_docs: u64,
}

impl GlobalIdf {
    pub fn open(path: impl AsRef<Path>, total_docs: u64) -> Result<Self> {
        Ok(GlobalIdf { mapped: MappedFile::open(path)?, total_docs })
    }

    fn entry_count(&self) -> usize {
        self.mapped.data().len() / ENTRY_BYTES
    }

    fn entry_at(&self, i: usize) -> (u64, u64) {
        let data = self.mapped.data();
        let off = i * ENTRY_BYTES;
        let word_id = u64::from_le_bytes(data[off..off + 8].try_into().unwrap());
        let doc_count = u64::from_le_bytes(data[off + 8..off + 16].try_into().unwrap());
        (word_id, doc_count)
    }

    pub fn doc_count(&self, word_id: WordId) -> Option<u64> {
        let n = self.entry_count();
        let (mut lo, mut hi) = (0usize, n);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let (wid, count) = self.entry_at(mid);
            if wid == word_id.0 {
                return Some(count);
            } else if wid < word_id.0 {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        None
    }

    /// Plain IDF: `log((total - docs + 1) / docs) / (2 * log(total + 1))`; the
    /// non-plain variant drops the `+1` numerator bias: `log(total / docs) / (2 *
    /// log(total + 1))` (§4.J "two IDF formulas"). A zero `doc_count` (word absent from
    /// the table) is treated as one hit to keep both logs finite.
    pub fn idf(&self, word_id: WordId, plain: bool) -> f64 {
        let doc_count = self.doc_count(word_id).unwrap_or(0).max(1) as f64;
        let total = self.total_docs as f64;
        let denom = 2.0 * (total + 1.0).ln();
        if plain {
            ((total - doc_count + 1.0) / doc_count).ln() / denom
        } else {
            (total / doc_count).ln() / denom
        }
    }

    /// Serializes a sorted `(word_id, doc_count)` iterator into the fixed-width wire
    /// format this reader expects.
    pub fn write(entries: &[(WordId, u64)]) -> Vec<u8> {
        let mut out = Vec::with_capacity(entries.len() * ENTRY_BYTES);
        for (wid, count) in entries {
            out.extend_from_slice(&wid.0.to_le_bytes());
            out.extend_from_slice(&count.to_le_bytes());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_and_idf_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idf.bin");
        let entries = vec![(WordId(1), 10u64), (WordId(5), 2), (WordId(9), 100)];
        std::fs::write(&path, GlobalIdf::write(&entries)).unwrap();

        let idf = GlobalIdf::open(&path, 1000).unwrap();
        assert_eq!(idf.doc_count(WordId(5)), Some(2));
        assert_eq!(idf.doc_count(WordId(42)), None);
        assert!(idf.idf(WordId(9), true) < idf.idf(WordId(5), true));
    }

    #[test]
    fn plain_and_non_plain_match_pinned_formulas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idf.bin");
        let entries = vec![(WordId(1), 10u64)];
        std::fs::write(&path, GlobalIdf::write(&entries)).unwrap();
        let idf = GlobalIdf::open(&path, 1000).unwrap();

        let total = 1000f64;
        let docs = 10f64;
        let denom = 2.0 * (total + 1.0).ln();
        let expected_plain = ((total - docs + 1.0) / docs).ln() / denom;
        let expected_other = (total / docs).ln() / denom;
        assert!((idf.idf(WordId(1), true) - expected_plain).abs() < 1e-9);
        assert!((idf.idf(WordId(1), false) - expected_other).abs() < 1e-9);
    }
}
