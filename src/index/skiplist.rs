//! Skiplist encode/decode helpers (§3.3, §3.11, §4.D "Skiplist emission"). A sparse
//! index over one word's doclist, one entry per [`SKIPLIST_BLOCK`] documents.
//!
//! The first block (document index 0) is implicit — `base_doc_id = 0`, offset equal to
//! the word's doclist start, `base_hit_pos = 0` — and is never stored. Every later block
//! is triple-delta-coded against the previous one with three fixed bias subtractions, so
//! the common case (dense sequential doc ids, steadily growing doclist/hitlist) encodes
//! to small positive deltas.

use crate::core::types::SKIPLIST_BLOCK;
use crate::io::vlb;

const DOCLIST_BIAS: u64 = 4 * SKIPLIST_BLOCK as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipEntry {
    pub doc_id: u64,
    pub doclist_offset: u64,
    pub hitlist_offset: u64,
}

/// Encode every entry after the implicit first one, biased against its predecessor.
pub fn encode_blocks(entries: &[SkipEntry], out: &mut Vec<u8>) {
    let mut prev = SkipEntry { doc_id: 0, doclist_offset: 0, hitlist_offset: 0 };
    for e in entries {
        let doc_delta = (e.doc_id - prev.doc_id).saturating_sub(SKIPLIST_BLOCK as u64);
        let doclist_delta = (e.doclist_offset - prev.doclist_offset).saturating_sub(DOCLIST_BIAS);
        let hitlist_delta = e.hitlist_offset - prev.hitlist_offset;
        vlb::encode_u64(doc_delta, out);
        vlb::encode_u64(doclist_delta, out);
        vlb::encode_u64(hitlist_delta, out);
        prev = *e;
    }
}

/// Decode the full block list, given the word's doclist start offset (the implicit
/// first entry's `doclist_offset`).
pub fn decode_blocks(buf: &[u8], doclist_start: u64) -> Vec<SkipEntry> {
    let mut out = Vec::new();
    let mut prev = SkipEntry { doc_id: 0, doclist_offset: doclist_start, hitlist_offset: 0 };
    let mut pos = 0;
    while pos < buf.len() {
        let (doc_delta, n1) = vlb::decode_u64(&buf[pos..]);
        pos += n1;
        let (doclist_delta, n2) = vlb::decode_u64(&buf[pos..]);
        pos += n2;
        let (hitlist_delta, n3) = vlb::decode_u64(&buf[pos..]);
        pos += n3;
        let entry = SkipEntry {
            doc_id: prev.doc_id + doc_delta + SKIPLIST_BLOCK as u64,
            doclist_offset: prev.doclist_offset + doclist_delta + DOCLIST_BIAS,
            hitlist_offset: prev.hitlist_offset + hitlist_delta,
        };
        out.push(entry);
        prev = entry;
    }
    out
}

/// The skiplist entry to consult before decoding forward `doc_index` entries into a
/// doclist, i.e. `⌊doc_index / SKIPLIST_BLOCK⌋`, or `None` for the implicit first block.
pub fn block_for_doc_index(doc_index: u32) -> Option<u32> {
    let block = doc_index / SKIPLIST_BLOCK;
    if block == 0 { None } else { Some(block - 1) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_dense_sequential_docs() {
        let entries: Vec<SkipEntry> = (1..=3)
            .map(|i| SkipEntry {
                doc_id: i * SKIPLIST_BLOCK as u64,
                doclist_offset: i * DOCLIST_BIAS,
                hitlist_offset: i * 10,
            })
            .collect();
        let mut buf = Vec::new();
        encode_blocks(&entries, &mut buf);
        let decoded = decode_blocks(&buf, 0);
        assert_eq!(decoded, entries);
    }

    #[test]
    fn doc_index_128_uses_first_explicit_block() {
        assert_eq!(block_for_doc_index(0), None);
        assert_eq!(block_for_doc_index(127), None);
        assert_eq!(block_for_doc_index(128), Some(0));
        assert_eq!(block_for_doc_index(256), Some(1));
    }
}
