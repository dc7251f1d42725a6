//! Hit builder (component D, §3.3, §3.4, §4.D). Encodes doclist/hitlist/skiplist from a
//! sorted hit stream, handling field-end markers, duplicate-hit discard and hitless
//! modes. Grounded on `original_source/neo/core/hit_builder.cpp`
//! (`DoclistBeginEntry`/`DoclistEndEntry`/`DoclistEndList`/`cidxHit`).
//!
//! One simplification versus the original: the original is a true single-pass streaming
//! state machine that assigns `FIELDEND_MASK` only once the *next* hit is inspected
//! (§9's design note). This implementation groups a word's hits by document up front
//! (the caller already has the full sorted stream in memory), so field-end markers are
//! resolved with a one-element lookahead over an in-memory `Vec` rather than a held-over
//! "possibly last in field" flag across state-machine transitions. The on-disk output is
//! identical either way; only the construction strategy differs.

use std::collections::HashSet;

use crate::core::error::{Error, ErrorKind, Result, StickyError};
use crate::core::types::{DocId, FieldMask, HitFormat, HitlessMode, WordId, WordPos, SKIPLIST_BLOCK};
use crate::index::skiplist::{self, SkipEntry};
use crate::io::vlb;

/// High bit of a doclist entry's `doc_hit_count` zint, set for hitless words (§4.D).
const HITLESS_DOC_MASK: u32 = 0x8000_0000;

/// All hits for one document under one word, already deduplicated by the caller's sort
/// but not yet deduped of exact-equal positions (the builder does that).
#[derive(Debug, Clone)]
pub struct WordDoc {
    pub doc_id: DocId,
    pub hits: Vec<WordPos>,
}

#[derive(Debug, Clone)]
pub struct DictQueueEntry {
    pub word_id: WordId,
    pub doclist_offset: u64,
    pub doc_count: u32,
    pub hit_count: u32,
    pub skiplist_offset: Option<u32>,
    pub hint: Option<u8>,
}

pub struct HitBuilderOutput {
    pub doclist: Vec<u8>,
    pub hitlist: Vec<u8>,
    pub skiplist: Vec<u8>,
    pub dict_queue: Vec<DictQueueEntry>,
}

pub struct HitBuilder {
    hit_format: HitFormat,
    hitless_mode: HitlessMode,
    hitless_words: HashSet<u64>,
    doclist: Vec<u8>,
    hitlist: Vec<u8>,
    skiplist: Vec<u8>,
    dict_queue: Vec<DictQueueEntry>,
    sticky: StickyError,
}

impl HitBuilder {
    pub fn new(hit_format: HitFormat, hitless_mode: HitlessMode, hitless_words: HashSet<u64>) -> Self {
        HitBuilder {
            hit_format,
            hitless_mode,
            hitless_words,
            doclist: Vec::new(),
            hitlist: Vec::new(),
            skiplist: Vec::new(),
            dict_queue: Vec::new(),
            sticky: StickyError::default(),
        }
    }

    fn is_hitless(&self, word_id: WordId) -> bool {
        match self.hitless_mode {
            HitlessMode::All => true,
            HitlessMode::None => false,
            HitlessMode::Some => self.hitless_words.contains(&word_id.0),
        }
    }

    /// Writes one word's full, already-sorted `(doc_id, positions)` stream. Docs must be
    /// strictly increasing in `doc_id`; within a doc, positions must be non-decreasing
    /// (equal positions are a normal condition and are discarded, a decrease is a fatal
    /// invariant violation per §4.D's failure semantics).
    pub fn write_word(&mut self, word_id: WordId, docs: &[WordDoc]) -> Result<()> {
        self.sticky.check()?;

        let hitless = self.is_hitless(word_id);
        let doclist_start = self.doclist.len() as u64;
        let mut last_doc_id: u64 = 0;
        let mut last_hitlist_offset: u64 = 0;
        let mut doc_count: u32 = 0;
        let mut hit_count_total: u32 = 0;
        let mut skip_entries: Vec<SkipEntry> = Vec::new();

        for wd in docs {
            if doc_count > 0 {
                if wd.doc_id.0 <= last_doc_id {
                    let err = Error::new(ErrorKind::CorruptFormat, "hit stream doc_id did not increase within word");
                    self.sticky.set(err.clone());
                    return Err(err);
                }
                if doc_count % SKIPLIST_BLOCK == 0 {
                    skip_entries.push(SkipEntry {
                        doc_id: wd.doc_id.0,
                        doclist_offset: self.doclist.len() as u64,
                        hitlist_offset: self.hitlist.len() as u64,
                    });
                }
            }
            let delta = wd.doc_id.0 - last_doc_id;
            last_doc_id = wd.doc_id.0;
            vlb::encode_u64(delta, &mut self.doclist);

            let mut kept: Vec<WordPos> = Vec::with_capacity(wd.hits.len());
            for (i, &wp) in wd.hits.iter().enumerate() {
                if i > 0 {
                    let prev = wd.hits[i - 1];
                    if wp.0 < prev.0 {
                        let err = Error::new(ErrorKind::CorruptFormat, "hit position decreased within (word, doc)");
                        self.sticky.set(err.clone());
                        return Err(err);
                    }
                    if wp.0 == prev.0 {
                        continue; // duplicate hit: discarded, not an error (§4.D)
                    }
                }
                kept.push(wp);
            }
            let hit_count = kept.len() as u32;
            hit_count_total += hit_count;

            if hitless {
                vlb::encode_u32(hit_count | HITLESS_DOC_MASK, &mut self.doclist);
            } else if hit_count == 1 && matches!(self.hit_format, HitFormat::Inline) {
                vlb::encode_u32(hit_count, &mut self.doclist);
                let wp = kept[0];
                vlb::encode_u32(wp.in_field_pos(), &mut self.doclist);
                vlb::encode_u32(wp.field_index(), &mut self.doclist);
            } else {
                vlb::encode_u32(hit_count, &mut self.doclist);
                let mut mask = FieldMask::default();
                for wp in &kept {
                    mask.set(wp.field_index());
                }
                vlb::encode_u32(mask.0, &mut self.doclist);
                let hitlist_offset_delta = self.hitlist.len() as u64 - last_hitlist_offset;
                vlb::encode_u64(hitlist_offset_delta, &mut self.doclist);
                last_hitlist_offset = self.hitlist.len() as u64;

                let mut prev_pos: u32 = 0;
                for (i, &wp) in kept.iter().enumerate() {
                    let is_field_end = i + 1 == kept.len() || kept[i + 1].field_index() != wp.field_index();
                    let delta = wp.0 - prev_pos;
                    prev_pos = wp.0;
                    let encoded = if is_field_end { (delta as u64) | (WordPos::FIELDEND_MASK as u64) } else { delta as u64 };
                    vlb::encode_u64(encoded, &mut self.hitlist);
                }
                vlb::encode_u32(0, &mut self.hitlist); // per-(word,doc) hitlist terminator
            }

            doc_count += 1;
        }
        vlb::encode_u32(0, &mut self.doclist); // end-of-doclist terminator (§3.3)

        let skiplist_offset = if doc_count > SKIPLIST_BLOCK {
            let offset = self.skiplist.len() as u32;
            skiplist::encode_blocks(&skip_entries, &mut self.skiplist);
            Some(offset)
        } else {
            None
        };

        let entry_bytes = self.doclist.len() as u64 - doclist_start;
        let hint = if doc_count >= 256 {
            Some((entry_bytes / doc_count.max(1) as u64).min(255) as u8)
        } else {
            None
        };

        self.dict_queue.push(DictQueueEntry {
            word_id,
            doclist_offset: doclist_start,
            doc_count,
            hit_count: hit_count_total,
            skiplist_offset,
            hint,
        });
        Ok(())
    }

    pub fn finish(self) -> Result<HitBuilderOutput> {
        self.sticky.check()?;
        Ok(HitBuilderOutput {
            doclist: self.doclist,
            hitlist: self.hitlist,
            skiplist: self.skiplist,
            dict_queue: self.dict_queue,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wp(field: u32, pos: u32) -> WordPos {
        WordPos::pack(field, pos)
    }

    #[test]
    fn scenario_one_from_spec() {
        // (w=10,d=1,p=1),(w=10,d=1,p=5),(w=10,d=2,p=1),(w=11,d=1,p=1)
        let mut b = HitBuilder::new(HitFormat::Inline, HitlessMode::None, HashSet::new());
        b.write_word(
            WordId(10),
            &[
                WordDoc { doc_id: DocId(1), hits: vec![wp(0, 1), wp(0, 5)] },
                WordDoc { doc_id: DocId(2), hits: vec![wp(0, 1)] },
            ],
        )
        .unwrap();
        b.write_word(WordId(11), &[WordDoc { doc_id: DocId(1), hits: vec![wp(0, 1)] }]).unwrap();
        let out = b.finish().unwrap();
        assert_eq!(out.dict_queue.len(), 2);
        assert_eq!(out.dict_queue[0].doc_count, 2);
        assert_eq!(out.dict_queue[0].hit_count, 3);
        // w=10/d=2 has a single hit and inline format -> no hitlist bytes for it.
        assert_eq!(out.dict_queue[1].doc_count, 1);
    }

    #[test]
    fn duplicate_hit_is_discarded_not_an_error() {
        let mut b = HitBuilder::new(HitFormat::Plain, HitlessMode::None, HashSet::new());
        b.write_word(
            WordId(1),
            &[WordDoc { doc_id: DocId(1), hits: vec![wp(0, 1), wp(0, 1), wp(0, 2)] }],
        )
        .unwrap();
        let out = b.finish().unwrap();
        assert_eq!(out.dict_queue[0].hit_count, 2);
    }

    #[test]
    fn position_decrease_within_doc_is_fatal() {
        let mut b = HitBuilder::new(HitFormat::Plain, HitlessMode::None, HashSet::new());
        let res = b.write_word(WordId(1), &[WordDoc { doc_id: DocId(1), hits: vec![wp(0, 5), wp(0, 1)] }]);
        assert!(res.is_err());
        assert!(b.finish().is_err());
    }

    #[test]
    fn exactly_128_docs_has_no_skiplist_entry() {
        let docs: Vec<WordDoc> = (1..=128).map(|i| WordDoc { doc_id: DocId(i), hits: vec![wp(0, 1)] }).collect();
        let mut b = HitBuilder::new(HitFormat::Inline, HitlessMode::None, HashSet::new());
        b.write_word(WordId(1), &docs).unwrap();
        let out = b.finish().unwrap();
        assert_eq!(out.dict_queue[0].skiplist_offset, None);
    }

    #[test]
    fn exactly_129_docs_has_one_skiplist_entry() {
        let docs: Vec<WordDoc> = (1..=129).map(|i| WordDoc { doc_id: DocId(i), hits: vec![wp(0, 1)] }).collect();
        let mut b = HitBuilder::new(HitFormat::Inline, HitlessMode::None, HashSet::new());
        b.write_word(WordId(1), &docs).unwrap();
        let out = b.finish().unwrap();
        assert!(out.dict_queue[0].skiplist_offset.is_some());
        let decoded = skiplist::decode_blocks(&out.skiplist, 0);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].doc_id, 129);
    }

    #[test]
    fn hitless_all_mode_records_no_hitlist_bytes() {
        let mut b = HitBuilder::new(HitFormat::Plain, HitlessMode::All, HashSet::new());
        b.write_word(
            WordId(1),
            &[WordDoc { doc_id: DocId(1), hits: vec![wp(0, 1), wp(0, 2), wp(0, 3)] }],
        )
        .unwrap();
        let out = b.finish().unwrap();
        assert!(out.hitlist.is_empty());
        assert_eq!(out.dict_queue[0].hit_count, 3);
    }

    #[test]
    fn field_end_marks_last_hit_of_each_field() {
        let mut b = HitBuilder::new(HitFormat::Plain, HitlessMode::None, HashSet::new());
        b.write_word(
            WordId(1),
            &[WordDoc { doc_id: DocId(1), hits: vec![wp(0, 1), wp(0, 2), wp(1, 1)] }],
        )
        .unwrap();
        let out = b.finish().unwrap();
        assert_eq!(out.dict_queue[0].hit_count, 3);
        assert!(!out.hitlist.is_empty());
    }
}
