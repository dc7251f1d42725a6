//! Component F: the dictionary finalizer. Merges one or more sorted scratch runs
//! (§4.F) into the final on-disk dictionary blob: front-coded keyword records with a
//! checkpoint (full keyword, byte offset) every [`DICT_CHECKPOINT`] entries, followed by
//! an optional infix section and an optional exceptions-trie section. Grounded on
//! `original_source/neo/dict/dict_keyword.cpp` (`CSphDictKeywords::DictEnd`, which walks
//! its sorted hitblock keywords emitting checkpoints, then appends the infix blob and
//! exceptions blob before the final header) and `original_source/neo/source/bin.cpp`'s
//! `CSphBin`-driven merge loop, realized here with a `BinaryHeap` loser-tree stand-in over
//! [`ScratchReader`]s. The merge writes straight through a throttled [`StickyWriter`]
//! rather than building an in-memory blob, so finalization of a large dictionary doesn't
//! need to hold the whole thing in RAM at once.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::path::Path;

use crate::core::error::Result;
use crate::core::types::{WordId, DICT_CHECKPOINT};
use crate::dict::infix::{BlockHeader, InfixBuilder};
use crate::dict::scratch::{ScratchEntry, ScratchReader};
use crate::io::throttle::{Throttle, ThrottleConfig};
use crate::io::writer::StickyWriter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub keyword: Vec<u8>,
    pub word_id: WordId,
    pub blob_offset: u64,
}

/// Offsets of each section within the file `merge` wrote, so a reader can tell the
/// dictionary's front-coded records apart from the infix and exceptions sections that
/// follow them in the same file.
pub struct FinalizedDict {
    pub checkpoints: Vec<Checkpoint>,
    /// Byte length of the dictionary section (offset 0 .. dict_len).
    pub dict_len: u64,
    pub infix_block_headers: Vec<BlockHeader>,
    /// Byte offset where the infix entry blob begins (equal to `dict_len` if infixes
    /// weren't built).
    pub infix_offset: u64,
    /// Byte offset where the exceptions-trie blob begins (equal to the end of the infix
    /// section if no exceptions blob was supplied).
    pub exceptions_offset: u64,
    pub exceptions_len: u32,
}

struct HeapEntry {
    entry: ScratchEntry,
    run_index: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.entry.keyword == other.entry.keyword
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.entry.keyword.cmp(&other.entry.keyword)
    }
}

/// Merges `runs` (each already sorted by keyword, as produced by the build phase) into a
/// single front-coded, checkpointed dictionary blob written to `out_path`. Identical
/// keywords across runs are not expected (each keyword is assigned exactly once during
/// indexing) and are treated as a hard error rather than silently picking one.
///
/// When `build_infixes` is set, every merged keyword (if valid UTF-8) is streamed into an
/// [`InfixBuilder`] as it's written, and the resulting infix blob is appended right after
/// the dictionary section (§4.F steps 4-5). `exceptions_blob`, if given, is a
/// pre-serialized [`crate::dict::exceptions::ExceptionsTrie`] blob appended after that.
pub fn merge(
    mut runs: Vec<ScratchReader>,
    out_path: impl AsRef<Path>,
    build_infixes: bool,
    exceptions_blob: Option<&[u8]>,
) -> Result<FinalizedDict> {
    let mut heap: BinaryHeap<Reverse<HeapEntry>> = BinaryHeap::new();
    for (i, run) in runs.iter_mut().enumerate() {
        if let Some(entry) = run.next_entry()? {
            heap.push(Reverse(HeapEntry { entry, run_index: i }));
        }
    }

    let mut writer = StickyWriter::create(out_path, Throttle::new(ThrottleConfig::default()))?;
    let mut checkpoints = Vec::new();
    let mut prev_keyword: Vec<u8> = Vec::new();
    let mut count_since_checkpoint = DICT_CHECKPOINT; // force a checkpoint on the first entry
    let mut infix_builder = if build_infixes { Some(InfixBuilder::new()) } else { None };

    while let Some(Reverse(HeapEntry { entry, run_index })) = heap.pop() {
        if let Some(next) = runs[run_index].next_entry()? {
            heap.push(Reverse(HeapEntry { entry: next, run_index }));
        }

        let offset = writer.pos();
        if count_since_checkpoint >= DICT_CHECKPOINT {
            checkpoints.push(Checkpoint { keyword: entry.keyword.clone(), word_id: entry.word_id, blob_offset: offset });
            writer.write_zint(0); // shared-prefix length, always 0 right after a checkpoint
            writer.write_keyword(&entry.keyword);
            count_since_checkpoint = 0;
        } else {
            let shared = common_prefix_len(&prev_keyword, &entry.keyword);
            writer.write_zint(shared as u32);
            writer.write_keyword(&entry.keyword[shared..]);
        }
        writer.write_vlb(entry.word_id.0);
        writer.write_vlb(entry.doclist_offset);
        writer.write_zint(entry.doc_count);
        writer.write_zint(entry.hit_count);
        match entry.skiplist_offset {
            Some(off) => {
                writer.write_bytes(&[1]);
                writer.write_zint(off);
            }
            None => writer.write_bytes(&[0]),
        }
        match entry.hint {
            Some(h) => writer.write_bytes(&[1, h]),
            None => writer.write_bytes(&[0]),
        }

        if let Some(builder) = infix_builder.as_mut() {
            if let Ok(kw) = std::str::from_utf8(&entry.keyword) {
                builder.add_keyword(kw, entry.word_id);
            }
        }

        prev_keyword = entry.keyword;
        count_since_checkpoint += 1;
    }

    let dict_len = writer.pos();
    let infix_offset = dict_len;
    let infix_block_headers = match infix_builder {
        Some(builder) => {
            let index = builder.finish();
            writer.write_bytes(&index.blob);
            index.block_headers
        }
        None => Vec::new(),
    };

    let exceptions_offset = writer.pos();
    let exceptions_len = match exceptions_blob {
        Some(blob) => {
            writer.write_bytes(blob);
            blob.len() as u32
        }
        None => 0,
    };

    writer.check()?;
    writer.finish()?;

    Ok(FinalizedDict { checkpoints, dict_len, infix_block_headers, infix_offset, exceptions_offset, exceptions_len })
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::exceptions::ExceptionsTrie;
    use crate::dict::scratch::ScratchWriter;

    fn entry(kw: &str, id: u64) -> ScratchEntry {
        ScratchEntry {
            keyword: kw.as_bytes().to_vec(),
            word_id: WordId(id),
            doclist_offset: id * 10,
            doc_count: 1,
            hit_count: 1,
            skiplist_offset: None,
            hint: None,
        }
    }

    #[test]
    fn merges_two_runs_in_keyword_order() {
        let dir = tempfile::tempdir().unwrap();
        let path_a = dir.path().join("a.scratch");
        let path_b = dir.path().join("b.scratch");

        let mut wa = ScratchWriter::create(&path_a).unwrap();
        wa.write_entry(&entry("apple", 1)).unwrap();
        wa.write_entry(&entry("mango", 3)).unwrap();
        wa.finish().unwrap();

        let mut wb = ScratchWriter::create(&path_b).unwrap();
        wb.write_entry(&entry("banana", 2)).unwrap();
        wb.write_entry(&entry("zebra", 4)).unwrap();
        wb.finish().unwrap();

        let runs = vec![ScratchReader::open(&path_a).unwrap(), ScratchReader::open(&path_b).unwrap()];
        let out_path = dir.path().join("out.dict");
        let finalized = merge(runs, &out_path, false, None).unwrap();
        assert_eq!(finalized.checkpoints.len(), 1);
        assert_eq!(finalized.checkpoints[0].keyword, b"apple");
        assert_eq!(finalized.exceptions_len, 0);
    }

    #[test]
    fn checkpoint_every_n_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.scratch");
        let mut w = ScratchWriter::create(&path).unwrap();
        for i in 0..(DICT_CHECKPOINT * 2 + 1) {
            w.write_entry(&entry(&format!("word{:05}", i), i as u64)).unwrap();
        }
        w.finish().unwrap();
        let runs = vec![ScratchReader::open(&path).unwrap()];
        let out_path = dir.path().join("out.dict");
        let finalized = merge(runs, &out_path, false, None).unwrap();
        assert_eq!(finalized.checkpoints.len(), 3);
    }

    #[test]
    fn merge_with_infixes_writes_nonempty_infix_section_after_dict() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.scratch");
        let mut w = ScratchWriter::create(&path).unwrap();
        for (i, kw) in ["alpha", "alphabet", "beta", "gamma"].iter().enumerate() {
            w.write_entry(&entry(kw, i as u64)).unwrap();
        }
        w.finish().unwrap();
        let runs = vec![ScratchReader::open(&path).unwrap()];
        let out_path = dir.path().join("out.dict");
        let finalized = merge(runs, &out_path, true, None).unwrap();

        assert!(!finalized.infix_block_headers.is_empty());
        assert_eq!(finalized.infix_offset, finalized.dict_len);
        assert!(finalized.exceptions_offset > finalized.infix_offset);

        let bytes = std::fs::read(&out_path).unwrap();
        let infix_section = &bytes[finalized.infix_offset as usize..finalized.exceptions_offset as usize];
        let ids = crate::dict::infix::lookup(infix_section, &finalized.infix_block_headers, "pha").unwrap();
        assert_eq!(ids, vec![WordId(0), WordId(1)]);
    }

    #[test]
    fn merge_with_exceptions_blob_appends_it_after_infix_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.scratch");
        let mut w = ScratchWriter::create(&path).unwrap();
        w.write_entry(&entry("alpha", 0)).unwrap();
        w.finish().unwrap();

        let mut trie = ExceptionsTrie::new();
        trie.insert(b"dont", b"do not");
        let exceptions_blob = trie.serialize().unwrap();

        let runs = vec![ScratchReader::open(&path).unwrap()];
        let out_path = dir.path().join("out.dict");
        let finalized = merge(runs, &out_path, false, Some(&exceptions_blob)).unwrap();

        assert_eq!(finalized.exceptions_len, exceptions_blob.len() as u32);
        let bytes = std::fs::read(&out_path).unwrap();
        let section = &bytes[finalized.exceptions_offset as usize..];
        assert_eq!(section.len(), exceptions_blob.len());
        assert_eq!(section, exceptions_blob.as_slice());
    }
}
