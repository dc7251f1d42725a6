//! Component I: the read-side dictionary. Loads the finalized blob (§4.F) read-only via
//! mmap, binary searches the in-memory checkpoint list for the block that could contain a
//! keyword, then linear-scans that block's front-coded records. Grounded on
//! `original_source/neo/dict/dict_reader.cpp` (`CSphDictReader::UnzipWord`, the
//! checkpoint-then-scan lookup shape) and the teacher's `src/mmap/mmap_file.rs` for the
//! read-only mmap wrapper convention.

use std::path::Path;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::WordId;
use crate::dict::finalizer::Checkpoint;
use crate::io::reader::MappedFile;
use crate::io::vlb;

pub struct DictEntry {
    pub word_id: WordId,
    pub doclist_offset: u64,
    pub doc_count: u32,
    pub hit_count: u32,
    /// Present only for `doc_count > SKIPLIST_BLOCK` (§3.2).
    pub skiplist_offset: Option<u32>,
    /// Present only for `doc_count >= 256` (§3.2).
    pub hint: Option<u8>,
}

pub struct DictReader {
    mapped: MappedFile,
    checkpoints: Vec<Checkpoint>,
    /// End of the dictionary section, so the block scan never wanders into the infix or
    /// exceptions sections that may follow it in the same file.
    dict_len: usize,
}

impl DictReader {
    pub fn open(path: impl AsRef<Path>, checkpoints: Vec<Checkpoint>, dict_len: u64) -> Result<Self> {
        Ok(DictReader { mapped: MappedFile::open(path)?, checkpoints, dict_len: dict_len as usize })
    }

    /// Finds the checkpoint whose keyword is `<= keyword`, i.e. the block to scan.
    fn checkpoint_for(&self, keyword: &[u8]) -> Option<&Checkpoint> {
        match self.checkpoints.binary_search_by(|c| c.keyword.as_slice().cmp(keyword)) {
            Ok(i) => Some(&self.checkpoints[i]),
            Err(0) => None,
            Err(i) => Some(&self.checkpoints[i - 1]),
        }
    }

    pub fn lookup(&self, keyword: &[u8]) -> Result<Option<DictEntry>> {
        let checkpoint = match self.checkpoint_for(keyword) {
            Some(c) => c,
            None => return Ok(None),
        };
        let data = &self.mapped.data()[..self.dict_len];
        let mut pos = checkpoint.blob_offset as usize;
        let mut current = Vec::new();

        while pos < data.len() {
            let (shared, n1) = vlb::decode_u32(&data[pos..]);
            pos += n1;
            let (suffix, n2) = vlb::decode_keyword(&data[pos..]);
            pos += n2;
            current.truncate(shared as usize);
            current.extend_from_slice(suffix);

            let (word_id, n3) = vlb::decode_u64(&data[pos..]);
            pos += n3;
            let (doclist_offset, n4) = vlb::decode_u64(&data[pos..]);
            pos += n4;
            let (doc_count, n5) = vlb::decode_u32(&data[pos..]);
            pos += n5;
            let (hit_count, n6) = vlb::decode_u32(&data[pos..]);
            pos += n6;
            let skiplist_offset = if data[pos] == 1 {
                pos += 1;
                let (off, n) = vlb::decode_u32(&data[pos..]);
                pos += n;
                Some(off)
            } else {
                pos += 1;
                None
            };
            let hint = if data[pos] == 1 {
                pos += 1;
                let h = data[pos];
                pos += 1;
                Some(h)
            } else {
                pos += 1;
                None
            };

            match current.as_slice().cmp(keyword) {
                std::cmp::Ordering::Equal => {
                    return Ok(Some(DictEntry {
                        word_id: WordId(word_id),
                        doclist_offset,
                        doc_count,
                        hit_count,
                        skiplist_offset,
                        hint,
                    }))
                }
                std::cmp::Ordering::Greater => return Ok(None),
                std::cmp::Ordering::Less => continue,
            }
        }
        Err(Error::new(ErrorKind::CorruptFormat, "dictionary block scan ran past end of blob without reaching keyword"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::WordId as Wid;
    use crate::dict::finalizer::merge;
    use crate::dict::scratch::{ScratchEntry, ScratchReader, ScratchWriter};

    #[test]
    fn lookup_roundtrips_through_finalizer() {
        let dir = tempfile::tempdir().unwrap();
        let scratch_path = dir.path().join("r.scratch");
        let mut w = ScratchWriter::create(&scratch_path).unwrap();
        let words = ["alpha", "beta", "gamma", "delta"];
        let mut sorted = words.to_vec();
        sorted.sort();
        for (i, kw) in sorted.iter().enumerate() {
            w.write_entry(&ScratchEntry {
                keyword: kw.as_bytes().to_vec(),
                word_id: Wid(i as u64),
                doclist_offset: i as u64 * 7,
                doc_count: 3,
                hit_count: 9,
                skiplist_offset: None,
                hint: None,
            })
            .unwrap();
        }
        w.finish().unwrap();

        let blob_path = dir.path().join("r.dict");
        let finalized = merge(vec![ScratchReader::open(&scratch_path).unwrap()], &blob_path, false, None).unwrap();

        let reader = DictReader::open(&blob_path, finalized.checkpoints, finalized.dict_len).unwrap();
        let entry = reader.lookup(b"gamma").unwrap().unwrap();
        assert_eq!(entry.doc_count, 3);
        assert!(entry.skiplist_offset.is_none());
        assert!(reader.lookup(b"missing").unwrap().is_none());
    }

    #[test]
    fn lookup_decodes_skiplist_offset_and_hint_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let scratch_path = dir.path().join("r.scratch");
        let mut w = ScratchWriter::create(&scratch_path).unwrap();
        w.write_entry(&ScratchEntry {
            keyword: b"huge".to_vec(),
            word_id: Wid(1),
            doclist_offset: 500,
            doc_count: 400,
            hit_count: 4000,
            skiplist_offset: Some(8192),
            hint: Some(42),
        })
        .unwrap();
        w.finish().unwrap();

        let blob_path = dir.path().join("r.dict");
        let finalized = merge(vec![ScratchReader::open(&scratch_path).unwrap()], &blob_path, false, None).unwrap();
        let reader = DictReader::open(&blob_path, finalized.checkpoints, finalized.dict_len).unwrap();
        let entry = reader.lookup(b"huge").unwrap().unwrap();
        assert_eq!(entry.skiplist_offset, Some(8192));
        assert_eq!(entry.hint, Some(42));
    }

    #[test]
    fn lookup_ignores_infix_section_appended_after_dict() {
        let dir = tempfile::tempdir().unwrap();
        let scratch_path = dir.path().join("r.scratch");
        let mut w = ScratchWriter::create(&scratch_path).unwrap();
        w.write_entry(&ScratchEntry {
            keyword: b"alpha".to_vec(),
            word_id: Wid(0),
            doclist_offset: 0,
            doc_count: 1,
            hit_count: 1,
            skiplist_offset: None,
            hint: None,
        })
        .unwrap();
        w.finish().unwrap();

        let blob_path = dir.path().join("r.dict");
        let finalized = merge(vec![ScratchReader::open(&scratch_path).unwrap()], &blob_path, true, None).unwrap();
        assert!(finalized.dict_len < std::fs::metadata(&blob_path).unwrap().len());

        let reader = DictReader::open(&blob_path, finalized.checkpoints, finalized.dict_len).unwrap();
        assert!(reader.lookup(b"alpha").unwrap().is_some());
    }
}
