//! Scratch block reader/writer used by the dictionary finalizer's external merge.
//! Grounded on `original_source/neo/source/bin.cpp` (`CSphBin`): a chunk of
//! `(keyword, word_id, doclist_offset, doc_count, hit_count, skiplist_offset, hint)`
//! tuples, sorted by keyword, spilled to a temp file and read back block by block so the
//! finalizer's memory use is bounded by the number of concurrently open scratch runs
//! rather than total keyword count. Reads and writes are routed through the same
//! throttled `StickyWriter`/`FileReader` every other on-disk path in this crate uses
//! (§5, §11), rather than a raw `BufReader`/`BufWriter`.

use std::path::{Path, PathBuf};

use crate::core::error::Result;
use crate::core::types::WordId;
use crate::io::reader::FileReader;
use crate::io::throttle::{Throttle, ThrottleConfig};
use crate::io::writer::StickyWriter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchEntry {
    pub keyword: Vec<u8>,
    pub word_id: WordId,
    pub doclist_offset: u64,
    pub doc_count: u32,
    pub hit_count: u32,
    /// Byte offset into the skiplist file, present only for `doc_count > SKIPLIST_BLOCK`
    /// (§3.2).
    pub skiplist_offset: Option<u32>,
    /// Doclist prefetch length-hint, present only for `doc_count >= 256` (§3.2).
    pub hint: Option<u8>,
}

/// Buffered sequential writer for one sorted run.
pub struct ScratchWriter {
    inner: StickyWriter,
}

impl ScratchWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(ScratchWriter { inner: StickyWriter::create(path, Throttle::new(ThrottleConfig::default()))? })
    }

    pub fn write_entry(&mut self, e: &ScratchEntry) -> Result<()> {
        self.inner.write_keyword(&e.keyword);
        self.inner.write_vlb(e.word_id.0);
        self.inner.write_vlb(e.doclist_offset);
        self.inner.write_zint(e.doc_count);
        self.inner.write_zint(e.hit_count);
        match e.skiplist_offset {
            Some(off) => {
                self.inner.write_bytes(&[1]);
                self.inner.write_zint(off);
            }
            None => self.inner.write_bytes(&[0]),
        }
        match e.hint {
            Some(h) => self.inner.write_bytes(&[1, h]),
            None => self.inner.write_bytes(&[0]),
        }
        self.inner.check()
    }

    pub fn finish(self) -> Result<()> {
        self.inner.finish()
    }
}

/// Buffered sequential reader for one sorted run, entry-at-a-time, exposed to the
/// finalizer's merge heap.
pub struct ScratchReader {
    inner: FileReader,
    path: PathBuf,
    exhausted: bool,
}

impl ScratchReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = FileReader::open(&path, Throttle::new(ThrottleConfig::default()))?;
        Ok(ScratchReader { inner, path, exhausted: false })
    }

    /// Reads the next entry, or `None` once the run is exhausted.
    pub fn next_entry(&mut self) -> Result<Option<ScratchEntry>> {
        if self.exhausted {
            return Ok(None);
        }
        let len = match self.inner.try_read_u8()? {
            Some(b) => b as usize,
            None => {
                self.exhausted = true;
                return Ok(None);
            }
        };
        let mut keyword = vec![0u8; len];
        self.inner.read_exact(&mut keyword)?;
        let word_id = self.inner.read_vlb()?;
        let doclist_offset = self.inner.read_vlb()?;
        let doc_count = self.inner.read_zint()?;
        let hit_count = self.inner.read_zint()?;
        let skiplist_offset = if self.inner.read_u8()? == 1 { Some(self.inner.read_zint()?) } else { None };
        let hint = if self.inner.read_u8()? == 1 { Some(self.inner.read_u8()?) } else { None };
        Ok(Some(ScratchEntry {
            keyword,
            word_id: WordId(word_id),
            doclist_offset,
            doc_count,
            hit_count,
            skiplist_offset,
            hint,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_single_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run0.scratch");
        let entries = vec![
            ScratchEntry {
                keyword: b"alpha".to_vec(),
                word_id: WordId(10),
                doclist_offset: 0,
                doc_count: 2,
                hit_count: 5,
                skiplist_offset: None,
                hint: None,
            },
            ScratchEntry {
                keyword: b"beta".to_vec(),
                word_id: WordId(11),
                doclist_offset: 20,
                doc_count: 300,
                hit_count: 900,
                skiplist_offset: Some(4096),
                hint: Some(12),
            },
        ];
        let mut w = ScratchWriter::create(&path).unwrap();
        for e in &entries {
            w.write_entry(e).unwrap();
        }
        w.finish().unwrap();

        let mut r = ScratchReader::open(&path).unwrap();
        let mut read_back = Vec::new();
        while let Some(e) = r.next_entry().unwrap() {
            read_back.push(e);
        }
        assert_eq!(read_back, entries);
        assert!(r.next_entry().unwrap().is_none());
    }
}
