//! Buffered sticky-error file writer (component B). Grounded on `CSphWriter` in
//! `original_source/neo/io/writer.cpp` (pooled buffer flushed through the throttle) and
//! on the teacher's `src/storage/segment_writer.rs` for the Rust buffered-write +
//! header-rewrite-on-close + CRC32 idiom.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::core::error::{Error, ErrorKind, Result};
use crate::io::crc32::crc32_update;
use crate::io::throttle::Throttle;
use crate::io::vlb;

pub struct StickyWriter {
    inner: BufWriter<File>,
    throttle: Throttle,
    pos: u64,
    crc_state: u32,
    error: Option<Error>,
}

impl StickyWriter {
    pub fn create(path: impl AsRef<Path>, throttle: Throttle) -> Result<Self> {
        let file = File::create(path)?;
        Ok(StickyWriter {
            inner: BufWriter::new(file),
            throttle,
            pos: 0,
            crc_state: 0xffff_ffff,
            error: None,
        })
    }

    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Writer errors are sticky (§7): once set, every further write is a silent no-op
    /// that preserves the first error.
    fn fail(&mut self, err: Error) {
        if self.error.is_none() {
            log::error!("{}", err);
            self.error = Some(err);
        }
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.throttle.write_all(&mut self.inner, data) {
            self.fail(e.into());
            return;
        }
        self.crc_state = crc32_update(self.crc_state, data);
        self.pos += data.len() as u64;
    }

    pub fn write_zint(&mut self, value: u32) {
        let mut buf = Vec::with_capacity(5);
        vlb::encode_u32(value, &mut buf);
        self.write_bytes(&buf);
    }

    pub fn write_vlb(&mut self, value: u64) {
        let mut buf = Vec::with_capacity(10);
        vlb::encode_u64(value, &mut buf);
        self.write_bytes(&buf);
    }

    pub fn write_keyword(&mut self, keyword: &[u8]) {
        let mut buf = Vec::with_capacity(keyword.len() + 1);
        vlb::encode_keyword(keyword, &mut buf);
        self.write_bytes(&buf);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Seek back to `offset` and overwrite bytes, used for the header-rewrite-on-close
    /// pattern (final doc/hit counts and the checksum are only known after the body is
    /// written).
    pub fn patch_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        self.check()?;
        self.inner.flush()?;
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.write_all(data)?;
        self.inner.seek(SeekFrom::Start(self.pos))?;
        Ok(())
    }

    pub fn crc(&self) -> u32 {
        !self.crc_state
    }

    pub fn check(&self) -> Result<()> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    pub fn finish(mut self) -> Result<()> {
        self.check()?;
        self.inner.flush().map_err(|e| {
            Error::new(ErrorKind::IoError, e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sticky_error_suppresses_further_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.bin");
        let mut w = StickyWriter::create(&path, Throttle::new(Default::default())).unwrap();
        w.write_u32(1);
        assert!(w.check().is_ok());
        w.fail(Error::new(ErrorKind::IoError, "simulated"));
        let before = w.pos();
        w.write_u32(2);
        assert_eq!(w.pos(), before, "write after sticky error must be a no-op");
        assert!(w.check().is_err());
    }
}
