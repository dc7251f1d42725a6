//! On-disk file-set layout (§6). One index "version" is a family of files sharing a
//! base name and a set of fixed extensions — `sph` (header/schema), `spa` (row
//! attributes), `spi` (dictionary + checkpoints + infix blob + trie), `spd` (doclist),
//! `spp` (hitlist), `spm` (MVA row payloads), `spk` (kill list), `sps` (string
//! attributes), `spe` (skiplist), `mvp` (MVA pointer checkpoint). A build writes the
//! `new.*` family; [`StorageLayout::rotate`] atomically promotes it to `cur.*`, demoting
//! the previous `cur.*` to `old.*` by rename, mirroring `original_source/neo/index/...`'s
//! rename-based rotation (never an in-place overwrite, so a crash mid-rotation still
//! leaves a loadable `cur.*` or `old.*` set).

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::Result;

/// Every file extension that makes up one index version, in the order they're produced.
pub const EXTENSIONS: &[&str] = &["sph", "spa", "spi", "spd", "spp", "spm", "spk", "sps", "spe", "mvp"];

/// Four-byte header magic, `"SPHX"` little-endian (§6).
pub const HEADER_MAGIC: u32 = 0x5848_5053;
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    New,
    Cur,
    Old,
}

impl Lifecycle {
    fn prefix(self) -> &'static str {
        match self {
            Lifecycle::New => "new",
            Lifecycle::Cur => "cur",
            Lifecycle::Old => "old",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf,
    pub index_name: String,
}

impl StorageLayout {
    pub fn new(base_dir: PathBuf, index_name: impl Into<String>) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(StorageLayout { base_dir, index_name: index_name.into() })
    }

    pub fn path_for(&self, lifecycle: Lifecycle, ext: &str) -> PathBuf {
        self.base_dir.join(format!("{}.{}.{}", self.index_name, lifecycle.prefix(), ext))
    }

    /// Every path in a lifecycle's file set, in [`EXTENSIONS`] order.
    pub fn file_set(&self, lifecycle: Lifecycle) -> Vec<PathBuf> {
        EXTENSIONS.iter().map(|ext| self.path_for(lifecycle, ext)).collect()
    }

    /// Promotes `new.*` to `cur.*`, demoting the previous `cur.*` to `old.*` first.
    /// Renames only touch extensions that actually exist in the `new.*` set, so a
    /// partial build (e.g. no MVA payloads) doesn't fail rotation.
    pub fn rotate(&self) -> Result<()> {
        for ext in EXTENSIONS {
            let new_path = self.path_for(Lifecycle::New, ext);
            if !new_path.exists() {
                continue;
            }
            let cur_path = self.path_for(Lifecycle::Cur, ext);
            if cur_path.exists() {
                let old_path = self.path_for(Lifecycle::Old, ext);
                fs::rename(&cur_path, &old_path)?;
            }
            fs::rename(&new_path, &cur_path)?;
        }
        Ok(())
    }

    /// Deletes a stale `new.*` set left behind by a pass that failed mid-write (§6
    /// "leaves only new.* files" recovery policy).
    pub fn discard_new(&self) -> Result<()> {
        for ext in EXTENSIONS {
            let path = self.path_for(Lifecycle::New, ext);
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    pub fn discard_old(&self) -> Result<()> {
        for ext in EXTENSIONS {
            let path = self.path_for(Lifecycle::Old, ext);
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

/// Header magic check shared by every reader that opens a file in the set. Endianness is
/// detected from the raw byte order of the magic: the little-endian reading is the
/// expected one, and its byte-swap is the only other value accepted (as a definite
/// mis-endian file, rejected with a dedicated error rather than silently byte-swapping
/// the rest of the file).
pub fn check_header_magic(path: impl AsRef<Path>, raw: u32) -> Result<()> {
    use crate::core::error::Error;

    if raw == HEADER_MAGIC {
        return Ok(());
    }
    if raw == HEADER_MAGIC.swap_bytes() {
        return Err(Error::corrupt(path, "file was written on a different-endian host"));
    }
    Err(Error::corrupt(path, format!("bad header magic 0x{raw:08x}")))
}

pub fn check_format_version(path: impl AsRef<Path>, version: u32) -> Result<()> {
    use crate::core::error::Error;
    if version > FORMAT_VERSION {
        return Err(Error::corrupt(path, format!("format version {version} is newer than supported {FORMAT_VERSION}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_promotes_new_to_cur_and_cur_to_old() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().to_path_buf(), "idx0").unwrap();

        fs::write(layout.path_for(Lifecycle::New, "sph"), b"v1").unwrap();
        layout.rotate().unwrap();
        assert!(layout.path_for(Lifecycle::Cur, "sph").exists());
        assert!(!layout.path_for(Lifecycle::New, "sph").exists());

        fs::write(layout.path_for(Lifecycle::New, "sph"), b"v2").unwrap();
        layout.rotate().unwrap();
        assert!(layout.path_for(Lifecycle::Cur, "sph").exists());
        assert!(layout.path_for(Lifecycle::Old, "sph").exists());
        assert_eq!(fs::read(layout.path_for(Lifecycle::Old, "sph")).unwrap(), b"v1");
        assert_eq!(fs::read(layout.path_for(Lifecycle::Cur, "sph")).unwrap(), b"v2");
    }

    #[test]
    fn rotate_skips_extensions_absent_from_new_set() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().to_path_buf(), "idx0").unwrap();
        fs::write(layout.path_for(Lifecycle::New, "sph"), b"only this one").unwrap();
        layout.rotate().unwrap();
        assert!(!layout.path_for(Lifecycle::Cur, "spm").exists());
    }

    #[test]
    fn header_magic_detects_mis_endian_file() {
        assert!(check_header_magic("x", HEADER_MAGIC).is_ok());
        assert!(check_header_magic("x", HEADER_MAGIC.swap_bytes()).is_err());
        assert!(check_header_magic("x", 0xdead_beef).is_err());
    }
}
