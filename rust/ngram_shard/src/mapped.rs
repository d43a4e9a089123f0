//! Memory-mapped shard storage.

use std::borrow::Cow;
use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use ngram_core::ngram::format::HEADER_SIZE;
use ngram_core::storage::slice_section;
use ngram_core::{IndexData, NgramError, Result, SectionReader};

/// Read-only mapping of a shard file.
///
/// Thread-safe: `Send + Sync` (read-only mmap). Every section read borrows
/// straight from the mapping.
#[derive(Debug)]
pub struct MappedShard {
    mmap: Mmap,
}

impl MappedShard {
    /// Map a shard file without validating its contents.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(NgramError::IndexNotFound(path.to_path_buf()));
        }

        let file = File::open(path)?;
        let metadata = file.metadata()?;
        if metadata.len() < HEADER_SIZE as u64 {
            return Err(NgramError::CorruptIndex {
                reason: format!("{} is too small for a shard header", path.display()),
            });
        }

        // SAFETY: Read-only mmap. Shards are written once via atomic rename
        // and never modified in place.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(MappedShard { mmap })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }
}

impl SectionReader for MappedShard {
    fn read_section(&self, offset: u64, length: usize) -> Result<Cow<'_, [u8]>> {
        slice_section(&self.mmap, offset, length).map(Cow::Borrowed)
    }

    fn len(&self) -> u64 {
        self.mmap.len() as u64
    }
}

/// Map and open a shard file.
pub fn open_mapped(path: &Path) -> Result<IndexData<MappedShard>> {
    IndexData::open(MappedShard::open(path)?)
}
