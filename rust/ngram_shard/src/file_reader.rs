//! Lazy shard storage: sections are read from the file on demand.

use std::borrow::Cow;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use ngram_core::ngram::format::HEADER_SIZE;
use ngram_core::{IndexData, NgramError, Result, SectionReader};
#[cfg(not(unix))]
use parking_lot::Mutex;

/// Positional reader over a shard file.
///
/// Only the tables `IndexData::open` loads stay in memory; postings,
/// content and case bits are read per query. On unix every read is a
/// `pread` on the shared handle, so concurrent queries never wait on each
/// other. Elsewhere the handle's cursor is guarded by a lock.
#[derive(Debug)]
pub struct FileSectionReader {
    path: PathBuf,
    #[cfg(unix)]
    file: File,
    #[cfg(not(unix))]
    file: Mutex<File>,
    len: u64,
}

impl FileSectionReader {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(NgramError::IndexNotFound(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        if len < HEADER_SIZE as u64 {
            return Err(NgramError::CorruptIndex {
                reason: format!("{} is too small for a shard header", path.display()),
            });
        }
        Ok(FileSectionReader {
            path: path.to_path_buf(),
            #[cfg(unix)]
            file,
            #[cfg(not(unix))]
            file: Mutex::new(file),
            len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(unix)]
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        use std::os::unix::fs::FileExt;
        self.file.read_exact_at(buf, offset)
    }

    #[cfg(not(unix))]
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        use std::io::{Read, Seek, SeekFrom};
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)
    }
}

impl SectionReader for FileSectionReader {
    fn read_section(&self, offset: u64, length: usize) -> Result<Cow<'_, [u8]>> {
        match offset.checked_add(length as u64) {
            Some(end) if end <= self.len => {}
            _ => {
                return Err(NgramError::SectionOutOfBounds {
                    offset,
                    length: length as u64,
                    available: self.len,
                })
            }
        }
        let mut buf = vec![0u8; length];
        if length > 0 {
            self.read_exact_at(&mut buf, offset)?;
        }
        Ok(Cow::Owned(buf))
    }

    fn len(&self) -> u64 {
        self.len
    }
}

/// Open a shard whose sections are read lazily from disk.
pub fn open_lazy(path: &Path) -> Result<IndexData<FileSectionReader>> {
    IndexData::open(FileSectionReader::open(path)?)
}
