//! Seams to the outside world: where shard bytes come from at query time and
//! where file contents come from at build time.

use std::borrow::Cow;
use std::sync::Arc;

use crate::ngram::error::{NgramError, Result};

/// Random-access reader over persisted shard bytes.
///
/// Reads may block. The core never retries; failures propagate unchanged to
/// the caller of `search`.
pub trait SectionReader {
    /// Return `length` bytes starting at absolute byte `offset`.
    fn read_section(&self, offset: u64, length: usize) -> Result<Cow<'_, [u8]>>;

    /// Total number of bytes available.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounds-checked borrow of `data[offset..offset + length]`.
pub fn slice_section(data: &[u8], offset: u64, length: usize) -> Result<&[u8]> {
    let available = data.len() as u64;
    let end = offset.checked_add(length as u64);
    match end {
        Some(end) if end <= available => {
            let start = offset as usize;
            Ok(&data[start..start + length])
        }
        _ => Err(NgramError::SectionOutOfBounds {
            offset,
            length: length as u64,
            available,
        }),
    }
}

impl SectionReader for [u8] {
    fn read_section(&self, offset: u64, length: usize) -> Result<Cow<'_, [u8]>> {
        slice_section(self, offset, length).map(Cow::Borrowed)
    }

    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }
}

impl SectionReader for Vec<u8> {
    fn read_section(&self, offset: u64, length: usize) -> Result<Cow<'_, [u8]>> {
        slice_section(self, offset, length).map(Cow::Borrowed)
    }

    fn len(&self) -> u64 {
        Vec::len(self) as u64
    }
}

impl<R: SectionReader + ?Sized> SectionReader for &R {
    fn read_section(&self, offset: u64, length: usize) -> Result<Cow<'_, [u8]>> {
        (**self).read_section(offset, length)
    }

    fn len(&self) -> u64 {
        (**self).len()
    }
}

impl<R: SectionReader + ?Sized> SectionReader for Arc<R> {
    fn read_section(&self, offset: u64, length: usize) -> Result<Cow<'_, [u8]>> {
        (**self).read_section(offset, length)
    }

    fn len(&self) -> u64 {
        (**self).len()
    }
}

/// Source of `(name, raw content)` pairs for index construction.
///
/// Files are indexed in the order returned; that order becomes the file index.
pub trait ContentProvider {
    fn list_files(&self) -> Result<Vec<(String, Vec<u8>)>>;
}

impl ContentProvider for Vec<(String, Vec<u8>)> {
    fn list_files(&self) -> Result<Vec<(String, Vec<u8>)>> {
        Ok(self.clone())
    }
}

impl ContentProvider for [(&str, &[u8])] {
    fn list_files(&self) -> Result<Vec<(String, Vec<u8>)>> {
        Ok(self
            .iter()
            .map(|(name, content)| (name.to_string(), content.to_vec()))
            .collect())
    }
}
