//! Index builder — accumulates files, their folded content and positional
//! postings.

use ahash::AHashMap;
use globset::GlobSet;
use tracing::debug;

use super::error::{NgramError, Result};
use super::extract::{is_binary, ngrams};
use super::index::IndexData;
use super::key::NgramKey;
use super::writer::write_index;
use crate::case::{split_case, CaseBits};
use crate::config::IndexConfig;
use crate::storage::ContentProvider;

/// A file as recorded at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    /// Start of this file's folded bytes in the content blob.
    pub content_offset: u32,
    pub content_length: u32,
    pub case_bits: CaseBits,
}

impl FileEntry {
    pub fn end(&self) -> u32 {
        self.content_offset + self.content_length
    }
}

/// Builder for a single shard.
///
/// Files must be added in their final order: postings are appended as files
/// arrive, which keeps every list sorted without a later pass.
#[derive(Debug)]
pub struct IndexBuilder {
    config: IndexConfig,
    exclude: Option<GlobSet>,
    /// Folded content of every file, concatenated.
    content: Vec<u8>,
    files: Vec<FileEntry>,
    /// Ngram → absolute offsets into `content`.
    postings: AHashMap<NgramKey, Vec<u32>>,
    /// Raw file names, concatenated.
    names: Vec<u8>,
    /// Ngram of the folded name → absolute offsets into `names`.
    name_postings: AHashMap<NgramKey, Vec<u32>>,
}

impl IndexBuilder {
    /// Create a new empty builder that indexes every file it is given.
    pub fn new() -> Self {
        Self::from_parts(IndexConfig::default(), None)
    }

    /// Create a builder with an explicit config. Fails on bad exclude globs.
    pub fn with_config(config: IndexConfig) -> Result<Self> {
        let exclude = config.exclude_set()?;
        Ok(Self::from_parts(config, exclude))
    }

    fn from_parts(config: IndexConfig, exclude: Option<GlobSet>) -> Self {
        IndexBuilder {
            postings: AHashMap::with_capacity(config.ngram_capacity),
            name_postings: AHashMap::new(),
            config,
            exclude,
            content: Vec::new(),
            files: Vec::new(),
            names: Vec::new(),
        }
    }

    /// Add a file to the index.
    ///
    /// Returns the file index assigned, or `None` when the config says the
    /// file should not be indexed. An empty file is still registered.
    pub fn add_file(&mut self, name: &str, content: &[u8]) -> Result<Option<u32>> {
        if content.len() > self.config.max_file_size {
            debug!(file = name, size = content.len(), "skipping oversized file");
            return Ok(None);
        }
        if self.config.skip_binary && is_binary(content, self.config.binary_null_ratio) {
            debug!(file = name, "skipping binary file");
            return Ok(None);
        }
        if self.exclude.as_ref().is_some_and(|set| set.is_match(name)) {
            debug!(file = name, "skipping excluded file");
            return Ok(None);
        }

        let file_index = u32::try_from(self.files.len())
            .map_err(|_| NgramError::CapacityExceeded("more than u32::MAX files".into()))?;
        let content_offset = checked_end(self.content.len(), content.len(), "content")?;
        let name_offset = checked_end(self.names.len(), name.len(), "file names")?;

        let (folded, case_bits) = split_case(content);
        for (i, key) in ngrams(&folded) {
            self.postings
                .entry(key)
                .or_default()
                .push(content_offset + i as u32);
        }
        self.content.extend_from_slice(&folded);

        if self.config.index_file_names {
            let folded_name = name.as_bytes().to_ascii_lowercase();
            for (i, key) in ngrams(&folded_name) {
                self.name_postings
                    .entry(key)
                    .or_default()
                    .push(name_offset + i as u32);
            }
        }
        self.names.extend_from_slice(name.as_bytes());

        self.files.push(FileEntry {
            name: name.to_string(),
            content_offset,
            content_length: content.len() as u32,
            case_bits,
        });
        Ok(Some(file_index))
    }

    /// Add everything a provider lists, in order. Returns how many files were
    /// indexed (skipped files are not counted).
    pub fn add_from<P: ContentProvider + ?Sized>(&mut self, provider: &P) -> Result<usize> {
        let mut added = 0;
        for (name, content) in provider.list_files()? {
            if self.add_file(&name, &content)?.is_some() {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Seal the shard: serialize it and reopen the bytes for querying.
    pub fn finalize(self) -> Result<IndexData<Vec<u8>>> {
        let bytes = write_index(&self)?;
        IndexData::open(bytes)
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Number of files in the index.
    pub fn file_count(&self) -> u32 {
        self.files.len() as u32
    }

    /// Number of distinct content ngrams.
    pub fn ngram_count(&self) -> u32 {
        self.postings.len() as u32
    }

    /// Number of distinct file-name ngrams.
    pub fn name_ngram_count(&self) -> u32 {
        self.name_postings.len() as u32
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// The folded content blob.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// The concatenated raw file names.
    pub fn names(&self) -> &[u8] {
        &self.names
    }

    pub fn posting_list(&self, key: NgramKey) -> Option<&[u32]> {
        self.postings.get(&key).map(Vec::as_slice)
    }

    pub fn name_posting_list(&self, key: NgramKey) -> Option<&[u32]> {
        self.name_postings.get(&key).map(Vec::as_slice)
    }

    /// Content postings sorted by key, for serialization.
    pub fn sorted_postings(&self) -> Vec<(NgramKey, &[u32])> {
        sorted(&self.postings)
    }

    /// Name postings sorted by key, for serialization.
    pub fn sorted_name_postings(&self) -> Vec<(NgramKey, &[u32])> {
        sorted(&self.name_postings)
    }
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted(map: &AHashMap<NgramKey, Vec<u32>>) -> Vec<(NgramKey, &[u32])> {
    let mut entries: Vec<(NgramKey, &[u32])> =
        map.iter().map(|(k, v)| (*k, v.as_slice())).collect();
    entries.sort_unstable_by_key(|(key, _)| *key);
    entries
}

/// Current length as a u32 offset, provided `extra` more bytes still fit.
fn checked_end(current: usize, extra: usize, what: &str) -> Result<u32> {
    current
        .checked_add(extra)
        .filter(|&end| end <= u32::MAX as usize)
        .map(|_| current as u32)
        .ok_or_else(|| {
            NgramError::CapacityExceeded(format!(
                "{} would exceed 4 GiB ({} + {} bytes)",
                what, current, extra
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &[u8; 3]) -> NgramKey {
        NgramKey::from_bytes(*s)
    }

    #[test]
    fn test_build_empty_index() {
        let builder = IndexBuilder::new();
        assert_eq!(builder.file_count(), 0);
        assert_eq!(builder.ngram_count(), 0);
        assert!(builder.content().is_empty());
    }

    #[test]
    fn offsets_are_absolute_across_files() {
        let mut builder = IndexBuilder::new();
        assert_eq!(builder.add_file("a.txt", b"abcdefg").unwrap(), Some(0));
        assert_eq!(builder.add_file("b.txt", b"xxabcyy").unwrap(), Some(1));
        assert_eq!(builder.posting_list(key(b"abc")).unwrap(), &[0, 9]);
        assert_eq!(builder.files()[1].content_offset, 7);
        assert_eq!(builder.files()[1].end(), 14);
    }

    #[test]
    fn content_is_folded_and_postings_case_insensitive() {
        let mut builder = IndexBuilder::new();
        builder.add_file("n.txt", b"Needle").unwrap();
        assert_eq!(builder.content(), b"needle");
        assert_eq!(builder.posting_list(key(b"nee")).unwrap(), &[0]);
        assert!(builder.posting_list(key(b"Nee")).is_none());
        assert!(builder.files()[0].case_bits.is_upper(0));
        assert!(!builder.files()[0].case_bits.is_upper(1));
    }

    #[test]
    fn repeated_ngram_keeps_every_position() {
        let mut builder = IndexBuilder::new();
        builder.add_file("a.txt", b"aaaaaaaaaa").unwrap();
        assert_eq!(
            builder.posting_list(key(b"aaa")).unwrap(),
            &[0, 1, 2, 3, 4, 5, 6, 7]
        );
    }

    #[test]
    fn ngrams_do_not_straddle_files() {
        let mut builder = IndexBuilder::new();
        builder.add_file("a.txt", b"xab").unwrap();
        builder.add_file("b.txt", b"cyz").unwrap();
        assert!(builder.posting_list(key(b"abc")).is_none());
        assert!(builder.posting_list(key(b"bcy")).is_none());
    }

    #[test]
    fn test_build_empty_file() {
        let mut builder = IndexBuilder::new();
        assert_eq!(builder.add_file("empty.txt", b"").unwrap(), Some(0));
        assert_eq!(builder.file_count(), 1);
        assert_eq!(builder.ngram_count(), 0);
        assert_eq!(builder.files()[0].content_length, 0);
    }

    #[test]
    fn test_build_binary_file_skipped() {
        let mut builder = IndexBuilder::with_config(IndexConfig::filtered()).unwrap();
        let mut content = vec![0u8; 100];
        content.extend_from_slice(b"some text");
        assert_eq!(builder.add_file("binary.bin", &content).unwrap(), None);
        assert_eq!(builder.file_count(), 0);
    }

    #[test]
    fn default_builder_keeps_binary_files() {
        let mut builder = IndexBuilder::new();
        assert_eq!(builder.add_file("blob.bin", &[0u8; 16]).unwrap(), Some(0));
        assert_eq!(builder.add_file("a.bin", b"\0\0abc").unwrap(), Some(1));
        assert_eq!(builder.add_file("b.txt", b"xxabc").unwrap(), Some(2));
        assert_eq!(builder.posting_list(key(b"abc")).unwrap(), &[18, 23]);
    }

    #[test]
    fn oversized_and_excluded_skipped() {
        let config = IndexConfig {
            max_file_size: 4,
            exclude: vec!["*.lock".to_string()],
            ..IndexConfig::default()
        };
        let mut builder = IndexBuilder::with_config(config).unwrap();
        assert_eq!(builder.add_file("big.txt", b"12345").unwrap(), None);
        assert_eq!(builder.add_file("Cargo.lock", b"abc").unwrap(), None);
        assert_eq!(builder.add_file("ok.txt", b"abc").unwrap(), Some(0));
    }

    #[test]
    fn name_postings_are_folded() {
        let mut builder = IndexBuilder::new();
        builder.add_file("README.md", b"").unwrap();
        builder.add_file("src/main.rs", b"").unwrap();
        assert_eq!(builder.name_posting_list(key(b"rea")).unwrap(), &[0]);
        assert_eq!(builder.name_posting_list(key(b"mai")).unwrap(), &[13]);
        assert_eq!(builder.names(), b"README.mdsrc/main.rs");
    }

    #[test]
    fn file_names_not_indexed_when_disabled() {
        let config = IndexConfig {
            index_file_names: false,
            ..IndexConfig::default()
        };
        let mut builder = IndexBuilder::with_config(config).unwrap();
        builder.add_file("README.md", b"hello").unwrap();
        assert_eq!(builder.name_ngram_count(), 0);
        assert_eq!(builder.names(), b"README.md");
    }

    #[test]
    fn add_from_provider() {
        let files: Vec<(String, Vec<u8>)> = vec![
            ("a.txt".into(), b"alpha".to_vec()),
            ("b.bin".into(), vec![0u8; 32]),
            ("c.txt".into(), b"gamma".to_vec()),
        ];
        let mut builder = IndexBuilder::new();
        assert_eq!(builder.add_from(&files).unwrap(), 3);
        assert_eq!(builder.files()[2].name, "c.txt");

        let mut filtered = IndexBuilder::with_config(IndexConfig::filtered()).unwrap();
        assert_eq!(filtered.add_from(&files).unwrap(), 2);
        assert_eq!(filtered.files()[1].name, "c.txt");
    }

    #[test]
    fn test_sorted_posting_lists() {
        let mut builder = IndexBuilder::new();
        builder.add_file("a.txt", b"hello world").unwrap();
        let sorted = builder.sorted_postings();
        for pair in sorted.windows(2) {
            assert!(pair[0].0 < pair[1].0);
        }
        assert_eq!(sorted.len() as u32, builder.ngram_count());
    }

    #[test]
    fn capacity_check() {
        assert_eq!(checked_end(10, 5, "content").unwrap(), 10);
        assert!(checked_end(u32::MAX as usize, 1, "content").is_err());
        assert_eq!(checked_end(u32::MAX as usize - 1, 1, "content").unwrap(), u32::MAX - 1);
    }
}
