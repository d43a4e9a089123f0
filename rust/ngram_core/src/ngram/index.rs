//! Read side of a shard: validated metadata over a [`SectionReader`].
//!
//! Opening reads the header and the three small tables (files, content
//! ngrams, name ngrams) eagerly and checks their CRCs. Posting lists, content
//! windows, case bits and names stay in backing storage and are read on
//! demand by the search path.

use std::borrow::Cow;

use ahash::AHashMap;
use serde::Serialize;
use tracing::info;

use super::boundary::FileEnds;
use super::builder::FileEntry;
use super::error::{NgramError, Result};
use super::format::{
    verify_region_crc, FileRecord, IndexHeader, NgramRecord, Region, RegionKind, FILE_ENTRY_SIZE,
    HEADER_SIZE, NGRAM_ENTRY_SIZE, REGION_COUNT, REGION_CRC_SIZE, VERSION,
};
use super::key::NgramKey;
use super::posting::{decode_postings, Section};
use crate::case::{case_bits_len, CaseBits};
use crate::storage::SectionReader;

/// One searchable text (file contents or file names) with its ngram table.
#[derive(Debug)]
pub(crate) struct Corpus {
    ngrams: AHashMap<NgramKey, NgramRecord>,
    postings: Region,
    text: Region,
    ends: FileEnds,
}

impl Corpus {
    /// Posting count of `key`, zero when absent.
    pub(crate) fn frequency(&self, key: NgramKey) -> u32 {
        self.ngrams.get(&key).map_or(0, |r| r.count)
    }

    pub(crate) fn ends(&self) -> &FileEnds {
        &self.ends
    }

    /// Decode the posting list of `key` from storage.
    pub(crate) fn postings<R: SectionReader + ?Sized>(
        &self,
        reader: &R,
        key: NgramKey,
    ) -> Result<Vec<u32>> {
        let Some(record) = self.ngrams.get(&key) else {
            return Ok(Vec::new());
        };
        let (offset, length) = self.postings.locate(record.postings)?;
        let bytes = reader.read_section(offset, length)?;
        decode_postings(&bytes, record.count)
    }

    /// Read `length` bytes of text starting at corpus offset `offset`.
    pub(crate) fn window<'r, R: SectionReader + ?Sized>(
        &self,
        reader: &'r R,
        offset: u32,
        length: usize,
    ) -> Result<Cow<'r, [u8]>> {
        let (at, len) = self.text.locate_span(offset, length)?;
        reader.read_section(at, len)
    }

    fn sorted_keys(&self) -> Vec<NgramKey> {
        let mut keys: Vec<NgramKey> = self.ngrams.keys().copied().collect();
        keys.sort_unstable();
        keys
    }
}

/// Summary of an opened shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub file_count: u32,
    pub content_ngram_count: u32,
    pub name_ngram_count: u32,
    pub file_names_indexed: bool,
    pub content_bytes: u64,
    pub posting_bytes: u64,
    pub shard_bytes: u64,
}

/// An opened, read-only shard.
///
/// Immutable after `open`; `Send + Sync` whenever the reader is, so one
/// instance can serve concurrent searches.
#[derive(Debug)]
pub struct IndexData<R> {
    reader: R,
    header: IndexHeader,
    regions: [Region; REGION_COUNT],
    pub(crate) content: Corpus,
    pub(crate) names: Corpus,
    case_sections: Vec<Section>,
}

impl<R: SectionReader> IndexData<R> {
    /// Open and validate a shard.
    pub fn open(reader: R) -> Result<Self> {
        let total_len = reader.len();
        if total_len < HEADER_SIZE as u64 {
            return Err(NgramError::corrupt("shard too small for header"));
        }

        let header = IndexHeader::from_bytes(&reader.read_section(0, HEADER_SIZE)?)?;
        if header.version != VERSION {
            return Err(NgramError::VersionMismatch {
                expected: VERSION,
                found: header.version,
            });
        }
        let regions = header.regions(total_len)?;
        let region = |kind: RegionKind| regions[kind as usize];

        // File table.
        let table = read_checked(&reader, region(RegionKind::Files), RegionKind::Files)?;
        let records = parse_file_table(&table, header.file_count)?;
        drop(table);

        let content_ends = FileEnds::new(records.iter().map(|r| r.content_end).collect())?;
        let name_ends = FileEnds::new(records.iter().map(|r| r.name_end).collect())?;
        expect_total(&content_ends, region(RegionKind::Content), "content")?;
        expect_total(&name_ends, region(RegionKind::Names), "names")?;

        let case_region = region(RegionKind::CaseBits);
        let mut case_sections = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let length = content_ends.end(i) - content_ends.start(i);
            if record.case_bits.length as usize != case_bits_len(length as usize)
                || record.case_bits.end() > case_region.len
            {
                return Err(NgramError::corrupt(format!(
                    "file {} has case bits {}+{} for {} content bytes",
                    i, record.case_bits.offset, record.case_bits.length, length
                )));
            }
            case_sections.push(record.case_bits);
        }

        let content = load_corpus(
            &reader,
            &regions,
            RegionKind::ContentNgrams,
            RegionKind::ContentPostings,
            RegionKind::Content,
            header.content_ngram_count,
            content_ends,
        )?;
        let names = load_corpus(
            &reader,
            &regions,
            RegionKind::NameNgrams,
            RegionKind::NamePostings,
            RegionKind::Names,
            header.name_ngram_count,
            name_ends,
        )?;

        info!(
            files = header.file_count,
            ngrams = header.content_ngram_count,
            name_ngrams = header.name_ngram_count,
            shard_bytes = total_len,
            "opened ngram shard"
        );

        Ok(IndexData {
            reader,
            header,
            regions,
            content,
            names,
            case_sections,
        })
    }

    pub fn header(&self) -> &IndexHeader {
        &self.header
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Number of files in the shard.
    pub fn file_count(&self) -> u32 {
        self.header.file_count
    }

    pub fn ngram_count(&self) -> u32 {
        self.header.content_ngram_count
    }

    /// Whether the name ngram table was built.
    pub fn has_file_names(&self) -> bool {
        self.header.has_file_names()
    }

    /// Posting count of a content ngram, zero when absent.
    pub fn ngram_frequency(&self, key: NgramKey) -> u32 {
        self.content.frequency(key)
    }

    /// Decoded content postings for `key`; empty when absent.
    pub fn posting_list(&self, key: NgramKey) -> Result<Vec<u32>> {
        self.content.postings(&self.reader, key)
    }

    /// Decoded file-name postings for `key`; empty when absent.
    pub fn name_posting_list(&self, key: NgramKey) -> Result<Vec<u32>> {
        self.names.postings(&self.reader, key)
    }

    /// Raw name of file `index`.
    pub fn file_name(&self, index: u32) -> Result<String> {
        let file = self.check_file(index)?;
        let ends = self.names.ends();
        let start = ends.start(file);
        let len = (ends.end(file) - start) as usize;
        let bytes = self.names.window(&self.reader, start, len)?;
        String::from_utf8(bytes.into_owned())
            .map_err(|_| NgramError::corrupt(format!("file {} name is not UTF-8", index)))
    }

    /// Full entry for file `index`, including its case bits.
    pub fn file_entry(&self, index: u32) -> Result<FileEntry> {
        let file = self.check_file(index)?;
        let ends = self.content.ends();
        let content_offset = ends.start(file);
        Ok(FileEntry {
            name: self.file_name(index)?,
            content_offset,
            content_length: ends.end(file) - content_offset,
            case_bits: CaseBits::from_bytes(self.case_bits(file)?.into_owned()),
        })
    }

    /// Original-case content of file `index`.
    pub fn file_content(&self, index: u32) -> Result<Vec<u8>> {
        let file = self.check_file(index)?;
        let ends = self.content.ends();
        let start = ends.start(file);
        let folded = self
            .content
            .window(&self.reader, start, (ends.end(file) - start) as usize)?;
        let bits = CaseBits::from_bytes(self.case_bits(file)?.into_owned());
        Ok(crate::case::reconstruct_case(&folded, &bits))
    }

    pub fn stats(&self) -> IndexStats {
        let region = |kind: RegionKind| self.regions[kind as usize].len;
        IndexStats {
            file_count: self.header.file_count,
            content_ngram_count: self.header.content_ngram_count,
            name_ngram_count: self.header.name_ngram_count,
            file_names_indexed: self.header.has_file_names(),
            content_bytes: region(RegionKind::Content),
            posting_bytes: region(RegionKind::ContentPostings) + region(RegionKind::NamePostings),
            shard_bytes: self.reader.len(),
        }
    }

    /// Check every region's CRC and decode every posting list.
    ///
    /// `open` only checks what it loads; this walks the whole shard.
    pub fn verify_integrity(&self) -> Result<()> {
        for kind in RegionKind::ALL {
            read_checked(&self.reader, self.regions[kind as usize], kind)?;
        }
        for corpus in [&self.content, &self.names] {
            let total = corpus.ends().total();
            for key in corpus.sorted_keys() {
                let postings = corpus.postings(&self.reader, key)?;
                if let Some(&last) = postings.last() {
                    if last >= total {
                        return Err(NgramError::OffsetOutOfRange { offset: last, end: total });
                    }
                }
            }
        }
        Ok(())
    }

    /// Packed case bits of file `file`.
    pub(crate) fn case_bits(&self, file: usize) -> Result<Cow<'_, [u8]>> {
        let (offset, length) = self.regions[RegionKind::CaseBits as usize]
            .locate(self.case_sections[file])?;
        self.reader.read_section(offset, length)
    }

    fn check_file(&self, index: u32) -> Result<usize> {
        if index >= self.header.file_count {
            return Err(NgramError::FileOutOfRange {
                index,
                count: self.header.file_count,
            });
        }
        Ok(index as usize)
    }
}

/// Read a region's payload and trailing CRC, and check one against the other.
fn read_checked<R: SectionReader + ?Sized>(
    reader: &R,
    region: Region,
    kind: RegionKind,
) -> Result<Vec<u8>> {
    let len = usize::try_from(region.len)
        .map_err(|_| NgramError::corrupt(format!("{} region too large", kind.name())))?;
    let mut data = reader.read_section(region.start, len + REGION_CRC_SIZE)?.into_owned();
    let crc = data.split_off(len);
    verify_region_crc(&data, &crc, kind)?;
    Ok(data)
}

fn parse_file_table(table: &[u8], file_count: u32) -> Result<Vec<FileRecord>> {
    if table.len() != file_count as usize * FILE_ENTRY_SIZE {
        return Err(NgramError::corrupt(format!(
            "file table is {} bytes for {} files",
            table.len(),
            file_count
        )));
    }
    Ok(table.chunks_exact(FILE_ENTRY_SIZE).map(FileRecord::parse).collect())
}

fn expect_total(ends: &FileEnds, region: Region, what: &str) -> Result<()> {
    if ends.total() as u64 != region.len {
        return Err(NgramError::corrupt(format!(
            "file table covers {} {} bytes, region holds {}",
            ends.total(),
            what,
            region.len
        )));
    }
    Ok(())
}

fn load_corpus<R: SectionReader + ?Sized>(
    reader: &R,
    regions: &[Region; REGION_COUNT],
    table_kind: RegionKind,
    postings_kind: RegionKind,
    text_kind: RegionKind,
    count: u32,
    ends: FileEnds,
) -> Result<Corpus> {
    let table = read_checked(reader, regions[table_kind as usize], table_kind)?;
    if table.len() != count as usize * NGRAM_ENTRY_SIZE {
        return Err(NgramError::corrupt(format!(
            "{} is {} bytes for {} ngrams",
            table_kind.name(),
            table.len(),
            count
        )));
    }

    let postings = regions[postings_kind as usize];
    let mut ngrams = AHashMap::with_capacity(count as usize);
    let mut prev: Option<NgramKey> = None;
    for entry in table.chunks_exact(NGRAM_ENTRY_SIZE) {
        let record = NgramRecord::parse(entry);
        if prev.is_some_and(|p| p >= record.key) {
            return Err(NgramError::corrupt(format!(
                "{} not sorted at {}",
                table_kind.name(),
                record.key
            )));
        }
        if record.count == 0 || record.postings.end() > postings.len {
            return Err(NgramError::corrupt(format!(
                "{} entry {} points outside its postings",
                table_kind.name(),
                record.key
            )));
        }
        prev = Some(record.key);
        ngrams.insert(record.key, record);
    }

    Ok(Corpus {
        ngrams,
        postings,
        text: regions[text_kind as usize],
        ends,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ngram::builder::IndexBuilder;
    use crate::ngram::format::{FLAG_FILE_NAMES, MAGIC};
    use crate::ngram::writer::write_index;

    fn sample_bytes() -> Vec<u8> {
        let mut builder = IndexBuilder::new();
        builder.add_file("a.txt", b"xxabcxx").unwrap();
        builder.add_file("B.txt", b"yyAbCyy").unwrap();
        write_index(&builder).unwrap()
    }

    fn region_of(bytes: &[u8], kind: RegionKind) -> Region {
        let header = IndexHeader::from_bytes(bytes).unwrap();
        header.regions(bytes.len() as u64).unwrap()[kind as usize]
    }

    #[test]
    fn open_reads_tables() {
        let index = IndexData::open(sample_bytes()).unwrap();
        assert_eq!(index.file_count(), 2);
        assert!(index.has_file_names());
        assert_eq!(index.ngram_frequency(NgramKey::from_bytes(*b"abc")), 2);
        assert_eq!(index.posting_list(NgramKey::from_bytes(*b"abc")).unwrap(), vec![2, 9]);
        assert!(index.posting_list(NgramKey::from_bytes(*b"zzz")).unwrap().is_empty());
    }

    #[test]
    fn file_entries_round_trip() {
        let index = IndexData::open(sample_bytes()).unwrap();
        let entry = index.file_entry(1).unwrap();
        assert_eq!(entry.name, "B.txt");
        assert_eq!(entry.content_offset, 7);
        assert_eq!(entry.content_length, 7);
        assert!(entry.case_bits.is_upper(2));
        assert!(!entry.case_bits.is_upper(3));
        assert_eq!(index.file_content(1).unwrap(), b"yyAbCyy".to_vec());
        assert!(matches!(
            index.file_entry(2),
            Err(NgramError::FileOutOfRange { index: 2, count: 2 })
        ));
    }

    #[test]
    fn name_postings_are_folded() {
        let index = IndexData::open(sample_bytes()).unwrap();
        // "b.t" from "B.txt" starts at name offset 5.
        assert_eq!(
            index.name_posting_list(NgramKey::from_bytes(*b"b.t")).unwrap(),
            vec![5]
        );
    }

    #[test]
    fn empty_shard_opens() {
        let bytes = write_index(&IndexBuilder::new()).unwrap();
        let index = IndexData::open(bytes).unwrap();
        assert_eq!(index.file_count(), 0);
        assert_eq!(index.stats().content_bytes, 0);
        index.verify_integrity().unwrap();
    }

    #[test]
    fn stats_serialize() {
        let index = IndexData::open(sample_bytes()).unwrap();
        let stats = index.stats();
        assert_eq!(stats.file_count, 2);
        assert_eq!(stats.content_bytes, 14);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["file_count"], 2);
        assert_eq!(json["file_names_indexed"], true);
    }

    #[test]
    fn rejects_bad_magic_and_version() {
        let mut bytes = sample_bytes();
        bytes[0] = b'X';
        assert!(matches!(IndexData::open(bytes), Err(NgramError::InvalidMagic)));

        let bytes = sample_bytes();
        let mut header = IndexHeader::from_bytes(&bytes).unwrap();
        header.version = 99;
        let mut patched = bytes.clone();
        patched[..HEADER_SIZE].copy_from_slice(&header.to_bytes());
        assert!(matches!(
            IndexData::open(patched),
            Err(NgramError::VersionMismatch { expected: VERSION, found: 99 })
        ));
        assert_eq!(&bytes[..4], &MAGIC);
    }

    #[test]
    fn rejects_truncated_shard() {
        let bytes = sample_bytes();
        assert!(IndexData::open(bytes[..HEADER_SIZE - 1].to_vec()).is_err());
        assert!(IndexData::open(bytes[..bytes.len() - 1].to_vec()).is_err());
    }

    #[test]
    fn eager_tables_checked_on_open() {
        let mut bytes = sample_bytes();
        let ngrams = region_of(&bytes, RegionKind::ContentNgrams);
        bytes[ngrams.start as usize] ^= 0x01;
        assert!(matches!(
            IndexData::open(bytes),
            Err(NgramError::CorruptIndex { .. })
        ));
    }

    #[test]
    fn lazy_regions_checked_by_verify() {
        let mut bytes = sample_bytes();
        let content = region_of(&bytes, RegionKind::Content);
        bytes[content.start as usize] ^= 0x01;
        let index = IndexData::open(bytes).expect("content is not checked on open");
        assert!(matches!(
            index.verify_integrity(),
            Err(NgramError::CorruptIndex { .. })
        ));
    }

    #[test]
    fn flags_reflect_config() {
        let bytes = sample_bytes();
        let header = IndexHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header.flags & FLAG_FILE_NAMES, FLAG_FILE_NAMES);
    }

    #[test]
    fn index_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<IndexData<Vec<u8>>>();
        assert_send_sync::<IndexData<std::sync::Arc<Vec<u8>>>>();
    }
}
