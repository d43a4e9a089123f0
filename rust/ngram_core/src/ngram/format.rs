//! Binary shard format: header, region table and fixed-size records.
//!
//! Layout:
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Header (92 bytes)                           │
//! │  magic: [u8; 4] = "NGRM"                    │
//! │  version: u32 = 1                           │
//! │  flags: u32                                 │
//! │  file_count: u32                            │
//! │  content_ngram_count: u32                   │
//! │  name_ngram_count: u32                      │
//! │  region_starts: [u64; 8]                    │
//! │  header_crc32: u32                          │
//! ├─────────────────────────────────────────────┤
//! │ File table        16-byte entries   + crc32 │
//! │ Content ngrams    15-byte entries   + crc32 │
//! │ Content postings  delta varints     + crc32 │
//! │ Name ngrams       15-byte entries   + crc32 │
//! │ Name postings     delta varints     + crc32 │
//! │ Content           folded bytes      + crc32 │
//! │ Case bits         packed bits       + crc32 │
//! │ Names             raw name bytes    + crc32 │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Each region runs from its start to the next region's start (the last one
//! to the end of the shard); its final four bytes are a CRC32 of the rest.

use super::error::{NgramError, Result};
use super::key::NgramKey;
use super::posting::Section;

/// Magic bytes identifying an ngram shard.
pub const MAGIC: [u8; 4] = *b"NGRM";

/// Current format version.
pub const VERSION: u32 = 1;

/// Header size in bytes (fixed).
pub const HEADER_SIZE: usize = 92;

/// Bytes covered by the header CRC.
const HEADER_CRC_OFFSET: usize = HEADER_SIZE - 4;

/// Trailing CRC32 on every region.
pub const REGION_CRC_SIZE: usize = 4;

/// File entry: content_end + case_offset + case_len + name_end, all u32.
pub const FILE_ENTRY_SIZE: usize = 16;

/// Ngram entry: key (3 bytes) + count (u32) + section offset (u32) + section length (u32).
pub const NGRAM_ENTRY_SIZE: usize = 15;

/// Header flag: the name ngram table was built.
pub const FLAG_FILE_NAMES: u32 = 1;

/// Regions in on-disk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Files = 0,
    ContentNgrams = 1,
    ContentPostings = 2,
    NameNgrams = 3,
    NamePostings = 4,
    Content = 5,
    CaseBits = 6,
    Names = 7,
}

pub const REGION_COUNT: usize = 8;

impl RegionKind {
    pub const ALL: [RegionKind; REGION_COUNT] = [
        RegionKind::Files,
        RegionKind::ContentNgrams,
        RegionKind::ContentPostings,
        RegionKind::NameNgrams,
        RegionKind::NamePostings,
        RegionKind::Content,
        RegionKind::CaseBits,
        RegionKind::Names,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RegionKind::Files => "file table",
            RegionKind::ContentNgrams => "content ngram table",
            RegionKind::ContentPostings => "content postings",
            RegionKind::NameNgrams => "name ngram table",
            RegionKind::NamePostings => "name postings",
            RegionKind::Content => "content",
            RegionKind::CaseBits => "case bits",
            RegionKind::Names => "names",
        }
    }
}

/// Absolute location of a region's payload (CRC excluded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    pub start: u64,
    pub len: u64,
}

impl Region {
    /// Absolute `(offset, length)` of `section` within this region.
    pub fn locate(&self, section: Section) -> Result<(u64, usize)> {
        if section.end() > self.len {
            return Err(NgramError::SectionOutOfBounds {
                offset: section.offset as u64,
                length: section.length as u64,
                available: self.len,
            });
        }
        Ok((self.start + section.offset as u64, section.length as usize))
    }

    /// Absolute `(offset, length)` of a byte window within this region.
    pub fn locate_span(&self, offset: u32, length: usize) -> Result<(u64, usize)> {
        let end = offset as u64 + length as u64;
        if end > self.len {
            return Err(NgramError::SectionOutOfBounds {
                offset: offset as u64,
                length: length as u64,
                available: self.len,
            });
        }
        Ok((self.start + offset as u64, length))
    }

    /// The trailing CRC of this region.
    pub fn crc_offset(&self) -> u64 {
        self.start + self.len
    }
}

/// Index header parsed from bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHeader {
    pub version: u32,
    pub flags: u32,
    pub file_count: u32,
    pub content_ngram_count: u32,
    pub name_ngram_count: u32,
    pub region_starts: [u64; REGION_COUNT],
}

impl IndexHeader {
    /// Serialize header to bytes (little-endian).
    /// CRC32 is computed over everything before the final four bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..12].copy_from_slice(&self.flags.to_le_bytes());
        buf[12..16].copy_from_slice(&self.file_count.to_le_bytes());
        buf[16..20].copy_from_slice(&self.content_ngram_count.to_le_bytes());
        buf[20..24].copy_from_slice(&self.name_ngram_count.to_le_bytes());
        for (i, start) in self.region_starts.iter().enumerate() {
            let at = 24 + i * 8;
            buf[at..at + 8].copy_from_slice(&start.to_le_bytes());
        }
        let crc = crc32fast::hash(&buf[..HEADER_CRC_OFFSET]);
        buf[HEADER_CRC_OFFSET..].copy_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Parse and check magic and CRC. The version is returned as found;
    /// callers decide whether they can read it.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(NgramError::corrupt("shard too small for header"));
        }
        if data[0..4] != MAGIC {
            return Err(NgramError::InvalidMagic);
        }
        let stored_crc = read_u32(data, HEADER_CRC_OFFSET);
        let computed_crc = crc32fast::hash(&data[..HEADER_CRC_OFFSET]);
        if stored_crc != computed_crc {
            return Err(NgramError::corrupt(format!(
                "header CRC mismatch (stored={:#010x}, computed={:#010x})",
                stored_crc, computed_crc
            )));
        }

        let mut region_starts = [0u64; REGION_COUNT];
        for (i, start) in region_starts.iter_mut().enumerate() {
            *start = read_u64(data, 24 + i * 8);
        }

        Ok(IndexHeader {
            version: read_u32(data, 4),
            flags: read_u32(data, 8),
            file_count: read_u32(data, 12),
            content_ngram_count: read_u32(data, 16),
            name_ngram_count: read_u32(data, 20),
            region_starts,
        })
    }

    pub fn has_file_names(&self) -> bool {
        self.flags & FLAG_FILE_NAMES != 0
    }

    /// Resolve the region table against a shard of `total_len` bytes.
    pub fn regions(&self, total_len: u64) -> Result<[Region; REGION_COUNT]> {
        let mut regions = [Region::default(); REGION_COUNT];
        let mut prev_end = HEADER_SIZE as u64;
        for (i, kind) in RegionKind::ALL.iter().enumerate() {
            let start = self.region_starts[i];
            let end = match self.region_starts.get(i + 1) {
                Some(&next) => next,
                None => total_len,
            };
            if start != prev_end || end < start + REGION_CRC_SIZE as u64 || end > total_len {
                return Err(NgramError::corrupt(format!(
                    "{} region [{}, {}) is misplaced in a {}-byte shard",
                    kind.name(),
                    start,
                    end,
                    total_len
                )));
            }
            regions[i] = Region {
                start,
                len: end - start - REGION_CRC_SIZE as u64,
            };
            prev_end = end;
        }
        Ok(regions)
    }
}

/// Check a region's trailing CRC32 against its payload.
pub fn verify_region_crc(payload: &[u8], crc_bytes: &[u8], kind: RegionKind) -> Result<()> {
    if crc_bytes.len() != REGION_CRC_SIZE {
        return Err(NgramError::corrupt(format!("{} CRC truncated", kind.name())));
    }
    let stored = read_u32(crc_bytes, 0);
    let computed = crc32fast::hash(payload);
    if stored != computed {
        return Err(NgramError::corrupt(format!(
            "{} CRC mismatch (stored={:#010x}, computed={:#010x})",
            kind.name(),
            stored,
            computed
        )));
    }
    Ok(())
}

/// One row of the file table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRecord {
    pub content_end: u32,
    pub case_bits: Section,
    pub name_end: u32,
}

impl FileRecord {
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.content_end.to_le_bytes());
        out.extend_from_slice(&self.case_bits.offset.to_le_bytes());
        out.extend_from_slice(&self.case_bits.length.to_le_bytes());
        out.extend_from_slice(&self.name_end.to_le_bytes());
    }

    pub fn parse(entry: &[u8]) -> Self {
        FileRecord {
            content_end: read_u32(entry, 0),
            case_bits: Section {
                offset: read_u32(entry, 4),
                length: read_u32(entry, 8),
            },
            name_end: read_u32(entry, 12),
        }
    }
}

/// One row of an ngram table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NgramRecord {
    pub key: NgramKey,
    /// Number of postings; doubles as the selector's frequency.
    pub count: u32,
    pub postings: Section,
}

impl NgramRecord {
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.key.to_bytes());
        out.extend_from_slice(&self.count.to_le_bytes());
        out.extend_from_slice(&self.postings.offset.to_le_bytes());
        out.extend_from_slice(&self.postings.length.to_le_bytes());
    }

    pub fn parse(entry: &[u8]) -> Self {
        NgramRecord {
            key: NgramKey::from_bytes([entry[0], entry[1], entry[2]]),
            count: read_u32(entry, 3),
            postings: Section {
                offset: read_u32(entry, 7),
                length: read_u32(entry, 11),
            },
        }
    }
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn read_u64(data: &[u8], at: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&data[at..at + 8]);
    u64::from_le_bytes(b)
}
