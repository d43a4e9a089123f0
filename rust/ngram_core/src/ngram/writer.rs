//! Index writer — serializes a built index to bytes.
//!
//! No file I/O here; the caller decides where the bytes go.

use tracing::info;

use super::builder::IndexBuilder;
use super::error::{NgramError, Result};
use super::format::{
    FileRecord, IndexHeader, NgramRecord, RegionKind, FILE_ENTRY_SIZE, FLAG_FILE_NAMES,
    HEADER_SIZE, NGRAM_ENTRY_SIZE, REGION_COUNT, REGION_CRC_SIZE, VERSION,
};
use super::key::NgramKey;
use super::posting::{PostingArena, Section};

/// Serialize a built index to bytes.
///
/// The output is deterministic: the same files added in the same order
/// always produce identical bytes.
pub fn write_index(builder: &IndexBuilder) -> Result<Vec<u8>> {
    let files = builder.files();

    // Phase 1: encode postings into their arenas.
    let (content_ngrams, content_postings) = encode_table(&builder.sorted_postings())?;
    let (name_ngrams, name_postings) = encode_table(&builder.sorted_name_postings())?;

    // Phase 2: file table and case bits.
    let mut file_table = Vec::with_capacity(files.len() * FILE_ENTRY_SIZE);
    let mut case_blob = Vec::new();
    let mut name_end: u32 = 0;
    for f in files {
        let bits = f.case_bits.as_bytes();
        let case_bits = Section {
            offset: to_u32(case_blob.len(), "case bits")?,
            length: to_u32(bits.len(), "case bits")?,
        };
        case_blob.extend_from_slice(bits);
        name_end = name_end
            .checked_add(to_u32(f.name.len(), "file names")?)
            .ok_or_else(|| NgramError::CapacityExceeded("file names exceed 4 GiB".into()))?;
        FileRecord {
            content_end: f.end(),
            case_bits,
            name_end,
        }
        .write_to(&mut file_table);
    }

    // Phase 3: lay regions out back to back after the header.
    let payloads: [&[u8]; REGION_COUNT] = [
        &file_table,
        &content_ngrams,
        content_postings.as_bytes(),
        &name_ngrams,
        name_postings.as_bytes(),
        builder.content(),
        &case_blob,
        builder.names(),
    ];
    let mut region_starts = [0u64; REGION_COUNT];
    let mut cursor = HEADER_SIZE as u64;
    for (start, payload) in region_starts.iter_mut().zip(payloads.iter()) {
        *start = cursor;
        cursor += (payload.len() + REGION_CRC_SIZE) as u64;
    }
    let total_size = usize::try_from(cursor)
        .map_err(|_| NgramError::CapacityExceeded("shard does not fit in memory".into()))?;

    let flags = if builder.config().index_file_names {
        FLAG_FILE_NAMES
    } else {
        0
    };
    let header = IndexHeader {
        version: VERSION,
        flags,
        file_count: builder.file_count(),
        content_ngram_count: builder.ngram_count(),
        name_ngram_count: builder.name_ngram_count(),
        region_starts,
    };

    // Phase 4: emit.
    let mut output = Vec::with_capacity(total_size);
    output.extend_from_slice(&header.to_bytes());
    for (kind, payload) in RegionKind::ALL.iter().zip(payloads.iter()) {
        debug_assert_eq!(output.len() as u64, region_starts[*kind as usize]);
        output.extend_from_slice(payload);
        output.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
    }

    info!(
        files = header.file_count,
        ngrams = header.content_ngram_count,
        name_ngrams = header.name_ngram_count,
        content_bytes = builder.content().len(),
        shard_bytes = output.len(),
        "serialized ngram shard"
    );
    Ok(output)
}

/// Encode sorted postings into an ngram table and its arena.
fn encode_table(sorted: &[(NgramKey, &[u32])]) -> Result<(Vec<u8>, PostingArena)> {
    let mut table = Vec::with_capacity(sorted.len() * NGRAM_ENTRY_SIZE);
    let mut arena = PostingArena::new();
    for (key, offsets) in sorted {
        let postings = arena.push(offsets)?;
        NgramRecord {
            key: *key,
            count: to_u32(offsets.len(), "posting list")?,
            postings,
        }
        .write_to(&mut table);
    }
    Ok((table, arena))
}

fn to_u32(n: usize, what: &str) -> Result<u32> {
    u32::try_from(n).map_err(|_| NgramError::CapacityExceeded(format!("{} exceeds 4 GiB", what)))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_roundtrip_serialization(
            file_count in 0..20u32,
            content_seed in prop::collection::vec(any::<u8>(), 10..100)
        ) {
            let mut builder = IndexBuilder::new();
            for i in 0..file_count {
                let mut content = content_seed.clone();
                content.extend_from_slice(&i.to_le_bytes());
                content.retain(|&b| b != 0);
                builder.add_file(&format!("file_{}.txt", i), &content).unwrap();
            }

            let bytes = write_index(&builder).expect("Should serialize");
            let header = IndexHeader::from_bytes(&bytes).expect("Should parse header");

            prop_assert_eq!(header.file_count, builder.file_count());
            prop_assert_eq!(header.content_ngram_count, builder.ngram_count());
            prop_assert!(header.regions(bytes.len() as u64).is_ok());
        }
    }
}
