//! `ngram_core` — trigram substring index for code search.
//!
//! The crate compiles without any file I/O: shards are produced as byte
//! buffers and read back through the [`storage::SectionReader`] trait, so the
//! same query path runs over an owned `Vec<u8>`, a memory map, or a lazily
//! read file (see the `ngram_shard` crate).
//!
//! Modules:
//! - `case`    — ASCII case folding with a bit-per-byte uppercase record
//! - `config`  — build policy (`IndexConfig`) and its JSON parser
//! - `storage` — backing-storage and content-provider traits
//! - `ngram`   — keys, postings, shard format, builder, reader and search

pub mod case;
pub mod config;
pub mod ngram;
pub mod storage;

pub use config::IndexConfig;
pub use ngram::{
    write_index, CandidateMatch, IndexBuilder, IndexData, IndexStats, NgramError, NgramKey, Query,
    Result,
};
pub use storage::{ContentProvider, SectionReader};
