//! Positional trigram index for exact substring search.
//!
//! Every file is case-folded and appended to one content blob. Each 3-byte
//! window of the blob is recorded in a posting list keyed by the window, so a
//! query only has to intersect two posting lists at a fixed distance and then
//! re-check the handful of surviving offsets against the stored bytes.
//!
//! # Architecture
//!
//! - **key** — Packed 3-byte ngram keys
//! - **extract** — Ngram windows and binary-file detection
//! - **posting** — Delta + varint posting lists in a shared arena
//! - **format** — Binary shard layout with CRC32 integrity checks
//! - **builder** — In-memory index construction
//! - **writer** — Serialize a builder to bytes (no file I/O)
//! - **index** — Open a shard over any `SectionReader`
//! - **boundary** — Offset → file resolution
//! - **select** — Pick the two rarest windows of a pattern
//! - **matcher** — Distance-constrained merge of two posting lists
//! - **verify** — Byte and case checks of candidates
//! - **search** — The query pipeline tying the above together
//! - **error** — Error types
//!
//! The file I/O layer (mmap, lazy file reads, atomic writes) lives in the
//! `ngram_shard` crate.

pub mod boundary;
pub mod builder;
pub mod error;
pub mod extract;
pub mod format;
pub mod index;
pub mod key;
pub mod matcher;
pub mod posting;
pub mod search;
pub mod select;
pub mod verify;
pub mod writer;

// Re-export key types for convenience.
pub use builder::{FileEntry, IndexBuilder};
pub use error::{NgramError, Result};
pub use index::{IndexData, IndexStats};
pub use key::NgramKey;
pub use search::{CandidateMatch, Query};
pub use writer::write_index;
