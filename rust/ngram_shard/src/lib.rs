//! File-backed shards for `ngram_core`.
//!
//! `ngram_core` never touches the filesystem; this crate supplies the
//! pieces that do:
//!
//! - **mapped** — read-only memory-mapped shards (`MappedShard`)
//! - **file_reader** — lazy positional reads for shards too big to map
//! - **provider** — build-time content from a list of paths
//! - **write** — atomic shard writes
//! - **cache** — process-wide map of open shards

pub mod cache;
pub mod file_reader;
pub mod mapped;
pub mod provider;
pub mod write;

pub use cache::ShardCache;
pub use file_reader::{open_lazy, FileSectionReader};
pub use mapped::{open_mapped, MappedShard};
pub use provider::PathListProvider;
pub use write::{build_shard, write_shard};

/// A shard opened through a memory map.
pub type Shard = ngram_core::IndexData<MappedShard>;
