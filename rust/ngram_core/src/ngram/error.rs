//! Error types for the ngram index.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building, opening or searching an index.
#[derive(Debug, Error)]
pub enum NgramError {
    /// Backing storage failed; propagated unchanged.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Index data is structurally invalid.
    #[error("corrupt index: {reason}")]
    CorruptIndex { reason: String },

    #[error("invalid magic bytes in index header")]
    InvalidMagic,

    #[error("version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    /// The pattern has no complete trigram.
    #[error("pattern too short: {len} bytes, need at least {min}")]
    PatternTooShort { len: usize, min: usize },

    /// A content offset resolved past the last file boundary.
    #[error("offset {offset} lies past the last file boundary {end}")]
    OffsetOutOfRange { offset: u32, end: u32 },

    #[error("section {offset}+{length} exceeds {available} available bytes")]
    SectionOutOfBounds {
        offset: u64,
        length: u64,
        available: u64,
    },

    /// The shard would outgrow its 32-bit offset space.
    #[error("shard capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("file index {index} out of range ({count} files)")]
    FileOutOfRange { index: u32, count: u32 },

    #[error("index not found: {}", .0.display())]
    IndexNotFound(PathBuf),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl NgramError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        NgramError::CorruptIndex {
            reason: reason.into(),
        }
    }
}

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, NgramError>;
