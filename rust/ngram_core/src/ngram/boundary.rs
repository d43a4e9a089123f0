//! File boundary table: maps an absolute offset back to its file.

use super::error::{NgramError, Result};

/// Monotonically non-decreasing end offsets, one per file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileEnds {
    ends: Vec<u32>,
}

impl FileEnds {
    /// Build from end offsets, rejecting a table that goes backwards.
    pub fn new(ends: Vec<u32>) -> Result<Self> {
        if let Some(i) = ends.windows(2).position(|w| w[1] < w[0]) {
            return Err(NgramError::corrupt(format!(
                "file ends decrease at file {} ({} < {})",
                i + 1,
                ends[i + 1],
                ends[i]
            )));
        }
        Ok(FileEnds { ends })
    }

    pub fn len(&self) -> usize {
        self.ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// End of the last file, i.e. the total corpus length.
    pub fn total(&self) -> u32 {
        self.ends.last().copied().unwrap_or(0)
    }

    pub fn start(&self, file: usize) -> u32 {
        if file == 0 {
            0
        } else {
            self.ends[file - 1]
        }
    }

    pub fn end(&self, file: usize) -> u32 {
        self.ends[file]
    }

    /// The file owning `offset`: the first whose end is strictly greater.
    ///
    /// An offset at or past the last end cannot come from a valid posting
    /// and is reported as corruption, never dropped.
    pub fn resolve(&self, offset: u32) -> Result<usize> {
        let file = self.ends.partition_point(|&end| end <= offset);
        if file == self.ends.len() {
            return Err(NgramError::OffsetOutOfRange {
                offset,
                end: self.total(),
            });
        }
        Ok(file)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.ends
    }
}
