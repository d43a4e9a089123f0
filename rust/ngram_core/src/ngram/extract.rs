//! Ngram extraction from folded byte content.

use super::key::{NgramKey, NGRAM_LEN};

/// Bytes sampled from the head of a file for binary detection.
const BINARY_SAMPLE: usize = 8192;

/// Every ngram window of `folded` with its starting position.
///
/// Yields `len - 2` items for `len >= 3` and nothing otherwise. Positions are
/// strictly increasing.
pub fn ngrams(folded: &[u8]) -> impl Iterator<Item = (usize, NgramKey)> + '_ {
    folded
        .windows(NGRAM_LEN)
        .enumerate()
        .map(|(i, w)| (i, NgramKey::from_bytes([w[0], w[1], w[2]])))
}

/// Check if content appears to be binary (null-byte ratio above `null_ratio`).
pub fn is_binary(content: &[u8], null_ratio: f64) -> bool {
    if content.is_empty() {
        return false;
    }
    let sample = &content[..content.len().min(BINARY_SAMPLE)];
    let nulls = memchr::memchr_iter(0, sample).count();
    (nulls as f64 / sample.len() as f64) > null_ratio
}
