//! Anchor selection: which two ngrams of a pattern to intersect.
//!
//! Greedy: the rarest window anchors the search, the next rarest window
//! becomes the second anchor. Rarity is the posting count stored in the
//! ngram table, so selection never touches posting bytes.

use ahash::AHashMap;

use super::error::{NgramError, Result};
use super::key::{NgramKey, NGRAM_LEN};

/// One chosen window of the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub key: NgramKey,
    /// Byte position of the window within the pattern.
    pub position: u32,
    pub frequency: u32,
}

/// The pair of anchors plus the geometry needed to turn an anchor hit back
/// into a pattern start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NgramSelection {
    /// Leftmost anchor.
    pub first: Anchor,
    /// Rightmost anchor; equal to `first` when the pattern has one window.
    pub last: Anchor,
    /// `last.position - first.position`.
    pub distance: u32,
    /// Pattern bytes before `first`.
    pub leading_pad: u32,
    /// Pattern bytes after the end of `last`.
    pub trailing_pad: u32,
}

impl NgramSelection {
    pub fn is_single(&self) -> bool {
        self.first.position == self.last.position
    }
}

/// Pick anchors for `pattern` (already folded).
///
/// `Ok(None)` means some window never occurs in the corpus, which proves the
/// pattern cannot match anywhere. Patterns shorter than one ngram are
/// rejected.
pub fn select_ngrams<F>(pattern: &[u8], mut frequency: F) -> Result<Option<NgramSelection>>
where
    F: FnMut(NgramKey) -> u32,
{
    if pattern.len() < NGRAM_LEN {
        return Err(NgramError::PatternTooShort {
            len: pattern.len(),
            min: NGRAM_LEN,
        });
    }
    let pattern_len = u32::try_from(pattern.len()).map_err(|_| NgramError::PatternTooShort {
        len: pattern.len(),
        min: NGRAM_LEN,
    })?;

    // Repeated windows are looked up once.
    let mut seen: AHashMap<NgramKey, u32> = AHashMap::new();
    let mut windows = Vec::with_capacity(pattern.len() - NGRAM_LEN + 1);
    for (i, w) in pattern.windows(NGRAM_LEN).enumerate() {
        let key = NgramKey::from_bytes([w[0], w[1], w[2]]);
        let freq = *seen.entry(key).or_insert_with(|| frequency(key));
        if freq == 0 {
            return Ok(None);
        }
        windows.push(Anchor {
            key,
            position: i as u32,
            frequency: freq,
        });
    }

    // Rarest window; ties go to the leftmost.
    let mut first = windows[0];
    for w in &windows[1..] {
        if w.frequency < first.frequency {
            first = *w;
        }
    }

    // Next rarest among the rest; ties go to the window farthest from `first`
    // so the pair spans as much of the pattern as possible.
    let mut second: Option<Anchor> = None;
    for w in windows.iter().filter(|w| w.position != first.position) {
        second = match second {
            None => Some(*w),
            Some(best) => {
                let farther = w.position.abs_diff(first.position)
                    > best.position.abs_diff(first.position);
                if w.frequency < best.frequency || (w.frequency == best.frequency && farther) {
                    Some(*w)
                } else {
                    Some(best)
                }
            }
        };
    }

    let (first, last) = match second {
        Some(s) if s.position < first.position => (s, first),
        Some(s) => (first, s),
        None => (first, first),
    };

    Ok(Some(NgramSelection {
        first,
        last,
        distance: last.position - first.position,
        leading_pad: first.position,
        trailing_pad: pattern_len - NGRAM_LEN as u32 - last.position,
    }))
}
