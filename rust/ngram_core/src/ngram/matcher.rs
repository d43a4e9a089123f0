//! Distance merge of two sorted posting lists.

use super::select::NgramSelection;

/// Intersect the anchors' postings and return candidate pattern starts.
///
/// A candidate is an offset `a` in `first` with `a + distance` present in
/// `last`; its pattern start is `a - leading_pad`. Hits too close to the
/// start of the corpus to fit the leading pad are dropped. Both inputs must
/// be strictly increasing; the output is too.
pub fn distance_merge(first: &[u32], last: &[u32], selection: &NgramSelection) -> Vec<u32> {
    let pad = selection.leading_pad;
    if selection.is_single() {
        return first
            .iter()
            .filter(|&&a| a >= pad)
            .map(|&a| a - pad)
            .collect();
    }

    let distance = selection.distance as u64;
    let mut out = Vec::new();
    let mut j = 0;
    for &a in first {
        let want = a as u64 + distance;
        while j < last.len() && (last[j] as u64) < want {
            j += 1;
        }
        if j == last.len() {
            break;
        }
        if last[j] as u64 == want && a >= pad {
            out.push(a - pad);
        }
    }
    out
}
