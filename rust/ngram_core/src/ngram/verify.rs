//! Candidate verification against stored bytes.

use crate::case::is_upper_at;

/// A pattern prepared for checking candidates.
#[derive(Debug, Clone)]
pub struct Verifier {
    pattern: Vec<u8>,
    folded: Vec<u8>,
    case_sensitive: bool,
}

impl Verifier {
    pub fn new(pattern: &[u8], case_sensitive: bool) -> Self {
        Verifier {
            pattern: pattern.to_vec(),
            folded: pattern.to_ascii_lowercase(),
            case_sensitive,
        }
    }

    pub fn len(&self) -> usize {
        self.pattern.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }

    pub fn folded(&self) -> &[u8] {
        &self.folded
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Whether a match starting at `start` ends at or before `file_end`.
    pub fn fits(&self, start: u32, file_end: u32) -> bool {
        start as u64 + self.pattern.len() as u64 <= file_end as u64
    }

    /// Compare a window of folded content.
    pub fn matches_folded(&self, window: &[u8]) -> bool {
        window == self.folded.as_slice()
    }

    /// Check the original casing of a folded match starting `offset_in_file`
    /// bytes into a file with packed case bits `case_bits`. Always true for
    /// case-insensitive searches.
    pub fn matches_case(&self, case_bits: &[u8], offset_in_file: usize) -> bool {
        if !self.case_sensitive {
            return true;
        }
        self.pattern.iter().enumerate().all(|(i, &b)| {
            b.is_ascii_uppercase() == is_upper_at(case_bits, offset_in_file + i)
        })
    }

    /// Compare a window of unfolded bytes, folding on the fly unless the
    /// search is case-sensitive.
    pub fn matches_raw(&self, window: &[u8]) -> bool {
        if self.case_sensitive {
            window == self.pattern.as_slice()
        } else {
            window.eq_ignore_ascii_case(&self.pattern)
        }
    }
}
