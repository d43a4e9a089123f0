//! Substring search: select anchors, merge their postings, verify candidates.

use std::borrow::Cow;
use std::fmt;

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::error::{NgramError, Result};
use super::index::IndexData;
use super::key::NGRAM_LEN;
use super::matcher::distance_merge;
use super::select::select_ngrams;
use super::verify::Verifier;
use crate::storage::SectionReader;

/// A verified occurrence of a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CandidateMatch {
    pub file_index: u32,
    /// Byte offset of the match within the file (or within its name for
    /// file-name searches).
    pub offset: u32,
}

impl fmt::Display for CandidateMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_index, self.offset)
    }
}

/// A substring query against one shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub pattern: Vec<u8>,
    #[serde(default)]
    pub case_sensitive: bool,
    /// Match against file names instead of file contents.
    #[serde(default)]
    pub file_name: bool,
}

impl Query {
    /// Case-insensitive content query.
    pub fn new(pattern: impl Into<Vec<u8>>) -> Self {
        Query {
            pattern: pattern.into(),
            case_sensitive: false,
            file_name: false,
        }
    }

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    pub fn file_name(mut self, yes: bool) -> Self {
        self.file_name = yes;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Content,
    Names,
}

impl<R: SectionReader> IndexData<R> {
    /// Every occurrence of `pattern` in file contents, ordered by file then
    /// offset.
    ///
    /// Patterns shorter than three bytes are rejected with
    /// [`NgramError::PatternTooShort`]; an empty shard yields no matches.
    pub fn search(&self, pattern: &[u8], case_sensitive: bool) -> Result<Vec<CandidateMatch>> {
        self.run(Target::Content, pattern, case_sensitive)
    }

    /// Every occurrence of `pattern` in file names.
    pub fn search_file_names(
        &self,
        pattern: &[u8],
        case_sensitive: bool,
    ) -> Result<Vec<CandidateMatch>> {
        self.run(Target::Names, pattern, case_sensitive)
    }

    pub fn execute(&self, query: &Query) -> Result<Vec<CandidateMatch>> {
        let target = if query.file_name {
            Target::Names
        } else {
            Target::Content
        };
        self.run(target, &query.pattern, query.case_sensitive)
    }

    /// Indices of files with at least one match.
    pub fn matching_files(&self, query: &Query) -> Result<RoaringBitmap> {
        Ok(self.execute(query)?.into_iter().map(|m| m.file_index).collect())
    }

    fn run(&self, target: Target, pattern: &[u8], case_sensitive: bool) -> Result<Vec<CandidateMatch>> {
        if pattern.len() < NGRAM_LEN {
            return Err(NgramError::PatternTooShort {
                len: pattern.len(),
                min: NGRAM_LEN,
            });
        }
        if self.file_count() == 0 {
            return Ok(Vec::new());
        }

        let corpus = match target {
            Target::Content => &self.content,
            Target::Names => &self.names,
        };
        let verifier = Verifier::new(pattern, case_sensitive);

        let Some(selection) = select_ngrams(verifier.folded(), |key| corpus.frequency(key))? else {
            debug!(?target, pattern_len = pattern.len(), "pattern has an unindexed ngram");
            return Ok(Vec::new());
        };

        let first = corpus.postings(self.reader(), selection.first.key)?;
        let last = if selection.last.key == selection.first.key {
            None
        } else {
            Some(corpus.postings(self.reader(), selection.last.key)?)
        };
        let candidates = distance_merge(&first, last.as_deref().unwrap_or(&first[..]), &selection);

        let ends = corpus.ends();
        let mut matches = Vec::new();
        let mut collisions = 0usize;
        let mut case_cache: Option<(usize, Cow<'_, [u8]>)> = None;
        for start in candidates.iter().copied() {
            let file = ends.resolve(start)?;
            if !verifier.fits(start, ends.end(file)) {
                trace!(offset = start, file, "candidate crosses file boundary");
                continue;
            }
            let offset = start - ends.start(file);
            let window = corpus.window(self.reader(), start, verifier.len())?;

            let verified = match target {
                Target::Names => verifier.matches_raw(&window),
                Target::Content if !verifier.matches_folded(&window) => false,
                Target::Content if !case_sensitive => true,
                Target::Content => {
                    if !matches!(case_cache, Some((cached, _)) if cached == file) {
                        case_cache = Some((file, self.case_bits(file)?));
                    }
                    let bits = case_cache.as_ref().map_or(&[][..], |(_, bits)| bits.as_ref());
                    verifier.matches_case(bits, offset as usize)
                }
            };
            if !verified {
                collisions += 1;
                trace!(offset = start, file, "candidate rejected by verification");
                continue;
            }
            matches.push(CandidateMatch {
                file_index: file as u32,
                offset,
            });
        }

        debug!(
            ?target,
            pattern_len = pattern.len(),
            first = %selection.first.key,
            first_freq = selection.first.frequency,
            last = %selection.last.key,
            last_freq = selection.last.frequency,
            candidates = candidates.len(),
            collisions,
            matches = matches.len(),
            "ngram search"
        );
        Ok(matches)
    }
}
