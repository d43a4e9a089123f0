//! Build policy for [`IndexBuilder`](crate::ngram::IndexBuilder).
//!
//! Configs are plain serde structs so callers can keep them next to the rest
//! of their settings; `parse_index_config` accepts partial JSON and fills the
//! gaps from `IndexConfig::default()`.
//!
//! The default indexes every file it is given. Size, binary and exclude
//! filtering are opt-in; `IndexConfig::filtered()` turns on the first two
//! with the usual limits.

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::ngram::error::NgramError;

/// Size cap used by `IndexConfig::filtered()` (1 GB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 1024 * 1024 * 1024;

/// Ratio of null bytes above which a file is considered binary.
pub const DEFAULT_BINARY_NULL_RATIO: f64 = 0.10;

/// Initial capacity of the build-side postings map.
pub const DEFAULT_NGRAM_CAPACITY: usize = 1 << 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Files larger than this are skipped. Unbounded by default.
    pub max_file_size: usize,
    /// Skip files that look binary (see `binary_null_ratio`). Off by default.
    pub skip_binary: bool,
    pub binary_null_ratio: f64,
    /// Build the ngram table over file names as well as contents.
    pub index_file_names: bool,
    /// Glob patterns matched against the file name; matches are skipped.
    pub exclude: Vec<String>,
    /// Capacity hint for the number of distinct trigrams.
    pub ngram_capacity: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            max_file_size: usize::MAX,
            skip_binary: false,
            binary_null_ratio: DEFAULT_BINARY_NULL_RATIO,
            index_file_names: true,
            exclude: Vec::new(),
            ngram_capacity: DEFAULT_NGRAM_CAPACITY,
        }
    }
}

impl IndexConfig {
    /// Skip binary files and files over [`DEFAULT_MAX_FILE_SIZE`].
    ///
    /// Skipped files get no file index, so later files are numbered by
    /// accepted order rather than call order.
    pub fn filtered() -> Self {
        IndexConfig {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            skip_binary: true,
            ..IndexConfig::default()
        }
    }

    /// Compile `exclude` into a matcher. `None` when there is nothing to exclude.
    pub fn exclude_set(&self) -> Result<Option<GlobSet>, NgramError> {
        if self.exclude.is_empty() {
            return Ok(None);
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude {
            let glob = Glob::new(pattern).map_err(|e| {
                NgramError::InvalidConfig(format!("bad exclude pattern {:?}: {}", pattern, e))
            })?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| NgramError::InvalidConfig(e.to_string()))?;
        Ok(Some(set))
    }

    fn validate(&self) -> Result<(), NgramError> {
        if !(0.0..=1.0).contains(&self.binary_null_ratio) {
            return Err(NgramError::InvalidConfig(format!(
                "binary_null_ratio must be within [0, 1], got {}",
                self.binary_null_ratio
            )));
        }
        Ok(())
    }
}

/// Parse an index config from a JSON string. Missing fields take defaults.
pub fn parse_index_config(json: &str) -> Result<IndexConfig, NgramError> {
    let config: IndexConfig =
        serde_json::from_str(json).map_err(|e| NgramError::InvalidConfig(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = parse_index_config("{}").unwrap();
        assert_eq!(config, IndexConfig::default());
    }

    #[test]
    fn partial_override() {
        let json = r#"{"skip_binary":true,"exclude":["*.lock","vendor/**"]}"#;
        let config = parse_index_config(json).unwrap();
        assert!(config.skip_binary);
        assert_eq!(config.exclude, vec!["*.lock", "vendor/**"]);
        assert_eq!(config.max_file_size, usize::MAX);
    }

    #[test]
    fn default_filters_nothing() {
        let config = IndexConfig::default();
        assert!(!config.skip_binary);
        assert_eq!(config.max_file_size, usize::MAX);
        assert!(config.exclude.is_empty());
    }

    #[test]
    fn filtered_preset() {
        let config = IndexConfig::filtered();
        assert!(config.skip_binary);
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(config.binary_null_ratio, DEFAULT_BINARY_NULL_RATIO);
        assert!(config.index_file_names);
    }

    #[test]
    fn exclude_set_matches() {
        let config = IndexConfig {
            exclude: vec!["*.min.js".to_string()],
            ..IndexConfig::default()
        };
        let set = config.exclude_set().unwrap().expect("non-empty set");
        assert!(set.is_match("app.min.js"));
        assert!(!set.is_match("app.js"));
    }

    #[test]
    fn no_excludes_no_set() {
        assert!(IndexConfig::default().exclude_set().unwrap().is_none());
    }

    #[test]
    fn bad_glob_rejected() {
        let config = IndexConfig {
            exclude: vec!["a[".to_string()],
            ..IndexConfig::default()
        };
        assert!(matches!(
            config.exclude_set(),
            Err(NgramError::InvalidConfig(_))
        ));
    }

    #[test]
    fn bad_ratio_rejected() {
        let err = parse_index_config(r#"{"binary_null_ratio":2.5}"#).unwrap_err();
        assert!(matches!(err, NgramError::InvalidConfig(_)));
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(matches!(
            parse_index_config("{not json"),
            Err(NgramError::InvalidConfig(_))
        ));
    }
}
