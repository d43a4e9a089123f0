//! Build-time content read from the filesystem.

use std::path::{Path, PathBuf};

use ngram_core::{ContentProvider, Result};
use tracing::warn;

/// Lists files from explicit paths, in the order given.
///
/// Names are the paths relative to `root` when one is set and the path is
/// under it, otherwise the path as given. Unreadable files are skipped.
#[derive(Debug, Clone, Default)]
pub struct PathListProvider {
    paths: Vec<PathBuf>,
    root: Option<PathBuf>,
}

impl PathListProvider {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        PathListProvider {
            paths: paths.into_iter().map(Into::into).collect(),
            root: None,
        }
    }

    /// Name files relative to `root`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    fn name_of(&self, path: &Path) -> String {
        let relative = self
            .root
            .as_deref()
            .and_then(|root| path.strip_prefix(root).ok())
            .unwrap_or(path);
        relative.to_string_lossy().into_owned()
    }
}

impl ContentProvider for PathListProvider {
    fn list_files(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let mut files = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            match std::fs::read(path) {
                Ok(content) => files.push((self.name_of(path), content)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable file");
                }
            }
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_in_order_and_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("nested").join("b.txt");
        std::fs::create_dir_all(b.parent().unwrap()).unwrap();
        std::fs::write(&a, b"alpha").unwrap();
        std::fs::write(&b, b"beta").unwrap();

        let provider = PathListProvider::new([b.clone(), dir.path().join("gone.txt"), a.clone()])
            .with_root(dir.path());
        let files = provider.list_files().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].0, Path::new("nested").join("b.txt").to_string_lossy());
        assert_eq!(files[0].1, b"beta");
        assert_eq!(files[1].0, "a.txt");
    }

    #[test]
    fn test_names_without_root() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        std::fs::write(&a, b"alpha").unwrap();
        let files = PathListProvider::new([&a]).list_files().unwrap();
        assert_eq!(files[0].0, a.to_string_lossy());
    }
}
