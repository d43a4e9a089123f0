//! Process-wide cache of open shards.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ngram_core::Result;
use parking_lot::RwLock;
use tracing::debug;

use crate::mapped::open_mapped;
use crate::Shard;

/// Shard path → opened, memory-mapped shard.
#[derive(Default)]
pub struct ShardCache {
    shards: RwLock<HashMap<PathBuf, Arc<Shard>>>,
}

impl ShardCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or open a cached shard.
    pub fn get_or_open(&self, path: &Path) -> Result<Arc<Shard>> {
        // Fast path: read lock.
        {
            let shards = self.shards.read();
            if let Some(shard) = shards.get(path) {
                return Ok(Arc::clone(shard));
            }
        }

        // Slow path: write lock, re-check to avoid TOCTOU race.
        let mut shards = self.shards.write();
        if let Some(shard) = shards.get(path) {
            return Ok(Arc::clone(shard));
        }
        let shard = Arc::new(open_mapped(path)?);
        shards.insert(path.to_path_buf(), Arc::clone(&shard));
        debug!(path = %path.display(), cached = shards.len(), "cached ngram shard");
        Ok(shard)
    }

    /// Drop a cached shard, e.g. after it was rewritten. Searches holding the
    /// old `Arc` keep using the old mapping.
    pub fn invalidate(&self, path: &Path) -> bool {
        self.shards.write().remove(path).is_some()
    }

    pub fn clear(&self) {
        self.shards.write().clear();
    }

    pub fn len(&self) -> usize {
        self.shards.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.read().is_empty()
    }
}

impl std::fmt::Debug for ShardCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardCache")
            .field("shards", &self.len())
            .finish()
    }
}
