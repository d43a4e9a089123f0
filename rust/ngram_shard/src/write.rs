//! Atomic shard writes.

use std::io::Write;
use std::path::Path;

use ngram_core::{write_index, ContentProvider, IndexBuilder, IndexConfig, Result};
use tempfile::NamedTempFile;
use tracing::info;

/// Serialize `builder` and atomically replace `path` with the result.
///
/// The bytes go to a temporary file in the target directory, are synced, and
/// are then renamed over `path`, so readers never observe a partial shard.
/// Returns the number of bytes written.
pub fn write_shard(builder: &IndexBuilder, path: &Path) -> Result<u64> {
    let bytes = write_index(builder)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    info!(path = %path.display(), bytes = bytes.len(), files = builder.file_count(), "wrote ngram shard");
    Ok(bytes.len() as u64)
}

/// Index everything `provider` lists under `config` and write the shard to
/// `path`. Returns the number of files indexed.
pub fn build_shard<P: ContentProvider + ?Sized>(
    provider: &P,
    config: IndexConfig,
    path: &Path,
) -> Result<u32> {
    let mut builder = IndexBuilder::with_config(config)?;
    builder.add_from(provider)?;
    write_shard(&builder, path)?;
    Ok(builder.file_count())
}
