//! Content-hash keyed dataset cache
//!
//! Repeated loads of an unchanged input skip the parse entirely: files are
//! fingerprinted with xxh3-64 over their raw bytes, and a fingerprint match
//! hands back the already parsed DataFrame. Results are identical with the
//! cache removed; only the parse cost changes.

use anyhow::{Context, Result};
use polars::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use xxhash_rust::xxh3::Xxh3;

use super::loader::load_dataset_with_progress;

/// Chunk size for streaming file bytes through the hasher (64KB)
const HASH_BUFFER_SIZE: usize = 65536;

/// A dataset returned through the cache, with load statistics
#[derive(Debug, Clone)]
pub struct CachedDataset {
    pub df: DataFrame,
    pub rows: usize,
    pub cols: usize,
    pub memory_mb: f64,
    /// True when the parse step was skipped on a fingerprint match
    pub from_cache: bool,
}

/// In-process cache of parsed datasets keyed by content fingerprint
///
/// Keys are hashes of file CONTENT, not paths: renaming a file still hits,
/// rewriting it in place misses.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<u64, DataFrame>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Fingerprint a file's raw bytes with xxh3-64
    pub fn fingerprint(path: &Path) -> Result<u64> {
        let mut file = File::open(path)
            .with_context(|| format!("Failed to open file for hashing: {}", path.display()))?;

        let mut hasher = Xxh3::new();
        let mut buffer = [0u8; HASH_BUFFER_SIZE];

        loop {
            let read = file
                .read(&mut buffer)
                .with_context(|| format!("Failed to read file for hashing: {}", path.display()))?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        Ok(hasher.digest())
    }

    /// Load a dataset through the cache
    ///
    /// A hit clones the cached DataFrame, which is cheap since column buffers
    /// are reference-counted. A miss parses via the loader and stores the
    /// result for the rest of the process lifetime.
    pub fn load(&mut self, path: &Path, infer_schema_length: usize) -> Result<CachedDataset> {
        let key = Self::fingerprint(path)?;

        if let Some(df) = self.entries.get(&key) {
            let df = df.clone();
            let (rows, cols) = df.shape();
            let memory_mb = df.estimated_size() as f64 / (1024.0 * 1024.0);
            return Ok(CachedDataset {
                df,
                rows,
                cols,
                memory_mb,
                from_cache: true,
            });
        }

        let (df, rows, cols, memory_mb) = load_dataset_with_progress(path, infer_schema_length)?;
        self.entries.insert(key, df.clone());

        Ok(CachedDataset {
            df,
            rows,
            cols,
            memory_mb,
            from_cache: false,
        })
    }

    /// Number of cached datasets
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached dataset
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
