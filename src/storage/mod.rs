//! Persistence backends for embedding records.

mod disk;
mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::indexer::SymbolRef;

pub use disk::DiskBackend;
pub use memory::MemoryBackend;

/// Stable identity of a chunk: file plus inclusive line range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl std::fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.file, self.start_line, self.end_line)
    }
}

/// An embedded chunk as stored by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub key: ChunkKey,
    pub vector: Vec<f32>,
    /// blake3 hex digest of `content`
    pub content_hash: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<SymbolRef>,
    /// Insertion order; ties in search are broken by it.
    pub seq: u64,
    pub indexed_at: DateTime<Utc>,
}

impl EmbeddingRecord {
    /// Backend address: digest of the chunk key and content hash.
    pub fn storage_id(&self) -> String {
        storage_id(&self.key, &self.content_hash)
    }
}

pub fn storage_id(key: &ChunkKey, content_hash: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(key.file.as_bytes());
    hasher.update(&[0]);
    hasher.update(&(key.start_line as u64).to_le_bytes());
    hasher.update(&(key.end_line as u64).to_le_bytes());
    hasher.update(content_hash.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// blake3 hex digest of chunk text.
pub fn content_hash(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Key-value store for [`EmbeddingRecord`]s addressed by
/// [`EmbeddingRecord::storage_id`].
///
/// Writes overwrite; there is no cross-process locking.
pub trait VectorBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn get(&self, id: &str) -> Result<Option<EmbeddingRecord>>;

    fn put(&mut self, record: &EmbeddingRecord) -> Result<()>;

    /// Returns whether a record was removed.
    fn remove(&mut self, id: &str) -> Result<bool>;

    /// Every stored record, ordered by `seq`.
    fn list(&self) -> Result<Vec<EmbeddingRecord>>;
}

#[cfg(test)]
pub(crate) fn sample_record(file: &str, start_line: usize, content: &str, seq: u64) -> EmbeddingRecord {
    EmbeddingRecord {
        key: ChunkKey {
            file: file.to_string(),
            start_line,
            end_line: start_line + content.lines().count().max(1) - 1,
        },
        vector: vec![1.0, 0.0, 0.5],
        content_hash: content_hash(content),
        content: content.to_string(),
        symbol: None,
        seq,
        indexed_at: Utc::now(),
    }
}
