//! Semantic search over embedded chunks.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{BackendKind, VectorConfig};
use crate::embeddings::EmbeddingFunction;
use crate::error::{RepoError, Result};
use crate::indexer::Chunk;
use crate::snapshot::Snapshot;
use crate::storage::{
    content_hash, ChunkKey, DiskBackend, EmbeddingRecord, MemoryBackend, VectorBackend,
};

/// One semantic match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticHit {
    pub file: String,
    pub line: usize,
    pub end_line: usize,
    pub score: f32,
    pub content: String,
}

/// What an [`VectorSearcher::index`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Chunks sent to the embedding function
    pub embedded: usize,
    /// Chunks whose vector was copied from a record with the same content
    pub reused: usize,
    /// Chunks already indexed with identical content
    pub unchanged: usize,
}

#[derive(Debug, Clone)]
struct Entry {
    record: EmbeddingRecord,
    stale: bool,
}

/// Ordered embedding records with a fixed dimensionality.
///
/// Keys are unique; re-inserting a key replaces the record in place and keeps
/// its original position. Stale records stay in the index but are never
/// returned by [`search`](Self::search).
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<Entry>,
    positions: HashMap<ChunkKey, usize>,
    dimension: Option<usize>,
    next_seq: u64,
}

impl VectorIndex {
    pub fn new(dimension: Option<usize>) -> Self {
        Self {
            dimension,
            ..Self::default()
        }
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &ChunkKey) -> Option<&EmbeddingRecord> {
        self.positions.get(key).map(|&i| &self.entries[i].record)
    }

    pub fn is_stale(&self, key: &ChunkKey) -> bool {
        self.positions
            .get(key)
            .map(|&i| self.entries[i].stale)
            .unwrap_or(false)
    }

    pub fn stale_count(&self) -> usize {
        self.entries.iter().filter(|e| e.stale).count()
    }

    pub fn records(&self) -> impl Iterator<Item = &EmbeddingRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    fn check_dimension(&mut self, vector: &[f32]) -> Result<()> {
        match self.dimension {
            Some(expected) if expected != vector.len() => Err(RepoError::DimensionMismatch {
                expected,
                actual: vector.len(),
            }),
            Some(_) => Ok(()),
            None => {
                self.dimension = Some(vector.len());
                Ok(())
            }
        }
    }

    /// Insert or overwrite by key. Returns the record previously stored
    /// under the key, if any.
    pub fn upsert(&mut self, mut record: EmbeddingRecord) -> Result<Option<EmbeddingRecord>> {
        self.check_dimension(&record.vector)?;
        match self.positions.get(&record.key) {
            Some(&i) => {
                record.seq = self.entries[i].record.seq;
                let entry = Entry {
                    record,
                    stale: false,
                };
                Ok(Some(std::mem::replace(&mut self.entries[i], entry).record))
            }
            None => {
                self.next_seq = self.next_seq.max(record.seq + 1);
                self.positions.insert(record.key.clone(), self.entries.len());
                self.entries.push(Entry {
                    record,
                    stale: false,
                });
                Ok(None)
            }
        }
    }

    fn mark_stale(&mut self, key: &ChunkKey) {
        if let Some(&i) = self.positions.get(key) {
            self.entries[i].stale = true;
        }
    }

    /// Vector of any record with this content hash.
    fn vector_for_hash(&self, hash: &str) -> Option<&[f32]> {
        self.entries
            .iter()
            .find(|e| e.record.content_hash == hash)
            .map(|e| e.record.vector.as_slice())
    }

    /// Records ranked by cosine similarity to `query`, highest first; ties
    /// keep insertion order.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SemanticHit>> {
        if top_k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(expected) = self.dimension {
            if expected != query.len() {
                return Err(RepoError::DimensionMismatch {
                    expected,
                    actual: query.len(),
                });
            }
        }

        let mut live: Vec<&EmbeddingRecord> = self
            .entries
            .iter()
            .filter(|e| !e.stale)
            .map(|e| &e.record)
            .collect();
        live.sort_by_key(|r| r.seq);

        let mut scored: Vec<(f32, &EmbeddingRecord)> = live
            .into_iter()
            .map(|r| (cosine_similarity(query, &r.vector), r))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(score, r)| SemanticHit {
                file: r.key.file.clone(),
                line: r.key.start_line,
                end_line: r.key.end_line,
                score,
                content: r.content.clone(),
            })
            .collect())
    }
}

/// Cosine similarity; zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Embeds chunks, mirrors them to a backend and answers similarity queries.
pub struct VectorSearcher {
    snapshot: Arc<Snapshot>,
    embedder: Arc<dyn EmbeddingFunction>,
    backend: Box<dyn VectorBackend>,
    index: VectorIndex,
    batch_size: usize,
}

impl VectorSearcher {
    /// Build a searcher with the backend selected by `config`.
    ///
    /// The disk backend needs `persist_dir` outside the snapshot root; a
    /// relative directory is taken from the working directory. Anything else
    /// fails with [`RepoError::Configuration`].
    pub fn new(
        snapshot: Arc<Snapshot>,
        embedder: Arc<dyn EmbeddingFunction>,
        config: &VectorConfig,
    ) -> Result<Self> {
        let backend: Box<dyn VectorBackend> = match config.backend {
            BackendKind::Memory => Box::new(MemoryBackend::new()),
            BackendKind::Disk => {
                let dir = config.persist_dir.as_ref().ok_or_else(|| {
                    RepoError::Configuration(
                        "vector backend 'disk' requires vector.persist_dir".to_string(),
                    )
                })?;
                Box::new(DiskBackend::open(store_dir(snapshot.root(), dir)?)?)
            }
        };
        Self::with_backend(snapshot, embedder, backend, config.batch_size)
    }

    /// Build a searcher over an explicit backend, loading what it holds.
    ///
    /// Loaded records whose content no longer matches the live file are
    /// marked stale.
    pub fn with_backend(
        snapshot: Arc<Snapshot>,
        embedder: Arc<dyn EmbeddingFunction>,
        mut backend: Box<dyn VectorBackend>,
        batch_size: usize,
    ) -> Result<Self> {
        let mut index = VectorIndex::new(embedder.dimension());
        let mut orphaned = 0usize;
        for record in backend.list()? {
            // Files that left the snapshot can never be re-indexed.
            if snapshot.position(&record.key.file).is_none() {
                backend.remove(&record.storage_id())?;
                orphaned += 1;
                continue;
            }
            if let Some(previous) = index.upsert(record)? {
                debug!("Dropping superseded record for {}", previous.key);
                backend.remove(&previous.storage_id())?;
            }
        }

        let stale: Vec<ChunkKey> = index
            .records()
            .filter(|r| live_hash(&snapshot, &r.key).as_deref() != Some(r.content_hash.as_str()))
            .map(|r| r.key.clone())
            .collect();
        for key in &stale {
            index.mark_stale(key);
        }

        info!(
            "Vector index ({} backend, {} embedder): {} records loaded, {} stale, {} orphaned removed",
            backend.name(),
            embedder.name(),
            index.len(),
            stale.len(),
            orphaned
        );

        Ok(Self {
            snapshot,
            embedder,
            backend,
            index,
            batch_size: batch_size.max(1),
        })
    }

    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    pub fn vector_index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Embed and store chunks.
    ///
    /// Chunks whose key is already indexed with the same content hash are
    /// skipped. A chunk whose content matches any stored record reuses that
    /// vector. Everything else is embedded in batches.
    pub fn index(&mut self, chunks: &[Chunk]) -> Result<IndexStats> {
        let started = Instant::now();
        let mut stats = IndexStats::default();
        let mut pending: Vec<(&Chunk, String)> = Vec::new();

        for chunk in chunks {
            let key = chunk_key(chunk);
            let hash = content_hash(&chunk.content);
            let existing = self.index.get(&key);
            if existing.is_some_and(|r| r.content_hash == hash) && !self.index.is_stale(&key) {
                stats.unchanged += 1;
                continue;
            }
            if let Some(vector) = self.index.vector_for_hash(&hash).map(<[f32]>::to_vec) {
                self.store(chunk, key, hash, vector)?;
                stats.reused += 1;
                continue;
            }
            pending.push((chunk, hash));
        }

        // Identical text within this call is embedded once.
        let mut unique: Vec<&str> = Vec::new();
        let mut slot_of: HashMap<&str, usize> = HashMap::new();
        for (chunk, hash) in &pending {
            if !slot_of.contains_key(hash.as_str()) {
                slot_of.insert(hash.as_str(), unique.len());
                unique.push(chunk.content.as_str());
            }
        }

        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(unique.len());
        for batch in unique.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|t| t.to_string()).collect();
            let embedded = self
                .embedder
                .embed_batch(&texts)
                .map_err(|e| RepoError::Embedding(format!("{e:#}")))?;
            if embedded.len() != texts.len() {
                return Err(RepoError::Embedding(format!(
                    "expected {} vectors, got {}",
                    texts.len(),
                    embedded.len()
                )));
            }
            vectors.extend(embedded);
        }
        stats.embedded = unique.len();
        stats.reused += pending.len() - unique.len();

        for (chunk, hash) in &pending {
            let vector = vectors[slot_of[hash.as_str()]].clone();
            self.store(chunk, chunk_key(chunk), hash.clone(), vector)?;
        }

        info!(
            "Indexed {} chunks in {:?}: {} embedded, {} reused, {} unchanged",
            chunks.len(),
            started.elapsed(),
            stats.embedded,
            stats.reused,
            stats.unchanged
        );
        Ok(stats)
    }

    fn store(&mut self, chunk: &Chunk, key: ChunkKey, hash: String, vector: Vec<f32>) -> Result<()> {
        let record = EmbeddingRecord {
            key,
            vector,
            content_hash: hash,
            content: chunk.content.clone(),
            symbol: chunk.symbol.clone(),
            seq: self.index.next_seq(),
            indexed_at: Utc::now(),
        };
        if let Some(previous) = self.index.upsert(record)? {
            self.backend.remove(&previous.storage_id())?;
        }
        if let Some(stored) = self.index.get(&chunk_key(chunk)) {
            self.backend.put(stored)?;
        }
        Ok(())
    }

    /// Top `top_k` live records for `query`.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SemanticHit>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let vector = self
            .embedder
            .embed(query)
            .map_err(|e| RepoError::Embedding(format!("{e:#}")))?;
        let hits = self.index.search(&vector, top_k)?;
        debug!("Semantic search '{}': {} hits", query, hits.len());
        Ok(hits)
    }
}

/// Absolute store directory for `dir`, rejected when it lies inside `root`.
///
/// `..` is folded first and symlinks are resolved on the longest existing
/// ancestor, so an alias of the root is caught before anything is created.
fn store_dir(root: &Path, dir: &Path) -> Result<PathBuf> {
    let absolute = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()?.join(dir)
    };

    let mut lexical = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                lexical.pop();
            }
            Component::CurDir => {}
            other => lexical.push(other),
        }
    }

    let resolved = match lexical.ancestors().find(|a| a.exists()) {
        Some(existing) => {
            let rest = lexical.strip_prefix(existing).unwrap_or(Path::new(""));
            std::fs::canonicalize(existing)?.join(rest)
        }
        None => lexical.clone(),
    };

    if resolved.starts_with(root) {
        return Err(RepoError::Configuration(format!(
            "vector.persist_dir {} is inside the repository root {}",
            resolved.display(),
            root.display()
        )));
    }
    Ok(resolved)
}

fn chunk_key(chunk: &Chunk) -> ChunkKey {
    ChunkKey {
        file: chunk.file.clone(),
        start_line: chunk.start_line,
        end_line: chunk.end_line,
    }
}

/// Hash of the live text for `key`, or `None` when the file is gone, is not
/// text or is shorter than the range.
fn live_hash(snapshot: &Snapshot, key: &ChunkKey) -> Option<String> {
    if key.start_line == 0 || key.end_line < key.start_line {
        return None;
    }
    let content = match snapshot.read_to_string(&key.file) {
        Ok(content) => content,
        Err(e) => {
            warn!("Cannot verify stored record {}: {}", key, e);
            return None;
        }
    };
    let lines: Vec<&str> = content.lines().collect();
    if key.end_line > lines.len() {
        return None;
    }
    Some(content_hash(&lines[key.start_line - 1..key.end_line].join("\n")))
}
