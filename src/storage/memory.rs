use std::collections::HashMap;

use super::{EmbeddingRecord, VectorBackend};
use crate::error::Result;

/// Records held in process memory; gone when dropped.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: HashMap<String, EmbeddingRecord>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl VectorBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, id: &str) -> Result<Option<EmbeddingRecord>> {
        Ok(self.records.get(id).cloned())
    }

    fn put(&mut self, record: &EmbeddingRecord) -> Result<()> {
        self.records.insert(record.storage_id(), record.clone());
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<bool> {
        Ok(self.records.remove(id).is_some())
    }

    fn list(&self) -> Result<Vec<EmbeddingRecord>> {
        let mut records: Vec<_> = self.records.values().cloned().collect();
        records.sort_by_key(|r| r.seq);
        Ok(records)
    }
}
