use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Result};
pub use repolens::MockEmbedder;
use repolens::EmbeddingFunction;

/// Embedder that fails every call after the first `budget` texts.
pub struct FailingEmbedder {
    inner: MockEmbedder,
    budget: usize,
    seen: AtomicUsize,
}

impl FailingEmbedder {
    pub fn new(dimension: usize, budget: usize) -> Self {
        Self {
            inner: MockEmbedder::new(dimension),
            budget,
            seen: AtomicUsize::new(0),
        }
    }
}

impl EmbeddingFunction for FailingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.seen.fetch_add(1, Ordering::SeqCst) >= self.budget {
            bail!("embedding service unavailable");
        }
        self.inner.embed(text)
    }

    fn name(&self) -> &str {
        "failing"
    }
}
