use anyhow::Result;

/// Maps text to a fixed-length vector.
///
/// Implemented by callers for whatever model or client they use; any closure
/// `Fn(&str) -> Vec<f32>` works as-is. Identical text is assumed to produce
/// the same vector, but this is not checked.
pub trait EmbeddingFunction: Send + Sync {
    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, returning one vector per input in order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Declared dimensionality, if known up front. When `None` the first
    /// vector produced fixes it.
    fn dimension(&self) -> Option<usize> {
        None
    }

    /// Name for logging
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> EmbeddingFunction for F
where
    F: Fn(&str) -> Vec<f32> + Send + Sync,
{
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self(text))
    }

    fn name(&self) -> &str {
        "closure"
    }
}
