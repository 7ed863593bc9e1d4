//! Embedding functions: the caller-supplied text -> vector mapping.

pub mod mock;
mod provider;

pub use mock::MockEmbedder;
pub use provider::EmbeddingFunction;
