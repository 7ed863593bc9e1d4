//! Text and semantic search over a snapshot.
//!
//! - `text` - line-oriented literal / regex search with glob file filters
//! - `vector` - cosine-similarity search over embedded chunks

pub mod text;
pub mod vector;

use serde::{Deserialize, Serialize};

pub use text::{SearchHit, SearchOptions, TextSearcher};
pub use vector::{IndexStats, SemanticHit, VectorIndex, VectorSearcher};

/// How a text query is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Regex when the query contains regex metacharacters, literal otherwise.
    #[default]
    Auto,
    Literal,
    Regex,
}

impl std::fmt::Display for QueryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Literal => write!(f, "literal"),
            Self::Regex => write!(f, "regex"),
        }
    }
}
