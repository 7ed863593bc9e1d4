//! repolens: a multi-view index over one repository snapshot.
//!
//! A [`Repository`] walks a directory once and exposes lazily built views
//! over that snapshot: the file tree, tree-sitter symbols, text search,
//! context chunks, an import dependency graph and a vector index fed by a
//! caller-supplied [`EmbeddingFunction`].

pub mod config;
pub mod embeddings;
pub mod error;
pub mod graph;
pub mod indexer;
pub mod logging;
pub mod repository;
pub mod search;
pub mod snapshot;
pub mod storage;
pub mod symbol;

pub use config::Config;
pub use embeddings::{EmbeddingFunction, MockEmbedder};
pub use error::{RepoError, Result};
pub use graph::{Cycle, DependencyEdge, DependencyGraph, DependencyNode, ExportFormat};
pub use indexer::{Chunk, FileTreeNode};
pub use repository::{RepoIndex, Repository};
pub use search::{QueryMode, SearchHit, SearchOptions, SemanticHit};
pub use snapshot::Snapshot;
pub use symbol::{RepoMap, Symbol, SymbolKind, SymbolUsage};
