//! Repository walking, parsing and chunking.

pub mod ast;
pub mod chunker;
pub mod report;
pub mod tree;
pub mod walker;

pub use ast::{ImportRef, ParsedFile, ParserPool, SymbolParser};
pub use chunker::{Chunk, Chunker, SymbolRef};
pub use report::{FileError, ProcessingStage, ScanReport};
pub use tree::{FileTreeEntry, FileTreeNode, NodeType};
pub use walker::{WalkedFile, Walker};
