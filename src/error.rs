//! Error types for repolens.

/// Errors raised by operations addressed at a single file or resource.
///
/// Whole-repository scans never return these for per-file problems; those are
/// logged and recorded in a [`ScanReport`](crate::indexer::ScanReport) instead.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// The path is not part of the snapshot.
    #[error("path not found in snapshot: {0}")]
    NotFound(String),

    /// The path resolves outside the snapshot root.
    #[error("path escapes the repository root: {0}")]
    OutsideRoot(String),

    /// The grammar for a file could not produce a syntax tree.
    #[error("failed to parse {path}: {reason}")]
    ParseFailure { path: String, reason: String },

    /// Missing or contradictory configuration (e.g. no embedding function).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Graph export requested in a format we cannot write.
    #[error("unsupported export format '{0}' (supported: dot, json, adjacency)")]
    UnsupportedFormat(String),

    /// The file is not valid UTF-8 text.
    #[error("file is not valid UTF-8 text: {0}")]
    Decoding(String),

    /// An embedding does not have the index's fixed dimensionality.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The injected embedding function failed.
    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("walk error: {0}")]
    Walk(#[from] ignore::Error),
}

/// Result type alias using `RepoError`.
pub type Result<T> = std::result::Result<T, RepoError>;
