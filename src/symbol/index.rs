//! The repository-wide symbol map and the indexer that memoizes it.

use rayon::prelude::*;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::{Symbol, SymbolKind};
use crate::config::IndexerConfig;
use crate::error::Result;
use crate::indexer::ast::{ImportRef, ParsedFile, SymbolParser};
use crate::indexer::report::{ProcessingStage, ScanReport};
use crate::indexer::tree::FileTreeNode;
use crate::snapshot::Snapshot;

/// Symbols and imports of one recognized file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub path: String,
    pub language: &'static str,
    pub symbols: Vec<Symbol>,
    pub imports: Vec<ImportRef>,
}

/// File path to ordered symbols, in snapshot order.
///
/// Serializes as a JSON object `{ "path": [symbol, ...], ... }`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoMap {
    files: Vec<FileEntry>,
    positions: HashMap<String, usize>,
}

impl RepoMap {
    pub fn from_entries(files: Vec<FileEntry>) -> Self {
        let positions = files
            .iter()
            .enumerate()
            .map(|(i, f)| (f.path.clone(), i))
            .collect();
        Self { files, positions }
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.positions.get(path).map(|&i| &self.files[i])
    }

    pub fn symbols_for(&self, path: &str) -> Option<&[Symbol]> {
        self.get(path).map(|f| f.symbols.as_slice())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.positions.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.path.as_str())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn symbol_count(&self) -> usize {
        self.files.iter().map(|f| f.symbols.len()).sum()
    }

    /// Every symbol, file by file.
    pub fn all_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.files.iter().flat_map(|f| f.symbols.iter())
    }

    /// Find symbols by exact name
    pub fn find_by_name(&self, name: &str) -> Vec<&Symbol> {
        self.all_symbols().filter(|s| s.name == name).collect()
    }

    /// Find symbols by case-insensitive name prefix
    pub fn find_by_prefix(&self, prefix: &str) -> Vec<&Symbol> {
        let prefix = prefix.to_lowercase();
        self.all_symbols()
            .filter(|s| s.name.to_lowercase().starts_with(&prefix))
            .collect()
    }

    pub fn find_by_kind(&self, kind: SymbolKind) -> Vec<&Symbol> {
        self.all_symbols().filter(|s| s.kind == kind).collect()
    }
}

impl Serialize for RepoMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.files.len()))?;
        for entry in &self.files {
            map.serialize_entry(&entry.path, &entry.symbols)?;
        }
        map.end()
    }
}

/// Where a symbol is defined or mentioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolUsage {
    pub file: String,
    pub line: usize,
    /// Set for definitions, absent for plain text hits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<SymbolKind>,
    pub context: String,
}

enum ScanOutcome {
    Parsed(FileEntry),
    Unrecognized,
    Failed(ProcessingStage, String),
}

/// Builds symbols for one snapshot and caches the full map.
///
/// The cache is an explicit cell: `None` until the first full scan, replaced
/// wholesale by [`rescan`](Self::rescan). Population needs `&mut self`;
/// concurrent readers share `&self` once it is populated.
pub struct SymbolIndexer {
    snapshot: Arc<Snapshot>,
    parallel_threads: Option<usize>,
    cache: Option<RepoMap>,
    last_report: Option<ScanReport>,
}

impl SymbolIndexer {
    pub fn new(snapshot: Arc<Snapshot>, config: &IndexerConfig) -> Self {
        Self {
            snapshot,
            parallel_threads: config.parallel_threads,
            cache: None,
            last_report: None,
        }
    }

    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    /// Tree view of the snapshot with live sizes. Never touches the cache.
    pub fn get_file_tree(&self) -> FileTreeNode {
        FileTreeNode::from_snapshot(&self.snapshot)
    }

    /// Symbols of one file (parsed fresh) or of the whole repository.
    ///
    /// With a path: `NotFound` if it is not in the snapshot, an empty list for
    /// unrecognized extensions, `ParseFailure` if no tree could be built.
    /// Without: the union over the cached map, scanning first if needed.
    pub fn extract_symbols(&mut self, file: Option<&str>) -> Result<Vec<Symbol>> {
        match file {
            Some(path) => Ok(self
                .parse_file(path)?
                .map(|parsed| parsed.symbols)
                .unwrap_or_default()),
            None => Ok(self.get_repo_map().all_symbols().cloned().collect()),
        }
    }

    /// Parse a single file without consulting or updating the cache.
    pub fn parse_file(&self, path: &str) -> Result<Option<ParsedFile>> {
        let file = self.snapshot.resolve(path)?;
        let mut parser = SymbolParser::new();
        if !parser.recognizes(&file.path) {
            return Ok(None);
        }
        let source = self.snapshot.read_to_string(&file.path)?;
        parser.parse(&file.path, &source)
    }

    /// Symbols for one file: from the cache when populated, else parsed.
    pub fn symbols_for(&self, path: &str) -> Result<Vec<Symbol>> {
        let normalized = self.snapshot.resolve(path)?.path.clone();
        if let Some(map) = &self.cache {
            return Ok(map
                .symbols_for(&normalized)
                .map(<[Symbol]>::to_vec)
                .unwrap_or_default());
        }
        Ok(self
            .parse_file(&normalized)?
            .map(|parsed| parsed.symbols)
            .unwrap_or_default())
    }

    /// Build the map on first call and return the memoized value afterwards.
    pub fn get_repo_map(&mut self) -> &RepoMap {
        if self.cache.is_none() {
            let (map, report) = self.scan();
            self.last_report = Some(report);
            self.cache = Some(map);
        }
        self.cache.get_or_insert_with(RepoMap::default)
    }

    /// Read-only peek at the cache.
    pub fn repo_map(&self) -> Option<&RepoMap> {
        self.cache.as_ref()
    }

    pub fn is_populated(&self) -> bool {
        self.cache.is_some()
    }

    /// Drop the cache; the next access rescans.
    pub fn invalidate(&mut self) {
        self.cache = None;
        self.last_report = None;
    }

    /// Re-parse every file and replace the cache.
    pub fn rescan(&mut self) -> &RepoMap {
        self.invalidate();
        self.get_repo_map()
    }

    /// Per-file failures of the most recent full scan.
    pub fn last_report(&self) -> Option<&ScanReport> {
        self.last_report.as_ref()
    }

    fn scan(&self) -> (RepoMap, ScanReport) {
        let started = Instant::now();
        let snapshot = Arc::clone(&self.snapshot);
        let run = || {
            snapshot
                .files()
                .par_iter()
                .map_init(SymbolParser::new, |parser, file| {
                    scan_file(&snapshot, parser, &file.path)
                })
                .collect::<Vec<_>>()
        };

        let outcomes = match self.parallel_threads {
            Some(threads) => match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => pool.install(run),
                Err(e) => {
                    warn!("Failed to build a {}-thread pool, using the global one: {}", threads, e);
                    run()
                }
            },
            None => run(),
        };

        let mut report = ScanReport::default();
        let mut entries = Vec::new();
        for (file, outcome) in self.snapshot.files().iter().zip(outcomes) {
            match outcome {
                ScanOutcome::Parsed(entry) => {
                    report.parsed += 1;
                    entries.push(entry);
                }
                ScanOutcome::Unrecognized => report.unrecognized += 1,
                ScanOutcome::Failed(stage, error) => {
                    warn!("Skipping {} ({} failed): {}", file.path, stage, error);
                    report.record(file.path.clone(), stage, error);
                }
            }
        }

        let map = RepoMap::from_entries(entries);
        info!(
            "Indexed {} symbols across {} files in {:?}: {}",
            map.symbol_count(),
            map.len(),
            started.elapsed(),
            report.summary()
        );
        (map, report)
    }
}

fn scan_file(snapshot: &Snapshot, parser: &mut SymbolParser, path: &str) -> ScanOutcome {
    if !parser.recognizes(path) {
        debug!("No grammar for {}", path);
        return ScanOutcome::Unrecognized;
    }
    let bytes = match snapshot.read_bytes(path) {
        Ok(bytes) => bytes,
        Err(e) => return ScanOutcome::Failed(ProcessingStage::Read, e.to_string()),
    };
    let source = match String::from_utf8(bytes) {
        Ok(source) => source,
        Err(e) => return ScanOutcome::Failed(ProcessingStage::Decode, e.to_string()),
    };
    match parser.parse(path, &source) {
        Ok(Some(parsed)) => ScanOutcome::Parsed(FileEntry {
            path: path.to_string(),
            language: parsed.language,
            symbols: parsed.symbols,
            imports: parsed.imports,
        }),
        Ok(None) => ScanOutcome::Unrecognized,
        Err(e) => ScanOutcome::Failed(ProcessingStage::Parse, e.to_string()),
    }
}
