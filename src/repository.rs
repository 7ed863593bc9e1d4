//! The repository facade: one snapshot, lazily built views.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::embeddings::EmbeddingFunction;
use crate::error::{RepoError, Result};
use crate::graph::builder::parse_go_module;
use crate::graph::{Cycle, DependencyGraph, ExportFormat, GraphBuilder};
use crate::indexer::{Chunk, Chunker, FileTreeNode};
use crate::search::{IndexStats, SearchHit, SearchOptions, SemanticHit, TextSearcher, VectorSearcher};
use crate::snapshot::Snapshot;
use crate::symbol::{RepoMap, Symbol, SymbolIndexer, SymbolKind, SymbolUsage};

/// Combined file tree and symbol map.
#[derive(Debug, Serialize)]
pub struct RepoIndex<'a> {
    pub files: FileTreeNode,
    pub symbols: &'a RepoMap,
}

/// Entry point tying the views of one snapshot together.
///
/// Every view is built on first use and cached until [`rescan`](Self::rescan).
/// Methods that populate a cache take `&mut self`.
pub struct Repository {
    config: Config,
    snapshot: Arc<Snapshot>,
    /// Set when the snapshot came from a caller-supplied listing
    listed: bool,
    symbols: SymbolIndexer,
    text: TextSearcher,
    chunker: Chunker,
    graph: Option<DependencyGraph>,
    embedder: Option<Arc<dyn EmbeddingFunction>>,
    vector: Option<VectorSearcher>,
}

impl Repository {
    /// Open `root` with the configuration found in `<root>/.repolens/config.toml`
    /// (defaults when absent).
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let config =
            Config::load(root).map_err(|e| RepoError::Configuration(format!("{e:#}")))?;
        Self::open_with_config(root, config)
    }

    pub fn open_with_config(root: impl AsRef<Path>, config: Config) -> Result<Self> {
        let snapshot = Snapshot::scan(root, &config.indexer)?;
        Ok(Self::assemble(Arc::new(snapshot), config, false))
    }

    /// Wrap a snapshot supplied by the caller.
    pub fn from_snapshot(snapshot: Snapshot, config: Config) -> Self {
        Self::assemble(Arc::new(snapshot), config, true)
    }

    fn assemble(snapshot: Arc<Snapshot>, config: Config, listed: bool) -> Self {
        Self {
            symbols: SymbolIndexer::new(Arc::clone(&snapshot), &config.indexer),
            text: TextSearcher::new(Arc::clone(&snapshot), &config.search),
            chunker: Chunker::new(&config.chunker),
            graph: None,
            embedder: None,
            vector: None,
            snapshot,
            listed,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    pub fn root(&self) -> &Path {
        self.snapshot.root()
    }

    /// Absolute path for a repository-relative path.
    pub fn abs_path(&self, relative: &str) -> Result<PathBuf> {
        let normalized = self.snapshot.normalize(relative)?;
        Ok(self.snapshot.abs_path(&normalized))
    }

    /// Take a fresh snapshot and drop every cached view.
    ///
    /// Opened repositories are walked again; caller-supplied listings are
    /// kept but re-read. A configured embedding function is kept.
    pub fn rescan(&mut self) -> Result<()> {
        let snapshot = if self.listed {
            Snapshot::from_files(self.snapshot.root(), self.snapshot.paths())?
        } else {
            Snapshot::scan(self.snapshot.root(), &self.config.indexer)?
        };
        info!("Rescanned {}: {} files", snapshot.root().display(), snapshot.len());

        let embedder = self.embedder.take();
        *self = Self::assemble(Arc::new(snapshot), self.config.clone(), self.listed);
        self.embedder = embedder;
        Ok(())
    }

    pub fn get_file_tree(&self) -> FileTreeNode {
        self.symbols.get_file_tree()
    }

    pub fn extract_symbols(&mut self, file: Option<&str>) -> Result<Vec<Symbol>> {
        self.symbols.extract_symbols(file)
    }

    pub fn get_repo_map(&mut self) -> &RepoMap {
        self.symbols.get_repo_map()
    }

    pub fn symbol_indexer(&self) -> &SymbolIndexer {
        &self.symbols
    }

    pub fn search_text(&self, query: &str, file_pattern: &str) -> Result<Vec<SearchHit>> {
        self.text.search_text(query, file_pattern)
    }

    pub fn search_text_with(
        &self,
        query: &str,
        file_pattern: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>> {
        self.text.search_with_options(query, file_pattern, options)
    }

    /// Line windows of a snapshot file; `None` uses the configured size.
    pub fn chunk_file_by_lines(&self, file: &str, max_lines: Option<usize>) -> Result<Vec<Chunk>> {
        let (path, content) = self.read(file)?;
        let max_lines = max_lines.unwrap_or(self.chunker.max_lines());
        Ok(self.chunker.chunk_by_lines(&path, &content, max_lines))
    }

    pub fn chunk_file_by_symbols(&self, file: &str) -> Result<Vec<Chunk>> {
        let (path, content) = self.read(file)?;
        let symbols = self.symbols.symbols_for(&path)?;
        Ok(self.chunker.chunk_by_symbols(&path, &content, &symbols))
    }

    /// The enclosing symbol or a line window around `line`; `None` when the
    /// line is out of range.
    pub fn extract_context_around_line(&self, file: &str, line: usize) -> Result<Option<Chunk>> {
        let (path, content) = self.read(file)?;
        let symbols = self.symbols.symbols_for(&path)?;
        Ok(self
            .chunker
            .context_around_line(&path, &content, &symbols, line))
    }

    /// Content of a snapshot file as UTF-8 text.
    pub fn get_file_content(&self, file: &str) -> Result<String> {
        self.read(file).map(|(_, content)| content)
    }

    fn read(&self, file: &str) -> Result<(String, String)> {
        let path = self.snapshot.resolve(file)?.path.clone();
        let content = self.snapshot.read_to_string(&path)?;
        Ok((path, content))
    }

    /// Build the dependency graph from the symbol map on first call.
    pub fn build_dependency_graph(&mut self) -> &DependencyGraph {
        if self.graph.is_none() {
            let go_module = self
                .snapshot
                .read_to_string("go.mod")
                .ok()
                .and_then(|text| parse_go_module(&text));
            let builder = GraphBuilder::new(&self.config.graph).with_go_module(go_module);
            let graph = builder.build(self.symbols.get_repo_map());
            self.graph = Some(graph);
        }
        self.graph.get_or_insert_with(DependencyGraph::default)
    }

    pub fn find_cycles(&mut self) -> Vec<Cycle> {
        self.build_dependency_graph().find_cycles()
    }

    /// Write the graph as `dot`, `json` or `adjacency`. Unknown formats fail
    /// before anything is built or written.
    pub fn export_dependency_graph(&mut self, format: &str, path: impl AsRef<Path>) -> Result<()> {
        let format: ExportFormat = format.parse()?;
        self.build_dependency_graph().export(format, path.as_ref())
    }

    /// The vector searcher, created on first use.
    ///
    /// Passing an embedding function replaces the current one and reloads
    /// the index from its backend. Without one, an existing searcher (or a
    /// previously supplied function) is used; if there is neither this fails
    /// with [`RepoError::Configuration`].
    pub fn vector_searcher(
        &mut self,
        embedder: Option<Arc<dyn EmbeddingFunction>>,
    ) -> Result<&mut VectorSearcher> {
        if let Some(embedder) = embedder {
            self.embedder = Some(embedder);
            self.vector = None;
        }
        if self.vector.is_none() {
            let embedder = self.embedder.clone().ok_or_else(|| {
                RepoError::Configuration(
                    "an embedding function is required to build the vector index".to_string(),
                )
            })?;
            let searcher =
                VectorSearcher::new(Arc::clone(&self.snapshot), embedder, &self.config.vector)?;
            self.vector = Some(searcher);
        }
        self.vector
            .as_mut()
            .ok_or_else(|| RepoError::Configuration("vector searcher unavailable".to_string()))
    }

    /// Chunk every text file (by symbol where parsed, by lines otherwise)
    /// and index the chunks.
    pub fn build_semantic_index(&mut self) -> Result<IndexStats> {
        // Fail on a missing embedder before paying for a scan.
        self.vector_searcher(None)?;

        let mut chunks = Vec::new();
        let map = self.symbols.get_repo_map();
        for path in self.snapshot.paths() {
            let content = match self.snapshot.read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    debug!("Not embedding {}: {}", path, e);
                    continue;
                }
            };
            match map.symbols_for(path) {
                Some(symbols) if !symbols.is_empty() => {
                    chunks.extend(self.chunker.chunk_by_symbols(path, &content, symbols))
                }
                _ => chunks.extend(self.chunker.chunk_by_lines(
                    path,
                    &content,
                    self.chunker.max_lines(),
                )),
            }
        }
        chunks.retain(|c| !c.content.trim().is_empty());

        self.vector_searcher(None)?.index(&chunks)
    }

    /// Nearest chunks to `query`. Requires a vector searcher to have been
    /// configured.
    pub fn search_semantic(&mut self, query: &str, top_k: usize) -> Result<Vec<SemanticHit>> {
        self.vector_searcher(None)?.search(query, top_k)
    }

    /// Definitions named `name` (optionally of one kind), followed by every
    /// literal text occurrence of the name.
    pub fn find_symbol_usages(
        &mut self,
        name: &str,
        kind: Option<SymbolKind>,
    ) -> Result<Vec<SymbolUsage>> {
        let mut usages: Vec<SymbolUsage> = self
            .symbols
            .get_repo_map()
            .find_by_name(name)
            .into_iter()
            .filter(|s| kind.map_or(true, |k| s.kind == k))
            .map(|s| SymbolUsage {
                file: s.file.clone(),
                line: s.start_line,
                name: Some(s.name.clone()),
                kind: Some(s.kind),
                context: s.context.clone().unwrap_or_default(),
            })
            .collect();

        let options = SearchOptions {
            mode: crate::search::QueryMode::Literal,
            case_sensitive: true,
            context_lines: 0,
            max_results: None,
        };
        let hits = self.text.search_with_options(name, "*", &options)?;
        usages.extend(hits.into_iter().map(|hit| SymbolUsage {
            file: hit.file,
            line: hit.line,
            name: None,
            kind: None,
            context: hit.line_content,
        }));
        Ok(usages)
    }

    /// File tree plus the full symbol map.
    pub fn index(&mut self) -> RepoIndex<'_> {
        let files = self.get_file_tree();
        RepoIndex {
            files,
            symbols: self.symbols.get_repo_map(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbedder;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn repo(files: &[(&str, &str)]) -> (TempDir, Repository) {
        let dir = tempdir().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        let repo = Repository::open(dir.path()).unwrap();
        (dir, repo)
    }

    #[test]
    fn test_missing_files_are_not_found() {
        let (_dir, repo) = repo(&[("a.py", "x = 1\n")]);
        assert!(matches!(
            repo.chunk_file_by_lines("nope.py", None),
            Err(RepoError::NotFound(_))
        ));
        assert!(matches!(
            repo.get_file_content("../etc/passwd"),
            Err(RepoError::OutsideRoot(_))
        ));
        assert_eq!(repo.get_file_content("./a.py").unwrap(), "x = 1\n");
    }

    #[test]
    fn test_context_out_of_range_is_none() {
        let (_dir, repo) = repo(&[("a.py", "def f():\n    return 1\n")]);
        assert!(repo.extract_context_around_line("a.py", 3).unwrap().is_none());
        let chunk = repo.extract_context_around_line("a.py", 2).unwrap().unwrap();
        assert_eq!(chunk.symbol.unwrap().name, "f");
    }

    #[test]
    fn test_vector_searcher_requires_embedder() {
        let (_dir, mut repo) = repo(&[("a.py", "x = 1\n")]);
        assert!(matches!(
            repo.vector_searcher(None),
            Err(RepoError::Configuration(_))
        ));
        assert!(matches!(
            repo.search_semantic("x", 5),
            Err(RepoError::Configuration(_))
        ));

        repo.vector_searcher(Some(Arc::new(MockEmbedder::new(16)))).unwrap();
        let stats = repo.build_semantic_index().unwrap();
        assert_eq!(stats.embedded, 1);
        assert_eq!(repo.search_semantic("x", 5).unwrap().len(), 1);
    }

    #[test]
    fn test_unsupported_export_format_writes_nothing() {
        let (dir, mut repo) = repo(&[("a.py", "import b\n"), ("b.py", "")]);
        let out = dir.path().join("graph.graphml");
        assert!(matches!(
            repo.export_dependency_graph("graphml", &out),
            Err(RepoError::UnsupportedFormat(_))
        ));
        assert!(!out.exists());
    }

    #[test]
    fn test_rescan_replaces_views_and_keeps_embedder() {
        let (dir, mut repo) = repo(&[("a.py", "def a():\n    pass\n")]);
        repo.vector_searcher(Some(Arc::new(MockEmbedder::new(8)))).unwrap();
        assert_eq!(repo.get_repo_map().len(), 1);

        fs::write(dir.path().join("b.py"), "def b():\n    pass\n").unwrap();
        assert_eq!(repo.get_repo_map().len(), 1);

        repo.rescan().unwrap();
        assert_eq!(repo.get_repo_map().len(), 2);
        assert!(repo.vector_searcher(None).is_ok());
    }

    #[test]
    fn test_symbol_usages_and_index() {
        let (_dir, mut repo) = repo(&[
            ("lib.py", "def helper():\n    pass\n"),
            ("main.py", "from lib import helper\nhelper()\n"),
        ]);

        let usages = repo.find_symbol_usages("helper", Some(SymbolKind::Function)).unwrap();
        assert_eq!(usages[0].name.as_deref(), Some("helper"));
        assert_eq!(usages[0].file, "lib.py");
        assert_eq!(usages.len(), 4);
        assert!(repo
            .find_symbol_usages("helper", Some(SymbolKind::Class))
            .unwrap()
            .iter()
            .all(|u| u.name.is_none()));

        let index = repo.index();
        let json = serde_json::to_value(&index).unwrap();
        assert_eq!(json["symbols"]["lib.py"][0]["name"], "helper");
        assert_eq!(json["files"]["type"], "directory");
    }
}
