//! Tree-sitter based symbol and import extraction.
//!
//! [`SymbolParser`] selects a grammar by file extension, runs the matching
//! [`LanguageExtractor`] and normalizes the result: symbols are ordered by
//! position and linked to their innermost enclosing symbol.

pub mod extractors;
pub mod parser_pool;

use std::cmp::Reverse;

use tracing::debug;

use crate::error::{RepoError, Result};
use crate::symbol::Symbol;

pub use extractors::{ExtractorRegistry, ImportRef, LanguageExtractor};
pub use parser_pool::ParserPool;

/// Symbols and imports of one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFile {
    pub language: &'static str,
    pub symbols: Vec<Symbol>,
    pub imports: Vec<ImportRef>,
}

/// Parses files into [`ParsedFile`]s.
pub struct SymbolParser {
    pool: ParserPool,
    registry: ExtractorRegistry,
}

impl SymbolParser {
    pub fn new() -> Self {
        Self {
            pool: ParserPool::new(),
            registry: ExtractorRegistry::new(),
        }
    }

    /// Register an extra extractor. Its language id must also be known to the
    /// parser pool for files to reach it.
    pub fn with_extractor(mut self, extractor: Box<dyn LanguageExtractor>) -> Self {
        self.registry.register(extractor);
        self
    }

    /// Language id for `path`, if a grammar and an extractor exist for it.
    pub fn language_for(&self, path: &str) -> Option<&'static str> {
        ParserPool::detect_language(path).filter(|lang| {
            self.pool.supports(lang) && self.registry.get(lang).is_some()
        })
    }

    pub fn recognizes(&self, path: &str) -> bool {
        self.language_for(path).is_some()
    }

    /// Parse one file.
    ///
    /// Returns `Ok(None)` for unrecognized extensions and
    /// [`RepoError::ParseFailure`] when no syntax tree could be produced.
    /// Trees with syntax errors still yield whatever symbols are intact.
    pub fn parse(&mut self, path: &str, source: &str) -> Result<Option<ParsedFile>> {
        let Some(language) = self.language_for(path) else {
            return Ok(None);
        };

        let parser = self
            .pool
            .get_parser(language)
            .ok_or_else(|| RepoError::ParseFailure {
                path: path.to_string(),
                reason: format!("no usable {language} grammar"),
            })?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| RepoError::ParseFailure {
                path: path.to_string(),
                reason: "parser produced no tree".to_string(),
            })?;

        if tree.root_node().has_error() {
            debug!("{} has syntax errors; extracting what parsed", path);
        }

        let extractor = self
            .registry
            .get(language)
            .ok_or_else(|| RepoError::ParseFailure {
                path: path.to_string(),
                reason: format!("no extractor for {language}"),
            })?;

        let symbols = extractor.extract_symbols(&tree, source.as_bytes());
        let imports = extractor.extract_imports(&tree, source.as_bytes());

        Ok(Some(ParsedFile {
            language,
            symbols: normalize(path, symbols),
            imports,
        }))
    }
}

impl Default for SymbolParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop unnamed symbols, order by position (outer before inner on equal
/// start) and set `file`, `parent` and `parent_name`.
fn normalize(path: &str, mut symbols: Vec<Symbol>) -> Vec<Symbol> {
    symbols.retain(|s| !s.name.trim().is_empty());
    symbols.sort_by_key(|s| (s.start_byte, Reverse(s.end_byte)));

    let mut open: Vec<usize> = Vec::new();
    for i in 0..symbols.len() {
        let (start, end) = (symbols[i].start_byte, symbols[i].end_byte);
        while let Some(&top) = open.last() {
            if symbols[top].start_byte <= start && end <= symbols[top].end_byte {
                break;
            }
            open.pop();
        }

        symbols[i].file = path.to_string();
        if let Some(&parent) = open.last() {
            let parent_name = symbols[parent].name.clone();
            symbols[i].parent = Some(parent);
            symbols[i].parent_name.get_or_insert(parent_name);
        }
        open.push(i);
    }
    symbols
}
