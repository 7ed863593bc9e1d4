//! Tree-sitter parsers keyed by language.

use std::collections::HashMap;

use tracing::debug;
use tree_sitter::{Language, Parser};

/// Owns one configured parser per language, created on first use.
///
/// A `Parser` is not `Sync`, so parallel scans give every worker its own pool.
pub struct ParserPool {
    parsers: HashMap<&'static str, Parser>,
    languages: HashMap<&'static str, Language>,
}

impl ParserPool {
    /// Create a pool that knows every bundled grammar.
    pub fn new() -> Self {
        let mut languages: HashMap<&'static str, Language> = HashMap::new();
        languages.insert("rust", tree_sitter_rust::LANGUAGE.into());
        languages.insert("python", tree_sitter_python::LANGUAGE.into());
        languages.insert("javascript", tree_sitter_javascript::LANGUAGE.into());
        languages.insert(
            "typescript",
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        );
        languages.insert("tsx", tree_sitter_typescript::LANGUAGE_TSX.into());
        languages.insert("go", tree_sitter_go::LANGUAGE.into());
        languages.insert("java", tree_sitter_java::LANGUAGE.into());

        Self {
            parsers: HashMap::new(),
            languages,
        }
    }

    /// Parser for `language`, or `None` when the grammar is unknown or
    /// incompatible with the linked tree-sitter runtime.
    pub fn get_parser(&mut self, language: &str) -> Option<&mut Parser> {
        let (&id, grammar) = self.languages.get_key_value(language)?;
        if !self.parsers.contains_key(id) {
            let mut parser = Parser::new();
            if let Err(e) = parser.set_language(grammar) {
                debug!("Failed to set language '{}' for parser: {:?}", language, e);
                return None;
            }
            self.parsers.insert(id, parser);
        }
        self.parsers.get_mut(id)
    }

    pub fn supports(&self, language: &str) -> bool {
        self.languages.contains_key(language)
    }

    /// Map a file extension to a language id.
    pub fn detect_language_from_extension(ext: &str) -> Option<&'static str> {
        match ext {
            "rs" => Some("rust"),
            "py" | "pyi" => Some("python"),
            "js" | "jsx" | "mjs" | "cjs" => Some("javascript"),
            "ts" | "mts" | "cts" => Some("typescript"),
            "tsx" => Some("tsx"),
            "go" => Some("go"),
            "java" => Some("java"),
            _ => None,
        }
    }

    /// Language id for a relative path, by extension.
    pub fn detect_language(path: &str) -> Option<&'static str> {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let (_, ext) = file_name.rsplit_once('.')?;
        Self::detect_language_from_extension(ext)
    }
}

impl Default for ParserPool {
    fn default() -> Self {
        Self::new()
    }
}
