//! Per-language symbol and import extractors.
//!
//! Each extractor walks one grammar's syntax tree and reports the named
//! constructs it finds plus the file's static import statements. The
//! [`ExtractorRegistry`] maps language ids to implementations; extension
//! detection lives in [`ParserPool`](super::ParserPool).

pub mod go;
pub mod java;
pub mod python;
pub mod rust;
pub mod typescript;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Tree};

use crate::symbol::{Symbol, SymbolKind};

pub use go::GoExtractor;
pub use java::JavaExtractor;
pub use python::PythonExtractor;
pub use rust::RustExtractor;
pub use typescript::TypeScriptExtractor;

/// A static import as written in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRef {
    /// Module specifier in the language's own syntax
    /// (`pkg.mod`, `./util`, `crate::a::b`, `fmt`, `com.acme.Type`).
    pub target: String,
    /// Names pulled out of the module, when the statement lists them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// 1-based line of the statement.
    pub line: usize,
}

/// Capability set implemented once per grammar.
pub trait LanguageExtractor: Send + Sync {
    /// Language identifier (e.g. "rust", "python").
    fn language_id(&self) -> &'static str;

    /// Symbols in the tree. Order and parent links are normalized by the
    /// caller, so implementations may emit in any order.
    fn extract_symbols(&self, tree: &Tree, source: &[u8]) -> Vec<Symbol>;

    /// Static imports, in source order.
    fn extract_imports(&self, tree: &Tree, source: &[u8]) -> Vec<ImportRef>;

    /// Node kinds that produce symbols. Informational.
    fn target_node_types(&self) -> &[&'static str];
}

/// Registry of language-specific extractors.
pub struct ExtractorRegistry {
    extractors: HashMap<&'static str, Box<dyn LanguageExtractor>>,
}

impl ExtractorRegistry {
    /// Create a registry with all built-in extractors.
    pub fn new() -> Self {
        let mut registry = Self {
            extractors: HashMap::new(),
        };

        registry.register(Box::new(RustExtractor));
        registry.register(Box::new(PythonExtractor));
        registry.register(Box::new(GoExtractor));
        registry.register(Box::new(JavaExtractor));
        registry.register(Box::new(TypeScriptExtractor::javascript()));
        registry.register(Box::new(TypeScriptExtractor::typescript()));
        registry.register(Box::new(TypeScriptExtractor::tsx()));

        registry
    }

    pub fn get(&self, language: &str) -> Option<&dyn LanguageExtractor> {
        self.extractors.get(language).map(|e| e.as_ref())
    }

    /// Register (or replace) an extractor under its language id.
    pub fn register(&mut self, extractor: Box<dyn LanguageExtractor>) {
        self.extractors.insert(extractor.language_id(), extractor);
    }

    pub fn supported_languages(&self) -> Vec<&'static str> {
        let mut languages: Vec<_> = self.extractors.keys().copied().collect();
        languages.sort_unstable();
        languages
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Text of a node; empty when the range is not valid UTF-8.
pub fn node_text<'a>(node: &Node, source: &'a [u8]) -> &'a str {
    source
        .get(node.start_byte()..node.end_byte())
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
        .unwrap_or("")
}

/// 1-based line a node starts on.
pub fn start_line(node: &Node) -> usize {
    node.start_position().row + 1
}

/// Build a symbol spanning `node`. The file path and parent link are filled
/// in by the parser.
pub fn symbol_at(node: &Node, source: &[u8], kind: SymbolKind, name: &str) -> Symbol {
    let start = start_line(node);
    let mut end = node.end_position().row + 1;
    // A node ending at column 0 stops on the previous line.
    if node.end_position().column == 0 && end > start {
        end -= 1;
    }

    let context = node_text(node, source)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty());

    Symbol {
        name: name.to_string(),
        kind,
        file: String::new(),
        start_line: start,
        end_line: end,
        parent: None,
        parent_name: None,
        signature: None,
        docs: None,
        context,
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
    }
}

/// Text of `field` on `node`.
pub fn field_text<'a>(node: &Node, field: &str, source: &'a [u8]) -> Option<&'a str> {
    node.child_by_field_name(field)
        .map(|child| node_text(&child, source))
        .filter(|text| !text.is_empty())
}

/// Declaration header up to (not including) the `body` field, with
/// whitespace collapsed and trailing `{` / `:` removed.
pub fn header_before_body(node: &Node, source: &[u8]) -> Option<String> {
    let end = node
        .child_by_field_name("body")
        .map(|body| body.start_byte())
        .unwrap_or_else(|| node.end_byte());
    let raw = source
        .get(node.start_byte()..end)
        .and_then(|bytes| std::str::from_utf8(bytes).ok())?;

    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed
        .trim_end_matches(|c: char| c == '{' || c == ':' || c == ';' || c.is_whitespace())
        .to_string();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Consecutive comment siblings immediately before `node` that satisfy
/// `accept`, joined in source order.
pub fn leading_comments(node: &Node, source: &[u8], accept: fn(&str) -> bool) -> Option<String> {
    let mut docs = Vec::new();
    let mut expected_row = node.start_position().row;
    let mut prev = node.prev_sibling();

    while let Some(sibling) = prev {
        let kind = sibling.kind();
        if kind == "attribute_item" || kind == "marker_annotation" || kind == "decorator" {
            expected_row = sibling.start_position().row;
            prev = sibling.prev_sibling();
            continue;
        }
        if !kind.contains("comment") {
            break;
        }
        // Stop at a blank line between the comment and what follows it.
        if sibling.end_position().row + 1 < expected_row {
            break;
        }
        let text = node_text(&sibling, source);
        if !accept(text) {
            break;
        }
        docs.push(text.trim().to_string());
        expected_row = sibling.start_position().row;
        prev = sibling.prev_sibling();
    }

    if docs.is_empty() {
        None
    } else {
        docs.reverse();
        Some(docs.join("\n"))
    }
}

/// Strip one layer of matching quotes (`"`, `'` or backtick).
pub fn unquote(text: &str) -> String {
    let trimmed = text.trim();
    for quote in ['"', '\'', '`'] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].to_string();
        }
    }
    trimmed.to_string()
}

/// Module-level bindings written in upper case are constants.
pub fn binding_kind(name: &str) -> SymbolKind {
    let has_letter = name.chars().any(|c| c.is_alphabetic());
    if has_letter && !name.chars().any(|c| c.is_lowercase()) {
        SymbolKind::Constant
    } else {
        SymbolKind::Variable
    }
}
