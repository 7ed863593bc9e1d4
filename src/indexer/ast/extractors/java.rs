//! Java extractor.
//!
//! Symbols: classes, records, interfaces, enums, annotation types, methods,
//! constructors and `static final` fields. Imports: single-type, wildcard
//! and static imports, kept in dotted form (`com.acme.*`).

use tree_sitter::{Node, Tree, TreeCursor};

use super::{
    field_text, header_before_body, leading_comments, node_text, start_line, symbol_at,
    ImportRef, LanguageExtractor,
};
use crate::symbol::{Symbol, SymbolKind};

pub struct JavaExtractor;

impl LanguageExtractor for JavaExtractor {
    fn language_id(&self) -> &'static str {
        "java"
    }

    fn extract_symbols(&self, tree: &Tree, source: &[u8]) -> Vec<Symbol> {
        let mut symbols = Vec::new();
        let mut cursor = tree.walk();
        visit(&mut cursor, source, &mut symbols);
        symbols
    }

    fn extract_imports(&self, tree: &Tree, source: &[u8]) -> Vec<ImportRef> {
        let root = tree.root_node();
        let mut cursor = root.walk();
        root.named_children(&mut cursor)
            .filter(|node| node.kind() == "import_declaration")
            .filter_map(|node| import(&node, source))
            .collect()
    }

    fn target_node_types(&self) -> &[&'static str] {
        &[
            "class_declaration",
            "record_declaration",
            "interface_declaration",
            "enum_declaration",
            "annotation_type_declaration",
            "method_declaration",
            "constructor_declaration",
            "field_declaration",
        ]
    }
}

fn visit(cursor: &mut TreeCursor, source: &[u8], symbols: &mut Vec<Symbol>) {
    let node = cursor.node();
    if let Some(symbol) = symbol_for(&node, source) {
        symbols.push(symbol);
    }

    if cursor.goto_first_child() {
        loop {
            visit(cursor, source, symbols);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
        cursor.goto_parent();
    }
}

fn symbol_for(node: &Node, source: &[u8]) -> Option<Symbol> {
    let kind = match node.kind() {
        "class_declaration" | "record_declaration" => SymbolKind::Class,
        "interface_declaration" | "annotation_type_declaration" => SymbolKind::Interface,
        "enum_declaration" => SymbolKind::Enum,
        "method_declaration" | "constructor_declaration" => SymbolKind::Method,
        "field_declaration" if is_constant(node, source) => {
            let declarator = node.child_by_field_name("declarator")?;
            let name = field_text(&declarator, "name", source)?;
            let mut symbol = symbol_at(node, source, SymbolKind::Constant, name);
            symbol.docs = javadoc(node, source);
            return Some(symbol);
        }
        _ => return None,
    };

    let name = field_text(node, "name", source)?;
    let mut symbol = symbol_at(node, source, kind, name);
    symbol.docs = javadoc(node, source);
    if kind == SymbolKind::Method {
        symbol.signature = header_before_body(node, source);
    }
    Some(symbol)
}

fn is_constant(field: &Node, source: &[u8]) -> bool {
    let mut cursor = field.walk();
    let modifiers = field
        .children(&mut cursor)
        .find(|c| c.kind() == "modifiers")
        .map(|m| node_text(&m, source))
        .unwrap_or("");
    let words: Vec<&str> = modifiers.split_whitespace().collect();
    words.contains(&"static") && words.contains(&"final")
}

fn javadoc(node: &Node, source: &[u8]) -> Option<String> {
    leading_comments(node, source, |text| text.starts_with("/**"))
}

fn import(node: &Node, source: &[u8]) -> Option<ImportRef> {
    let text = node_text(node, source)
        .trim()
        .trim_start_matches("import")
        .trim_end_matches(';')
        .trim();
    let (is_static, path) = match text.strip_prefix("static ") {
        Some(rest) => (true, rest.trim()),
        None => (false, text),
    };
    let path: String = path.split_whitespace().collect();
    if path.is_empty() {
        return None;
    }

    let names = if is_static {
        path.rsplit('.').next().map(|n| vec![n.to_string()]).unwrap_or_default()
    } else {
        Vec::new()
    };
    Some(ImportRef {
        target: path,
        names,
        alias: None,
        line: start_line(node),
    })
}
