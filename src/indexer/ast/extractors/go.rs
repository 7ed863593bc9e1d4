//! Go extractor.
//!
//! Methods are declared outside their receiver type, so they stay top-level
//! and carry the receiver in `parent_name`.

use tree_sitter::{Node, Tree, TreeCursor};

use super::{
    field_text, header_before_body, leading_comments, node_text, start_line, symbol_at, unquote,
    ImportRef, LanguageExtractor,
};
use crate::symbol::{Symbol, SymbolKind};

pub struct GoExtractor;

impl LanguageExtractor for GoExtractor {
    fn language_id(&self) -> &'static str {
        "go"
    }

    fn extract_symbols(&self, tree: &Tree, source: &[u8]) -> Vec<Symbol> {
        let mut symbols = Vec::new();
        let root = tree.root_node();
        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            match node.kind() {
                "function_declaration" => {
                    symbols.extend(function(&node, source, SymbolKind::Function));
                }
                "method_declaration" => {
                    if let Some(mut symbol) = function(&node, source, SymbolKind::Method) {
                        symbol.parent_name = receiver_type(&node, source);
                        symbols.push(symbol);
                    }
                }
                "type_declaration" => specs(&node, source, "type_spec", &mut symbols),
                "const_declaration" => specs(&node, source, "const_spec", &mut symbols),
                "var_declaration" => specs(&node, source, "var_spec", &mut symbols),
                _ => {}
            }
        }
        symbols
    }

    fn extract_imports(&self, tree: &Tree, source: &[u8]) -> Vec<ImportRef> {
        let mut imports = Vec::new();
        let mut cursor = tree.walk();
        collect_imports(&mut cursor, source, &mut imports);
        imports
    }

    fn target_node_types(&self) -> &[&'static str] {
        &[
            "function_declaration",
            "method_declaration",
            "type_spec",
            "const_spec",
            "var_spec",
        ]
    }
}

fn function(node: &Node, source: &[u8], kind: SymbolKind) -> Option<Symbol> {
    let name = field_text(node, "name", source)?;
    let mut symbol = symbol_at(node, source, kind, name);
    symbol.signature = header_before_body(node, source);
    symbol.docs = go_doc(node, source);
    Some(symbol)
}

/// Emit one symbol per spec. A declaration holding a single spec spans the
/// whole declaration so the `type` / `const` keyword is included.
fn specs(declaration: &Node, source: &[u8], spec_kind: &str, symbols: &mut Vec<Symbol>) {
    let mut specs = Vec::new();
    collect_specs(declaration, spec_kind, &mut specs);
    let single = specs.len() == 1;

    for spec in specs {
        let Some(name) = field_text(&spec, "name", source) else {
            continue;
        };
        let kind = match spec_kind {
            "type_spec" if spec.kind() == "type_alias" => SymbolKind::TypeAlias,
            "type_spec" => match spec.child_by_field_name("type").map(|t| t.kind()) {
                Some("struct_type") => SymbolKind::Struct,
                Some("interface_type") => SymbolKind::Interface,
                _ => SymbolKind::TypeAlias,
            },
            "const_spec" => SymbolKind::Constant,
            _ => SymbolKind::Variable,
        };
        let span = if single { *declaration } else { spec };
        let mut symbol = symbol_at(&span, source, kind, name);
        symbol.docs = go_doc(&span, source);
        symbols.push(symbol);
    }
}

fn collect_specs<'tree>(node: &Node<'tree>, spec_kind: &str, out: &mut Vec<Node<'tree>>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == spec_kind || (spec_kind == "type_spec" && child.kind() == "type_alias") {
            out.push(child);
        } else if child.kind().ends_with("_list") {
            collect_specs(&child, spec_kind, out);
        }
    }
}

fn go_doc(node: &Node, source: &[u8]) -> Option<String> {
    leading_comments(node, source, |text| text.starts_with("//"))
}

fn receiver_type(node: &Node, source: &[u8]) -> Option<String> {
    let receiver = node.child_by_field_name("receiver")?;
    let mut cursor = receiver.walk();
    let parameter = receiver
        .named_children(&mut cursor)
        .find(|c| c.kind() == "parameter_declaration")?;
    let type_node = parameter.child_by_field_name("type")?;
    let text = node_text(&type_node, source).trim_start_matches('*');
    // Drop type parameters: `List[T]` -> `List`.
    Some(text.split('[').next().unwrap_or(text).to_string())
}

fn collect_imports(cursor: &mut TreeCursor, source: &[u8], imports: &mut Vec<ImportRef>) {
    let node = cursor.node();
    if node.kind() == "import_spec" {
        if let Some(path) = field_text(&node, "path", source) {
            imports.push(ImportRef {
                target: unquote(path),
                names: Vec::new(),
                alias: field_text(&node, "name", source).map(str::to_string),
                line: start_line(&node),
            });
        }
        return;
    }

    if cursor.goto_first_child() {
        loop {
            collect_imports(cursor, source, imports);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
        cursor.goto_parent();
    }
}
