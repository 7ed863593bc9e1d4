//! Python extractor.
//!
//! Symbols: function_definition, class_definition and module-level
//! assignments. Imports: `import a.b as c` and `from .x import y`.

use tree_sitter::{Node, Tree, TreeCursor};

use super::{
    binding_kind, field_text, header_before_body, node_text, start_line, symbol_at, ImportRef,
    LanguageExtractor,
};
use crate::symbol::{Symbol, SymbolKind};

pub struct PythonExtractor;

impl LanguageExtractor for PythonExtractor {
    fn language_id(&self) -> &'static str {
        "python"
    }

    fn extract_symbols(&self, tree: &Tree, source: &[u8]) -> Vec<Symbol> {
        let mut symbols = Vec::new();
        let mut cursor = tree.walk();
        visit(&mut cursor, source, &mut symbols, None);
        symbols
    }

    fn extract_imports(&self, tree: &Tree, source: &[u8]) -> Vec<ImportRef> {
        let mut imports = Vec::new();
        let mut cursor = tree.walk();
        collect_imports(&mut cursor, source, &mut imports);
        imports
    }

    fn target_node_types(&self) -> &[&'static str] {
        &["function_definition", "class_definition", "assignment"]
    }
}

fn visit(
    cursor: &mut TreeCursor,
    source: &[u8],
    symbols: &mut Vec<Symbol>,
    container: Option<SymbolKind>,
) {
    let node = cursor.node();
    let extracted = match node.kind() {
        "function_definition" => {
            let kind = if container == Some(SymbolKind::Class) {
                SymbolKind::Method
            } else {
                SymbolKind::Function
            };
            definition(&node, source, kind)
        }
        "class_definition" => definition(&node, source, SymbolKind::Class),
        "expression_statement" if is_module_level(&node) => module_binding(&node, source),
        _ => None,
    };

    let next_container = match &extracted {
        Some(symbol) => Some(symbol.kind),
        None => container,
    };
    if let Some(symbol) = extracted {
        symbols.push(symbol);
    }

    if cursor.goto_first_child() {
        loop {
            visit(cursor, source, symbols, next_container);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
        cursor.goto_parent();
    }
}

fn definition(node: &Node, source: &[u8], kind: SymbolKind) -> Option<Symbol> {
    let name = field_text(node, "name", source)?;
    let mut symbol = symbol_at(node, source, kind, name);
    symbol.signature = header_before_body(node, source);
    symbol.docs = docstring(node, source);
    Some(symbol)
}

fn is_module_level(node: &Node) -> bool {
    node.parent().map(|p| p.kind() == "module").unwrap_or(false)
}

/// `NAME = value` / `name: T = value` at module scope.
fn module_binding(statement: &Node, source: &[u8]) -> Option<Symbol> {
    let assignment = statement.named_child(0)?;
    if assignment.kind() != "assignment" {
        return None;
    }
    let left = assignment.child_by_field_name("left")?;
    if left.kind() != "identifier" {
        return None;
    }
    let name = node_text(&left, source);
    Some(symbol_at(statement, source, binding_kind(name), name))
}

fn docstring(node: &Node, source: &[u8]) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string = first.named_child(0)?;
    if string.kind() != "string" {
        return None;
    }
    let text = node_text(&string, source)
        .trim_start_matches(['r', 'R', 'u', 'U', 'b', 'B', 'f', 'F'])
        .trim_start_matches("\"\"\"")
        .trim_start_matches("'''")
        .trim_end_matches("\"\"\"")
        .trim_end_matches("'''")
        .trim_matches(|c: char| c == '"' || c == '\'')
        .trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn collect_imports(cursor: &mut TreeCursor, source: &[u8], imports: &mut Vec<ImportRef>) {
    let node = cursor.node();
    match node.kind() {
        "import_statement" => {
            let mut walker = node.walk();
            for child in node.children_by_field_name("name", &mut walker) {
                let (target, alias) = imported_name(&child, source);
                if !target.is_empty() {
                    imports.push(ImportRef {
                        target,
                        names: Vec::new(),
                        alias,
                        line: start_line(&node),
                    });
                }
            }
            return;
        }
        "import_from_statement" => {
            let Some(module) = field_text(&node, "module_name", source) else {
                return;
            };
            let mut names = Vec::new();
            let mut walker = node.walk();
            for child in node.children_by_field_name("name", &mut walker) {
                let (name, _) = imported_name(&child, source);
                names.push(name);
            }
            let mut walker = node.walk();
            if node
                .named_children(&mut walker)
                .any(|c| c.kind() == "wildcard_import")
            {
                names.push("*".to_string());
            }
            imports.push(ImportRef {
                target: module.to_string(),
                names,
                alias: None,
                line: start_line(&node),
            });
            return;
        }
        _ => {}
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

fn imported_name(node: &Node, source: &[u8]) -> (String, Option<String>) {
    if node.kind() == "aliased_import" {
        let name = field_text(node, "name", source).unwrap_or_default();
        let alias = field_text(node, "alias", source).map(str::to_string);
        (name.to_string(), alias)
    } else {
        (node_text(node, source).to_string(), None)
    }
}
