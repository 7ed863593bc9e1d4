//! Rust extractor.
//!
//! Symbols: function_item, function_signature_item, struct_item, union_item,
//! enum_item, trait_item, impl_item, mod_item, const_item, static_item,
//! type_item, macro_definition.
//! Imports: `use` declarations (brace lists expanded), body-less `mod foo;`
//! and `extern crate`.

use tree_sitter::{Node, Tree, TreeCursor};

use super::{
    field_text, header_before_body, leading_comments, start_line, symbol_at, ImportRef,
    LanguageExtractor,
};
use crate::symbol::{Symbol, SymbolKind};

pub struct RustExtractor;

impl LanguageExtractor for RustExtractor {
    fn language_id(&self) -> &'static str {
        "rust"
    }

    fn extract_symbols(&self, tree: &Tree, source: &[u8]) -> Vec<Symbol> {
        let mut symbols = Vec::new();
        let mut cursor = tree.walk();
        self.visit(&mut cursor, source, &mut symbols, None);
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
            "function_item",
            "function_signature_item",
            "struct_item",
            "union_item",
            "enum_item",
            "trait_item",
            "impl_item",
            "mod_item",
            "const_item",
            "static_item",
            "type_item",
            "macro_definition",
        ]
    }
}

impl RustExtractor {
    fn visit(
        &self,
        cursor: &mut TreeCursor,
        source: &[u8],
        symbols: &mut Vec<Symbol>,
        container: Option<SymbolKind>,
    ) {
        let node = cursor.node();
        let extracted = self.symbol_for(&node, source, container);
        let next_container = match &extracted {
            Some(symbol) if symbol.kind.is_container() => Some(symbol.kind),
            Some(_) => None,
            None => container,
        };
        if let Some(symbol) = extracted {
            symbols.push(symbol);
        }

        if cursor.goto_first_child() {
            loop {
                self.visit(cursor, source, symbols, next_container);
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
            cursor.goto_parent();
        }
    }

    fn symbol_for(
        &self,
        node: &Node,
        source: &[u8],
        container: Option<SymbolKind>,
    ) -> Option<Symbol> {
        let kind = match node.kind() {
            "function_item" | "function_signature_item" => {
                if matches!(container, Some(SymbolKind::Impl) | Some(SymbolKind::Trait)) {
                    SymbolKind::Method
                } else {
                    SymbolKind::Function
                }
            }
            "struct_item" | "union_item" => SymbolKind::Struct,
            "enum_item" => SymbolKind::Enum,
            "trait_item" => SymbolKind::Trait,
            "impl_item" => SymbolKind::Impl,
            "mod_item" => SymbolKind::Module,
            "const_item" | "static_item" => SymbolKind::Constant,
            "type_item" => SymbolKind::TypeAlias,
            "macro_definition" => SymbolKind::Macro,
            _ => return None,
        };

        let name = if kind == SymbolKind::Impl {
            // `impl Trait for Type` is named after Type.
            field_text(node, "type", source)?
        } else {
            field_text(node, "name", source)?
        };

        let mut symbol = symbol_at(node, source, kind, name);
        symbol.docs = leading_comments(node, source, |text| {
            text.starts_with("///") || text.starts_with("/**")
        });
        symbol.signature = match kind {
            SymbolKind::Function | SymbolKind::Method | SymbolKind::Impl | SymbolKind::Trait => {
                header_before_body(node, source)
            }
            _ => None,
        };
        Some(symbol)
    }
}

fn collect_imports(cursor: &mut TreeCursor, source: &[u8], imports: &mut Vec<ImportRef>) {
    let node = cursor.node();
    match node.kind() {
        "use_declaration" => {
            if let Some(argument) = field_text(&node, "argument", source) {
                let mut expanded = Vec::new();
                expand_use_tree("", argument, &mut expanded);
                for (target, alias) in expanded {
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
        "mod_item" if node.child_by_field_name("body").is_none() => {
            if let Some(name) = field_text(&node, "name", source) {
                imports.push(ImportRef {
                    target: format!("self::{name}"),
                    names: Vec::new(),
                    alias: None,
                    line: start_line(&node),
                });
            }
            return;
        }
        "extern_crate_declaration" => {
            if let Some(name) = field_text(&node, "name", source) {
                imports.push(ImportRef {
                    target: name.to_string(),
                    names: Vec::new(),
                    alias: field_text(&node, "alias", source).map(str::to_string),
                    line: start_line(&node),
                });
            }
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

/// Expand a use tree like `a::{b, c::{self, d as e}}` into full paths.
pub(crate) fn expand_use_tree(prefix: &str, tree: &str, out: &mut Vec<(String, Option<String>)>) {
    let tree = tree.trim();
    if let (Some(open), Some(close)) = (tree.find('{'), tree.rfind('}')) {
        if open < close {
            let head: String = tree[..open].split_whitespace().collect();
            let base = format!("{prefix}{head}");
            for part in split_top_level(&tree[open + 1..close]) {
                expand_use_tree(&base, part, out);
            }
            return;
        }
    }

    let (path, alias) = match tree.split_once(" as ") {
        Some((path, alias)) => (path, Some(alias.trim().to_string())),
        None => (tree, None),
    };
    let path: String = path.split_whitespace().collect();
    if path.is_empty() {
        return;
    }

    let full = if path == "self" {
        prefix.trim_end_matches("::").to_string()
    } else {
        format!("{prefix}{path}")
    };
    if !full.is_empty() {
        out.push((full, alias));
    }
}

fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}
