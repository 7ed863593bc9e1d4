//! JavaScript / TypeScript extractor.
//!
//! One implementation serves the three grammars (javascript, typescript,
//! tsx); they share node names for everything extracted here.

use tree_sitter::{Node, Tree, TreeCursor};

use super::{
    binding_kind, field_text, header_before_body, leading_comments, node_text, start_line,
    symbol_at, unquote, ImportRef, LanguageExtractor,
};
use crate::symbol::{Symbol, SymbolKind};

pub struct TypeScriptExtractor {
    language: &'static str,
}

impl TypeScriptExtractor {
    pub fn javascript() -> Self {
        Self {
            language: "javascript",
        }
    }

    pub fn typescript() -> Self {
        Self {
            language: "typescript",
        }
    }

    pub fn tsx() -> Self {
        Self { language: "tsx" }
    }
}

impl LanguageExtractor for TypeScriptExtractor {
    fn language_id(&self) -> &'static str {
        self.language
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
        &[
            "function_declaration",
            "generator_function_declaration",
            "class_declaration",
            "abstract_class_declaration",
            "method_definition",
            "method_signature",
            "abstract_method_signature",
            "interface_declaration",
            "type_alias_declaration",
            "enum_declaration",
            "internal_module",
            "variable_declarator",
        ]
    }
}

fn visit(
    cursor: &mut TreeCursor,
    source: &[u8],
    symbols: &mut Vec<Symbol>,
    container: Option<SymbolKind>,
) {
    let node = cursor.node();
    let extracted = symbol_for(&node, source, container);
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

fn symbol_for(node: &Node, source: &[u8], container: Option<SymbolKind>) -> Option<Symbol> {
    let kind = match node.kind() {
        "function_declaration" | "generator_function_declaration" => SymbolKind::Function,
        "class_declaration" | "abstract_class_declaration" => SymbolKind::Class,
        "method_definition" | "method_signature" | "abstract_method_signature" => {
            SymbolKind::Method
        }
        "interface_declaration" => SymbolKind::Interface,
        "type_alias_declaration" => SymbolKind::TypeAlias,
        "enum_declaration" => SymbolKind::Enum,
        "internal_module" => SymbolKind::Module,
        "variable_declarator" if container.is_none() && is_top_level_declarator(node) => {
            return top_level_binding(node, source);
        }
        _ => return None,
    };

    let name = field_text(node, "name", source)?;
    let mut symbol = symbol_at(node, source, kind, name);
    symbol.docs = jsdoc(node, source);
    if matches!(kind, SymbolKind::Function | SymbolKind::Method) {
        symbol.signature = header_before_body(node, source);
    }
    Some(symbol)
}

/// `const x = ...` directly in the program, possibly behind `export`.
fn is_top_level_declarator(node: &Node) -> bool {
    let Some(declaration) = node.parent() else {
        return false;
    };
    if !matches!(
        declaration.kind(),
        "lexical_declaration" | "variable_declaration"
    ) {
        return false;
    }
    match declaration.parent() {
        Some(parent) if parent.kind() == "program" => true,
        Some(parent) if parent.kind() == "export_statement" => parent
            .parent()
            .map(|p| p.kind() == "program")
            .unwrap_or(false),
        _ => false,
    }
}

fn top_level_binding(declarator: &Node, source: &[u8]) -> Option<Symbol> {
    let name_node = declarator.child_by_field_name("name")?;
    if name_node.kind() != "identifier" {
        return None;
    }
    let name = node_text(&name_node, source);
    let declaration = declarator.parent()?;

    let is_function = declarator
        .child_by_field_name("value")
        .map(|v| {
            matches!(
                v.kind(),
                "arrow_function" | "function_expression" | "function" | "generator_function"
            )
        })
        .unwrap_or(false);

    let kind = if is_function {
        SymbolKind::Function
    } else {
        binding_kind(name)
    };
    // Single-declarator statements span the whole statement.
    let span = if declaration.named_child_count() == 1 {
        declaration
    } else {
        *declarator
    };
    let mut symbol = symbol_at(&span, source, kind, name);
    symbol.docs = jsdoc(&declaration, source);
    Some(symbol)
}

fn jsdoc(node: &Node, source: &[u8]) -> Option<String> {
    let anchor = match node.parent() {
        Some(parent) if parent.kind() == "export_statement" => parent,
        _ => *node,
    };
    leading_comments(&anchor, source, |text| text.starts_with("/**"))
}

fn collect_imports(cursor: &mut TreeCursor, source: &[u8], imports: &mut Vec<ImportRef>) {
    let node = cursor.node();
    match node.kind() {
        "import_statement" => {
            if let Some(target) = field_text(&node, "source", source) {
                let (names, alias) = import_clause(&node, source);
                imports.push(ImportRef {
                    target: unquote(target),
                    names,
                    alias,
                    line: start_line(&node),
                });
            }
            return;
        }
        "export_statement" => {
            if let Some(target) = field_text(&node, "source", source) {
                imports.push(ImportRef {
                    target: unquote(target),
                    names: Vec::new(),
                    alias: None,
                    line: start_line(&node),
                });
                return;
            }
        }
        "call_expression" => {
            if let Some(target) = dynamic_import(&node, source) {
                imports.push(ImportRef {
                    target,
                    names: Vec::new(),
                    alias: None,
                    line: start_line(&node),
                });
            }
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

/// Names bound by an import clause and the namespace alias, if any.
fn import_clause(statement: &Node, source: &[u8]) -> (Vec<String>, Option<String>) {
    let mut names = Vec::new();
    let mut alias = None;

    let mut walker = statement.walk();
    let Some(clause) = statement
        .named_children(&mut walker)
        .find(|c| c.kind() == "import_clause")
    else {
        return (names, alias);
    };

    let mut walker = clause.walk();
    for child in clause.named_children(&mut walker) {
        match child.kind() {
            "identifier" => names.push(node_text(&child, source).to_string()),
            "namespace_import" => {
                let mut inner = child.walk();
                alias = child
                    .named_children(&mut inner)
                    .find(|c| c.kind() == "identifier")
                    .map(|c| node_text(&c, source).to_string());
            }
            "named_imports" => {
                let mut inner = child.walk();
                for specifier in child.named_children(&mut inner) {
                    if specifier.kind() == "import_specifier" {
                        if let Some(name) = field_text(&specifier, "name", source) {
                            names.push(name.to_string());
                        }
                    }
                }
            }
            _ => {}
        }
    }
    (names, alias)
}

/// `require("x")` and `import("x")` with a literal argument.
fn dynamic_import(call: &Node, source: &[u8]) -> Option<String> {
    let function = call.child_by_field_name("function")?;
    let is_loader = match function.kind() {
        "import" => true,
        "identifier" => node_text(&function, source) == "require",
        _ => false,
    };
    if !is_loader {
        return None;
    }
    let arguments = call.child_by_field_name("arguments")?;
    let first = arguments.named_child(0)?;
    if first.kind() != "string" {
        return None;
    }
    Some(unquote(node_text(&first, source)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn parse(source: &str, typescript: bool) -> Tree {
        let mut parser = Parser::new();
        let language = if typescript {
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
        } else {
            tree_sitter_javascript::LANGUAGE.into()
        };
        parser
            .set_language(&language)
            .expect("Failed to set language");
        parser.parse(source, None).expect("Failed to parse")
    }

    #[test]
    fn test_javascript_symbols() {
        let source = r#"/** Adds numbers. */
export function add(a, b) {
  return a + b;
}

export const multiply = (a, b) => a * b;
const API_URL = "https://example.com";

class Calculator {
  constructor() { this.total = 0; }
  push(value) { this.total += value; }
}
"#;
        let tree = parse(source, false);
        let symbols = TypeScriptExtractor::javascript().extract_symbols(&tree, source.as_bytes());
        let summary: Vec<_> = symbols.iter().map(|s| (s.name.as_str(), s.kind)).collect();

        assert_eq!(
            summary,
            vec![
                ("add", SymbolKind::Function),
                ("multiply", SymbolKind::Function),
                ("API_URL", SymbolKind::Constant),
                ("Calculator", SymbolKind::Class),
                ("constructor", SymbolKind::Method),
                ("push", SymbolKind::Method),
            ]
        );
        assert_eq!(symbols[0].docs.as_deref(), Some("/** Adds numbers. */"));
        assert_eq!(symbols[0].signature.as_deref(), Some("function add(a, b)"));
    }

    #[test]
    fn test_typescript_declarations() {
        let source = r#"interface Shape {
  area(): number;
}
type Id = string;
enum Color { Red, Green }
namespace Geometry {
  export function unit(): number { return 1; }
}
"#;
        let tree = parse(source, true);
        let symbols = TypeScriptExtractor::typescript().extract_symbols(&tree, source.as_bytes());
        let summary: Vec<_> = symbols.iter().map(|s| (s.name.as_str(), s.kind)).collect();

        assert_eq!(
            summary,
            vec![
                ("Shape", SymbolKind::Interface),
                ("area", SymbolKind::Method),
                ("Id", SymbolKind::TypeAlias),
                ("Color", SymbolKind::Enum),
                ("Geometry", SymbolKind::Module),
                ("unit", SymbolKind::Function),
            ]
        );
    }

    #[test]
    fn test_imports() {
        let source = r#"import React, { useState as useS, useEffect } from "react";
import * as path from 'path';
import "./styles.css";
export { helper } from "./helpers";
const fs = require("fs");
const lazy = () => import("./lazy");
"#;
        let tree = parse(source, false);
        let imports = TypeScriptExtractor::javascript().extract_imports(&tree, source.as_bytes());

        let targets: Vec<_> = imports.iter().map(|i| i.target.as_str()).collect();
        assert_eq!(
            targets,
            vec!["react", "path", "./styles.css", "./helpers", "fs", "./lazy"]
        );
        assert_eq!(
            imports[0].names,
            vec!["React".to_string(), "useState".to_string(), "useEffect".to_string()]
        );
        assert_eq!(imports[1].alias.as_deref(), Some("path"));
        assert_eq!(imports[4].line, 5);
    }
}
