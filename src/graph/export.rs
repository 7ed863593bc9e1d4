//! Graph rendering: DOT, JSON and adjacency lists, plus a DOT reader for
//! the subset we emit.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use tracing::info;

use super::{DependencyEdge, DependencyGraph, DependencyNode, NodeKind};
use crate::error::{RepoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Dot,
    Json,
    Adjacency,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dot => "dot",
            Self::Json => "json",
            Self::Adjacency => "adjacency",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dot" | "graphviz" => Ok(Self::Dot),
            "json" => Ok(Self::Json),
            "adjacency" | "adj" => Ok(Self::Adjacency),
            _ => Err(RepoError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize)]
struct JsonGraph<'a> {
    nodes: &'a [DependencyNode],
    edges: &'a [DependencyEdge],
}

impl DependencyGraph {
    pub fn render(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Dot => Ok(self.to_dot()),
            ExportFormat::Json => Ok(serde_json::to_string_pretty(&JsonGraph {
                nodes: &self.nodes,
                edges: &self.edges,
            })?),
            ExportFormat::Adjacency => Ok(serde_json::to_string_pretty(&self.adjacency())?),
        }
    }

    /// Write the rendered graph to `path`, creating parent directories.
    pub fn export(&self, format: ExportFormat, path: &Path) -> Result<()> {
        let rendered = self.render(format)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, rendered)?;
        info!("Exported dependency graph as {} to {}", format, path.display());
        Ok(())
    }

    /// Node id -> direct dependency ids.
    pub fn adjacency(&self) -> BTreeMap<String, Vec<String>> {
        (0..self.node_count())
            .map(|i| {
                let targets = self
                    .successors(i)
                    .into_iter()
                    .map(|t| self.nodes[t].id.clone())
                    .collect();
                (self.nodes[i].id.clone(), targets)
            })
            .collect()
    }

    /// Graphviz DOT text. Nodes first in first-seen order, then edges in
    /// insertion order; attributes only where set.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph dependencies {\n");
        for node in &self.nodes {
            let _ = match node.kind {
                NodeKind::Internal => writeln!(out, "  {};", quote(&node.id)),
                NodeKind::External => {
                    writeln!(out, "  {} [kind=\"external\"];", quote(&node.id))
                }
            };
        }
        for edge in &self.edges {
            let mut attrs = Vec::new();
            if let Some(line) = edge.line {
                attrs.push(format!("line=\"{line}\""));
            }
            if let Some(alias) = &edge.alias {
                attrs.push(format!("alias={}", quote(alias)));
            }
            let _ = if attrs.is_empty() {
                writeln!(out, "  {} -> {};", quote(&edge.source), quote(&edge.target))
            } else {
                writeln!(
                    out,
                    "  {} -> {} [{}];",
                    quote(&edge.source),
                    quote(&edge.target),
                    attrs.join(", ")
                )
            };
        }
        out.push_str("}\n");
        out
    }

    /// Parse DOT produced by [`to_dot`](Self::to_dot). Rendering the result
    /// gives back the same text byte for byte.
    pub fn from_dot(text: &str) -> Result<DependencyGraph> {
        let mut graph = DependencyGraph::new(true);
        let mut opened = false;

        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            if !opened {
                if line.starts_with("digraph") && line.ends_with('{') {
                    opened = true;
                    continue;
                }
                return Err(dot_error(number, "expected 'digraph <name> {'"));
            }
            if line == "}" {
                return Ok(graph);
            }

            let mut cursor = Cursor::new(line);
            let first = cursor
                .quoted()
                .ok_or_else(|| dot_error(number, "expected a quoted node id"))?;
            cursor.skip_ws();

            let target = if cursor.eat("->") {
                cursor.skip_ws();
                Some(
                    cursor
                        .quoted()
                        .ok_or_else(|| dot_error(number, "expected a quoted edge target"))?,
                )
            } else {
                None
            };
            cursor.skip_ws();
            let attrs = if cursor.peek() == Some('[') {
                cursor
                    .attributes()
                    .ok_or_else(|| dot_error(number, "malformed attribute list"))?
            } else {
                BTreeMap::new()
            };
            cursor.skip_ws();
            if !cursor.eat(";") {
                return Err(dot_error(number, "expected ';'"));
            }

            match target {
                None => {
                    let kind = match attrs.get("kind").map(String::as_str) {
                        Some("external") => NodeKind::External,
                        _ => NodeKind::Internal,
                    };
                    let path = (kind == NodeKind::Internal).then(|| first.clone());
                    graph.add_node(&first, kind, path);
                }
                Some(target) => {
                    let line = match attrs.get("line") {
                        Some(value) => Some(
                            value
                                .parse()
                                .map_err(|_| dot_error(number, "line is not a number"))?,
                        ),
                        None => None,
                    };
                    graph.add_edge(DependencyEdge {
                        source: first,
                        target,
                        line,
                        alias: attrs.get("alias").cloned(),
                    });
                }
            }
        }
        Err(dot_error(text.lines().count(), "missing closing '}'"))
    }
}

fn dot_error(line: usize, reason: &str) -> RepoError {
    RepoError::ParseFailure {
        path: "<dot>".to_string(),
        reason: format!("line {}: {}", line + 1, reason),
    }
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { rest: text }
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn eat(&mut self, token: &str) -> bool {
        match self.rest.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    /// A double-quoted string with `\"`, `\\` and `\n` escapes.
    fn quoted(&mut self) -> Option<String> {
        let mut chars = self.rest.char_indices();
        if chars.next()?.1 != '"' {
            return None;
        }
        let mut value = String::new();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.rest = &self.rest[i + 1..];
                    return Some(value);
                }
                '\\' => match chars.next()?.1 {
                    'n' => value.push('\n'),
                    other => value.push(other),
                },
                c => value.push(c),
            }
        }
        None
    }

    /// `[key="value", key2="value2"]`
    fn attributes(&mut self) -> Option<BTreeMap<String, String>> {
        if !self.eat("[") {
            return None;
        }
        let mut attrs = BTreeMap::new();
        loop {
            self.skip_ws();
            if self.eat("]") {
                return Some(attrs);
            }
            let key_len = self
                .rest
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))?;
            if key_len == 0 {
                return None;
            }
            let key = self.rest[..key_len].to_string();
            self.rest = &self.rest[key_len..];
            self.skip_ws();
            if !self.eat("=") {
                return None;
            }
            self.skip_ws();
            let value = self.quoted()?;
            attrs.insert(key, value);
            self.skip_ws();
            self.eat(",");
        }
    }
}
