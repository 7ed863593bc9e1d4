//! Module dependency graph.
//!
//! - `resolver` - maps import references to module ids per language
//! - `builder` - turns a [`RepoMap`](crate::symbol::RepoMap) into a graph
//! - `cycles` - cycle and strongly-connected-component detection
//! - `export` - DOT / JSON / adjacency rendering and DOT parsing

pub mod builder;
pub mod cycles;
pub mod export;
pub mod resolver;

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{RepoError, Result};

pub use builder::GraphBuilder;
pub use cycles::Cycle;
pub use export::ExportFormat;
pub use resolver::{Resolution, Resolver};

/// What to do with imports that do not resolve to a file in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalPolicy {
    /// Record them as external terminal nodes.
    #[default]
    Include,
    /// Drop them.
    Omit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Internal,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNode {
    pub id: String,
    pub kind: NodeKind,
    /// Relative file or package directory, for internal nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Prefix of external node ids. Internal ids are relative paths or package
/// directories, so the two namespaces never meet.
pub const EXTERNAL_PREFIX: &str = "ext:";

/// Node id for an unresolved import named `name`.
pub fn external_id(name: &str) -> String {
    format!("{EXTERNAL_PREFIX}{name}")
}

impl DependencyNode {
    pub fn is_external(&self) -> bool {
        self.kind == NodeKind::External
    }

    /// The import name for external nodes, the id otherwise.
    pub fn name(&self) -> &str {
        match self.kind {
            NodeKind::External => self.id.strip_prefix(EXTERNAL_PREFIX).unwrap_or(&self.id),
            NodeKind::Internal => &self.id,
        }
    }
}

/// Importer -> imported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// Directed graph over module ids.
///
/// Nodes keep first-seen order and edges insertion order; both orders drive
/// traversal and rendering. Self-edges are dropped. A (source, target) pair
/// is stored once unless multi-edges are enabled, in which case edges that
/// differ in line or alias are all kept.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<DependencyNode>,
    index: HashMap<String, usize>,
    edges: Vec<DependencyEdge>,
    /// Edge indices per source node, in insertion order
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
    pairs: HashSet<(usize, usize)>,
    multi_edges: bool,
}

impl DependencyGraph {
    pub fn new(multi_edges: bool) -> Self {
        Self {
            multi_edges,
            ..Self::default()
        }
    }

    pub fn nodes(&self) -> &[DependencyNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&DependencyNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn multi_edges(&self) -> bool {
        self.multi_edges
    }

    /// Add a node unless one with this id exists. Returns its index.
    pub fn add_node(&mut self, id: &str, kind: NodeKind, path: Option<String>) -> usize {
        if let Some(&i) = self.index.get(id) {
            return i;
        }
        let i = self.nodes.len();
        self.nodes.push(DependencyNode {
            id: id.to_string(),
            kind,
            path,
        });
        self.index.insert(id.to_string(), i);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        i
    }

    /// Add an edge, creating missing endpoints as internal nodes.
    ///
    /// Returns `false` when the edge was dropped as a self-edge or duplicate.
    pub fn add_edge(&mut self, edge: DependencyEdge) -> bool {
        if edge.source == edge.target {
            return false;
        }
        let source = self.add_node(&edge.source, NodeKind::Internal, Some(edge.source.clone()));
        let target = self.add_node(&edge.target, NodeKind::Internal, Some(edge.target.clone()));

        if self.multi_edges {
            if self.outgoing[source].iter().any(|&e| self.edges[e] == edge) {
                return false;
            }
        } else if !self.pairs.insert((source, target)) {
            return false;
        }

        let e = self.edges.len();
        self.edges.push(edge);
        self.outgoing[source].push(e);
        self.incoming[target].push(e);
        true
    }

    fn require(&self, id: &str) -> Result<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| RepoError::NotFound(id.to_string()))
    }

    /// Neighbor node indices in edge order, without repeats.
    pub(crate) fn successors(&self, node: usize) -> Vec<usize> {
        let mut seen = HashSet::new();
        self.outgoing[node]
            .iter()
            .map(|&e| self.index[&self.edges[e].target])
            .filter(|t| seen.insert(*t))
            .collect()
    }

    pub(crate) fn outgoing_edges(&self, node: usize) -> &[usize] {
        &self.outgoing[node]
    }

    pub(crate) fn node_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Modules `id` imports. With `transitive`, everything reachable in
    /// breadth-first order.
    pub fn dependencies_of(&self, id: &str, transitive: bool) -> Result<Vec<String>> {
        let start = self.require(id)?;
        if !transitive {
            return Ok(self
                .successors(start)
                .into_iter()
                .map(|i| self.nodes[i].id.clone())
                .collect());
        }

        let mut visited = vec![false; self.nodes.len()];
        visited[start] = true;
        let mut queue = VecDeque::from([start]);
        let mut reached = Vec::new();
        while let Some(node) = queue.pop_front() {
            for next in self.successors(node) {
                if !visited[next] {
                    visited[next] = true;
                    reached.push(self.nodes[next].id.clone());
                    queue.push_back(next);
                }
            }
        }
        Ok(reached)
    }

    /// Modules that import `id` directly.
    pub fn dependents_of(&self, id: &str) -> Result<Vec<String>> {
        let target = self.require(id)?;
        let mut seen = HashSet::new();
        Ok(self.incoming[target]
            .iter()
            .map(|&e| self.edges[e].source.clone())
            .filter(|s| seen.insert(s.clone()))
            .collect())
    }

    pub fn internal_nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.nodes.iter().filter(|n| !n.is_external())
    }

    pub fn external_nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.nodes.iter().filter(|n| n.is_external())
    }
}

#[cfg(test)]
pub(crate) fn edge(source: &str, target: &str) -> DependencyEdge {
    DependencyEdge {
        source: source.to_string(),
        target: target.to_string(),
        line: None,
        alias: None,
    }
}
