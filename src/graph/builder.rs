use std::time::Instant;

use tracing::{debug, info};

use super::resolver::{Resolution, Resolver};
use super::{external_id, DependencyEdge, DependencyGraph, ExternalPolicy, NodeKind};
use crate::config::GraphConfig;
use crate::symbol::RepoMap;

/// Builds a [`DependencyGraph`] from the imports recorded in a [`RepoMap`].
pub struct GraphBuilder {
    external: ExternalPolicy,
    multi_edges: bool,
    go_module: Option<String>,
}

impl GraphBuilder {
    pub fn new(config: &GraphConfig) -> Self {
        Self {
            external: config.external,
            multi_edges: config.multi_edges,
            go_module: None,
        }
    }

    /// Module path from `go.mod`, used to recognize the repository's own
    /// import paths.
    pub fn with_go_module(mut self, module: Option<String>) -> Self {
        self.go_module = module;
        self
    }

    /// Every parsed file contributes its module node, even without imports.
    /// Nodes appear in first-seen order while walking files in map order.
    pub fn build(&self, map: &RepoMap) -> DependencyGraph {
        let started = Instant::now();
        let resolver = Resolver::new(map, self.go_module.as_deref());
        let mut graph = DependencyGraph::new(self.multi_edges);
        let mut dropped = 0usize;

        for entry in map.files() {
            let source = resolver.module_id(&entry.path);
            graph.add_node(&source, NodeKind::Internal, Some(source.clone()));

            for import in &entry.imports {
                for resolution in resolver.resolve(&entry.path, import) {
                    let target = match resolution {
                        Resolution::Internal(file) => {
                            let id = resolver.module_id(&file);
                            graph.add_node(&id, NodeKind::Internal, Some(id.clone()));
                            id
                        }
                        Resolution::External(name) => match self.external {
                            ExternalPolicy::Include => {
                                let id = external_id(&name);
                                graph.add_node(&id, NodeKind::External, None);
                                id
                            }
                            ExternalPolicy::Omit => {
                                debug!("Omitting external import {} in {}", name, entry.path);
                                continue;
                            }
                        },
                    };

                    let added = graph.add_edge(DependencyEdge {
                        source: source.clone(),
                        target,
                        line: Some(import.line),
                        alias: import.alias.clone(),
                    });
                    if !added {
                        dropped += 1;
                    }
                }
            }
        }

        info!(
            "Built dependency graph: {} nodes, {} edges ({} duplicate or self edges dropped) in {:?}",
            graph.node_count(),
            graph.edge_count(),
            dropped,
            started.elapsed()
        );
        graph
    }
}

/// Module path declared by a `go.mod` file.
pub fn parse_go_module(go_mod: &str) -> Option<String> {
    go_mod.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let module = rest.trim().trim_matches('"');
        (!module.is_empty()).then(|| module.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::ImportRef;
    use crate::symbol::FileEntry;

    fn entry(path: &str, language: &'static str, imports: &[(&str, usize)]) -> FileEntry {
        FileEntry {
            path: path.to_string(),
            language,
            symbols: Vec::new(),
            imports: imports
                .iter()
                .map(|(target, line)| ImportRef {
                    target: target.to_string(),
                    names: Vec::new(),
                    alias: None,
                    line: *line,
                })
                .collect(),
        }
    }

    fn ids(graph: &DependencyGraph) -> Vec<&str> {
        graph.nodes().iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_python_graph_with_externals() {
        let map = RepoMap::from_entries(vec![
            entry("a.py", "python", &[("b", 1), ("os", 2), ("b", 3)]),
            entry("b.py", "python", &[("a", 1)]),
            entry("lonely.py", "python", &[]),
        ]);

        let graph = GraphBuilder::new(&GraphConfig::default()).build(&map);
        assert_eq!(ids(&graph), vec!["a.py", "b.py", "ext:os", "lonely.py"]);
        assert_eq!(graph.edge_count(), 3);
        let os = graph.node("ext:os").unwrap();
        assert!(os.is_external());
        assert_eq!(os.name(), "os");
        assert_eq!(graph.edges()[0].line, Some(1));
    }

    #[test]
    fn test_omit_externals_and_multi_edges() {
        let map = RepoMap::from_entries(vec![
            entry("a.py", "python", &[("b", 1), ("os", 2), ("b", 3)]),
            entry("b.py", "python", &[]),
        ]);

        let config = GraphConfig {
            external: ExternalPolicy::Omit,
            multi_edges: true,
        };
        let graph = GraphBuilder::new(&config).build(&map);
        assert_eq!(ids(&graph), vec!["a.py", "b.py"]);
        let lines: Vec<_> = graph.edges().iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![Some(1), Some(3)]);
    }

    #[test]
    fn test_go_files_collapse_into_packages() {
        let map = RepoMap::from_entries(vec![
            entry("main.go", "go", &[("example.com/app/store", 3), ("fmt", 4)]),
            entry("store/a.go", "go", &[]),
            entry("store/b.go", "go", &[("example.com/app/store", 3)]),
        ]);

        let graph = GraphBuilder::new(&GraphConfig::default())
            .with_go_module(Some("example.com/app".to_string()))
            .build(&map);
        assert_eq!(ids(&graph), vec![".", "store", "ext:fmt"]);
        // store/b.go importing its own package is a self-edge.
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_external_names_do_not_merge_with_internal_ids() {
        // A Go package directory `os` next to a Python `import os`.
        let map = RepoMap::from_entries(vec![
            entry("a.py", "python", &[("os", 1)]),
            entry("os/path.go", "go", &[]),
            entry("main.go", "go", &[("example.com/app/os", 3)]),
        ]);

        let graph = GraphBuilder::new(&GraphConfig::default())
            .with_go_module(Some("example.com/app".to_string()))
            .build(&map);
        assert_eq!(ids(&graph), vec!["a.py", "ext:os", "os", "."]);
        assert!(graph.node("ext:os").unwrap().is_external());
        assert!(!graph.node("os").unwrap().is_external());
        assert_eq!(graph.dependents_of("os").unwrap(), vec!["."]);
        assert_eq!(graph.dependents_of("ext:os").unwrap(), vec!["a.py"]);
    }

    #[test]
    fn test_parse_go_module() {
        assert_eq!(
            parse_go_module("// comment\nmodule github.com/acme/app\n\ngo 1.22\n"),
            Some("github.com/acme/app".to_string())
        );
        assert_eq!(parse_go_module("modules x\n"), None);
        assert_eq!(parse_go_module(""), None);
    }
}
