use anyhow::Result;
use repolens::graph::ExternalPolicy;
use repolens::{DependencyGraph, RepoError, Repository};

use crate::helpers::test_harness::TestHarness;

fn cyclic_pair() -> Result<TestHarness> {
    TestHarness::with_files(&[
        ("a.py", "import b\n"),
        ("b.py", "from a import run\n"),
        ("c.py", "import a\nimport os\n\ndef run():\n    pass\n"),
    ])
}

#[test]
fn test_cyclic_pair_graph() -> Result<()> {
    let harness = cyclic_pair()?;
    let mut repo = harness.open()?;

    let graph = repo.build_dependency_graph();
    let ids: Vec<&str> = graph.nodes().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["a.py", "b.py", "c.py", "ext:os"]);
    assert_eq!(graph.edge_count(), 4);
    assert!(graph.node("ext:os").is_some_and(|n| n.is_external()));
    assert_eq!(graph.dependents_of("a.py")?, vec!["b.py", "c.py"]);
    assert_eq!(graph.dependencies_of("c.py", true)?, vec!["a.py", "ext:os", "b.py"]);
    assert!(matches!(
        graph.dependencies_of("zzz.py", false),
        Err(RepoError::NotFound(_))
    ));

    let cycles = repo.find_cycles();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].nodes, vec!["a.py", "b.py"]);
    assert!(!cycles[0].contains("c.py"));
    Ok(())
}

#[test]
fn test_dot_export_round_trip() -> Result<()> {
    let harness = cyclic_pair()?;
    let mut repo = harness.open()?;

    let out = harness.path().join("out/deps.dot");
    repo.export_dependency_graph("dot", &out)?;
    let written = std::fs::read_to_string(&out)?;
    assert!(written.starts_with("digraph dependencies {\n"));
    assert!(written.contains("  \"ext:os\" [kind=\"external\"];\n"));
    assert!(written.contains("  \"a.py\" -> \"b.py\" [line=\"1\"];\n"));

    let parsed = DependencyGraph::from_dot(&written)?;
    assert_eq!(parsed.to_dot(), written);
    assert_eq!(parsed.find_cycles().len(), 1);
    assert_eq!(parsed.edges(), repo.build_dependency_graph().edges());
    Ok(())
}

#[test]
fn test_cyclic_pair_with_isolated_module_round_trips() -> Result<()> {
    let harness = TestHarness::with_files(&[
        ("a.py", "import b\n"),
        ("b.py", "import a\n"),
        ("c.py", "def alone():\n    return 0\n"),
    ])?;
    let mut repo = harness.open()?;

    let graph = repo.build_dependency_graph();
    let ids: Vec<&str> = graph.nodes().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["a.py", "b.py", "c.py"]);
    assert_eq!(graph.dependents_of("c.py")?, Vec::<String>::new());
    assert!(graph.dependencies_of("c.py", true)?.is_empty());

    let cycles = graph.find_cycles();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].nodes, vec!["a.py", "b.py"]);

    let out = harness.store_path().join("deps.dot");
    repo.export_dependency_graph("dot", &out)?;
    let parsed = DependencyGraph::from_dot(&std::fs::read_to_string(&out)?)?;
    let graph = repo.build_dependency_graph();
    assert_eq!(parsed.nodes(), graph.nodes());
    assert_eq!(parsed.edges(), graph.edges());
    assert_eq!(parsed.find_cycles(), cycles);
    Ok(())
}

#[test]
fn test_json_and_adjacency_exports() -> Result<()> {
    let harness = cyclic_pair()?;
    let mut repo = harness.open()?;

    let json_path = harness.path().join("graph.json");
    repo.export_dependency_graph("JSON", &json_path)?;
    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&json_path)?)?;
    assert_eq!(value["nodes"].as_array().map(Vec::len), Some(4));
    assert_eq!(value["edges"][0]["source"], "a.py");
    assert_eq!(value["edges"][0]["target"], "b.py");

    let adj_path = harness.path().join("graph.adj.json");
    repo.export_dependency_graph("adjacency", &adj_path)?;
    let adjacency: std::collections::BTreeMap<String, Vec<String>> =
        serde_json::from_str(&std::fs::read_to_string(&adj_path)?)?;
    assert_eq!(adjacency["c.py"], vec!["a.py", "ext:os"]);
    assert!(adjacency["ext:os"].is_empty());

    assert!(matches!(
        repo.export_dependency_graph("svg", harness.path().join("graph.svg")),
        Err(RepoError::UnsupportedFormat(_))
    ));
    Ok(())
}

#[test]
fn test_external_policy_from_config_file() -> Result<()> {
    let harness = cyclic_pair()?;
    harness.create_test_file(".repolens/config.toml", "[graph]\nexternal = \"omit\"\n")?;
    let mut repo = Repository::open(harness.path())?;

    assert_eq!(repo.config().graph.external, ExternalPolicy::Omit);
    let graph = repo.build_dependency_graph();
    assert!(!graph.contains("ext:os"));
    assert_eq!(graph.external_nodes().count(), 0);
    assert_eq!(graph.edge_count(), 3);
    Ok(())
}

#[test]
fn test_multi_language_resolution() -> Result<()> {
    let mut harness = TestHarness::with_files(&[
        ("go.mod", "module example.com/shop\n\ngo 1.22\n"),
        ("cmd/main.go", "package main\n\nimport \"example.com/shop/cart\"\n\nfunc main() {}\n"),
        ("cart/cart.go", "package cart\n\nimport \"fmt\"\n\nfunc Add() { fmt.Println() }\n"),
        ("web/app.ts", "import { total } from './util';\nimport React from 'react';\n"),
        ("web/util.ts", "export function total() { return 0; }\n"),
        ("src/lib.rs", "mod parser;\nuse crate::parser::parse;\n"),
        ("src/parser.rs", "pub fn parse() {}\n"),
    ])?;
    harness.config.graph.external = ExternalPolicy::Include;
    let mut repo = harness.open()?;

    let graph = repo.build_dependency_graph();
    let edges: Vec<(&str, &str)> = graph
        .edges()
        .iter()
        .map(|e| (e.source.as_str(), e.target.as_str()))
        .collect();
    assert!(edges.contains(&("cmd", "cart")));
    assert!(edges.contains(&("cart", "ext:fmt")));
    assert!(edges.contains(&("web/app.ts", "web/util.ts")));
    assert!(edges.contains(&("web/app.ts", "ext:react")));
    assert!(edges.contains(&("src/lib.rs", "src/parser.rs")));
    assert!(!repo.build_dependency_graph().has_cycles());
    Ok(())
}
