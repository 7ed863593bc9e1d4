use anyhow::Result;
use repolens::indexer::NodeType;
use repolens::{RepoError, SymbolKind};

use crate::helpers::test_harness::TestHarness;

const SAMPLE_RUST: &str = include_str!("../fixtures/languages/rust/sample_rust.rs");

#[test]
fn test_rust_fixture_symbols() -> Result<()> {
    let harness = TestHarness::with_files(&[("src/cache.rs", SAMPLE_RUST)])?;
    let mut repo = harness.open()?;

    let symbols = repo.extract_symbols(Some("src/cache.rs"))?;
    let cache = symbols
        .iter()
        .find(|s| s.name == "Cache" && s.kind == SymbolKind::Struct)
        .expect("struct Cache");
    assert_eq!(cache.start_line, 5);
    assert!(cache
        .docs
        .as_deref()
        .is_some_and(|d| d.contains("thread-safe cache")));

    let methods: Vec<&str> = symbols
        .iter()
        .filter(|s| s.kind == SymbolKind::Method)
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(methods, vec!["new", "insert", "get", "clear"]);

    assert!(symbols
        .iter()
        .any(|s| s.name == "tests" && s.kind == SymbolKind::Module));
    for symbol in &symbols {
        assert_eq!(symbol.file, "src/cache.rs");
        assert!(symbol.start_line <= symbol.end_line);
    }
    Ok(())
}

#[test]
fn test_repo_map_across_languages() -> Result<()> {
    let harness = TestHarness::with_files(&[
        ("app/models.py", "class User:\n    def save(self):\n        pass\n"),
        ("web/index.ts", "export function render(): string {\n  return '';\n}\n"),
        ("cmd/main.go", "package main\n\nfunc main() {}\n"),
        ("src/Main.java", "public class Main {\n  void run() {}\n}\n"),
        ("README.md", "# docs\n"),
    ])?;
    let mut repo = harness.open()?;

    let map = repo.get_repo_map();
    assert_eq!(map.len(), 4);
    assert!(!map.contains("README.md"));
    assert_eq!(map.find_by_name("User")[0].kind, SymbolKind::Class);
    assert_eq!(map.find_by_name("render")[0].file, "web/index.ts");
    assert_eq!(map.find_by_name("main")[0].kind, SymbolKind::Function);
    assert_eq!(map.find_by_name("run")[0].kind, SymbolKind::Method);

    let all = repo.extract_symbols(None)?;
    assert_eq!(all.len(), repo.get_repo_map().symbol_count());
    Ok(())
}

#[test]
fn test_unknown_and_missing_files() -> Result<()> {
    let harness = TestHarness::with_files(&[("notes.txt", "def not_code():\n")])?;
    let mut repo = harness.open()?;

    assert!(repo.extract_symbols(Some("notes.txt"))?.is_empty());
    assert!(matches!(
        repo.extract_symbols(Some("missing.py")),
        Err(RepoError::NotFound(_))
    ));
    Ok(())
}

#[test]
fn test_file_tree_sizes() -> Result<()> {
    let harness = TestHarness::with_files(&[
        ("src/a.rs", "fn a() {}\n"),
        ("src/nested/b.rs", "fn b() {}\n"),
        ("top.txt", "hello"),
    ])?;
    let repo = harness.open()?;

    let tree = repo.get_file_tree();
    assert_eq!(tree.node_type, NodeType::Directory);
    assert_eq!(tree.size, 10 + 10 + 5);

    let src = tree.children.iter().find(|c| c.name == "src").expect("src dir");
    assert_eq!(src.node_type, NodeType::Directory);
    assert_eq!(src.size, 20);
    let nested = src
        .children
        .iter()
        .find(|c| c.path == "src/nested")
        .expect("nested dir");
    assert_eq!(nested.size, 10);
    assert_eq!(nested.children[0].path, "src/nested/b.rs");
    Ok(())
}

#[test]
fn test_gitignored_files_are_outside_snapshot() -> Result<()> {
    let harness = TestHarness::with_files(&[
        (".gitignore", "build/\n"),
        ("build/gen.py", "def generated():\n    pass\n"),
        ("lib.py", "def kept():\n    pass\n"),
    ])?;
    std::fs::create_dir_all(harness.path().join(".git"))?;
    let mut repo = harness.open()?;

    assert!(!repo.snapshot().contains("build/gen.py"));
    assert!(repo.get_repo_map().find_by_name("generated").is_empty());
    assert_eq!(repo.get_repo_map().find_by_name("kept").len(), 1);
    Ok(())
}
