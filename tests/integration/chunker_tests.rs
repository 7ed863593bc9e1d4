use anyhow::Result;
use repolens::{Chunk, SymbolKind};

use crate::helpers::test_harness::TestHarness;

fn numbered(count: usize) -> String {
    (1..=count).map(|i| format!("line {i}\n")).collect()
}

fn assert_covers(chunks: &[Chunk], total: usize) {
    let mut next = 1;
    for chunk in chunks {
        assert_eq!(chunk.start_line, next, "gap or overlap before {chunk:?}");
        assert!(chunk.end_line >= chunk.start_line);
        next = chunk.end_line + 1;
    }
    assert_eq!(next, total + 1);
}

#[test]
fn test_line_chunks_use_configured_size() -> Result<()> {
    let log = numbered(120);
    let harness = TestHarness::with_files(&[("data/log.txt", log.as_str())])?;
    let repo = harness.open()?;

    let chunks = repo.chunk_file_by_lines("data/log.txt", None)?;
    let sizes: Vec<usize> = chunks.iter().map(Chunk::line_count).collect();
    assert_eq!(sizes, vec![50, 50, 20]);
    assert_covers(&chunks, 120);
    assert_eq!(chunks[2].content.lines().next(), Some("line 101"));
    assert!(chunks[0].language.is_none());

    let small = repo.chunk_file_by_lines("data/log.txt", Some(70))?;
    assert_eq!(small.len(), 2);
    Ok(())
}

#[test]
fn test_symbol_chunks_cover_the_file() -> Result<()> {
    let source = "import os\n\n\ndef first():\n    return 1\n\n\nclass Second:\n    def method(self):\n        pass\n\nVALUE = 3\n";
    let harness = TestHarness::with_files(&[("pkg/mod.py", source)])?;
    let repo = harness.open()?;

    let chunks = repo.chunk_file_by_symbols("pkg/mod.py")?;
    assert_covers(&chunks, source.lines().count());

    let named: Vec<(&str, SymbolKind)> = chunks
        .iter()
        .filter_map(|c| c.symbol.as_ref())
        .map(|s| (s.name.as_str(), s.kind))
        .collect();
    assert!(named.contains(&("first", SymbolKind::Function)));
    assert!(named.contains(&("Second", SymbolKind::Class)));
    // Methods travel with their class.
    assert!(!named.iter().any(|(name, _)| *name == "method"));

    let class = chunks
        .iter()
        .find(|c| c.symbol.as_ref().is_some_and(|s| s.name == "Second"))
        .expect("class chunk");
    assert_eq!((class.start_line, class.end_line), (8, 10));
    assert_eq!(class.language.as_deref(), Some("python"));
    Ok(())
}

#[test]
fn test_context_prefers_smallest_symbol() -> Result<()> {
    let source = "class Outer:\n    def inner(self):\n        x = 1\n        return x\n";
    let plain = numbered(40);
    let harness = TestHarness::with_files(&[("a.py", source), ("plain.txt", plain.as_str())])?;
    let repo = harness.open()?;

    let chunk = repo
        .extract_context_around_line("a.py", 3)?
        .expect("line 3 is inside inner");
    let symbol = chunk.symbol.expect("symbol chunk");
    assert_eq!(symbol.name, "inner");
    assert_eq!((chunk.start_line, chunk.end_line), (2, 4));

    let window = repo
        .extract_context_around_line("plain.txt", 20)?
        .expect("window");
    assert_eq!((window.start_line, window.end_line), (10, 30));
    assert!(window.symbol.is_none());

    let edge = repo
        .extract_context_around_line("plain.txt", 2)?
        .expect("window");
    assert_eq!((edge.start_line, edge.end_line), (1, 12));

    assert!(repo.extract_context_around_line("plain.txt", 0)?.is_none());
    assert!(repo.extract_context_around_line("plain.txt", 41)?.is_none());
    Ok(())
}

#[test]
fn test_empty_file_has_no_chunks() -> Result<()> {
    let harness = TestHarness::with_files(&[("empty.py", "")])?;
    let repo = harness.open()?;

    assert!(repo.chunk_file_by_lines("empty.py", None)?.is_empty());
    assert!(repo.chunk_file_by_symbols("empty.py")?.is_empty());
    Ok(())
}
