use std::sync::Arc;

use anyhow::Result;
use repolens::config::BackendKind;
use repolens::{EmbeddingFunction, RepoError};

use crate::helpers::mock_embeddings::{FailingEmbedder, MockEmbedder};
use crate::helpers::test_harness::TestHarness;

fn shop() -> Result<TestHarness> {
    let mut harness = TestHarness::with_files(&[
        (
            "billing/invoice.py",
            "def render_invoice(total):\n    return f'Invoice total {total}'\n",
        ),
        (
            "auth/login.py",
            "def check_password(user, password):\n    return user.password == password\n",
        ),
        ("README.md", "# Shop\n\nBilling and auth services.\n"),
    ])?;
    harness.config.vector.backend = BackendKind::Disk;
    harness.config.vector.persist_dir = Some(harness.store_path().join("vectors"));
    Ok(harness)
}

fn stored_records(harness: &TestHarness) -> Result<usize> {
    let dir = harness.store_path().join("vectors");
    Ok(std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
        .count())
}

#[test]
fn test_semantic_search_ranks_related_chunk_first() -> Result<()> {
    let harness = shop()?;
    let mut repo = harness.open()?;
    repo.vector_searcher(Some(Arc::new(MockEmbedder::new(64))))?;

    let stats = repo.build_semantic_index()?;
    assert_eq!(stats.embedded, 3);

    let hits = repo.search_semantic("check the user password", 2)?;
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].file, "auth/login.py");
    assert_eq!((hits[0].line, hits[0].end_line), (1, 2));
    assert!(hits[0].score >= hits[1].score);

    assert!(repo.search_semantic("anything", 0)?.is_empty());
    Ok(())
}

#[test]
fn test_disk_index_survives_reopen() -> Result<()> {
    let harness = shop()?;
    {
        let mut repo = harness.open()?;
        repo.vector_searcher(Some(Arc::new(MockEmbedder::new(64))))?;
        repo.build_semantic_index()?;
    }
    assert_eq!(stored_records(&harness)?, 3);

    let embedder = Arc::new(MockEmbedder::new(64));
    let mut repo = harness.open()?;
    let searcher = repo.vector_searcher(Some(embedder.clone()))?;
    assert_eq!(searcher.backend_name(), "disk");
    assert_eq!(searcher.vector_index().len(), 3);
    assert_eq!(searcher.vector_index().stale_count(), 0);

    let stats = repo.build_semantic_index()?;
    assert_eq!(stats.unchanged, 3);
    assert_eq!(stats.embedded, 0);
    assert_eq!(embedder.calls(), 0);

    let hits = repo.search_semantic("render invoice total", 1)?;
    assert_eq!(hits[0].file, "billing/invoice.py");
    Ok(())
}

#[test]
fn test_edited_files_are_stale_until_reindexed() -> Result<()> {
    let harness = shop()?;
    {
        let mut repo = harness.open()?;
        repo.vector_searcher(Some(Arc::new(MockEmbedder::new(64))))?;
        repo.build_semantic_index()?;
    }

    harness.create_test_file(
        "auth/login.py",
        "def check_password(user, password):\n    return False\n",
    )?;
    harness.remove_test_file("README.md")?;

    let mut repo = harness.open()?;
    let searcher = repo.vector_searcher(Some(Arc::new(MockEmbedder::new(64))))?;
    // The deleted README is dropped on load; the edited login is stale.
    assert_eq!(searcher.vector_index().len(), 2);
    assert_eq!(searcher.vector_index().stale_count(), 1);
    assert_eq!(stored_records(&harness)?, 2);

    let hits = repo.search_semantic("user password", 10)?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].file, "billing/invoice.py");

    let stats = repo.build_semantic_index()?;
    assert_eq!(stats.embedded, 1);
    assert_eq!(stats.unchanged, 1);
    assert_eq!(stored_records(&harness)?, 2);

    let hits = repo.search_semantic("user password", 10)?;
    let login = hits
        .iter()
        .find(|h| h.file == "auth/login.py")
        .expect("re-indexed chunk");
    assert!(login.content.contains("return False"));
    Ok(())
}

#[test]
fn test_store_never_enters_the_snapshot() -> Result<()> {
    let harness = shop()?;
    let mut repo = harness.open()?;
    repo.vector_searcher(Some(Arc::new(MockEmbedder::new(64))))?;
    repo.build_semantic_index()?;

    repo.rescan()?;
    let paths: Vec<&str> = repo.snapshot().paths().collect();
    assert_eq!(paths, vec!["README.md", "auth/login.py", "billing/invoice.py"]);

    let stats = repo.build_semantic_index()?;
    assert_eq!(stats.embedded, 0);
    assert_eq!(stats.unchanged, 3);
    for hit in repo.search_semantic("render invoice total", 10)? {
        assert!(!hit.file.ends_with(".json"), "store file served: {}", hit.file);
    }
    Ok(())
}

#[test]
fn test_store_inside_repository_is_rejected() -> Result<()> {
    let mut harness = shop()?;
    harness.config.vector.persist_dir = Some(harness.path().join("vecstore"));
    let mut repo = harness.open()?;

    assert!(matches!(
        repo.vector_searcher(Some(Arc::new(MockEmbedder::new(8)))),
        Err(RepoError::Configuration(_))
    ));
    assert!(!harness.path().join("vecstore").exists());
    Ok(())
}

#[test]
fn test_disk_backend_without_directory_is_rejected() -> Result<()> {
    let mut harness = shop()?;
    harness.config.vector.persist_dir = None;
    let mut repo = harness.open()?;

    assert!(matches!(
        repo.vector_searcher(Some(Arc::new(MockEmbedder::new(8)))),
        Err(RepoError::Configuration(_))
    ));
    Ok(())
}

#[test]
fn test_embedding_failures_surface() -> Result<()> {
    let mut harness = shop()?;
    harness.config.vector.backend = BackendKind::Memory;
    let mut repo = harness.open()?;
    repo.vector_searcher(Some(Arc::new(FailingEmbedder::new(8, 0))))?;

    match repo.build_semantic_index() {
        Err(RepoError::Embedding(message)) => assert!(message.contains("unavailable")),
        other => panic!("expected an embedding error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_closure_embedder() -> Result<()> {
    let mut harness = shop()?;
    harness.config.vector.backend = BackendKind::Memory;
    let mut repo = harness.open()?;

    let by_length: Arc<dyn EmbeddingFunction> =
        Arc::new(|text: &str| vec![text.len() as f32, 1.0]);
    repo.vector_searcher(Some(by_length))?;
    assert_eq!(repo.build_semantic_index()?.embedded, 3);
    assert_eq!(repo.search_semantic("short", 3)?.len(), 3);
    Ok(())
}
