use anyhow::Result;
use repolens::{QueryMode, RepoError, SearchOptions};

use crate::helpers::test_harness::TestHarness;

fn harness() -> Result<TestHarness> {
    TestHarness::with_files(&[
        ("src/config.py", "VERSION = '1.2'\nversion = 132\n# TODO: drop\n"),
        ("src/app.js", "const v = 'VERSION';\nfunction load() {}\n"),
        ("docs/notes.md", "The VERSION is documented here.\n"),
    ])
}

#[test]
fn test_literal_search_over_all_files() -> Result<()> {
    let harness = harness()?;
    let repo = harness.open()?;

    let hits = repo.search_text("VERSION", "*")?;
    let places: Vec<(&str, usize)> = hits.iter().map(|h| (h.file.as_str(), h.line)).collect();
    assert_eq!(
        places,
        vec![("docs/notes.md", 1), ("src/app.js", 1), ("src/config.py", 1)]
    );
    assert_eq!(hits[2].line_content, "VERSION = '1.2'");
    Ok(())
}

#[test]
fn test_dot_is_literal_in_auto_mode() -> Result<()> {
    let harness = harness()?;
    let repo = harness.open()?;

    let hits = repo.search_text("1.2", "*.py")?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].line, 1);

    // As a regex "1.2" would also match "132" on line 2.
    assert_eq!(repo.search_text("(1.2)", "*.py")?.len(), 2);
    Ok(())
}

#[test]
fn test_regex_and_glob() -> Result<()> {
    let harness = harness()?;
    let repo = harness.open()?;

    let hits = repo.search_text(r"^function \w+", "src/*.js")?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].line, 2);

    assert!(matches!(
        repo.search_text("x", "[unclosed"),
        Err(RepoError::Glob(_))
    ));
    Ok(())
}

#[test]
fn test_options_case_and_context() -> Result<()> {
    let harness = harness()?;
    let repo = harness.open()?;

    let options = SearchOptions {
        mode: QueryMode::Literal,
        case_sensitive: false,
        context_lines: 1,
        max_results: None,
    };
    let hits = repo.search_text_with("version", "*.py", &options)?;
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].context_before.as_deref(), Some(&[][..]));
    assert_eq!(
        hits[0].context_after.as_deref(),
        Some(&["version = 132".to_string()][..])
    );

    let limited = SearchOptions {
        max_results: Some(1),
        ..options
    };
    assert_eq!(repo.search_text_with("version", "*", &limited)?.len(), 1);
    Ok(())
}

#[test]
fn test_binary_files_are_skipped() -> Result<()> {
    let harness = harness()?;
    std::fs::write(harness.path().join("blob.bin"), [0xffu8, 0xfe, b'V', 0x00])?;
    let repo = harness.open()?;

    assert!(repo.search_text("V", "*.bin")?.is_empty());
    assert!(repo.search_text("", "*")?.is_empty());
    Ok(())
}

#[test]
fn test_symbol_usages_combine_definitions_and_text() -> Result<()> {
    let harness = TestHarness::with_files(&[
        ("pkg/util.py", "def slugify(text):\n    return text\n"),
        ("pkg/views.py", "from pkg.util import slugify\n\nslug = slugify('A')\n"),
    ])?;
    let mut repo = harness.open()?;

    let usages = repo.find_symbol_usages("slugify", None)?;
    assert_eq!(usages[0].file, "pkg/util.py");
    assert!(usages[0].kind.is_some());

    let text: Vec<(&str, usize)> = usages[1..]
        .iter()
        .map(|u| (u.file.as_str(), u.line))
        .collect();
    assert_eq!(
        text,
        vec![("pkg/util.py", 1), ("pkg/views.py", 1), ("pkg/views.py", 3)]
    );
    Ok(())
}
