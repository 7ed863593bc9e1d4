//! Plain-text search over snapshot files.

use std::sync::Arc;
use std::time::Instant;

use glob::Pattern;
use rayon::prelude::*;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::QueryMode;
use crate::config::SearchConfig;
use crate::error::Result;
use crate::snapshot::Snapshot;

/// Characters that make an `Auto` query a regex. `.` is deliberately absent
/// so that queries like `foo.bar` stay literal.
const REGEX_METACHARS: &[char] = &[
    '\\', '^', '$', '*', '+', '?', '(', ')', '[', ']', '{', '}', '|',
];

/// One matching line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub file: String,
    /// 1-based
    pub line: usize,
    pub line_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_before: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_after: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub mode: QueryMode,
    pub case_sensitive: bool,
    /// Lines attached before and after each hit; 0 attaches none
    pub context_lines: usize,
    pub max_results: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for SearchOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            mode: config.query_mode,
            case_sensitive: config.case_sensitive,
            context_lines: config.context_lines,
            max_results: None,
        }
    }
}

/// Line-oriented searcher over one snapshot.
pub struct TextSearcher {
    snapshot: Arc<Snapshot>,
    defaults: SearchOptions,
}

impl TextSearcher {
    pub fn new(snapshot: Arc<Snapshot>, config: &SearchConfig) -> Self {
        Self {
            snapshot,
            defaults: SearchOptions::from(config),
        }
    }

    pub fn options(&self) -> &SearchOptions {
        &self.defaults
    }

    /// Search with the configured defaults.
    pub fn search_text(&self, query: &str, file_pattern: &str) -> Result<Vec<SearchHit>> {
        self.search_with_options(query, file_pattern, &self.defaults)
    }

    /// Every line matching `query` in files matching `file_pattern`, ordered by
    /// snapshot position and then line number.
    ///
    /// The pattern is matched against both the relative path and the file
    /// name, so `*.py` finds Python files at any depth. Files that are not
    /// valid UTF-8 are skipped.
    pub fn search_with_options(
        &self,
        query: &str,
        file_pattern: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>> {
        let pattern = Pattern::new(file_pattern)?;
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let Some(matcher) = build_matcher(query, options) else {
            return Ok(Vec::new());
        };
        let candidates: Vec<&str> = self
            .snapshot
            .paths()
            .filter(|path| matches_pattern(&pattern, path))
            .collect();

        let per_file: Vec<Vec<SearchHit>> = candidates
            .par_iter()
            .map(|path| self.search_file(path, &matcher, options.context_lines))
            .collect();

        let mut hits: Vec<SearchHit> = per_file.into_iter().flatten().collect();
        if let Some(limit) = options.max_results {
            hits.truncate(limit);
        }

        info!(
            "Text search '{}' in '{}': {} hits across {} files in {:?}",
            query,
            file_pattern,
            hits.len(),
            candidates.len(),
            started.elapsed()
        );
        Ok(hits)
    }

    fn search_file(&self, path: &str, matcher: &Regex, context_lines: usize) -> Vec<SearchHit> {
        let bytes = match self.snapshot.read_bytes(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Skipping {} in text search: {}", path, e);
                return Vec::new();
            }
        };
        let Ok(content) = String::from_utf8(bytes) else {
            debug!("Skipping non-UTF-8 file {}", path);
            return Vec::new();
        };

        let lines: Vec<&str> = content.lines().collect();
        lines
            .iter()
            .enumerate()
            .filter(|(_, line)| matcher.is_match(line))
            .map(|(i, line)| {
                let (context_before, context_after) = if context_lines > 0 {
                    let before = lines[i.saturating_sub(context_lines)..i].iter();
                    let after_end = (i + 1 + context_lines).min(lines.len());
                    let after = lines[i + 1..after_end].iter();
                    (
                        Some(before.map(|l| l.to_string()).collect()),
                        Some(after.map(|l| l.to_string()).collect()),
                    )
                } else {
                    (None, None)
                };
                SearchHit {
                    file: path.to_string(),
                    line: i + 1,
                    line_content: line.to_string(),
                    context_before,
                    context_after,
                }
            })
            .collect()
    }
}

fn matches_pattern(pattern: &Pattern, path: &str) -> bool {
    if pattern.matches(path) {
        return true;
    }
    let file_name = path.rsplit('/').next().unwrap_or(path);
    pattern.matches(file_name)
}

/// Whether `query` would be treated as a regex in `Auto` mode.
pub fn looks_like_regex(query: &str) -> bool {
    query.contains(REGEX_METACHARS)
}

/// Compile the query for the requested mode. Invalid regexes fall back to a
/// literal match of the raw query.
fn build_matcher(query: &str, options: &SearchOptions) -> Option<Regex> {
    let as_regex = match options.mode {
        QueryMode::Regex => true,
        QueryMode::Literal => false,
        QueryMode::Auto => looks_like_regex(query),
    };

    if as_regex {
        match compile(query, options.case_sensitive) {
            Ok(regex) => return Some(regex),
            Err(e) => debug!("'{}' is not a valid regex, matching literally: {}", query, e),
        }
    }

    // An escaped literal only fails on the compiled size limit.
    compile(&regex::escape(query), options.case_sensitive)
        .map_err(|e| warn!("Could not compile literal query '{}': {}", query, e))
        .ok()
}

fn compile(pattern: &str, case_sensitive: bool) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
}
