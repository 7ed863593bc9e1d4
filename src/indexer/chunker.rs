use serde::{Deserialize, Serialize};

use crate::config::ChunkerConfig;
use crate::indexer::ast::ParserPool;
use crate::symbol::{Symbol, SymbolKind};

/// The symbol a chunk was cut from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRef {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SymbolKind,
    /// Position of the symbol in its file's symbol list.
    pub index: usize,
}

/// A contiguous, inclusive line range of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<SymbolRef>,
}

impl Chunk {
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }
}

/// Slices file content into bounded windows
pub struct Chunker {
    max_lines: usize,
    context_lines: usize,
}

impl Chunker {
    pub fn new(config: &ChunkerConfig) -> Self {
        Self {
            max_lines: config.max_lines,
            context_lines: config.context_lines,
        }
    }

    /// Default window size for [`chunk_by_lines`](Self::chunk_by_lines).
    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    /// Contiguous windows of at most `max_lines` lines; the last may be
    /// shorter. A window size of zero is treated as one.
    pub fn chunk_by_lines(&self, file: &str, content: &str, max_lines: usize) -> Vec<Chunk> {
        let lines: Vec<&str> = content.lines().collect();
        let window = max_lines.max(1);
        let language = detect_language(file);

        lines
            .chunks(window)
            .enumerate()
            .map(|(i, window_lines)| {
                let start_line = i * window + 1;
                Chunk {
                    file: file.to_string(),
                    start_line,
                    end_line: start_line + window_lines.len() - 1,
                    content: window_lines.join("\n"),
                    language: language.clone(),
                    symbol: None,
                }
            })
            .collect()
    }

    /// One chunk per top-level symbol in source order, with the lines between
    /// symbols emitted as their own chunks. Laid end to end the chunks cover
    /// every line exactly once.
    pub fn chunk_by_symbols(&self, file: &str, content: &str, symbols: &[Symbol]) -> Vec<Chunk> {
        let lines: Vec<&str> = content.lines().collect();
        let total = lines.len();
        let language = detect_language(file);

        let mut top_level: Vec<(usize, &Symbol)> = symbols
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_top_level())
            .collect();
        top_level.sort_by_key(|(i, s)| (s.start_line, *i));

        let mut chunks = Vec::new();
        let mut next = 1;
        for (index, symbol) in top_level {
            // Overlapping top-level ranges are clipped to what is not yet covered.
            let start = symbol.start_line.max(next);
            let end = symbol.end_line.min(total);
            if start > end {
                continue;
            }
            if start > next {
                chunks.push(slice(file, &lines, next, start - 1, &language, None));
            }
            chunks.push(slice(
                file,
                &lines,
                start,
                end,
                &language,
                Some(SymbolRef {
                    name: symbol.name.clone(),
                    kind: symbol.kind,
                    index,
                }),
            ));
            next = end + 1;
        }
        if next <= total {
            chunks.push(slice(file, &lines, next, total, &language, None));
        }
        chunks
    }

    /// The smallest symbol containing `line`, or a window of `context_lines`
    /// on each side. `None` when `line` is 0 or past the end of the file.
    pub fn context_around_line(
        &self,
        file: &str,
        content: &str,
        symbols: &[Symbol],
        line: usize,
    ) -> Option<Chunk> {
        let lines: Vec<&str> = content.lines().collect();
        let total = lines.len();
        if line == 0 || line > total {
            return None;
        }
        let language = detect_language(file);

        let enclosing = symbols
            .iter()
            .enumerate()
            .filter(|(_, s)| s.contains_line(line))
            .min_by_key(|(_, s)| s.line_count());

        if let Some((index, symbol)) = enclosing {
            return Some(slice(
                file,
                &lines,
                symbol.start_line,
                symbol.end_line.min(total),
                &language,
                Some(SymbolRef {
                    name: symbol.name.clone(),
                    kind: symbol.kind,
                    index,
                }),
            ));
        }

        let start = line.saturating_sub(self.context_lines).max(1);
        let end = (line + self.context_lines).min(total);
        Some(slice(file, &lines, start, end, &language, None))
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(&ChunkerConfig::default())
    }
}

fn detect_language(file: &str) -> Option<String> {
    ParserPool::detect_language(file).map(str::to_string)
}

/// Lines `start..=end` (1-based) joined with `\n`.
fn slice(
    file: &str,
    lines: &[&str],
    start: usize,
    end: usize,
    language: &Option<String>,
    symbol: Option<SymbolRef>,
) -> Chunk {
    Chunk {
        file: file.to_string(),
        start_line: start,
        end_line: end,
        content: lines[start - 1..end].join("\n"),
        language: language.clone(),
        symbol,
    }
}
