//! Per-file failure bookkeeping for repository-wide scans

use serde::Serialize;
use std::collections::BTreeMap;

/// Stage where a file dropped out of a scan
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    Read,
    Decode,
    Parse,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Read => write!(f, "read"),
            ProcessingStage::Decode => write!(f, "decode"),
            ProcessingStage::Parse => write!(f, "parse"),
        }
    }
}

/// A file that was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    pub path: String,
    pub stage: ProcessingStage,
    pub error: String,
}

/// Outcome of one full scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Files parsed successfully
    pub parsed: usize,
    /// Files without a registered grammar
    pub unrecognized: usize,
    pub failures: Vec<FileError>,
}

impl ScanReport {
    pub fn record(&mut self, path: impl Into<String>, stage: ProcessingStage, error: impl ToString) {
        self.failures.push(FileError {
            path: path.into(),
            stage,
            error: error.to_string(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn by_stage(&self) -> BTreeMap<ProcessingStage, Vec<&FileError>> {
        let mut grouped: BTreeMap<ProcessingStage, Vec<&FileError>> = BTreeMap::new();
        for failure in &self.failures {
            grouped.entry(failure.stage).or_default().push(failure);
        }
        grouped
    }

    /// One-line description for logs
    pub fn summary(&self) -> String {
        if self.failures.is_empty() {
            return format!("parsed {} files", self.parsed);
        }
        let stages = self
            .by_stage()
            .iter()
            .map(|(stage, errors)| format!("{} {}", errors.len(), stage))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "parsed {} files, skipped {} ({})",
            self.parsed,
            self.failures.len(),
            stages
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_groups_by_stage() {
        let mut report = ScanReport {
            parsed: 4,
            ..Default::default()
        };
        assert_eq!(report.summary(), "parsed 4 files");
        assert!(!report.has_errors());

        report.record("a.py", ProcessingStage::Decode, "invalid utf-8");
        report.record("b.py", ProcessingStage::Parse, "no tree");
        report.record("c.py", ProcessingStage::Parse, "no tree");

        assert!(report.has_errors());
        assert_eq!(report.by_stage()[&ProcessingStage::Parse].len(), 2);
        assert_eq!(report.summary(), "parsed 4 files, skipped 3 (1 decode, 2 parse)");
    }
}
