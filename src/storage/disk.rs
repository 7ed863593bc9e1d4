use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{EmbeddingRecord, VectorBackend};
use crate::error::{RepoError, Result};

const RECORD_EXTENSION: &str = "json";

/// One JSON file per record under a directory.
///
/// Files are named by storage id and written to a temporary sibling first,
/// then renamed into place, so readers never see a partial record.
#[derive(Debug)]
pub struct DiskBackend {
    dir: PathBuf,
}

impl DiskBackend {
    /// Open (creating if needed) a record directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        info!("Opening vector store at: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> Result<PathBuf> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(RepoError::NotFound(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.{RECORD_EXTENSION}")))
    }

    fn read_record(path: &Path) -> Result<EmbeddingRecord> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl VectorBackend for DiskBackend {
    fn name(&self) -> &'static str {
        "disk"
    }

    fn get(&self, id: &str) -> Result<Option<EmbeddingRecord>> {
        let path = self.record_path(id)?;
        if !path.exists() {
            return Ok(None);
        }
        Self::read_record(&path).map(Some)
    }

    fn put(&mut self, record: &EmbeddingRecord) -> Result<()> {
        let id = record.storage_id();
        let path = self.record_path(&id)?;
        let tmp = self.dir.join(format!("{id}.tmp"));

        fs::write(&tmp, serde_json::to_vec(record)?)?;
        fs::rename(&tmp, &path)?;
        debug!("Stored {} as {}", record.key, path.display());
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<bool> {
        let path = self.record_path(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Unreadable or corrupt files are skipped with a warning.
    fn list(&self) -> Result<Vec<EmbeddingRecord>> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            match Self::read_record(&path) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable record {}: {}", path.display(), e),
            }
        }
        records.sort_by_key(|r| r.seq);
        Ok(records)
    }
}
