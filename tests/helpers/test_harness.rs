use std::path::{Path, PathBuf};

use anyhow::Result;
use repolens::{Config, Repository};
use tempfile::TempDir;

pub struct TestHarness {
    pub temp_dir: TempDir,
    /// Scratch space outside the repository, e.g. for a vector store
    pub store_dir: TempDir,
    pub config: Config,
}

impl TestHarness {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
            store_dir: TempDir::new()?,
            config: Config::default(),
        })
    }

    /// A harness pre-populated with `(path, content)` files.
    pub fn with_files(files: &[(&str, &str)]) -> Result<Self> {
        let harness = Self::new()?;
        for (path, content) in files {
            harness.create_test_file(path, content)?;
        }
        Ok(harness)
    }

    pub fn create_test_file(&self, path: &str, content: &str) -> Result<PathBuf> {
        let file_path = self.temp_dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&file_path, content)?;
        Ok(file_path)
    }

    pub fn remove_test_file(&self, path: &str) -> Result<()> {
        std::fs::remove_file(self.temp_dir.path().join(path))?;
        Ok(())
    }

    /// Open a repository over the temp dir with the harness config.
    pub fn open(&self) -> Result<Repository> {
        Ok(Repository::open_with_config(self.path(), self.config.clone())?)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn store_path(&self) -> &Path {
        self.store_dir.path()
    }
}
