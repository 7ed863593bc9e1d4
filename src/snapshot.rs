//! The immutable file listing every view is built from.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use tracing::info;

use crate::config::IndexerConfig;
use crate::error::{RepoError, Result};
use crate::indexer::walker::{to_slash, Walker};

/// One in-scope file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    /// Relative, `/`-separated path.
    pub path: String,
    /// Size in bytes when the snapshot was taken.
    pub size: u64,
}

/// Root directory plus the ordered list of files considered in scope.
///
/// Files are ordered component-wise, which is the pre-order traversal of
/// the file tree. A snapshot is never mutated; rescanning a directory
/// produces a new one.
#[derive(Debug, Clone)]
pub struct Snapshot {
    root: PathBuf,
    files: Vec<SnapshotFile>,
    positions: HashMap<String, usize>,
}

impl Snapshot {
    /// Walk `root` with the given indexer settings.
    pub fn scan(root: impl AsRef<Path>, config: &IndexerConfig) -> Result<Self> {
        let root = canonical_root(root.as_ref())?;
        let files = Walker::new(root.clone(), config)
            .collect_files()
            .into_iter()
            .map(|f| SnapshotFile {
                path: f.relative,
                size: f.size,
            })
            .collect::<Vec<_>>();

        info!("Snapshot of {} contains {} files", root.display(), files.len());
        Ok(Self::assemble(root, files))
    }

    /// Build a snapshot from a listing supplied by the caller.
    ///
    /// Paths are normalized and sorted; duplicates collapse. Sizes come from
    /// the filesystem when the file exists, otherwise zero.
    pub fn from_files<I, S>(root: impl AsRef<Path>, files: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let root = canonical_root(root.as_ref())?;
        let mut listed = Vec::new();
        for file in files {
            let path = normalize_relative(&root, file.as_ref())?;
            if path.is_empty() {
                continue;
            }
            let size = std::fs::metadata(root.join(&path))
                .map(|m| m.len())
                .unwrap_or(0);
            listed.push(SnapshotFile { path, size });
        }
        listed.sort_by(|a, b| Path::new(&a.path).cmp(Path::new(&b.path)));
        listed.dedup_by(|a, b| a.path == b.path);

        Ok(Self::assemble(root, listed))
    }

    fn assemble(root: PathBuf, files: Vec<SnapshotFile>) -> Self {
        let positions = files
            .iter()
            .enumerate()
            .map(|(i, f)| (f.path.clone(), i))
            .collect();
        Self {
            root,
            files,
            positions,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[SnapshotFile] {
        &self.files
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.path.as_str())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Position of a normalized path in snapshot order.
    pub fn position(&self, path: &str) -> Option<usize> {
        self.positions.get(path).copied()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.normalize(path)
            .map(|p| self.positions.contains_key(&p))
            .unwrap_or(false)
    }

    /// Turn a caller-supplied path (relative, `./`-prefixed or absolute under
    /// the root) into the snapshot's relative form.
    pub fn normalize(&self, path: &str) -> Result<String> {
        normalize_relative(&self.root, path)
    }

    /// Look up a file, failing with `NotFound` when it is not in scope.
    pub fn resolve(&self, path: &str) -> Result<&SnapshotFile> {
        let normalized = self.normalize(path)?;
        self.positions
            .get(&normalized)
            .map(|&i| &self.files[i])
            .ok_or_else(|| RepoError::NotFound(path.to_string()))
    }

    /// Absolute location of a relative path. Does not check membership.
    pub fn abs_path(&self, relative: &str) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(relative.split('/').filter(|part| !part.is_empty()));
        path
    }

    pub fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let file = self.resolve(path)?;
        Ok(std::fs::read(self.abs_path(&file.path))?)
    }

    /// Read a file as UTF-8 text.
    pub fn read_to_string(&self, path: &str) -> Result<String> {
        let bytes = self.read_bytes(path)?;
        String::from_utf8(bytes).map_err(|_| RepoError::Decoding(path.to_string()))
    }
}

fn canonical_root(root: &Path) -> Result<PathBuf> {
    if !root.is_dir() {
        return Err(RepoError::NotFound(root.display().to_string()));
    }
    Ok(std::fs::canonicalize(root)?)
}

fn normalize_relative(root: &Path, path: &str) -> Result<String> {
    let raw = Path::new(path);
    let relative = if raw.is_absolute() {
        raw.strip_prefix(root)
            .map_err(|_| RepoError::OutsideRoot(path.to_string()))?
    } else {
        raw
    };

    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(RepoError::OutsideRoot(path.to_string()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(RepoError::OutsideRoot(path.to_string()));
            }
        }
    }

    let joined: PathBuf = parts.iter().collect();
    to_slash(&joined).ok_or_else(|| RepoError::NotFound(path.to_string()))
}
