use ignore::WalkBuilder;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use crate::config::IndexerConfig;

/// Bytes inspected when deciding whether a file is binary.
pub const BINARY_SNIFF_LEN: usize = 8000;

/// Directories that never belong to a snapshot, even with hidden files on.
const ALWAYS_SKIPPED: &[&str] = &[".git", ".repolens"];

/// A file accepted by the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedFile {
    /// Path relative to the walk root, `/`-separated.
    pub relative: String,
    pub size: u64,
}

/// Walks the filesystem respecting .gitignore and custom ignore patterns
pub struct Walker {
    root: PathBuf,
    extensions: HashSet<String>,
    ignore_patterns: Vec<IgnoreRule>,
    respect_gitignore: bool,
    include_hidden: bool,
    max_file_size: u64,
}

/// One entry of `ignore_patterns`: a bare name matches any path component,
/// anything with glob syntax or a slash is matched against the relative path.
#[derive(Debug, Clone)]
enum IgnoreRule {
    Component(String),
    Glob(glob::Pattern),
}

impl IgnoreRule {
    fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.contains(['*', '?', '[', '/']) {
            match glob::Pattern::new(trimmed) {
                Ok(pattern) => Some(Self::Glob(pattern)),
                Err(e) => {
                    warn!("Ignoring invalid ignore pattern '{}': {}", raw, e);
                    None
                }
            }
        } else {
            Some(Self::Component(trimmed.to_string()))
        }
    }

    fn matches(&self, relative: &Path) -> bool {
        match self {
            Self::Component(name) => relative
                .components()
                .any(|c| c.as_os_str() == OsStr::new(name)),
            Self::Glob(pattern) => {
                pattern.matches_path(relative)
                    || relative
                        .file_name()
                        .map(|name| pattern.matches_path(Path::new(name)))
                        .unwrap_or(false)
            }
        }
    }
}

impl Walker {
    /// Create a new Walker with the given root directory and configuration
    pub fn new(root: PathBuf, config: &IndexerConfig) -> Self {
        Self {
            root,
            extensions: config
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_string())
                .collect(),
            ignore_patterns: config
                .ignore_patterns
                .iter()
                .filter_map(|p| IgnoreRule::parse(p))
                .collect(),
            respect_gitignore: config.respect_gitignore,
            include_hidden: config.include_hidden,
            max_file_size: config.max_file_size,
        }
    }

    /// Walk the tree and return accepted files in component order.
    ///
    /// This respects:
    /// - .gitignore / .ignore files (even outside a git checkout)
    /// - hidden-file rules
    /// - custom ignore patterns and the extension filter
    /// - the size limit and binary detection
    ///
    /// Unreadable entries are logged and skipped.
    pub fn collect_files(&self) -> Vec<WalkedFile> {
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(!self.include_hidden)
            .git_ignore(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .git_global(false)
            .ignore(self.respect_gitignore)
            .parents(self.respect_gitignore)
            .require_git(false)
            .follow_links(false)
            .max_filesize(Some(self.max_file_size));

        let root = self.root.clone();
        let rules = self.ignore_patterns.clone();
        builder.filter_entry(move |entry| {
            let Ok(relative) = entry.path().strip_prefix(&root) else {
                return true;
            };
            if relative.as_os_str().is_empty() {
                return true;
            }
            let skipped = relative
                .components()
                .any(|c| ALWAYS_SKIPPED.iter().any(|s| c.as_os_str() == OsStr::new(s)));
            !skipped && !rules.iter().any(|rule| rule.matches(relative))
        });

        let mut files: Vec<(PathBuf, u64)> = Vec::new();
        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }
            let path = entry.path();
            if !self.extension_allowed(path) {
                continue;
            }
            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            match is_binary(path) {
                Ok(true) => {
                    debug!("Skipping binary file {}", relative.display());
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("Skipping {}: {}", relative.display(), e);
                    continue;
                }
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            files.push((relative.to_path_buf(), size));
        }

        // Path ordering is component-wise, which matches a pre-order walk of
        // the file tree with children sorted by name.
        files.sort_by(|a, b| a.0.cmp(&b.0));

        files
            .into_iter()
            .filter_map(|(relative, size)| match to_slash(&relative) {
                Some(relative) => Some(WalkedFile { relative, size }),
                None => {
                    warn!("Skipping non UTF-8 path {}", relative.display());
                    None
                }
            })
            .collect()
    }

    fn extension_allowed(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(OsStr::to_str)
            .map(|ext| self.extensions.contains(ext))
            .unwrap_or(false)
    }
}

/// A file is binary when its first [`BINARY_SNIFF_LEN`] bytes contain a NUL.
pub fn is_binary(path: &Path) -> std::io::Result<bool> {
    let mut buf = [0u8; BINARY_SNIFF_LEN];
    let mut file = File::open(path)?;
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(buf[..filled].contains(&0))
}

/// Join the normal components of a relative path with `/`.
pub fn to_slash(path: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(parts.join("/"))
}
