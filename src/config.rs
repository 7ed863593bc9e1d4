use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::graph::ExternalPolicy;
use crate::search::QueryMode;

const CONFIG_DIR: &str = ".repolens";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub indexer: IndexerConfig,

    #[serde(default)]
    pub chunker: ChunkerConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub vector: VectorConfig,

    #[serde(default)]
    pub graph: GraphConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Controls which files make it into a snapshot and how they are parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Only include files with these extensions (empty = every text file)
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Patterns to ignore (in addition to .gitignore)
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    /// Honor .gitignore / .ignore files
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,

    /// Include dot-files and dot-directories
    #[serde(default)]
    pub include_hidden: bool,

    /// Files larger than this many bytes are left out of the snapshot
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Number of parallel threads for full scans (None = rayon default)
    #[serde(default)]
    pub parallel_threads: Option<usize>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            ignore_patterns: default_ignore_patterns(),
            respect_gitignore: true,
            include_hidden: false,
            max_file_size: default_max_file_size(),
            parallel_threads: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_ignore_patterns() -> Vec<String> {
    vec![
        "node_modules".to_string(),
        "target".to_string(),
        ".git".to_string(),
        "__pycache__".to_string(),
        ".venv".to_string(),
    ]
}

fn default_max_file_size() -> u64 {
    1024 * 1024
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Window size for line-based chunking
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,

    /// Lines on each side of the target line for fallback context windows
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_lines: default_max_lines(),
            context_lines: default_context_lines(),
        }
    }
}

fn default_max_lines() -> usize {
    50
}

fn default_context_lines() -> usize {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// How text queries are interpreted: auto, literal or regex
    #[serde(default)]
    pub query_mode: QueryMode,

    #[serde(default = "default_true")]
    pub case_sensitive: bool,

    /// Surrounding lines attached to each text hit
    #[serde(default)]
    pub context_lines: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            query_mode: QueryMode::default(),
            case_sensitive: true,
            context_lines: 0,
        }
    }
}

/// Where embedding vectors live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    Disk,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Disk => write!(f, "disk"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// Directory for the disk backend (required when backend = "disk").
    /// Must lie outside the repository; relative paths start from the
    /// working directory.
    #[serde(default)]
    pub persist_dir: Option<PathBuf>,

    /// Batch size for embedding generation
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Default number of semantic results
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            persist_dir: None,
            batch_size: default_batch_size(),
            top_k: default_top_k(),
        }
    }
}

fn default_batch_size() -> usize {
    32
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// What to do with imports that resolve outside the snapshot
    #[serde(default)]
    pub external: ExternalPolicy,

    /// Keep one edge per import statement instead of one per module pair
    #[serde(default)]
    pub multi_edges: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write logs to a rolling file
    #[serde(default)]
    pub enabled: bool,

    /// Also log to stderr
    #[serde(default = "default_true")]
    pub stderr: bool,

    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log directory (relative paths resolve against the project root)
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,

    /// hourly, daily, minutely or never
    #[serde(default = "default_rotation")]
    pub rotation: String,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            stderr: true,
            level: default_log_level(),
            directory: default_log_directory(),
            rotation: default_rotation(),
            file_prefix: default_file_prefix(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_directory() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("logs")
}

fn default_rotation() -> String {
    "daily".to_string()
}

fn default_file_prefix() -> String {
    "repolens.log".to_string()
}

impl Config {
    /// Load configuration from the .repolens directory
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_DIR).join(CONFIG_FILE);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config from {:?}", config_path))?;

            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", config_path))
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to the .repolens directory
    pub fn save(&self, root: &Path) -> Result<()> {
        let config_dir = root.join(CONFIG_DIR);
        let config_path = config_dir.join(CONFIG_FILE);

        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory {:?}", config_dir))?;

        let content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config to {:?}", config_path))?;

        Ok(())
    }

    /// Get the path to the .repolens directory
    pub fn repolens_dir(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR)
    }
}
