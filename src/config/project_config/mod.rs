//! Project-level configuration support
//!
//! Loads per-project configuration from `repoq.toml` in the repository
//! root, or from an explicit `--config` path.
//!
//! # Configuration Format
//!
//! ```toml
//! # repoq.toml
//!
//! [exclude]
//! paths = ["generated/", "**/*.pb.go"]
//!
//! [structure]
//! extensions = ["py", "rs"]
//! max_files = 5000
//! hash = "xxh3"
//!
//! [history]
//! since = "2024-01-01"
//! max_commits = 2000
//! ownership_threshold = 0.5
//!
//! [hotspots]
//! top_n = 25
//!
//! [gate]
//! shapes = ["shapes/"]
//! strict = true
//! ```

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::RepoqError;
use crate::utils::{HashAlgorithm, DEFAULT_EXCLUDE_PATTERNS};

/// File name searched for in the repository root
pub const CONFIG_FILE_NAME: &str = "repoq.toml";

/// Project-level configuration loaded from repoq.toml
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Path exclusion patterns
    #[serde(default)]
    pub exclude: ExcludeConfig,

    /// File walk settings
    #[serde(default)]
    pub structure: StructureConfig,

    /// Git history mining settings
    #[serde(default)]
    pub history: HistoryConfig,

    /// Hotspot scoring settings
    #[serde(default)]
    pub hotspots: HotspotConfig,

    /// Complexity analysis settings
    #[serde(default)]
    pub complexity: ComplexityConfig,

    /// Quality gate settings
    #[serde(default)]
    pub gate: GateConfig,
}

/// Path exclusion configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExcludeConfig {
    /// Paths/patterns to exclude from analysis
    #[serde(default)]
    pub paths: Vec<String>,

    /// If true, disable built-in default exclusion patterns
    #[serde(default)]
    pub skip_defaults: bool,
}

impl ExcludeConfig {
    /// Returns effective exclusion patterns (defaults + user patterns).
    /// If `skip_defaults` is true, only user patterns are returned.
    pub fn effective_patterns(&self) -> Vec<String> {
        let mut patterns = Vec::new();

        if !self.skip_defaults {
            patterns.extend(DEFAULT_EXCLUDE_PATTERNS.iter().map(|s| s.to_string()));
        }

        for p in &self.paths {
            if !patterns.contains(p) {
                patterns.push(p.clone());
            }
        }

        patterns
    }
}

/// File walk settings
#[derive(Debug, Clone, Deserialize)]
pub struct StructureConfig {
    /// Only include files with these extensions (empty = all text files)
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Maximum files to analyze (0 = unlimited)
    #[serde(default)]
    pub max_files: usize,

    /// Checksum algorithm
    #[serde(default)]
    pub hash: HashAlgorithm,

    /// Skip files larger than this many bytes
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            max_files: 0,
            hash: HashAlgorithm::default(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_max_file_bytes() -> u64 {
    2 * 1024 * 1024
}

/// Git history mining settings
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Only consider commits at or after this date (RFC 3339 or YYYY-MM-DD)
    #[serde(default)]
    pub since: Option<String>,

    /// Maximum commits to walk (0 = unlimited)
    #[serde(default)]
    pub max_commits: usize,

    /// Share of added lines a contributor needs to own a file
    #[serde(default = "default_ownership_threshold")]
    pub ownership_threshold: f64,

    /// Drop coupling edges lighter than this
    #[serde(default = "default_min_coupling_weight")]
    pub min_coupling_weight: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            since: None,
            max_commits: 0,
            ownership_threshold: default_ownership_threshold(),
            min_coupling_weight: default_min_coupling_weight(),
        }
    }
}

fn default_ownership_threshold() -> f64 {
    0.5
}

fn default_min_coupling_weight() -> u64 {
    1
}

/// Hotspot scoring settings
#[derive(Debug, Clone, Deserialize)]
pub struct HotspotConfig {
    /// Number of top-scoring files that get a hotspot issue
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
        }
    }
}

fn default_top_n() -> usize {
    50
}

/// Complexity analysis settings
#[derive(Debug, Clone, Deserialize)]
pub struct ComplexityConfig {
    /// Delegate Python files to `radon` when it is installed
    #[serde(default = "default_true")]
    pub external: bool,

    /// Timeout for each external tool run, seconds
    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            external: true,
            timeout_secs: default_tool_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_tool_timeout() -> u64 {
    120
}

/// Quality gate settings
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GateConfig {
    /// Shape files or directories (relative to the repository root)
    #[serde(default)]
    pub shapes: Vec<PathBuf>,

    /// Treat warnings as failures
    #[serde(default)]
    pub strict: bool,

    /// Apply RDFS subclass/subproperty inference before validation
    #[serde(default)]
    pub inference: bool,
}

/// Load project configuration.
///
/// With an explicit path, the file must exist. Otherwise `repoq.toml` in
/// `repo_path` is used if present, and defaults if not. A config file that
/// fails to parse is a fatal error.
pub fn load_project_config(repo_path: &Path, explicit: Option<&Path>) -> Result<ProjectConfig> {
    let path = match explicit {
        Some(p) => {
            if !p.exists() {
                return Err(RepoqError::MissingPath(p.to_path_buf()).into());
            }
            p.to_path_buf()
        }
        None => {
            let p = repo_path.join(CONFIG_FILE_NAME);
            if !p.exists() {
                debug!("No project config found, using defaults");
                return Ok(ProjectConfig::default());
            }
            p
        }
    };

    let config = load_toml_config(&path)?;
    debug!("Loaded project config from {}", path.display());
    Ok(config)
}

/// Load configuration from a TOML file
fn load_toml_config(path: &Path) -> Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ProjectConfig = toml::from_str(&content).map_err(|e| RepoqError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if !(0.0..=1.0).contains(&config.history.ownership_threshold) {
        return Err(RepoqError::Config {
            path: path.to_path_buf(),
            message: format!(
                "history.ownership_threshold must be within 0..=1, got {}",
                config.history.ownership_threshold
            ),
        }
        .into());
    }
    Ok(config)
}

impl ProjectConfig {
    /// Check if a relative path should be excluded
    pub fn should_exclude(&self, rel_path: &str) -> bool {
        crate::utils::is_excluded(rel_path, &self.exclude.effective_patterns())
    }
}
