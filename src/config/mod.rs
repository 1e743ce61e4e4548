//! Configuration module for RepoQ
//!
//! This module handles:
//! - Project-level configuration (repoq.toml)
//! - Exclusion patterns
//! - Analyzer thresholds and gate defaults

mod project_config;

pub use project_config::{
    load_project_config, ComplexityConfig, ExcludeConfig, GateConfig, HistoryConfig,
    HotspotConfig, ProjectConfig, StructureConfig, CONFIG_FILE_NAME,
};
