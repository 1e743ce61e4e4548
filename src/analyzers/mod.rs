//! Analyzers that populate a [`Project`]
//!
//! Each analyzer reads what earlier ones wrote and enriches the aggregate in
//! place. The order is fixed by the pipeline:
//!
//! 1. `structure` creates File and Module records and import edges
//! 2. `complexity` fills complexity and maintainability
//! 3. `weakness` counts TODO/FIXME markers
//! 4. `history` adds commits, contributors, churn, ownership and coupling
//! 5. `hotspots` scores files from the numbers above

pub mod complexity;
pub mod external_tool;
pub mod history;
pub mod hotspots;
pub mod imports;
pub mod structure;
pub mod weakness;

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

use crate::config::ProjectConfig;
use crate::models::Project;

pub use complexity::ComplexityAnalyzer;
pub use history::HistoryAnalyzer;
pub use hotspots::HotspotAnalyzer;
pub use structure::StructureAnalyzer;
pub use weakness::WeaknessAnalyzer;

/// Inputs shared by every analyzer in one run
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    /// Repository root, absolute
    pub root: PathBuf,
    /// Effective configuration (file values with CLI overrides applied)
    pub config: ProjectConfig,
    /// Parsed `history.since`
    pub since: Option<DateTime<Utc>>,
}

impl AnalysisContext {
    pub fn new(root: impl Into<PathBuf>, config: ProjectConfig) -> Result<Self> {
        let since = config
            .history
            .since
            .as_deref()
            .map(crate::git::parse_since)
            .transpose()?;
        Ok(Self {
            root: root.into(),
            config,
            since,
        })
    }
}

/// One analysis pass over the project
pub trait Analyzer {
    /// Short identifier used in logs and stats
    fn name(&self) -> &'static str;

    /// Enrich `project` in place.
    ///
    /// An error means this analyzer produced nothing usable; the pipeline
    /// logs it and moves on.
    fn run(&self, project: &mut Project, ctx: &AnalysisContext) -> Result<()>;
}
