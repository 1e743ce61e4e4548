//! Analysis pipeline
//!
//! Runs the analyzers over one `Project` in a fixed order:
//! 1. Walk files (structure)
//! 2. Complexity and maintainability
//! 3. TODO/FIXME markers
//! 4. Git history (if enabled)
//! 5. Hotspot scoring
//!
//! A failing analyzer is logged and skipped; the pipeline itself never fails.

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::analyzers::{
    AnalysisContext, Analyzer, ComplexityAnalyzer, HistoryAnalyzer, HotspotAnalyzer,
    StructureAnalyzer, WeaknessAnalyzer,
};
use crate::models::Project;

/// Analysis pipeline with per-stage switches.
pub struct Pipeline {
    enable_structure: bool,
    enable_complexity: bool,
    enable_weakness: bool,
    enable_git: bool,
    enable_hotspots: bool,
    show_progress: bool,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::full()
    }
}

impl Pipeline {
    /// Every stage.
    pub fn full() -> Self {
        Self {
            enable_structure: true,
            enable_complexity: true,
            enable_weakness: true,
            enable_git: true,
            enable_hotspots: true,
            show_progress: false,
        }
    }

    /// Structure, complexity and markers; no git.
    pub fn structure_only() -> Self {
        Self {
            enable_git: false,
            enable_hotspots: false,
            ..Self::full()
        }
    }

    /// The file walk plus history. The walk defines which files are tracked.
    pub fn history_only() -> Self {
        Self {
            enable_complexity: false,
            enable_weakness: false,
            enable_hotspots: false,
            ..Self::full()
        }
    }

    /// Disable git history mining.
    pub fn without_git(mut self) -> Self {
        self.enable_git = false;
        self
    }

    /// Show a spinner on stderr while stages run.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn stages(&self) -> Vec<Box<dyn Analyzer>> {
        let mut stages: Vec<Box<dyn Analyzer>> = Vec::new();
        if self.enable_structure {
            stages.push(Box::new(StructureAnalyzer));
        }
        if self.enable_complexity {
            stages.push(Box::new(ComplexityAnalyzer));
        }
        if self.enable_weakness {
            stages.push(Box::new(WeaknessAnalyzer));
        }
        if self.enable_git {
            stages.push(Box::new(HistoryAnalyzer));
        }
        if self.enable_hotspots {
            stages.push(Box::new(HotspotAnalyzer));
        }
        stages
    }

    /// Run the enabled stages against `project`.
    pub fn run(&self, project: &mut Project, ctx: &AnalysisContext) -> PipelineStats {
        let mut stats = PipelineStats::default();
        let spinner = self.spinner();

        for analyzer in self.stages() {
            if let Some(pb) = &spinner {
                pb.set_message(format!("{}...", analyzer.name()));
            }
            let start = Instant::now();
            let result = analyzer.run(project, ctx);
            let elapsed = start.elapsed();
            match result {
                Ok(()) => {
                    info!("Stage {} finished in {:?}", analyzer.name(), elapsed);
                }
                Err(e) => {
                    warn!("Stage {} failed, skipping: {:#}", analyzer.name(), e);
                    stats.failed.push((analyzer.name().to_string(), format!("{:#}", e)));
                }
            }
            stats.stages.push(StageTiming {
                name: analyzer.name(),
                duration: elapsed,
            });
        }

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        project.analyzed_at = Some(Utc::now());
        stats.files = project.files.len();
        stats.commits = project.commits.len();
        stats.contributors = project.contributors.len();
        stats.coupling_edges = project.coupling.len();
        stats.issues = project.issues.len();
        stats
    }

    fn spinner(&self) -> Option<ProgressBar> {
        if !self.show_progress || !console::Term::stderr().is_term() {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }
}

/// Time spent in one stage
#[derive(Debug, Clone)]
pub struct StageTiming {
    pub name: &'static str,
    pub duration: Duration,
}

/// Statistics from one pipeline run.
#[derive(Default, Debug)]
pub struct PipelineStats {
    pub files: usize,
    pub commits: usize,
    pub contributors: usize,
    pub coupling_edges: usize,
    pub issues: usize,
    pub stages: Vec<StageTiming>,
    /// (stage, error) for stages that failed
    pub failed: Vec<(String, String)>,
}

impl PipelineStats {
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("{} files", self.files),
            format!("{} commits", self.commits),
            format!("{} contributors", self.contributors),
            format!("{} coupling edges", self.coupling_edges),
            format!("{} issues", self.issues),
        ];
        if !self.failed.is_empty() {
            let names: Vec<&str> = self.failed.iter().map(|(n, _)| n.as_str()).collect();
            parts.push(format!("failed: {}", names.join(", ")));
        }
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use anyhow::Result;
    use tempfile::tempdir;

    fn names(p: &Pipeline) -> Vec<&'static str> {
        p.stages().iter().map(|s| s.name()).collect()
    }

    #[test]
    fn test_stage_selection() {
        assert_eq!(
            names(&Pipeline::full()),
            vec!["structure", "complexity", "weakness", "history", "hotspots"]
        );
        assert_eq!(
            names(&Pipeline::full().without_git()),
            vec!["structure", "complexity", "weakness", "hotspots"]
        );
        assert_eq!(
            names(&Pipeline::structure_only()),
            vec!["structure", "complexity", "weakness"]
        );
        assert_eq!(names(&Pipeline::history_only()), vec!["structure", "history"]);
    }

    #[test]
    fn test_failing_stage_is_skipped() -> Result<()> {
        let dir = tempdir()?;
        let missing = dir.path().join("gone");
        let mut config = ProjectConfig::default();
        config.complexity.external = false;
        let ctx = AnalysisContext::new(&missing, config)?;
        let mut project = Project::new("gone", &missing);

        let stats = Pipeline::full().without_git().run(&mut project, &ctx);
        assert_eq!(stats.failed.len(), 1);
        assert_eq!(stats.failed[0].0, "structure");
        assert_eq!(stats.stages.len(), 4);
        assert!(project.analyzed_at.is_some());
        assert!(stats.summary().contains("failed: structure"));
        Ok(())
    }

    #[test]
    fn test_run_without_git() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("a.py"), "# TODO x\nif x:\n    pass\n")?;
        let mut config = ProjectConfig::default();
        config.complexity.external = false;
        let ctx = AnalysisContext::new(dir.path(), config)?;
        let mut project = Project::new("demo", dir.path());

        let stats = Pipeline::full().without_git().run(&mut project, &ctx);
        assert!(stats.failed.is_empty());
        assert_eq!(stats.files, 1);
        assert_eq!(stats.commits, 0);
        let a = project.file_by_path("a.py").unwrap();
        assert_eq!(a.complexity, Some(2.0));
        assert_eq!(a.todo_count, 1);
        assert_eq!(a.hotness, 0.0);
        Ok(())
    }
}
