//! Analyze, structure and history commands

use anyhow::Result;
use console::style;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{effective_config, emit, repo_root, OutputArgs, ScanArgs, EXIT_FAILED};
use crate::analyzers::AnalysisContext;
use crate::config::ProjectConfig;
use crate::gate::run_gate;
use crate::models::Project;
use crate::pipeline::{Pipeline, PipelineStats};
use crate::reporters::{self, turtle, OutputFormat};

/// Which part of the pipeline a command runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Structure,
    History,
    Full,
}

impl Mode {
    fn pipeline(self, no_git: bool) -> Pipeline {
        let pipeline = match self {
            Mode::Structure => Pipeline::structure_only(),
            Mode::History => Pipeline::history_only(),
            Mode::Full => Pipeline::full(),
        };
        if no_git {
            pipeline.without_git()
        } else {
            pipeline
        }
    }
}

/// A finished analysis
pub struct Analysis {
    pub project: Project,
    pub config: ProjectConfig,
    pub stats: PipelineStats,
}

/// Analyze the repository at `scan.path`.
pub fn analyze_repository(
    scan: &ScanArgs,
    mode: Mode,
    config_path: Option<&Path>,
) -> Result<Analysis> {
    let root = repo_root(&scan.path)?;
    let config = effective_config(&root, scan, config_path)?;
    let ctx = AnalysisContext::new(&root, config.clone())?;

    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "project".to_string());
    let mut project = Project::new(name, &root);

    info!("Analyzing {} ({:?})", root.display(), mode);
    let stats = mode
        .pipeline(scan.no_git)
        .with_progress(true)
        .run(&mut project, &ctx);
    for (stage, error) in &stats.failed {
        warn!("{} stage produced no data: {}", stage, error);
    }

    Ok(Analysis {
        project,
        config,
        stats,
    })
}

/// Run `structure`, `history` or `analyze`.
///
/// `validation` is `Some(shapes)` when the result should go through the
/// quality gate before it is written.
pub fn run(
    mode: Mode,
    scan: &ScanArgs,
    output: &OutputArgs,
    validation: Option<&[PathBuf]>,
    config_path: Option<&Path>,
) -> Result<i32> {
    let Analysis {
        mut project,
        config,
        stats,
    } = analyze_repository(scan, mode, config_path)?;

    let mut gate_failed = false;
    if let Some(shapes) = validation {
        let validator = super::gate::load_validator(
            &project.root,
            shapes,
            &config,
            config.gate.inference,
        )?;
        let outcome = run_gate(&mut project, &validator, config.gate.strict);
        gate_failed = !outcome.passed;
    }

    emit(
        &reporters::report(&project, &output.format)?,
        output.output.as_deref(),
    )?;
    if let Some(path) = &output.ttl {
        emit(&turtle::render(&project)?, Some(path))?;
    }
    if let Some(path) = &output.md {
        emit(
            &reporters::report_with_format(&project, OutputFormat::Markdown)?,
            Some(path),
        )?;
    }

    print_summary(&project, &stats, output);
    Ok(if gate_failed { EXIT_FAILED } else { 0 })
}

/// Short summary on stderr; stdout may carry the report itself.
fn print_summary(project: &Project, stats: &PipelineStats, output: &OutputArgs) {
    if !console::Term::stderr().is_term() {
        return;
    }
    eprintln!("\n{}", style("RepoQ Analysis").bold());
    eprintln!("{}", style("──────────────────────────────────────").dim());
    eprintln!("  {}", stats.summary());

    let issues = project.issue_summary();
    if issues.total > 0 {
        eprintln!(
            "  {} high+  {} medium  {} low  {} info",
            style(issues.critical + issues.high).red().bold(),
            style(issues.medium).yellow(),
            style(issues.low).green(),
            style(issues.info).dim()
        );
    }
    if let Some(v) = &project.validation {
        let verdict = if v.conforms {
            style("conforms").green()
        } else {
            style("does not conform").red()
        };
        eprintln!(
            "  SHACL: {} ({} violations, {} warnings)",
            verdict, v.violations, v.warnings
        );
    }
    for path in [&output.output, &output.ttl, &output.md].into_iter().flatten() {
        eprintln!("  {} {}", style("wrote").dim(), path.display());
    }
}
