//! Gate and validate commands

use anyhow::Result;
use console::style;
use std::path::{Path, PathBuf};

use super::analyze::{analyze_repository, Mode};
use super::{emit, ScanArgs, EXIT_FAILED};
use crate::config::{load_project_config, ProjectConfig};
use crate::error::RepoqError;
use crate::gate::{evaluate, run_gate, GateOutcome};
use crate::rdf::turtle::write_turtle;
use crate::reporters::jsonld::load_report;
use crate::reporters::{format_for_path, OutputFormat};
use crate::shacl::{load_data, ResultSeverity, Validator, Violation};

/// Flags of `repoq gate`
#[derive(Debug, Clone, Default)]
pub struct GateArgs {
    pub shapes: Vec<PathBuf>,
    pub strict: bool,
    pub inference: bool,
    pub report: Option<PathBuf>,
    pub json: bool,
}

/// Shapes from the command line, else from `[gate] shapes` (relative to
/// `root`), else the bundled set.
pub fn load_validator(
    root: &Path,
    shapes: &[PathBuf],
    config: &ProjectConfig,
    inference: bool,
) -> Result<Validator> {
    let validator = if !shapes.is_empty() {
        Validator::from_paths(shapes)?
    } else if !config.gate.shapes.is_empty() {
        let paths: Vec<PathBuf> = config.gate.shapes.iter().map(|p| root.join(p)).collect();
        Validator::from_paths(&paths)?
    } else {
        Validator::bundled()?
    };
    Ok(validator.with_inference(inference))
}

/// Run `repoq gate`.
///
/// The target is a repository (analyzed first), a Turtle data file, or a
/// JSON-LD report.
pub fn run(scan: &ScanArgs, args: &GateArgs, config_path: Option<&Path>) -> Result<i32> {
    let target = &scan.path;
    if !target.exists() {
        return Err(RepoqError::MissingPath(target.clone()).into());
    }

    let outcome = if target.is_file() {
        let base = target.parent().unwrap_or_else(|| Path::new("."));
        let config = load_project_config(base, config_path)?;
        let strict = args.strict || config.gate.strict;
        let validator =
            load_validator(base, &args.shapes, &config, args.inference || config.gate.inference)?;
        match format_for_path(target) {
            Some(OutputFormat::Turtle) => evaluate(&load_data(target)?, &validator, strict),
            Some(OutputFormat::JsonLd) => {
                let mut project = load_report(target)?;
                run_gate(&mut project, &validator, strict)
            }
            _ => {
                return Err(RepoqError::InvalidArgument(format!(
                    "cannot gate {}: expected a repository, a .ttl file or a .jsonld report",
                    target.display()
                ))
                .into())
            }
        }
    } else {
        let mut analysis = analyze_repository(scan, Mode::Full, config_path)?;
        let strict = args.strict || analysis.config.gate.strict;
        let inference = args.inference || analysis.config.gate.inference;
        let validator = load_validator(
            &analysis.project.root,
            &args.shapes,
            &analysis.config,
            inference,
        )?;
        run_gate(&mut analysis.project, &validator, strict)
    };

    if let Some(path) = &args.report {
        emit(&write_turtle(&outcome.report), Some(path))?;
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    Ok(if outcome.passed { 0 } else { EXIT_FAILED })
}

/// Run `repoq validate`: exit 1 unless the data conforms.
pub fn validate(
    data: &Path,
    shapes: &[PathBuf],
    inference: bool,
    report: Option<&Path>,
) -> Result<i32> {
    let graph = load_data(data)?;
    let validator = Validator::from_paths(shapes)?.with_inference(inference);
    let outcome = validator.validate(&graph);

    emit(&write_turtle(&outcome.report), report)?;
    if report.is_some() || console::Term::stderr().is_term() {
        for v in &outcome.violations {
            eprintln!("{}", severity_label(v));
        }
        eprintln!(
            "{} ({} result(s))",
            if outcome.conforms {
                style("Conforms").green().bold()
            } else {
                style("Does not conform").red().bold()
            },
            outcome.violations.len()
        );
    }
    Ok(if outcome.conforms { 0 } else { EXIT_FAILED })
}

fn severity_label(v: &Violation) -> String {
    let line = v.to_string();
    match v.severity {
        ResultSeverity::Violation => style(line).red().to_string(),
        ResultSeverity::Warning => style(line).yellow().to_string(),
        ResultSeverity::Info => style(line).dim().to_string(),
    }
}

fn print_outcome(outcome: &GateOutcome) {
    println!("\n{}", style("Quality gate").bold());
    println!("{}", style("──────────────────────────────────────").dim());
    println!(
        "  {} violation(s), {} warning(s), {} info{}",
        outcome.violations,
        outcome.warnings,
        outcome.infos,
        if outcome.strict { " (strict)" } else { "" }
    );
    for v in outcome.failures() {
        println!("  {}", severity_label(v));
    }
    if outcome.passed {
        println!("\n{}", style("✓ PASSED").green().bold());
    } else {
        println!("\n{}", style("✗ FAILED").red().bold());
    }
}
