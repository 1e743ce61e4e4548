//! CLI command definitions and handlers

mod analyze;
mod diff;
mod gate;
mod plan;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::{load_project_config, ProjectConfig};
use crate::error::RepoqError;
use crate::utils::HashAlgorithm;

/// Process exit code when a gate, validation or regression check fails
pub const EXIT_FAILED: i32 = 1;
/// Process exit code for operational errors
pub const EXIT_ERROR: i32 = 2;

/// RepoQ - repository quality analysis
#[derive(Parser, Debug)]
#[command(name = "repoq")]
#[command(
    version,
    about = "Repository quality analysis: structure, complexity, churn, coupling and hotspots as JSON-LD/RDF, with SHACL quality gates",
    long_about = "RepoQ walks a repository, measures size and complexity, mines git history \
for churn, ownership and temporal coupling, scores hotspots, and exports the result as a \
JSON-LD or Turtle knowledge graph. The same graph can be checked against SHACL shapes \
as a CI quality gate.",
    after_help = "\
Examples:
  repoq analyze .                           Full analysis, JSON-LD on stdout
  repoq analyze . -o report.jsonld --ttl report.ttl --md report.md
  repoq gate . --strict                     Fail on SHACL violations or warnings
  repoq validate report.ttl --shapes shapes/
  repoq diff old.jsonld new.jsonld --fail-on-regression
  repoq refactor-plan report.jsonld --top 10"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Config file (default: repoq.toml in the analyzed repository)
    #[arg(long, global = true, env = "REPOQ_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Files, modules, complexity and markers (no git)
    Structure {
        #[command(flatten)]
        scan: ScanArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Commits, contributors, churn, ownership and coupling
    History {
        #[command(flatten)]
        scan: ScanArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Run the whole pipeline and write reports
    #[command(
        visible_alias = "full",
        after_help = "\
Examples:
  repoq analyze .                                   JSON-LD on stdout
  repoq analyze . --format turtle                   Turtle on stdout
  repoq analyze . -o report.jsonld --md report.md   Report files
  repoq analyze . --since 2024-01-01 --max-commits 500
  repoq analyze . --validate --shapes shapes/       Record SHACL results as issues"
    )]
    Analyze {
        #[command(flatten)]
        scan: ScanArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Validate the result against SHACL shapes and record the results
        #[arg(long)]
        validate: bool,

        /// Shape files or directories (default: config, then bundled shapes)
        #[arg(long)]
        shapes: Vec<PathBuf>,
    },

    /// Compare two JSON-LD reports
    #[command(after_help = "\
Examples:
  repoq diff old.jsonld new.jsonld
  repoq diff old.jsonld new.jsonld --fail-on-regression   Exit 1 on new high/critical issues")]
    Diff {
        /// Earlier report
        old: PathBuf,

        /// Later report
        new: PathBuf,

        /// Exit with code 1 when new high or critical issues appear
        #[arg(long)]
        fail_on_regression: bool,

        /// Print the diff as JSON
        #[arg(long)]
        json: bool,
    },

    /// Analyze (or load a Turtle file) and check it against SHACL shapes
    #[command(after_help = "\
Examples:
  repoq gate .                        Bundled shapes, violations fail
  repoq gate . --strict               Warnings fail too
  repoq gate report.ttl --shapes shapes/ --inference")]
    Gate {
        #[command(flatten)]
        scan: ScanArgs,

        /// Shape files or directories (default: config, then bundled shapes)
        #[arg(long)]
        shapes: Vec<PathBuf>,

        /// Treat sh:Warning results as failures
        #[arg(long)]
        strict: bool,

        /// Apply RDFS subclass/subproperty inference first
        #[arg(long)]
        inference: bool,

        /// Write the sh:ValidationReport as Turtle
        #[arg(long)]
        report: Option<PathBuf>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a Turtle data file against SHACL shapes
    Validate {
        /// Turtle data file
        data: PathBuf,

        /// Shape files or directories
        #[arg(long, required = true)]
        shapes: Vec<PathBuf>,

        /// Apply RDFS subclass/subproperty inference first
        #[arg(long)]
        inference: bool,

        /// Write the sh:ValidationReport as Turtle (default: stdout)
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Ordered refactoring tasks from hotspots and markers
    #[command(after_help = "\
Examples:
  repoq refactor-plan .                         Analyze, then plan
  repoq refactor-plan report.jsonld --top 10    Plan from a saved report
  repoq refactor-plan . --format json")]
    RefactorPlan {
        #[command(flatten)]
        scan: ScanArgs,

        /// Keep only the first N tasks
        #[arg(long)]
        top: Option<usize>,

        /// Output format: markdown (or md), json
        #[arg(long, short = 'f', default_value = "markdown", value_parser = ["markdown", "md", "json"])]
        format: String,

        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

/// Repository path plus analysis overrides shared by analyzing commands
#[derive(Args, Debug, Clone, Default)]
pub struct ScanArgs {
    /// Repository path (or a report file where the command accepts one)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Only analyze files with these extensions (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Extra exclusion globs (repeatable)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Stop after this many files
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Only mine commits since this date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub since: Option<String>,

    /// Stop after this many commits
    #[arg(long)]
    pub max_commits: Option<usize>,

    /// Number of top files that get a hotspot issue
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Checksum algorithm
    #[arg(long, value_parser = ["sha256", "xxh3"])]
    pub hash: Option<String>,

    /// Skip git history mining
    #[arg(long)]
    pub no_git: bool,

    /// Use the built-in complexity estimate even when radon is installed
    #[arg(long)]
    pub no_external: bool,
}

impl ScanArgs {
    /// Apply the flags on top of file configuration.
    pub fn apply(&self, config: &mut ProjectConfig) -> Result<()> {
        if !self.extensions.is_empty() {
            config.structure.extensions = self
                .extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect();
        }
        for pattern in &self.exclude {
            if !config.exclude.paths.contains(pattern) {
                config.exclude.paths.push(pattern.clone());
            }
        }
        if let Some(n) = self.max_files {
            config.structure.max_files = n;
        }
        if let Some(since) = &self.since {
            config.history.since = Some(since.clone());
        }
        if let Some(n) = self.max_commits {
            config.history.max_commits = n;
        }
        if let Some(n) = self.top_n {
            config.hotspots.top_n = n;
        }
        if let Some(hash) = &self.hash {
            config.structure.hash = hash.parse::<HashAlgorithm>()?;
        }
        if self.no_external {
            config.complexity.external = false;
        }
        Ok(())
    }
}

/// Where reports go
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Output format: jsonld (or json), turtle (or ttl), markdown (or md)
    #[arg(long, short = 'f', default_value = "jsonld", value_parser = ["jsonld", "json-ld", "json", "turtle", "ttl", "markdown", "md"])]
    pub format: String,

    /// Write the report in --format to this file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Also write a Turtle report here
    #[arg(long)]
    pub ttl: Option<PathBuf>,

    /// Also write a Markdown report here
    #[arg(long)]
    pub md: Option<PathBuf>,
}

/// Canonical repository root; a missing path or a non-directory is an error.
fn repo_root(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(RepoqError::MissingPath(path.to_path_buf()).into());
    }
    if !path.is_dir() {
        return Err(RepoqError::InvalidArgument(format!(
            "{} is not a directory",
            path.display()
        ))
        .into());
    }
    Ok(path.canonicalize()?)
}

/// Effective configuration for `root`: the config file, then the flags.
fn effective_config(root: &Path, scan: &ScanArgs, explicit: Option<&Path>) -> Result<ProjectConfig> {
    let mut config = load_project_config(root, explicit)?;
    scan.apply(&mut config)?;
    Ok(config)
}

/// Write `content` to `path`, or stdout when `path` is `None`.
fn emit(content: &str, path: Option<&Path>) -> Result<()> {
    use anyhow::Context;
    match path {
        Some(p) => {
            if let Some(parent) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(p, content).with_context(|| format!("Failed to write {}", p.display()))
        }
        None => {
            print!("{}", content);
            if !content.ends_with('\n') {
                println!();
            }
            Ok(())
        }
    }
}

/// Run a CLI command, returning the process exit code.
pub fn run(cli: Cli) -> Result<i32> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Structure { scan, output } => {
            analyze::run(analyze::Mode::Structure, &scan, &output, None, config)
        }
        Commands::History { scan, output } => {
            analyze::run(analyze::Mode::History, &scan, &output, None, config)
        }
        Commands::Analyze {
            scan,
            output,
            validate,
            shapes,
        } => {
            let validation = validate.then_some(shapes.as_slice());
            analyze::run(analyze::Mode::Full, &scan, &output, validation, config)
        }
        Commands::Diff {
            old,
            new,
            fail_on_regression,
            json,
        } => diff::run(&old, &new, fail_on_regression, json),
        Commands::Gate {
            scan,
            shapes,
            strict,
            inference,
            report,
            json,
        } => gate::run(
            &scan,
            &gate::GateArgs {
                shapes,
                strict,
                inference,
                report,
                json,
            },
            config,
        ),
        Commands::Validate {
            data,
            shapes,
            inference,
            report,
        } => gate::validate(&data, &shapes, inference, report.as_deref()),
        Commands::RefactorPlan {
            scan,
            top,
            format,
            output,
        } => plan::run(&scan, top, &format, output.as_deref(), config),
    }
}
