//! Embedded SHACL-core validator
//!
//! Shapes come from Turtle files (a single file or every `*.ttl` in a
//! directory) or from the bundled `quality.ttl`. Validation produces a
//! standard `sh:ValidationReport` graph plus the typed [`Violation`]s read
//! back from it.

pub mod engine;
pub mod inference;
pub mod report;
pub mod shapes;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::RepoqError;
use crate::rdf::turtle::{parse_turtle, parse_turtle_into};
use crate::rdf::Graph;

pub use report::{report_conforms, violations_from_report, ResultSeverity, Violation};
pub use shapes::ShapeSet;

/// Default quality shapes shipped with the binary
pub const BUNDLED_SHAPES: &str = include_str!("../../shapes/quality.ttl");
pub const BUNDLED_SHAPES_NAME: &str = "quality.ttl";

/// Shape files under `path`: the file itself, or the `*.ttl` files of a
/// directory in name order.
pub fn shape_files(path: &Path) -> Result<Vec<PathBuf>, RepoqError> {
    if !path.exists() {
        return Err(RepoqError::ShapesNotFound(path.to_path_buf()));
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(path)
        .map_err(|_| RepoqError::ShapesNotFound(path.to_path_buf()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("ttl"))
        })
        .collect();
    if files.is_empty() {
        return Err(RepoqError::NoShapeFiles(path.to_path_buf()));
    }
    files.sort();
    Ok(files)
}

/// Read a Turtle data file.
pub fn load_data(path: &Path) -> Result<Graph> {
    if !path.is_file() {
        return Err(RepoqError::MissingPath(path.to_path_buf()).into());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(parse_turtle(&text, &path.display().to_string())?)
}

/// Result of one validation
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    /// The `sh:ValidationReport` graph
    pub report: Graph,
    pub conforms: bool,
    pub violations: Vec<Violation>,
}

impl ValidationOutcome {
    pub fn count(&self, severity: ResultSeverity) -> usize {
        self.violations.iter().filter(|v| v.severity == severity).count()
    }
}

/// Shapes ready to validate data graphs
#[derive(Debug, Clone)]
pub struct Validator {
    shapes_graph: Graph,
    shapes: ShapeSet,
    sources: Vec<String>,
    inference: bool,
}

impl Validator {
    /// Validator over the bundled quality shapes.
    pub fn bundled() -> Result<Self> {
        let graph = parse_turtle(BUNDLED_SHAPES, BUNDLED_SHAPES_NAME)?;
        Ok(Self::from_graph(graph, vec![BUNDLED_SHAPES_NAME.to_string()]))
    }

    /// Load shapes from files and/or directories.
    pub fn from_paths(paths: &[PathBuf]) -> Result<Self> {
        let mut graph = Graph::new();
        let mut sources = Vec::new();
        for path in paths {
            for file in shape_files(path)? {
                let text = std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read shapes {}", file.display()))?;
                let name = file.display().to_string();
                parse_turtle_into(&mut graph, &text, &name)?;
                debug!("Loaded shapes from {}", name);
                sources.push(name);
            }
        }
        Ok(Self::from_graph(graph, sources))
    }

    pub fn from_graph(shapes_graph: Graph, sources: Vec<String>) -> Self {
        let shapes = ShapeSet::from_graph(&shapes_graph);
        info!(
            "Loaded {} shapes from {} file(s)",
            shapes.len(),
            sources.len()
        );
        Self {
            shapes_graph,
            shapes,
            sources,
            inference: false,
        }
    }

    /// Apply RDFS inference to data graphs before validating.
    pub fn with_inference(mut self, inference: bool) -> Self {
        self.inference = inference;
        self
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn shapes(&self) -> &ShapeSet {
        &self.shapes
    }

    pub fn validate(&self, data: &Graph) -> ValidationOutcome {
        let report = if self.inference {
            let mut data = data.clone();
            inference::apply_rdfs(&mut data, &[&self.shapes_graph]);
            engine::validate(&data, &self.shapes)
        } else {
            engine::validate(data, &self.shapes)
        };
        let violations = violations_from_report(&report);
        let conforms = report_conforms(&report);
        info!(
            "Validation finished: {} result(s), conforms = {}",
            violations.len(),
            conforms
        );
        ValidationOutcome {
            report,
            conforms,
            violations,
        }
    }
}
