//! Fatal error taxonomy
//!
//! Analyzer hiccups (an unreadable file, a failing `git` call) are logged and
//! swallowed where they happen. The errors below are the ones that must stop a
//! command: bad input, bad configuration, unusable shapes.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that terminate a command with exit code 2
#[derive(Error, Debug)]
pub enum RepoqError {
    #[error("Path does not exist: {0}")]
    MissingPath(PathBuf),

    #[error("Shapes not found: {0}")]
    ShapesNotFound(PathBuf),

    #[error("No shape files (*.ttl) found in {0}")]
    NoShapeFiles(PathBuf),

    #[error("Turtle parse error in {source_name} at line {line}, column {column}: {message}")]
    TurtleParse {
        source_name: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("Invalid JSON-LD report {path}: {message}")]
    Report { path: PathBuf, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
