//! Output reporters for RepoQ analysis results
//!
//! Supports three output formats:
//! - `jsonld` - JSON-LD document with an `@context` over the `repo:` vocabulary
//! - `turtle` - the same facts as RDF Turtle
//! - `markdown` - GitHub-flavored Markdown summary

pub mod jsonld;
mod markdown;
pub mod turtle;

use crate::models::Project;
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    JsonLd,
    Turtle,
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jsonld" | "json-ld" | "json" => Ok(OutputFormat::JsonLd),
            "turtle" | "ttl" => Ok(OutputFormat::Turtle),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(anyhow!(
                "Unknown format '{}'. Valid formats: jsonld, turtle, markdown",
                s
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::JsonLd => write!(f, "jsonld"),
            OutputFormat::Turtle => write!(f, "turtle"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// Render a project in the specified format
pub fn report(project: &Project, format: &str) -> Result<String> {
    let fmt = OutputFormat::from_str(format)?;
    report_with_format(project, fmt)
}

/// Render a project using an OutputFormat enum
pub fn report_with_format(project: &Project, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::JsonLd => jsonld::render(project),
        OutputFormat::Turtle => turtle::render(project),
        OutputFormat::Markdown => markdown::render(project),
    }
}

/// Get the recommended file extension for a format
pub fn file_extension(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::JsonLd => "jsonld",
        OutputFormat::Turtle => "ttl",
        OutputFormat::Markdown => "md",
    }
}

/// Guess the format of an output path from its extension
pub fn format_for_path(path: &std::path::Path) -> Option<OutputFormat> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    [OutputFormat::JsonLd, OutputFormat::Turtle, OutputFormat::Markdown]
        .into_iter()
        .find(|f| file_extension(*f) == ext)
        .or(match ext.as_str() {
            "json" => Some(OutputFormat::JsonLd),
            "markdown" => Some(OutputFormat::Markdown),
            _ => None,
        })
}
