//! RepoQ - repository quality analysis
//!
//! Walks a repository, measures size and complexity, mines git history for
//! churn, ownership and temporal coupling, scores hotspots, and exports the
//! result as JSON-LD or Turtle. The same RDF graph can be validated against
//! SHACL shapes as a quality gate.

pub mod analyzers;
pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod gate;
pub mod git;
pub mod models;
pub mod pipeline;
pub mod plan;
pub mod rdf;
pub mod reporters;
pub mod shacl;
pub mod utils;
