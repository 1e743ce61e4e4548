//! Refactor-plan command

use anyhow::Result;
use std::path::Path;

use super::analyze::{analyze_repository, Mode};
use super::{emit, ScanArgs};
use crate::error::RepoqError;
use crate::plan::build_plan;
use crate::reporters::jsonld::load_report;
use crate::reporters::{format_for_path, OutputFormat};

/// Plan from a JSON-LD report, or from a fresh analysis of a repository.
pub fn run(
    scan: &ScanArgs,
    top: Option<usize>,
    format: &str,
    output: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<i32> {
    let target = &scan.path;
    let project = if target.is_file() {
        if format_for_path(target) != Some(OutputFormat::JsonLd) {
            return Err(RepoqError::InvalidArgument(format!(
                "{} is not a JSON-LD report",
                target.display()
            ))
            .into());
        }
        load_report(target)?
    } else {
        analyze_repository(scan, Mode::Full, config_path)?.project
    };

    let plan = build_plan(&project, top);
    let rendered = match format {
        "json" => plan.to_json()?,
        _ => plan.to_markdown(),
    };
    emit(&rendered, output)?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::jsonld::render;
    use crate::reporters::tests::sample_project;
    use tempfile::tempdir;

    #[test]
    fn test_plan_from_report() -> Result<()> {
        let dir = tempdir()?;
        let report = dir.path().join("report.jsonld");
        std::fs::write(&report, render(&sample_project())?)?;
        let out = dir.path().join("plan.json");
        let scan = ScanArgs {
            path: report,
            ..Default::default()
        };

        assert_eq!(run(&scan, None, "json", Some(&out), None)?, 0);
        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&out)?)?;
        assert_eq!(json["project"], "demo");
        assert_eq!(json["tasks"][0]["file"], "src/a.py");
        Ok(())
    }

    #[test]
    fn test_rejects_non_report_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("data.ttl");
        std::fs::write(&path, "")?;
        let scan = ScanArgs {
            path,
            ..Default::default()
        };
        assert!(run(&scan, None, "markdown", None, None).is_err());
        Ok(())
    }
}
