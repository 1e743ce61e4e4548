//! Diff command: compare two JSON-LD reports
//!
//! Shows new issues, fixed issues and the largest hotness changes.

use anyhow::Result;
use console::style;
use std::path::Path;

use super::EXIT_FAILED;
use crate::diff::{diff_reports, DiffResult};
use crate::models::Severity;

/// Hotness changes shown in the text output
const MAX_DELTAS: usize = 10;

pub fn run(old: &Path, new: &Path, fail_on_regression: bool, json: bool) -> Result<i32> {
    let diff = diff_reports(old, new)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&diff)?);
    } else {
        print!("{}", format_text(&diff));
    }

    if fail_on_regression && diff.has_regressions() {
        return Ok(EXIT_FAILED);
    }
    Ok(0)
}

fn severity_style(severity: Severity) -> console::StyledObject<String> {
    let label = severity.to_string().to_uppercase();
    match severity {
        Severity::Critical | Severity::High => style(label).red().bold(),
        Severity::Medium => style(label).yellow(),
        Severity::Low | Severity::Info => style(label).dim(),
    }
}

fn format_text(diff: &DiffResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n{}\n", style("RepoQ Diff").bold()));
    out.push_str(&format!(
        "{}\n",
        style("──────────────────────────────────────").dim()
    ));

    if diff.is_empty() {
        out.push_str("  No changes.\n");
        return out;
    }

    out.push_str(&format!(
        "\n  {} new issue(s), {} fixed\n",
        diff.new_issues.len(),
        diff.fixed_issues.len()
    ));
    for issue in &diff.new_issues {
        out.push_str(&format!(
            "  {} [{}] {}\n",
            style("+").red(),
            severity_style(issue.severity),
            issue.title
        ));
    }
    for issue in &diff.fixed_issues {
        out.push_str(&format!(
            "  {} [{}] {}\n",
            style("-").green(),
            severity_style(issue.severity),
            issue.title
        ));
    }

    if !diff.hotness_deltas.is_empty() {
        out.push_str(&format!("\n  {}\n", style("Hotness changes").bold()));
        for d in diff.hotness_deltas.iter().take(MAX_DELTAS) {
            let before = d.old.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "new".into());
            let after = d.new.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "gone".into());
            let delta = if d.delta > 0.0 {
                style(format!("{:+.2}", d.delta)).red()
            } else {
                style(format!("{:+.2}", d.delta)).green()
            };
            out.push_str(&format!("  {}  {} → {}  {}\n", delta, before, after, d.path));
        }
        if diff.hotness_deltas.len() > MAX_DELTAS {
            out.push_str(&format!(
                "  ... and {} more\n",
                diff.hotness_deltas.len() - MAX_DELTAS
            ));
        }
    }

    let regressions = diff.regressions().count();
    if regressions > 0 {
        out.push_str(&format!(
            "\n  {} {} new high/critical issue(s)\n",
            style("✗").red().bold(),
            regressions
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{issue_id, Issue, IssueKind};
    use crate::reporters::jsonld::render;
    use crate::reporters::tests::sample_project;
    use tempfile::tempdir;

    fn write_pair(dir: &Path, severity: Severity) -> Result<(std::path::PathBuf, std::path::PathBuf)> {
        let old = dir.join("old.jsonld");
        let new = dir.join("new.jsonld");
        let before = sample_project();
        let mut after = sample_project();
        after.upsert_issue(Issue {
            id: issue_id(IssueKind::Hotspot, "src/c.py"),
            kind: IssueKind::Hotspot,
            severity,
            title: "Hotspot: src/c.py".into(),
            description: String::new(),
            file: None,
            score: None,
        });
        std::fs::write(&old, render(&before)?)?;
        std::fs::write(&new, render(&after)?)?;
        Ok((old, new))
    }

    #[test]
    fn test_fail_on_regression() -> Result<()> {
        let dir = tempdir()?;
        let (old, new) = write_pair(dir.path(), Severity::High)?;
        assert_eq!(run(&old, &new, false, false)?, 0);
        assert_eq!(run(&old, &new, true, true)?, EXIT_FAILED);
        Ok(())
    }

    #[test]
    fn test_medium_issue_is_not_a_regression() -> Result<()> {
        let dir = tempdir()?;
        let (old, new) = write_pair(dir.path(), Severity::Medium)?;
        assert_eq!(run(&old, &new, true, false)?, 0);
        Ok(())
    }

    #[test]
    fn test_text_output() {
        let project = sample_project();
        let empty = crate::diff::diff_projects(&project, &project);
        assert!(format_text(&empty).contains("No changes."));

        let mut after = sample_project();
        after.issues.clear();
        let text = format_text(&crate::diff::diff_projects(&project, &after));
        assert!(text.contains("0 new issue(s), 2 fixed"));
    }
}
