//! Markdown reporter for GitHub-flavored Markdown output
//!
//! Suitable for pull request comments and CI job summaries.

use crate::analyzers::hotspots::rank;
use crate::models::{Project, Severity};
use anyhow::Result;
use std::fmt::Write as _;

/// Rows shown in each table
const MAX_ROWS: usize = 10;

/// Render the project as GitHub-flavored Markdown
pub fn render(project: &Project) -> Result<String> {
    let mut md = String::new();

    md.push_str(&render_header(project));
    md.push('\n');
    md.push_str(&render_summary(project));
    md.push('\n');
    md.push_str(&render_hotspots(project));
    md.push('\n');
    md.push_str(&render_coupling(project));
    md.push('\n');
    md.push_str(&render_issues(project));
    md.push('\n');
    md.push_str(&render_contributors(project));
    if let Some(section) = render_validation(project) {
        md.push('\n');
        md.push_str(&section);
    }
    md.push('\n');
    md.push_str(&render_footer());

    Ok(md)
}

/// Escape characters that would break a table cell.
fn cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

fn path_of(project: &Project, file_id: &str) -> String {
    project
        .files
        .get(file_id)
        .map(|f| f.path.clone())
        .unwrap_or_else(|| file_id.trim_start_matches("repo:file/").to_string())
}

fn person_name(project: &Project, person_id: Option<&String>) -> String {
    person_id
        .and_then(|id| project.contributors.get(id))
        .map(|p| p.name.clone())
        .unwrap_or_else(|| "-".to_string())
}

fn render_header(project: &Project) -> String {
    let mut out = format!("# RepoQ report: {}\n\n", project.name);
    if let Some(at) = project.analyzed_at {
        let _ = writeln!(out, "Analyzed: {}  ", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(head) = &project.git_head {
        let _ = writeln!(out, "HEAD: `{}`  ", head);
    }
    out
}

fn render_summary(project: &Project) -> String {
    let s = project.issue_summary();
    let mut out = String::from("## Summary\n\n| Metric | Value |\n|--------|-------|\n");
    let rows = [
        ("Files", project.files.len().to_string()),
        ("Modules", project.modules.len().to_string()),
        ("Lines of code", project.total_loc().to_string()),
        ("Commits", project.commits.len().to_string()),
        ("Contributors", project.contributors.len().to_string()),
        ("Coupling edges", project.coupling.len().to_string()),
        ("Dependencies", project.dependencies.len().to_string()),
        (
            "Issues",
            format!(
                "{} ({} critical, {} high, {} medium, {} low, {} info)",
                s.total, s.critical, s.high, s.medium, s.low, s.info
            ),
        ),
    ];
    for (name, value) in rows {
        let _ = writeln!(out, "| {} | {} |", name, value);
    }
    out
}

fn render_hotspots(project: &Project) -> String {
    let mut out = String::from("## Hotspots\n\n");
    let ranked: Vec<_> = rank(project.files.values())
        .into_iter()
        .filter(|f| f.hotness > 0.0)
        .take(MAX_ROWS)
        .collect();
    if ranked.is_empty() {
        out.push_str("No hotspots: no file has both churn and size.\n");
        return out;
    }
    out.push_str("| File | Hotness | Churn | LOC | Complexity | Owner |\n");
    out.push_str("|------|---------|-------|-----|------------|-------|\n");
    for f in ranked {
        let complexity = f
            .complexity
            .map(|c| format!("{:.0}", c))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "| `{}` | {:.2} | {} | {} | {} | {} |",
            cell(&f.path),
            f.hotness,
            f.churn,
            f.loc,
            complexity,
            cell(&person_name(project, f.owner.as_ref()))
        );
    }
    out
}

fn render_coupling(project: &Project) -> String {
    let mut out = String::from("## Temporal coupling\n\n");
    let mut edges: Vec<_> = project.coupling.values().collect();
    if edges.is_empty() {
        out.push_str("No files changed together.\n");
        return out;
    }
    edges.sort_by(|x, y| y.weight.cmp(&x.weight).then_with(|| x.key().cmp(&y.key())));
    out.push_str("| File A | File B | Co-changes |\n|--------|--------|------------|\n");
    for e in edges.into_iter().take(MAX_ROWS) {
        let _ = writeln!(
            out,
            "| `{}` | `{}` | {} |",
            cell(&path_of(project, &e.a)),
            cell(&path_of(project, &e.b)),
            e.weight
        );
    }
    out
}

fn render_issues(project: &Project) -> String {
    let mut out = String::from("## Issues\n\n");
    if project.issues.is_empty() {
        out.push_str("No issues found.\n");
        return out;
    }
    for severity in [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ] {
        let issues: Vec<_> = project
            .issues
            .values()
            .filter(|i| i.severity == severity)
            .collect();
        if issues.is_empty() {
            continue;
        }
        let _ = writeln!(out, "### {} ({})\n", severity, issues.len());
        for issue in issues.iter().take(MAX_ROWS) {
            let _ = writeln!(out, "- **{}** ({}): {}", issue.kind, issue.id, cell(&issue.title));
        }
        if issues.len() > MAX_ROWS {
            let _ = writeln!(out, "- ... and {} more", issues.len() - MAX_ROWS);
        }
        out.push('\n');
    }
    out
}

fn render_contributors(project: &Project) -> String {
    let mut out = String::from("## Contributors\n\n");
    let mut people: Vec<_> = project.contributors.values().collect();
    if people.is_empty() {
        out.push_str("No history analyzed.\n");
        return out;
    }
    people.sort_by(|a, b| b.commits.cmp(&a.commits).then_with(|| a.id.cmp(&b.id)));
    out.push_str("| Name | Commits | +Lines | -Lines | Owned files |\n");
    out.push_str("|------|---------|--------|--------|-------------|\n");
    for p in people.into_iter().take(MAX_ROWS) {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} |",
            cell(&p.name),
            p.commits,
            p.lines_added,
            p.lines_deleted,
            p.owns.len()
        );
    }
    out
}

fn render_validation(project: &Project) -> Option<String> {
    let v = project.validation.as_ref()?;
    let status = if v.conforms { "conforms" } else { "does not conform" };
    Some(format!(
        "## Validation\n\nThe project {} to {} shape file(s): {} violation(s), {} warning(s), {} info.\n",
        status,
        v.shapes.len(),
        v.violations,
        v.warnings,
        v.infos
    ))
}

fn render_footer() -> String {
    "---\n\n*Generated by RepoQ*\n".to_string()
}
