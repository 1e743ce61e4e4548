//! TODO/FIXME/HACK and deprecation marker scan
//!
//! Only comment text is searched, so identifiers like `todo_list` or string
//! literals never count. Each file with markers gets a single `todo` issue
//! whose severity is the worst marker found.

use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

use super::complexity::string_literals;
use super::{AnalysisContext, Analyzer};
use crate::models::{issue_id, Issue, IssueKind, Project, Severity};

static MARKER: OnceLock<Regex> = OnceLock::new();
static RUST_DEPRECATED: OnceLock<Regex> = OnceLock::new();

fn marker_pattern() -> &'static Regex {
    MARKER.get_or_init(|| {
        Regex::new(r"\b(TODO|FIXME|HACK|XXX)\b|\b(BUG):|(@deprecated|\bDEPRECATED\b)")
            .expect("valid regex")
    })
}

fn rust_deprecated() -> &'static Regex {
    RUST_DEPRECATED
        .get_or_init(|| Regex::new(r"^\s*#\[deprecated\b").expect("valid regex"))
}

/// Languages without comment syntax we can trust
const SKIPPED_LANGUAGES: &[&str] = &["markdown", "json"];

/// Lines quoted in an issue description
const MAX_QUOTED: usize = 5;

/// One marker occurrence
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub line: usize,
    pub tag: String,
    pub severity: Severity,
    pub text: String,
}

fn severity_for(tag: &str) -> Severity {
    match tag {
        "FIXME" | "HACK" | "XXX" | "BUG" => Severity::Medium,
        _ => Severity::Low,
    }
}

/// The comment portion of a line, if it has one.
fn comment_text<'a>(language: &str, line: &'a str) -> Option<&'a str> {
    let trimmed = line.trim_start();
    let block_prefixes = ["/*", "*", "<!--", "\"\"\"", "'''"];
    if block_prefixes.iter().any(|p| trimmed.starts_with(p)) {
        return Some(trimmed);
    }
    let hash_comments = matches!(
        language,
        "python" | "ruby" | "shell" | "toml" | "yaml" | "php"
    );
    // Same byte offsets as `line`, with string contents blanked out
    let masked =
        string_literals().replace_all(line, |c: &regex::Captures| " ".repeat(c[0].len()));
    let markers: &[&str] = if hash_comments { &["#", "//"] } else { &["//"] };
    markers
        .iter()
        .filter_map(|m| masked.find(m))
        .min()
        .map(|idx| &line[idx..])
        .or_else(|| {
            (language == "sql" || language == "lua")
                .then(|| masked.find("--").map(|idx| &line[idx..]))
                .flatten()
        })
}

/// Scan file content for markers.
pub fn scan_markers(language: &str, content: &str) -> Vec<Marker> {
    let pattern = marker_pattern();
    let mut found = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if language == "rust" && rust_deprecated().is_match(line) {
            found.push(Marker {
                line: idx + 1,
                tag: "DEPRECATED".into(),
                severity: Severity::Low,
                text: line.trim().to_string(),
            });
            continue;
        }
        let Some(comment) = comment_text(language, line) else {
            continue;
        };
        if let Some(cap) = pattern.captures(comment) {
            let tag = cap
                .get(1)
                .or_else(|| cap.get(2))
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| "DEPRECATED".to_string());
            found.push(Marker {
                line: idx + 1,
                severity: severity_for(&tag),
                tag,
                text: comment.trim().chars().take(120).collect(),
            });
        }
    }
    found
}

pub struct WeaknessAnalyzer;

impl Analyzer for WeaknessAnalyzer {
    fn name(&self) -> &'static str {
        "weakness"
    }

    fn run(&self, project: &mut Project, ctx: &AnalysisContext) -> Result<()> {
        project.clear_issues(IssueKind::Todo);

        let mut issues = Vec::new();
        for file in project.files.values_mut() {
            let Some(language) = file.language.as_deref() else {
                continue;
            };
            if SKIPPED_LANGUAGES.contains(&language) {
                continue;
            }
            let content = match std::fs::read(ctx.root.join(&file.path)) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    warn!("Weakness: cannot read {}: {}", file.path, e);
                    continue;
                }
            };

            let markers = scan_markers(language, &content);
            file.todo_count = markers.len();
            let Some(severity) = markers.iter().map(|m| m.severity).max() else {
                continue;
            };

            let mut description: Vec<String> = markers
                .iter()
                .take(MAX_QUOTED)
                .map(|m| format!("line {}: {}", m.line, m.text))
                .collect();
            if markers.len() > MAX_QUOTED {
                description.push(format!("... and {} more", markers.len() - MAX_QUOTED));
            }

            issues.push(Issue {
                id: issue_id(IssueKind::Todo, &file.path),
                kind: IssueKind::Todo,
                severity,
                title: format!("{} task marker(s) in {}", markers.len(), file.path),
                description: description.join("\n"),
                file: Some(file.id.clone()),
                score: Some(markers.len() as f64),
            });
        }

        debug!("Weakness: {} files with markers", issues.len());
        for issue in issues {
            project.upsert_issue(issue);
        }
        Ok(())
    }
}
