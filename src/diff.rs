//! Comparison of two analysis reports

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

use crate::models::{Issue, Project, Severity};
use crate::reporters::jsonld::load_report;

/// Hotness change of one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotnessDelta {
    pub path: String,
    /// `None` when the file is new
    pub old: Option<f64>,
    /// `None` when the file was removed
    pub new: Option<f64>,
    pub delta: f64,
}

/// What changed between two reports
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffResult {
    pub new_issues: Vec<Issue>,
    pub fixed_issues: Vec<Issue>,
    /// Sorted by absolute delta, largest first
    pub hotness_deltas: Vec<HotnessDelta>,
}

impl DiffResult {
    /// New issues of high or critical severity.
    pub fn regressions(&self) -> impl Iterator<Item = &Issue> {
        self.new_issues
            .iter()
            .filter(|i| i.severity >= Severity::High)
    }

    pub fn has_regressions(&self) -> bool {
        self.regressions().next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.new_issues.is_empty() && self.fixed_issues.is_empty() && self.hotness_deltas.is_empty()
    }
}

const EPSILON: f64 = 1e-9;

/// Compare two projects.
pub fn diff_projects(old: &Project, new: &Project) -> DiffResult {
    let old_ids: BTreeSet<&String> = old.issues.keys().collect();
    let new_ids: BTreeSet<&String> = new.issues.keys().collect();

    let new_issues = new
        .issues
        .values()
        .filter(|i| !old_ids.contains(&i.id))
        .cloned()
        .collect();
    let fixed_issues = old
        .issues
        .values()
        .filter(|i| !new_ids.contains(&i.id))
        .cloned()
        .collect();

    let mut deltas = Vec::new();
    for (id, file) in &new.files {
        match old.files.get(id) {
            Some(before) => {
                let delta = file.hotness - before.hotness;
                if delta.abs() > EPSILON {
                    deltas.push(HotnessDelta {
                        path: file.path.clone(),
                        old: Some(before.hotness),
                        new: Some(file.hotness),
                        delta,
                    });
                }
            }
            None => deltas.push(HotnessDelta {
                path: file.path.clone(),
                old: None,
                new: Some(file.hotness),
                delta: file.hotness,
            }),
        }
    }
    for (id, file) in &old.files {
        if !new.files.contains_key(id) {
            deltas.push(HotnessDelta {
                path: file.path.clone(),
                old: Some(file.hotness),
                new: None,
                delta: -file.hotness,
            });
        }
    }
    deltas.sort_by(|a, b| {
        b.delta
            .abs()
            .total_cmp(&a.delta.abs())
            .then_with(|| a.path.cmp(&b.path))
    });

    DiffResult {
        new_issues,
        fixed_issues,
        hotness_deltas: deltas,
    }
}

/// Compare two JSON-LD reports on disk.
pub fn diff_reports(old: &Path, new: &Path) -> Result<DiffResult> {
    let before = load_report(old)?;
    let after = load_report(new)?;
    Ok(diff_projects(&before, &after))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{file_id, issue_id, File, IssueKind};
    use crate::reporters::tests::sample_project;

    fn issue(kind: IssueKind, key: &str, severity: Severity) -> Issue {
        Issue {
            id: issue_id(kind, key),
            kind,
            severity,
            title: key.to_string(),
            description: String::new(),
            file: None,
            score: None,
        }
    }

    #[test]
    fn test_identical_projects() {
        let p = sample_project();
        let d = diff_projects(&p, &p);
        assert!(d.is_empty());
        assert!(!d.has_regressions());
    }

    #[test]
    fn test_issue_sets_and_deltas() {
        let old = sample_project();
        let mut new = sample_project();

        new.issues.remove(&issue_id(IssueKind::Todo, "src/b.py"));
        new.upsert_issue(issue(IssueKind::Hotspot, "src/c.py", Severity::High));
        new.upsert_issue(issue(IssueKind::Todo, "src/c.py", Severity::Medium));

        new.files.get_mut(&file_id("src/b.py")).unwrap().hotness = 0.75;
        new.files.remove(&file_id("src/a.py"));
        let mut c = File::new("src/c.py");
        c.hotness = 0.1;
        new.files.insert(c.id.clone(), c);

        let d = diff_projects(&old, &new);
        let new_ids: Vec<_> = d.new_issues.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(new_ids, vec!["src/c.py", "src/c.py"]);
        assert_eq!(d.fixed_issues.len(), 1);
        assert_eq!(d.fixed_issues[0].kind, IssueKind::Todo);

        let paths: Vec<_> = d.hotness_deltas.iter().map(|h| h.path.as_str()).collect();
        assert_eq!(paths, vec!["src/a.py", "src/b.py", "src/c.py"]);
        assert_eq!(d.hotness_deltas[0].new, None);
        assert_eq!(d.hotness_deltas[0].delta, -1.0);
        assert_eq!(d.hotness_deltas[1].delta, 0.5);
        assert_eq!(d.hotness_deltas[2].old, None);

        assert!(d.has_regressions());
        assert_eq!(d.regressions().count(), 1);
    }

    #[test]
    fn test_diff_reports_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let old_path = dir.path().join("old.jsonld");
        let new_path = dir.path().join("new.jsonld");
        let old = sample_project();
        let mut new = sample_project();
        new.upsert_issue(issue(IssueKind::Hotspot, "src/z.py", Severity::Critical));
        std::fs::write(&old_path, crate::reporters::jsonld::render(&old).unwrap()).unwrap();
        std::fs::write(&new_path, crate::reporters::jsonld::render(&new).unwrap()).unwrap();

        let d = diff_reports(&old_path, &new_path).unwrap();
        assert_eq!(d.new_issues.len(), 1);
        assert!(d.has_regressions());
        assert!(d.hotness_deltas.is_empty());

        assert!(diff_reports(&dir.path().join("nope.jsonld"), &new_path).is_err());
    }
}
