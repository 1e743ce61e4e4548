//! Refactor plan
//!
//! Turns hotspot and high/medium weakness issues into an ordered task list.
//! Hotspots come first, hottest first; marker-only files follow by severity.
//! A file appears once; extra reasons are appended to its task.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::models::{IssueKind, Project, Severity};

/// Rough size of a task, from the file's LOC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effort {
    S,
    M,
    L,
}

impl Effort {
    pub fn for_loc(loc: usize) -> Self {
        match loc {
            0..=199 => Effort::S,
            200..=499 => Effort::M,
            _ => Effort::L,
        }
    }
}

impl std::fmt::Display for Effort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effort::S => write!(f, "S"),
            Effort::M => write!(f, "M"),
            Effort::L => write!(f, "L"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub rank: usize,
    pub file: String,
    pub severity: Severity,
    pub hotness: f64,
    pub effort: Effort,
    pub reasons: Vec<String>,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefactorPlan {
    pub project: String,
    pub tasks: Vec<Task>,
}

/// Build the plan, keeping at most `top` tasks.
pub fn build_plan(project: &Project, top: Option<usize>) -> RefactorPlan {
    // file id -> (is hotspot, task)
    let mut by_file: BTreeMap<&str, (bool, Task)> = BTreeMap::new();

    for issue in project.issues.values() {
        let relevant = match issue.kind {
            IssueKind::Hotspot => true,
            IssueKind::Todo => issue.severity >= Severity::Medium,
            _ => false,
        };
        let Some(file) = issue.file.as_deref().and_then(|id| project.files.get(id)) else {
            continue;
        };
        if !relevant {
            continue;
        }

        let reason = match issue.kind {
            IssueKind::Hotspot => format!(
                "Hotspot (hotness {:.2}): churn {}, {} LOC{}",
                file.hotness,
                file.churn,
                file.loc,
                file.complexity
                    .map(|c| format!(", complexity {:.0}", c))
                    .unwrap_or_default()
            ),
            _ => issue.title.clone(),
        };
        let is_hotspot = issue.kind == IssueKind::Hotspot;

        let entry = by_file.entry(file.id.as_str()).or_insert_with(|| {
            (
                false,
                Task {
                    rank: 0,
                    file: file.path.clone(),
                    severity: issue.severity,
                    hotness: file.hotness,
                    effort: Effort::for_loc(file.loc),
                    reasons: Vec::new(),
                    issues: Vec::new(),
                },
            )
        });
        entry.0 |= is_hotspot;
        entry.1.severity = entry.1.severity.max(issue.severity);
        if is_hotspot {
            entry.1.reasons.insert(0, reason);
        } else {
            entry.1.reasons.push(reason);
        }
        entry.1.issues.push(issue.id.clone());
    }

    let mut tasks: Vec<(bool, Task)> = by_file.into_values().collect();
    tasks.sort_by(|(ha, a), (hb, b)| {
        hb.cmp(ha)
            .then_with(|| {
                if *ha {
                    b.hotness.partial_cmp(&a.hotness).unwrap_or(Ordering::Equal)
                } else {
                    Ordering::Equal
                }
            })
            .then_with(|| b.severity.cmp(&a.severity))
            .then_with(|| a.file.cmp(&b.file))
    });

    let limit = top.unwrap_or(usize::MAX);
    let tasks = tasks
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (_, mut task))| {
            task.rank = i + 1;
            task
        })
        .collect();

    RefactorPlan {
        project: project.name.clone(),
        tasks,
    }
}

impl RefactorPlan {
    pub fn to_markdown(&self) -> String {
        let mut md = format!("# Refactor plan: {}\n\n", self.project);
        if self.tasks.is_empty() {
            md.push_str("Nothing to do: no hotspots or significant markers.\n");
            return md;
        }
        md.push_str("| # | File | Effort | Severity | Reason |\n");
        md.push_str("|---|------|--------|----------|--------|\n");
        for t in &self.tasks {
            let _ = writeln!(
                md,
                "| {} | `{}` | {} | {} | {} |",
                t.rank,
                t.file.replace('|', "\\|"),
                t.effort,
                t.severity,
                t.reasons.join("; ").replace('|', "\\|")
            );
        }
        md
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{file_id, issue_id, File, Issue};

    fn add_file(p: &mut Project, path: &str, loc: usize, hotness: f64) {
        let mut f = File::new(path);
        f.loc = loc;
        f.hotness = hotness;
        f.churn = 5;
        p.files.insert(f.id.clone(), f);
    }

    fn add_issue(p: &mut Project, kind: IssueKind, path: &str, severity: Severity) {
        p.upsert_issue(Issue {
            id: issue_id(kind, path),
            kind,
            severity,
            title: format!("{} in {}", kind, path),
            description: String::new(),
            file: Some(file_id(path)),
            score: None,
        });
    }

    fn sample() -> Project {
        let mut p = Project::new("demo", "/tmp/demo");
        add_file(&mut p, "a.py", 50, 0.4);
        add_file(&mut p, "b.py", 300, 0.9);
        add_file(&mut p, "c.py", 800, 0.0);
        add_file(&mut p, "d.py", 10, 0.0);
        add_file(&mut p, "e.py", 10, 0.0);
        add_issue(&mut p, IssueKind::Hotspot, "a.py", Severity::Medium);
        add_issue(&mut p, IssueKind::Hotspot, "b.py", Severity::High);
        add_issue(&mut p, IssueKind::Todo, "b.py", Severity::Medium);
        add_issue(&mut p, IssueKind::Todo, "c.py", Severity::Medium);
        add_issue(&mut p, IssueKind::Todo, "d.py", Severity::Low);
        add_issue(&mut p, IssueKind::DirtyWorktree, "e.py", Severity::High);
        p
    }

    #[test]
    fn test_ordering_and_merging() {
        let plan = build_plan(&sample(), None);
        let files: Vec<_> = plan.tasks.iter().map(|t| t.file.as_str()).collect();
        assert_eq!(files, vec!["b.py", "a.py", "c.py"]);
        assert_eq!(plan.tasks[0].rank, 1);
        assert_eq!(plan.tasks[0].issues.len(), 2);
        assert!(plan.tasks[0].reasons[0].starts_with("Hotspot (hotness 0.90)"));
        assert_eq!(plan.tasks[0].reasons[1], "todo in b.py");
        assert_eq!(plan.tasks[0].effort, Effort::M);
        assert_eq!(plan.tasks[1].effort, Effort::S);
        assert_eq!(plan.tasks[2].effort, Effort::L);
    }

    #[test]
    fn test_top_limit() {
        let plan = build_plan(&sample(), Some(1));
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].file, "b.py");
    }

    #[test]
    fn test_rendering() {
        let plan = build_plan(&sample(), None);
        let md = plan.to_markdown();
        assert!(md.starts_with("# Refactor plan: demo"));
        assert!(md.contains("| 1 | `b.py` | M | high |"));

        let json: serde_json::Value = serde_json::from_str(&plan.to_json().unwrap()).unwrap();
        assert_eq!(json["tasks"][2]["effort"], "L");
        assert_eq!(json["tasks"][0]["severity"], "high");

        let empty = build_plan(&Project::new("x", "/tmp/x"), None);
        assert!(empty.to_markdown().contains("Nothing to do"));
    }
}
