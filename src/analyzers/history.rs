//! History analysis: commits, contributors, churn, ownership, coupling
//!
//! Only files already known to the project (from the structure walk) are
//! tracked. Changes to anything else are ignored for per-file statistics and
//! coupling, but the commit and its author are still recorded.

use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use super::{AnalysisContext, Analyzer};
use crate::git::{self, MiningOptions, RawCommit};
use crate::models::{
    commit_id, file_id, issue_id, person_id, Commit, Issue, IssueKind, Person, Project, Severity,
};

pub struct HistoryAnalyzer;

impl Analyzer for HistoryAnalyzer {
    fn name(&self) -> &'static str {
        "history"
    }

    fn run(&self, project: &mut Project, ctx: &AnalysisContext) -> Result<()> {
        let options = MiningOptions {
            since: ctx.since,
            max_commits: ctx.config.history.max_commits,
        };
        let commits = git::mine_history(&ctx.root, &options);
        apply_history(project, ctx, &commits);
        record_worktree(project, ctx);
        Ok(())
    }
}

/// Fold mined commits into the project, replacing earlier history data.
pub fn apply_history(project: &mut Project, ctx: &AnalysisContext, commits: &[RawCommit]) {
    reset_history(project);
    let history = &ctx.config.history;

    let tracked: BTreeSet<String> = project.files.values().map(|f| f.path.clone()).collect();

    for raw in commits {
        let author = person_id(&raw.author_name, &raw.author_email);

        // Dedup within the commit; a path can show up twice around renames
        let mut touched: BTreeMap<String, (u64, u64)> = BTreeMap::new();
        for change in &raw.changes {
            if !tracked.contains(&change.path) || ctx.config.should_exclude(&change.path) {
                continue;
            }
            let entry = touched.entry(change.path.clone()).or_default();
            entry.0 += change.added;
            entry.1 += change.deleted;
        }

        let added: u64 = touched.values().map(|(a, _)| a).sum();
        let deleted: u64 = touched.values().map(|(_, d)| d).sum();

        let person = project
            .contributors
            .entry(author.clone())
            .or_insert_with(|| Person {
                id: author.clone(),
                name: raw.author_name.clone(),
                email: raw.author_email.clone(),
                ..Default::default()
            });
        person.commits += 1;
        person.lines_added += added;
        person.lines_deleted += deleted;

        for (path, (a, d)) in &touched {
            if let Some(file) = project.file_by_path_mut(path) {
                file.lines_added += a;
                file.lines_deleted += d;
                file.churn += a + d;
                file.commit_count += 1;
                *file.contributions.entry(author.clone()).or_insert(0) += a;
            }
        }

        let paths: Vec<&String> = touched.keys().collect();
        for (i, x) in paths.iter().enumerate() {
            for y in &paths[i + 1..] {
                project.add_coupling(&file_id(x), &file_id(y), 1);
            }
        }

        let id = commit_id(&raw.sha);
        project.commits.insert(
            id.clone(),
            Commit {
                id,
                sha: raw.sha.clone(),
                author: author.clone(),
                timestamp: raw.timestamp.to_rfc3339(),
                message: raw.message.clone(),
                files: paths.iter().map(|p| file_id(p)).collect(),
                lines_added: added,
                lines_deleted: deleted,
            },
        );
    }

    if history.min_coupling_weight > 1 {
        let before = project.coupling.len();
        project
            .coupling
            .retain(|_, e| e.weight >= history.min_coupling_weight);
        debug!(
            "History: dropped {} coupling edges below weight {}",
            before - project.coupling.len(),
            history.min_coupling_weight
        );
    }

    assign_owners(project, history.ownership_threshold);

    info!(
        "History: {} commits, {} contributors, {} coupling edges",
        project.commits.len(),
        project.contributors.len(),
        project.coupling.len()
    );
}

fn reset_history(project: &mut Project) {
    project.commits.clear();
    project.contributors.clear();
    project.coupling.clear();
    for file in project.files.values_mut() {
        file.churn = 0;
        file.lines_added = 0;
        file.lines_deleted = 0;
        file.commit_count = 0;
        file.contributions.clear();
        file.owner = None;
    }
}

/// Give each file to the contributor holding at least `threshold` of its
/// added lines. Ties go to the smaller person id.
fn assign_owners(project: &mut Project, threshold: f64) {
    let mut owned: Vec<(String, String)> = Vec::new();
    for file in project.files.values_mut() {
        let total: u64 = file.contributions.values().sum();
        if total == 0 {
            continue;
        }
        // Ids iterate ascending; equal counts keep the earlier id
        let top = file
            .contributions
            .iter()
            .fold(None::<(&String, u64)>, |best, (id, lines)| match best {
                Some((_, b)) if b >= *lines => best,
                _ => Some((id, *lines)),
            });
        if let Some((id, lines)) = top {
            if lines as f64 / total as f64 >= threshold {
                file.owner = Some(id.clone());
                owned.push((id.clone(), file.id.clone()));
            }
        }
    }
    for (person, file) in owned {
        if let Some(p) = project.contributors.get_mut(&person) {
            p.owns.insert(file);
        }
    }
}

/// Record HEAD and flag a dirty working tree.
fn record_worktree(project: &mut Project, ctx: &AnalysisContext) {
    project.clear_issues(IssueKind::DirtyWorktree);
    if !git::is_git_repo(&ctx.root) {
        debug!("History: {} is not a git repository", ctx.root.display());
        return;
    }
    let state = match git::worktree_state(&ctx.root) {
        Ok(state) => state,
        Err(e) => {
            warn!("Could not read working tree state: {:#}", e);
            return;
        }
    };
    project.git_head = state.head.clone();
    if state.is_dirty() {
        project.upsert_issue(Issue {
            id: issue_id(IssueKind::DirtyWorktree, "worktree"),
            kind: IssueKind::DirtyWorktree,
            severity: Severity::Low,
            title: "Uncommitted changes in working tree".into(),
            description: format!(
                "{} modified or untracked entries; results may not match HEAD",
                state.changed_entries
            ),
            file: None,
            score: None,
        });
    }
}
