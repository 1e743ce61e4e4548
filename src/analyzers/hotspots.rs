//! Hotspot scoring
//!
//! `hotness = norm(churn) * (0.7 * norm(loc) + 0.3 * norm(complexity))`
//! where `norm(x) = x / max(x)` over all files (0 when the max is 0).
//! Churn gates the score: a file nobody touches is never a hotspot.

use anyhow::Result;
use std::cmp::Ordering;
use tracing::debug;

use super::{AnalysisContext, Analyzer};
use crate::models::{issue_id, File, Issue, IssueKind, Project, Severity};

pub const LOC_WEIGHT: f64 = 0.7;
pub const COMPLEXITY_WEIGHT: f64 = 0.3;

/// Severity thresholds on the hotness score
pub const HIGH_THRESHOLD: f64 = 0.66;
pub const MEDIUM_THRESHOLD: f64 = 0.33;

fn norm(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        value / max
    } else {
        0.0
    }
}

pub fn severity_for_hotness(hotness: f64) -> Severity {
    if hotness >= HIGH_THRESHOLD {
        Severity::High
    } else if hotness >= MEDIUM_THRESHOLD {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Score every file in place.
pub fn score_files<'a>(files: impl IntoIterator<Item = &'a mut File>) {
    let mut files: Vec<&mut File> = files.into_iter().collect();
    let max_churn = files.iter().map(|f| f.churn as f64).fold(0.0, f64::max);
    let max_loc = files.iter().map(|f| f.loc as f64).fold(0.0, f64::max);
    let max_cc = files
        .iter()
        .map(|f| f.complexity.unwrap_or(0.0))
        .fold(0.0, f64::max);

    for file in files.iter_mut() {
        let churn = norm(file.churn as f64, max_churn);
        let size = norm(file.loc as f64, max_loc);
        let cc = norm(file.complexity.unwrap_or(0.0), max_cc);
        file.hotness = (churn * (LOC_WEIGHT * size + COMPLEXITY_WEIGHT * cc)).clamp(0.0, 1.0);
    }
}

/// Files ordered by descending hotness, path ascending on ties.
pub fn rank<'a>(files: impl IntoIterator<Item = &'a File>) -> Vec<&'a File> {
    let mut ranked: Vec<&File> = files.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.hotness
            .partial_cmp(&a.hotness)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.path.cmp(&b.path))
    });
    ranked
}

pub struct HotspotAnalyzer;

impl Analyzer for HotspotAnalyzer {
    fn name(&self) -> &'static str {
        "hotspots"
    }

    fn run(&self, project: &mut Project, ctx: &AnalysisContext) -> Result<()> {
        score_files(project.files.values_mut());
        project.clear_issues(IssueKind::Hotspot);

        let top_n = ctx.config.hotspots.top_n;
        let issues: Vec<Issue> = rank(project.files.values())
            .into_iter()
            .filter(|f| f.hotness > 0.0)
            .take(top_n)
            .map(|f| Issue {
                id: issue_id(IssueKind::Hotspot, &f.path),
                kind: IssueKind::Hotspot,
                severity: severity_for_hotness(f.hotness),
                title: format!("Hotspot: {}", f.path),
                description: format!(
                    "hotness {:.2} (churn {}, {} LOC, complexity {})",
                    f.hotness,
                    f.churn,
                    f.loc,
                    f.complexity
                        .map(|c| format!("{:.0}", c))
                        .unwrap_or_else(|| "n/a".into())
                ),
                file: Some(f.id.clone()),
                score: Some(f.hotness),
            })
            .collect();

        debug!("Hotspots: {} issues (top {})", issues.len(), top_n);
        for issue in issues {
            project.upsert_issue(issue);
        }
        Ok(())
    }
}
