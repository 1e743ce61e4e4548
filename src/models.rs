//! Core data model for RepoQ
//!
//! `Project` is the aggregate every analyzer writes into. Analyzers run one
//! after another against a single `&mut Project`; later analyzers read what
//! earlier ones produced. All collections are keyed by deterministic ids so a
//! second run over unchanged input yields the same ids and overwrites instead
//! of duplicating.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::utils::{normalize_name, short_hash, slug};

/// Id of a file record, derived from its relative path.
pub fn file_id(path: &str) -> String {
    format!("repo:file/{}", path)
}

/// Id of a module record, derived from its top-level directory.
pub fn module_id(name: &str) -> String {
    format!("repo:module/{}", name)
}

/// Id of a commit record.
pub fn commit_id(sha: &str) -> String {
    format!("repo:commit/{}", sha)
}

/// Id of a contributor.
///
/// Keyed by a hash of the lowercased email; authors without an email fall
/// back to their normalized name.
pub fn person_id(name: &str, email: &str) -> String {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        format!("repo:person/name-{}", slug(&normalize_name(name)))
    } else {
        format!("repo:person/{}", short_hash(&email))
    }
}

/// Id of an issue: one per (type, key) pair.
pub fn issue_id(kind: IssueKind, key: &str) -> String {
    format!("repo:issue/{}/{}", kind, key)
}

/// Module name for a relative path: its first directory, or `.` at the root.
pub fn module_name_for(path: &str) -> String {
    match path.split_once('/') {
        Some((top, _)) => top.to_string(),
        None => ".".to_string(),
    }
}

/// Severity levels for issues
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(anyhow::anyhow!("Unknown severity '{}'", s)),
        }
    }
}

/// What produced an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Hotspot,
    Todo,
    DirtyWorktree,
    ShaclViolation,
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueKind::Hotspot => write!(f, "hotspot"),
            IssueKind::Todo => write!(f, "todo"),
            IssueKind::DirtyWorktree => write!(f, "dirty_worktree"),
            IssueKind::ShaclViolation => write!(f, "shacl_violation"),
        }
    }
}

/// A source file
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct File {
    pub id: String,
    /// Path relative to the repository root, `/`-separated
    pub path: String,
    pub language: Option<String>,
    pub loc: usize,
    pub size_bytes: u64,
    pub checksum: Option<String>,
    /// Estimated cyclomatic complexity (sum over the file)
    pub complexity: Option<f64>,
    /// Maintainability index, 0..=100
    pub maintainability: Option<f64>,
    /// Lines added + deleted across history
    pub churn: u64,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub commit_count: u64,
    /// Added lines per contributor id
    pub contributions: BTreeMap<String, u64>,
    pub owner: Option<String>,
    /// Hotspot score in [0, 1]
    pub hotness: f64,
    pub todo_count: usize,
    pub issues: Vec<String>,
}

impl File {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: file_id(&path),
            path,
            ..Default::default()
        }
    }

    pub fn module_name(&self) -> String {
        module_name_for(&self.path)
    }
}

/// A top-level directory grouping of files
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Module {
    pub id: String,
    pub name: String,
    pub loc: usize,
    pub files: BTreeSet<String>,
}

/// A non-merge commit
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Commit {
    pub id: String,
    pub sha: String,
    pub author: String,
    pub timestamp: String,
    pub message: String,
    /// Tracked files touched by this commit
    pub files: Vec<String>,
    pub lines_added: u64,
    pub lines_deleted: u64,
}

/// A contributor identity
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Person {
    pub id: String,
    pub name: String,
    pub email: String,
    pub commits: u64,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub owns: BTreeSet<String>,
}

/// Two files that change together.
///
/// Always built through [`CouplingEdge::new`], which sorts the pair so
/// `a < b`; a pair therefore has exactly one edge regardless of order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CouplingEdge {
    pub a: String,
    pub b: String,
    pub weight: u64,
}

impl CouplingEdge {
    pub fn new(x: &str, y: &str, weight: u64) -> Self {
        let (a, b) = canonical_pair(x, y);
        Self {
            a: a.to_string(),
            b: b.to_string(),
            weight,
        }
    }

    pub fn key(&self) -> (String, String) {
        (self.a.clone(), self.b.clone())
    }
}

/// Sorted view of an unordered pair.
pub fn canonical_pair<'a>(x: &'a str, y: &'a str) -> (&'a str, &'a str) {
    if x <= y {
        (x, y)
    } else {
        (y, x)
    }
}

/// An import from one file to a module or file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct DependencyEdge {
    pub source: String,
    /// Import target as written in the source
    pub target: String,
    /// Tracked file the import resolves to, when it does
    pub resolved: Option<String>,
}

/// A flagged condition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub id: String,
    pub kind: IssueKind,
    pub severity: Severity,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Outcome of the last SHACL validation run recorded on the project
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ValidationSummary {
    pub conforms: bool,
    pub violations: usize,
    pub warnings: usize,
    pub infos: usize,
    pub shapes: Vec<String>,
}

/// The aggregate root
#[derive(Debug, Clone, Default)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub root: PathBuf,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub git_head: Option<String>,
    pub files: BTreeMap<String, File>,
    pub modules: BTreeMap<String, Module>,
    pub commits: BTreeMap<String, Commit>,
    pub contributors: BTreeMap<String, Person>,
    pub issues: BTreeMap<String, Issue>,
    /// Keyed by the canonical (a, b) pair
    pub coupling: BTreeMap<(String, String), CouplingEdge>,
    pub dependencies: BTreeSet<DependencyEdge>,
    pub validation: Option<ValidationSummary>,
}

impl Project {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        let name = name.into();
        Self {
            id: format!("repo:project/{}", slug(&name)),
            name,
            root: root.into(),
            ..Default::default()
        }
    }

    /// Look up a file by relative path.
    pub fn file_by_path(&self, path: &str) -> Option<&File> {
        self.files.get(&file_id(path))
    }

    pub fn file_by_path_mut(&mut self, path: &str) -> Option<&mut File> {
        self.files.get_mut(&file_id(path))
    }

    /// Insert or replace an issue, and link it from its file.
    pub fn upsert_issue(&mut self, issue: Issue) {
        if let Some(file) = issue.file.as_ref().and_then(|id| self.files.get_mut(id)) {
            if !file.issues.contains(&issue.id) {
                file.issues.push(issue.id.clone());
            }
        }
        self.issues.insert(issue.id.clone(), issue);
    }

    /// Drop every issue of `kind`, unlinking it from files.
    pub fn clear_issues(&mut self, kind: IssueKind) {
        let removed: BTreeSet<String> = self
            .issues
            .values()
            .filter(|i| i.kind == kind)
            .map(|i| i.id.clone())
            .collect();
        if removed.is_empty() {
            return;
        }
        self.issues.retain(|id, _| !removed.contains(id));
        for file in self.files.values_mut() {
            file.issues.retain(|id| !removed.contains(id));
        }
    }

    /// Add `weight` co-changes to the pair (x, y). Self-pairs are ignored.
    pub fn add_coupling(&mut self, x: &str, y: &str, weight: u64) {
        if x == y {
            return;
        }
        let (a, b) = canonical_pair(x, y);
        self.coupling
            .entry((a.to_string(), b.to_string()))
            .and_modify(|e| e.weight += weight)
            .or_insert_with(|| CouplingEdge::new(a, b, weight));
    }

    /// Co-change weight of an unordered pair (0 when never seen together).
    pub fn coupling_weight(&self, x: &str, y: &str) -> u64 {
        let (a, b) = canonical_pair(x, y);
        self.coupling
            .get(&(a.to_string(), b.to_string()))
            .map(|e| e.weight)
            .unwrap_or(0)
    }

    pub fn total_loc(&self) -> usize {
        self.files.values().map(|f| f.loc).sum()
    }

    pub fn issue_summary(&self) -> IssueSummary {
        IssueSummary::from_issues(self.issues.values())
    }
}

/// Issue counts by severity
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IssueSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub total: usize,
}

impl IssueSummary {
    pub fn from_issues<'a>(issues: impl IntoIterator<Item = &'a Issue>) -> Self {
        let mut summary = Self::default();
        for i in issues {
            match i.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Info => summary.info += 1,
            }
            summary.total += 1;
        }
        summary
    }
}
