//! JSON-LD reporter
//!
//! The document is plain JSON with an `@context` that maps every term onto
//! the `repo:` vocabulary, so JSON-LD tooling expands it to the same triples
//! the Turtle reporter writes. It also reads back: `diff` and
//! `refactor-plan` load earlier reports through [`load_report`].

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::RepoqError;
use crate::models::{
    Commit, CouplingEdge, DependencyEdge, File, Issue, IssueKind, Module, Person, Project,
    Severity, ValidationSummary,
};
use crate::rdf::vocab::STANDARD_PREFIXES;

/// The `@context` of every report
pub fn context() -> JsonValue {
    let mut ctx = serde_json::Map::new();
    for (prefix, ns) in STANDARD_PREFIXES {
        ctx.insert((*prefix).to_string(), json!(ns));
    }
    let id_ref = |iri: &str| json!({"@id": iri, "@type": "@id"});
    let typed = |iri: &str, dt: &str| json!({"@id": iri, "@type": dt});
    let terms = [
        ("name", json!("repo:name")),
        ("root", json!("repo:root")),
        ("analyzedAt", typed("repo:analyzedAt", "xsd:dateTime")),
        ("gitHead", json!("repo:gitHead")),
        ("files", id_ref("repo:hasFile")),
        ("modules", id_ref("repo:hasModule")),
        ("contributors", id_ref("repo:hasContributor")),
        ("commits", id_ref("repo:hasCommit")),
        ("issues", id_ref("repo:hasIssue")),
        ("coupling", id_ref("repo:hasCoupling")),
        ("dependencies", id_ref("repo:hasDependency")),
        ("path", json!("repo:path")),
        ("language", json!("repo:language")),
        ("loc", typed("repo:loc", "xsd:integer")),
        ("sizeBytes", typed("repo:sizeBytes", "xsd:integer")),
        ("checksum", json!("repo:checksum")),
        ("complexity", typed("repo:complexity", "xsd:decimal")),
        ("maintainability", typed("repo:maintainability", "xsd:decimal")),
        ("churn", typed("repo:churn", "xsd:integer")),
        ("linesAdded", typed("repo:linesAdded", "xsd:integer")),
        ("linesDeleted", typed("repo:linesDeleted", "xsd:integer")),
        ("commitCount", typed("repo:commitCount", "xsd:integer")),
        ("owner", id_ref("repo:owner")),
        ("hotness", typed("repo:hotness", "xsd:decimal")),
        ("todoCount", typed("repo:todoCount", "xsd:integer")),
        ("module", id_ref("repo:inModule")),
        ("containsFiles", id_ref("repo:containsFile")),
        ("sha", json!("repo:sha")),
        ("author", id_ref("repo:author")),
        ("timestamp", typed("prov:endedAtTime", "xsd:dateTime")),
        ("message", json!("repo:message")),
        ("touches", id_ref("repo:touches")),
        ("email", json!("repo:email")),
        ("owns", id_ref("repo:owns")),
        ("issueType", json!("repo:issueType")),
        ("severity", json!("repo:severity")),
        ("title", json!("repo:title")),
        ("description", json!("repo:description")),
        ("affects", id_ref("repo:affects")),
        ("score", typed("repo:score", "xsd:decimal")),
        ("source", id_ref("repo:source")),
        ("target", json!("repo:target")),
        ("resolvesTo", id_ref("repo:resolvesTo")),
        ("weight", typed("repo:weight", "xsd:integer")),
    ];
    for (term, def) in terms {
        ctx.insert(term.to_string(), def);
    }
    JsonValue::Object(ctx)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type", default)]
    pub types: Vec<String>,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub loc: usize,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintainability: Option<f64>,
    #[serde(default)]
    pub churn: u64,
    #[serde(default)]
    pub lines_added: u64,
    #[serde(default)]
    pub lines_deleted: u64,
    #[serde(default)]
    pub commit_count: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contributions: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub hotness: f64,
    #[serde(default)]
    pub todo_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleNode {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type", default)]
    pub types: Vec<String>,
    pub name: String,
    #[serde(default)]
    pub loc: usize,
    #[serde(default)]
    pub contains_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonNode {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type", default)]
    pub types: Vec<String>,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub commit_count: u64,
    #[serde(default)]
    pub lines_added: u64,
    #[serde(default)]
    pub lines_deleted: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitNode {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type", default)]
    pub types: Vec<String>,
    pub sha: String,
    pub author: String,
    pub timestamp: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub touches: Vec<String>,
    #[serde(default)]
    pub lines_added: u64,
    #[serde(default)]
    pub lines_deleted: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueNode {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type", default)]
    pub types: Vec<String>,
    pub issue_type: IssueKind,
    pub severity: Severity,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affects: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouplingNode {
    #[serde(rename = "@type", default)]
    pub types: Vec<String>,
    pub source: String,
    pub target: String,
    pub weight: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyNode {
    #[serde(rename = "@type", default)]
    pub types: Vec<String>,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolves_to: Option<String>,
}

/// A complete JSON-LD report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonLdReport {
    #[serde(rename = "@context", default)]
    pub context: JsonValue,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type", default)]
    pub types: Vec<String>,
    pub name: String,
    #[serde(default)]
    pub root: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_head: Option<String>,
    #[serde(default)]
    pub files: Vec<FileNode>,
    #[serde(default)]
    pub modules: Vec<ModuleNode>,
    #[serde(default)]
    pub contributors: Vec<PersonNode>,
    #[serde(default)]
    pub commits: Vec<CommitNode>,
    #[serde(default)]
    pub issues: Vec<IssueNode>,
    #[serde(default)]
    pub coupling: Vec<CouplingNode>,
    #[serde(default)]
    pub dependencies: Vec<DependencyNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationSummary>,
}

fn types(t: &[&str]) -> Vec<String> {
    t.iter().map(|s| s.to_string()).collect()
}

impl JsonLdReport {
    pub fn from_project(project: &Project) -> Self {
        let files = project
            .files
            .values()
            .map(|f| FileNode {
                id: f.id.clone(),
                types: types(&["repo:File"]),
                path: f.path.clone(),
                language: f.language.clone(),
                loc: f.loc,
                size_bytes: f.size_bytes,
                checksum: f.checksum.clone(),
                complexity: f.complexity,
                maintainability: f.maintainability,
                churn: f.churn,
                lines_added: f.lines_added,
                lines_deleted: f.lines_deleted,
                commit_count: f.commit_count,
                contributions: f.contributions.clone(),
                owner: f.owner.clone(),
                hotness: f.hotness,
                todo_count: f.todo_count,
                module: Some(crate::models::module_id(&f.module_name())),
                issues: f.issues.clone(),
            })
            .collect();

        let modules = project
            .modules
            .values()
            .map(|m| ModuleNode {
                id: m.id.clone(),
                types: types(&["repo:Module"]),
                name: m.name.clone(),
                loc: m.loc,
                contains_files: m.files.iter().cloned().collect(),
            })
            .collect();

        let contributors = project
            .contributors
            .values()
            .map(|p| PersonNode {
                id: p.id.clone(),
                types: types(&["repo:Contributor", "foaf:Person", "prov:Agent"]),
                name: p.name.clone(),
                email: p.email.clone(),
                commit_count: p.commits,
                lines_added: p.lines_added,
                lines_deleted: p.lines_deleted,
                owns: p.owns.iter().cloned().collect(),
            })
            .collect();

        let commits = project
            .commits
            .values()
            .map(|c| CommitNode {
                id: c.id.clone(),
                types: types(&["repo:Commit", "prov:Activity"]),
                sha: c.sha.clone(),
                author: c.author.clone(),
                timestamp: c.timestamp.clone(),
                message: c.message.clone(),
                touches: c.files.clone(),
                lines_added: c.lines_added,
                lines_deleted: c.lines_deleted,
            })
            .collect();

        let issues = project
            .issues
            .values()
            .map(|i| IssueNode {
                id: i.id.clone(),
                types: types(&["repo:Issue"]),
                issue_type: i.kind,
                severity: i.severity,
                title: i.title.clone(),
                description: i.description.clone(),
                affects: i.file.clone(),
                score: i.score,
            })
            .collect();

        let coupling = project
            .coupling
            .values()
            .map(|e| CouplingNode {
                types: types(&["repo:CouplingEdge"]),
                source: e.a.clone(),
                target: e.b.clone(),
                weight: e.weight,
            })
            .collect();

        let dependencies = project
            .dependencies
            .iter()
            .map(|d| DependencyNode {
                types: types(&["repo:DependencyEdge"]),
                source: d.source.clone(),
                target: d.target.clone(),
                resolves_to: d.resolved.clone(),
            })
            .collect();

        Self {
            context: context(),
            id: project.id.clone(),
            types: types(&["repo:Project"]),
            name: project.name.clone(),
            root: project.root.display().to_string(),
            analyzed_at: project.analyzed_at,
            git_head: project.git_head.clone(),
            files,
            modules,
            contributors,
            commits,
            issues,
            coupling,
            dependencies,
            validation: project.validation.clone(),
        }
    }

    /// Rebuild the aggregate from a report.
    pub fn into_project(self) -> Project {
        let mut project = Project {
            id: self.id,
            name: self.name,
            root: self.root.into(),
            analyzed_at: self.analyzed_at,
            git_head: self.git_head,
            validation: self.validation,
            ..Default::default()
        };

        for f in self.files {
            let mut file = File::new(f.path);
            file.id = f.id;
            file.language = f.language;
            file.loc = f.loc;
            file.size_bytes = f.size_bytes;
            file.checksum = f.checksum;
            file.complexity = f.complexity;
            file.maintainability = f.maintainability;
            file.churn = f.churn;
            file.lines_added = f.lines_added;
            file.lines_deleted = f.lines_deleted;
            file.commit_count = f.commit_count;
            file.contributions = f.contributions;
            file.owner = f.owner;
            file.hotness = f.hotness;
            file.todo_count = f.todo_count;
            file.issues = f.issues;
            project.files.insert(file.id.clone(), file);
        }
        for m in self.modules {
            project.modules.insert(
                m.id.clone(),
                Module {
                    id: m.id,
                    name: m.name,
                    loc: m.loc,
                    files: m.contains_files.into_iter().collect(),
                },
            );
        }
        for p in self.contributors {
            project.contributors.insert(
                p.id.clone(),
                Person {
                    id: p.id,
                    name: p.name,
                    email: p.email,
                    commits: p.commit_count,
                    lines_added: p.lines_added,
                    lines_deleted: p.lines_deleted,
                    owns: p.owns.into_iter().collect::<BTreeSet<_>>(),
                },
            );
        }
        for c in self.commits {
            project.commits.insert(
                c.id.clone(),
                Commit {
                    id: c.id,
                    sha: c.sha,
                    author: c.author,
                    timestamp: c.timestamp,
                    message: c.message,
                    files: c.touches,
                    lines_added: c.lines_added,
                    lines_deleted: c.lines_deleted,
                },
            );
        }
        for i in self.issues {
            project.issues.insert(
                i.id.clone(),
                Issue {
                    id: i.id,
                    kind: i.issue_type,
                    severity: i.severity,
                    title: i.title,
                    description: i.description,
                    file: i.affects,
                    score: i.score,
                },
            );
        }
        for e in self.coupling {
            let edge = CouplingEdge::new(&e.source, &e.target, e.weight);
            project.coupling.insert(edge.key(), edge);
        }
        for d in self.dependencies {
            project.dependencies.insert(DependencyEdge {
                source: d.source,
                target: d.target,
                resolved: d.resolves_to,
            });
        }
        project
    }
}

/// Render the project as a pretty-printed JSON-LD document.
pub fn render(project: &Project) -> Result<String> {
    Ok(serde_json::to_string_pretty(&JsonLdReport::from_project(project))?)
}

/// Parse a JSON-LD report produced by [`render`].
pub fn parse_report(text: &str) -> Result<JsonLdReport, serde_json::Error> {
    serde_json::from_str(text)
}

/// Load a JSON-LD report from disk and rebuild its project.
pub fn load_report(path: &Path) -> Result<Project> {
    if !path.exists() {
        return Err(RepoqError::MissingPath(path.to_path_buf()).into());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let report = parse_report(&text).map_err(|e| RepoqError::Report {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if !report.types.iter().any(|t| t == "repo:Project") {
        return Err(RepoqError::Report {
            path: path.to_path_buf(),
            message: "document is not a repo:Project".into(),
        }
        .into());
    }
    Ok(report.into_project())
}
