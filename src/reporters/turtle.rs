//! Project → RDF mapping and the Turtle reporter
//!
//! Entity ids (`repo:file/src/a.py`) become IRIs under the `repo:` namespace.
//! The same graph feeds the Turtle output and the SHACL gate.

use anyhow::Result;

use crate::models::{module_id, Project};
use crate::rdf::turtle::write_turtle;
use crate::rdf::vocab::{foaf, prov, rdf, repo, STANDARD_PREFIXES};
use crate::rdf::{Graph, Term};
use crate::utils::short_hash;

/// IRI for an entity id.
///
/// Characters outside the IRI-safe set are percent-encoded so paths with
/// spaces or brackets still produce valid IRIs.
pub fn entity_iri(id: &str) -> String {
    let local = id.strip_prefix("repo:").unwrap_or(id);
    let mut out = String::with_capacity(repo::NS.len() + local.len());
    out.push_str(repo::NS);
    for b in local.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

/// Entity id for an IRI built by [`entity_iri`]; `None` outside `repo:`.
pub fn entity_id(iri: &str) -> Option<String> {
    let encoded = iri.strip_prefix(repo::NS)?;
    let bytes = encoded.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                decoded.push(b);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    Some(format!("repo:{}", String::from_utf8_lossy(&decoded)))
}

fn node(id: &str) -> Term {
    Term::iri(entity_iri(id))
}

fn count(n: u64) -> Term {
    Term::integer(i64::try_from(n).unwrap_or(i64::MAX))
}

fn coupling_node(a: &str, b: &str) -> Term {
    node(&format!("repo:coupling/{}", short_hash(&format!("{}|{}", a, b))))
}

fn dependency_node(source: &str, target: &str) -> Term {
    node(&format!(
        "repo:dependency/{}",
        short_hash(&format!("{}|{}", source, target))
    ))
}

/// Build the RDF graph of a project.
pub fn project_graph(project: &Project) -> Graph {
    let mut g = Graph::new();
    for (prefix, ns) in STANDARD_PREFIXES {
        g.set_prefix(*prefix, *ns);
    }

    let p = node(&project.id);
    g.add(&p, rdf::TYPE, Term::iri(repo::PROJECT));
    g.add(&p, repo::NAME, Term::string(&project.name));
    g.add(&p, repo::ROOT, Term::string(project.root.display().to_string()));
    if let Some(at) = project.analyzed_at {
        let stamp = Term::date_time(at.to_rfc3339());
        g.add(&p, repo::ANALYZED_AT, stamp.clone());
        g.add(&p, prov::GENERATED_AT_TIME, stamp);
    }
    if let Some(head) = &project.git_head {
        g.add(&p, repo::GIT_HEAD, Term::string(head));
    }

    for f in project.files.values() {
        let s = node(&f.id);
        g.add(&p, repo::HAS_FILE, s.clone());
        g.add(&s, rdf::TYPE, Term::iri(repo::FILE));
        g.add(&s, repo::PATH, Term::string(&f.path));
        if let Some(lang) = &f.language {
            g.add(&s, repo::LANGUAGE, Term::string(lang));
        }
        g.add(&s, repo::LOC, count(f.loc as u64));
        g.add(&s, repo::SIZE_BYTES, count(f.size_bytes));
        if let Some(sum) = &f.checksum {
            g.add(&s, repo::CHECKSUM, Term::string(sum));
        }
        if let Some(cc) = f.complexity {
            g.add(&s, repo::COMPLEXITY, Term::decimal(cc));
        }
        if let Some(mi) = f.maintainability {
            g.add(&s, repo::MAINTAINABILITY, Term::decimal(mi));
        }
        g.add(&s, repo::CHURN, count(f.churn));
        g.add(&s, repo::LINES_ADDED, count(f.lines_added));
        g.add(&s, repo::LINES_DELETED, count(f.lines_deleted));
        g.add(&s, repo::COMMIT_COUNT, count(f.commit_count));
        g.add(&s, repo::HOTNESS, Term::decimal(f.hotness));
        g.add(&s, repo::TODO_COUNT, count(f.todo_count as u64));
        g.add(&s, repo::IN_MODULE, node(&module_id(&f.module_name())));
        if let Some(owner) = &f.owner {
            g.add(&s, repo::OWNER, node(owner));
        }
        for issue in &f.issues {
            g.add(&s, repo::HAS_ISSUE, node(issue));
        }
    }

    for m in project.modules.values() {
        let s = node(&m.id);
        g.add(&p, repo::HAS_MODULE, s.clone());
        g.add(&s, rdf::TYPE, Term::iri(repo::MODULE));
        g.add(&s, repo::NAME, Term::string(&m.name));
        g.add(&s, repo::LOC, count(m.loc as u64));
        for file in &m.files {
            g.add(&s, repo::CONTAINS, node(file));
        }
    }

    for person in project.contributors.values() {
        let s = node(&person.id);
        g.add(&p, repo::HAS_CONTRIBUTOR, s.clone());
        g.add(&s, rdf::TYPE, Term::iri(repo::CONTRIBUTOR));
        g.add(&s, rdf::TYPE, Term::iri(foaf::PERSON));
        g.add(&s, rdf::TYPE, Term::iri(prov::AGENT));
        g.add(&s, foaf::NAME, Term::string(&person.name));
        if !person.email.is_empty() {
            g.add(&s, repo::EMAIL, Term::string(&person.email));
        }
        g.add(&s, repo::COMMIT_COUNT, count(person.commits));
        g.add(&s, repo::LINES_ADDED, count(person.lines_added));
        g.add(&s, repo::LINES_DELETED, count(person.lines_deleted));
        for file in &person.owns {
            g.add(&s, repo::OWNS, node(file));
        }
    }

    for c in project.commits.values() {
        let s = node(&c.id);
        g.add(&p, repo::HAS_COMMIT, s.clone());
        g.add(&s, rdf::TYPE, Term::iri(repo::COMMIT));
        g.add(&s, rdf::TYPE, Term::iri(prov::ACTIVITY));
        g.add(&s, repo::SHA, Term::string(&c.sha));
        g.add(&s, repo::AUTHOR, node(&c.author));
        g.add(&s, prov::WAS_ASSOCIATED_WITH, node(&c.author));
        g.add(&s, prov::ENDED_AT_TIME, Term::date_time(&c.timestamp));
        g.add(&s, repo::MESSAGE, Term::string(&c.message));
        g.add(&s, repo::LINES_ADDED, count(c.lines_added));
        g.add(&s, repo::LINES_DELETED, count(c.lines_deleted));
        for file in &c.files {
            g.add(&s, repo::TOUCHES, node(file));
        }
    }

    for issue in project.issues.values() {
        let s = node(&issue.id);
        g.add(&p, repo::HAS_ISSUE, s.clone());
        g.add(&s, rdf::TYPE, Term::iri(repo::ISSUE));
        g.add(&s, repo::KIND, Term::string(issue.kind.to_string()));
        g.add(&s, repo::SEVERITY, Term::string(issue.severity.to_string()));
        g.add(&s, repo::TITLE, Term::string(&issue.title));
        if !issue.description.is_empty() {
            g.add(&s, repo::DESCRIPTION, Term::string(&issue.description));
        }
        if let Some(file) = &issue.file {
            g.add(&s, repo::AFFECTS, node(file));
        }
        if let Some(score) = issue.score {
            g.add(&s, repo::SCORE, Term::decimal(score));
        }
    }

    for edge in project.coupling.values() {
        let s = coupling_node(&edge.a, &edge.b);
        g.add(&p, repo::HAS_COUPLING, s.clone());
        g.add(&s, rdf::TYPE, Term::iri(repo::COUPLING));
        g.add(&s, repo::SOURCE, node(&edge.a));
        g.add(&s, repo::TARGET, node(&edge.b));
        g.add(&s, repo::WEIGHT, count(edge.weight));
    }

    for dep in &project.dependencies {
        let s = dependency_node(&dep.source, &dep.target);
        g.add(&p, repo::HAS_DEPENDENCY, s.clone());
        g.add(&s, rdf::TYPE, Term::iri(repo::DEPENDENCY));
        g.add(&s, repo::SOURCE, node(&dep.source));
        g.add(&s, repo::TARGET, Term::string(&dep.target));
        if let Some(resolved) = &dep.resolved {
            g.add(&s, repo::RESOLVED, node(resolved));
        }
    }

    g
}

/// Render the project as Turtle.
pub fn render(project: &Project) -> Result<String> {
    Ok(write_turtle(&project_graph(project)))
}
