//! Quality gate
//!
//! A gate run validates the project's RDF graph and decides pass/fail:
//! any `sh:Violation` fails; with `strict`, any `sh:Warning` fails too.
//! `sh:Info` results never fail.

use serde::Serialize;
use tracing::info;

use crate::models::{file_id, issue_id, IssueKind, Issue, Project, Severity, ValidationSummary};
use crate::rdf::vocab::repo;
use crate::rdf::Graph;
use crate::reporters::turtle::{entity_id, project_graph};
use crate::shacl::{ResultSeverity, ValidationOutcome, Validator, Violation};
use crate::utils::short_hash;

/// Decision of one gate run
#[derive(Debug, Clone, Serialize)]
pub struct GateOutcome {
    pub passed: bool,
    pub strict: bool,
    pub conforms: bool,
    pub violations: usize,
    pub warnings: usize,
    pub infos: usize,
    pub results: Vec<Violation>,
    #[serde(skip)]
    pub report: Graph,
}

impl GateOutcome {
    pub fn from_validation(outcome: ValidationOutcome, strict: bool) -> Self {
        let violations = outcome.count(ResultSeverity::Violation);
        let warnings = outcome.count(ResultSeverity::Warning);
        let infos = outcome.count(ResultSeverity::Info);
        let passed = violations == 0 && (!strict || warnings == 0);
        Self {
            passed,
            strict,
            conforms: outcome.conforms,
            violations,
            warnings,
            infos,
            results: outcome.violations,
            report: outcome.report,
        }
    }

    /// Results that caused the gate to fail.
    pub fn failures(&self) -> impl Iterator<Item = &Violation> {
        let strict = self.strict;
        self.results.iter().filter(move |v| match v.severity {
            ResultSeverity::Violation => true,
            ResultSeverity::Warning => strict,
            ResultSeverity::Info => false,
        })
    }
}

/// Validate a data graph and apply the gate policy.
pub fn evaluate(data: &Graph, validator: &Validator, strict: bool) -> GateOutcome {
    let outcome = GateOutcome::from_validation(validator.validate(data), strict);
    info!(
        "Gate {}: {} violation(s), {} warning(s), {} info",
        if outcome.passed { "passed" } else { "failed" },
        outcome.violations,
        outcome.warnings,
        outcome.infos
    );
    outcome
}

/// Run the gate over a project and record the results on it.
pub fn run_gate(project: &mut Project, validator: &Validator, strict: bool) -> GateOutcome {
    let outcome = evaluate(&project_graph(project), validator, strict);
    record_results(project, &outcome, validator.sources());
    outcome
}

fn issue_severity(severity: ResultSeverity) -> Severity {
    match severity {
        ResultSeverity::Violation => Severity::High,
        ResultSeverity::Warning => Severity::Medium,
        ResultSeverity::Info => Severity::Info,
    }
}

/// Local part of a `repo:` IRI, or the IRI itself.
fn short_name(iri: &str) -> &str {
    iri.strip_prefix(repo::NS).unwrap_or(iri)
}

/// Replace the project's `shacl_violation` issues and validation summary
/// with the results of `outcome`.
pub fn record_results(project: &mut Project, outcome: &GateOutcome, shapes: &[String]) {
    project.clear_issues(IssueKind::ShaclViolation);
    for v in &outcome.results {
        let key = format!(
            "{}/{}",
            short_hash(&format!(
                "{}|{}|{}|{}",
                v.focus,
                v.path.as_deref().unwrap_or(""),
                v.component,
                v.source_shape
            )),
            v.component_name()
        );
        let file = entity_id(&v.focus)
            .filter(|id| id.starts_with(&file_id("")))
            .filter(|id| project.files.contains_key(id));
        let subject = short_name(&v.focus);
        let title = match &v.path {
            Some(path) => format!("{} on {} of {}", v.component_name(), short_name(path), subject),
            None => format!("{} on {}", v.component_name(), subject),
        };
        let mut description = v.message.clone();
        if let Some(value) = &v.value {
            description.push_str(&format!(" (value {})", value));
        }
        project.upsert_issue(Issue {
            id: issue_id(IssueKind::ShaclViolation, &key),
            kind: IssueKind::ShaclViolation,
            severity: issue_severity(v.severity),
            title,
            description,
            file,
            score: None,
        });
    }
    project.validation = Some(ValidationSummary {
        conforms: outcome.conforms,
        violations: outcome.violations,
        warnings: outcome.warnings,
        infos: outcome.infos,
        shapes: shapes.to_vec(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::turtle::parse_turtle;
    use crate::reporters::tests::sample_project;

    fn validator(shapes: &str) -> Validator {
        let ttl = format!(
            "@prefix sh: <http://www.w3.org/ns/shacl#> .\n@prefix repo: <{}> .\n{}",
            repo::NS,
            shapes
        );
        Validator::from_graph(parse_turtle(&ttl, "t.ttl").unwrap(), vec!["t.ttl".into()])
    }

    const WARN_ON_HOT: &str = "repo:S a sh:NodeShape ; sh:targetClass repo:File ;
        sh:property [ sh:path repo:hotness ; sh:maxInclusive 0.5 ; sh:severity sh:Warning ] .";

    #[test]
    fn test_strict_fails_on_warnings() {
        let v = validator(WARN_ON_HOT);
        let mut project = sample_project();

        let lenient = run_gate(&mut project, &v, false);
        assert!(lenient.passed);
        assert!(!lenient.conforms);
        assert_eq!(lenient.warnings, 1);
        assert_eq!(lenient.failures().count(), 0);

        let strict = run_gate(&mut project, &v, true);
        assert!(!strict.passed);
        assert_eq!(strict.failures().count(), 1);
    }

    #[test]
    fn test_info_never_fails() {
        let v = validator(
            "repo:S a sh:NodeShape ; sh:targetClass repo:File ;
             sh:property [ sh:path repo:hotness ; sh:maxInclusive 0.5 ; sh:severity sh:Info ] .",
        );
        let outcome = run_gate(&mut sample_project(), &v, true);
        assert!(outcome.passed);
        assert_eq!(outcome.infos, 1);
    }

    #[test]
    fn test_results_are_recorded_as_issues() {
        let v = validator(WARN_ON_HOT);
        let mut project = sample_project();
        run_gate(&mut project, &v, false);
        run_gate(&mut project, &v, false);

        let issues: Vec<_> = project
            .issues
            .values()
            .filter(|i| i.kind == IssueKind::ShaclViolation)
            .collect();
        assert_eq!(issues.len(), 1);
        let issue = issues[0];
        assert_eq!(issue.severity, Severity::Medium);
        assert_eq!(issue.file.as_deref(), Some("repo:file/src/a.py"));
        assert!(issue.title.starts_with("MaxInclusive on hotness of file/src/a.py"));
        assert!(issue.description.contains("(value 1.0)"));
        assert!(project
            .file_by_path("src/a.py")
            .unwrap()
            .issues
            .contains(&issue.id));

        let summary = project.validation.as_ref().unwrap();
        assert!(!summary.conforms);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.shapes, vec!["t.ttl".to_string()]);
    }

    #[test]
    fn test_bundled_shapes_on_sample() {
        let mut project = sample_project();
        let outcome = run_gate(&mut project, &Validator::bundled().unwrap(), false);
        // The sample's short commit shas break the sha pattern.
        assert!(!outcome.passed);
        assert!(outcome
            .failures()
            .all(|v| v.component_name() == "Pattern" && v.focus.contains("commit/")));
        assert_eq!(outcome.violations, 2);
        // The hottest file is reported, but only as info.
        assert_eq!(outcome.infos, 1);
    }
}
