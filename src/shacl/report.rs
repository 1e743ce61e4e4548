//! Typed view of a `sh:ValidationReport` graph

use serde::Serialize;
use std::fmt;

use crate::rdf::vocab::{rdf, sh};
use crate::rdf::{Graph, Term};

/// `sh:resultSeverity` values, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSeverity {
    Info,
    Warning,
    Violation,
}

impl ResultSeverity {
    pub fn from_iri(iri: &str) -> Option<Self> {
        match iri {
            sh::VIOLATION => Some(ResultSeverity::Violation),
            sh::WARNING => Some(ResultSeverity::Warning),
            sh::INFO => Some(ResultSeverity::Info),
            _ => None,
        }
    }

    pub fn iri(self) -> &'static str {
        match self {
            ResultSeverity::Violation => sh::VIOLATION,
            ResultSeverity::Warning => sh::WARNING,
            ResultSeverity::Info => sh::INFO,
        }
    }
}

impl fmt::Display for ResultSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultSeverity::Violation => write!(f, "violation"),
            ResultSeverity::Warning => write!(f, "warning"),
            ResultSeverity::Info => write!(f, "info"),
        }
    }
}

/// One validation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub severity: ResultSeverity,
    pub focus: String,
    pub path: Option<String>,
    pub message: String,
    pub value: Option<String>,
    pub source_shape: String,
    /// Constraint component IRI
    pub component: String,
}

impl Violation {
    /// Component local name without the `ConstraintComponent` suffix,
    /// e.g. `MaxInclusive`.
    pub fn component_name(&self) -> &str {
        let local = self
            .component
            .rsplit(['#', '/'])
            .next()
            .unwrap_or(&self.component);
        local.strip_suffix("ConstraintComponent").unwrap_or(local)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.focus)?;
        if let Some(path) = &self.path {
            write!(f, " {}", path)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(value) = &self.value {
            write!(f, " (value {})", value)?;
        }
        Ok(())
    }
}

fn render_term(report: &Graph, term: &Term) -> String {
    match term {
        Term::Iri(iri) => iri.clone(),
        Term::Literal(lit) => lit.lexical.clone(),
        Term::Blank(_) => match report.object(term, &Term::iri(sh::INVERSE_PATH)) {
            Some(p) => format!("^{}", p.lexical()),
            None => term.to_string(),
        },
    }
}

/// `sh:conforms` of the report; a report without it does not conform.
pub fn report_conforms(report: &Graph) -> bool {
    let type_p = Term::iri(rdf::TYPE);
    report
        .subjects(&type_p, &Term::iri(sh::VALIDATION_REPORT))
        .filter_map(|r| report.object(r, &Term::iri(sh::CONFORMS)))
        .filter_map(Term::as_bool)
        .next()
        .unwrap_or(false)
}

/// Read every `sh:ValidationResult` out of a report graph.
///
/// Results are ordered by severity (most severe first), then focus node and
/// component, so output is stable.
pub fn violations_from_report(report: &Graph) -> Vec<Violation> {
    let type_p = Term::iri(rdf::TYPE);
    let get = |r: &Term, p: &str| report.object(r, &Term::iri(p)).map(|t| render_term(report, t));

    let mut out: Vec<Violation> = report
        .subjects(&type_p, &Term::iri(sh::VALIDATION_RESULT))
        .map(|r| Violation {
            severity: report
                .object(r, &Term::iri(sh::RESULT_SEVERITY))
                .and_then(Term::as_iri)
                .and_then(ResultSeverity::from_iri)
                .unwrap_or(ResultSeverity::Violation),
            focus: get(r, sh::FOCUS_NODE).unwrap_or_default(),
            path: get(r, sh::RESULT_PATH),
            message: get(r, sh::RESULT_MESSAGE).unwrap_or_default(),
            value: get(r, sh::VALUE),
            source_shape: get(r, sh::SOURCE_SHAPE).unwrap_or_default(),
            component: get(r, sh::SOURCE_CONSTRAINT_COMPONENT).unwrap_or_default(),
        })
        .collect();
    out.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.focus.cmp(&b.focus))
            .then_with(|| a.path.cmp(&b.path))
            .then_with(|| a.component.cmp(&b.component))
            .then_with(|| a.value.cmp(&b.value))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::turtle::parse_turtle;

    #[test]
    fn test_read_report() {
        let ttl = r#"
@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix ex: <http://example.org/> .
[] a sh:ValidationReport ;
   sh:conforms false ;
   sh:result [
      a sh:ValidationResult ;
      sh:resultSeverity sh:Warning ;
      sh:focusNode ex:a ;
      sh:resultPath ex:p ;
      sh:value 42 ;
      sh:resultMessage "too big" ;
      sh:sourceShape ex:S ;
      sh:sourceConstraintComponent sh:MaxInclusiveConstraintComponent
   ], [
      a sh:ValidationResult ;
      sh:resultSeverity sh:Violation ;
      sh:focusNode ex:b ;
      sh:resultPath [ sh:inversePath ex:q ] ;
      sh:resultMessage "missing" ;
      sh:sourceShape ex:S ;
      sh:sourceConstraintComponent sh:MinCountConstraintComponent
   ] .
"#;
        let g = parse_turtle(ttl, "report.ttl").unwrap();
        assert!(!report_conforms(&g));

        let v = violations_from_report(&g);
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].severity, ResultSeverity::Violation);
        assert_eq!(v[0].focus, "http://example.org/b");
        assert_eq!(v[0].path.as_deref(), Some("^http://example.org/q"));
        assert_eq!(v[0].component_name(), "MinCount");
        assert_eq!(v[1].value.as_deref(), Some("42"));
        assert_eq!(v[1].message, "too big");
        assert!(v[1].to_string().starts_with("[warning] http://example.org/a"));
    }

    #[test]
    fn test_empty_graph_does_not_conform() {
        assert!(!report_conforms(&Graph::new()));
        assert!(violations_from_report(&Graph::new()).is_empty());
    }

    #[test]
    fn test_severity_order() {
        assert!(ResultSeverity::Violation > ResultSeverity::Warning);
        assert!(ResultSeverity::Warning > ResultSeverity::Info);
        assert_eq!(ResultSeverity::from_iri(sh::INFO), Some(ResultSeverity::Info));
        assert_eq!(ResultSeverity::from_iri("http://example.org/x"), None);
    }
}
