//! Validation of a data graph against compiled shapes
//!
//! The output is a standard `sh:ValidationReport` graph. Callers that want
//! typed results read them back with [`super::report::violations_from_report`].

use chrono::{DateTime, NaiveDateTime};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::debug;

use crate::rdf::vocab::{rdf, rdfs, sh, xsd, STANDARD_PREFIXES};
use crate::rdf::{Graph, Literal, Term};

use super::shapes::{Constraint, PropertyPath, Shape, ShapeSet, Target};

/// Validate `data` and return the report graph.
pub fn validate(data: &Graph, shapes: &ShapeSet) -> Graph {
    let mut run = Run {
        data,
        report: Graph::new(),
        results: Vec::new(),
    };
    for prefix in STANDARD_PREFIXES {
        run.report.set_prefix(prefix.0, prefix.1);
    }

    for shape in &shapes.shapes {
        if shape.deactivated {
            debug!("Shape {} is deactivated", shape.id);
            continue;
        }
        let focus = focus_nodes(data, shape);
        debug!("Shape {} has {} focus nodes", shape.id, focus.len());
        for node in &focus {
            run.validate_shape(shape, node);
        }
    }
    run.finish()
}

/// `class` and every class below it through `rdfs:subClassOf` in `data`.
fn subclasses(data: &Graph, class: &Term) -> BTreeSet<Term> {
    let sub = Term::iri(rdfs::SUB_CLASS_OF);
    let mut seen = BTreeSet::from([class.clone()]);
    let mut queue = vec![class.clone()];
    while let Some(next) = queue.pop() {
        for c in data.subjects(&sub, &next) {
            if seen.insert(c.clone()) {
                queue.push(c.clone());
            }
        }
    }
    seen
}

/// SHACL instances: nodes with an `rdf:type` that is `class` or a subclass.
fn instances_of(data: &Graph, class: &Term) -> BTreeSet<Term> {
    let type_p = Term::iri(rdf::TYPE);
    subclasses(data, class)
        .iter()
        .flat_map(|c| data.subjects(&type_p, c).cloned().collect::<Vec<_>>())
        .collect()
}

fn is_instance(data: &Graph, node: &Term, class: &Term) -> bool {
    let type_p = Term::iri(rdf::TYPE);
    let sub = Term::iri(rdfs::SUB_CLASS_OF);
    let mut seen = BTreeSet::new();
    let mut queue: Vec<Term> = data.objects(node, &type_p).cloned().collect();
    while let Some(t) = queue.pop() {
        if &t == class {
            return true;
        }
        if seen.insert(t.clone()) {
            queue.extend(data.objects(&t, &sub).cloned());
        }
    }
    false
}

/// Focus nodes selected by the targets of `shape`.
pub fn focus_nodes(data: &Graph, shape: &Shape) -> BTreeSet<Term> {
    let mut out = BTreeSet::new();
    for target in &shape.targets {
        match target {
            Target::Class(class) => out.extend(instances_of(data, class)),
            Target::Node(node) => {
                out.insert(node.clone());
            }
            Target::SubjectsOf(p) => out.extend(data.subjects_with(p).into_iter().cloned()),
            Target::ObjectsOf(p) => out.extend(data.objects_with(p).into_iter().cloned()),
        }
    }
    out
}

struct Run<'a> {
    data: &'a Graph,
    report: Graph,
    results: Vec<Term>,
}

impl Run<'_> {
    fn validate_shape(&mut self, shape: &Shape, focus: &Term) {
        if shape.deactivated {
            return;
        }
        let values = match &shape.path {
            Some(path) => path.values(self.data, focus),
            None => vec![focus.clone()],
        };
        for constraint in &shape.constraints {
            self.check(shape, focus, &values, constraint);
        }
        for property in &shape.properties {
            self.validate_shape(property, focus);
        }
    }

    fn check(&mut self, shape: &Shape, focus: &Term, values: &[Term], constraint: &Constraint) {
        match constraint {
            Constraint::MinCount(n) => {
                if values.len() < *n {
                    let msg = format!("Less than {} values", n);
                    self.emit(shape, focus, None, constraint, msg);
                }
            }
            Constraint::MaxCount(n) => {
                if values.len() > *n {
                    let msg = format!("More than {} values", n);
                    self.emit(shape, focus, None, constraint, msg);
                }
            }
            Constraint::HasValue(expected) => {
                if !values.contains(expected) {
                    let msg = format!("Missing expected value {}", expected);
                    self.emit(shape, focus, None, constraint, msg);
                }
            }
            _ => {
                for value in values {
                    let failure = match constraint {
                        Constraint::Class(class) => (!is_instance(self.data, value, class))
                            .then(|| format!("Value does not have class {}", class)),
                        Constraint::Datatype(dt) => (!has_datatype(value, dt))
                            .then(|| format!("Value does not have datatype <{}>", dt)),
                        Constraint::NodeKind(kind, iri) => (!kind.matches(value))
                            .then(|| format!("Value does not have node kind {}", iri)),
                        Constraint::MinInclusive(b) => {
                            (!in_range(value, b, &[Ordering::Greater, Ordering::Equal]))
                                .then(|| format!("Value is not >= {}", b.lexical()))
                        }
                        Constraint::MaxInclusive(b) => {
                            (!in_range(value, b, &[Ordering::Less, Ordering::Equal]))
                                .then(|| format!("Value is not <= {}", b.lexical()))
                        }
                        Constraint::MinExclusive(b) => (!in_range(value, b, &[Ordering::Greater]))
                            .then(|| format!("Value is not > {}", b.lexical())),
                        Constraint::MaxExclusive(b) => (!in_range(value, b, &[Ordering::Less]))
                            .then(|| format!("Value is not < {}", b.lexical())),
                        Constraint::MinLength(n) => (!length(value).is_some_and(|l| l >= *n))
                            .then(|| format!("Value has less than {} characters", n)),
                        Constraint::MaxLength(n) => (!length(value).is_some_and(|l| l <= *n))
                            .then(|| format!("Value has more than {} characters", n)),
                        Constraint::Pattern { regex, source } => (value.is_blank()
                            || !regex.is_match(value.lexical()))
                        .then(|| format!("Value does not match pattern \"{}\"", source)),
                        Constraint::In(allowed) => (!allowed.contains(value))
                            .then(|| "Value is not in the allowed list".to_string()),
                        Constraint::MinCount(_)
                        | Constraint::MaxCount(_)
                        | Constraint::HasValue(_) => None,
                    };
                    if let Some(msg) = failure {
                        self.emit(shape, focus, Some(value), constraint, msg);
                    }
                }
            }
        }
    }

    fn emit(
        &mut self,
        shape: &Shape,
        focus: &Term,
        value: Option<&Term>,
        constraint: &Constraint,
        default_message: String,
    ) {
        let r = Term::Blank(format!("r{}", self.results.len() + 1));
        let g = &mut self.report;
        g.add(&r, rdf::TYPE, Term::iri(sh::VALIDATION_RESULT));
        g.add(&r, sh::RESULT_SEVERITY, Term::iri(shape.severity.iri()));
        g.add(&r, sh::FOCUS_NODE, focus.clone());
        match &shape.path {
            Some(PropertyPath::Predicate(p)) => {
                g.add(&r, sh::RESULT_PATH, p.clone());
            }
            Some(PropertyPath::Inverse(p)) => {
                let path = Term::Blank(format!("p{}", self.results.len() + 1));
                g.add(&path, sh::INVERSE_PATH, p.clone());
                g.add(&r, sh::RESULT_PATH, path);
            }
            None => {}
        }
        if let Some(v) = value {
            g.add(&r, sh::VALUE, v.clone());
        }
        let message = shape.message.clone().unwrap_or(default_message);
        g.add(&r, sh::RESULT_MESSAGE, Term::string(message));
        g.add(&r, sh::SOURCE_SHAPE, shape.id.clone());
        g.add(&r, sh::SOURCE_CONSTRAINT_COMPONENT, Term::iri(constraint.component()));
        self.results.push(r);
    }

    fn finish(mut self) -> Graph {
        let root = Term::Blank("report".to_string());
        self.report
            .add(&root, rdf::TYPE, Term::iri(sh::VALIDATION_REPORT));
        self.report
            .add(&root, sh::CONFORMS, Term::boolean(self.results.is_empty()));
        for r in self.results {
            self.report.add(&root, sh::RESULT, r);
        }
        self.report
    }
}

fn has_datatype(value: &Term, datatype: &str) -> bool {
    match value.as_literal() {
        Some(lit) => lit.datatype == datatype && well_formed(lit),
        None => false,
    }
}

/// Lexical check for the datatypes the reports emit.
fn well_formed(lit: &Literal) -> bool {
    let s = lit.lexical.as_str();
    match lit.datatype.as_str() {
        xsd::INTEGER => {
            let digits = s.strip_prefix(&['+', '-'][..]).unwrap_or(s);
            !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
        }
        xsd::DECIMAL => {
            let body = s.strip_prefix(&['+', '-'][..]).unwrap_or(s);
            let mut parts = body.splitn(2, '.');
            let int = parts.next().unwrap_or("");
            let frac = parts.next().unwrap_or("");
            (!int.is_empty() || !frac.is_empty())
                && int.bytes().all(|b| b.is_ascii_digit())
                && frac.bytes().all(|b| b.is_ascii_digit())
        }
        xsd::DOUBLE => s.parse::<f64>().is_ok(),
        xsd::BOOLEAN => matches!(s, "true" | "false" | "1" | "0"),
        xsd::DATE_TIME => parse_date_time(s).is_some(),
        _ => true,
    }
}

fn parse_date_time(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.timestamp_nanos_opt();
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .and_then(|dt| dt.and_utc().timestamp_nanos_opt())
}

/// Order of `value` relative to `bound`, when the two are comparable.
fn compare(value: &Term, bound: &Term) -> Option<Ordering> {
    let (v, b) = (value.as_literal()?, bound.as_literal()?);
    if v.is_numeric() && b.is_numeric() {
        return v.as_f64()?.partial_cmp(&b.as_f64()?);
    }
    if v.datatype != b.datatype || v.lang.is_some() || b.lang.is_some() {
        return None;
    }
    if v.datatype == xsd::DATE_TIME {
        return Some(parse_date_time(&v.lexical)?.cmp(&parse_date_time(&b.lexical)?));
    }
    if v.datatype == xsd::STRING {
        return Some(v.lexical.cmp(&b.lexical));
    }
    None
}

fn in_range(value: &Term, bound: &Term, accepted: &[Ordering]) -> bool {
    compare(value, bound).is_some_and(|o| accepted.contains(&o))
}

/// String length used by `sh:minLength`/`sh:maxLength`; blank nodes have none.
fn length(value: &Term) -> Option<usize> {
    match value {
        Term::Blank(_) => None,
        other => Some(other.lexical().chars().count()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::turtle::parse_turtle;
    use crate::shacl::report::{report_conforms, violations_from_report, ResultSeverity};

    const PREFIXES: &str = r#"
@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix ex: <http://example.org/> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
"#;

    fn run(shapes: &str, data: &str) -> Graph {
        let shapes = parse_turtle(&format!("{}{}", PREFIXES, shapes), "shapes.ttl").unwrap();
        let data = parse_turtle(&format!("{}{}", PREFIXES, data), "data.ttl").unwrap();
        validate(&data, &ShapeSet::from_graph(&shapes))
    }

    fn components(report: &Graph) -> Vec<String> {
        violations_from_report(report)
            .iter()
            .map(|v| v.component_name().to_string())
            .collect()
    }

    #[test]
    fn test_conforming_data() {
        let report = run(
            "ex:S a sh:NodeShape ; sh:targetClass ex:File ;
               sh:property [ sh:path ex:loc ; sh:minCount 1 ; sh:datatype xsd:integer ; sh:minInclusive 0 ] .",
            "ex:a a ex:File ; ex:loc 10 .",
        );
        assert!(report_conforms(&report));
        assert!(violations_from_report(&report).is_empty());
    }

    #[test]
    fn test_cardinality() {
        let report = run(
            "ex:S a sh:NodeShape ; sh:targetClass ex:File ;
               sh:property [ sh:path ex:name ; sh:minCount 1 ] ;
               sh:property [ sh:path ex:tag ; sh:maxCount 1 ] .",
            "ex:a a ex:File ; ex:tag \"x\", \"y\" .",
        );
        assert!(!report_conforms(&report));
        let v = violations_from_report(&report);
        assert_eq!(v.len(), 2);
        assert!(v.iter().all(|x| x.focus == "http://example.org/a" && x.value.is_none()));
        let mut names = components(&report);
        names.sort();
        assert_eq!(names, vec!["MaxCount", "MinCount"]);
    }

    #[test]
    fn test_value_ranges() {
        let report = run(
            "ex:S a sh:NodeShape ; sh:targetClass ex:File ;
               sh:property [ sh:path ex:hotness ; sh:minInclusive 0 ; sh:maxInclusive 1 ] ;
               sh:property [ sh:path ex:cc ; sh:maxExclusive 10 ; sh:severity sh:Warning ;
                             sh:message \"Too complex\" ] .",
            "ex:a a ex:File ; ex:hotness 1.5 ; ex:cc 10 .
             ex:b a ex:File ; ex:hotness 0.2 ; ex:cc 9.5 .
             ex:c a ex:File ; ex:hotness \"high\" .",
        );
        let v = violations_from_report(&report);
        assert_eq!(v.len(), 4);
        // Violations sort before warnings.
        assert_eq!(v[0].focus, "http://example.org/a");
        assert_eq!(v[0].component_name(), "MaxInclusive");
        assert_eq!(v[0].value.as_deref(), Some("1.5"));
        // A string is not comparable with a number, so both bounds fail.
        assert_eq!(v[1].focus, "http://example.org/c");
        assert_eq!(v[1].component_name(), "MaxInclusive");
        assert_eq!(v[2].focus, "http://example.org/c");
        assert_eq!(v[2].component_name(), "MinInclusive");
        assert_eq!(v[3].severity, ResultSeverity::Warning);
        assert_eq!(v[3].focus, "http://example.org/a");
        assert_eq!(v[3].message, "Too complex");
    }

    #[test]
    fn test_value_type_constraints() {
        let report = run(
            "ex:S a sh:NodeShape ; sh:targetClass ex:Commit ;
               sh:property [ sh:path ex:author ; sh:class ex:Person ; sh:nodeKind sh:IRI ] ;
               sh:property [ sh:path ex:sha ; sh:datatype xsd:string ; sh:pattern \"^[0-9a-f]+$\" ;
                             sh:minLength 4 ; sh:maxLength 8 ] ;
               sh:property [ sh:path ex:size ; sh:datatype xsd:integer ] .",
            "ex:p a ex:Person .
             ex:c1 a ex:Commit ; ex:author ex:p ; ex:sha \"abcd\" ; ex:size 3 .
             ex:c2 a ex:Commit ; ex:author \"bob\" ; ex:sha \"XYZ\" ; ex:size \"3.5\"^^xsd:integer .",
        );
        let v = violations_from_report(&report);
        assert!(v.iter().all(|x| x.focus == "http://example.org/c2"));
        let mut names = components(&report);
        names.sort();
        assert_eq!(
            names,
            vec!["Class", "Datatype", "MinLength", "NodeKind", "Pattern"]
        );
    }

    #[test]
    fn test_in_and_has_value() {
        let report = run(
            "ex:S a sh:NodeShape ; sh:targetSubjectsOf ex:severity ;
               sh:property [ sh:path ex:severity ; sh:in ( \"low\" \"high\" ) ] ;
               sh:property [ sh:path ex:kind ; sh:hasValue \"issue\" ] .",
            "ex:i1 ex:severity \"low\" ; ex:kind \"issue\" .
             ex:i2 ex:severity \"urgent\" .",
        );
        let v = violations_from_report(&report);
        assert_eq!(v.len(), 2);
        assert!(v.iter().all(|x| x.focus == "http://example.org/i2"));
        let mut names = components(&report);
        names.sort();
        assert_eq!(names, vec!["HasValue", "In"]);
    }

    #[test]
    fn test_class_follows_subclass_chain() {
        let report = run(
            "ex:S a sh:NodeShape ; sh:targetClass ex:File ;
               sh:property [ sh:path ex:loc ; sh:minCount 1 ] ;
               sh:property [ sh:path ex:owner ; sh:class ex:Person ] .",
            "@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
             ex:PyFile rdfs:subClassOf ex:File . ex:Stub rdfs:subClassOf ex:PyFile .
             ex:Dev rdfs:subClassOf ex:Person .
             ex:a a ex:PyFile ; ex:owner ex:ann .
             ex:b a ex:Stub ; ex:loc 1 ; ex:owner ex:bot .
             ex:ann a ex:Dev . ex:bot a ex:Robot .",
        );
        let mut found: Vec<(String, String)> = violations_from_report(&report)
            .iter()
            .map(|v| (v.focus.clone(), v.component_name().to_string()))
            .collect();
        found.sort();
        assert_eq!(
            found,
            vec![
                ("http://example.org/a".to_string(), "MinCount".to_string()),
                ("http://example.org/b".to_string(), "Class".to_string()),
            ]
        );
    }

    #[test]
    fn test_targets_and_inverse_path() {
        let report = run(
            "ex:S a sh:NodeShape ; sh:targetNode ex:lonely ; sh:targetObjectsOf ex:owns ;
               sh:property [ sh:path [ sh:inversePath ex:owns ] ; sh:maxCount 1 ] .",
            "ex:x ex:owns ex:f . ex:y ex:owns ex:f . ex:x ex:owns ex:g .",
        );
        let v = violations_from_report(&report);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].focus, "http://example.org/f");
        assert_eq!(v[0].path.as_deref(), Some("^http://example.org/owns"));
    }

    #[test]
    fn test_node_level_constraints_and_deactivation() {
        let report = run(
            "ex:S a sh:NodeShape ; sh:targetNode \"text\", ex:n ; sh:nodeKind sh:IRI .
             ex:Off a sh:NodeShape ; sh:targetNode ex:n ; sh:deactivated true ; sh:nodeKind sh:Literal .",
            "ex:n ex:p 1 .",
        );
        let v = violations_from_report(&report);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].focus, "text");
        assert_eq!(v[0].value.as_deref(), Some("text"));
        assert!(v[0].path.is_none());
    }

    #[test]
    fn test_well_formed_literals() {
        assert!(well_formed(&Literal::typed("-12", xsd::INTEGER)));
        assert!(!well_formed(&Literal::typed("1.5", xsd::INTEGER)));
        assert!(well_formed(&Literal::typed(".5", xsd::DECIMAL)));
        assert!(!well_formed(&Literal::typed("1e3", xsd::DECIMAL)));
        assert!(well_formed(&Literal::typed("2024-01-01T00:00:00Z", xsd::DATE_TIME)));
        assert!(well_formed(&Literal::typed("2024-01-01T00:00:00", xsd::DATE_TIME)));
        assert!(!well_formed(&Literal::typed("yesterday", xsd::DATE_TIME)));
    }

    #[test]
    fn test_compare_date_times() {
        let a = Term::date_time("2024-01-01T00:00:00+02:00");
        let b = Term::date_time("2023-12-31T23:00:00Z");
        assert_eq!(compare(&a, &b), Some(Ordering::Less));
        assert_eq!(compare(&a, &Term::integer(1)), None);
    }
}
