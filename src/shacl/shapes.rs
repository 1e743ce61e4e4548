//! Shapes compiled from a shapes graph
//!
//! Reading the shapes graph once up front keeps the validation loop free of
//! graph lookups on the shapes side and lets unknown parameters be reported
//! a single time.

use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::rdf::vocab::{rdf, rdfs, sh};
use crate::rdf::{Graph, Term};

use super::report::ResultSeverity;

/// How focus nodes are selected
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Class(Term),
    Node(Term),
    SubjectsOf(Term),
    ObjectsOf(Term),
}

/// Property path of a property shape
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyPath {
    Predicate(Term),
    Inverse(Term),
}

impl PropertyPath {
    /// Values reached from `focus` along this path.
    pub fn values(&self, data: &Graph, focus: &Term) -> Vec<Term> {
        match self {
            PropertyPath::Predicate(p) => data.objects(focus, p).cloned().collect(),
            PropertyPath::Inverse(p) => data.subjects(p, focus).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Iri,
    BlankNode,
    Literal,
    BlankNodeOrIri,
    BlankNodeOrLiteral,
    IriOrLiteral,
}

impl NodeKind {
    fn from_iri(iri: &str) -> Option<Self> {
        Some(match iri {
            sh::IRI => NodeKind::Iri,
            sh::BLANK_NODE => NodeKind::BlankNode,
            sh::LITERAL => NodeKind::Literal,
            sh::BLANK_NODE_OR_IRI => NodeKind::BlankNodeOrIri,
            sh::BLANK_NODE_OR_LITERAL => NodeKind::BlankNodeOrLiteral,
            sh::IRI_OR_LITERAL => NodeKind::IriOrLiteral,
            _ => return None,
        })
    }

    pub fn matches(self, term: &Term) -> bool {
        match self {
            NodeKind::Iri => term.is_iri(),
            NodeKind::BlankNode => term.is_blank(),
            NodeKind::Literal => term.is_literal(),
            NodeKind::BlankNodeOrIri => !term.is_literal(),
            NodeKind::BlankNodeOrLiteral => !term.is_iri(),
            NodeKind::IriOrLiteral => !term.is_blank(),
        }
    }
}

/// A single constraint parameter
#[derive(Debug, Clone)]
pub enum Constraint {
    Class(Term),
    Datatype(String),
    NodeKind(NodeKind, Term),
    MinCount(usize),
    MaxCount(usize),
    MinInclusive(Term),
    MaxInclusive(Term),
    MinExclusive(Term),
    MaxExclusive(Term),
    MinLength(usize),
    MaxLength(usize),
    Pattern { regex: Regex, source: String },
    In(Vec<Term>),
    HasValue(Term),
}

impl Constraint {
    /// Local name of the parameter, e.g. `minCount`.
    pub fn parameter(&self) -> &'static str {
        match self {
            Constraint::Class(_) => "class",
            Constraint::Datatype(_) => "datatype",
            Constraint::NodeKind(..) => "nodeKind",
            Constraint::MinCount(_) => "minCount",
            Constraint::MaxCount(_) => "maxCount",
            Constraint::MinInclusive(_) => "minInclusive",
            Constraint::MaxInclusive(_) => "maxInclusive",
            Constraint::MinExclusive(_) => "minExclusive",
            Constraint::MaxExclusive(_) => "maxExclusive",
            Constraint::MinLength(_) => "minLength",
            Constraint::MaxLength(_) => "maxLength",
            Constraint::Pattern { .. } => "pattern",
            Constraint::In(_) => "in",
            Constraint::HasValue(_) => "hasValue",
        }
    }

    /// Constraint component IRI reported in results.
    pub fn component(&self) -> String {
        sh::component(self.parameter())
    }
}

/// A node shape or property shape
#[derive(Debug, Clone)]
pub struct Shape {
    pub id: Term,
    pub targets: Vec<Target>,
    /// `Some` for property shapes
    pub path: Option<PropertyPath>,
    pub constraints: Vec<Constraint>,
    pub severity: ResultSeverity,
    pub message: Option<String>,
    pub deactivated: bool,
    /// Property shapes attached with `sh:property`
    pub properties: Vec<Shape>,
}

/// Every shape of a shapes graph that has targets
#[derive(Debug, Clone, Default)]
pub struct ShapeSet {
    pub shapes: Vec<Shape>,
    /// Unsupported parameters seen, as (shape, parameter IRI)
    pub skipped: Vec<(Term, String)>,
}

impl ShapeSet {
    /// Compile the shapes in `graph`.
    ///
    /// A shape is any subject typed `sh:NodeShape`/`sh:PropertyShape` or
    /// carrying a target predicate. Shapes without targets are only reachable
    /// through `sh:property`.
    pub fn from_graph(graph: &Graph) -> Self {
        let mut set = ShapeSet::default();
        let type_p = Term::iri(rdf::TYPE);

        let mut roots: BTreeSet<Term> = BTreeSet::new();
        for class in [sh::NODE_SHAPE, sh::PROPERTY_SHAPE] {
            roots.extend(graph.subjects(&type_p, &Term::iri(class)).cloned());
        }
        for target in [
            sh::TARGET_CLASS,
            sh::TARGET_NODE,
            sh::TARGET_SUBJECTS_OF,
            sh::TARGET_OBJECTS_OF,
        ] {
            roots.extend(graph.subjects_with(&Term::iri(target)).into_iter().cloned());
        }

        for id in roots {
            let shape = compile_shape(graph, &id, &mut set.skipped);
            if shape.targets.is_empty() {
                debug!("Shape {} has no targets", id);
                continue;
            }
            set.shapes.push(shape);
        }
        for (shape, param) in &set.skipped {
            warn!("Unsupported SHACL constraint {} on shape {}, skipping", param, shape);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

fn compile_shape(graph: &Graph, id: &Term, skipped: &mut Vec<(Term, String)>) -> Shape {
    let get = |p: &str| graph.object(id, &Term::iri(p));
    let all = |p: &str| graph.objects(id, &Term::iri(p)).cloned().collect::<Vec<_>>();

    let mut targets = Vec::new();
    targets.extend(all(sh::TARGET_CLASS).into_iter().map(Target::Class));
    targets.extend(all(sh::TARGET_NODE).into_iter().map(Target::Node));
    targets.extend(all(sh::TARGET_SUBJECTS_OF).into_iter().map(Target::SubjectsOf));
    targets.extend(all(sh::TARGET_OBJECTS_OF).into_iter().map(Target::ObjectsOf));
    // A shape that is also a class targets its own instances.
    let type_p = Term::iri(rdf::TYPE);
    if graph.contains(id, &type_p, &Term::iri(rdfs::CLASS))
        && graph.contains(id, &type_p, &Term::iri(sh::NODE_SHAPE))
    {
        targets.push(Target::Class(id.clone()));
    }

    let path = get(sh::PATH).and_then(|p| compile_path(graph, p));

    let severity = get(sh::SEVERITY)
        .and_then(Term::as_iri)
        .and_then(ResultSeverity::from_iri)
        .unwrap_or(ResultSeverity::Violation);
    let message = get(sh::MESSAGE).map(|m| m.lexical().to_string());
    let deactivated = get(sh::DEACTIVATED).and_then(Term::as_bool).unwrap_or(false);

    let mut constraints = Vec::new();
    if let Some(t) = get(sh::CLASS) {
        constraints.push(Constraint::Class(t.clone()));
    }
    if let Some(dt) = get(sh::DATATYPE).and_then(Term::as_iri) {
        constraints.push(Constraint::Datatype(dt.to_string()));
    }
    if let Some(t) = get(sh::NODE_KIND) {
        match t.as_iri().and_then(NodeKind::from_iri) {
            Some(kind) => constraints.push(Constraint::NodeKind(kind, t.clone())),
            None => warn!("Unknown sh:nodeKind {} on shape {}", t, id),
        }
    }
    let count = |p: &str| {
        get(p)
            .and_then(Term::as_f64)
            .filter(|n| *n >= 0.0)
            .map(|n| n as usize)
    };
    if let Some(n) = count(sh::MIN_COUNT) {
        constraints.push(Constraint::MinCount(n));
    }
    if let Some(n) = count(sh::MAX_COUNT) {
        constraints.push(Constraint::MaxCount(n));
    }
    if let Some(t) = get(sh::MIN_INCLUSIVE) {
        constraints.push(Constraint::MinInclusive(t.clone()));
    }
    if let Some(t) = get(sh::MAX_INCLUSIVE) {
        constraints.push(Constraint::MaxInclusive(t.clone()));
    }
    if let Some(t) = get(sh::MIN_EXCLUSIVE) {
        constraints.push(Constraint::MinExclusive(t.clone()));
    }
    if let Some(t) = get(sh::MAX_EXCLUSIVE) {
        constraints.push(Constraint::MaxExclusive(t.clone()));
    }
    if let Some(n) = count(sh::MIN_LENGTH) {
        constraints.push(Constraint::MinLength(n));
    }
    if let Some(n) = count(sh::MAX_LENGTH) {
        constraints.push(Constraint::MaxLength(n));
    }
    if let Some(p) = get(sh::PATTERN) {
        let source = p.lexical().to_string();
        let flags = get(sh::FLAGS).map(|f| f.lexical().to_string()).unwrap_or_default();
        match build_pattern(&source, &flags) {
            Ok(regex) => constraints.push(Constraint::Pattern { regex, source }),
            Err(e) => warn!("Invalid sh:pattern {:?} on shape {}: {}", source, id, e),
        }
    }
    if let Some(head) = get(sh::IN) {
        constraints.push(Constraint::In(graph.list_items(head)));
    }
    for value in all(sh::HAS_VALUE) {
        constraints.push(Constraint::HasValue(value));
    }

    for (p, _) in graph.properties(id) {
        if let Some(iri) = p.as_iri() {
            if sh::UNSUPPORTED.contains(&iri) {
                skipped.push((id.clone(), iri.to_string()));
            }
        }
    }

    let properties = all(sh::PROPERTY)
        .iter()
        .map(|p| compile_shape(graph, p, skipped))
        .filter(|p| {
            if p.path.is_none() {
                warn!("Property shape {} has no usable sh:path, skipping", p.id);
            }
            p.path.is_some()
        })
        .collect();

    Shape {
        id: id.clone(),
        targets,
        path,
        constraints,
        severity,
        message,
        deactivated,
        properties,
    }
}

fn compile_path(graph: &Graph, path: &Term) -> Option<PropertyPath> {
    match path {
        Term::Iri(_) => Some(PropertyPath::Predicate(path.clone())),
        Term::Blank(_) => match graph.object(path, &Term::iri(sh::INVERSE_PATH)) {
            Some(p) if p.is_iri() => Some(PropertyPath::Inverse(p.clone())),
            _ => {
                warn!("Unsupported property path {}, skipping", path);
                None
            }
        },
        Term::Literal(_) => None,
    }
}

/// Compile a SHACL pattern. Only the `i`, `m`, `s` and `x` flags map onto
/// the regex crate.
fn build_pattern(source: &str, flags: &str) -> Result<Regex, regex::Error> {
    let mut builder = RegexBuilder::new(source);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'x' => {
                builder.ignore_whitespace(true);
            }
            other => debug!("Ignoring unsupported regex flag '{}'", other),
        }
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::turtle::parse_turtle;

    const SHAPES: &str = r#"
@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix ex: <http://example.org/> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

ex:PersonShape a sh:NodeShape ;
    sh:targetClass ex:Person ;
    sh:closed true ;
    sh:property [
        sh:path ex:name ;
        sh:minCount 1 ;
        sh:maxCount 1 ;
        sh:datatype xsd:string ;
        sh:pattern "^[a-z]+$" ;
        sh:flags "i"
    ] ;
    sh:property [
        sh:path [ sh:inversePath ex:knows ] ;
        sh:severity sh:Warning ;
        sh:in ( ex:a ex:b )
    ] .

ex:Helper sh:path ex:unused .
"#;

    #[test]
    fn test_compile_shapes() {
        let graph = parse_turtle(SHAPES, "shapes.ttl").unwrap();
        let set = ShapeSet::from_graph(&graph);
        assert_eq!(set.len(), 1);

        let shape = &set.shapes[0];
        assert_eq!(shape.id, Term::iri("http://example.org/PersonShape"));
        assert_eq!(
            shape.targets,
            vec![Target::Class(Term::iri("http://example.org/Person"))]
        );
        assert_eq!(shape.severity, ResultSeverity::Violation);
        assert_eq!(shape.properties.len(), 2);

        let name = shape
            .properties
            .iter()
            .find(|p| p.path == Some(PropertyPath::Predicate(Term::iri("http://example.org/name"))))
            .unwrap();
        let params: Vec<&str> = name.constraints.iter().map(Constraint::parameter).collect();
        assert_eq!(params, vec!["datatype", "minCount", "maxCount", "pattern"]);
        let Some(Constraint::Pattern { regex, .. }) = name.constraints.last() else {
            panic!("expected a pattern");
        };
        assert!(regex.is_match("Alice"));

        let inverse = shape
            .properties
            .iter()
            .find(|p| matches!(p.path, Some(PropertyPath::Inverse(_))))
            .unwrap();
        assert_eq!(inverse.severity, ResultSeverity::Warning);
        assert!(matches!(&inverse.constraints[0], Constraint::In(items) if items.len() == 2));

        assert_eq!(set.skipped.len(), 1);
        assert_eq!(set.skipped[0].1, "http://www.w3.org/ns/shacl#closed");
    }

    #[test]
    fn test_implicit_class_target() {
        let ttl = r#"
@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix ex: <http://example.org/> .
ex:Thing a rdfs:Class, sh:NodeShape ; sh:nodeKind sh:IRI .
"#;
        let set = ShapeSet::from_graph(&parse_turtle(ttl, "t.ttl").unwrap());
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.shapes[0].targets,
            vec![Target::Class(Term::iri("http://example.org/Thing"))]
        );
    }

    #[test]
    fn test_component_names() {
        assert_eq!(
            Constraint::MinCount(1).component(),
            "http://www.w3.org/ns/shacl#MinCountConstraintComponent"
        );
        assert_eq!(Constraint::In(vec![]).parameter(), "in");
    }
}
