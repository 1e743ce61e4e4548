//! In-memory RDF graph
//!
//! Terms are IRIs, blank nodes and literals. The graph keeps two indexes
//! (subject→predicate→objects and predicate→object→subjects) so the SHACL
//! engine can answer `objects(s, p)` and `subjects(p, o)` without scanning.

pub mod turtle;
pub mod vocab;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use vocab::{rdf, xsd};

/// A literal value with its datatype IRI and optional language tag
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Literal {
    pub lexical: String,
    pub datatype: String,
    pub lang: Option<String>,
}

impl Literal {
    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: datatype.into(),
            lang: None,
        }
    }

    pub fn lang_string(lexical: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: rdf::LANG_STRING.to_string(),
            lang: Some(lang.into().to_lowercase()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        xsd::is_numeric(&self.datatype)
    }

    /// Numeric value for numeric datatypes.
    pub fn as_f64(&self) -> Option<f64> {
        if self.is_numeric() {
            self.lexical.trim().parse().ok()
        } else {
            None
        }
    }
}

/// An RDF term
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Term {
    Iri(String),
    Blank(String),
    Literal(Literal),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Term::Literal(Literal::typed(value, xsd::STRING))
    }

    pub fn integer(value: impl Into<i64>) -> Self {
        Term::Literal(Literal::typed(value.into().to_string(), xsd::INTEGER))
    }

    /// An `xsd:decimal`, rounded to 4 places so output is stable.
    pub fn decimal(value: f64) -> Self {
        let mut lexical = format!("{:.4}", value);
        while lexical.ends_with('0') && !lexical.ends_with(".0") {
            lexical.pop();
        }
        Term::Literal(Literal::typed(lexical, xsd::DECIMAL))
    }

    pub fn boolean(value: bool) -> Self {
        Term::Literal(Literal::typed(value.to_string(), xsd::BOOLEAN))
    }

    pub fn date_time(value: impl Into<String>) -> Self {
        Term::Literal(Literal::typed(value, xsd::DATE_TIME))
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri(_))
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Term::Blank(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }

    /// Lexical form of a literal or the IRI string; blank labels for blanks.
    pub fn lexical(&self) -> &str {
        match self {
            Term::Iri(s) | Term::Blank(s) => s,
            Term::Literal(l) => &l.lexical,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_literal().and_then(Literal::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.as_literal() {
            Some(l) if l.datatype == xsd::BOOLEAN => match l.lexical.as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    /// N-Triples style rendering, used in messages and logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::Blank(label) => write!(f, "_:{}", label),
            Term::Literal(lit) => {
                write!(f, "\"{}\"", turtle::escape_string(&lit.lexical))?;
                if let Some(lang) = &lit.lang {
                    write!(f, "@{}", lang)
                } else if lit.datatype != xsd::STRING {
                    write!(f, "^^<{}>", lit.datatype)
                } else {
                    Ok(())
                }
            }
        }
    }
}

type Index = BTreeMap<Term, BTreeMap<Term, BTreeSet<Term>>>;

/// A set of triples with lookup indexes
#[derive(Debug, Clone, Default)]
pub struct Graph {
    spo: Index,
    pos: Index,
    len: usize,
    next_blank: u64,
    /// Prefix → namespace, used when writing Turtle
    prefixes: BTreeMap<String, String>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Add a triple. Returns false if it was already present.
    pub fn insert(&mut self, s: Term, p: Term, o: Term) -> bool {
        let fresh = self
            .spo
            .entry(s.clone())
            .or_default()
            .entry(p.clone())
            .or_default()
            .insert(o.clone());
        if fresh {
            self.pos.entry(p).or_default().entry(o).or_default().insert(s);
            self.len += 1;
        }
        fresh
    }

    /// Convenience for IRI predicates.
    pub fn add(&mut self, s: &Term, p: &str, o: Term) -> bool {
        self.insert(s.clone(), Term::iri(p), o)
    }

    pub fn contains(&self, s: &Term, p: &Term, o: &Term) -> bool {
        self.spo
            .get(s)
            .and_then(|m| m.get(p))
            .map(|objs| objs.contains(o))
            .unwrap_or(false)
    }

    /// Fresh blank node, unique within this graph.
    pub fn blank(&mut self) -> Term {
        self.next_blank += 1;
        Term::Blank(format!("b{}", self.next_blank))
    }

    pub fn objects<'a>(&'a self, s: &Term, p: &Term) -> impl Iterator<Item = &'a Term> + 'a {
        self.spo
            .get(s)
            .and_then(|m| m.get(p))
            .into_iter()
            .flat_map(|objs| objs.iter())
    }

    pub fn object(&self, s: &Term, p: &Term) -> Option<&Term> {
        self.objects(s, p).next()
    }

    pub fn subjects<'a>(&'a self, p: &Term, o: &Term) -> impl Iterator<Item = &'a Term> + 'a {
        self.pos
            .get(p)
            .and_then(|m| m.get(o))
            .into_iter()
            .flat_map(|subs| subs.iter())
    }

    /// Distinct subjects that have predicate `p`.
    pub fn subjects_with(&self, p: &Term) -> BTreeSet<&Term> {
        self.pos
            .get(p)
            .into_iter()
            .flat_map(|m| m.values().flat_map(|subs| subs.iter()))
            .collect()
    }

    /// Distinct objects of predicate `p`.
    pub fn objects_with(&self, p: &Term) -> BTreeSet<&Term> {
        self.pos
            .get(p)
            .into_iter()
            .flat_map(|m| m.keys())
            .collect()
    }

    /// Every subject in the graph.
    pub fn subjects_all(&self) -> impl Iterator<Item = &Term> {
        self.spo.keys()
    }

    /// Predicate/object pairs of a subject.
    pub fn properties<'a>(&'a self, s: &Term) -> impl Iterator<Item = (&'a Term, &'a Term)> + 'a {
        self.spo
            .get(s)
            .into_iter()
            .flat_map(|m| m.iter().flat_map(|(p, objs)| objs.iter().map(move |o| (p, o))))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Term, &Term, &Term)> {
        self.spo.iter().flat_map(|(s, m)| {
            m.iter()
                .flat_map(move |(p, objs)| objs.iter().map(move |o| (s, p, o)))
        })
    }

    /// Items of an RDF collection starting at `head`.
    ///
    /// Stops at `rdf:nil` or at the first malformed cell.
    pub fn list_items(&self, head: &Term) -> Vec<Term> {
        let first = Term::iri(rdf::FIRST);
        let rest = Term::iri(rdf::REST);
        let nil = Term::iri(rdf::NIL);
        let mut items = Vec::new();
        let mut seen = BTreeSet::new();
        let mut cur = head.clone();
        while cur != nil && seen.insert(cur.clone()) {
            match self.object(&cur, &first) {
                Some(item) => items.push(item.clone()),
                None => break,
            }
            match self.object(&cur, &rest) {
                Some(next) => cur = next.clone(),
                None => break,
            }
        }
        items
    }

    /// Build an RDF collection and return its head.
    pub fn add_list(&mut self, items: Vec<Term>) -> Term {
        let mut head = Term::iri(rdf::NIL);
        for item in items.into_iter().rev() {
            let cell = self.blank();
            self.add(&cell, rdf::FIRST, item);
            self.add(&cell, rdf::REST, head);
            head = cell;
        }
        head
    }

    pub fn set_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    pub fn prefixes(&self) -> &BTreeMap<String, String> {
        &self.prefixes
    }
}
