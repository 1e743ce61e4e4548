//! RDFS closure over `rdfs:subClassOf` and `rdfs:subPropertyOf`
//!
//! Only the two entailments the gate needs: instances of a subclass are
//! typed with every superclass, and statements over a subproperty also hold
//! for every superproperty.

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::rdf::vocab::{rdf, rdfs};
use crate::rdf::{Graph, Term};

/// Transitive closure of a relation given as (sub, super) edges.
fn closure(edges: impl IntoIterator<Item = (Term, Term)>) -> BTreeMap<Term, BTreeSet<Term>> {
    let mut direct: BTreeMap<Term, BTreeSet<Term>> = BTreeMap::new();
    for (sub, sup) in edges {
        if sub != sup {
            direct.entry(sub).or_default().insert(sup);
        }
    }
    let mut full = BTreeMap::new();
    for start in direct.keys() {
        let mut seen: BTreeSet<Term> = BTreeSet::new();
        let mut stack: Vec<&Term> = direct[start].iter().collect();
        while let Some(next) = stack.pop() {
            if seen.insert(next.clone()) {
                if let Some(more) = direct.get(next) {
                    stack.extend(more.iter());
                }
            }
        }
        seen.remove(start);
        full.insert(start.clone(), seen);
    }
    full
}

fn hierarchy(graphs: &[&Graph], predicate: &str) -> BTreeMap<Term, BTreeSet<Term>> {
    let p = Term::iri(predicate);
    let mut edges = Vec::new();
    for g in graphs {
        for sub in g.subjects_with(&p) {
            for sup in g.objects(sub, &p) {
                edges.push((sub.clone(), sup.clone()));
            }
        }
    }
    closure(edges)
}

/// Materialize the RDFS closure of `data` in place.
///
/// Class and property hierarchies are read from `data` and from each graph
/// in `ontologies` (usually the shapes graph). Returns the number of triples
/// added.
pub fn apply_rdfs(data: &mut Graph, ontologies: &[&Graph]) -> usize {
    let before = data.len();
    let mut sources: Vec<&Graph> = Vec::with_capacity(ontologies.len() + 1);
    let snapshot = data.clone();
    sources.push(&snapshot);
    sources.extend_from_slice(ontologies);

    let properties = hierarchy(&sources, rdfs::SUB_PROPERTY_OF);
    let classes = hierarchy(&sources, rdfs::SUB_CLASS_OF);

    let mut added: Vec<(Term, Term, Term)> = Vec::new();
    for (s, p, o) in snapshot.iter() {
        if let Some(supers) = properties.get(p) {
            for sup in supers {
                added.push((s.clone(), sup.clone(), o.clone()));
            }
        }
    }
    for (s, p, o) in added.drain(..) {
        data.insert(s, p, o);
    }

    let type_p = Term::iri(rdf::TYPE);
    let typed: Vec<(Term, Term)> = data
        .iter()
        .filter(|(_, p, _)| **p == type_p)
        .map(|(s, _, o)| (s.clone(), o.clone()))
        .collect();
    for (s, class) in typed {
        if let Some(supers) = classes.get(&class) {
            for sup in supers {
                data.insert(s.clone(), type_p.clone(), sup.clone());
            }
        }
    }

    let inferred = data.len() - before;
    debug!("RDFS inference added {} triples", inferred);
    inferred
}
