//! Namespaces and the IRIs we use from them

/// RepoQ's own vocabulary
pub mod repo {
    pub const NS: &str = "http://repoq.dev/ns#";

    pub const PROJECT: &str = "http://repoq.dev/ns#Project";
    pub const FILE: &str = "http://repoq.dev/ns#File";
    pub const MODULE: &str = "http://repoq.dev/ns#Module";
    pub const COMMIT: &str = "http://repoq.dev/ns#Commit";
    pub const CONTRIBUTOR: &str = "http://repoq.dev/ns#Contributor";
    pub const ISSUE: &str = "http://repoq.dev/ns#Issue";
    pub const COUPLING: &str = "http://repoq.dev/ns#CouplingEdge";
    pub const DEPENDENCY: &str = "http://repoq.dev/ns#DependencyEdge";

    pub const NAME: &str = "http://repoq.dev/ns#name";
    pub const ROOT: &str = "http://repoq.dev/ns#root";
    pub const ANALYZED_AT: &str = "http://repoq.dev/ns#analyzedAt";
    pub const GIT_HEAD: &str = "http://repoq.dev/ns#gitHead";
    pub const HAS_FILE: &str = "http://repoq.dev/ns#hasFile";
    pub const HAS_MODULE: &str = "http://repoq.dev/ns#hasModule";
    pub const HAS_COMMIT: &str = "http://repoq.dev/ns#hasCommit";
    pub const HAS_CONTRIBUTOR: &str = "http://repoq.dev/ns#hasContributor";
    pub const HAS_ISSUE: &str = "http://repoq.dev/ns#hasIssue";
    pub const HAS_COUPLING: &str = "http://repoq.dev/ns#hasCoupling";
    pub const HAS_DEPENDENCY: &str = "http://repoq.dev/ns#hasDependency";

    pub const PATH: &str = "http://repoq.dev/ns#path";
    pub const LANGUAGE: &str = "http://repoq.dev/ns#language";
    pub const LOC: &str = "http://repoq.dev/ns#loc";
    pub const SIZE_BYTES: &str = "http://repoq.dev/ns#sizeBytes";
    pub const CHECKSUM: &str = "http://repoq.dev/ns#checksum";
    pub const COMPLEXITY: &str = "http://repoq.dev/ns#complexity";
    pub const MAINTAINABILITY: &str = "http://repoq.dev/ns#maintainability";
    pub const CHURN: &str = "http://repoq.dev/ns#churn";
    pub const LINES_ADDED: &str = "http://repoq.dev/ns#linesAdded";
    pub const LINES_DELETED: &str = "http://repoq.dev/ns#linesDeleted";
    pub const COMMIT_COUNT: &str = "http://repoq.dev/ns#commitCount";
    pub const OWNER: &str = "http://repoq.dev/ns#owner";
    pub const HOTNESS: &str = "http://repoq.dev/ns#hotness";
    pub const TODO_COUNT: &str = "http://repoq.dev/ns#todoCount";
    pub const IN_MODULE: &str = "http://repoq.dev/ns#inModule";
    pub const CONTAINS: &str = "http://repoq.dev/ns#containsFile";

    pub const SHA: &str = "http://repoq.dev/ns#sha";
    pub const AUTHOR: &str = "http://repoq.dev/ns#author";
    pub const MESSAGE: &str = "http://repoq.dev/ns#message";
    pub const TOUCHES: &str = "http://repoq.dev/ns#touches";

    pub const EMAIL: &str = "http://repoq.dev/ns#email";
    pub const OWNS: &str = "http://repoq.dev/ns#owns";

    pub const KIND: &str = "http://repoq.dev/ns#issueType";
    pub const SEVERITY: &str = "http://repoq.dev/ns#severity";
    pub const TITLE: &str = "http://repoq.dev/ns#title";
    pub const DESCRIPTION: &str = "http://repoq.dev/ns#description";
    pub const AFFECTS: &str = "http://repoq.dev/ns#affects";
    pub const SCORE: &str = "http://repoq.dev/ns#score";

    pub const SOURCE: &str = "http://repoq.dev/ns#source";
    pub const TARGET: &str = "http://repoq.dev/ns#target";
    pub const RESOLVED: &str = "http://repoq.dev/ns#resolvesTo";
    pub const WEIGHT: &str = "http://repoq.dev/ns#weight";
}

pub mod rdf {
    pub const NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
    pub const REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
    pub const NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
    pub const LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
}

pub mod rdfs {
    pub const NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
    pub const CLASS: &str = "http://www.w3.org/2000/01/rdf-schema#Class";
    pub const SUB_CLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
    pub const SUB_PROPERTY_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subPropertyOf";
}

pub mod xsd {
    pub const NS: &str = "http://www.w3.org/2001/XMLSchema#";
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    pub const DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

    const NUMERIC_LOCAL_NAMES: &[&str] = &[
        "integer",
        "decimal",
        "double",
        "float",
        "long",
        "int",
        "short",
        "byte",
        "nonNegativeInteger",
        "positiveInteger",
        "nonPositiveInteger",
        "negativeInteger",
        "unsignedLong",
        "unsignedInt",
        "unsignedShort",
        "unsignedByte",
    ];

    pub fn is_numeric(datatype: &str) -> bool {
        datatype
            .strip_prefix(NS)
            .map(|local| NUMERIC_LOCAL_NAMES.contains(&local))
            .unwrap_or(false)
    }
}

pub mod foaf {
    pub const NS: &str = "http://xmlns.com/foaf/0.1/";
    pub const PERSON: &str = "http://xmlns.com/foaf/0.1/Person";
    pub const NAME: &str = "http://xmlns.com/foaf/0.1/name";
}

pub mod prov {
    pub const NS: &str = "http://www.w3.org/ns/prov#";
    pub const AGENT: &str = "http://www.w3.org/ns/prov#Agent";
    pub const ACTIVITY: &str = "http://www.w3.org/ns/prov#Activity";
    pub const WAS_ASSOCIATED_WITH: &str = "http://www.w3.org/ns/prov#wasAssociatedWith";
    pub const ENDED_AT_TIME: &str = "http://www.w3.org/ns/prov#endedAtTime";
    pub const GENERATED_AT_TIME: &str = "http://www.w3.org/ns/prov#generatedAtTime";
}

/// SHACL vocabulary
pub mod sh {
    pub const NS: &str = "http://www.w3.org/ns/shacl#";

    pub const NODE_SHAPE: &str = "http://www.w3.org/ns/shacl#NodeShape";
    pub const PROPERTY_SHAPE: &str = "http://www.w3.org/ns/shacl#PropertyShape";
    pub const PROPERTY: &str = "http://www.w3.org/ns/shacl#property";
    pub const PATH: &str = "http://www.w3.org/ns/shacl#path";
    pub const INVERSE_PATH: &str = "http://www.w3.org/ns/shacl#inversePath";

    pub const TARGET_CLASS: &str = "http://www.w3.org/ns/shacl#targetClass";
    pub const TARGET_NODE: &str = "http://www.w3.org/ns/shacl#targetNode";
    pub const TARGET_SUBJECTS_OF: &str = "http://www.w3.org/ns/shacl#targetSubjectsOf";
    pub const TARGET_OBJECTS_OF: &str = "http://www.w3.org/ns/shacl#targetObjectsOf";

    pub const CLASS: &str = "http://www.w3.org/ns/shacl#class";
    pub const DATATYPE: &str = "http://www.w3.org/ns/shacl#datatype";
    pub const NODE_KIND: &str = "http://www.w3.org/ns/shacl#nodeKind";
    pub const MIN_COUNT: &str = "http://www.w3.org/ns/shacl#minCount";
    pub const MAX_COUNT: &str = "http://www.w3.org/ns/shacl#maxCount";
    pub const MIN_INCLUSIVE: &str = "http://www.w3.org/ns/shacl#minInclusive";
    pub const MAX_INCLUSIVE: &str = "http://www.w3.org/ns/shacl#maxInclusive";
    pub const MIN_EXCLUSIVE: &str = "http://www.w3.org/ns/shacl#minExclusive";
    pub const MAX_EXCLUSIVE: &str = "http://www.w3.org/ns/shacl#maxExclusive";
    pub const MIN_LENGTH: &str = "http://www.w3.org/ns/shacl#minLength";
    pub const MAX_LENGTH: &str = "http://www.w3.org/ns/shacl#maxLength";
    pub const PATTERN: &str = "http://www.w3.org/ns/shacl#pattern";
    pub const FLAGS: &str = "http://www.w3.org/ns/shacl#flags";
    pub const IN: &str = "http://www.w3.org/ns/shacl#in";
    pub const HAS_VALUE: &str = "http://www.w3.org/ns/shacl#hasValue";

    pub const SEVERITY: &str = "http://www.w3.org/ns/shacl#severity";
    pub const MESSAGE: &str = "http://www.w3.org/ns/shacl#message";
    pub const DEACTIVATED: &str = "http://www.w3.org/ns/shacl#deactivated";

    pub const VIOLATION: &str = "http://www.w3.org/ns/shacl#Violation";
    pub const WARNING: &str = "http://www.w3.org/ns/shacl#Warning";
    pub const INFO: &str = "http://www.w3.org/ns/shacl#Info";

    pub const IRI: &str = "http://www.w3.org/ns/shacl#IRI";
    pub const BLANK_NODE: &str = "http://www.w3.org/ns/shacl#BlankNode";
    pub const LITERAL: &str = "http://www.w3.org/ns/shacl#Literal";
    pub const BLANK_NODE_OR_IRI: &str = "http://www.w3.org/ns/shacl#BlankNodeOrIRI";
    pub const BLANK_NODE_OR_LITERAL: &str = "http://www.w3.org/ns/shacl#BlankNodeOrLiteral";
    pub const IRI_OR_LITERAL: &str = "http://www.w3.org/ns/shacl#IRIOrLiteral";

    pub const VALIDATION_REPORT: &str = "http://www.w3.org/ns/shacl#ValidationReport";
    pub const VALIDATION_RESULT: &str = "http://www.w3.org/ns/shacl#ValidationResult";
    pub const CONFORMS: &str = "http://www.w3.org/ns/shacl#conforms";
    pub const RESULT: &str = "http://www.w3.org/ns/shacl#result";
    pub const RESULT_SEVERITY: &str = "http://www.w3.org/ns/shacl#resultSeverity";
    pub const FOCUS_NODE: &str = "http://www.w3.org/ns/shacl#focusNode";
    pub const RESULT_PATH: &str = "http://www.w3.org/ns/shacl#resultPath";
    pub const VALUE: &str = "http://www.w3.org/ns/shacl#value";
    pub const RESULT_MESSAGE: &str = "http://www.w3.org/ns/shacl#resultMessage";
    pub const SOURCE_SHAPE: &str = "http://www.w3.org/ns/shacl#sourceShape";
    pub const SOURCE_CONSTRAINT_COMPONENT: &str =
        "http://www.w3.org/ns/shacl#sourceConstraintComponent";

    /// Constraint parameters we recognise but do not evaluate
    pub const UNSUPPORTED: &[&str] = &[
        "http://www.w3.org/ns/shacl#sparql",
        "http://www.w3.org/ns/shacl#node",
        "http://www.w3.org/ns/shacl#and",
        "http://www.w3.org/ns/shacl#or",
        "http://www.w3.org/ns/shacl#not",
        "http://www.w3.org/ns/shacl#xone",
        "http://www.w3.org/ns/shacl#qualifiedValueShape",
        "http://www.w3.org/ns/shacl#closed",
        "http://www.w3.org/ns/shacl#equals",
        "http://www.w3.org/ns/shacl#disjoint",
        "http://www.w3.org/ns/shacl#lessThan",
        "http://www.w3.org/ns/shacl#lessThanOrEquals",
        "http://www.w3.org/ns/shacl#uniqueLang",
        "http://www.w3.org/ns/shacl#languageIn",
    ];

    /// Constraint component IRI for a parameter's local name, e.g.
    /// `minCount` → `sh:MinCountConstraintComponent`.
    pub fn component(local: &str) -> String {
        let mut chars = local.chars();
        let capitalized: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        format!("{}{}ConstraintComponent", NS, capitalized)
    }
}

/// Prefixes written at the top of Turtle output and into the JSON-LD context
pub const STANDARD_PREFIXES: &[(&str, &str)] = &[
    ("repo", repo::NS),
    ("rdf", rdf::NS),
    ("rdfs", rdfs::NS),
    ("xsd", xsd::NS),
    ("foaf", foaf::NS),
    ("prov", prov::NS),
    ("sh", sh::NS),
];
