//! RDF term/quad shapes (spec §3 Quad entity, §4.2, §6 GraphIndex wire
//! format).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermType {
    NamedNode,
    Literal,
    BlankNode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub value: String,
    #[serde(rename = "termType")]
    pub term_type: TermType,
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            term_type: TermType::NamedNode,
        }
    }
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            term_type: TermType::Literal,
        }
    }
    pub fn blank(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            term_type: TermType::BlankNode,
        }
    }
}

/// `(subject, predicate, object)` (spec §3: "RDF quad", structurally a
/// triple — the name is kept from the wire format).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quad {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}
