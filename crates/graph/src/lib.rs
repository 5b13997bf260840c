//! RDF/SHACL ontology inference over the resource graph (spec §4.2, §4.3).

mod graph_index;
mod ontology;
mod prefixes;
mod shacl;

pub use graph_index::{GraphIndex, GraphPattern, GraphRecord};
pub use ontology::{OntologyData, OntologyProcessor};
pub use prefixes::{default_prefixes, resolve_term, term_matches, PatternTerm};
pub use shacl::ShaclSerializer;
