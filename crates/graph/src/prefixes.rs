//! Fixed prefix block and pattern-term resolution (spec §4.2, §6 Ontology
//! file).

use std::collections::HashMap;

use agentrt_domain::graph::{Term, TermType};

/// The fixed prefix block carried in `ontology.ttl` (spec §6).
pub fn default_prefixes() -> HashMap<String, String> {
    HashMap::from([
        (
            "rdf".to_string(),
            "http://www.w3.org/1999/02/22-rdf-syntax-ns#".to_string(),
        ),
        (
            "rdfs".to_string(),
            "http://www.w3.org/2000/01/rdf-schema#".to_string(),
        ),
        (
            "sh".to_string(),
            "http://www.w3.org/ns/shacl#".to_string(),
        ),
        ("dct".to_string(), "http://purl.org/dc/terms/".to_string()),
        ("schema".to_string(), "https://schema.org/".to_string()),
        (
            "foaf".to_string(),
            "http://xmlns.com/foaf/0.1/".to_string(),
        ),
    ])
}

fn is_wildcard(raw: &str) -> bool {
    matches!(raw, "?" | "*" | "_" | "" | "null" | "NULL")
}

/// A pattern term, resolved per spec §4.2: wildcard sentinels, prefixed
/// CURIEs, double-quoted literals, `http(s)://` IRIs, else a bare literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternTerm {
    Wildcard,
    Iri(String),
    Literal(String),
}

pub fn resolve_term(raw: Option<&str>, prefixes: &HashMap<String, String>) -> PatternTerm {
    let raw = match raw {
        None => return PatternTerm::Wildcard,
        Some(r) => r,
    };
    if is_wildcard(raw) {
        return PatternTerm::Wildcard;
    }
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return PatternTerm::Literal(raw[1..raw.len() - 1].to_string());
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return PatternTerm::Iri(raw.to_string());
    }
    if let Some((prefix, local)) = raw.split_once(':') {
        if let Some(base) = prefixes.get(prefix) {
            return PatternTerm::Iri(format!("{base}{local}"));
        }
    }
    PatternTerm::Literal(raw.to_string())
}

pub fn term_matches(pattern: &PatternTerm, term: &Term) -> bool {
    match pattern {
        PatternTerm::Wildcard => true,
        PatternTerm::Iri(v) => term.term_type == TermType::NamedNode && &term.value == v,
        PatternTerm::Literal(v) => term.term_type == TermType::Literal && &term.value == v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_sentinels_all_resolve_to_wildcard() {
        let prefixes = default_prefixes();
        for raw in ["?", "*", "_", "", "null", "NULL"] {
            assert_eq!(resolve_term(Some(raw), &prefixes), PatternTerm::Wildcard);
        }
        assert_eq!(resolve_term(None, &prefixes), PatternTerm::Wildcard);
    }

    #[test]
    fn prefixed_term_resolves_through_prefix_map() {
        let prefixes = default_prefixes();
        assert_eq!(
            resolve_term(Some("schema:Person"), &prefixes),
            PatternTerm::Iri("https://schema.org/Person".to_string())
        );
    }

    #[test]
    fn unknown_prefix_falls_back_to_literal() {
        let prefixes = default_prefixes();
        assert_eq!(
            resolve_term(Some("nope:Thing"), &prefixes),
            PatternTerm::Literal("nope:Thing".to_string())
        );
    }

    #[test]
    fn quoted_term_is_a_literal() {
        let prefixes = default_prefixes();
        assert_eq!(
            resolve_term(Some("\"hello\""), &prefixes),
            PatternTerm::Literal("hello".to_string())
        );
    }

    #[test]
    fn bare_http_url_is_an_iri() {
        let prefixes = default_prefixes();
        assert_eq!(
            resolve_term(Some("https://example.com/p1"), &prefixes),
            PatternTerm::Iri("https://example.com/p1".to_string())
        );
    }

    #[test]
    fn bare_word_is_a_literal() {
        let prefixes = default_prefixes();
        assert_eq!(
            resolve_term(Some("plain"), &prefixes),
            PatternTerm::Literal("plain".to_string())
        );
    }
}
