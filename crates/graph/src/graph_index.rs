//! GraphIndex (spec §4.2): an RDF triple store layered over IndexBase.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};

use agentrt_domain::graph::Quad;
use agentrt_domain::{Error, Identifier, Result};
use agentrt_index::{apply_query_filter, IndexBase, IndexedItem, QueryFilter};
use agentrt_store::ObjectStore;

use crate::prefixes::{default_prefixes, resolve_term, term_matches};

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

#[derive(Debug, Clone, Default)]
pub struct GraphPattern {
    pub subject: Option<String>,
    pub predicate: Option<String>,
    pub object: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphRecord {
    pub id: String,
    pub identifier: Identifier,
    pub quads: Vec<Quad>,
}

impl IndexedItem for GraphRecord {
    fn id(&self) -> String {
        self.id.clone()
    }
    fn tokens(&self) -> Option<u32> {
        self.identifier.tokens
    }
}

/// The alt-label synonym map harvested from `ontology.ttl`, keyed on the
/// file's modification time at the moment it was parsed (DESIGN.md
/// Decision 2: invalidate on mtime change, don't re-run the regex on
/// every `getSubjects` call).
struct OntologyCache {
    mtime: SystemTime,
    synonyms: HashMap<String, Vec<String>>,
}

pub struct GraphIndex {
    base: IndexBase<GraphRecord>,
    store: Arc<dyn ObjectStore>,
    ontology_key: String,
    prefixes: HashMap<String, String>,
    ontology_cache: RwLock<Option<OntologyCache>>,
}

impl GraphIndex {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        index_key: impl Into<String>,
        ontology_key: impl Into<String>,
    ) -> Self {
        Self {
            base: IndexBase::new(store.clone(), index_key),
            store,
            ontology_key: ontology_key.into(),
            prefixes: default_prefixes(),
            ontology_cache: RwLock::new(None),
        }
    }

    /// Add one resource's quads atomically (spec §4.2 "added to GraphIndex
    /// atomically per resource").
    pub async fn add(&self, identifier: Identifier, quads: Vec<Quad>) -> Result<()> {
        let id = identifier.to_key();
        self.base.add(GraphRecord { id, identifier, quads }).await
    }

    /// All quads matching `pattern` across every loaded resource.
    pub async fn matching_quads(&self, pattern: &GraphPattern) -> Result<Vec<Quad>> {
        let all = self.base.find_all().await?;
        let sp = resolve_term(pattern.subject.as_deref(), &self.prefixes);
        let pp = resolve_term(pattern.predicate.as_deref(), &self.prefixes);
        let op = resolve_term(pattern.object.as_deref(), &self.prefixes);
        Ok(all
            .iter()
            .flat_map(|r| r.quads.iter())
            .filter(|q| {
                term_matches(&sp, &q.subject)
                    && term_matches(&pp, &q.predicate)
                    && term_matches(&op, &q.object)
            })
            .cloned()
            .collect())
    }

    /// Identifiers of resources containing at least one quad matching
    /// `pattern`, with the shared prefix/limit/max_tokens filters applied
    /// (spec §4.2).
    pub async fn query_items(
        &self,
        pattern: &GraphPattern,
        filter: &QueryFilter,
    ) -> Result<Vec<GraphRecord>> {
        let all = self.base.find_all().await?;
        let sp = resolve_term(pattern.subject.as_deref(), &self.prefixes);
        let pp = resolve_term(pattern.predicate.as_deref(), &self.prefixes);
        let op = resolve_term(pattern.object.as_deref(), &self.prefixes);

        let matched: Vec<GraphRecord> = all
            .into_iter()
            .filter(|r| {
                r.quads.iter().any(|q| {
                    term_matches(&sp, &q.subject)
                        && term_matches(&pp, &q.predicate)
                        && term_matches(&op, &q.object)
                })
            })
            .collect();

        apply_query_filter(matched, filter)
    }

    /// `subjectIRI → typeIRI` for subjects whose `rdf:type` matches `class`
    /// (a raw term string, resolved like a pattern term) or any of its
    /// synonyms harvested from `ontology.ttl`. `class = None` returns every
    /// `rdf:type` assertion (spec §4.2 `getSubjects`).
    pub async fn get_subjects(&self, class: Option<&str>) -> Result<HashMap<String, String>> {
        let quads = self
            .matching_quads(&GraphPattern {
                subject: None,
                predicate: Some(RDF_TYPE.to_string()),
                object: None,
            })
            .await?;

        let mut by_subject: HashMap<String, String> = HashMap::new();
        for q in &quads {
            by_subject.insert(q.subject.value.clone(), q.object.value.clone());
        }

        let Some(class) = class else {
            return Ok(by_subject);
        };

        let resolved = resolve_term(Some(class), &self.prefixes);
        let class_iri = match resolved {
            crate::prefixes::PatternTerm::Iri(iri) => iri,
            crate::prefixes::PatternTerm::Literal(s) => s,
            crate::prefixes::PatternTerm::Wildcard => {
                return Ok(by_subject);
            }
        };

        let mut allowed: HashSet<String> = HashSet::from([class_iri.clone()]);
        for syn in self.synonyms_for(&class_iri).await {
            allowed.insert(syn);
        }

        Ok(by_subject
            .into_iter()
            .filter(|(_, type_iri)| allowed.contains(type_iri))
            .collect())
    }

    async fn read_ontology(&self) -> Result<String> {
        let value = self.store.get(&self.ontology_key).await?;
        value
            .as_raw_string()
            .ok_or_else(|| Error::NotFound(self.ontology_key.clone()))
    }

    fn ontology_mtime(&self) -> Option<SystemTime> {
        let path = self.store.path(Some(&self.ontology_key));
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    }

    /// Synonym IRIs for `class_iri`'s local name, from the cached alt-label
    /// map if the ontology file's mtime hasn't changed since it was last
    /// parsed, else re-parsed and re-cached.
    async fn synonyms_for(&self, class_iri: &str) -> Vec<String> {
        let local = local_name(class_iri).to_string();
        let mtime = self.ontology_mtime();

        if let Some(mtime) = mtime {
            if let Some(cached) = self.ontology_cache.read().as_ref() {
                if cached.mtime == mtime {
                    return cached.synonyms.get(&local).cloned().unwrap_or_default();
                }
            }
        }

        let Ok(ontology_text) = self.read_ontology().await else {
            return Vec::new();
        };
        let synonyms = parse_type_synonyms(&ontology_text);
        let result = synonyms.get(&local).cloned().unwrap_or_default();

        if let Some(mtime) = mtime {
            *self.ontology_cache.write() = Some(OntologyCache { mtime, synonyms });
        }

        result
    }
}

fn local_name(iri: &str) -> &str {
    iri.rsplit(['#', '/']).next().unwrap_or(iri)
}

/// Harvest every `typeLocalName → synonym IRIs` entry from the Turtle
/// ontology text in one pass (spec §6: regex
/// `schema:<Type>Shape[^.]*skos:altLabel\s+"(<Syn>)"`), so a cache refresh
/// costs one regex scan regardless of how many classes are later queried.
fn parse_type_synonyms(ontology_text: &str) -> HashMap<String, Vec<String>> {
    let Ok(re) = Regex::new(r#"schema:(\w+)Shape[^.]*skos:altLabel\s+"([^"]+)""#) else {
        return HashMap::new();
    };
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for caps in re.captures_iter(ontology_text) {
        let local = caps[1].to_string();
        let synonym_iri = format!("https://schema.org/{}", &caps[2]);
        map.entry(local).or_default().push(synonym_iri);
    }
    map
}
