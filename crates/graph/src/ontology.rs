//! OntologyProcessor (spec §4.3): streaming inference of a SHACL NodeShape
//! graph from observed quads, including conservative inverse-predicate
//! detection.

use std::collections::{HashMap, HashSet};

use agentrt_domain::graph::{Quad, TermType};

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Predicates assumed one-directional; never assigned an inverse (spec
/// §4.3 Inverse inference).
const ONE_WAY_LOCAL_NAMES: &[&str] = &[
    "citation",
    "mentions",
    "about",
    "isRelatedTo",
    "references",
    "sameAs",
    "url",
];

fn local_name(iri: &str) -> &str {
    iri.rsplit(['#', '/']).next().unwrap_or(iri)
}

#[derive(Debug, Clone, Default)]
pub struct OntologyData {
    pub class_instance_counts: HashMap<String, u64>,
    /// classIRI → predicateIRI → distinct subjects observed with that
    /// predicate while typed as that class.
    pub class_predicates: HashMap<String, HashMap<String, HashSet<String>>>,
    pub predicate_counts: HashMap<String, u64>,
    /// predicateIRI → objectClassIRI → observation count.
    pub predicate_object_types: HashMap<String, HashMap<String, u64>>,
    /// predicateIRI → its inferred inverse predicateIRI, when confidently
    /// assigned.
    pub inverse_map: HashMap<String, String>,
}

#[derive(Debug, Default)]
pub struct OntologyProcessor {
    class_subjects: HashMap<String, HashSet<String>>,
    subject_classes: HashMap<String, HashSet<String>>,
    class_predicates: HashMap<String, HashMap<String, HashSet<String>>>,
    predicate_counts: HashMap<String, u64>,
    predicate_object_types: HashMap<String, HashMap<String, u64>>,
    /// `(subjectClass, predicate, objectClass)` → observation count.
    predicate_directions: HashMap<(String, String, String), u64>,
}

impl OntologyProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one quad into the running state (spec §4.3 `process(quad)`).
    pub fn process(&mut self, quad: &Quad) {
        let pred = quad.predicate.value.clone();
        *self.predicate_counts.entry(pred.clone()).or_insert(0) += 1;

        if quad.predicate.value == RDF_TYPE {
            let subject = quad.subject.value.clone();
            let class = quad.object.value.clone();
            self.class_subjects
                .entry(class.clone())
                .or_default()
                .insert(subject.clone());
            self.subject_classes
                .entry(subject)
                .or_default()
                .insert(class);
            return;
        }

        let Some(classes) = self.subject_classes.get(&quad.subject.value).cloned() else {
            return;
        };

        for class in &classes {
            self.class_predicates
                .entry(class.clone())
                .or_default()
                .entry(pred.clone())
                .or_default()
                .insert(quad.subject.value.clone());
        }

        if quad.object.term_type != TermType::NamedNode {
            return;
        }
        let Some(object_classes) = self.subject_classes.get(&quad.object.value).cloned() else {
            return;
        };

        for object_class in &object_classes {
            *self
                .predicate_object_types
                .entry(pred.clone())
                .or_default()
                .entry(object_class.clone())
                .or_insert(0) += 1;

            for class in &classes {
                let key = (class.clone(), pred.clone(), object_class.clone());
                *self.predicate_directions.entry(key).or_insert(0) += 1;
            }
        }
    }

    /// Instance-count snapshot, for callers that only need ordering (the
    /// ShaclSerializer).
    pub fn class_instance_counts(&self) -> HashMap<String, u64> {
        self.class_subjects
            .iter()
            .map(|(class, subjects)| (class.clone(), subjects.len() as u64))
            .collect()
    }

    /// Materialize the accumulated state plus the inferred inverse map
    /// (spec §4.3 `getData()`).
    pub fn get_data(&self) -> OntologyData {
        let mut directions: Vec<_> = self.predicate_directions.iter().collect();
        directions.sort_by(|a, b| a.0.cmp(b.0));

        let mut inverse_map: HashMap<String, String> = HashMap::new();

        for ((subj_class, pred, obj_class), &f) in &directions {
            if f == 0 {
                continue;
            }
            if ONE_WAY_LOCAL_NAMES.contains(&local_name(pred)) {
                continue;
            }
            if inverse_map.contains_key(pred) {
                continue;
            }

            // Note: when `subj_class == obj_class` the reverse bucket
            // `B|q|A` coincides with the forward bucket `A|p|B` whenever
            // `q == p` — the model can't distinguish forward from backward
            // traffic once both ends share a class. The self-match this
            // produces (r == f, ratio 1) is accepted deliberately: it's how
            // symmetric same-class predicates (e.g. `knows`) end up with
            // themselves as their own inverse. Predicates that are
            // reflexive-class but NOT actually symmetric (`citation`,
            // `mentions`, …) rely on the one-way set above instead.
            let mut best: Option<(&String, u64)> = None;
            for ((rs, rp, ro), &r) in &directions {
                if rs != obj_class || ro != subj_class {
                    continue;
                }
                let ratio = r as f64 / f as f64;
                if !(0.8..=1.25).contains(&ratio) {
                    continue;
                }
                if best.map(|(_, br)| r > br).unwrap_or(true) {
                    best = Some((rp, r));
                }
            }

            let Some((candidate, _)) = best else {
                continue;
            };

            let conflicts = inverse_map
                .get(pred)
                .is_some_and(|v| v != candidate)
                || inverse_map
                    .get(candidate)
                    .is_some_and(|v| v != pred);
            if conflicts {
                continue;
            }

            inverse_map.insert(pred.clone(), candidate.clone());
            inverse_map.insert(candidate.clone(), pred.clone());
        }

        OntologyData {
            class_instance_counts: self.class_instance_counts(),
            class_predicates: self.class_predicates.clone(),
            predicate_counts: self.predicate_counts.clone(),
            predicate_object_types: self.predicate_object_types.clone(),
            inverse_map,
        }
    }
}
