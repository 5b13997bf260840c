//! ShaclSerializer (spec §4.3): renders an `OntologyData` snapshot as a
//! Turtle SHACL shapes graph.

use crate::ontology::OntologyData;
use crate::prefixes::default_prefixes;

fn curie(iri: &str) -> String {
    for (prefix, base) in default_prefixes() {
        if let Some(local) = iri.strip_prefix(&base) {
            return format!("{prefix}:{local}");
        }
    }
    format!("<{iri}>")
}

fn local_name(iri: &str) -> &str {
    iri.rsplit(['#', '/']).next().unwrap_or(iri)
}

fn shape_name(class_iri: &str) -> String {
    format!("{}Shape", curie(class_iri))
}

pub struct ShaclSerializer;

impl ShaclSerializer {
    /// Classes in descending instance-count order (ties broken by IRI for
    /// determinism); for each, a NodeShape with its PropertyShapes ordered
    /// by descending distinct-subject count, ties broken by global
    /// predicate count (spec §4.3 Serialization).
    pub fn serialize(data: &OntologyData) -> String {
        let mut classes: Vec<&String> = data.class_instance_counts.keys().collect();
        classes.sort_by(|a, b| {
            let count_a = data.class_instance_counts[*a];
            let count_b = data.class_instance_counts[*b];
            count_b.cmp(&count_a).then_with(|| a.cmp(b))
        });

        let mut out = String::new();
        out.push_str("@prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .\n");
        out.push_str("@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n");
        out.push_str("@prefix sh: <http://www.w3.org/ns/shacl#> .\n");
        out.push_str("@prefix dct: <http://purl.org/dc/terms/> .\n");
        out.push_str("@prefix schema: <https://schema.org/> .\n");
        out.push_str("@prefix foaf: <http://xmlns.com/foaf/0.1/> .\n\n");

        for class_iri in classes {
            let instances = data.class_instance_counts[class_iri];
            let name = local_name(class_iri);
            out.push_str(&format!("{} a sh:NodeShape ;\n", shape_name(class_iri)));
            out.push_str(&format!("  sh:targetClass {} ;\n", curie(class_iri)));
            out.push_str("  dct:source \"agentrt ontology inference\" ;\n");
            out.push_str(&format!("  sh:name \"{name}\" ;\n"));
            out.push_str(&format!("  sh:comment \"Instances: {instances}\" ;\n"));
            out.push_str(&format!(
                "  dct:description \"Inferred NodeShape for {name}.\" ;\n"
            ));

            let empty = Default::default();
            let predicates = data.class_predicates.get(class_iri).unwrap_or(&empty);
            let mut preds: Vec<(&String, usize)> = predicates
                .iter()
                .map(|(p, subjects)| (p, subjects.len()))
                .collect();
            preds.sort_by(|(pa, ca), (pb, cb)| {
                cb.cmp(ca)
                    .then_with(|| {
                        let gca = data.predicate_counts.get(*pa).copied().unwrap_or(0);
                        let gcb = data.predicate_counts.get(*pb).copied().unwrap_or(0);
                        gcb.cmp(&gca)
                    })
                    .then_with(|| pa.cmp(pb))
            });

            for (pred, distinct_subjects) in preds {
                out.push_str("  sh:property [\n");
                out.push_str(&format!("    sh:path {} ;\n", curie(pred)));
                out.push_str(&format!("    sh:name \"{}\" ;\n", local_name(pred)));
                out.push_str(&format!(
                    "    sh:comment \"Instances: {distinct_subjects}\" ;\n"
                ));

                if let Some(object_types) = data.predicate_object_types.get(pred) {
                    let total: u64 = object_types.values().sum();
                    if let Some((dominant_class, count)) =
                        object_types.iter().max_by_key(|(_, &c)| c)
                    {
                        if total > 0 && (*count as f64 / total as f64) > 0.5 {
                            out.push_str(&format!("    sh:class {} ;\n", curie(dominant_class)));
                            out.push_str("    sh:nodeKind sh:IRI ;\n");
                            if let Some(inverse) = data.inverse_map.get(pred) {
                                out.push_str(&format!(
                                    "    sh:inversePath {} ;\n",
                                    curie(inverse)
                                ));
                            }
                        }
                    }
                }

                out.push_str("  ] ;\n");
            }

            // Trailing `;` from the last property becomes the closing `.`.
            if out.ends_with(" ;\n") {
                out.truncate(out.len() - 2);
                out.push_str(".\n\n");
            }
        }

        out
    }
}
