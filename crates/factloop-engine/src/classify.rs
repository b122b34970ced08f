//! Classification: CONSTRUCT queries that type individuals by the
//! restrictions of the object classes.

use crate::ontology::Ontology;
use factloop_core::vocab::{self, XSD};
use factloop_core::{Restriction, Target, Term};

/// Materialises `rdf:type` along `rdfs:subClassOf`.
pub const ROOT_INFERENCE: &str =
    "CONSTRUCT { ?x rdf:type ?sup } WHERE { ?x rdf:type ?t . ?t rdfs:subClassOf ?sup . FILTER(isIRI(?sup)) }";

/// One classification query for a class, or None when its restrictions give
/// nothing to match on.
pub fn classification_query(class: &str, restrictions: &[Restriction]) -> Option<String> {
    let mut body = String::new();
    let mut v = 0;
    for r in restrictions {
        match &r.target {
            Target::Value(value) => {
                body.push_str(&format!("?ind <{}> {} . ", r.property, value.to_query_text()));
            }
            Target::Facet(f) => {
                v += 1;
                body.push_str(&format!(
                    "?ind <{}> ?v{v} . FILTER(?v{v} {} {}) . ",
                    r.property,
                    f.facet.operator(),
                    Term::from(f.bound.clone()).to_query_text()
                ));
            }
            Target::Type(ty) if ty.starts_with(XSD) => {
                v += 1;
                body.push_str(&format!(
                    "?ind <{}> ?v{v} . FILTER(datatype(?v{v}) = <{ty}>) . ",
                    r.property
                ));
            }
            Target::Type(ty) => {
                v += 1;
                body.push_str(&format!(
                    "?ind <{}> ?v{v} . ?v{v} <{}> <{ty}> . ",
                    r.property,
                    vocab::RDF_TYPE
                ));
            }
        }
    }
    if body.is_empty() {
        return None;
    }
    Some(format!(
        "CONSTRUCT {{ ?ind <{}> <{class}> }} WHERE {{ {body}}}",
        vocab::RDF_TYPE
    ))
}

/// `(class, query)` for every object class that can be classified.
pub fn classification_queries(onto: &Ontology) -> Vec<(String, String)> {
    onto.objects()
        .into_iter()
        .filter_map(|class| {
            let query = classification_query(&class, &onto.restrictions_of(&class))?;
            Some((class, query))
        })
        .collect()
}
