//! Graph store seam and its oxigraph implementation.
//!
//! Callers pass complete query texts (prologue included); the store does no
//! rewriting of its own.

use factloop_core::{Binding, Literal, StoreError, Term, Triple};
use oxigraph::io::GraphFormat;
use oxigraph::model::{
    BlankNode, GraphNameRef, Literal as OxLiteral, NamedNode, Quad, Subject, Term as OxTerm,
};
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;

pub trait GraphStore: Send + Sync {
    /// Run a SELECT query; one binding per solution row.
    fn select(&self, query: &str) -> Result<Vec<Binding>, StoreError>;

    /// Run a CONSTRUCT query; the candidate triples, not yet added.
    fn construct(&self, query: &str) -> Result<Vec<Triple>, StoreError>;

    /// Apply a SPARQL update.
    fn update(&self, update: &str) -> Result<(), StoreError>;

    /// Apply several updates as one request.
    fn update_batch(&self, updates: &[String]) -> Result<(), StoreError> {
        if updates.is_empty() {
            return Ok(());
        }
        self.update(&updates.join(" ;\n"))
    }

    /// Insert one triple; false when it was already present.
    fn insert(&self, triple: &Triple) -> Result<bool, StoreError>;

    fn contains(&self, triple: &Triple) -> Result<bool, StoreError>;

    fn len(&self) -> Result<usize, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn load_turtle(&self, data: &[u8]) -> Result<(), StoreError>;

    fn dump_turtle(&self) -> Result<Vec<u8>, StoreError>;
}

/// In-memory oxigraph store, default graph only.
pub struct OxigraphStore {
    store: Store,
}

impl OxigraphStore {
    pub fn new() -> Result<Self, StoreError> {
        let store = Store::new().map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(Self { store })
    }
}

impl GraphStore for OxigraphStore {
    fn select(&self, query: &str) -> Result<Vec<Binding>, StoreError> {
        let results = self
            .store
            .query(query)
            .map_err(|e| StoreError::Query(e.to_string()))?;
        match results {
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| StoreError::Query(e.to_string()))?;
                    let mut row = Binding::new();
                    for (var, term) in solution.iter() {
                        row.insert(var.as_str().to_string(), from_ox_term(term)?);
                    }
                    rows.push(row);
                }
                Ok(rows)
            }
            QueryResults::Boolean(_) | QueryResults::Graph(_) => Err(StoreError::Query(
                "expected a SELECT query".to_string(),
            )),
        }
    }

    fn construct(&self, query: &str) -> Result<Vec<Triple>, StoreError> {
        let results = self
            .store
            .query(query)
            .map_err(|e| StoreError::Query(e.to_string()))?;
        match results {
            QueryResults::Graph(triples) => {
                let mut out = Vec::new();
                for triple in triples {
                    let triple = triple.map_err(|e| StoreError::Query(e.to_string()))?;
                    let subject = match &triple.subject {
                        Subject::NamedNode(n) => Term::Iri(n.as_str().to_string()),
                        Subject::BlankNode(b) => Term::Blank(b.as_str().to_string()),
                        #[allow(unreachable_patterns)]
                        other => return Err(StoreError::Term(format!("unsupported subject {other}"))),
                    };
                    out.push(Triple::new(
                        subject,
                        triple.predicate.as_str(),
                        from_ox_term(&triple.object)?,
                    ));
                }
                Ok(out)
            }
            QueryResults::Boolean(_) | QueryResults::Solutions(_) => Err(StoreError::Query(
                "expected a CONSTRUCT query".to_string(),
            )),
        }
    }

    fn update(&self, update: &str) -> Result<(), StoreError> {
        self.store
            .update(update)
            .map_err(|e| StoreError::Update(e.to_string()))
    }

    fn insert(&self, triple: &Triple) -> Result<bool, StoreError> {
        let quad = to_quad(triple)?;
        self.store
            .insert(&quad)
            .map_err(|e| StoreError::Storage(e.to_string()))
    }

    fn contains(&self, triple: &Triple) -> Result<bool, StoreError> {
        let quad = to_quad(triple)?;
        self.store
            .contains(&quad)
            .map_err(|e| StoreError::Storage(e.to_string()))
    }

    fn len(&self) -> Result<usize, StoreError> {
        self.store
            .len()
            .map_err(|e| StoreError::Storage(e.to_string()))
    }

    fn load_turtle(&self, data: &[u8]) -> Result<(), StoreError> {
        self.store
            .load_graph(data, GraphFormat::Turtle, GraphNameRef::DefaultGraph, None)
            .map_err(|e| StoreError::Io(e.to_string()))
    }

    fn dump_turtle(&self) -> Result<Vec<u8>, StoreError> {
        let mut buffer = Vec::new();
        self.store
            .dump_graph(&mut buffer, GraphFormat::Turtle, GraphNameRef::DefaultGraph)
            .map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(buffer)
    }
}

fn from_ox_term(term: &OxTerm) -> Result<Term, StoreError> {
    match term {
        OxTerm::NamedNode(n) => Ok(Term::Iri(n.as_str().to_string())),
        OxTerm::BlankNode(b) => Ok(Term::Blank(b.as_str().to_string())),
        OxTerm::Literal(l) => Ok(Term::Literal(Literal {
            lexical: l.value().to_string(),
            datatype: l.datatype().as_str().to_string(),
            language: l.language().map(str::to_string),
        })),
        #[allow(unreachable_patterns)]
        other => Err(StoreError::Term(format!("unsupported term {other}"))),
    }
}

fn named(iri: &str) -> Result<NamedNode, StoreError> {
    NamedNode::new(iri).map_err(|e| StoreError::Term(format!("{iri}: {e}")))
}

fn to_ox_term(term: &Term) -> Result<OxTerm, StoreError> {
    Ok(match term {
        Term::Iri(iri) => named(iri)?.into(),
        Term::Blank(id) => BlankNode::new(id.as_str())
            .map_err(|e| StoreError::Term(format!("_:{id}: {e}")))?
            .into(),
        Term::Literal(lit) => match &lit.language {
            Some(lang) => OxLiteral::new_language_tagged_literal(lit.lexical.as_str(), lang.as_str())
                .map_err(|e| StoreError::Term(e.to_string()))?
                .into(),
            None => OxLiteral::new_typed_literal(lit.lexical.as_str(), named(&lit.datatype)?).into(),
        },
    })
}

fn to_quad(triple: &Triple) -> Result<Quad, StoreError> {
    let subject: Subject = match &triple.subject {
        Term::Iri(iri) => named(iri)?.into(),
        Term::Blank(id) => BlankNode::new(id.as_str())
            .map_err(|e| StoreError::Term(format!("_:{id}: {e}")))?
            .into(),
        Term::Literal(l) => {
            return Err(StoreError::Term(format!(
                "literal '{}' cannot be a subject",
                l.lexical
            )))
        }
    };
    Ok(Quad::new(
        subject,
        named(&triple.predicate)?,
        to_ox_term(&triple.object)?,
        oxigraph::model::GraphName::DefaultGraph,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use factloop_core::vocab;

    fn t(s: &str, p: &str, o: Term) -> Triple {
        Triple::new(Term::iri(s), p, o)
    }

    #[test]
    fn insert_contains_len() {
        let store = OxigraphStore::new().unwrap();
        let triple = t("http://x.org/a", vocab::RDF_TYPE, Term::iri("http://x.org/C"));
        assert!(store.insert(&triple).unwrap());
        assert!(!store.insert(&triple).unwrap());
        assert!(store.contains(&triple).unwrap());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn select_converts_literals() {
        let store = OxigraphStore::new().unwrap();
        store
            .insert(&t("http://x.org/a", "http://x.org/size", Literal::integer(3).into()))
            .unwrap();
        let rows = store
            .select("SELECT ?s ?v WHERE { ?s <http://x.org/size> ?v }")
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["s"], Term::iri("http://x.org/a"));
        assert_eq!(rows[0]["v"], Term::from(Literal::integer(3)));
    }

    #[test]
    fn select_rejects_ask() {
        let store = OxigraphStore::new().unwrap();
        assert!(store.select("ASK { ?s ?p ?o }").is_err());
    }

    #[test]
    fn turtle_round_trip() {
        let store = OxigraphStore::new().unwrap();
        store
            .load_turtle(b"<http://x.org/a> <http://x.org/p> \"v\" .\n")
            .unwrap();
        let dump = store.dump_turtle().unwrap();
        let other = OxigraphStore::new().unwrap();
        other.load_turtle(&dump).unwrap();
        assert_eq!(other.len().unwrap(), 1);
    }

    #[test]
    fn malformed_update_is_error() {
        let store = OxigraphStore::new().unwrap();
        let err = store.update("INSERT DATA { <http://x.org/a> ").unwrap_err();
        assert!(matches!(err, StoreError::Update(_)));
    }
}
