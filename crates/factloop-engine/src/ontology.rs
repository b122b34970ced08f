//! Class hierarchy, restrictions and property annotations read from the graph.
//!
//! Harvested once per saturation; the compilers only ever look at this
//! snapshot, never at the live store.

use crate::store::GraphStore;
use factloop_core::vocab::kd;
use factloop_core::{
    AlgorithmDescriptor, Binding, DatatypeFacet, Facet, Namespaces, Restriction, RestrictionKind,
    StoreError, Target, Term,
};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use tracing::debug;

const RESTRICTIONS: &str = r#"SELECT ?cls ?prop ?some ?all ?val ?facet ?bound WHERE {
  ?cls rdfs:subClassOf ?r .
  ?r owl:onProperty ?prop .
  FILTER(isIRI(?cls) && isIRI(?prop))
  OPTIONAL { ?r owl:someValuesFrom ?some }
  OPTIONAL { ?r owl:allValuesFrom ?all }
  OPTIONAL { ?r owl:hasValue ?val }
  OPTIONAL {
    ?r owl:someValuesFrom|owl:allValuesFrom ?dt .
    ?dt owl:withRestrictions ?list .
    ?list rdf:rest*/rdf:first ?f .
    ?f ?facet ?bound .
    FILTER(isLiteral(?bound))
  }
}"#;

const SUBCLASSES: &str =
    "SELECT ?sub ?sup WHERE { ?sub rdfs:subClassOf ?sup . FILTER(isIRI(?sub) && isIRI(?sup)) }";

const SUBPROPERTIES: &str =
    "SELECT ?sub ?sup WHERE { ?sub rdfs:subPropertyOf ?sup . FILTER(isIRI(?sub) && isIRI(?sup)) }";

const SEE_ALSO: &str = "SELECT ?p ?alias WHERE { ?p rdfs:seeAlso ?alias . FILTER(isIRI(?p) && isIRI(?alias)) }";

const DATATYPE_PROPERTIES: &str = "SELECT ?p WHERE { ?p rdf:type owl:DatatypeProperty }";

#[derive(Clone, Debug)]
pub struct Ontology {
    namespaces: Namespaces,
    /// Restrictions declared directly on each class.
    declared: HashMap<String, Vec<Restriction>>,
    /// Direct superclasses.
    parents: HashMap<String, BTreeSet<String>>,
    /// Direct superproperties.
    super_properties: HashMap<String, BTreeSet<String>>,
    see_also: HashMap<String, Vec<String>>,
    datatype_properties: HashSet<String>,
}

fn iri_of<'a>(row: &'a Binding, var: &str) -> Option<&'a str> {
    row.get(var).and_then(Term::as_iri)
}

impl Ontology {
    pub fn new(namespaces: Namespaces) -> Self {
        Self {
            namespaces,
            declared: HashMap::new(),
            parents: HashMap::new(),
            super_properties: HashMap::new(),
            see_also: HashMap::new(),
            datatype_properties: HashSet::new(),
        }
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    /// Read the whole ontology out of a store.
    pub fn harvest(store: &dyn GraphStore, namespaces: &Namespaces) -> Result<Self, StoreError> {
        let mut onto = Self::new(namespaces.clone());
        let select = |q: &str| store.select(&namespaces.prefixed(q));

        for row in select(SUBCLASSES)? {
            if let (Some(sub), Some(sup)) = (iri_of(&row, "sub"), iri_of(&row, "sup")) {
                onto.add_subclass(sub, sup);
            }
        }
        for row in select(SUBPROPERTIES)? {
            if let (Some(sub), Some(sup)) = (iri_of(&row, "sub"), iri_of(&row, "sup")) {
                onto.add_subproperty(sub, sup);
            }
        }
        for row in select(SEE_ALSO)? {
            if let (Some(p), Some(alias)) = (iri_of(&row, "p"), iri_of(&row, "alias")) {
                onto.add_see_also(p, alias);
            }
        }
        for row in select(DATATYPE_PROPERTIES)? {
            if let Some(p) = iri_of(&row, "p") {
                onto.add_datatype_property(p);
            }
        }
        for row in select(RESTRICTIONS)? {
            match restriction_from_row(&row) {
                Some(r) => {
                    onto.add_restriction(r);
                }
                None => debug!(?row, "restriction with no usable target skipped"),
            }
        }
        debug!(
            classes = onto.parents.len(),
            restricted = onto.declared.len(),
            "ontology harvested"
        );
        Ok(onto)
    }

    // --- Builders ---

    pub fn add_subclass(&mut self, sub: &str, sup: &str) -> &mut Self {
        if sub != sup {
            self.parents.entry(sub.into()).or_default().insert(sup.into());
        }
        self
    }

    pub fn add_subproperty(&mut self, sub: &str, sup: &str) -> &mut Self {
        if sub != sup {
            self.super_properties.entry(sub.into()).or_default().insert(sup.into());
        }
        self
    }

    pub fn add_see_also(&mut self, property: &str, alias: &str) -> &mut Self {
        let aliases = self.see_also.entry(property.into()).or_default();
        if !aliases.iter().any(|a| a == alias) {
            aliases.push(alias.into());
        }
        self
    }

    pub fn add_datatype_property(&mut self, property: &str) -> &mut Self {
        self.datatype_properties.insert(property.into());
        self
    }

    pub fn add_restriction(&mut self, restriction: Restriction) -> &mut Self {
        let list = self.declared.entry(restriction.subject_type.clone()).or_default();
        if !list.contains(&restriction) {
            list.push(restriction);
        }
        self
    }

    // --- Hierarchy ---

    fn closure(edges: &HashMap<String, BTreeSet<String>>, start: &str) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        let mut queue: VecDeque<&str> = VecDeque::from([start]);
        seen.insert(start);
        while let Some(node) = queue.pop_front() {
            for next in edges.get(node).into_iter().flatten() {
                if seen.insert(next) {
                    out.push(next.clone());
                    queue.push_back(next);
                }
            }
        }
        out
    }

    /// Every superclass, nearest first, the class itself excluded.
    pub fn ancestors(&self, class: &str) -> Vec<String> {
        Self::closure(&self.parents, class)
    }

    /// Reflexive and transitive.
    pub fn is_subclass_of(&self, sub: &str, sup: &str) -> bool {
        sub == sup || self.ancestors(sub).iter().any(|a| a == sup)
    }

    /// Every class below `sup`, sorted.
    pub fn subclasses(&self, sup: &str) -> Vec<String> {
        let mut out: Vec<String> = self
            .parents
            .keys()
            .filter(|c| c.as_str() != sup && self.is_subclass_of(c, sup))
            .cloned()
            .collect();
        out.sort();
        out
    }

    /// Reflexive and transitive.
    pub fn is_subproperty_of(&self, sub: &str, sup: &str) -> bool {
        sub == sup || Self::closure(&self.super_properties, sub).iter().any(|p| p == sup)
    }

    pub fn see_also(&self, property: &str) -> &[String] {
        self.see_also.get(property).map_or(&[], Vec::as_slice)
    }

    pub fn is_datatype_property(&self, property: &str) -> bool {
        self.datatype_properties.contains(property)
    }

    // --- Restrictions ---

    /// Declared and inherited restrictions of a class.
    pub fn restrictions_of(&self, class: &str) -> Vec<Restriction> {
        let mut out: Vec<Restriction> = Vec::new();
        let own = std::iter::once(class.to_string());
        for c in own.chain(self.ancestors(class)) {
            for r in self.declared.get(&c).into_iter().flatten() {
                if !out.contains(r) {
                    out.push(r.clone());
                }
            }
        }
        out
    }

    /// Restrictions whose property is the engine property `local` or below it.
    pub fn category(&self, restrictions: &[Restriction], local: &str) -> Vec<Restriction> {
        let category = self.namespaces.term(local);
        restrictions
            .iter()
            .filter(|r| self.is_subproperty_of(&r.property, &category))
            .cloned()
            .collect()
    }

    pub fn descriptor(&self, algorithm: &str) -> AlgorithmDescriptor {
        let all = self.restrictions_of(algorithm);
        AlgorithmDescriptor {
            iri: algorithm.to_string(),
            inputs: self.category(&all, kd::HAS_INPUT),
            outputs: self.category(&all, kd::HAS_OUTPUT),
            data_outputs: self.category(&all, kd::HAS_DATA_OUTPUT),
            parameters: self.category(&all, kd::HAS_CHARA),
            relevant_to: self.category(&all, kd::IS_RELEVANT_TO),
        }
    }

    /// Algorithm classes.
    pub fn algorithms(&self) -> Vec<String> {
        self.subclasses(&self.namespaces.term(kd::ALGORITHM))
    }

    /// Object classes, the candidates for classification.
    pub fn objects(&self) -> Vec<String> {
        self.subclasses(&self.namespaces.term(kd::OBJECT))
    }
}

fn restriction_from_row(row: &Binding) -> Option<Restriction> {
    let subject_type = iri_of(row, "cls")?.to_string();
    let property = iri_of(row, "prop")?.to_string();
    let kind_of_type = if row.contains_key("some") {
        RestrictionKind::SomeValuesFrom
    } else {
        RestrictionKind::AllValuesFrom
    };

    let facet = iri_of(row, "facet")
        .and_then(Facet::from_iri)
        .zip(row.get("bound").and_then(Term::as_literal));
    let (kind, target) = if let Some((facet, bound)) = facet {
        (
            kind_of_type,
            Target::Facet(DatatypeFacet {
                facet,
                bound: bound.clone(),
            }),
        )
    } else if let Some(value) = row.get("val") {
        (RestrictionKind::HasValue, Target::Value(value.clone()))
    } else if let Some(ty) = iri_of(row, "some") {
        (RestrictionKind::SomeValuesFrom, Target::Type(ty.to_string()))
    } else {
        let ty = iri_of(row, "all")?;
        (RestrictionKind::AllValuesFrom, Target::Type(ty.to_string()))
    };
    Some(Restriction {
        subject_type,
        property,
        kind,
        target,
    })
}
