//! Graph terms and the declarative data model shared by compilers and interpreter.

use crate::vocab::{self, XSD};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Terms
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    pub lexical: String,
    /// Full datatype IRI. Language-tagged literals carry `rdf:langString`.
    pub datatype: String,
    pub language: Option<String>,
}

impl Literal {
    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: datatype.into(),
            language: None,
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::typed(s, vocab::XSD_STRING)
    }

    pub fn double(v: f64) -> Self {
        Self::typed(format_double(v), vocab::XSD_DOUBLE)
    }

    pub fn integer(v: i64) -> Self {
        Self::typed(v.to_string(), vocab::XSD_INTEGER)
    }

    pub fn boolean(v: bool) -> Self {
        Self::typed(v.to_string(), vocab::XSD_BOOLEAN)
    }

    pub fn lang(lexical: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: vocab::RDF_LANG_STRING.into(),
            language: Some(tag.into()),
        }
    }
}

fn format_double(v: f64) -> String {
    if v.is_finite() {
        format!("{v}")
    } else if v.is_nan() {
        "NaN".into()
    } else if v > 0.0 {
        "INF".into()
    } else {
        "-INF".into()
    }
}

/// A graph term as produced by the store or by an algorithm.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    Iri(String),
    Blank(String),
    Literal(Literal),
}

impl Term {
    pub fn iri(s: impl Into<String>) -> Self {
        Self::Iri(s.into())
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Iri(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// Canonical query text: `<iri>`, `"value"^^datatype`, `"value"@lang`, `_:id`.
    pub fn to_query_text(&self) -> String {
        match self {
            Self::Iri(iri) => format!("<{iri}>"),
            Self::Blank(id) => format!("_:{id}"),
            Self::Literal(lit) => {
                let lexical = escape_lexical(&lit.lexical);
                if let Some(tag) = &lit.language {
                    format!("\"{lexical}\"@{tag}")
                } else if let Some(local) = lit.datatype.strip_prefix(XSD) {
                    format!("\"{lexical}\"^^xsd:{local}")
                } else {
                    format!("\"{lexical}\"^^<{}>", lit.datatype)
                }
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "{iri}"),
            Self::Blank(id) => write!(f, "_:{id}"),
            Self::Literal(lit) => write!(f, "{}", lit.lexical),
        }
    }
}

impl From<Literal> for Term {
    fn from(l: Literal) -> Self {
        Self::Literal(l)
    }
}

fn escape_lexical(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
        }
    }

    pub fn to_query_text(&self) -> String {
        format!(
            "{} <{}> {} .",
            self.subject.to_query_text(),
            self.predicate,
            self.object.to_query_text()
        )
    }
}

/// One result row of a select query: variable name (without `?`) to term.
pub type Binding = BTreeMap<String, Term>;

/// One token of an algorithm invocation's argument list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgToken {
    Iri(String),
    Literal {
        lexical: String,
        datatype: Option<String>,
    },
}

impl ArgToken {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Literal {
            lexical: s.into(),
            datatype: None,
        }
    }

    /// Text the binder accumulates for this token. Typed literals keep their
    /// `^^datatype` suffix so the binder can coerce them.
    pub fn fragment(&self) -> String {
        match self {
            Self::Iri(iri) => iri.clone(),
            Self::Literal {
                lexical,
                datatype: Some(dt),
            } => format!("{lexical}^^{dt}"),
            Self::Literal {
                lexical,
                datatype: None,
            } => lexical.clone(),
        }
    }
}

impl From<&Term> for ArgToken {
    fn from(t: &Term) -> Self {
        match t {
            Term::Iri(iri) => Self::Iri(iri.clone()),
            Term::Blank(id) => Self::text(format!("_:{id}")),
            Term::Literal(l) if l.language.is_some() => Self::text(l.lexical.clone()),
            Term::Literal(l) => Self::Literal {
                lexical: l.lexical.clone(),
                datatype: Some(l.datatype.clone()),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Restrictions and descriptors
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RestrictionKind {
    AllValuesFrom,
    SomeValuesFrom,
    HasValue,
}

/// Comparison facet of an OWL datatype restriction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facet {
    MinInclusive,
    MinExclusive,
    MaxInclusive,
    MaxExclusive,
}

impl Facet {
    pub fn from_iri(iri: &str) -> Option<Self> {
        match iri.strip_prefix(XSD)? {
            "minInclusive" => Some(Self::MinInclusive),
            "minExclusive" => Some(Self::MinExclusive),
            "maxInclusive" => Some(Self::MaxInclusive),
            "maxExclusive" => Some(Self::MaxExclusive),
            _ => None,
        }
    }

    pub fn operator(&self) -> &'static str {
        match self {
            Self::MinInclusive => ">=",
            Self::MinExclusive => ">",
            Self::MaxInclusive => "<=",
            Self::MaxExclusive => "<",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatatypeFacet {
    pub facet: Facet,
    pub bound: Literal,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    /// A class or datatype the values must belong to.
    Type(String),
    /// A concrete value (has-value restriction).
    Value(Term),
    /// A facet-constrained datatype, e.g. `xsd:double[>= 0.8]`.
    Facet(DatatypeFacet),
}

/// `(subjectType, property, kind, target)` as harvested from a class's
/// declared and inherited constraints.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Restriction {
    pub subject_type: String,
    pub property: String,
    pub kind: RestrictionKind,
    pub target: Target,
}

impl Restriction {
    pub fn some(subject_type: &str, property: &str, ty: &str) -> Self {
        Self {
            subject_type: subject_type.into(),
            property: property.into(),
            kind: RestrictionKind::SomeValuesFrom,
            target: Target::Type(ty.into()),
        }
    }

    pub fn only(subject_type: &str, property: &str, ty: &str) -> Self {
        Self {
            kind: RestrictionKind::AllValuesFrom,
            ..Self::some(subject_type, property, ty)
        }
    }

    pub fn value(subject_type: &str, property: &str, value: Term) -> Self {
        Self {
            subject_type: subject_type.into(),
            property: property.into(),
            kind: RestrictionKind::HasValue,
            target: Target::Value(value),
        }
    }

    /// The type named by the target, if it names one.
    pub fn target_type(&self) -> Option<&str> {
        match &self.target {
            Target::Type(t) => Some(t),
            _ => None,
        }
    }

    pub fn property_name(&self) -> &str {
        vocab::local_name(&self.property)
    }
}

/// An algorithm class classified by restriction category. Built once per
/// registered algorithm and read-only afterwards.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmDescriptor {
    pub iri: String,
    pub inputs: Vec<Restriction>,
    pub outputs: Vec<Restriction>,
    pub data_outputs: Vec<Restriction>,
    /// Also called characteristics.
    pub parameters: Vec<Restriction>,
    pub relevant_to: Vec<Restriction>,
}

impl AlgorithmDescriptor {
    pub fn new(iri: impl Into<String>) -> Self {
        Self {
            iri: iri.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        vocab::local_name(&self.iri)
    }

    /// Algorithms with neither inputs nor parameters have nothing to select on.
    pub fn is_abstract(&self) -> bool {
        self.inputs.is_empty() && self.parameters.is_empty()
    }
}
