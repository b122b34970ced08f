//! Vocabulary and namespace handling.
//!
//! The engine prefixes every query it sends to the store with the same
//! prologue, so hand-authored queries may use `rdf:`, `rdfs:`, `owl:`, `xsd:`
//! and the configured engine prefix freely.

use serde::{Deserialize, Serialize};

pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const OWL: &str = "http://www.w3.org/2002/07/owl#";
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDFS_SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
pub const OWL_CLASS: &str = "http://www.w3.org/2002/07/owl#Class";

pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

/// Local names of the engine vocabulary, resolved against [`Namespaces::base`].
pub mod kd {
    pub const ALGORITHM: &str = "Algorithm";
    pub const OBJECT: &str = "Object";
    pub const HAS_VALUE: &str = "hasValue";
    pub const HAS_CHARA: &str = "hasChara";
    pub const HAS_INPUT: &str = "hasInput";
    pub const HAS_OUTPUT: &str = "hasOutput";
    pub const HAS_DATA_OUTPUT: &str = "hasDataOutput";
    pub const IS_RELEVANT_TO: &str = "isRelevantTo";
    pub const NOTHING: &str = "nothing";
    pub const FULL_POINT_CLOUD: &str = "FullPointCloud";
    pub const PATCH: &str = "Patch";
    pub const IS_AVAILABLE_ON: &str = "isAvailableOn";

    /// Legacy individuals that used to be passed as arguments by reference.
    pub const DEPRECATED_SENTINELS: [&str; 2] = ["wall", "floor"];
}

/// The engine namespace plus the fixed well-known prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Namespaces {
    /// Base IRI of the engine vocabulary, ending in `#` or `/`.
    pub base: String,
    /// Prefix bound to `base` in every prologue.
    pub prefix: String,
}

impl Default for Namespaces {
    fn default() -> Self {
        Self {
            base: "http://lab.ponciano.info/knowdip#".into(),
            prefix: "knowdip".into(),
        }
    }
}

impl Namespaces {
    pub fn new(base: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            prefix: prefix.into(),
        }
    }

    /// Full IRI of a term in the engine namespace.
    pub fn term(&self, local: &str) -> String {
        format!("{}{}", self.base, local)
    }

    /// `PREFIX` declarations prepended to every query and update.
    pub fn prologue(&self) -> String {
        format!(
            "PREFIX rdf: <{RDF}>\nPREFIX rdfs: <{RDFS}>\nPREFIX owl: <{OWL}>\nPREFIX xsd: <{XSD}>\nPREFIX {}: <{}>\n",
            self.prefix, self.base
        )
    }

    /// Prepend the prologue to a query text.
    pub fn prefixed(&self, query: &str) -> String {
        let mut s = self.prologue();
        s.push_str(query);
        s
    }

    /// Expand a prefixed name (`xsd:double`, `knowdip:Patch`) into a full IRI.
    pub fn expand(&self, prefixed: &str) -> Option<String> {
        let (prefix, local) = prefixed.split_once(':')?;
        if local.starts_with("//") {
            return None;
        }
        let ns = match prefix {
            "rdf" => RDF,
            "rdfs" => RDFS,
            "owl" => OWL,
            "xsd" => XSD,
            p if p == self.prefix => self.base.as_str(),
            _ => return None,
        };
        Some(format!("{ns}{local}"))
    }

    /// Whether an IRI lives in the engine namespace.
    pub fn owns(&self, iri: &str) -> bool {
        iri.starts_with(&self.base)
    }
}

/// Local part of an IRI: whatever follows the last `#`, or the last `/`
/// when there is no fragment.
pub fn local_name(iri: &str) -> &str {
    if let Some(idx) = iri.rfind('#') {
        return &iri[idx + 1..];
    }
    match iri.rfind('/') {
        Some(idx) => &iri[idx + 1..],
        None => iri,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_name_prefers_fragment() {
        assert_eq!(local_name("http://a.org/x#Patch"), "Patch");
        assert_eq!(local_name("http://a.org/x/Patch"), "Patch");
        assert_eq!(local_name("Patch"), "Patch");
    }

    #[test]
    fn expand_known_prefixes() {
        let ns = Namespaces::default();
        assert_eq!(ns.expand("xsd:double").as_deref(), Some(XSD_DOUBLE));
        assert_eq!(
            ns.expand("knowdip:Patch").as_deref(),
            Some("http://lab.ponciano.info/knowdip#Patch")
        );
        assert_eq!(ns.expand("foo:bar"), None);
        assert_eq!(ns.expand("http://x.org/a"), None);
    }

    #[test]
    fn prologue_binds_engine_prefix() {
        let ns = Namespaces::new("http://ex.org/e#", "ex");
        let p = ns.prologue();
        assert!(p.contains("PREFIX ex: <http://ex.org/e#>"));
        assert!(p.contains("PREFIX xsd:"));
    }
}
