//! The Algorithm trait and its explicit parameter table.
//!
//! An algorithm is a plain struct. Its bindable fields are listed once in a
//! [`ParamTable`]: parameter name to a typed setter. The binder looks a key up
//! in that table and hands the setter an [`ArgValue`]; there is no reflection.

use crate::env::ExecEnv;
use factloop_core::{BindingError, Term};
use factloop_memory::{Patch, PointCloud, Resource};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A value produced by argument binding, before it lands in a field.
#[derive(Clone, Debug)]
pub enum ArgValue {
    /// An object resolved through Resource Memory.
    Resolved { address: String, resource: Resource },
    Double(f64),
    Float(f32),
    Int(i64),
    Str(String),
    Bool(bool),
    /// Typed literal with an unrecognised datatype; the full `value^^type` text.
    Raw(String),
    /// Typed literal with an empty lexical form.
    Null,
}

impl ArgValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Resolved { .. } => "object",
            Self::Double(_) => "double",
            Self::Float(_) => "float",
            Self::Int(_) => "int",
            Self::Str(_) => "string",
            Self::Bool(_) => "boolean",
            Self::Raw(_) => "raw",
            Self::Null => "null",
        }
    }

    fn wrong(name: &str, expected: &'static str) -> BindingError {
        BindingError::WrongType {
            name: name.to_string(),
            expected,
        }
    }

    /// Numeric view. Raw literals are accepted when their lexical part parses.
    pub fn into_double(self, name: &str) -> Result<f64, BindingError> {
        match self {
            Self::Double(v) => Ok(v),
            Self::Float(v) => Ok(v as f64),
            Self::Int(v) => Ok(v as f64),
            Self::Raw(s) => lexical_of(&s)
                .parse()
                .map_err(|_| Self::wrong(name, "a number")),
            _ => Err(Self::wrong(name, "a number")),
        }
    }

    pub fn into_int(self, name: &str) -> Result<i64, BindingError> {
        match self {
            Self::Int(v) => Ok(v),
            Self::Raw(s) => lexical_of(&s)
                .parse()
                .map_err(|_| Self::wrong(name, "an integer")),
            _ => Err(Self::wrong(name, "an integer")),
        }
    }

    pub fn into_bool(self, name: &str) -> Result<bool, BindingError> {
        match self {
            Self::Bool(v) => Ok(v),
            _ => Err(Self::wrong(name, "a boolean")),
        }
    }

    pub fn into_string(self, name: &str) -> Result<String, BindingError> {
        match self {
            Self::Str(s) | Self::Raw(s) => Ok(s),
            Self::Resolved { address, .. } => Ok(address),
            _ => Err(Self::wrong(name, "a string")),
        }
    }

    /// Object-valued argument: address plus stored resource.
    pub fn into_resolved(self, name: &str) -> Result<(String, Resource), BindingError> {
        match self {
            Self::Resolved { address, resource } => Ok((address, resource)),
            _ => Err(Self::wrong(name, "a memory object")),
        }
    }

    pub fn into_cloud(self, name: &str) -> Result<(String, Arc<PointCloud>), BindingError> {
        let (address, resource) = self.into_resolved(name)?;
        match resource {
            Resource::Cloud(c) => Ok((address, c)),
            Resource::Patch(_) => Err(Self::wrong(name, "a point cloud")),
        }
    }

    pub fn into_patch(self, name: &str) -> Result<Arc<Patch>, BindingError> {
        match self.into_resolved(name)?.1 {
            Resource::Patch(p) => Ok(p),
            Resource::Cloud(_) => Err(Self::wrong(name, "a patch")),
        }
    }
}

fn lexical_of(raw: &str) -> &str {
    raw.split_once("^^").map_or(raw, |(lex, _)| lex)
}

pub type Setter<A> = Box<dyn Fn(&mut A, ArgValue) -> Result<(), BindingError> + Send + Sync>;

struct Param<A> {
    /// Collection field: repeated keys append.
    many: bool,
    set: Setter<A>,
}

/// Parameter name to typed setter, built once when the algorithm is registered.
pub struct ParamTable<A> {
    params: BTreeMap<&'static str, Param<A>>,
}

impl<A> Default for ParamTable<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> ParamTable<A> {
    pub fn new() -> Self {
        Self {
            params: BTreeMap::new(),
        }
    }

    /// A scalar field. A repeated key overwrites.
    pub fn single(
        mut self,
        name: &'static str,
        set: impl Fn(&mut A, ArgValue) -> Result<(), BindingError> + Send + Sync + 'static,
    ) -> Self {
        self.params.insert(
            name,
            Param {
                many: false,
                set: Box::new(set),
            },
        );
        self
    }

    /// A collection field. The setter is expected to push.
    pub fn many(
        mut self,
        name: &'static str,
        set: impl Fn(&mut A, ArgValue) -> Result<(), BindingError> + Send + Sync + 'static,
    ) -> Self {
        self.params.insert(
            name,
            Param {
                many: true,
                set: Box::new(set),
            },
        );
        self
    }

    pub fn assign(
        &self,
        target: &mut A,
        algorithm: &str,
        name: &str,
        value: ArgValue,
    ) -> Result<(), BindingError> {
        let param = self
            .params
            .get(name)
            .ok_or_else(|| BindingError::UnknownParameter {
                algorithm: algorithm.to_string(),
                name: name.to_string(),
            })?;
        (param.set)(target, value)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.params.keys().copied().collect()
    }

    pub fn is_many(&self, name: &str) -> bool {
        self.params.get(name).is_some_and(|p| p.many)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// An executable component.
///
/// `process` runs at most once per bound instance: the registry builds a
/// fresh value for every invocation.
pub trait Algorithm: Send + 'static {
    /// Local name; the registry IRI is the engine namespace plus this.
    const NAME: &'static str;

    fn parameters() -> ParamTable<Self>
    where
        Self: Sized;

    fn process(&mut self, env: &ExecEnv) -> Result<Vec<Term>, BindingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Knobs {
        size: f64,
        tags: Vec<String>,
    }

    fn table() -> ParamTable<Knobs> {
        ParamTable::new()
            .single("size", |k: &mut Knobs, v: ArgValue| {
                k.size = v.into_double("size")?;
                Ok(())
            })
            .many("tag", |k: &mut Knobs, v: ArgValue| {
                k.tags.push(v.into_string("tag")?);
                Ok(())
            })
    }

    #[test]
    fn assign_dispatches_by_name() {
        let t = table();
        let mut k = Knobs::default();
        t.assign(&mut k, "Knobs", "size", ArgValue::Int(2)).unwrap();
        t.assign(&mut k, "Knobs", "tag", ArgValue::Str("a".into())).unwrap();
        t.assign(&mut k, "Knobs", "tag", ArgValue::Str("b".into())).unwrap();
        assert_eq!(k.size, 2.0);
        assert_eq!(k.tags, vec!["a", "b"]);
        assert!(t.is_many("tag"));
        assert!(!t.is_many("size"));
    }

    #[test]
    fn unknown_parameter_is_reported() {
        let err = table()
            .assign(&mut Knobs::default(), "Knobs", "colour", ArgValue::Null)
            .unwrap_err();
        assert_eq!(
            err,
            BindingError::UnknownParameter {
                algorithm: "Knobs".into(),
                name: "colour".into()
            }
        );
    }

    #[test]
    fn wrong_type_is_reported() {
        let err = ArgValue::Bool(true).into_double("size").unwrap_err();
        assert!(matches!(err, BindingError::WrongType { .. }));
    }

    #[test]
    fn raw_lexical_parses_as_number() {
        let v = ArgValue::Raw("2.5^^http://www.w3.org/2001/XMLSchema#decimal".into());
        assert_eq!(v.into_double("x").unwrap(), 2.5);
    }
}
