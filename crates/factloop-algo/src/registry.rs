//! Algorithm registry
//!
//! Maps an algorithm IRI (engine namespace + local name) to a factory that
//! builds, binds and runs a fresh instance per invocation.

use crate::bind::bind_arguments;
use crate::contract::{Algorithm, ParamTable};
use crate::env::ExecEnv;
use factloop_core::{ArgToken, BindingError, Namespaces, RegistryError, Term};
use std::collections::HashMap;
use std::sync::Arc;

/// Object-safe face of a registered algorithm.
pub trait Component: Send + Sync {
    fn name(&self) -> &str;

    /// Bindable parameter names.
    fn parameters(&self) -> Vec<&'static str>;

    /// Bind `args` into a fresh instance and run it.
    fn invoke(&self, args: &[ArgToken], env: &ExecEnv) -> Result<Vec<Term>, BindingError>;
}

struct Factory<A> {
    make: Box<dyn Fn() -> A + Send + Sync>,
    table: ParamTable<A>,
}

impl<A: Algorithm> Component for Factory<A> {
    fn name(&self) -> &str {
        A::NAME
    }

    fn parameters(&self) -> Vec<&'static str> {
        self.table.names()
    }

    fn invoke(&self, args: &[ArgToken], env: &ExecEnv) -> Result<Vec<Term>, BindingError> {
        let mut instance = (self.make)();
        bind_arguments(&mut instance, &self.table, A::NAME, args, env)?;
        instance.process(env)
    }
}

pub struct AlgorithmRegistry {
    namespaces: Namespaces,
    algorithms: HashMap<String, Arc<dyn Component>>,
}

impl AlgorithmRegistry {
    pub fn new(namespaces: Namespaces) -> Self {
        Self {
            namespaces,
            algorithms: HashMap::new(),
        }
    }

    pub fn iri_of<A: Algorithm>(&self) -> String {
        self.namespaces.term(A::NAME)
    }

    /// Register `A` built from `Default`. Replaces any algorithm with the same IRI.
    pub fn add<A: Algorithm + Default>(&mut self) -> String {
        self.add_with(A::default)
    }

    /// Register `A` with a custom constructor, e.g. one sharing a counter.
    pub fn add_with<A: Algorithm>(&mut self, make: impl Fn() -> A + Send + Sync + 'static) -> String {
        let iri = self.iri_of::<A>();
        let factory = Factory {
            make: Box::new(make),
            table: A::parameters(),
        };
        tracing::debug!(algorithm = %iri, "registered");
        self.algorithms.insert(iri.clone(), Arc::new(factory));
        iri
    }

    pub fn unregister(&mut self, iri: &str) -> Result<(), RegistryError> {
        self.algorithms
            .remove(iri)
            .map(|_| ())
            .ok_or_else(|| RegistryError::NotAnAlgorithm(iri.to_string()))
    }

    pub fn get(&self, iri: &str) -> Option<Arc<dyn Component>> {
        self.algorithms.get(iri).cloned()
    }

    pub fn contains(&self, iri: &str) -> bool {
        self.algorithms.contains_key(iri)
    }

    /// Registered IRIs, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.algorithms.keys().map(|s| s.as_str()).collect();
        out.sort_unstable();
        out
    }

    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    pub fn invoke(
        &self,
        iri: &str,
        args: &[ArgToken],
        env: &ExecEnv,
    ) -> Result<Vec<Term>, BindingError> {
        let component = self
            .get(iri)
            .ok_or_else(|| BindingError::UnknownAlgorithm(iri.to_string()))?;
        component.invoke(args, env)
    }
}
