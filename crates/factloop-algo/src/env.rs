//! What an algorithm sees while binding and processing.

use factloop_core::{vocab::kd, local_name, Namespaces, Term};
use factloop_memory::{Memory, Resource};
use std::sync::Arc;

#[derive(Clone)]
pub struct ExecEnv {
    pub memory: Arc<Memory>,
    pub namespaces: Namespaces,
    /// Point clouds the graph currently knows about; the only owners searched
    /// when an address names a patch.
    pub owners: Vec<String>,
}

impl ExecEnv {
    pub fn new(memory: Arc<Memory>, namespaces: Namespaces) -> Self {
        Self {
            memory,
            namespaces,
            owners: Vec::new(),
        }
    }

    pub fn with_owners(mut self, owners: Vec<String>) -> Self {
        self.owners = owners;
        self
    }

    /// Resolve an address to a stored object, including patches nested in
    /// one of the known point clouds.
    pub fn resolve(&self, addr: &str) -> Option<Resource> {
        self.memory.access_among(addr, &self.owners)
    }

    /// IRI in the engine namespace.
    pub fn mint(&self, local: &str) -> Term {
        Term::iri(self.namespaces.term(local))
    }

    /// Legacy individuals that may no longer be passed by reference.
    pub fn is_deprecated(&self, iri: &str) -> bool {
        self.namespaces.owns(iri) && kd::DEPRECATED_SENTINELS.contains(&local_name(iri))
    }
}
