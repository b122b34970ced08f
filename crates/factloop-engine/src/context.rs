//! The engine context: graph store, resource memory, algorithm registry and
//! configuration, created once per process and passed everywhere.

use crate::lexer;
use crate::store::{GraphStore, OxigraphStore};
use factloop_algo::{create_default_registry, Algorithm, AlgorithmRegistry, ExecEnv};
use factloop_core::vocab::{self, kd};
use factloop_core::{Binding, EngineConfig, Error, Namespaces, RegistryError, Result, Term};
use factloop_memory::Memory;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

pub struct Engine {
    store: Box<dyn GraphStore>,
    memory: Arc<Memory>,
    registry: AlgorithmRegistry,
    config: EngineConfig,
    /// Held for a whole select/execute/insert cycle.
    run_lock: Mutex<()>,
}

impl Engine {
    /// Empty in-memory graph with the built-in algorithms registered.
    pub fn in_memory(config: EngineConfig) -> Result<Self> {
        let registry = create_default_registry(config.namespace.clone());
        Self::with_parts(Box::new(OxigraphStore::new()?), registry, config)
    }

    pub fn with_parts(
        store: Box<dyn GraphStore>,
        registry: AlgorithmRegistry,
        config: EngineConfig,
    ) -> Result<Self> {
        let engine = Self {
            store,
            memory: Arc::new(Memory::new()),
            registry,
            config,
            run_lock: Mutex::new(()),
        };
        let iris: Vec<String> = engine.registry.list().iter().map(|s| s.to_string()).collect();
        for iri in &iris {
            engine.declare_algorithm(iri)?;
        }
        Ok(engine)
    }

    /// Load the ontology, the saved graph and the memory directory named by
    /// the configuration, each only if present.
    pub fn open(config: EngineConfig) -> Result<Self> {
        let engine = Self::in_memory(config)?;
        if let Some(ontology) = &engine.config.paths.ontology {
            engine.load_turtle_file(ontology)?;
        }
        let graph = engine.config.graph_path();
        if graph.exists() {
            engine.load_turtle_file(&graph)?;
        }
        let memory_dir = engine.config.memory_dir();
        if memory_dir.is_dir() {
            engine.memory.read(&memory_dir, &engine.config.namespace.base)?;
        }
        info!(
            facts = engine.store.len()?,
            objects = engine.memory.len(),
            "engine opened"
        );
        Ok(engine)
    }

    /// Dump the graph and write every memory cell under the work dir.
    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config.paths.workdir)?;
        let graph = self.config.graph_path();
        std::fs::write(&graph, self.store.dump_turtle()?)?;
        let cells = self.memory.write(&self.config.memory_dir())?;
        info!(graph = %graph.display(), cells, "engine saved");
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.config.namespace
    }

    pub fn memory(&self) -> &Arc<Memory> {
        &self.memory
    }

    pub fn registry(&self) -> &AlgorithmRegistry {
        &self.registry
    }

    pub fn store(&self) -> &dyn GraphStore {
        self.store.as_ref()
    }

    pub(crate) fn lock_run(&self) -> MutexGuard<'_, ()> {
        self.run_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ============================================================
    // Graph access, prologue added
    // ============================================================

    pub fn load_turtle(&self, data: &[u8]) -> Result<()> {
        Ok(self.store.load_turtle(data)?)
    }

    pub fn load_turtle_file(&self, path: &Path) -> Result<()> {
        let data = std::fs::read(path)?;
        self.store.load_turtle(&data)?;
        debug!(path = %path.display(), "turtle loaded");
        Ok(())
    }

    pub fn select(&self, query: &str) -> Result<Vec<Binding>> {
        Ok(self.store.select(&self.namespaces().prefixed(query))?)
    }

    pub fn update(&self, update: &str) -> Result<()> {
        Ok(self.store.update(&self.namespaces().prefixed(update))?)
    }

    /// Apply several updates as one request, each with its own prologue.
    pub fn update_batch(&self, updates: &[String]) -> Result<()> {
        let prefixed: Vec<String> = updates
            .iter()
            .map(|u| self.namespaces().prefixed(u))
            .collect();
        Ok(self.store.update_batch(&prefixed)?)
    }

    /// Add the constructed triples; the number that were new.
    pub fn construct_count(&self, query: &str) -> Result<usize> {
        let triples = self.store.construct(&self.namespaces().prefixed(query))?;
        let mut added = 0;
        for triple in &triples {
            if self.store.insert(triple)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Whether the CONSTRUCT query added at least one new triple.
    pub fn construct(&self, query: &str) -> Result<bool> {
        Ok(self.construct_count(query)? > 0)
    }

    /// `REMOVE ?v WHERE { ... }`: delete every statement about each IRI
    /// bound to `?v`. Returns the number of entities removed.
    pub fn remove(&self, query: &str) -> Result<usize> {
        let at = lexer::find_keyword(query, "REMOVE").ok_or_else(|| {
            Error::Template(factloop_core::TemplateError::MissingFragment { fragment: "REMOVE" })
        })?;
        let select = format!("{}SELECT{}", &query[..at], &query[at + "REMOVE".len()..]);
        let rows = self.select(&select)?;
        let mut deletes: Vec<String> = Vec::new();
        for row in &rows {
            for term in row.values() {
                if let Term::Iri(iri) = term {
                    let delete = format!("DELETE WHERE {{ <{iri}> ?p ?o }}");
                    if !deletes.contains(&delete) {
                        deletes.push(delete);
                    }
                }
            }
        }
        self.update_batch(&deletes)?;
        debug!(removed = deletes.len(), "remove applied");
        Ok(deletes.len())
    }

    /// Result rows as an aligned text table.
    pub fn select_as_text(&self, query: &str) -> Result<String> {
        let rows = self.select(query)?;
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for var in row.keys() {
                if !columns.contains(var) {
                    columns.push(var.clone());
                }
            }
        }
        if columns.is_empty() {
            return Ok(format!("({} rows)\n", rows.len()));
        }
        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| row.get(c).map(Term::to_query_text).unwrap_or_default())
                    .collect()
            })
            .collect();
        let widths: Vec<usize> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                cells
                    .iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(c.chars().count() + 1))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |values: Vec<String>| -> String {
            values
                .iter()
                .zip(&widths)
                .map(|(v, &w)| format!("{v:<w$}"))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };
        let mut out = line(columns.iter().map(|c| format!("?{c}")).collect());
        out.push('\n');
        out.push_str(&widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-"));
        out.push('\n');
        for row in cells {
            out.push_str(&line(row));
            out.push('\n');
        }
        Ok(out)
    }

    /// IRIs of the point clouds the graph knows about.
    pub fn list_point_clouds(&self) -> Result<Vec<String>> {
        let query = format!(
            "SELECT DISTINCT ?c WHERE {{ ?c <{}> <{}> }}",
            vocab::RDF_TYPE,
            self.namespaces().term(kd::FULL_POINT_CLOUD)
        );
        let mut out: Vec<String> = self
            .select(&query)?
            .iter()
            .filter_map(|row| row.get("c").and_then(Term::as_iri).map(str::to_string))
            .collect();
        out.sort();
        Ok(out)
    }

    /// What algorithms see: memory plus the graph's point clouds as owners.
    pub fn exec_env(&self) -> Result<ExecEnv> {
        Ok(ExecEnv::new(Arc::clone(&self.memory), self.namespaces().clone())
            .with_owners(self.list_point_clouds()?))
    }

    // ============================================================
    // Algorithm registration
    // ============================================================

    fn declare_algorithm(&self, iri: &str) -> Result<()> {
        self.update(&format!(
            "INSERT DATA {{ <{iri}> <{}> <{}> . <{iri}> <{}> <{}> }}",
            vocab::RDF_TYPE,
            vocab::OWL_CLASS,
            vocab::RDFS_SUBCLASS_OF,
            self.namespaces().term(kd::ALGORITHM)
        ))
    }

    /// Register `A` and declare it in the graph. Returns its IRI.
    pub fn add_algorithm<A: Algorithm + Default>(&mut self) -> Result<String> {
        let iri = self.registry.add::<A>();
        self.declare_algorithm(&iri)?;
        Ok(iri)
    }

    pub fn add_algorithm_with<A: Algorithm>(
        &mut self,
        make: impl Fn() -> A + Send + Sync + 'static,
    ) -> Result<String> {
        let iri = self.registry.add_with(make);
        self.declare_algorithm(&iri)?;
        Ok(iri)
    }

    /// Remove an algorithm from the registry and every statement about it
    /// from the graph. Fails unless `iri` is an algorithm subclass.
    pub fn unregister(&mut self, iri: &str) -> Result<()> {
        let check = format!(
            "SELECT ?c WHERE {{ <{iri}> <{}>+ ?c . FILTER(?c = <{}>) }} LIMIT 1",
            vocab::RDFS_SUBCLASS_OF,
            self.namespaces().term(kd::ALGORITHM)
        );
        if self.select(&check)?.is_empty() {
            return Err(RegistryError::NotAnAlgorithm(iri.to_string()).into());
        }
        self.registry.unregister(iri)?;
        self.update(&format!("DELETE WHERE {{ <{iri}> ?p ?o }}"))?;
        info!(algorithm = %iri, "unregistered");
        Ok(())
    }
}
