//! Engine configuration
//!
//! Namespace, pass limits, memory layout and work dir paths, read from a
//! TOML file. Every section has defaults, so an absent file is valid.

use crate::error::{Error, Result};
use crate::vocab::Namespaces;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine vocabulary namespace and prefix.
    pub namespace: Namespaces,
    /// Fixpoint driver limits.
    pub fixpoint: FixpointConfig,
    /// Resource memory persistence.
    pub memory: MemoryConfig,
    /// Parallel distance estimation.
    pub bulk: BulkConfig,
    /// Ontology and working directory layout.
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FixpointConfig {
    /// Full passes before a saturation is declared divergent.
    pub max_passes: usize,
    /// Materialise `rdf:type` along `rdfs:subClassOf` before each pass.
    pub infer_subclass_types: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Directory, inside the work dir, holding one file per stored object.
    pub dir_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkConfig {
    /// Upper bound on the wait for all distance workers.
    pub timeout_secs: u64,
    /// Points sampled per patch for the distance estimate. 0 keeps every point.
    pub max_points_per_patch: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub workdir: PathBuf,
    /// Turtle ontology loaded on open.
    pub ontology: Option<PathBuf>,
    /// Graph snapshot file inside the work dir.
    pub graph_file: String,
}

// ============================================================
// Defaults
// ============================================================

impl Default for FixpointConfig {
    fn default() -> Self {
        Self {
            max_passes: 64,
            infer_subclass_types: true,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            dir_name: "kmemory".into(),
        }
    }
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 600,
            max_points_per_patch: 0,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("output"),
            ontology: None,
            graph_file: "graph.ttl".into(),
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::config(e.to_string()))?;
        if config.fixpoint.max_passes == 0 {
            return Err(Error::config("fixpoint.max_passes must be at least 1"));
        }
        Ok(config)
    }

    pub fn memory_dir(&self) -> PathBuf {
        self.paths.workdir.join(&self.memory.dir_name)
    }

    pub fn graph_path(&self) -> PathBuf {
        self.paths.workdir.join(&self.paths.graph_file)
    }
}
