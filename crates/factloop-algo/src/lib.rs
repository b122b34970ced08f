//! factloop algorithms - the invocation contract and the registry
//!
//! Each algorithm is a struct implementing [`Algorithm`] with an explicit
//! parameter table. To add one: implement the trait in src/algorithms/ and
//! register it below.

pub mod algorithms;
pub mod bind;
pub mod contract;
pub mod env;
pub mod registry;

pub use bind::{bind_arguments, field_name, resolve_value, split_pairs};
pub use contract::{Algorithm, ArgValue, ParamTable};
pub use env::ExecEnv;
pub use registry::{AlgorithmRegistry, Component};

use factloop_core::Namespaces;

/// Registry with every built-in algorithm.
pub fn create_default_registry(namespaces: Namespaces) -> AlgorithmRegistry {
    let mut registry = AlgorithmRegistry::new(namespaces);

    // --- Loading and segmentation ---
    registry.add::<algorithms::LoadCloud>();
    registry.add::<algorithms::PatchesSegmentation>();

    // --- Patch getters ---
    registry.add::<algorithms::GetPatchMinZ>();
    registry.add::<algorithms::GetPatchDistanceX>();
    registry.add::<algorithms::GetPatchSize>();

    registry
}
