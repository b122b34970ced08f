//! Built-in point-cloud algorithms.

pub mod getters;
pub mod load_cloud;
pub mod segmentation;

pub use getters::{GetPatchDistanceX, GetPatchMinZ, GetPatchSize};
pub use load_cloud::LoadCloud;
pub use segmentation::PatchesSegmentation;
