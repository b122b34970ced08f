//! factloop memory - point clouds addressed by graph identifiers

pub mod memory;
pub mod pointcloud;

pub use memory::{Memory, MemoryCell, Resource};
pub use pointcloud::{Patch, Point3, PointCloud, PATCH_EXT, XYZ_EXT};
