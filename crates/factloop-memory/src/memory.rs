//! Resource Memory: a URI-keyed heap for objects too large for the graph.
//!
//! Cells live in a `DashMap`, so `alloc`/`replace`/`free` on one address are
//! serialized against `access` to the same address.

use crate::pointcloud::{Patch, PointCloud, PATCH_EXT, XYZ_EXT};
use dashmap::DashMap;
use factloop_core::{local_name, MemoryError};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// An object held in memory. Cheap to clone.
#[derive(Clone, Debug)]
pub enum Resource {
    Cloud(Arc<PointCloud>),
    Patch(Arc<Patch>),
}

impl Resource {
    /// Kind name used when minting addresses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cloud(_) => "PointCloud",
            Self::Patch(_) => "Patch",
        }
    }

    pub fn as_cloud(&self) -> Option<&Arc<PointCloud>> {
        match self {
            Self::Cloud(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_patch(&self) -> Option<&Arc<Patch>> {
        match self {
            Self::Patch(p) => Some(p),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Cloud(c) => c.len(),
            Self::Patch(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// File extension the cell is persisted under; it decides the kind on reload.
    pub fn ext(&self) -> &'static str {
        match self {
            Self::Cloud(_) => XYZ_EXT,
            Self::Patch(_) => PATCH_EXT,
        }
    }

    fn to_xyz(&self) -> String {
        match self {
            Self::Cloud(c) => c.to_xyz(),
            Self::Patch(p) => PointCloud::new(p.points.clone()).to_xyz(),
        }
    }
}

impl From<PointCloud> for Resource {
    fn from(c: PointCloud) -> Self {
        Self::Cloud(Arc::new(c))
    }
}

impl From<Patch> for Resource {
    fn from(p: Patch) -> Self {
        Self::Patch(Arc::new(p))
    }
}

#[derive(Clone, Debug)]
pub struct MemoryCell {
    pub address: String,
    pub payload: Resource,
    /// File extension used when the cell is persisted.
    pub ext: &'static str,
}

#[derive(Default)]
pub struct Memory {
    cells: DashMap<String, MemoryCell>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `obj` at `addr`, overwriting any previous cell.
    pub fn alloc(&self, addr: impl Into<String>, obj: impl Into<Resource>) {
        let address = addr.into();
        let payload = obj.into();
        debug!(address = %address, kind = payload.kind(), "alloc");
        let ext = payload.ext();
        self.cells.insert(
            address.clone(),
            MemoryCell {
                address,
                payload,
                ext,
            },
        );
    }

    /// Store `obj` under a freshly minted address in namespace `ns`.
    pub fn alloc_new(&self, obj: impl Into<Resource>, ns: &str) -> String {
        let obj = obj.into();
        let addr = format!("{ns}{}_{}", obj.kind(), uuid::Uuid::new_v4());
        self.alloc(addr.clone(), obj);
        addr
    }

    /// Replace the payload of an existing cell. Returns false when nothing
    /// is stored at `addr`.
    pub fn replace(&self, addr: &str, obj: impl Into<Resource>) -> bool {
        match self.cells.get_mut(addr) {
            Some(mut cell) => {
                let payload = obj.into();
                cell.ext = payload.ext();
                cell.payload = payload;
                true
            }
            None => false,
        }
    }

    pub fn free(&self, addr: &str) -> bool {
        self.cells.remove(addr).is_some()
    }

    pub fn contains(&self, addr: &str) -> bool {
        self.cells.contains_key(addr)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn addresses(&self) -> Vec<String> {
        let mut out: Vec<String> = self.cells.iter().map(|c| c.key().clone()).collect();
        out.sort();
        out
    }

    /// Direct lookup, then a scan of every stored cloud's patches for the
    /// address's local name.
    pub fn access(&self, addr: &str) -> Option<Resource> {
        if let Some(cell) = self.cells.get(addr) {
            return Some(cell.payload.clone());
        }
        let name = local_name(addr);
        self.cells
            .iter()
            .filter_map(|cell| cell.payload.as_cloud().and_then(|c| c.patch(name)))
            .next()
            .map(Resource::Patch)
    }

    /// Like [`access`](Self::access), but the sub-object scan only visits the
    /// given owners (the point clouds the graph currently knows about).
    pub fn access_among(&self, addr: &str, owners: &[String]) -> Option<Resource> {
        if let Some(cell) = self.cells.get(addr) {
            return Some(cell.payload.clone());
        }
        let name = local_name(addr);
        for owner in owners {
            let Some(cell) = self.cells.get(owner) else {
                warn!(owner = %owner, "point cloud known to the graph has no memory cell");
                continue;
            };
            match &cell.payload {
                Resource::Cloud(c) => {
                    if let Some(p) = c.patch(name) {
                        return Some(Resource::Patch(p));
                    }
                }
                Resource::Patch(_) => {
                    warn!(owner = %owner, "point cloud entity is stored as a patch");
                }
            }
        }
        None
    }

    /// Persist every cell as `<dir>/<local name>.<ext>`. The directory is
    /// cleared and recreated first. Two addresses sharing a local name and
    /// extension are refused before anything is touched.
    pub fn write(&self, dir: &Path) -> Result<usize, MemoryError> {
        let mut files: HashMap<String, (String, String)> = HashMap::new();
        for cell in self.cells.iter() {
            let file = format!("{}.{}", local_name(&cell.address), cell.ext);
            if let Some((first, _)) = files.get(&file) {
                return Err(MemoryError::FileCollision {
                    file,
                    first: first.clone(),
                    second: cell.address.clone(),
                });
            }
            files.insert(file, (cell.address.clone(), cell.payload.to_xyz()));
        }

        if dir.exists() {
            std::fs::remove_dir_all(dir)?;
        }
        std::fs::create_dir_all(dir)?;
        for (file, (_, text)) in &files {
            std::fs::write(dir.join(file), text)?;
        }
        info!(dir = %dir.display(), cells = files.len(), "memory written");
        Ok(files.len())
    }

    /// Load every `.xyz` (cloud) and `.pxyz` (patch) file below `dir`, keyed
    /// by `ns` + file stem. Existing cells are dropped.
    pub fn read(&self, dir: &Path, ns: &str) -> Result<usize, MemoryError> {
        self.cells.clear();
        let mut loaded = 0;
        for entry in WalkDir::new(dir) {
            let entry = entry.map_err(|e| MemoryError::Walk {
                path: dir.display().to_string(),
                reason: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let ext = path.extension().and_then(|e| e.to_str());
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let cloud = match ext {
                Some(XYZ_EXT) | Some(PATCH_EXT) => PointCloud::load(path)?,
                _ => continue,
            };
            let addr = format!("{ns}{stem}");
            if self.cells.contains_key(&addr) {
                warn!(address = %addr, file = %path.display(), "duplicate stem, later file wins");
            }
            if ext == Some(PATCH_EXT) {
                let points = cloud.all_points().copied().collect();
                self.alloc(addr, Patch::new(stem, points));
            } else {
                self.alloc(addr, cloud);
            }
            loaded += 1;
        }
        info!(dir = %dir.display(), cells = loaded, "memory read");
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointcloud::Point3;

    const NS: &str = "http://lab.ponciano.info/knowdip#";

    fn cloud_with(names: &[&str]) -> PointCloud {
        let mut c = PointCloud::default();
        for (i, n) in names.iter().enumerate() {
            c.add_patch(Patch::new(*n, vec![Point3::new(i as f64, 0.0, 0.0)]));
        }
        c
    }

    #[test]
    fn alloc_new_mints_kind_prefixed_address() {
        let m = Memory::new();
        let addr = m.alloc_new(PointCloud::default(), NS);
        assert!(addr.starts_with(&format!("{NS}PointCloud_")));
        assert!(m.contains(&addr));
    }

    #[test]
    fn replace_requires_existing_cell() {
        let m = Memory::new();
        assert!(!m.replace("urn:x", PointCloud::default()));
        m.alloc("urn:x", PointCloud::default());
        assert!(m.replace("urn:x", cloud_with(&["a"])));
        assert_eq!(m.access("urn:x").unwrap().len(), 1);
    }

    #[test]
    fn free_reports_presence() {
        let m = Memory::new();
        m.alloc("urn:x", PointCloud::default());
        assert!(m.free("urn:x"));
        assert!(!m.free("urn:x"));
        assert!(m.access("urn:x").is_none());
    }

    #[test]
    fn access_among_only_scans_owners() {
        let m = Memory::new();
        m.alloc(format!("{NS}c1"), cloud_with(&["p1"]));
        m.alloc(format!("{NS}c2"), cloud_with(&["p2"]));
        let owners = vec![format!("{NS}c1")];
        assert!(m.access_among(&format!("{NS}p1"), &owners).is_some());
        assert!(m.access_among(&format!("{NS}p2"), &owners).is_none());
        assert!(m.access(&format!("{NS}p2")).is_some());
    }
}
