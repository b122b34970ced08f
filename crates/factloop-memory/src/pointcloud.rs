//! Point clouds, their named patches, and the ASCII `.xyz` codec.
//!
//! File format: one point per line, `x y z` separated by whitespace, with an
//! optional fourth column naming the patch the point belongs to. Blank lines
//! and lines starting with `#` are ignored.

use factloop_core::MemoryError;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

pub const XYZ_EXT: &str = "xyz";
/// Same ASCII layout as [`XYZ_EXT`]; marks a file holding a lone patch.
pub const PATCH_EXT: &str = "pxyz";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_sq(&self, other: &Point3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }
}

/// A named component of a point cloud.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Patch {
    pub name: String,
    pub points: Vec<Point3>,
}

impl Patch {
    pub fn new(name: impl Into<String>, points: Vec<Point3>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn min_z(&self) -> Option<f64> {
        self.points.iter().map(|p| p.z).reduce(f64::min)
    }

    /// Extent along x (max - min).
    pub fn extent_x(&self) -> Option<f64> {
        let min = self.points.iter().map(|p| p.x).reduce(f64::min)?;
        let max = self.points.iter().map(|p| p.x).reduce(f64::max)?;
        Some(max - min)
    }

    /// Every `step`-th point, or all of them when the patch is small enough.
    fn sample(&self, max_points: usize) -> Vec<Point3> {
        if max_points == 0 || self.points.len() <= max_points {
            return self.points.clone();
        }
        let step = self.points.len().div_ceil(max_points);
        self.points.iter().step_by(step).copied().collect()
    }

    /// Brute-force minimum euclidean distance to another patch. `max_points`
    /// caps the points considered per side (0 = no cap).
    pub fn min_distance(&self, other: &Patch, max_points: usize) -> Option<f64> {
        self.min_distance_until(other, max_points, || false)
    }

    /// [`Patch::min_distance`] that polls `stop` once per point of `self`
    /// and gives up with `None` as soon as it returns true.
    pub fn min_distance_until(
        &self,
        other: &Patch,
        max_points: usize,
        stop: impl Fn() -> bool,
    ) -> Option<f64> {
        let a = self.sample(max_points);
        let b = other.sample(max_points);
        let mut best: Option<f64> = None;
        for p in &a {
            if stop() {
                return None;
            }
            for q in &b {
                let d = p.distance_sq(q);
                if best.map_or(true, |cur| d < cur) {
                    best = Some(d);
                }
            }
        }
        best.map(f64::sqrt)
    }
}

/// A point cloud: loose points plus named patches.
#[derive(Clone, Debug, Default)]
pub struct PointCloud {
    pub points: Vec<Point3>,
    pub patches: BTreeMap<String, Arc<Patch>>,
}

impl PointCloud {
    pub fn new(points: Vec<Point3>) -> Self {
        Self {
            points,
            patches: BTreeMap::new(),
        }
    }

    /// Total number of points, patches included.
    pub fn len(&self) -> usize {
        self.points.len() + self.patches.values().map(|p| p.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn patch(&self, name: &str) -> Option<Arc<Patch>> {
        self.patches.get(name).cloned()
    }

    pub fn add_patch(&mut self, patch: Patch) {
        self.patches.insert(patch.name.clone(), Arc::new(patch));
    }

    pub fn all_points(&self) -> impl Iterator<Item = &Point3> {
        self.points
            .iter()
            .chain(self.patches.values().flat_map(|p| p.points.iter()))
    }

    /// Regroup every point into cubic voxels of side `size`. Each non-empty
    /// voxel becomes a patch named `<prefix>_<i>_<j>_<k>`; existing patches
    /// are dissolved first.
    pub fn segment_voxels(&self, size: f64, prefix: &str) -> PointCloud {
        let mut cells: HashMap<(i64, i64, i64), Vec<Point3>> = HashMap::new();
        for p in self.all_points() {
            let key = (
                (p.x / size).floor() as i64,
                (p.y / size).floor() as i64,
                (p.z / size).floor() as i64,
            );
            cells.entry(key).or_default().push(*p);
        }
        let mut out = PointCloud::default();
        for ((i, j, k), points) in cells {
            out.add_patch(Patch::new(format!("{prefix}_{i}_{j}_{k}"), points));
        }
        out
    }

    pub fn parse_xyz(text: &str, path: &str) -> Result<Self, MemoryError> {
        let mut cloud = PointCloud::default();
        let mut grouped: BTreeMap<String, Vec<Point3>> = BTreeMap::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut cols = line.split_whitespace();
            let mut coord = |axis: &str| -> Result<f64, MemoryError> {
                let raw = cols.next().ok_or_else(|| MemoryError::Parse {
                    path: path.to_string(),
                    line: idx + 1,
                    reason: format!("missing {axis} coordinate"),
                })?;
                raw.parse().map_err(|e| MemoryError::Parse {
                    path: path.to_string(),
                    line: idx + 1,
                    reason: format!("bad {axis} coordinate '{raw}': {e}"),
                })
            };
            let point = Point3::new(coord("x")?, coord("y")?, coord("z")?);
            match cols.next() {
                Some(name) => grouped.entry(name.to_string()).or_default().push(point),
                None => cloud.points.push(point),
            }
        }
        for (name, points) in grouped {
            cloud.add_patch(Patch::new(name, points));
        }
        Ok(cloud)
    }

    pub fn to_xyz(&self) -> String {
        let mut out = String::new();
        for p in &self.points {
            let _ = writeln!(out, "{} {} {}", p.x, p.y, p.z);
        }
        for (name, patch) in &self.patches {
            for p in &patch.points {
                let _ = writeln!(out, "{} {} {} {}", p.x, p.y, p.z, name);
            }
        }
        out
    }

    pub fn load(path: &Path) -> Result<Self, MemoryError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_xyz(&text, &path.display().to_string())
    }

    pub fn save(&self, path: &Path) -> Result<(), MemoryError> {
        std::fs::write(path, self.to_xyz())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_groups_named_points() {
        let text = "# header\n0 0 0\n1 0 2 p1\n2 0 1 p1\n\n5 5 5 p2\n";
        let cloud = PointCloud::parse_xyz(text, "mem").unwrap();
        assert_eq!(cloud.points.len(), 1);
        assert_eq!(cloud.patches.len(), 2);
        assert_eq!(cloud.patch("p1").unwrap().len(), 2);
        assert_eq!(cloud.len(), 4);
    }

    #[test]
    fn parse_reports_line_number() {
        let err = PointCloud::parse_xyz("0 0 0\n1 x 2\n", "c.xyz").unwrap_err();
        match err {
            MemoryError::Parse { line, path, .. } => {
                assert_eq!(line, 2);
                assert_eq!(path, "c.xyz");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn patch_measures() {
        let p = Patch::new(
            "p",
            vec![Point3::new(1.0, 0.0, 3.0), Point3::new(4.0, 0.0, -1.0)],
        );
        assert_eq!(p.min_z(), Some(-1.0));
        assert_eq!(p.extent_x(), Some(3.0));
        assert_eq!(Patch::default().min_z(), None);
    }

    #[test]
    fn min_distance_between_patches() {
        let a = Patch::new("a", vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)]);
        let b = Patch::new("b", vec![Point3::new(4.0, 0.0, 0.0), Point3::new(1.0, 3.0, 4.0)]);
        let d = a.min_distance(&b, 0).unwrap();
        assert!((d - 3.0).abs() < 1e-9);
        assert!(a.min_distance(&Patch::default(), 0).is_none());
    }

    #[test]
    fn stopped_distance_gives_up() {
        let a = Patch::new("a", vec![Point3::new(0.0, 0.0, 0.0)]);
        let b = Patch::new("b", vec![Point3::new(2.0, 0.0, 0.0)]);
        assert!(a.min_distance_until(&b, 0, || true).is_none());
        assert_eq!(a.min_distance_until(&b, 0, || false), Some(2.0));
    }

    #[test]
    fn voxel_segmentation_groups_points() {
        let cloud = PointCloud::new(vec![
            Point3::new(0.1, 0.1, 0.1),
            Point3::new(0.2, 0.3, 0.4),
            Point3::new(1.5, 0.1, 0.1),
        ]);
        let seg = cloud.segment_voxels(1.0, "c");
        assert_eq!(seg.patches.len(), 2);
        assert_eq!(seg.patch("c_0_0_0").unwrap().len(), 2);
        assert_eq!(seg.patch("c_1_0_0").unwrap().len(), 1);
        assert!(seg.points.is_empty());
    }
}
