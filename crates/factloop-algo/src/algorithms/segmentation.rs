use crate::contract::{Algorithm, ArgValue, ParamTable};
use crate::env::ExecEnv;
use factloop_core::{local_name, BindingError, Term};
use factloop_memory::PointCloud;
use std::sync::Arc;

/// Split a cloud into voxel patches of side `hasMaxSize` and return one IRI
/// per patch. The cloud is replaced in memory by its segmented version, so
/// the patches resolve as sub-objects afterwards. A non-positive size keeps
/// the patches the cloud already has.
#[derive(Default)]
pub struct PatchesSegmentation {
    pub has_input: Option<(String, Arc<PointCloud>)>,
    pub has_max_size: f64,
}

impl Algorithm for PatchesSegmentation {
    const NAME: &'static str = "PatchesSegmentation";

    fn parameters() -> ParamTable<Self> {
        ParamTable::new()
            .single("hasInput", |a: &mut Self, v: ArgValue| {
                a.has_input = Some(v.into_cloud("hasInput")?);
                Ok(())
            })
            .single("hasMaxSize", |a: &mut Self, v: ArgValue| {
                a.has_max_size = v.into_double("hasMaxSize")?;
                Ok(())
            })
    }

    fn process(&mut self, env: &ExecEnv) -> Result<Vec<Term>, BindingError> {
        let (addr, cloud) = self
            .has_input
            .take()
            .ok_or_else(|| BindingError::Missing("hasInput".into()))?;

        let names: Vec<String> = if self.has_max_size > 0.0 {
            let segmented = cloud.segment_voxels(self.has_max_size, local_name(&addr));
            let names = segmented.patches.keys().cloned().collect();
            if !env.memory.replace(&addr, segmented) {
                return Err(BindingError::process(
                    Self::NAME,
                    format!("{addr} is not a top-level memory cell"),
                ));
            }
            names
        } else {
            cloud.patches.keys().cloned().collect()
        };
        tracing::info!(cloud = %addr, patches = names.len(), "segmentation done");
        Ok(names.iter().map(|n| env.mint(n)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factloop_core::Namespaces;
    use factloop_memory::{Memory, Point3};

    #[test]
    fn segments_and_replaces_cloud() {
        let env = ExecEnv::new(Arc::new(Memory::new()), Namespaces::default());
        let addr = env.namespaces.term("scan");
        let cloud = PointCloud::new(vec![
            Point3::new(0.1, 0.1, 0.1),
            Point3::new(2.5, 0.1, 0.1),
        ]);
        env.memory.alloc(addr.clone(), cloud.clone());

        let mut algo = PatchesSegmentation {
            has_input: Some((addr.clone(), Arc::new(cloud))),
            has_max_size: 1.0,
        };
        let out = algo.process(&env).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.contains(&env.mint("scan_0_0_0")));
        assert!(env.memory.access(&env.namespaces.term("scan_2_0_0")).is_some());
    }
}
