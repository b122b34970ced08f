use crate::contract::{Algorithm, ArgValue, ParamTable};
use crate::env::ExecEnv;
use factloop_core::{BindingError, Term};
use factloop_memory::PointCloud;
use std::path::Path;

/// Load an ASCII `.xyz` file into a new memory cell. Without a source, an
/// empty cloud is allocated.
#[derive(Default)]
pub struct LoadCloud {
    pub has_source: Option<String>,
}

impl Algorithm for LoadCloud {
    const NAME: &'static str = "LoadCloud";

    fn parameters() -> ParamTable<Self> {
        ParamTable::new().single("hasSource", |a: &mut Self, v: ArgValue| {
            a.has_source = Some(v.into_string("hasSource")?);
            Ok(())
        })
    }

    fn process(&mut self, env: &ExecEnv) -> Result<Vec<Term>, BindingError> {
        let cloud = match &self.has_source {
            Some(src) => PointCloud::load(Path::new(src)).map_err(|e| {
                BindingError::process(Self::NAME, format!("cannot load {src}: {e}"))
            })?,
            None => PointCloud::default(),
        };
        tracing::info!(source = ?self.has_source, points = cloud.len(), "point cloud loaded");
        let addr = env.memory.alloc_new(cloud, &env.namespaces.base);
        Ok(vec![Term::iri(addr)])
    }
}
