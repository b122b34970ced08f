//! Scalar getters over a single patch.
//!
//! `hasInput` is either the patch itself (resolved as a sub-object) or its
//! owning cloud, in which case `patchID` names the patch.

use crate::contract::{Algorithm, ArgValue, ParamTable};
use crate::env::ExecEnv;
use factloop_core::{local_name, BindingError, Literal, Term};
use factloop_memory::{Patch, Resource};
use std::sync::Arc;

#[derive(Default)]
pub struct PatchInput {
    input: Option<Resource>,
    patch_id: Option<String>,
}

impl PatchInput {
    fn set_input(&mut self, v: ArgValue) -> Result<(), BindingError> {
        self.input = Some(v.into_resolved("hasInput")?.1);
        Ok(())
    }

    fn set_patch_id(&mut self, v: ArgValue) -> Result<(), BindingError> {
        self.patch_id = Some(v.into_string("patchID")?);
        Ok(())
    }

    fn patch(&self, algorithm: &str) -> Result<Arc<Patch>, BindingError> {
        match (&self.input, &self.patch_id) {
            (Some(Resource::Patch(p)), _) => Ok(Arc::clone(p)),
            (Some(Resource::Cloud(c)), Some(id)) => c.patch(local_name(id)).ok_or_else(|| {
                BindingError::process(algorithm, format!("cloud has no patch {id}"))
            }),
            (Some(Resource::Cloud(_)), None) => Err(BindingError::Missing("patchID".into())),
            (None, _) => Err(BindingError::Missing("hasInput".into())),
        }
    }
}

fn patch_params<A: 'static>(input: fn(&mut A) -> &mut PatchInput) -> ParamTable<A> {
    ParamTable::new()
        .single("hasInput", move |a: &mut A, v: ArgValue| input(a).set_input(v))
        .single("patchID", move |a: &mut A, v: ArgValue| input(a).set_patch_id(v))
}

fn empty_patch(algorithm: &str) -> BindingError {
    BindingError::process(algorithm, "patch has no points")
}

#[derive(Default)]
pub struct GetPatchMinZ {
    pub input: PatchInput,
}

impl Algorithm for GetPatchMinZ {
    const NAME: &'static str = "GetPatchMinZ";

    fn parameters() -> ParamTable<Self> {
        patch_params(|a: &mut Self| &mut a.input)
    }

    fn process(&mut self, _env: &ExecEnv) -> Result<Vec<Term>, BindingError> {
        let patch = self.input.patch(Self::NAME)?;
        let z = patch.min_z().ok_or_else(|| empty_patch(Self::NAME))?;
        Ok(vec![Literal::double(z).into()])
    }
}

#[derive(Default)]
pub struct GetPatchDistanceX {
    pub input: PatchInput,
}

impl Algorithm for GetPatchDistanceX {
    const NAME: &'static str = "GetPatchDistanceX";

    fn parameters() -> ParamTable<Self> {
        patch_params(|a: &mut Self| &mut a.input)
    }

    fn process(&mut self, _env: &ExecEnv) -> Result<Vec<Term>, BindingError> {
        let patch = self.input.patch(Self::NAME)?;
        let dx = patch.extent_x().ok_or_else(|| empty_patch(Self::NAME))?;
        Ok(vec![Literal::double(dx).into()])
    }
}

/// Number of points in the patch.
#[derive(Default)]
pub struct GetPatchSize {
    pub input: PatchInput,
}

impl Algorithm for GetPatchSize {
    const NAME: &'static str = "GetPatchSize";

    fn parameters() -> ParamTable<Self> {
        patch_params(|a: &mut Self| &mut a.input)
    }

    fn process(&mut self, _env: &ExecEnv) -> Result<Vec<Term>, BindingError> {
        let patch = self.input.patch(Self::NAME)?;
        Ok(vec![Literal::integer(patch.len() as i64).into()])
    }
}
