//! LOD chain generation
//!
//! Each LOD is reduced from an earlier entry of the chain, LOD 0 being the
//! source mesh itself.

use crate::quadric_reduction::ReductionResult;
use crate::settings::ReductionSettings;
use crate::MeshReduction;
use lodcrate_core::{
    find_overlapping_corners, Error, OverlappingCorners, RawMesh, Result, THRESH_POINTS_ARE_SAME,
};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// One level of a generated chain.
#[derive(Debug, Clone)]
pub struct LodResult {
    pub mesh: RawMesh,
    pub overlapping_corners: OverlappingCorners,
    pub max_deviation: f32,
    pub was_reduced: bool,
    /// Material indices in section order
    pub sections: Vec<i32>,
}

impl LodResult {
    fn unreduced(mesh: RawMesh, overlapping_corners: OverlappingCorners) -> Self {
        let sections = mesh.unique_material_order();
        Self {
            mesh,
            overlapping_corners,
            max_deviation: 0.0,
            was_reduced: false,
            sections,
        }
    }
}

/// Build the chain of LODs described by `settings`, one entry per element.
///
/// `settings[0]` describes LOD 0 and is applied to `base`. LODs whose
/// reduction leaves no triangles are dropped from the chain.
pub fn build_lod_chain<R: MeshReduction>(
    reduction: &R,
    base: &RawMesh,
    base_overlapping: &OverlappingCorners,
    settings: &[ReductionSettings],
) -> Result<Vec<LodResult>> {
    if base.is_empty() {
        return Err(Error::InvalidMeshData("base mesh has no faces".into()));
    }
    base.validate()?;
    if settings.is_empty() {
        return Err(Error::InvalidSettings("no LOD settings given".into()));
    }

    let mut chain: Vec<LodResult> = Vec::with_capacity(settings.len());
    for (lod, lod_settings) in settings.iter().enumerate() {
        let (source_mesh, source_overlapping) = if lod == 0 {
            (base, base_overlapping)
        } else {
            let source = chain.get(lod_settings.base_lod).ok_or_else(|| {
                Error::InvalidSettings(format!(
                    "LOD {} reduces from LOD {} but only {} exist",
                    lod,
                    lod_settings.base_lod,
                    chain.len()
                ))
            })?;
            (&source.mesh, &source.overlapping_corners)
        };

        if lod_settings.percent_triangles >= 1.0 {
            chain.push(LodResult::unreduced(source_mesh.clone(), source_overlapping.clone()));
            continue;
        }

        let result = reduction.reduce(source_mesh, source_overlapping, lod_settings)?;
        if result.mesh.is_empty() {
            warn!(lod, "reduction removed every triangle, dropping LOD");
            continue;
        }
        if !result.mesh.is_valid() {
            return Err(Error::Algorithm(format!("LOD {} produced an invalid mesh", lod)));
        }

        let threshold = if lod_settings.remove_degenerates {
            THRESH_POINTS_ARE_SAME
        } else {
            0.0
        };
        let overlapping_corners = find_overlapping_corners(&result.mesh, threshold);
        debug!(lod, triangles = result.reduced_triangles, "LOD built");

        let sections = result.mesh.unique_material_order();
        chain.push(LodResult {
            mesh: result.mesh,
            overlapping_corners,
            max_deviation: result.max_deviation,
            was_reduced: true,
            sections,
        });
    }

    if chain.is_empty() {
        return Err(Error::Algorithm("every LOD reduced to nothing".into()));
    }
    info!(lods = chain.len(), "LOD chain built");
    Ok(chain)
}

/// A standalone reduction request.
#[derive(Debug, Clone)]
pub struct ReductionJob {
    pub mesh: RawMesh,
    pub overlapping_corners: OverlappingCorners,
    pub settings: ReductionSettings,
}

impl ReductionJob {
    /// Job with overlapping corners found at the point epsilon.
    pub fn new(mesh: RawMesh, settings: ReductionSettings) -> Self {
        let overlapping_corners = find_overlapping_corners(&mesh, THRESH_POINTS_ARE_SAME);
        Self {
            mesh,
            overlapping_corners,
            settings,
        }
    }
}

/// Reduce independent meshes in parallel. Results keep the order of `jobs`.
pub fn reduce_batch<R: MeshReduction + Sync>(
    reduction: &R,
    jobs: &[ReductionJob],
) -> Vec<Result<ReductionResult>> {
    jobs.par_iter()
        .map(|job| reduction.reduce(&job.mesh, &job.overlapping_corners, &job.settings))
        .collect()
}
