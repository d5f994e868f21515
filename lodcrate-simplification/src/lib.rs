//! Mesh reduction for LOD generation
//!
//! This crate reduces wedge-based raw meshes while preserving their
//! surface attributes:
//! - Attribute-aware quadric edge collapse
//! - Wedge deduplication and output reconstruction
//! - Material section ordering
//! - LOD chains and parallel batch reduction

pub mod vertex;
pub mod quadric;
pub mod engine;
pub mod settings;
pub mod material;
pub mod quadric_reduction;
pub mod lod;

pub use vertex::*;
pub use quadric::*;
pub use engine::*;
pub use settings::*;
pub use material::*;
pub use quadric_reduction::*;
pub use lod::*;

use lodcrate_core::{OverlappingCorners, RawMesh, Result};

/// Reduce a raw mesh to a fraction of its triangles
pub trait MeshReduction {
    /// Reduce `mesh` according to `settings`. `overlapping_corners` links
    /// wedges sharing a position so their vertices can be welded.
    fn reduce(
        &self,
        mesh: &RawMesh,
        overlapping_corners: &OverlappingCorners,
        settings: &ReductionSettings,
    ) -> Result<ReductionResult>;
}
