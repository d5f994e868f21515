//! Raw wedge-based mesh data

use crate::error::Error;
use crate::point::*;
use crate::Result;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Maximum number of texture coordinate channels a raw mesh carries.
pub const MAX_TEX_COORDS: usize = 8;

/// A triangle soup with per-corner ("wedge") attributes.
///
/// Every face owns three consecutive wedges. Positions are shared through
/// `wedge_indices`; everything else is stored per wedge. Optional channels
/// (`wedge_colors`, each of `wedge_tex_coords`) are either empty or hold
/// exactly one entry per wedge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMesh {
    pub vertex_positions: Vec<Point3f>,
    pub wedge_indices: Vec<u32>,
    /// Tangent per wedge
    pub wedge_tangent_x: Vec<Vector3f>,
    /// Bitangent per wedge
    pub wedge_tangent_y: Vec<Vector3f>,
    /// Normal per wedge
    pub wedge_tangent_z: Vec<Vector3f>,
    pub wedge_colors: Vec<Color>,
    pub wedge_tex_coords: [Vec<Vector2f>; MAX_TEX_COORDS],
    pub face_material_indices: Vec<i32>,
    pub face_smoothing_masks: Vec<u32>,
}

impl RawMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_wedges(&self) -> usize {
        self.wedge_indices.len()
    }

    pub fn num_faces(&self) -> usize {
        self.face_material_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wedge_indices.is_empty()
    }

    /// True when every wedge carries a color.
    pub fn has_colors(&self) -> bool {
        !self.wedge_indices.is_empty() && self.wedge_colors.len() == self.wedge_indices.len()
    }

    /// True when every wedge carries a coordinate in `channel`.
    pub fn has_tex_coords(&self, channel: usize) -> bool {
        channel < MAX_TEX_COORDS
            && !self.wedge_indices.is_empty()
            && self.wedge_tex_coords[channel].len() == self.wedge_indices.len()
    }

    /// Number of leading populated texture coordinate channels.
    pub fn num_tex_coords(&self) -> usize {
        (0..MAX_TEX_COORDS)
            .take_while(|&channel| self.has_tex_coords(channel))
            .count()
    }

    /// Position referenced by a wedge.
    #[inline]
    pub fn wedge_position(&self, wedge: usize) -> Point3f {
        self.vertex_positions[self.wedge_indices[wedge] as usize]
    }

    /// Distinct face material indices in the order they first appear.
    ///
    /// Each entry corresponds to one render section of the mesh.
    pub fn unique_material_order(&self) -> Vec<i32> {
        self.face_material_indices.iter().copied().unique().collect()
    }

    /// Check every array length invariant a reduction relies on.
    pub fn validate(&self) -> Result<()> {
        let num_wedges = self.wedge_indices.len();
        let num_faces = self.face_material_indices.len();

        if num_wedges != num_faces * 3 {
            return Err(Error::InvalidMeshData(format!(
                "{} wedges do not match {} faces",
                num_wedges, num_faces
            )));
        }

        let per_wedge = [
            ("tangent x", self.wedge_tangent_x.len()),
            ("tangent y", self.wedge_tangent_y.len()),
            ("tangent z", self.wedge_tangent_z.len()),
            ("color", self.wedge_colors.len()),
        ];
        for (name, len) in per_wedge {
            check_optional_len(name, len, num_wedges)?;
        }
        for (channel, coords) in self.wedge_tex_coords.iter().enumerate() {
            check_optional_len(&format!("texture coordinate {}", channel), coords.len(), num_wedges)?;
        }

        if !self.face_smoothing_masks.is_empty() && self.face_smoothing_masks.len() != num_faces {
            return Err(Error::InvalidMeshData(format!(
                "{} smoothing masks do not match {} faces",
                self.face_smoothing_masks.len(),
                num_faces
            )));
        }

        let num_positions = self.vertex_positions.len();
        if let Some((wedge, &index)) = self
            .wedge_indices
            .iter()
            .enumerate()
            .find(|(_, &index)| index as usize >= num_positions)
        {
            return Err(Error::InvalidMeshData(format!(
                "wedge {} references position {} of {}",
                wedge, index, num_positions
            )));
        }

        if let Some((face, &material)) = self
            .face_material_indices
            .iter()
            .enumerate()
            .find(|(_, &material)| material < 0)
        {
            return Err(Error::InvalidMeshData(format!(
                "face {} has negative material index {}",
                face, material
            )));
        }

        Ok(())
    }

    /// Sanity check applied to a freshly built or reduced mesh.
    pub fn is_valid(&self) -> bool {
        let num_wedges = self.wedge_indices.len();
        let num_faces = num_wedges / 3;
        let optional = |len: usize| len == 0 || len == num_wedges;

        !self.vertex_positions.is_empty()
            && num_faces > 0
            && num_wedges == num_faces * 3
            && self.face_material_indices.len() == num_faces
            && self.face_smoothing_masks.len() == num_faces
            && optional(self.wedge_tangent_x.len())
            && optional(self.wedge_tangent_y.len())
            && optional(self.wedge_tangent_z.len())
            && optional(self.wedge_colors.len())
            && self.wedge_tex_coords[0].len() == num_wedges
            && self.wedge_tex_coords[1..].iter().all(|coords| optional(coords.len()))
            && self
                .wedge_indices
                .iter()
                .all(|&index| (index as usize) < self.vertex_positions.len())
    }

    /// Clear the mesh
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn check_optional_len(name: &str, len: usize, num_wedges: usize) -> Result<()> {
    if len != 0 && len != num_wedges {
        return Err(Error::InvalidMeshData(format!(
            "{} {} entries do not match {} wedges",
            len, name, num_wedges
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_triangle() -> RawMesh {
        let mut mesh = RawMesh::new();
        mesh.vertex_positions = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
        ];
        mesh.wedge_indices = vec![0, 1, 2];
        mesh.wedge_tangent_x = vec![Vector3f::x(); 3];
        mesh.wedge_tangent_y = vec![Vector3f::y(); 3];
        mesh.wedge_tangent_z = vec![Vector3f::z(); 3];
        mesh.wedge_tex_coords[0] = vec![Vector2f::zeros(); 3];
        mesh.face_material_indices = vec![0];
        mesh.face_smoothing_masks = vec![0];
        mesh
    }

    #[test]
    fn test_valid_triangle() {
        let mesh = make_triangle();
        assert!(mesh.validate().is_ok());
        assert!(mesh.is_valid());
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.num_wedges(), 3);
        assert_eq!(mesh.num_tex_coords(), 1);
        assert!(!mesh.has_colors());
    }

    #[test]
    fn test_face_count_mismatch() {
        let mut mesh = make_triangle();
        mesh.face_material_indices.push(0);
        assert!(matches!(mesh.validate(), Err(Error::InvalidMeshData(_))));
        assert!(!mesh.is_valid());
    }

    #[test]
    fn test_partial_channel_rejected() {
        let mut mesh = make_triangle();
        mesh.wedge_colors = vec![Color::WHITE; 2];
        assert!(mesh.validate().is_err());

        let mut mesh = make_triangle();
        mesh.wedge_tex_coords[3] = vec![Vector2f::zeros(); 1];
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn test_index_out_of_range() {
        let mut mesh = make_triangle();
        mesh.wedge_indices[2] = 7;
        assert!(mesh.validate().is_err());
        assert!(!mesh.is_valid());
    }

    #[test]
    fn test_negative_material_rejected() {
        let mut mesh = make_triangle();
        mesh.face_material_indices[0] = -1;
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn test_empty_mesh_validates_but_is_not_buildable() {
        let mesh = RawMesh::new();
        assert!(mesh.validate().is_ok());
        assert!(!mesh.is_valid());
    }

    #[test]
    fn test_unique_material_order() {
        let mut mesh = RawMesh::new();
        mesh.face_material_indices = vec![2, 2, 0, 1, 0, 2];
        assert_eq!(mesh.unique_material_order(), vec![2, 0, 1]);
    }

    #[test]
    fn test_serde_round_trip() {
        let mesh = make_triangle();
        let json = serde_json::to_string(&mesh).unwrap();
        let back: RawMesh = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mesh);
    }
}
