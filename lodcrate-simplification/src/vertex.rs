//! Attribute-bearing vertex consumed by the quadric simplifier

use lodcrate_core::{
    normals_equal, points_equal, uvs_equal, LinearColor, Point3f, Vector2f, Vector3f,
    MAX_TEX_COORDS, THRESH_POINTS_ARE_SAME,
};

/// Number of floats in a vertex attribute block: normal, two tangents,
/// RGBA color and two floats per texture coordinate channel.
///
/// Derived from the field list rather than from the struct size so padding
/// can never change it.
pub const NUM_ATTRIBUTES: usize = 3 + 3 + 3 + 4 + 2 * MAX_TEX_COORDS;

/// Offset of the normal inside the attribute block.
pub const NORMAL_OFFSET: usize = 0;
/// Offset of the first tangent; the second follows immediately.
pub const TANGENT_OFFSET: usize = 3;
pub const COLOR_OFFSET: usize = 9;
pub const TEX_COORD_OFFSET: usize = 13;

const SMALL_NUMBER: f32 = 1e-8;

/// Vertex layout the simplifier engine is generic over.
///
/// The engine only needs a position to move and a flat block of floats to
/// interpolate; everything else about the vertex stays opaque.
pub trait AttributeVertex: Clone {
    /// Length of the block written by [`AttributeVertex::read_attributes`].
    const NUM_ATTRIBUTES: usize;

    fn position(&self) -> Point3f;

    fn set_position(&mut self, position: Point3f);

    /// Copy the attribute block into `out` (`out.len() == NUM_ATTRIBUTES`).
    fn read_attributes(&self, out: &mut [f32]);

    /// Overwrite the attribute block from `values`.
    fn write_attributes(&mut self, values: &[f32]);

    /// Restore the layout invariants after attributes were interpolated.
    fn correct(&mut self);
}

/// A deduplicated mesh vertex with every per-wedge attribute attached.
///
/// The derived `PartialEq` is the bit-exact comparison; [`SimplifierVertex::equals`]
/// is the tolerant one used while deduplicating wedges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplifierVertex {
    pub material_index: u32,
    pub position: Point3f,
    pub normal: Vector3f,
    pub tangents: [Vector3f; 2],
    pub color: LinearColor,
    pub tex_coords: [Vector2f; MAX_TEX_COORDS],
}

impl Default for SimplifierVertex {
    fn default() -> Self {
        Self {
            material_index: 0,
            position: Point3f::origin(),
            normal: Vector3f::zeros(),
            tangents: [Vector3f::zeros(); 2],
            color: LinearColor::TRANSPARENT,
            tex_coords: [Vector2f::zeros(); MAX_TEX_COORDS],
        }
    }
}

impl SimplifierVertex {
    /// Tolerant equality: same material, positions within point epsilon,
    /// tangent frame within normal epsilon, identical color and every UV
    /// channel within UV epsilon.
    pub fn equals(&self, other: &Self) -> bool {
        self.material_index == other.material_index
            && points_equal(&self.position, &other.position, THRESH_POINTS_ARE_SAME)
            && normals_equal(&self.tangents[0], &other.tangents[0])
            && normals_equal(&self.tangents[1], &other.tangents[1])
            && normals_equal(&self.normal, &other.normal)
            && self.color == other.color
            && self
                .tex_coords
                .iter()
                .zip(other.tex_coords.iter())
                .all(|(a, b)| uvs_equal(a, b))
    }

    /// Re-orthonormalize the tangent frame against the normal and clamp the
    /// color. Zero-length vectors are left as they are.
    pub fn correct(&mut self) {
        normalize_in_place(&mut self.normal);

        let normal = self.normal;
        let mut tangent_x = self.tangents[0];
        tangent_x = tangent_x - normal * tangent_x.dot(&normal);
        normalize_in_place(&mut tangent_x);

        let mut tangent_y = self.tangents[1];
        tangent_y = tangent_y - normal * tangent_y.dot(&normal);
        tangent_y = tangent_y - tangent_x * tangent_y.dot(&tangent_x);
        normalize_in_place(&mut tangent_y);

        self.tangents = [tangent_x, tangent_y];
        self.color = self.color.clamped();
    }
}

fn normalize_in_place(v: &mut Vector3f) {
    let length_squared = v.norm_squared();
    if length_squared > SMALL_NUMBER {
        *v /= length_squared.sqrt();
    }
}

impl AttributeVertex for SimplifierVertex {
    const NUM_ATTRIBUTES: usize = NUM_ATTRIBUTES;

    fn position(&self) -> Point3f {
        self.position
    }

    fn set_position(&mut self, position: Point3f) {
        self.position = position;
    }

    fn read_attributes(&self, out: &mut [f32]) {
        out[NORMAL_OFFSET..NORMAL_OFFSET + 3].copy_from_slice(self.normal.as_slice());
        out[TANGENT_OFFSET..TANGENT_OFFSET + 3].copy_from_slice(self.tangents[0].as_slice());
        out[TANGENT_OFFSET + 3..TANGENT_OFFSET + 6].copy_from_slice(self.tangents[1].as_slice());
        out[COLOR_OFFSET..COLOR_OFFSET + 4].copy_from_slice(&self.color.to_array());
        for (channel, uv) in self.tex_coords.iter().enumerate() {
            let offset = TEX_COORD_OFFSET + channel * 2;
            out[offset..offset + 2].copy_from_slice(uv.as_slice());
        }
    }

    fn write_attributes(&mut self, values: &[f32]) {
        self.normal = Vector3f::from_column_slice(&values[NORMAL_OFFSET..NORMAL_OFFSET + 3]);
        self.tangents[0] = Vector3f::from_column_slice(&values[TANGENT_OFFSET..TANGENT_OFFSET + 3]);
        self.tangents[1] =
            Vector3f::from_column_slice(&values[TANGENT_OFFSET + 3..TANGENT_OFFSET + 6]);
        let mut rgba = [0.0; 4];
        rgba.copy_from_slice(&values[COLOR_OFFSET..COLOR_OFFSET + 4]);
        self.color = LinearColor::from_array(rgba);
        for (channel, uv) in self.tex_coords.iter_mut().enumerate() {
            let offset = TEX_COORD_OFFSET + channel * 2;
            *uv = Vector2f::new(values[offset], values[offset + 1]);
        }
    }

    fn correct(&mut self) {
        SimplifierVertex::correct(self);
    }
}
