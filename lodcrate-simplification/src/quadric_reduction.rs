//! Quadric mesh reduction of raw wedge meshes
//!
//! Turns a triangle soup into a compact vertex/index buffer, runs the
//! attribute-aware simplifier on it and expands the result back into the
//! wedge layout, keeping material sections in ascending order.

use crate::engine::{QuadricSimplifier, SimplifierEngine, SimplifierParams};
use crate::material::preserve_material_order;
use crate::settings::{AttributeWeights, ReductionSettings};
use crate::vertex::{
    SimplifierVertex, COLOR_OFFSET, NORMAL_OFFSET, NUM_ATTRIBUTES, TANGENT_OFFSET,
    TEX_COORD_OFFSET,
};
use crate::MeshReduction;
use lodcrate_core::{
    contains_nan, points_equal, LinearColor, OverlappingCorners, RawMesh, Result, Vector2f,
    Vector3f, MAX_TEX_COORDS, THRESH_POINTS_ARE_SAME,
};
use std::collections::HashMap;
use std::marker::PhantomData;
use tracing::{debug, info};

/// Divisor turning the simplifier's error units into an approximate
/// world-space deviation. Downstream LOD distance selection depends on this
/// exact scale.
pub const DEVIATION_NORMALIZATION: f32 = 8.0;

/// Output of a reduction.
#[derive(Debug, Clone)]
pub struct ReductionResult {
    pub mesh: RawMesh,
    /// Worst-case geometric drift introduced by the reduction
    pub max_deviation: f32,
    /// Triangles handed to the simplifier after degenerate rejection
    pub source_triangles: usize,
    pub reduced_triangles: usize,
    /// Whether material sections had to be regrouped
    pub material_remapped: bool,
}

impl std::fmt::Display for ReductionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Reduction: {} -> {} triangles, max deviation {:.5}",
            self.source_triangles, self.reduced_triangles, self.max_deviation
        )
    }
}

/// Mesh reducer driving a quadric simplifier engine.
///
/// The engine type is injected; by default it is [`QuadricSimplifier`].
#[derive(Debug, Clone)]
pub struct QuadricMeshReduction<E = QuadricSimplifier<SimplifierVertex>> {
    pub params: SimplifierParams,
    engine: PhantomData<fn() -> E>,
}

impl QuadricMeshReduction {
    pub fn new() -> Self {
        Self::with_params(SimplifierParams::default())
    }

    pub fn with_params(params: SimplifierParams) -> Self {
        Self::with_engine(params)
    }
}

impl Default for QuadricMeshReduction {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: SimplifierEngine<SimplifierVertex>> QuadricMeshReduction<E> {
    /// Reducer driving the engine `E`.
    pub fn with_engine(params: SimplifierParams) -> Self {
        Self {
            params,
            engine: PhantomData,
        }
    }
}

/// Deduplicated buffers fed to the simplifier.
struct SimplifierInput {
    vertices: Vec<SimplifierVertex>,
    indices: Vec<u32>,
}

/// Build the simplifier vertex for one wedge.
fn wedge_vertex(mesh: &RawMesh, face: usize, wedge: usize) -> SimplifierVertex {
    let sanitize = |vectors: &[Vector3f]| {
        vectors
            .get(wedge)
            .copied()
            .filter(|v| !contains_nan(v))
            .unwrap_or_else(Vector3f::zeros)
    };

    let color = if mesh.has_colors() {
        LinearColor::from_srgb(mesh.wedge_colors[wedge])
    } else {
        LinearColor::TRANSPARENT
    };

    let mut tex_coords = [Vector2f::zeros(); MAX_TEX_COORDS];
    for (channel, uv) in tex_coords.iter_mut().enumerate() {
        if mesh.has_tex_coords(channel) {
            *uv = mesh.wedge_tex_coords[channel][wedge];
        }
    }

    let mut vertex = SimplifierVertex {
        material_index: mesh.face_material_indices[face] as u32,
        position: mesh.wedge_position(wedge),
        normal: sanitize(&mesh.wedge_tangent_z),
        tangents: [sanitize(&mesh.wedge_tangent_x), sanitize(&mesh.wedge_tangent_y)],
        color,
        tex_coords,
    };
    vertex.correct();
    vertex
}

/// Collapse wedges into shared vertices and drop degenerate triangles.
///
/// Wedges are visited in increasing order; a wedge may only reuse a vertex
/// created by an overlapping wedge with a smaller index.
fn build_simplifier_input(mesh: &RawMesh, overlapping: &OverlappingCorners) -> SimplifierInput {
    let num_faces = mesh.num_faces();
    let mut vertices: Vec<SimplifierVertex> = Vec::with_capacity(mesh.num_wedges());
    let mut indices: Vec<u32> = Vec::with_capacity(mesh.num_wedges());
    let mut wedge_to_vertex: HashMap<u32, u32> = HashMap::with_capacity(mesh.num_wedges());
    let mut duplicates: Vec<u32> = Vec::new();

    for face in 0..num_faces {
        let corners = [0, 1, 2].map(|corner| mesh.wedge_position(face * 3 + corner));
        if points_equal(&corners[0], &corners[1], THRESH_POINTS_ARE_SAME)
            || points_equal(&corners[0], &corners[2], THRESH_POINTS_ARE_SAME)
            || points_equal(&corners[1], &corners[2], THRESH_POINTS_ARE_SAME)
        {
            continue;
        }

        let mut face_vertices = [0u32; 3];
        for (corner, slot) in face_vertices.iter_mut().enumerate() {
            let wedge = face * 3 + corner;
            let candidate = wedge_vertex(mesh, face, wedge);

            duplicates.clear();
            duplicates.extend_from_slice(overlapping.multi_find(wedge as u32));
            duplicates.sort_unstable();

            let found = duplicates
                .iter()
                .take_while(|&&dup| (dup as usize) < wedge)
                .filter_map(|dup| wedge_to_vertex.get(dup).copied())
                .find(|&index| vertices[index as usize].equals(&candidate));

            *slot = match found {
                Some(index) => index,
                None => {
                    let index = vertices.len() as u32;
                    vertices.push(candidate);
                    wedge_to_vertex.insert(wedge as u32, index);
                    index
                }
            };
        }

        let [a, b, c] = face_vertices;
        if a == b || b == c || a == c {
            continue;
        }
        indices.extend_from_slice(&face_vertices);
    }

    SimplifierInput { vertices, indices }
}

/// Expand the per-group weights into one weight per attribute float,
/// zeroing channels the source mesh does not carry.
pub fn build_attribute_weights(weights: &AttributeWeights, mesh: &RawMesh) -> [f32; NUM_ATTRIBUTES] {
    let mut expanded = [0.0f32; NUM_ATTRIBUTES];
    expanded[NORMAL_OFFSET..NORMAL_OFFSET + 3].fill(weights.normal);
    expanded[TANGENT_OFFSET..TANGENT_OFFSET + 6].fill(weights.tangent);
    if mesh.has_colors() {
        expanded[COLOR_OFFSET..COLOR_OFFSET + 4].fill(weights.color);
    }
    for channel in 0..MAX_TEX_COORDS {
        if mesh.has_tex_coords(channel) {
            let offset = TEX_COORD_OFFSET + channel * 2;
            expanded[offset..offset + 2].fill(weights.tex_coord);
        }
    }
    expanded
}

/// Triangle budget for keeping `percent` of `source_triangles`, rounded up
/// to a whole triangle.
fn target_triangle_count(source_triangles: usize, percent: f32) -> f32 {
    (source_triangles as f32 * percent).ceil()
}

/// Expand a compact vertex/index buffer back into the wedge layout.
///
/// Optional channels are emitted only when `source` carried them.
fn build_output_mesh(source: &RawMesh, vertices: &[SimplifierVertex], indices: &[u32]) -> RawMesh {
    let num_wedges = indices.len();
    let has_colors = source.has_colors();
    let tex_channels: Vec<usize> = (0..MAX_TEX_COORDS)
        .filter(|&channel| source.has_tex_coords(channel))
        .collect();

    let mut mesh = RawMesh::new();
    mesh.vertex_positions = vertices.iter().map(|v| v.position).collect();
    mesh.wedge_indices.reserve(num_wedges);
    mesh.wedge_tangent_x.reserve(num_wedges);
    mesh.wedge_tangent_y.reserve(num_wedges);
    mesh.wedge_tangent_z.reserve(num_wedges);

    for (wedge, &index) in indices.iter().enumerate() {
        let vertex = &vertices[index as usize];
        mesh.wedge_indices.push(index);
        mesh.wedge_tangent_x.push(vertex.tangents[0]);
        mesh.wedge_tangent_y.push(vertex.tangents[1]);
        mesh.wedge_tangent_z.push(vertex.normal);
        if has_colors {
            mesh.wedge_colors.push(vertex.color.to_srgb());
        }
        for &channel in &tex_channels {
            mesh.wedge_tex_coords[channel].push(vertex.tex_coords[channel]);
        }
        if wedge % 3 == 0 {
            mesh.face_material_indices.push(vertex.material_index as i32);
            mesh.face_smoothing_masks.push(0);
        }
    }
    mesh
}

impl<E: SimplifierEngine<SimplifierVertex>> MeshReduction for QuadricMeshReduction<E> {
    fn reduce(
        &self,
        mesh: &RawMesh,
        overlapping_corners: &OverlappingCorners,
        settings: &ReductionSettings,
    ) -> Result<ReductionResult> {
        mesh.validate()?;

        let SimplifierInput { vertices, indices } = build_simplifier_input(mesh, overlapping_corners);
        let source_triangles = indices.len() / 3;
        debug!(
            faces = mesh.num_faces(),
            triangles = source_triangles,
            vertices = vertices.len(),
            uv_channels = mesh.num_tex_coords(),
            "deduplicated wedges"
        );

        let weights = build_attribute_weights(&settings.attribute_weights, mesh);
        let target_triangles = target_triangle_count(source_triangles, settings.percent_triangles);

        let mut engine = E::new(vertices, indices, self.params.clone());
        engine.set_attribute_weights(&weights)?;
        engine.init_costs();
        let max_error = engine.simplify_mesh(f32::MAX, target_triangles);
        let (vertices, mut indices) = engine.output_mesh();

        let material_remapped = preserve_material_order(&vertices, &mut indices);
        let max_deviation = max_error.max(0.0).sqrt() / DEVIATION_NORMALIZATION;
        let reduced_triangles = indices.len() / 3;

        info!(
            source = source_triangles,
            target = target_triangles,
            reduced = reduced_triangles,
            max_deviation,
            material_remapped,
            "mesh reduced"
        );

        Ok(ReductionResult {
            mesh: build_output_mesh(mesh, &vertices, &indices),
            max_deviation,
            source_triangles,
            reduced_triangles,
            material_remapped,
        })
    }
}
