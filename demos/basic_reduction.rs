//! Basic reduction example for lodcrate
//!
//! Builds a two-material UV sphere, finds its overlapping corners and
//! reduces it to a quarter of its triangles.

use lodcrate_core::{find_overlapping_corners, Point3f, RawMesh, Vector2f, Vector3f, THRESH_POINTS_ARE_SAME};
use lodcrate_simplification::{MeshReduction, QuadricMeshReduction, ReductionSettings};

/// UV sphere with per-wedge normals; the northern half uses material 0.
fn create_sphere(rings: usize, segments: usize) -> RawMesh {
    let mut mesh = RawMesh::new();
    for ring in 0..=rings {
        let theta = ring as f32 / rings as f32 * std::f32::consts::PI;
        for segment in 0..=segments {
            let phi = segment as f32 / segments as f32 * std::f32::consts::TAU;
            mesh.vertex_positions.push(Point3f::new(
                theta.sin() * phi.cos(),
                theta.sin() * phi.sin(),
                theta.cos(),
            ));
        }
    }

    let stride = (segments + 1) as u32;
    for ring in 0..rings as u32 {
        for segment in 0..segments as u32 {
            let a = ring * stride + segment;
            let b = a + stride;
            let material = if (ring as usize) < rings / 2 { 0 } else { 1 };
            if ring != 0 {
                mesh.wedge_indices.extend([a, b, a + 1]);
                mesh.face_material_indices.push(material);
            }
            if ring as usize != rings - 1 {
                mesh.wedge_indices.extend([a + 1, b, b + 1]);
                mesh.face_material_indices.push(material);
            }
        }
    }

    let positions: Vec<Point3f> = mesh
        .wedge_indices
        .iter()
        .map(|&i| mesh.vertex_positions[i as usize])
        .collect();
    mesh.wedge_tangent_z = positions.iter().map(|p| p.coords.normalize()).collect();
    mesh.wedge_tangent_x = mesh
        .wedge_tangent_z
        .iter()
        .map(|n| Vector3f::z().cross(n).try_normalize(1e-6).unwrap_or_else(Vector3f::x))
        .collect();
    mesh.wedge_tangent_y = mesh
        .wedge_tangent_z
        .iter()
        .zip(&mesh.wedge_tangent_x)
        .map(|(n, t)| n.cross(t))
        .collect();
    mesh.wedge_tex_coords[0] = positions
        .iter()
        .map(|p| Vector2f::new(p.y.atan2(p.x) / std::f32::consts::TAU + 0.5, p.z.acos() / std::f32::consts::PI))
        .collect();
    mesh
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("lodcrate Basic Reduction Example");
    println!("================================");

    let mesh = create_sphere(24, 48);
    mesh.validate()?;
    println!("Created sphere with {} faces and {} positions", mesh.num_faces(), mesh.vertex_positions.len());

    let overlapping = find_overlapping_corners(&mesh, THRESH_POINTS_ARE_SAME);
    println!("Found overlap entries for {} wedges", overlapping.len());

    let reduction = QuadricMeshReduction::new();
    let result = reduction.reduce(&mesh, &overlapping, &ReductionSettings::with_percent_triangles(0.25))?;
    println!("{}", result);
    println!("- Output vertices: {}", result.mesh.vertex_positions.len());
    println!("- Material sections: {:?}", result.mesh.unique_material_order());
    println!("- UV channels: {}", result.mesh.num_tex_coords());

    Ok(())
}
