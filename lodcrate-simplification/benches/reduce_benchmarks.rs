//! Benchmarks for quadric mesh reduction on wedge-split grids

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lodcrate_core::{find_overlapping_corners, Point3f, RawMesh, Vector2f, Vector3f, THRESH_POINTS_ARE_SAME};
use lodcrate_simplification::{MeshReduction, QuadricMeshReduction, ReductionSettings};

fn generate_grid_mesh(size: usize) -> RawMesh {
    let mut mesh = RawMesh::new();
    for y in 0..size {
        for x in 0..size {
            let fx = x as f32 / (size - 1) as f32 * std::f32::consts::PI;
            let fy = y as f32 / (size - 1) as f32 * std::f32::consts::PI;
            mesh.vertex_positions.push(Point3f::new(
                x as f32,
                y as f32,
                (fx.sin() * fy.sin()) * 2.0,
            ));
        }
    }
    for y in 0..(size - 1) {
        for x in 0..(size - 1) {
            let tl = (y * size + x) as u32;
            let tr = tl + 1;
            let bl = ((y + 1) * size + x) as u32;
            let br = bl + 1;
            mesh.wedge_indices.extend([tl, bl, tr, tr, bl, br]);
            let material = if x < size / 2 { 0 } else { 1 };
            mesh.face_material_indices.extend([material, material]);
        }
    }
    let num_wedges = mesh.wedge_indices.len();
    mesh.wedge_tangent_x = vec![Vector3f::x(); num_wedges];
    mesh.wedge_tangent_y = vec![Vector3f::y(); num_wedges];
    mesh.wedge_tangent_z = vec![Vector3f::z(); num_wedges];
    mesh.wedge_tex_coords[0] = mesh
        .wedge_indices
        .iter()
        .map(|&i| {
            let p = mesh.vertex_positions[i as usize];
            Vector2f::new(p.x / size as f32, p.y / size as f32)
        })
        .collect();
    mesh
}

fn bench_reduction(c: &mut Criterion) {
    let sizes = [10, 20, 40];
    let ratios = [0.3, 0.5, 0.7];

    let mut group = c.benchmark_group("reduction");
    let reduction = QuadricMeshReduction::new();

    for &size in &sizes {
        let mesh = generate_grid_mesh(size);
        let overlapping = find_overlapping_corners(&mesh, THRESH_POINTS_ARE_SAME);
        let face_count = mesh.num_faces();

        for &ratio in &ratios {
            let settings = ReductionSettings::with_percent_triangles(ratio);
            group.bench_with_input(
                BenchmarkId::new(
                    "quadric",
                    format!("{}f_r{}", face_count, (ratio * 100.0) as u32),
                ),
                &(&mesh, &overlapping, &settings),
                |b, &(mesh, overlapping, settings)| {
                    b.iter(|| {
                        let result = reduction
                            .reduce(black_box(mesh), overlapping, settings)
                            .unwrap();
                        black_box(result);
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_overlapping_corners(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlapping_corners");
    for &size in &[20usize, 40, 80] {
        let mesh = generate_grid_mesh(size);
        group.bench_with_input(BenchmarkId::from_parameter(mesh.num_wedges()), &mesh, |b, mesh| {
            b.iter(|| black_box(find_overlapping_corners(black_box(mesh), THRESH_POINTS_ARE_SAME)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_reduction, bench_overlapping_corners);
criterion_main!(benches);
