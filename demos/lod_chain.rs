//! LOD chain example for lodcrate
//!
//! Reduces a bumpy two-material grid into a chain of LODs. Settings can be
//! passed as a JSON array of reduction settings.

use anyhow::{Context, Result};
use clap::Parser;
use lodcrate_core::{
    find_overlapping_corners, Color, Point3f, RawMesh, Vector2f, Vector3f, THRESH_POINTS_ARE_SAME,
};
use lodcrate_simplification::{
    build_lod_chain, reduce_batch, QuadricMeshReduction, ReductionJob, ReductionSettings, SimplifierParams,
};

/// Build a LOD chain from a generated grid
#[derive(Parser)]
#[command(name = "lod_chain")]
#[command(about = "Generate LODs of a procedural grid", long_about = None)]
struct Cli {
    /// Vertices per grid side
    #[arg(long, default_value_t = 64)]
    size: usize,

    /// Fraction of triangles kept by each LOD after LOD 0
    #[arg(long, value_delimiter = ',', default_values_t = vec![0.5, 0.25, 0.125])]
    ratios: Vec<f32>,

    /// JSON array of reduction settings, replacing --ratios
    #[arg(long)]
    settings: Option<String>,

    /// Weight of boundary constraint planes
    #[arg(long, default_value_t = 2.0)]
    boundary_weight: f64,

    /// Also reduce every generated LOD once more in parallel
    #[arg(long)]
    batch: bool,
}

fn create_grid(size: usize) -> RawMesh {
    let mut mesh = RawMesh::new();
    for y in 0..size {
        for x in 0..size {
            let (fx, fy) = (x as f32 / 4.0, y as f32 / 4.0);
            mesh.vertex_positions.push(Point3f::new(fx, fy, 0.3 * fx.sin() * fy.cos()));
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
    mesh.wedge_tangent_z = vec![Vector3f::z(); num_wedges];
    mesh.wedge_tex_coords[0] = mesh
        .wedge_indices
        .iter()
        .map(|&i| {
            let p = mesh.vertex_positions[i as usize];
            Vector2f::new(p.x, p.y)
        })
        .collect();
    mesh.wedge_colors = mesh
        .wedge_indices
        .iter()
        .map(|&i| Color::new((i % 256) as u8, 200, 80, 255))
        .collect();
    mesh
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    anyhow::ensure!(cli.size >= 2, "grid needs at least 2 vertices per side");

    let settings: Vec<ReductionSettings> = match &cli.settings {
        Some(json) => serde_json::from_str(json).context("failed to parse --settings")?,
        None => std::iter::once(ReductionSettings::default())
            .chain(cli.ratios.iter().map(|&r| ReductionSettings::with_percent_triangles(r)))
            .collect(),
    };

    let base = create_grid(cli.size);
    let overlapping = find_overlapping_corners(&base, THRESH_POINTS_ARE_SAME);
    let reduction = QuadricMeshReduction::with_params(SimplifierParams {
        boundary_weight: cli.boundary_weight,
        ..Default::default()
    });

    let chain = build_lod_chain(&reduction, &base, &overlapping, &settings)?;
    for (lod, result) in chain.iter().enumerate() {
        println!(
            "LOD {}: {} faces, {} vertices, max deviation {:.5}, sections {:?}{}",
            lod,
            result.mesh.num_faces(),
            result.mesh.vertex_positions.len(),
            result.max_deviation,
            result.sections,
            if result.was_reduced { "" } else { " (source)" }
        );
    }

    if cli.batch {
        let jobs: Vec<ReductionJob> = chain
            .iter()
            .map(|lod| ReductionJob::new(lod.mesh.clone(), ReductionSettings::with_percent_triangles(0.5)))
            .collect();
        for (lod, result) in reduce_batch(&reduction, &jobs).into_iter().enumerate() {
            println!("Batch {}: {}", lod, result?);
        }
    }

    Ok(())
}
