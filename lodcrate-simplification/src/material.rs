//! Material section ordering of a simplified index buffer

use crate::vertex::SimplifierVertex;
use itertools::Itertools;

/// Regroup triangles so materials appear in ascending index order.
///
/// The simplifier is free to leave triangles of different materials
/// interleaved in any order. When the first-seen order of materials is not
/// already `0, 1, 2, ...`, triangles are bucketed per material index and
/// the buckets concatenated in ascending order. Triangle order inside a
/// material is kept. Returns whether the buffer was rewritten.
pub fn preserve_material_order(vertices: &[SimplifierVertex], indices: &mut Vec<u32>) -> bool {
    let material_of = |tri: &[u32]| vertices[tri[0] as usize].material_index;

    let unique: Vec<u32> = indices.chunks_exact(3).map(material_of).unique().collect();
    let needs_remap = unique
        .iter()
        .enumerate()
        .any(|(position, &material)| material as usize != position);
    if !needs_remap {
        return false;
    }

    let max_material = unique.iter().copied().max().unwrap_or(0) as usize;
    let mut buckets: Vec<Vec<u32>> = vec![Vec::new(); max_material + 1];
    for tri in indices.chunks_exact(3) {
        buckets[material_of(tri) as usize].extend_from_slice(tri);
    }

    indices.clear();
    for bucket in buckets {
        indices.extend(bucket);
    }
    true
}
