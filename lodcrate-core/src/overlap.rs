//! Overlapping corner detection
//!
//! Wedges are distinct triangle corners, but many of them sit on the same
//! physical position. The multi-map built here lists, for each wedge, the
//! other wedges sharing its position so that vertex deduplication only has
//! to compare against a handful of candidates.

use crate::compare::points_equal;
use crate::mesh::RawMesh;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Multi-map from a wedge index to the wedges overlapping it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlappingCorners {
    corners: HashMap<u32, Vec<u32>>,
}

impl OverlappingCorners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `value` overlaps `key`. The reverse pair is not implied.
    pub fn add(&mut self, key: u32, value: u32) {
        self.corners.entry(key).or_default().push(value);
    }

    /// All wedges recorded against `key`, in insertion order.
    pub fn multi_find(&self, key: u32) -> &[u32] {
        self.corners.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of key/value pairs.
    pub fn len(&self) -> usize {
        self.corners.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.corners.is_empty()
    }

    pub fn clear(&mut self) {
        self.corners.clear();
    }
}

/// Build the overlap table for every wedge of `mesh`.
///
/// Wedges are sorted by the z coordinate of their position; each one is
/// compared only against the following wedges whose z lies within
/// `threshold`. Matches are added in both directions. A threshold of zero
/// only links bit-identical positions.
pub fn find_overlapping_corners(mesh: &RawMesh, threshold: f32) -> OverlappingCorners {
    let mut by_z: Vec<(u32, f32)> = (0..mesh.num_wedges())
        .map(|wedge| (wedge as u32, mesh.wedge_position(wedge).z))
        .collect();
    by_z.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut overlapping = OverlappingCorners::new();
    for i in 0..by_z.len() {
        let (wedge_a, z_a) = by_z[i];
        let position_a = mesh.wedge_position(wedge_a as usize);
        for &(wedge_b, z_b) in &by_z[i + 1..] {
            if (z_b - z_a).abs() > threshold {
                break;
            }
            let position_b = mesh.wedge_position(wedge_b as usize);
            if points_equal(&position_a, &position_b, threshold) {
                overlapping.add(wedge_a, wedge_b);
                overlapping.add(wedge_b, wedge_a);
            }
        }
    }
    overlapping
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::Point3f;

    /// Two triangles sharing an edge, with positions duplicated per wedge.
    fn make_split_quad() -> RawMesh {
        let corners = [
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(1.0, 1.0, 0.0),
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 1.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
        ];
        let mut mesh = RawMesh::new();
        mesh.vertex_positions = corners.to_vec();
        mesh.wedge_indices = (0..6).collect();
        mesh.face_material_indices = vec![0, 0];
        mesh
    }

    #[test]
    fn test_multi_map_basics() {
        let mut map = OverlappingCorners::new();
        assert!(map.is_empty());
        map.add(3, 1);
        map.add(3, 0);
        map.add(1, 3);
        assert_eq!(map.multi_find(3), &[1, 0]);
        assert_eq!(map.multi_find(1), &[3]);
        assert!(map.multi_find(42).is_empty());
        assert_eq!(map.len(), 3);
        map.clear();
        assert!(map.is_empty());
    }

    #[test]
    fn test_shared_positions_link_both_ways() {
        let mesh = make_split_quad();
        let map = find_overlapping_corners(&mesh, 0.0);
        assert_eq!(map.multi_find(0), &[3]);
        assert_eq!(map.multi_find(3), &[0]);
        assert_eq!(map.multi_find(2), &[4]);
        assert_eq!(map.multi_find(4), &[2]);
        assert!(map.multi_find(1).is_empty());
        assert!(map.multi_find(5).is_empty());
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_threshold_merges_nearby_positions() {
        let mut mesh = make_split_quad();
        mesh.vertex_positions[3] = Point3f::new(0.00001, 0.0, 0.00001);

        assert!(find_overlapping_corners(&mesh, 0.0).multi_find(0).is_empty());
        let map = find_overlapping_corners(&mesh, crate::compare::THRESH_POINTS_ARE_SAME);
        assert_eq!(map.multi_find(0), &[3]);
    }
}
