//! Epsilon comparisons shared by vertex deduplication and overlap detection

use crate::point::{Point3f, Vector2f, Vector3f};

/// Two positions closer than this on every axis are the same point.
pub const THRESH_POINTS_ARE_SAME: f32 = 0.00002;

/// Two unit vectors closer than this on every axis are the same direction.
pub const THRESH_NORMALS_ARE_SAME: f32 = 0.00002;

/// Texture coordinates closer than this on both axes are the same.
pub const THRESH_UVS_ARE_SAME: f32 = 1.0 / 1024.0;

/// Per-axis comparison of two positions against an explicit threshold.
#[inline]
pub fn points_equal(a: &Point3f, b: &Point3f, threshold: f32) -> bool {
    (a.x - b.x).abs() <= threshold
        && (a.y - b.y).abs() <= threshold
        && (a.z - b.z).abs() <= threshold
}

#[inline]
pub fn normals_equal(a: &Vector3f, b: &Vector3f) -> bool {
    (a.x - b.x).abs() <= THRESH_NORMALS_ARE_SAME
        && (a.y - b.y).abs() <= THRESH_NORMALS_ARE_SAME
        && (a.z - b.z).abs() <= THRESH_NORMALS_ARE_SAME
}

#[inline]
pub fn uvs_equal(a: &Vector2f, b: &Vector2f) -> bool {
    (a.x - b.x).abs() <= THRESH_UVS_ARE_SAME && (a.y - b.y).abs() <= THRESH_UVS_ARE_SAME
}

/// True when any component is NaN.
#[inline]
pub fn contains_nan(v: &Vector3f) -> bool {
    v.iter().any(|c| c.is_nan())
}
