//! Core data structures for lodcrate
//!
//! This crate provides the wedge-based raw mesh consumed by reduction,
//! color conversion, overlapping corner detection and the epsilon
//! comparisons shared by every stage of LOD generation.

pub mod point;
pub mod mesh;
pub mod compare;
pub mod overlap;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use compare::*;
pub use overlap::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix3, Point3, Vector2, Vector3};
