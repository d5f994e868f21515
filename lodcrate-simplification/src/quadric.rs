//! Quadric error metric with attributes
//!
//! Each vertex accumulates an area-weighted quadric over position and a
//! block of weighted attributes. Attributes are not stored as full matrix
//! rows: every triangle contributes, per attribute, the gradient `g` and
//! offset `d` of the linear function interpolating that attribute across the
//! triangle plane. Minimising over the attribute values in closed form
//! leaves a 3x3 system in position only, so memory grows linearly with the
//! attribute count.

use lodcrate_core::{Point3d, Vector3d};
use nalgebra::Matrix3;

const AREA_EPSILON: f64 = 1e-12;

/// Accumulated quadric for one vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeQuadric {
    /// Quadratic term over position
    geometric: Matrix3<f64>,
    /// Linear term over position
    linear: Vector3d,
    constant: f64,
    /// Total area of the contributing triangles
    area: f64,
    /// Area-weighted attribute gradients
    gradients: Vec<Vector3d>,
    /// Area-weighted attribute offsets
    offsets: Vec<f64>,
}

impl AttributeQuadric {
    pub fn zero(num_attributes: usize) -> Self {
        Self {
            geometric: Matrix3::zeros(),
            linear: Vector3d::zeros(),
            constant: 0.0,
            area: 0.0,
            gradients: vec![Vector3d::zeros(); num_attributes],
            offsets: vec![0.0; num_attributes],
        }
    }

    /// Quadric of a triangle whose corners carry (already weighted)
    /// attribute values. Returns `None` for triangles without area.
    pub fn from_triangle(positions: [Point3d; 3], attributes: [&[f64]; 3]) -> Option<Self> {
        let num_attributes = attributes[0].len();
        let e1 = positions[1] - positions[0];
        let e2 = positions[2] - positions[0];
        let cross = e1.cross(&e2);
        let double_area = cross.norm();
        if double_area <= AREA_EPSILON {
            return None;
        }
        let area = 0.5 * double_area;
        let normal = cross / double_area;
        let plane_d = -normal.dot(&positions[0].coords);

        let mut quadric = Self::zero(num_attributes);
        quadric.geometric = normal * normal.transpose() * area;
        quadric.linear = normal * (plane_d * area);
        quadric.constant = plane_d * plane_d * area;
        quadric.area = area;

        // Rows: e1, e2, n. Solving M g = [ds1, ds2, 0] gives the in-plane gradient.
        #[rustfmt::skip]
        let basis = Matrix3::new(
            e1.x, e1.y, e1.z,
            e2.x, e2.y, e2.z,
            normal.x, normal.y, normal.z,
        );
        let inverse = basis.try_inverse()?;

        for k in 0..num_attributes {
            let s0 = attributes[0][k];
            let s1 = attributes[1][k];
            let s2 = attributes[2][k];
            if s0 == 0.0 && s1 == 0.0 && s2 == 0.0 {
                continue;
            }
            let gradient = inverse * Vector3d::new(s1 - s0, s2 - s0, 0.0);
            let offset = s0 - gradient.dot(&positions[0].coords);

            quadric.geometric += gradient * gradient.transpose() * area;
            quadric.linear += gradient * (offset * area);
            quadric.constant += offset * offset * area;
            quadric.gradients[k] = gradient * area;
            quadric.offsets[k] = offset * area;
        }

        Some(quadric)
    }

    /// Purely geometric quadric of a plane `normal . p + d = 0`, scaled by
    /// `weight`. Used for boundary constraints; it carries no area so it never
    /// biases attribute reconstruction.
    pub fn from_plane(normal: Vector3d, d: f64, weight: f64, num_attributes: usize) -> Self {
        let mut quadric = Self::zero(num_attributes);
        quadric.geometric = normal * normal.transpose() * weight;
        quadric.linear = normal * (d * weight);
        quadric.constant = d * d * weight;
        quadric
    }

    pub fn add_assign(&mut self, other: &AttributeQuadric) {
        self.geometric += other.geometric;
        self.linear += other.linear;
        self.constant += other.constant;
        self.area += other.area;
        for (g, og) in self.gradients.iter_mut().zip(&other.gradients) {
            *g += og;
        }
        for (d, od) in self.offsets.iter_mut().zip(&other.offsets) {
            *d += od;
        }
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    fn has_attributes(&self) -> bool {
        self.area > AREA_EPSILON && !self.gradients.is_empty()
    }

    /// Error at `p` with the attributes set to their optimal values.
    pub fn evaluate(&self, p: &Point3d) -> f64 {
        let v = p.coords;
        let mut error = v.dot(&(self.geometric * v)) + 2.0 * self.linear.dot(&v) + self.constant;
        if self.has_attributes() {
            let inv_area = 1.0 / self.area;
            for (gradient, offset) in self.gradients.iter().zip(&self.offsets) {
                let s = gradient.dot(&v) + offset;
                error -= s * s * inv_area;
            }
        }
        error.max(0.0)
    }

    /// Position minimising the quadric, if the reduced system is well conditioned.
    pub fn optimal_position(&self) -> Option<Point3d> {
        let mut system = self.geometric;
        let mut rhs = -self.linear;
        if self.has_attributes() {
            let inv_area = 1.0 / self.area;
            for (gradient, offset) in self.gradients.iter().zip(&self.offsets) {
                system -= gradient * gradient.transpose() * inv_area;
                rhs += gradient * (offset * inv_area);
            }
        }

        let scale = system.trace().abs();
        if scale <= AREA_EPSILON {
            return None;
        }
        let det = system.determinant();
        if det.abs() <= 1e-9 * scale * scale * scale {
            return None;
        }
        let inverse = system.try_inverse()?;
        let p = inverse * rhs;
        p.iter().all(|c| c.is_finite()).then(|| Point3d::from(p))
    }

    /// Reconstruct the optimal (weighted) attribute values at `p` into `out`.
    /// Returns false when the quadric carries no attribute information.
    pub fn attributes_at(&self, p: &Point3d, out: &mut [f64]) -> bool {
        if !self.has_attributes() {
            return false;
        }
        let inv_area = 1.0 / self.area;
        for ((value, gradient), offset) in out.iter_mut().zip(&self.gradients).zip(&self.offsets) {
            *value = (gradient.dot(&p.coords) + offset) * inv_area;
        }
        true
    }
}

impl std::ops::Add for &AttributeQuadric {
    type Output = AttributeQuadric;

    fn add(self, other: &AttributeQuadric) -> AttributeQuadric {
        let mut result = self.clone();
        result.add_assign(other);
        result
    }
}
