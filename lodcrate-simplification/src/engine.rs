//! Quadric edge-collapse simplifier
//!
//! Works on an indexed triangle list with an attribute block per vertex.
//! Edges are kept in an updatable priority queue keyed by their endpoints,
//! so every collapse only re-prices the edges around the surviving vertex.
//!
//! Vertices sharing a position (split by material, UV or normal) form a
//! group that always moves as one.

use crate::quadric::AttributeQuadric;
use crate::vertex::AttributeVertex;
use lodcrate_core::{points_equal, Error, Point3d, Point3f, Result, THRESH_POINTS_ARE_SAME};
use priority_queue::PriorityQueue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Contract of the simplifier driven by the mesh reducer.
///
/// Buffers are moved in at construction and moved back out by
/// [`SimplifierEngine::output_mesh`], so the engine never aliases caller data.
pub trait SimplifierEngine<V: AttributeVertex>: Sized {
    fn new(vertices: Vec<V>, indices: Vec<u32>, params: SimplifierParams) -> Self;

    /// One weight per attribute float; must be called before `init_costs`.
    fn set_attribute_weights(&mut self, weights: &[f32]) -> Result<()>;

    fn init_costs(&mut self);

    /// Collapse edges until at most `target_triangles` remain or the next
    /// collapse would cost more than `max_error`. Returns the largest cost
    /// actually paid.
    fn simplify_mesh(&mut self, max_error: f32, target_triangles: f32) -> f32;

    fn num_verts(&self) -> usize;

    fn num_tris(&self) -> usize;

    /// Compacted vertices and indices of the surviving triangles.
    fn output_mesh(self) -> (Vec<V>, Vec<u32>);
}

/// Tuning knobs of [`QuadricSimplifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplifierParams {
    /// Weight of the constraint planes standing on open boundary edges,
    /// multiplied by the squared edge length.
    pub boundary_weight: f64,
    /// Reject placements that flip or flatten a surviving triangle
    pub prevent_flips: bool,
}

impl Default for SimplifierParams {
    fn default() -> Self {
        Self {
            boundary_weight: 2.0,
            prevent_flips: true,
        }
    }
}

type EdgeKey = (u32, u32);

#[inline]
fn edge_key(a: u32, b: u32) -> EdgeKey {
    (a.min(b), a.max(b))
}

#[derive(Debug, Clone, Copy)]
struct EdgeCost {
    cost: f64,
}

impl PartialEq for EdgeCost {
    fn eq(&self, other: &Self) -> bool {
        self.cost.total_cmp(&other.cost) == Ordering::Equal
    }
}
impl Eq for EdgeCost {}

impl PartialOrd for EdgeCost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EdgeCost {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: smallest cost first
        other.cost.total_cmp(&self.cost)
    }
}

/// Group vertices whose positions are equal within the point epsilon.
///
/// Vertices are swept in z order so only a thin slab is compared.
fn coincident_groups<V: AttributeVertex>(vertices: &[V]) -> (Vec<Vec<u32>>, Vec<usize>) {
    let mut by_z: Vec<(u32, f32)> = vertices
        .iter()
        .enumerate()
        .map(|(i, v)| (i as u32, v.position().z))
        .collect();
    by_z.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut groups: Vec<Vec<u32>> = Vec::new();
    let mut group_of = vec![usize::MAX; vertices.len()];
    for (i, &(v, z)) in by_z.iter().enumerate() {
        if group_of[v as usize] != usize::MAX {
            continue;
        }
        let id = groups.len();
        let position = vertices[v as usize].position();
        let mut members = vec![v];
        group_of[v as usize] = id;
        for &(other, other_z) in &by_z[i + 1..] {
            if (other_z - z).abs() > THRESH_POINTS_ARE_SAME {
                break;
            }
            if group_of[other as usize] == usize::MAX
                && points_equal(&position, &vertices[other as usize].position(), THRESH_POINTS_ARE_SAME)
            {
                group_of[other as usize] = id;
                members.push(other);
            }
        }
        groups.push(members);
    }
    (groups, group_of)
}

/// Attribute-aware quadric error simplifier.
pub struct QuadricSimplifier<V: AttributeVertex> {
    params: SimplifierParams,
    vertices: Vec<V>,
    triangles: Vec<[u32; 3]>,
    triangle_alive: Vec<bool>,
    /// Live triangles around each vertex
    vertex_triangles: Vec<Vec<usize>>,
    /// Coincident vertices, indexed by `group_of`
    groups: Vec<Vec<u32>>,
    group_of: Vec<usize>,
    quadrics: Vec<AttributeQuadric>,
    weights: Vec<f64>,
    /// Attribute slots with a non-zero weight; only these are tracked
    weighted_slots: Vec<usize>,
    queue: PriorityQueue<EdgeKey, EdgeCost>,
    num_tris: usize,
    max_cost: f64,
}

impl<V: AttributeVertex> QuadricSimplifier<V> {
    #[inline]
    fn position(&self, v: u32) -> Point3d {
        let p = self.vertices[v as usize].position();
        Point3d::new(p.x as f64, p.y as f64, p.z as f64)
    }

    fn weighted_attributes(&self, v: u32, scratch: &mut [f32]) -> Vec<f64> {
        self.vertices[v as usize].read_attributes(scratch);
        self.weighted_slots
            .iter()
            .map(|&slot| scratch[slot] as f64 * self.weights[slot])
            .collect()
    }

    fn neighbors(&self, v: u32) -> BTreeSet<u32> {
        self.vertex_triangles[v as usize]
            .iter()
            .flat_map(|&t| self.triangles[t])
            .filter(|&n| n != v)
            .collect()
    }

    fn edge_alive(&self, a: u32, b: u32) -> bool {
        self.vertex_triangles[a as usize]
            .iter()
            .any(|&t| self.triangles[t].contains(&b))
    }

    fn build_quadrics(&mut self) {
        let num_slots = self.weighted_slots.len();
        self.quadrics = vec![AttributeQuadric::zero(num_slots); self.vertices.len()];
        let mut scratch = vec![0.0f32; V::NUM_ATTRIBUTES];

        for t in 0..self.triangles.len() {
            if !self.triangle_alive[t] {
                continue;
            }
            let tri = self.triangles[t];
            let positions = tri.map(|v| self.position(v));
            let attributes = tri.map(|v| self.weighted_attributes(v, &mut scratch));
            let quadric = AttributeQuadric::from_triangle(
                positions,
                [
                    attributes[0].as_slice(),
                    attributes[1].as_slice(),
                    attributes[2].as_slice(),
                ],
            );
            if let Some(quadric) = quadric {
                for &v in &tri {
                    self.quadrics[v as usize].add_assign(&quadric);
                }
            }
        }

        if self.params.boundary_weight <= 0.0 {
            return;
        }

        // Edges used by exactly one triangle are open boundaries.
        let mut edge_use: BTreeMap<EdgeKey, (usize, usize)> = BTreeMap::new();
        for t in 0..self.triangles.len() {
            if !self.triangle_alive[t] {
                continue;
            }
            let tri = self.triangles[t];
            for j in 0..3 {
                let entry = edge_use.entry(edge_key(tri[j], tri[(j + 1) % 3])).or_insert((0, t));
                entry.0 += 1;
            }
        }

        for (&(a, b), &(count, t)) in &edge_use {
            if count != 1 {
                continue;
            }
            let tri = self.triangles[t];
            let [p0, p1, p2] = tri.map(|v| self.position(v));
            let face_normal = (p1 - p0).cross(&(p2 - p0));
            let pa = self.position(a);
            let edge = self.position(b) - pa;
            let plane_normal = edge.cross(&face_normal);
            let length = plane_normal.norm();
            if length <= f64::EPSILON {
                continue;
            }
            let plane_normal = plane_normal / length;
            let d = -plane_normal.dot(&pa.coords);
            let weight = self.params.boundary_weight * edge.norm_squared();
            let constraint = AttributeQuadric::from_plane(plane_normal, d, weight, num_slots);
            self.quadrics[a as usize].add_assign(&constraint);
            self.quadrics[b as usize].add_assign(&constraint);
        }
    }

    /// Every vertex that moves when `a`-`b` collapses: both endpoints and
    /// all vertices coincident with either of them.
    fn moving_vertices(&self, a: u32, b: u32) -> Vec<u32> {
        let group_a = self.group_of[a as usize];
        let group_b = self.group_of[b as usize];
        let mut moving = self.groups[group_a].clone();
        if group_b != group_a {
            moving.extend_from_slice(&self.groups[group_b]);
        }
        moving
    }

    /// Candidate placements for collapsing `a`-`b`, cheapest first.
    ///
    /// The cost covers the quadrics of every vertex that moves with the
    /// collapse.
    fn placements(&self, a: u32, b: u32) -> Vec<(f64, Point3d)> {
        let mut quadric = AttributeQuadric::zero(self.weighted_slots.len());
        for v in self.moving_vertices(a, b) {
            quadric.add_assign(&self.quadrics[v as usize]);
        }
        let pa = self.position(a);
        let pb = self.position(b);
        let midpoint = Point3d::from((pa.coords + pb.coords) * 0.5);
        let reach = 4.0 * (pb - pa).norm();

        let mut candidates = Vec::with_capacity(4);
        if let Some(optimal) = quadric.optimal_position() {
            if (optimal - midpoint).norm() <= reach {
                candidates.push(optimal);
            }
        }
        candidates.extend([pa, pb, midpoint]);

        let mut priced: Vec<(f64, Point3d)> = candidates
            .into_iter()
            .map(|p| (quadric.evaluate(&p), p))
            .collect();
        priced.sort_by(|x, y| x.0.total_cmp(&y.0));
        priced
    }

    fn push_edge(&mut self, a: u32, b: u32) {
        if let Some(&(cost, _)) = self.placements(a, b).first() {
            self.queue.push(edge_key(a, b), EdgeCost { cost });
        }
    }

    fn rebuild_queue(&mut self) {
        self.queue.clear();
        let mut edges = BTreeSet::new();
        for t in 0..self.triangles.len() {
            if !self.triangle_alive[t] {
                continue;
            }
            let tri = self.triangles[t];
            for j in 0..3 {
                edges.insert(edge_key(tri[j], tri[(j + 1) % 3]));
            }
        }
        for (a, b) in edges {
            self.push_edge(a, b);
        }
    }

    /// True when moving every vertex of `moving` to `p` would flip, flatten
    /// or pinch a triangle that survives the collapse. Triangles holding two
    /// moving vertices collapse to a sliver and are removed, so they are
    /// not checked.
    fn placement_degrades(&self, moving: &[u32], p: &Point3d) -> bool {
        let moved = Point3f::new(p.x as f32, p.y as f32, p.z as f32);
        for &v in moving {
            for &t in &self.vertex_triangles[v as usize] {
                let tri = self.triangles[t];
                if tri.iter().filter(|&&u| moving.contains(&u)).count() > 1 {
                    continue;
                }
                let before = tri.map(|u| self.position(u));
                let after = tri.map(|u| if u == v { *p } else { self.position(u) });
                let normal_before = (before[1] - before[0]).cross(&(before[2] - before[0]));
                let normal_after = (after[1] - after[0]).cross(&(after[2] - after[0]));
                if normal_after.norm_squared() <= 1e-20 || normal_before.dot(&normal_after) <= 0.0 {
                    return true;
                }
                let corners = tri.map(|u| {
                    if u == v {
                        moved
                    } else {
                        self.vertices[u as usize].position()
                    }
                });
                if corners_pinched(&corners) {
                    return true;
                }
            }
        }
        false
    }

    fn kill_triangle(&mut self, t: usize) {
        self.triangle_alive[t] = false;
        self.num_tris -= 1;
        for v in self.triangles[t] {
            self.vertex_triangles[v as usize].retain(|&other| other != t);
        }
    }

    fn triangle_pinched(&self, t: usize) -> bool {
        corners_pinched(&self.triangles[t].map(|v| self.vertices[v as usize].position()))
    }

    /// Merge `b` into `a` and rebuild the attributes of `a` at `p` from the
    /// combined quadric. Positions are left to the caller.
    fn merge_into(&mut self, a: u32, b: u32, p: &Point3d) {
        let b_neighbors = self.neighbors(b);

        for t in std::mem::take(&mut self.vertex_triangles[b as usize]) {
            if !self.triangle_alive[t] {
                continue;
            }
            if self.triangles[t].contains(&a) {
                self.kill_triangle(t);
            } else {
                for v in self.triangles[t].iter_mut() {
                    if *v == b {
                        *v = a;
                    }
                }
                self.vertex_triangles[a as usize].push(t);
            }
        }

        let quadric = &self.quadrics[a as usize] + &self.quadrics[b as usize];
        let vertex = &mut self.vertices[a as usize];
        if !self.weighted_slots.is_empty() {
            let mut values = vec![0.0f64; self.weighted_slots.len()];
            if quadric.attributes_at(p, &mut values) {
                let mut block = vec![0.0f32; V::NUM_ATTRIBUTES];
                vertex.read_attributes(&mut block);
                for (&slot, value) in self.weighted_slots.iter().zip(values) {
                    block[slot] = (value / self.weights[slot]) as f32;
                }
                vertex.write_attributes(&block);
            }
        }
        vertex.correct();
        self.quadrics[a as usize] = quadric;

        for n in b_neighbors {
            self.queue.remove(&edge_key(b, n));
        }
    }

    /// Collapse `b` into `a` at `p`.
    ///
    /// Each vertex coincident with `b` merges into a vertex coincident with
    /// `a` when an edge joins them, otherwise it moves to `p` and joins the
    /// group of `a`.
    fn collapse(&mut self, a: u32, b: u32, p: Point3d) {
        let group_a = self.group_of[a as usize];
        let group_b = self.group_of[b as usize];

        self.merge_into(a, b, &p);
        if group_b == group_a {
            self.groups[group_a].retain(|&v| v != b);
        } else {
            for other in std::mem::take(&mut self.groups[group_b]) {
                if other == b {
                    continue;
                }
                let partner = self.groups[group_a]
                    .iter()
                    .copied()
                    .find(|&candidate| self.edge_alive(candidate, other));
                match partner {
                    Some(partner) => self.merge_into(partner, other, &p),
                    None => {
                        self.group_of[other as usize] = group_a;
                        self.groups[group_a].push(other);
                    }
                }
            }
        }

        let members = self.groups[group_a].clone();
        let moved = Point3f::new(p.x as f32, p.y as f32, p.z as f32);
        for &v in &members {
            self.vertices[v as usize].set_position(moved);
        }
        for &v in &members {
            for t in self.vertex_triangles[v as usize].clone() {
                if self.triangle_pinched(t) {
                    self.kill_triangle(t);
                }
            }
        }
        for &v in &members {
            for n in self.neighbors(v) {
                self.push_edge(v, n);
            }
        }
    }

    /// Drain the queue. Returns false if the error ceiling stopped the run.
    fn run(&mut self, max_error: f64, target_triangles: f32, force: bool) -> bool {
        while self.num_tris as f32 > target_triangles {
            let Some(((a, b), edge)) = self.queue.pop() else {
                break;
            };
            if edge.cost > max_error {
                return false;
            }
            if !self.edge_alive(a, b) {
                continue;
            }

            let moving = self.moving_vertices(a, b);
            let check = self.params.prevent_flips && !force;
            let choice = self
                .placements(a, b)
                .into_iter()
                .find(|(_, p)| !check || !self.placement_degrades(&moving, p));
            let Some((cost, p)) = choice else {
                continue;
            };
            if cost > edge.cost {
                // Cheaper placements were rejected; requeue at the real price.
                self.queue.push((a, b), EdgeCost { cost });
                continue;
            }
            if cost > max_error {
                return false;
            }
            self.collapse(a, b, p);
            self.max_cost = self.max_cost.max(cost);
        }
        true
    }

    /// Kill triangles whose corners coincide after all the moves.
    fn remove_pinched_triangles(&mut self) {
        for t in 0..self.triangles.len() {
            if self.triangle_alive[t] && self.triangle_pinched(t) {
                self.kill_triangle(t);
            }
        }
    }
}

fn corners_pinched(corners: &[Point3f; 3]) -> bool {
    points_equal(&corners[0], &corners[1], THRESH_POINTS_ARE_SAME)
        || points_equal(&corners[0], &corners[2], THRESH_POINTS_ARE_SAME)
        || points_equal(&corners[1], &corners[2], THRESH_POINTS_ARE_SAME)
}

impl<V: AttributeVertex> SimplifierEngine<V> for QuadricSimplifier<V> {
    fn new(vertices: Vec<V>, indices: Vec<u32>, params: SimplifierParams) -> Self {
        let num_vertices = vertices.len();
        let triangles: Vec<[u32; 3]> = indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        let triangle_alive: Vec<bool> = triangles
            .iter()
            .map(|t| {
                t.iter().all(|&v| (v as usize) < num_vertices)
                    && t[0] != t[1]
                    && t[1] != t[2]
                    && t[0] != t[2]
            })
            .collect();
        let num_tris = triangle_alive.iter().filter(|&&alive| alive).count();

        let mut vertex_triangles = vec![Vec::new(); num_vertices];
        for (t, tri) in triangles.iter().enumerate() {
            if triangle_alive[t] {
                for &v in tri {
                    vertex_triangles[v as usize].push(t);
                }
            }
        }

        let (groups, group_of) = coincident_groups(&vertices);

        Self {
            params,
            vertices,
            triangles,
            triangle_alive,
            vertex_triangles,
            groups,
            group_of,
            quadrics: Vec::new(),
            weights: vec![0.0; V::NUM_ATTRIBUTES],
            weighted_slots: Vec::new(),
            queue: PriorityQueue::new(),
            num_tris,
            max_cost: 0.0,
        }
    }

    fn set_attribute_weights(&mut self, weights: &[f32]) -> Result<()> {
        if weights.len() != V::NUM_ATTRIBUTES {
            return Err(Error::Algorithm(format!(
                "expected {} attribute weights, got {}",
                V::NUM_ATTRIBUTES,
                weights.len()
            )));
        }
        self.weights = weights.iter().map(|&w| w as f64).collect();
        self.weighted_slots = (0..weights.len()).filter(|&i| weights[i] != 0.0).collect();
        Ok(())
    }

    fn init_costs(&mut self) {
        self.build_quadrics();
        self.rebuild_queue();
    }

    fn simplify_mesh(&mut self, max_error: f32, target_triangles: f32) -> f32 {
        let max_error = max_error as f64;
        let start = self.num_tris;

        if self.run(max_error, target_triangles, false) && self.num_tris as f32 > target_triangles {
            debug!(
                remaining = self.num_tris,
                target = target_triangles,
                "flip-safe collapses exhausted, forcing the rest"
            );
            self.rebuild_queue();
            self.run(max_error, target_triangles, true);
        }
        self.remove_pinched_triangles();

        debug!(
            before = start,
            after = self.num_tris,
            max_error = self.max_cost,
            "edge collapse finished"
        );
        self.max_cost as f32
    }

    fn num_verts(&self) -> usize {
        self.vertex_triangles.iter().filter(|t| !t.is_empty()).count()
    }

    fn num_tris(&self) -> usize {
        self.num_tris
    }

    fn output_mesh(self) -> (Vec<V>, Vec<u32>) {
        let mut remap = vec![u32::MAX; self.vertices.len()];
        let mut vertices = Vec::with_capacity(self.num_verts());
        for (v, vertex) in self.vertices.into_iter().enumerate() {
            if !self.vertex_triangles[v].is_empty() {
                remap[v] = vertices.len() as u32;
                vertices.push(vertex);
            }
        }

        let indices = self
            .triangles
            .iter()
            .zip(&self.triangle_alive)
            .filter(|(_, &alive)| alive)
            .flat_map(|(tri, _)| tri.map(|v| remap[v as usize]))
            .collect();
        (vertices, indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertex::{SimplifierVertex, NUM_ATTRIBUTES};
    use lodcrate_core::Vector3f;

    fn vertex(x: f32, y: f32, z: f32) -> SimplifierVertex {
        SimplifierVertex {
            position: Point3f::new(x, y, z),
            normal: Vector3f::z(),
            ..Default::default()
        }
    }

    fn make_grid(size: usize, height: impl Fn(f32, f32) -> f32) -> (Vec<SimplifierVertex>, Vec<u32>) {
        let mut vertices = Vec::new();
        for y in 0..size {
            for x in 0..size {
                let (fx, fy) = (x as f32, y as f32);
                vertices.push(vertex(fx, fy, height(fx, fy)));
            }
        }
        let mut indices = Vec::new();
        for y in 0..(size - 1) {
            for x in 0..(size - 1) {
                let tl = (y * size + x) as u32;
                let tr = tl + 1;
                let bl = ((y + 1) * size + x) as u32;
                let br = bl + 1;
                indices.extend([tl, bl, tr, tr, bl, br]);
            }
        }
        (vertices, indices)
    }

    fn make_engine(vertices: Vec<SimplifierVertex>, indices: Vec<u32>) -> QuadricSimplifier<SimplifierVertex> {
        let mut engine = QuadricSimplifier::new(vertices, indices, SimplifierParams::default());
        let mut weights = [0.0f32; NUM_ATTRIBUTES];
        weights[..3].fill(16.0);
        engine.set_attribute_weights(&weights).unwrap();
        engine.init_costs();
        engine
    }

    #[test]
    fn test_weight_count_checked() {
        let (vertices, indices) = make_grid(3, |_, _| 0.0);
        let mut engine: QuadricSimplifier<SimplifierVertex> =
            QuadricSimplifier::new(vertices, indices, SimplifierParams::default());
        assert!(engine.set_attribute_weights(&[1.0; 3]).is_err());
    }

    #[test]
    fn test_construction_counts() {
        let (vertices, indices) = make_grid(4, |_, _| 0.0);
        let engine = make_engine(vertices, indices);
        assert_eq!(engine.num_tris(), 18);
        assert_eq!(engine.num_verts(), 16);
    }

    #[test]
    fn test_degenerate_input_triangles_ignored() {
        let vertices = vec![vertex(0.0, 0.0, 0.0), vertex(1.0, 0.0, 0.0), vertex(0.0, 1.0, 0.0)];
        let engine = make_engine(vertices, vec![0, 1, 2, 0, 0, 1]);
        assert_eq!(engine.num_tris(), 1);
    }

    #[test]
    fn test_no_reduction_requested() {
        let (vertices, indices) = make_grid(4, |_, _| 0.0);
        let mut engine = make_engine(vertices, indices.clone());
        let error = engine.simplify_mesh(f32::MAX, 18.0);
        assert_eq!(error, 0.0);
        let (out_vertices, out_indices) = engine.output_mesh();
        assert_eq!(out_vertices.len(), 16);
        assert_eq!(out_indices, indices);
    }

    #[test]
    fn test_reaches_target_on_curved_grid() {
        let (vertices, indices) = make_grid(8, |x, y| (x * 0.7).sin() * (y * 0.5).cos());
        let mut engine = make_engine(vertices, indices);
        let original = engine.num_tris();
        let error = engine.simplify_mesh(f32::MAX, original as f32 * 0.5);

        assert!(engine.num_tris() as f32 <= original as f32 * 0.5);
        assert!(engine.num_tris() > 0);
        assert!(error > 0.0);

        let num_tris = engine.num_tris();
        let num_verts = engine.num_verts();
        let (out_vertices, out_indices) = engine.output_mesh();
        assert_eq!(out_indices.len(), num_tris * 3);
        assert_eq!(out_vertices.len(), num_verts);
        assert!(out_indices.iter().all(|&i| (i as usize) < out_vertices.len()));
        for tri in out_indices.chunks_exact(3) {
            assert!(tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2]);
        }
    }

    #[test]
    fn test_flat_interior_collapses_are_free() {
        let (vertices, indices) = make_grid(6, |_, _| 0.0);
        let mut engine = make_engine(vertices, indices);
        // Removing a handful of interior vertices from a plane costs nothing.
        let error = engine.simplify_mesh(f32::MAX, 46.0);
        assert!(engine.num_tris() <= 46);
        assert!(error.abs() < 1e-4, "got {}", error);
    }

    #[test]
    fn test_error_ceiling_stops_early() {
        let (vertices, indices) = make_grid(6, |x, y| (x * y * 0.9).sin());
        let mut engine = make_engine(vertices, indices);
        engine.simplify_mesh(-1.0, 0.0);
        assert_eq!(engine.num_tris(), 50);
    }

    #[test]
    fn test_collapse_to_nothing() {
        let (vertices, indices) = make_grid(3, |_, _| 0.0);
        let mut engine = make_engine(vertices, indices);
        engine.simplify_mesh(f32::MAX, 0.0);
        assert_eq!(engine.num_tris(), 0);
        let (out_vertices, out_indices) = engine.output_mesh();
        assert!(out_vertices.is_empty());
        assert!(out_indices.is_empty());
    }

    /// A torus whose first ring of vertices is duplicated: the last row of
    /// triangles closes the tube onto coincident copies instead of the
    /// originals, leaving two boundary rings on top of each other.
    fn make_split_torus(segments: usize, rings: usize) -> (Vec<SimplifierVertex>, Vec<u32>) {
        use std::f32::consts::TAU;
        let (major, minor) = (3.0f32, 1.0f32);
        let mut vertices = Vec::new();
        for ring in 0..=rings {
            let v = (ring % rings) as f32 / rings as f32 * TAU;
            for segment in 0..segments {
                let u = segment as f32 / segments as f32 * TAU;
                let radius = major + minor * v.cos();
                vertices.push(SimplifierVertex {
                    position: Point3f::new(radius * u.cos(), radius * u.sin(), minor * v.sin()),
                    normal: Vector3f::new(v.cos() * u.cos(), v.cos() * u.sin(), v.sin()),
                    ..Default::default()
                });
            }
        }
        let mut indices = Vec::new();
        for ring in 0..rings {
            for segment in 0..segments {
                let next = (segment + 1) % segments;
                let a = (ring * segments + segment) as u32;
                let b = (ring * segments + next) as u32;
                let c = ((ring + 1) * segments + segment) as u32;
                let d = ((ring + 1) * segments + next) as u32;
                indices.extend([a, c, b, b, c, d]);
            }
        }
        (vertices, indices)
    }

    /// Open edges of the live triangles as sorted pairs of position bits.
    fn boundary_edges(engine: &QuadricSimplifier<SimplifierVertex>) -> Vec<[[u32; 3]; 2]> {
        let mut uses: BTreeMap<EdgeKey, usize> = BTreeMap::new();
        for (t, tri) in engine.triangles.iter().enumerate() {
            if engine.triangle_alive[t] {
                for j in 0..3 {
                    *uses.entry(edge_key(tri[j], tri[(j + 1) % 3])).or_default() += 1;
                }
            }
        }
        let bits = |v: u32| {
            let p = engine.vertices[v as usize].position;
            [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
        };
        let mut edges: Vec<[[u32; 3]; 2]> = uses
            .into_iter()
            .filter(|&(_, count)| count == 1)
            .map(|((a, b), _)| {
                let mut edge = [bits(a), bits(b)];
                edge.sort_unstable();
                edge
            })
            .collect();
        edges.sort_unstable();
        edges
    }

    #[test]
    fn test_coincident_vertices_are_grouped() {
        let vertices = vec![
            vertex(0.0, 0.0, 0.0),
            vertex(1.0, 0.0, 0.0),
            vertex(0.0, 0.0, 0.0),
            vertex(1.0, 0.0, 0.00001),
        ];
        let (groups, group_of) = coincident_groups(&vertices);
        assert_eq!(groups.len(), 2);
        assert_eq!(group_of[0], group_of[2]);
        assert_eq!(group_of[1], group_of[3]);
        assert_ne!(group_of[0], group_of[1]);
    }

    #[test]
    fn test_split_seam_stays_closed() {
        let (vertices, indices) = make_split_torus(24, 12);
        let mut engine = make_engine(vertices, indices);
        let before = boundary_edges(&engine);
        assert_eq!(before.len(), 48);

        let target = engine.num_tris() as f32 * 0.4;
        engine.simplify_mesh(f32::MAX, target);
        assert!(engine.num_tris() as f32 <= target);

        // Both copies of the seam must still trace the same edges.
        let after = boundary_edges(&engine);
        assert!(!after.is_empty());
        assert_eq!(after.len() % 2, 0);
        for pair in after.chunks_exact(2) {
            assert_eq!(pair[0], pair[1]);
        }
    }

    #[test]
    fn test_normals_stay_unit_length() {
        let (vertices, indices) = make_grid(7, |x, y| 0.3 * (x - y));
        let mut engine = make_engine(vertices, indices);
        let target = engine.num_tris() as f32 * 0.4;
        engine.simplify_mesh(f32::MAX, target);
        let (out_vertices, _) = engine.output_mesh();
        for v in out_vertices {
            assert!((v.normal.norm() - 1.0).abs() < 1e-4);
        }
    }
}
