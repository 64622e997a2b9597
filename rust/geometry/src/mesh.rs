// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Attributed domain mesh and its builder.
//!
//! The builder unions the building footprints, triangulates the whole
//! computation domain (open ground, building solids and courtyards as
//! separate constrained regions), tags each triangle with the building that
//! contains its barycenter and derives the triangle adjacency graph. The
//! result is the geometry every occlusion and receiver-grid consumer works
//! from.

use nalgebra::{Point2, Point3};
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::contour::{
    ensure_ccw, interior_point, is_valid_contour, orientation, point_in_contour, Envelope,
    EPSILON_2D,
};
use crate::footprint::{footprint_tree, merge_footprints, Footprint};
use crate::triangulation::{EarcutTessellator, Tessellate};
use crate::{Error, Result};

/// Neighbor slot value for a domain boundary edge
pub const NO_NEIGHBOR: i32 = -1;

/// A mesh triangle: three CCW vertex indices plus the building attribute.
/// Attribute 0 marks open ground, values >= 1 are 1-based indices into the
/// merged footprint list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Triangle {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub attribute: u32,
}

impl Triangle {
    pub fn new(a: u32, b: u32, c: u32, attribute: u32) -> Self {
        Self { a, b, c, attribute }
    }

    /// Vertex index at slot `k` (0, 1 or 2).
    #[inline]
    pub fn vertex(&self, k: usize) -> u32 {
        match k {
            0 => self.a,
            1 => self.b,
            _ => self.c,
        }
    }

    #[inline]
    pub fn vertices(&self) -> [u32; 3] {
        [self.a, self.b, self.c]
    }
}

/// Triangulated computation domain.
///
/// Vertices are owned here and referenced by index everywhere else. The
/// optional `neighbors` list is parallel to `triangles`; entry `i` slot `k`
/// holds the index of the triangle sharing the edge opposite vertex `k`, or
/// [`NO_NEIGHBOR`] on the domain boundary.
#[derive(Clone, Debug, Default)]
pub struct DomainMesh {
    pub vertices: Vec<Point3<f64>>,
    pub triangles: Vec<Triangle>,
    pub neighbors: Option<Vec<[i32; 3]>>,
}

impl DomainMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Planar (x, y) position of a vertex.
    pub fn vertex_2d(&self, index: u32) -> Point2<f64> {
        let v = &self.vertices[index as usize];
        Point2::new(v.x, v.y)
    }

    /// Barycenter of a triangle in the plane.
    pub fn barycenter(&self, triangle: &Triangle) -> Point2<f64> {
        let a = self.vertex_2d(triangle.a);
        let b = self.vertex_2d(triangle.b);
        let c = self.vertex_2d(triangle.c);
        Point2::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0)
    }
}

/// Builder for [`DomainMesh`].
///
/// Feed raw footprints and optional topographic points, then call
/// [`MeshBuilder::build`] with the domain envelope. Building polygons are
/// merged before triangulation; the merged list stays available afterwards
/// for visibility indexing.
pub struct MeshBuilder {
    footprints: Vec<Footprint>,
    merged: Vec<Footprint>,
    topo_points: Vec<Point3<f64>>,
    compute_neighbors: bool,
    maximum_area: f64,
    minimum_edge_length: f64,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self {
            footprints: Vec::new(),
            merged: Vec::new(),
            topo_points: Vec::new(),
            compute_neighbors: true,
            maximum_area: 0.0,
            minimum_edge_length: 0.0,
        }
    }

    /// Add a building footprint (merged with overlapping ones at build time).
    pub fn add_footprint(&mut self, footprint: Footprint) {
        self.footprints.push(footprint);
    }

    /// Add a scattered topographic point. An undefined z becomes 0.
    pub fn add_topographic_point(&mut self, point: Point3<f64>) {
        let z = if point.z.is_nan() { 0.0 } else { point.z };
        self.topo_points.push(Point3::new(point.x, point.y, z));
    }

    /// Bound the maximum triangle area of the refinement pass.
    /// Zero (the default) disables refinement.
    pub fn set_maximum_area(&mut self, maximum_area: f64) {
        self.maximum_area = maximum_area.max(0.0);
    }

    /// Lower bound on edge length during refinement; splits that would
    /// produce shorter edges are skipped.
    pub fn set_minimum_edge_length(&mut self, minimum_edge_length: f64) {
        self.minimum_edge_length = minimum_edge_length.max(0.0);
    }

    pub fn set_compute_neighbors(&mut self, compute_neighbors: bool) {
        self.compute_neighbors = compute_neighbors;
    }

    /// Merged footprints, available after [`MeshBuilder::build`].
    pub fn merged_footprints(&self) -> &[Footprint] {
        &self.merged
    }

    /// Take ownership of the merged footprints (e.g. to build a visibility
    /// index without cloning).
    pub fn take_merged_footprints(&mut self) -> Vec<Footprint> {
        std::mem::take(&mut self.merged)
    }

    /// Build the mesh with the default earcutr backend.
    pub fn build(&mut self, domain: Envelope) -> Result<DomainMesh> {
        self.build_with(&EarcutTessellator, domain)
    }

    /// Build the mesh over `domain` with an explicit tessellation backend.
    ///
    /// The domain envelope must cover every footprint; footprints escaping it
    /// are not subtracted from the ground region and are reported with a
    /// warning.
    pub fn build_with<T: Tessellate>(
        &mut self,
        tessellator: &T,
        domain: Envelope,
    ) -> Result<DomainMesh> {
        if domain.width() <= EPSILON_2D || domain.height() <= EPSILON_2D {
            return Err(Error::InvalidDomain(
                "Domain envelope has no area".to_string(),
            ));
        }

        self.merged = merge_footprints(&self.footprints);
        let mut assembly = MeshAssembly::default();

        // Which footprints sit inside another footprint's courtyard? Those
        // must be subtracted from the courtyard region, not from the domain.
        let nested = self.nested_flags();

        // Open ground: the domain rectangle minus the top-level buildings
        let mut domain_holes: Vec<Vec<Point2<f64>>> = Vec::new();
        for (id, footprint) in self.merged.iter().enumerate() {
            if nested[id] {
                continue;
            }
            if let Some(ring) = validated_hole(&footprint.contour) {
                if ring.iter().all(|p| domain.contains(*p)) {
                    domain_holes.push(ring);
                } else {
                    warn!(building = id, "footprint escapes the domain envelope, kept as ground");
                }
            } else {
                warn!(building = id, "degenerate footprint dropped from ground region");
            }
        }
        assembly.add_region(tessellator, &domain.to_contour(), &domain_holes)?;

        // Building solids (exterior minus courtyards) and courtyard ground
        for (id, footprint) in self.merged.iter().enumerate() {
            let mut courtyards: Vec<Vec<Point2<f64>>> = Vec::new();
            for hole in &footprint.holes {
                match validated_hole(hole) {
                    Some(ring) => courtyards.push(ring),
                    None => warn!(building = id, "degenerate courtyard hole dropped"),
                }
            }
            assembly.add_region(tessellator, &ensure_ccw(&footprint.contour), &courtyards)?;

            for courtyard in &courtyards {
                // Ground inside the courtyard, minus any nested buildings
                let nested_holes: Vec<Vec<Point2<f64>>> = self
                    .merged
                    .iter()
                    .enumerate()
                    .filter(|(other, f)| {
                        nested[*other]
                            && representative_point(&f.contour)
                                .map(|p| point_in_contour(p, courtyard))
                                .unwrap_or(false)
                    })
                    .filter_map(|(_, f)| validated_hole(&f.contour))
                    .collect();
                assembly.add_region(tessellator, &ensure_ccw(courtyard), &nested_holes)?;
            }
        }

        if assembly.triangles.is_empty() {
            return Err(Error::EmptyMesh(
                "Tessellation produced no triangles".to_string(),
            ));
        }

        // Resolve building attributes by barycenter containment
        let tree = footprint_tree(&self.merged);
        for triangle in &mut assembly.triangles {
            let bary = barycenter_of(&assembly.vertices, triangle);
            let probe = Envelope::around(bary, EPSILON_2D).aabb();
            triangle.attribute = tree
                .locate_in_envelope_intersecting(&probe)
                .find(|hit| self.merged[hit.id].contains_strict(bary))
                .map(|hit| hit.id as u32 + 1)
                .unwrap_or(0);
        }

        for point in &self.topo_points {
            assembly.insert_steiner_point(*point);
        }

        if self.maximum_area > 0.0 {
            assembly.refine(self.maximum_area, self.minimum_edge_length);
        }

        let neighbors = self.compute_neighbors.then(|| assembly.neighbors());

        Ok(DomainMesh {
            vertices: assembly.vertices,
            triangles: assembly.triangles,
            neighbors,
        })
    }

    fn nested_flags(&self) -> Vec<bool> {
        let mut nested = vec![false; self.merged.len()];
        for (id, footprint) in self.merged.iter().enumerate() {
            let Some(rep) = representative_point(&footprint.contour) else {
                continue;
            };
            nested[id] = self.merged.iter().enumerate().any(|(other, f)| {
                other != id && f.holes.iter().any(|hole| point_in_contour(rep, hole))
            });
        }
        nested
    }
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A hole ring ready for tessellation: non-degenerate and with a computable
/// interior point that does not touch the ring itself.
fn validated_hole(ring: &[Point2<f64>]) -> Option<Vec<Point2<f64>>> {
    if !is_valid_contour(ring) {
        return None;
    }
    interior_point(ring)?;
    Some(ring.to_vec())
}

fn representative_point(ring: &[Point2<f64>]) -> Option<Point2<f64>> {
    interior_point(ring).or_else(|| ring.first().copied())
}

fn barycenter_of(vertices: &[Point3<f64>], t: &Triangle) -> Point2<f64> {
    let a = &vertices[t.a as usize];
    let b = &vertices[t.b as usize];
    let c = &vertices[t.c as usize];
    Point2::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0)
}

/// Incremental mesh assembly: vertex dedup, triangle collection, point
/// insertion, refinement and adjacency.
#[derive(Default)]
struct MeshAssembly {
    vertices: Vec<Point3<f64>>,
    triangles: Vec<Triangle>,
    // Exact-coordinate dedup, first-seen index wins
    index_of: FxHashMap<(u64, u64), u32>,
}

impl MeshAssembly {
    fn get_or_append_vertex(&mut self, p: Point2<f64>, z: f64) -> u32 {
        let key = (p.x.to_bits(), p.y.to_bits());
        if let Some(&index) = self.index_of.get(&key) {
            return index;
        }
        let index = self.vertices.len() as u32;
        self.vertices.push(Point3::new(p.x, p.y, z));
        self.index_of.insert(key, index);
        index
    }

    /// Tessellate one region and append its triangles (attribute resolved
    /// later by barycenter containment).
    fn add_region<T: Tessellate>(
        &mut self,
        tessellator: &T,
        outer: &[Point2<f64>],
        holes: &[Vec<Point2<f64>>],
    ) -> Result<()> {
        let indices = tessellator.tessellate(outer, holes)?;

        // Local tessellation indices reference outer ++ holes
        let mut flat: Vec<Point2<f64>> = Vec::with_capacity(
            outer.len() + holes.iter().map(|h| h.len()).sum::<usize>(),
        );
        flat.extend_from_slice(outer);
        for hole in holes {
            flat.extend_from_slice(hole);
        }

        for tri in indices.chunks_exact(3) {
            let pa = flat[tri[0]];
            let pb = flat[tri[1]];
            let pc = flat[tri[2]];
            let area2 = orientation(pa, pb, pc);
            if area2.abs() <= 1e-12 {
                continue;
            }
            let a = self.get_or_append_vertex(pa, 0.0);
            let b = self.get_or_append_vertex(pb, 0.0);
            let c = self.get_or_append_vertex(pc, 0.0);
            // Normalize to counter-clockwise
            let triangle = if area2 > 0.0 {
                Triangle::new(a, b, c, 0)
            } else {
                Triangle::new(a, c, b, 0)
            };
            self.triangles.push(triangle);
        }
        Ok(())
    }

    /// Insert a scattered point by splitting its containing triangle in
    /// three. Points that coincide with an existing vertex, rest on an edge
    /// or fall outside every triangle are skipped; constraint edges are never
    /// touched.
    fn insert_steiner_point(&mut self, point: Point3<f64>) {
        let p = Point2::new(point.x, point.y);
        if self.index_of.contains_key(&(p.x.to_bits(), p.y.to_bits())) {
            return;
        }
        let host = self.triangles.iter().position(|t| {
            let a = plane(&self.vertices[t.a as usize]);
            let b = plane(&self.vertices[t.b as usize]);
            let c = plane(&self.vertices[t.c as usize]);
            strictly_inside_triangle(p, a, b, c)
        });
        let Some(host) = host else {
            return;
        };
        let Triangle { a, b, c, attribute } = self.triangles[host];
        let v = self.get_or_append_vertex(p, point.z);
        self.triangles[host] = Triangle::new(a, b, v, attribute);
        self.triangles.push(Triangle::new(b, c, v, attribute));
        self.triangles.push(Triangle::new(c, a, v, attribute));
    }

    /// Centroid-split every triangle above `maximum_area`. A split is skipped
    /// when it would create an edge shorter than `minimum_edge_length`. Only
    /// interior points are added, so ring edges survive untouched.
    fn refine(&mut self, maximum_area: f64, minimum_edge_length: f64) {
        let mut cursor = 0;
        while cursor < self.triangles.len() {
            let t = self.triangles[cursor];
            let a = plane(&self.vertices[t.a as usize]);
            let b = plane(&self.vertices[t.b as usize]);
            let c = plane(&self.vertices[t.c as usize]);
            let area = orientation(a, b, c).abs() / 2.0;
            if area <= maximum_area {
                cursor += 1;
                continue;
            }
            let centroid = Point2::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0);
            if minimum_edge_length > 0.0 {
                let shortest = (centroid - a)
                    .norm()
                    .min((centroid - b).norm())
                    .min((centroid - c).norm());
                if shortest < minimum_edge_length {
                    cursor += 1;
                    continue;
                }
            }
            let z = (self.vertices[t.a as usize].z
                + self.vertices[t.b as usize].z
                + self.vertices[t.c as usize].z)
                / 3.0;
            let v = self.get_or_append_vertex(centroid, z);
            self.triangles[cursor] = Triangle::new(t.a, t.b, v, t.attribute);
            self.triangles.push(Triangle::new(t.b, t.c, v, t.attribute));
            self.triangles.push(Triangle::new(t.c, t.a, v, t.attribute));
            // Re-examine the replacement in place; children queue at the back
        }
    }

    /// Shared-edge adjacency. Slot `k` of a row holds the triangle across the
    /// edge opposite vertex `k`; boundary edges keep [`NO_NEIGHBOR`].
    fn neighbors(&self) -> Vec<[i32; 3]> {
        let mut rows = vec![[NO_NEIGHBOR; 3]; self.triangles.len()];
        let mut edge_owner: FxHashMap<(u32, u32), (usize, usize)> = FxHashMap::default();
        for (index, t) in self.triangles.iter().enumerate() {
            let verts = t.vertices();
            for slot in 0..3 {
                let e0 = verts[(slot + 1) % 3];
                let e1 = verts[(slot + 2) % 3];
                let key = (e0.min(e1), e0.max(e1));
                match edge_owner.remove(&key) {
                    Some((other_index, other_slot)) => {
                        rows[index][slot] = other_index as i32;
                        rows[other_index][other_slot] = index as i32;
                    }
                    None => {
                        edge_owner.insert(key, (index, slot));
                    }
                }
            }
        }
        rows
    }
}

#[inline]
fn plane(v: &Point3<f64>) -> Point2<f64> {
    Point2::new(v.x, v.y)
}

fn strictly_inside_triangle(p: Point2<f64>, a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> bool {
    const EDGE_EPSILON: f64 = 1e-9;
    let d0 = orientation(a, b, p);
    let d1 = orientation(b, c, p);
    let d2 = orientation(c, a, p);
    (d0 > EDGE_EPSILON && d1 > EDGE_EPSILON && d2 > EDGE_EPSILON)
        || (d0 < -EDGE_EPSILON && d1 < -EDGE_EPSILON && d2 < -EDGE_EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ]
    }

    fn domain() -> Envelope {
        Envelope::new(Point2::new(-50.0, -50.0), Point2::new(50.0, 50.0))
    }

    fn mesh_area(mesh: &DomainMesh, attribute_filter: Option<u32>) -> f64 {
        mesh.triangles
            .iter()
            .filter(|t| attribute_filter.map_or(true, |a| t.attribute == a))
            .map(|t| {
                let a = mesh.vertex_2d(t.a);
                let b = mesh.vertex_2d(t.b);
                let c = mesh.vertex_2d(t.c);
                orientation(a, b, c) / 2.0
            })
            .sum()
    }

    #[test]
    fn empty_scene_covers_the_domain() {
        let mut builder = MeshBuilder::new();
        let mesh = builder.build(domain()).unwrap();
        assert!(!mesh.triangles.is_empty());
        assert!((mesh_area(&mesh, None) - 10000.0).abs() < 1e-6);
        assert!(mesh.triangles.iter().all(|t| t.attribute == 0));
    }

    #[test]
    fn building_triangles_carry_their_attribute() {
        let mut builder = MeshBuilder::new();
        builder.add_footprint(Footprint::with_height(rect(-10.0, -10.0, 10.0, 10.0), 8.0));
        let mesh = builder.build(domain()).unwrap();

        let building_area = mesh_area(&mesh, Some(1));
        assert!((building_area - 400.0).abs() < 1e-6);
        // Ground covers the rest
        let ground_area = mesh_area(&mesh, Some(0));
        assert!((ground_area - 9600.0).abs() < 1e-6);
    }

    #[test]
    fn triangles_are_counter_clockwise() {
        let mut builder = MeshBuilder::new();
        builder.add_footprint(Footprint::new(rect(0.0, 0.0, 20.0, 10.0)));
        let mesh = builder.build(domain()).unwrap();
        for t in &mesh.triangles {
            let a = mesh.vertex_2d(t.a);
            let b = mesh.vertex_2d(t.b);
            let c = mesh.vertex_2d(t.c);
            assert!(orientation(a, b, c) > 0.0);
        }
    }

    #[test]
    fn shared_vertices_are_deduplicated() {
        let mut builder = MeshBuilder::new();
        builder.add_footprint(Footprint::new(rect(0.0, 0.0, 20.0, 10.0)));
        let mesh = builder.build(domain()).unwrap();
        let mut seen = rustc_hash::FxHashSet::default();
        for v in &mesh.vertices {
            assert!(seen.insert((v.x.to_bits(), v.y.to_bits())));
        }
    }

    #[test]
    fn neighbor_rows_are_mutual() {
        let mut builder = MeshBuilder::new();
        builder.add_footprint(Footprint::new(rect(-10.0, -10.0, 10.0, 10.0)));
        let mesh = builder.build(domain()).unwrap();
        let neighbors = mesh.neighbors.as_ref().unwrap();
        assert_eq!(neighbors.len(), mesh.triangles.len());

        for (i, row) in neighbors.iter().enumerate() {
            for &n in row {
                if n != NO_NEIGHBOR {
                    let back = &neighbors[n as usize];
                    assert!(back.contains(&(i as i32)));
                }
            }
        }
        // A rectangle inside the domain: at least one boundary edge exists
        assert!(neighbors.iter().any(|row| row.contains(&NO_NEIGHBOR)));
    }

    #[test]
    fn neighbor_slots_match_opposite_vertices() {
        let mut builder = MeshBuilder::new();
        let mesh = builder.build(domain()).unwrap();
        let neighbors = mesh.neighbors.as_ref().unwrap();
        for (i, row) in neighbors.iter().enumerate() {
            let t = &mesh.triangles[i];
            for (slot, &n) in row.iter().enumerate() {
                if n == NO_NEIGHBOR {
                    continue;
                }
                // The shared edge must be the one opposite vertex `slot`
                let e0 = t.vertex((slot + 1) % 3);
                let e1 = t.vertex((slot + 2) % 3);
                let other = &mesh.triangles[n as usize];
                let shared: Vec<u32> = other
                    .vertices()
                    .iter()
                    .copied()
                    .filter(|v| *v == e0 || *v == e1)
                    .collect();
                assert_eq!(shared.len(), 2);
            }
        }
    }

    #[test]
    fn topographic_point_is_inserted() {
        let mut builder = MeshBuilder::new();
        builder.add_topographic_point(Point3::new(3.0, 4.0, 12.5));
        let mesh = builder.build(domain()).unwrap();
        let inserted = mesh
            .vertices
            .iter()
            .find(|v| v.x == 3.0 && v.y == 4.0)
            .expect("steiner point missing");
        assert_eq!(inserted.z, 12.5);
        // Insertion splits one triangle into three, coverage is unchanged
        assert!((mesh_area(&mesh, None) - 10000.0).abs() < 1e-6);
    }

    #[test]
    fn duplicate_topographic_point_is_skipped() {
        let mut builder = MeshBuilder::new();
        builder.add_topographic_point(Point3::new(3.0, 4.0, 12.5));
        builder.add_topographic_point(Point3::new(3.0, 4.0, 99.0));
        let mesh = builder.build(domain()).unwrap();
        let matches = mesh
            .vertices
            .iter()
            .filter(|v| v.x == 3.0 && v.y == 4.0)
            .count();
        assert_eq!(matches, 1);
    }

    #[test]
    fn refinement_bounds_triangle_area() {
        let mut builder = MeshBuilder::new();
        builder.set_maximum_area(250.0);
        let mesh = builder.build(domain()).unwrap();
        for t in &mesh.triangles {
            let a = mesh.vertex_2d(t.a);
            let b = mesh.vertex_2d(t.b);
            let c = mesh.vertex_2d(t.c);
            assert!(orientation(a, b, c).abs() / 2.0 <= 250.0 + 1e-6);
        }
        assert!((mesh_area(&mesh, None) - 10000.0).abs() < 1e-6);
    }

    #[test]
    fn refinement_preserves_footprint_edges() {
        let mut builder = MeshBuilder::new();
        builder.add_footprint(Footprint::new(rect(-10.0, -10.0, 10.0, 10.0)));
        builder.set_maximum_area(100.0);
        let mesh = builder.build(domain()).unwrap();
        // The building corner vertices must still exist
        for corner in [(-10.0, -10.0), (10.0, -10.0), (10.0, 10.0), (-10.0, 10.0)] {
            assert!(mesh
                .vertices
                .iter()
                .any(|v| v.x == corner.0 && v.y == corner.1));
        }
        // And the building keeps its exact area
        assert!((mesh_area(&mesh, Some(1)) - 400.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_domain_is_rejected() {
        let mut builder = MeshBuilder::new();
        let flat = Envelope::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0));
        assert!(builder.build(flat).is_err());
    }

    #[test]
    fn courtyard_is_open_ground() {
        let mut builder = MeshBuilder::new();
        let mut footprint = Footprint::new(rect(-20.0, -20.0, 20.0, 20.0));
        footprint.holes = vec![crate::contour::ensure_cw(&rect(-5.0, -5.0, 5.0, 5.0))];
        builder.add_footprint(footprint);
        let mesh = builder.build(domain()).unwrap();

        // Solid ring: 40x40 minus 10x10 courtyard
        assert!((mesh_area(&mesh, Some(1)) - 1500.0).abs() < 1e-6);
        // Courtyard plus surrounding ground
        assert!((mesh_area(&mesh, Some(0)) - 8500.0).abs() < 1e-6);
    }
}
