// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building footprints and the footprint merger.
//!
//! Overlapping or touching building polygons make poor triangulation input,
//! so before meshing they are snapped to a fixed precision grid and unioned.
//! Each merged polygon receives the minimum known height among the original
//! footprints it intersects; minimum rather than average keeps the occlusion
//! geometry conservative.

use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use nalgebra::Point2;
use rstar::{RTree, RTreeObject, AABB};

use crate::contour::{
    ensure_ccw, ensure_cw, is_valid_contour, point_in_contour, point_segment_distance,
    segments_properly_cross, snap, snap_contour, Envelope, EPSILON_2D,
};

/// Decimal digits kept when snapping footprints to the precision grid
const PRECISION_DIGITS: i32 = 2;

/// Boundary proximity below which a point counts as lying on a ring
const BOUNDARY_EPSILON: f64 = 1e-6;

/// A building footprint: an exterior ring, optional interior courtyards and
/// an optional height.
///
/// The exterior ring is stored counter-clockwise, holes clockwise, both
/// without a closing duplicate vertex. A missing height means the building
/// still blocks horizontal visibility but exposes no known roof plane.
#[derive(Clone, Debug)]
pub struct Footprint {
    pub contour: Vec<Point2<f64>>,
    pub holes: Vec<Vec<Point2<f64>>>,
    pub height: Option<f64>,
}

impl Footprint {
    /// Footprint without a known height.
    pub fn new(contour: Vec<Point2<f64>>) -> Self {
        Self {
            contour: ensure_ccw(&contour),
            holes: Vec::new(),
            height: None,
        }
    }

    /// Footprint with a known height.
    pub fn with_height(contour: Vec<Point2<f64>>, height: f64) -> Self {
        Self {
            contour: ensure_ccw(&contour),
            holes: Vec::new(),
            height: Some(height),
        }
    }

    pub fn bounds(&self) -> Option<Envelope> {
        Envelope::from_points(&self.contour)
    }

    /// True when `p` lies strictly inside the solid part of the footprint.
    /// Boundary points (within `BOUNDARY_EPSILON` of any ring) are outside.
    pub fn contains_strict(&self, p: Point2<f64>) -> bool {
        if self.on_boundary(p) {
            return false;
        }
        if !point_in_contour(p, &self.contour) {
            return false;
        }
        !self.holes.iter().any(|hole| point_in_contour(p, hole))
    }

    /// True when `p` lies within `BOUNDARY_EPSILON` of any ring edge.
    pub fn on_boundary(&self, p: Point2<f64>) -> bool {
        ring_near(p, &self.contour) || self.holes.iter().any(|hole| ring_near(p, hole))
    }

    /// True when the open segment (a, b) crosses a ring edge transversally.
    pub fn crosses_boundary(&self, a: Point2<f64>, b: Point2<f64>) -> bool {
        ring_crossed(a, b, &self.contour) || self.holes.iter().any(|h| ring_crossed(a, b, h))
    }

    /// Overlap test against another contour: edge crossing, mutual vertex
    /// containment, or vertices resting on the other boundary all count.
    pub fn intersects_contour(&self, other: &[Point2<f64>]) -> bool {
        if ring_crossed_ring(&self.contour, other) {
            return true;
        }
        if self
            .contour
            .iter()
            .any(|p| point_in_contour(*p, other) || ring_near(*p, other))
        {
            return true;
        }
        other
            .iter()
            .any(|p| point_in_contour(*p, &self.contour) || ring_near(*p, &self.contour))
    }
}

fn ring_near(p: Point2<f64>, ring: &[Point2<f64>]) -> bool {
    let n = ring.len();
    if n < 2 {
        return false;
    }
    (0..n).any(|i| point_segment_distance(p, ring[i], ring[(i + 1) % n]) <= BOUNDARY_EPSILON)
}

fn ring_crossed(a: Point2<f64>, b: Point2<f64>, ring: &[Point2<f64>]) -> bool {
    let n = ring.len();
    if n < 2 {
        return false;
    }
    (0..n).any(|i| segments_properly_cross(a, b, ring[i], ring[(i + 1) % n]))
}

fn ring_crossed_ring(a: &[Point2<f64>], b: &[Point2<f64>]) -> bool {
    let n = a.len();
    (0..n).any(|i| ring_crossed(a[i], a[(i + 1) % n], b))
}

/// Footprint reference stored in the R-tree used for height resolution and
/// containment queries.
#[derive(Clone, Debug)]
pub(crate) struct FootprintEnvelope {
    pub(crate) id: usize,
    bounds: AABB<[f64; 2]>,
}

impl FootprintEnvelope {
    pub(crate) fn new(id: usize, env: Envelope) -> Self {
        Self {
            id,
            bounds: env.aabb(),
        }
    }
}

impl RTreeObject for FootprintEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.bounds
    }
}

/// Bulk-load an R-tree over footprint bounding boxes.
pub(crate) fn footprint_tree(footprints: &[Footprint]) -> RTree<FootprintEnvelope> {
    let items: Vec<FootprintEnvelope> = footprints
        .iter()
        .enumerate()
        .filter_map(|(id, f)| f.bounds().map(|env| FootprintEnvelope::new(id, env)))
        .collect();
    RTree::bulk_load(items)
}

/// Union overlapping footprints and resolve merged heights.
///
/// Every input ring is snapped to a centimetric precision grid, the snapped
/// shapes are unioned in a single non-zero-winding overlay pass, and each
/// merged polygon takes the minimum height among the original footprints
/// with a known height that intersect it. Returns an empty list for empty
/// input.
pub fn merge_footprints(footprints: &[Footprint]) -> Vec<Footprint> {
    if footprints.is_empty() {
        return Vec::new();
    }

    let scale = 10f64.powi(PRECISION_DIGITS);
    let snapped: Vec<Footprint> = footprints
        .iter()
        .map(|f| Footprint {
            contour: ensure_ccw(&snap_contour(&f.contour, scale)),
            holes: f.holes.iter().map(|h| ensure_cw(&snap_contour(h, scale))).collect(),
            height: f.height,
        })
        .collect();

    // All rings become the overlay subject; with non-zero winding the
    // overlapped regions stay filled, which makes a single pass a union of
    // the whole set.
    let mut subject: Vec<Vec<[f64; 2]>> = Vec::new();
    for f in &snapped {
        if f.contour.len() >= 3 {
            subject.push(contour_to_path(&f.contour));
        }
        for hole in &f.holes {
            if hole.len() >= 3 {
                subject.push(contour_to_path(hole));
            }
        }
    }
    if subject.is_empty() {
        return Vec::new();
    }
    let clip: Vec<Vec<[f64; 2]>> = Vec::new();
    let shapes = subject.overlay(&clip, OverlayRule::Union, FillRule::NonZero);

    // Interval index over the original (snapped) footprints for the height query
    let tree = footprint_tree(&snapped);

    let mut merged = Vec::with_capacity(shapes.len());
    for shape in shapes {
        let Some(outer) = shape.first() else {
            continue;
        };
        // The overlay works on its own fixed-point grid; snapping the output
        // back restores exact ring coordinates and keeps the merge idempotent
        let contour = path_to_snapped_ring(outer, scale);
        if !is_valid_contour(&contour) {
            continue;
        }
        let contour = ensure_ccw(&contour);
        let holes: Vec<Vec<Point2<f64>>> = shape[1..]
            .iter()
            .map(|c| ensure_cw(&path_to_snapped_ring(c, scale)))
            .filter(|h| is_valid_contour(h))
            .collect();

        let env = match Envelope::from_points(&contour) {
            Some(env) => env.expanded(EPSILON_2D),
            None => continue,
        };
        let mut height: Option<f64> = None;
        for hit in tree.locate_in_envelope_intersecting(&env.aabb()) {
            let original = &snapped[hit.id];
            if let Some(h) = original.height {
                if original.intersects_contour(&contour) {
                    height = Some(height.map_or(h, |prev: f64| prev.min(h)));
                }
            }
        }

        merged.push(Footprint {
            contour,
            holes,
            height,
        });
    }
    merged
}

fn contour_to_path(contour: &[Point2<f64>]) -> Vec<[f64; 2]> {
    contour.iter().map(|p| [p.x, p.y]).collect()
}

/// Overlay path back to a ring on the precision grid, dropping vertices that
/// snapping collapsed onto their predecessor (closing duplicate included).
fn path_to_snapped_ring(path: &[[f64; 2]], scale: f64) -> Vec<Point2<f64>> {
    let mut ring: Vec<Point2<f64>> = Vec::with_capacity(path.len());
    for p in path {
        let snapped = Point2::new(snap(p[0], scale), snap(p[1], scale));
        if ring.last() != Some(&snapped) {
            ring.push(snapped);
        }
    }
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}
