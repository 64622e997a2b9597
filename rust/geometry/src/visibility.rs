// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Free-field visibility queries over the obstruction geometry.
//!
//! The propagation engine consumes visibility through the [`FreeFieldTest`]
//! trait: segment occlusion, nearby wall segments for reflection, and
//! diffracting corner candidates. [`FootprintIndex`] is the reference
//! implementation working directly on the merged footprints through an
//! R-tree; grazing contact with a wall or corner counts as free.

use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::Point2;
use rstar::RTree;

use crate::contour::{point_segment_distance, Envelope, EPSILON_2D};
use crate::footprint::{footprint_tree, Footprint, FootprintEnvelope};

/// A directed wall segment.
///
/// Walls are oriented so that the open (exterior) side lies to the left of
/// the direction p0 -> p1, which lets orientation tests decide whether a wall
/// can face a point at all.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WallSegment {
    pub p0: Point2<f64>,
    pub p1: Point2<f64>,
}

impl WallSegment {
    pub fn new(p0: Point2<f64>, p1: Point2<f64>) -> Self {
        Self { p0, p1 }
    }

    pub fn length(&self) -> f64 {
        (self.p1 - self.p0).norm()
    }

    /// Distance from the segment to a point.
    pub fn distance(&self, p: Point2<f64>) -> f64 {
        point_segment_distance(p, self.p0, self.p1)
    }
}

/// Obstruction oracle consumed by the propagation engine.
///
/// Implementations must be safe to share across worker threads; the test
/// counter exists for observability only.
pub trait FreeFieldTest {
    /// True when the open segment (a, b) is not blocked by any obstruction.
    /// Contact with walls or corners without crossing into a building counts
    /// as free.
    fn is_free_field(&self, a: Point2<f64>, b: Point2<f64>) -> bool;

    /// Wall segments within `max_dist` of `point`, exterior side to the left
    /// of each directed segment, in deterministic enumeration order.
    fn walls_in_range(&self, max_dist: f64, point: Point2<f64>) -> Vec<WallSegment>;

    /// Corner points whose open angle lies strictly between `min_angle` and
    /// `max_angle` (radians), i.e. plausible diffraction edges.
    fn wide_angle_corners(&self, min_angle: f64, max_angle: f64) -> Vec<Point2<f64>>;

    /// Number of segment occlusion tests performed so far.
    fn obstruction_test_count(&self) -> u64;
}

/// Reference [`FreeFieldTest`] implementation over merged footprints.
pub struct FootprintIndex {
    footprints: Vec<Footprint>,
    tree: RTree<FootprintEnvelope>,
    tests: AtomicU64,
}

impl FootprintIndex {
    /// Build the index from merged footprints (see
    /// [`crate::footprint::merge_footprints`]).
    pub fn new(footprints: Vec<Footprint>) -> Self {
        let tree = footprint_tree(&footprints);
        Self {
            footprints,
            tree,
            tests: AtomicU64::new(0),
        }
    }

    pub fn footprints(&self) -> &[Footprint] {
        &self.footprints
    }

    fn blocked_by(&self, footprint: &Footprint, a: Point2<f64>, b: Point2<f64>) -> bool {
        if footprint.crosses_boundary(a, b) {
            return true;
        }
        // A segment can pass through the interior without a transversal edge
        // crossing (corner-to-corner chords); probe a few interior samples.
        let d = b - a;
        for t in [0.25, 0.5, 0.75] {
            let p = Point2::new(a.x + d.x * t, a.y + d.y * t);
            if footprint.contains_strict(p) {
                return true;
            }
        }
        false
    }
}

impl FreeFieldTest for FootprintIndex {
    fn is_free_field(&self, a: Point2<f64>, b: Point2<f64>) -> bool {
        self.tests.fetch_add(1, Ordering::Relaxed);
        let mut env = Envelope::new(a, a);
        env.expand_to_include(b);
        let env = env.expanded(EPSILON_2D);
        !self
            .tree
            .locate_in_envelope_intersecting(&env.aabb())
            .any(|hit| self.blocked_by(&self.footprints[hit.id], a, b))
    }

    fn walls_in_range(&self, max_dist: f64, point: Point2<f64>) -> Vec<WallSegment> {
        let env = Envelope::around(point, max_dist);
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&env.aabb())
            .map(|hit| hit.id)
            .collect();
        hits.sort_unstable();

        let mut walls = Vec::new();
        for id in hits {
            let footprint = &self.footprints[id];
            // Exterior rings are stored CCW and holes CW; reversing either
            // one puts the open side on the left of each directed edge.
            push_ring_walls(&mut walls, &footprint.contour, point, max_dist);
            for hole in &footprint.holes {
                push_ring_walls(&mut walls, hole, point, max_dist);
            }
        }
        walls
    }

    fn wide_angle_corners(&self, min_angle: f64, max_angle: f64) -> Vec<Point2<f64>> {
        let mut corners = Vec::new();
        for footprint in &self.footprints {
            // Open angle at an exterior vertex is the complement of the
            // interior angle of the solid
            collect_wide_angles(&footprint.contour, false, min_angle, max_angle, &mut corners);
            for hole in &footprint.holes {
                // Hole rings are CW; reversed they wind CCW around the
                // courtyard, whose side is the open side
                collect_wide_angles(hole, true, min_angle, max_angle, &mut corners);
            }
        }
        corners
    }

    fn obstruction_test_count(&self) -> u64 {
        self.tests.load(Ordering::Relaxed)
    }
}

fn push_ring_walls(
    walls: &mut Vec<WallSegment>,
    ring: &[Point2<f64>],
    point: Point2<f64>,
    max_dist: f64,
) {
    let n = ring.len();
    if n < 2 {
        return;
    }
    // Reversed traversal, see walls_in_range
    for i in 0..n {
        let p0 = ring[(n - i) % n];
        let p1 = ring[n - 1 - i];
        let wall = WallSegment::new(p0, p1);
        if wall.distance(point) <= max_dist {
            walls.push(wall);
        }
    }
}

fn collect_wide_angles(
    ring: &[Point2<f64>],
    is_hole: bool,
    min_angle: f64,
    max_angle: f64,
    out: &mut Vec<Point2<f64>>,
) {
    let n = ring.len();
    if n < 3 {
        return;
    }
    for i in 0..n {
        let prev = ring[(i + n - 1) % n];
        let v = ring[i];
        let next = ring[(i + 1) % n];
        let to_prev = (prev.y - v.y).atan2(prev.x - v.x);
        let to_next = (next.y - v.y).atan2(next.x - v.x);
        // Angle swept on the ring-interior side; for CCW exterior rings that
        // is the solid, for CW hole rings the courtyard
        let mut enclosed = to_prev - to_next;
        if is_hole {
            enclosed = -enclosed;
        }
        let enclosed = enclosed.rem_euclid(std::f64::consts::TAU);
        let open = if is_hole {
            enclosed
        } else {
            std::f64::consts::TAU - enclosed
        };
        if open > min_angle && open < max_angle {
            out.push(v);
        }
    }
}
