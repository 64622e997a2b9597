// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Noise sources: spatial index, line discretization and emitter merging.
//!
//! Sources enter the engine as points or polylines with a per-band linear
//! power spectrum. During the per-receiver search, line sources are split
//! into point sub-sources whose spacing adapts to the receiver distance, and
//! near-coincident sub-sources collapse into aggregate emitters.

use nalgebra::Point2;
use rstar::{RTree, RTreeObject, AABB};
use rustc_hash::FxHashMap;

use noisefield_geometry::contour::{closest_point_on_segment, Envelope};

/// Base spacing of line-source discretization, meters
const BASE_STEP: f64 = 20.0;

/// Geometry of a noise source.
#[derive(Clone, Debug)]
pub enum SourceGeometry {
    Point(Point2<f64>),
    Line(Vec<Point2<f64>>),
}

impl SourceGeometry {
    pub fn envelope(&self) -> Option<Envelope> {
        match self {
            SourceGeometry::Point(p) => Some(Envelope::new(*p, *p)),
            SourceGeometry::Line(points) => Envelope::from_points(points),
        }
    }
}

/// A noise source with its per-band linear power spectrum.
///
/// Line sources carry power per meter; discretized sub-points scale the
/// spectrum by the length share they represent.
#[derive(Clone, Debug)]
pub struct SourceRecord {
    pub geometry: SourceGeometry,
    pub spectrum: Vec<f64>,
}

impl SourceRecord {
    pub fn point(position: Point2<f64>, spectrum: Vec<f64>) -> Self {
        Self {
            geometry: SourceGeometry::Point(position),
            spectrum,
        }
    }

    pub fn line(points: Vec<Point2<f64>>, spectrum: Vec<f64>) -> Self {
        Self {
            geometry: SourceGeometry::Line(points),
            spectrum,
        }
    }
}

struct SourceEnvelope {
    id: usize,
    bounds: AABB<[f64; 2]>,
}

impl RTreeObject for SourceEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.bounds
    }
}

/// Spatial index over source records.
#[derive(Default)]
pub struct SourceIndex {
    records: Vec<SourceRecord>,
    tree: RTree<SourceEnvelope>,
}

impl SourceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, returning its id.
    pub fn add(&mut self, record: SourceRecord) -> usize {
        let id = self.records.len();
        if let Some(env) = record.geometry.envelope() {
            self.tree.insert(SourceEnvelope {
                id,
                bounds: env.aabb(),
            });
        }
        self.records.push(record);
        id
    }

    /// Ids of records whose bounding box intersects `envelope`. Callers that
    /// expand the query region over successive passes must deduplicate.
    pub fn query(&self, envelope: &Envelope) -> impl Iterator<Item = usize> + '_ {
        self.tree
            .locate_in_envelope_intersecting(&envelope.aabb())
            .map(|s| s.id)
    }

    pub fn record(&self, id: usize) -> &SourceRecord {
        &self.records[id]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Tolerance-based 2D point dedup over a spatial hash grid.
///
/// Inserting a coordinate within `tolerance` of an already-inserted point
/// returns the existing point's index; anything farther gets a fresh index.
/// This is a flat nearest-neighbor-under-threshold dedup, not a polygon
/// join.
pub struct PointsMerge {
    tolerance: f64,
    grid: FxHashMap<(i64, i64), Vec<usize>>,
    points: Vec<Point2<f64>>,
}

impl PointsMerge {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            grid: FxHashMap::default(),
            points: Vec::new(),
        }
    }

    /// Index of an existing point within tolerance, or of the newly appended
    /// one. Compare against [`PointsMerge::len`] before the call to tell a
    /// merge from an insertion.
    pub fn get_or_append(&mut self, p: Point2<f64>) -> usize {
        let (cx, cy) = self.cell_coords(p);
        let tol_sq = self.tolerance * self.tolerance;

        // Search 3x3 neighborhood
        for dx in -1..=1 {
            for dy in -1..=1 {
                if let Some(indices) = self.grid.get(&(cx + dx, cy + dy)) {
                    for &index in indices {
                        if (self.points[index] - p).norm_squared() <= tol_sq {
                            return index;
                        }
                    }
                }
            }
        }

        let index = self.points.len();
        self.points.push(p);
        self.grid.entry((cx, cy)).or_default().push(index);
        index
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn cell_coords(&self, p: Point2<f64>) -> (i64, i64) {
        (
            (p.x / self.tolerance).floor() as i64,
            (p.y / self.tolerance).floor() as i64,
        )
    }
}

/// Discretize a polyline source into point sub-sources for one receiver.
///
/// The closest point of the line to the receiver is always emitted, so the
/// contribution converges to the direct-distance one as intervals shrink.
/// Regular points follow at one step spacing, skipping those within a step
/// of the closest point. The step shrinks with the receiver's closest
/// approach (floored at the minimum receiver distance, halved) but never
/// exceeds [`BASE_STEP`]. Returns the length share `li` each emitted point
/// represents.
pub fn split_line_into_points(
    line: &[Point2<f64>],
    receiver: Point2<f64>,
    min_receiver_distance: f64,
    points: &mut Vec<Point2<f64>>,
) -> f64 {
    let mut closest: Option<Point2<f64>> = None;
    let mut closest_dist = f64::MAX;
    let mut line_length = 0.0;
    for seg in line.windows(2) {
        line_length += (seg[1] - seg[0]).norm();
        let candidate = closest_point_on_segment(receiver, seg[0], seg[1]);
        let dist = (candidate - receiver).norm();
        if dist < closest_dist {
            closest_dist = dist;
            closest = Some(candidate);
        }
    }
    let Some(closest) = closest else {
        return 1.0;
    };

    // Close receivers get a finer discretization, bounded away from zero to
    // keep the point count in check
    let effective_dist = closest_dist.max(min_receiver_distance);
    let step = BASE_STEP.min(effective_dist / 2.0);

    points.push(closest);

    let mut target = step / 2.0;
    let mut walked = 0.0;
    for seg in line.windows(2) {
        let seg_len = (seg[1] - seg[0]).norm();
        if seg_len <= 0.0 {
            continue;
        }
        while target <= walked + seg_len {
            let t = (target - walked) / seg_len;
            let p = Point2::new(
                seg[0].x + (seg[1].x - seg[0].x) * t,
                seg[0].y + (seg[1].y - seg[0].y) * t,
            );
            if (p - closest).norm() > step {
                points.push(p);
            }
            target += step;
        }
        walked += seg_len;
    }

    if step < line_length {
        step
    } else {
        line_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_within_tolerance_returns_existing_index() {
        let mut merge = PointsMerge::new(1.0);
        let a = merge.get_or_append(Point2::new(0.0, 0.0));
        let b = merge.get_or_append(Point2::new(0.5, 0.5));
        assert_eq!(a, b);
        assert_eq!(merge.len(), 1);
    }

    #[test]
    fn merge_beyond_tolerance_appends() {
        let mut merge = PointsMerge::new(1.0);
        let a = merge.get_or_append(Point2::new(0.0, 0.0));
        let b = merge.get_or_append(Point2::new(3.0, 0.0));
        assert_ne!(a, b);
        assert_eq!(merge.len(), 2);
    }

    #[test]
    fn merge_across_grid_cells() {
        let mut merge = PointsMerge::new(1.0);
        // Two points in adjacent grid cells but within tolerance
        let a = merge.get_or_append(Point2::new(0.95, 0.0));
        let b = merge.get_or_append(Point2::new(1.05, 0.0));
        assert_eq!(a, b);
    }

    #[test]
    fn split_always_emits_the_closest_point() {
        let line = vec![Point2::new(0.0, 0.0), Point2::new(100.0, 0.0)];
        let receiver = Point2::new(37.0, 5.0);
        let mut points = Vec::new();
        split_line_into_points(&line, receiver, 1.0, &mut points);
        assert!(points
            .iter()
            .any(|p| (p.x - 37.0).abs() < 1e-9 && p.y.abs() < 1e-9));
    }

    #[test]
    fn split_length_shares_cover_the_line() {
        let line = vec![Point2::new(0.0, 0.0), Point2::new(100.0, 0.0)];
        let receiver = Point2::new(50.0, 40.0);
        let mut points = Vec::new();
        let li = split_line_into_points(&line, receiver, 1.0, &mut points);
        assert!(li > 0.0);
        // The emitted shares approximate the line length; the exclusion zone
        // around the closest point may swallow up to two extra steps
        let covered = li * points.len() as f64;
        assert!(covered >= 100.0 - 3.0 * li);
        assert!(covered <= 100.0 + li);
    }

    #[test]
    fn close_receiver_gets_finer_spacing() {
        let line = vec![Point2::new(0.0, 0.0), Point2::new(100.0, 0.0)];
        let mut coarse = Vec::new();
        let li_far = split_line_into_points(&line, Point2::new(50.0, 80.0), 1.0, &mut coarse);
        let mut fine = Vec::new();
        let li_near = split_line_into_points(&line, Point2::new(50.0, 4.0), 1.0, &mut fine);
        assert!(li_near < li_far);
        assert!(fine.len() > coarse.len());
    }

    #[test]
    fn min_receiver_distance_floors_the_spacing() {
        let line = vec![Point2::new(0.0, 0.0), Point2::new(100.0, 0.0)];
        let mut points = Vec::new();
        // Receiver on the line: spacing would collapse without the floor
        let li = split_line_into_points(&line, Point2::new(50.0, 0.0), 1.0, &mut points);
        assert!(li >= 0.5);
        assert!(points.len() < 250);
    }

    #[test]
    fn index_query_by_envelope() {
        let mut index = SourceIndex::new();
        index.add(SourceRecord::point(Point2::new(0.0, 0.0), vec![1.0]));
        index.add(SourceRecord::point(Point2::new(100.0, 0.0), vec![1.0]));
        index.add(SourceRecord::line(
            vec![Point2::new(-5.0, -5.0), Point2::new(5.0, 5.0)],
            vec![1.0],
        ));

        let near: Vec<usize> = index
            .query(&Envelope::around(Point2::new(0.0, 0.0), 10.0))
            .collect();
        assert!(near.contains(&0));
        assert!(near.contains(&2));
        assert!(!near.contains(&1));
    }
}
