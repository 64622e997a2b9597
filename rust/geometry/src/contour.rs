// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D contour and segment primitives.
//!
//! Shared plane-geometry helpers used by the footprint merger, the mesh
//! builder and the visibility index: ring orientation, point containment,
//! segment intersection and axis-aligned envelopes.

use nalgebra::Point2;
use rstar::AABB;

/// Epsilon for floating point comparisons in 2D operations
pub const EPSILON_2D: f64 = 1e-9;

/// Minimum area threshold - contours smaller than this are considered degenerate
pub const MIN_AREA_THRESHOLD: f64 = 1e-10;

/// Cross product sign threshold below which three points count as collinear
const COLLINEAR_EPSILON: f64 = 1e-12;

/// Axis-aligned bounding rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl Envelope {
    pub fn new(min: Point2<f64>, max: Point2<f64>) -> Self {
        Self { min, max }
    }

    /// Smallest envelope covering all points. `None` on an empty slice.
    pub fn from_points(points: &[Point2<f64>]) -> Option<Self> {
        let first = points.first()?;
        let mut env = Envelope::new(*first, *first);
        for p in points.iter().skip(1) {
            env.expand_to_include(*p);
        }
        Some(env)
    }

    pub fn expand_to_include(&mut self, p: Point2<f64>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    /// Envelope grown by `margin` on every side.
    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            min: Point2::new(self.min.x - margin, self.min.y - margin),
            max: Point2::new(self.max.x + margin, self.max.y + margin),
        }
    }

    /// Square envelope of half-width `radius` around a point.
    pub fn around(center: Point2<f64>, radius: f64) -> Self {
        Self {
            min: Point2::new(center.x - radius, center.y - radius),
            max: Point2::new(center.x + radius, center.y + radius),
        }
    }

    pub fn contains(&self, p: Point2<f64>) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Counter-clockwise rectangle ring covering the envelope.
    pub fn to_contour(&self) -> Vec<Point2<f64>> {
        vec![
            Point2::new(self.min.x, self.min.y),
            Point2::new(self.max.x, self.min.y),
            Point2::new(self.max.x, self.max.y),
            Point2::new(self.min.x, self.max.y),
        ]
    }

    /// Conversion to the rstar envelope type.
    pub fn aabb(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.min.x, self.min.y], [self.max.x, self.max.y])
    }
}

/// Compute the signed area of a 2D contour
/// Positive = counter-clockwise, Negative = clockwise
pub fn signed_area(contour: &[Point2<f64>]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    let n = contour.len();

    for i in 0..n {
        let j = (i + 1) % n;
        area += contour[i].x * contour[j].y;
        area -= contour[j].x * contour[i].y;
    }

    area * 0.5
}

/// Ensure contour has counter-clockwise winding (positive area)
pub fn ensure_ccw(contour: &[Point2<f64>]) -> Vec<Point2<f64>> {
    if signed_area(contour) < 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Ensure contour has clockwise winding (for holes)
pub fn ensure_cw(contour: &[Point2<f64>]) -> Vec<Point2<f64>> {
    if signed_area(contour) > 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Check if a contour is valid (has area, not degenerate)
pub fn is_valid_contour(contour: &[Point2<f64>]) -> bool {
    contour.len() >= 3 && signed_area(contour).abs() > MIN_AREA_THRESHOLD
}

/// Check if a point is inside a contour using ray casting.
/// Points exactly on the boundary may land on either side; callers that care
/// must test boundary proximity separately.
pub fn point_in_contour(point: Point2<f64>, contour: &[Point2<f64>]) -> bool {
    if contour.len() < 3 {
        return false;
    }

    let mut inside = false;
    let n = contour.len();

    let mut j = n - 1;
    for i in 0..n {
        let pi = &contour[i];
        let pj = &contour[j];

        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Twice the signed area of triangle (a, b, c).
/// Positive when c lies to the left of the directed line a -> b.
#[inline]
pub fn orientation(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// True when the triangle (a, b, c) turns counter-clockwise.
#[inline]
pub fn is_ccw(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> bool {
    orientation(a, b, c) > 0.0
}

/// Proper crossing test: the open interiors of segments (a1, a2) and
/// (b1, b2) intersect in exactly one point. Shared endpoints and collinear
/// overlaps do not count.
pub fn segments_properly_cross(
    a1: Point2<f64>,
    a2: Point2<f64>,
    b1: Point2<f64>,
    b2: Point2<f64>,
) -> bool {
    let d1 = orientation(a1, a2, b1);
    let d2 = orientation(a1, a2, b2);
    let d3 = orientation(b1, b2, a1);
    let d4 = orientation(b1, b2, a2);

    if d1.abs() <= COLLINEAR_EPSILON
        || d2.abs() <= COLLINEAR_EPSILON
        || d3.abs() <= COLLINEAR_EPSILON
        || d4.abs() <= COLLINEAR_EPSILON
    {
        return false;
    }

    (d1 > 0.0) != (d2 > 0.0) && (d3 > 0.0) != (d4 > 0.0)
}

/// Intersection point of segments (a1, a2) and (b1, b2), endpoints included.
/// `None` when the segments are parallel or do not meet.
pub fn segment_intersection(
    a1: Point2<f64>,
    a2: Point2<f64>,
    b1: Point2<f64>,
    b2: Point2<f64>,
) -> Option<Point2<f64>> {
    let r = a2 - a1;
    let s = b2 - b1;
    let denom = r.x * s.y - r.y * s.x;
    if denom.abs() <= COLLINEAR_EPSILON {
        return None;
    }
    let q = b1 - a1;
    let t = (q.x * s.y - q.y * s.x) / denom;
    let u = (q.x * r.y - q.y * r.x) / denom;
    if !(-EPSILON_2D..=1.0 + EPSILON_2D).contains(&t)
        || !(-EPSILON_2D..=1.0 + EPSILON_2D).contains(&u)
    {
        return None;
    }
    Some(Point2::new(a1.x + t * r.x, a1.y + t * r.y))
}

/// Closest point to `p` on the segment (a, b).
pub fn closest_point_on_segment(p: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> Point2<f64> {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= COLLINEAR_EPSILON {
        return a;
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    Point2::new(a.x + t * ab.x, a.y + t * ab.y)
}

/// Distance from `p` to the segment (a, b).
pub fn point_segment_distance(p: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    (closest_point_on_segment(p, a, b) - p).norm()
}

/// Orthogonal projection of `p` onto the supporting line of (a, b).
/// Unlike [`closest_point_on_segment`] the result may fall outside the
/// segment itself.
pub fn project_onto_line(p: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> Point2<f64> {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= COLLINEAR_EPSILON {
        return a;
    }
    let t = (p - a).dot(&ab) / len_sq;
    Point2::new(a.x + t * ab.x, a.y + t * ab.y)
}

/// Snap a coordinate to a decimal precision grid, e.g. `scale = 100.0`
/// rounds to two decimals.
#[inline]
pub fn snap(value: f64, scale: f64) -> f64 {
    (value * scale).round() / scale
}

/// Snap every vertex of a contour to the precision grid.
pub fn snap_contour(contour: &[Point2<f64>], scale: f64) -> Vec<Point2<f64>> {
    contour
        .iter()
        .map(|p| Point2::new(snap(p.x, scale), snap(p.y, scale)))
        .collect()
}

/// A point guaranteed to lie strictly inside the contour, or `None` when the
/// contour is too degenerate to contain one. Uses a horizontal scanline
/// through the envelope midpoint, nudged when it grazes a vertex.
pub fn interior_point(contour: &[Point2<f64>]) -> Option<Point2<f64>> {
    if contour.len() < 3 {
        return None;
    }
    let env = Envelope::from_points(contour)?;
    if env.height() <= EPSILON_2D || env.width() <= EPSILON_2D {
        return None;
    }

    // Scan at mid height first, then at two offset lines if the first one
    // degenerates on a vertex or horizontal edge.
    for factor in [0.5, 0.382, 0.618] {
        let y = env.min.y + env.height() * factor;
        let mut crossings: Vec<f64> = Vec::new();
        let n = contour.len();
        let mut degenerate = false;
        for i in 0..n {
            let a = contour[i];
            let b = contour[(i + 1) % n];
            if (a.y - y).abs() <= EPSILON_2D || (b.y - y).abs() <= EPSILON_2D {
                degenerate = true;
                break;
            }
            if (a.y > y) != (b.y > y) {
                crossings.push(a.x + (y - a.y) / (b.y - a.y) * (b.x - a.x));
            }
        }
        if degenerate || crossings.len() < 2 {
            continue;
        }
        crossings.sort_by(|a, b| a.partial_cmp(b).unwrap());
        // Widest interior span gives the most robust candidate
        let mut best: Option<(f64, f64)> = None;
        for pair in crossings.chunks_exact(2) {
            let width = pair[1] - pair[0];
            if best.map(|(w, _)| width > w).unwrap_or(true) {
                best = Some((width, (pair[0] + pair[1]) / 2.0));
            }
        }
        if let Some((width, x)) = best {
            if width > EPSILON_2D {
                let candidate = Point2::new(x, y);
                if point_in_contour(candidate, contour) {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(size, 0.0),
            Point2::new(size, size),
            Point2::new(0.0, size),
        ]
    }

    #[test]
    fn signed_area_ccw_positive() {
        assert!((signed_area(&square(1.0)) - 1.0).abs() < EPSILON_2D);
    }

    #[test]
    fn signed_area_cw_negative() {
        let cw: Vec<_> = square(1.0).into_iter().rev().collect();
        assert!((signed_area(&cw) + 1.0).abs() < EPSILON_2D);
    }

    #[test]
    fn ensure_ccw_flips_clockwise_rings() {
        let cw: Vec<_> = square(1.0).into_iter().rev().collect();
        assert!(signed_area(&ensure_ccw(&cw)) > 0.0);
    }

    #[test]
    fn point_in_contour_basic() {
        let ring = square(10.0);
        assert!(point_in_contour(Point2::new(5.0, 5.0), &ring));
        assert!(!point_in_contour(Point2::new(15.0, 5.0), &ring));
        assert!(!point_in_contour(Point2::new(-1.0, 5.0), &ring));
    }

    #[test]
    fn proper_crossing_detected() {
        assert!(segments_properly_cross(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
            Point2::new(10.0, 0.0),
        ));
    }

    #[test]
    fn shared_endpoint_is_not_a_proper_crossing() {
        assert!(!segments_properly_cross(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
        ));
    }

    #[test]
    fn collinear_overlap_is_not_a_proper_crossing() {
        assert!(!segments_properly_cross(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(8.0, 0.0),
        ));
    }

    #[test]
    fn segment_intersection_midpoint() {
        let p = segment_intersection(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(5.0, -5.0),
            Point2::new(5.0, 5.0),
        )
        .unwrap();
        assert!((p.x - 5.0).abs() < EPSILON_2D);
        assert!(p.y.abs() < EPSILON_2D);
    }

    #[test]
    fn projection_may_leave_the_segment() {
        let p = project_onto_line(
            Point2::new(15.0, 3.0),
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
        );
        assert!((p.x - 15.0).abs() < EPSILON_2D);
        assert!(p.y.abs() < EPSILON_2D);
    }

    #[test]
    fn snap_rounds_to_grid() {
        assert_eq!(snap(1.234567, 100.0), 1.23);
        assert_eq!(snap(-0.005, 100.0), -0.01);
    }

    #[test]
    fn interior_point_inside_square() {
        let ring = square(10.0);
        let p = interior_point(&ring).unwrap();
        assert!(point_in_contour(p, &ring));
    }

    #[test]
    fn interior_point_rejects_degenerate_ring() {
        let flat = vec![
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 0.0),
            Point2::new(10.0, 0.0),
        ];
        assert!(interior_point(&flat).is_none());
    }

    #[test]
    fn envelope_expansion() {
        let env = Envelope::from_points(&square(10.0)).unwrap();
        let grown = env.expanded(5.0);
        assert_eq!(grown.min, Point2::new(-5.0, -5.0));
        assert_eq!(grown.max, Point2::new(15.0, 15.0));
        assert!(grown.contains(Point2::new(-3.0, 12.0)));
    }
}
