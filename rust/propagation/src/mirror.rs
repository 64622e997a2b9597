// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mirror-image receiver generation for specular reflection.
//!
//! Every wall that can face the receiver spawns a mirrored receiver image;
//! recursing on images up to the reflection order produces the candidate set
//! for multi-bounce paths. The records form an implicit reflection tree: an
//! arena indexed by position where each image points back at its parent, so
//! a path is reconstructed by walking parent indices to the root. No
//! obstruction test happens here; path validation is the caller's concern.

use nalgebra::Point2;

use noisefield_geometry::contour::{is_ccw, project_onto_line};
use noisefield_geometry::WallSegment;

/// One mirrored receiver image.
#[derive(Clone, Copy, Debug)]
pub struct MirrorReceiver {
    /// Mirrored coordinate
    pub position: Point2<f64>,
    /// Arena index of the parent image, `None` for first-order images
    pub parent: Option<usize>,
    /// Index of the wall this image was mirrored against
    pub wall_id: usize,
}

/// True when `wall` is oriented towards `point` (the point lies on the open
/// side of the wall).
#[inline]
pub fn wall_faces_point(wall: &WallSegment, point: Point2<f64>) -> bool {
    is_ccw(wall.p0, wall.p1, point)
}

/// True when two walls can see each other: each wall has at least one
/// endpoint on the open side of the other.
pub fn walls_face_each_other(a: &WallSegment, b: &WallSegment) -> bool {
    (is_ccw(a.p0, a.p1, b.p0) || is_ccw(a.p0, a.p1, b.p1))
        && (is_ccw(b.p0, b.p1, a.p0) || is_ccw(b.p0, b.p1, a.p1))
}

/// Reflect a point across the supporting line of a wall.
#[inline]
pub fn reflect_across(wall: &WallSegment, point: Point2<f64>) -> Point2<f64> {
    let foot = project_onto_line(point, wall.p0, wall.p1);
    Point2::new(2.0 * foot.x - point.x, 2.0 * foot.y - point.y)
}

/// Compute all receiver images reachable by 1..=`order` reflections on
/// `walls`, walls within `distance_cap` of the mirrored point only.
///
/// `image_limit` bounds the total arena size; exploration is truncated in
/// wall-enumeration order once the cap is hit, a resource bound rather than
/// any priority scheme.
pub fn mirrored_receivers(
    receiver: Point2<f64>,
    walls: &[WallSegment],
    order: u32,
    distance_cap: f64,
    image_limit: usize,
) -> Vec<MirrorReceiver> {
    let mut images = Vec::new();
    if order == 0 {
        return images;
    }
    feed_mirrored_receivers(
        &mut images,
        receiver,
        None,
        walls,
        order - 1,
        distance_cap,
        image_limit,
    );
    images
}

fn feed_mirrored_receivers(
    images: &mut Vec<MirrorReceiver>,
    position: Point2<f64>,
    parent: Option<usize>,
    walls: &[WallSegment],
    depth: u32,
    distance_cap: f64,
    image_limit: usize,
) {
    let parent_wall = parent.map(|index| images[index].wall_id);
    for (wall_id, wall) in walls.iter().enumerate() {
        if parent_wall == Some(wall_id) {
            continue;
        }
        // A wall can only mirror what it faces: the receiver itself on the
        // first level, the parent wall afterwards
        let oriented = match parent_wall {
            None => wall_faces_point(wall, position),
            Some(parent_id) => walls_face_each_other(&walls[parent_id], wall),
        };
        if !oriented {
            continue;
        }
        if wall.distance(position) >= distance_cap {
            continue;
        }
        let mirrored = reflect_across(wall, position);
        images.push(MirrorReceiver {
            position: mirrored,
            parent,
            wall_id,
        });
        if depth > 0 {
            let index = images.len() - 1;
            feed_mirrored_receivers(
                images,
                mirrored,
                Some(index),
                walls,
                depth - 1,
                distance_cap,
                image_limit,
            );
        }
        if images.len() > image_limit {
            break;
        }
    }
}
