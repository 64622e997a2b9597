// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon tessellation backend
//!
//! The mesh builder only needs one capability from a triangulation library:
//! turn a polygon with holes into triangles whose boundary edges are exactly
//! the input ring edges. The [`Tessellate`] trait is that seam; swapping the
//! library means providing another implementation. The default backend wraps
//! earcutr.

use crate::{Error, Point2, Result};

/// Abstract tessellation capability consumed by the mesh builder.
///
/// Implementations must preserve every input ring edge in the output: the
/// returned indices reference the concatenated vertex list (outer ring first,
/// then each hole in order) and no triangle edge may cross a ring.
pub trait Tessellate {
    /// Triangulate `outer` with the given holes.
    /// Returns triangle vertex indices into outer ++ holes, 3 per triangle.
    fn tessellate(&self, outer: &[Point2<f64>], holes: &[Vec<Point2<f64>>]) -> Result<Vec<usize>>;
}

/// earcutr-backed tessellation.
#[derive(Debug, Default, Clone, Copy)]
pub struct EarcutTessellator;

impl Tessellate for EarcutTessellator {
    fn tessellate(&self, outer: &[Point2<f64>], holes: &[Vec<Point2<f64>>]) -> Result<Vec<usize>> {
        let n = outer.len();
        if n < 3 {
            return Err(Error::TessellationError(
                "Need at least 3 points in outer boundary".to_string(),
            ));
        }

        // FAST PATH: Triangle - no triangulation needed
        if n == 3 && holes.is_empty() {
            return Ok(vec![0, 1, 2]);
        }

        // Flatten vertices for earcutr
        let valid_holes: Vec<&Vec<Point2<f64>>> = holes.iter().filter(|h| h.len() >= 3).collect();
        let total_points: usize = n + valid_holes.iter().map(|h| h.len()).sum::<usize>();
        let mut vertices = Vec::with_capacity(total_points * 2);
        for p in outer {
            vertices.push(p.x);
            vertices.push(p.y);
        }

        // Add holes and track their start indices
        let mut hole_indices = Vec::with_capacity(valid_holes.len());
        for hole in valid_holes {
            hole_indices.push(vertices.len() / 2);
            for p in hole {
                vertices.push(p.x);
                vertices.push(p.y);
            }
        }

        let indices = earcutr::earcut(&vertices, &hole_indices, 2)
            .map_err(|e| Error::TessellationError(format!("{:?}", e)))?;

        if indices.is_empty() {
            return Err(Error::TessellationError(
                "Tessellation produced no triangles".to_string(),
            ));
        }

        Ok(indices)
    }
}
