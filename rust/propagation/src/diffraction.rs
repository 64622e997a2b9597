// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Corner-graph search for diffracted paths.
//!
//! Chains of wide-angle corners connect an occluded receiver to a source:
//! receiver -> corner -> ... -> corner -> source, every hop free-field. The
//! walk is depth-first over the corner candidates in insertion order with
//! simple backtracking: extend while the chain is shorter than the
//! diffraction order, otherwise replace the tail with the next visible
//! candidate, popping when a branch is exhausted.

use nalgebra::Point2;
use smallvec::{smallvec, SmallVec};

use noisefield_geometry::FreeFieldTest;

/// Corner chain storage; diffraction orders beyond 4 are unusual
pub(crate) type CornerChain = SmallVec<[usize; 4]>;

/// First corner index at or after `first` that is not in `exceptions` and is
/// free-field visible from `from`.
fn next_free_field_corner(
    corners: &[Point2<f64>],
    from: Point2<f64>,
    exceptions: &[usize],
    first: usize,
    free_field: &(dyn FreeFieldTest + Sync),
) -> Option<usize> {
    (first..corners.len()).find(|&candidate| {
        !exceptions.contains(&candidate) && free_field.is_free_field(from, corners[candidate])
    })
}

/// Enumerate corner chains from `receiver` towards `source`.
///
/// `receiver_visible` lists the corner indices already validated against the
/// receiver, in insertion order. `visit` runs for every chain whose final
/// corner sees the source; returning `false` stops the entire search (the
/// per-receiver path cap).
pub(crate) fn explore_corner_chains<F>(
    source: Point2<f64>,
    corners: &[Point2<f64>],
    receiver_visible: &[usize],
    order: u32,
    free_field: &(dyn FreeFieldTest + Sync),
    mut visit: F,
) where
    F: FnMut(&CornerChain) -> bool,
{
    if order == 0 || receiver_visible.is_empty() {
        return;
    }

    let mut receiver_cursor = 0usize;
    let mut chain: CornerChain = smallvec![receiver_visible[0]];

    while !chain.is_empty() {
        let last = corners[*chain.last().unwrap()];
        if free_field.is_free_field(last, source) && !visit(&chain) {
            return;
        }

        // Try to go one corner deeper first
        let mut next: Option<usize> = None;
        if order as usize > chain.len() {
            next = next_free_field_corner(corners, last, &chain, 0, free_field);
            if let Some(n) = next {
                chain.push(n);
            }
        }

        // Dead end: replace the tail with its next sibling, backtracking as
        // long as no sibling exists
        while next.is_none() && !chain.is_empty() {
            if chain.len() > 1 {
                let from = corners[chain[chain.len() - 2]];
                let after = chain.last().unwrap() + 1;
                next = next_free_field_corner(corners, from, &chain, after, free_field);
            } else {
                receiver_cursor += 1;
                next = receiver_visible.get(receiver_cursor).copied();
            }
            match next {
                Some(n) => *chain.last_mut().unwrap() = n,
                None => {
                    chain.pop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noisefield_geometry::{merge_footprints, Footprint, FootprintIndex};

    /// Validation scene: building x in [15, 30], y in [5, 30].
    fn scene() -> (FootprintIndex, Vec<Point2<f64>>) {
        let merged = merge_footprints(&[Footprint::new(vec![
            Point2::new(15.0, 5.0),
            Point2::new(30.0, 5.0),
            Point2::new(30.0, 30.0),
            Point2::new(15.0, 30.0),
        ])]);
        let index = FootprintIndex::new(merged);
        let corners = index.wide_angle_corners(
            std::f64::consts::PI * (1.0 + 1.0 / 16.0),
            std::f64::consts::PI * (2.0 - 1.0 / 16.0),
        );
        (index, corners)
    }

    fn visible_from(
        index: &FootprintIndex,
        corners: &[Point2<f64>],
        receiver: Point2<f64>,
    ) -> Vec<usize> {
        (0..corners.len())
            .filter(|&i| index.is_free_field(receiver, corners[i]))
            .collect()
    }

    fn collect_chains(
        index: &FootprintIndex,
        corners: &[Point2<f64>],
        receiver: Point2<f64>,
        source: Point2<f64>,
        order: u32,
    ) -> Vec<Vec<Point2<f64>>> {
        let visible = visible_from(index, corners, receiver);
        let mut chains = Vec::new();
        explore_corner_chains(source, corners, &visible, order, index, |chain| {
            chains.push(chain.iter().map(|&i| corners[i]).collect());
            true
        });
        chains
    }

    #[test]
    fn single_diffraction_goes_around_the_near_corner() {
        let (index, corners) = scene();
        let chains = collect_chains(
            &index,
            &corners,
            Point2::new(15.0, 40.0),
            Point2::new(40.0, 15.0),
            1,
        );
        // Only the (30, 30) corner sees both sides
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].len(), 1);
        assert_eq!(chains[0][0], Point2::new(30.0, 30.0));
    }

    #[test]
    fn double_diffraction_finds_both_flanks() {
        let (index, corners) = scene();
        let chains = collect_chains(
            &index,
            &corners,
            Point2::new(5.0, 15.0),
            Point2::new(40.0, 15.0),
            2,
        );
        // One path under the building, one over it, both with two corners
        assert_eq!(chains.len(), 2);
        assert!(chains.iter().all(|c| c.len() == 2));
        let around_bottom = chains.iter().any(|c| {
            c.contains(&Point2::new(15.0, 5.0)) && c.contains(&Point2::new(30.0, 5.0))
        });
        let around_top = chains.iter().any(|c| {
            c.contains(&Point2::new(15.0, 30.0)) && c.contains(&Point2::new(30.0, 30.0))
        });
        assert!(around_bottom);
        assert!(around_top);
    }

    #[test]
    fn order_one_finds_nothing_behind_two_edges() {
        let (index, corners) = scene();
        let chains = collect_chains(
            &index,
            &corners,
            Point2::new(5.0, 15.0),
            Point2::new(40.0, 15.0),
            1,
        );
        assert!(chains.is_empty());
    }

    #[test]
    fn zero_order_skips_the_search() {
        let (index, corners) = scene();
        let chains = collect_chains(
            &index,
            &corners,
            Point2::new(15.0, 40.0),
            Point2::new(40.0, 15.0),
            0,
        );
        assert!(chains.is_empty());
    }

    #[test]
    fn visit_can_stop_the_search() {
        let (index, corners) = scene();
        let visible = visible_from(&index, &corners, Point2::new(5.0, 15.0));
        let mut calls = 0;
        explore_corner_chains(
            Point2::new(40.0, 15.0),
            &corners,
            &visible,
            2,
            &index,
            |_| {
                calls += 1;
                false
            },
        );
        assert_eq!(calls, 1);
    }
}
