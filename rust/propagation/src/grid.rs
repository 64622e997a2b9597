// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial cell grid.
//!
//! A computation splits its main envelope into `dim x dim` cells, each
//! evaluated independently. Data fetching uses the cell envelope expanded by
//! the maximum propagation distance so border receivers see every source and
//! obstacle that can reach them.

use nalgebra::Point2;

use noisefield_geometry::Envelope;

/// Regular grid of computation cells over a main envelope.
#[derive(Clone, Copy, Debug)]
pub struct CellGrid {
    main: Envelope,
    dim: u32,
}

impl CellGrid {
    pub fn new(main: Envelope, dim: u32) -> Self {
        Self {
            main,
            dim: dim.max(1),
        }
    }

    pub fn dim(&self) -> u32 {
        self.dim
    }

    pub fn cell_width(&self) -> f64 {
        self.main.width() / self.dim as f64
    }

    pub fn cell_height(&self) -> f64 {
        self.main.height() / self.dim as f64
    }

    /// Flat id of cell (i, j), row-major.
    pub fn cell_id(&self, i: u32, j: u32) -> u32 {
        i * self.dim + j
    }

    /// Envelope of cell (i, j).
    pub fn cell_envelope(&self, i: u32, j: u32) -> Envelope {
        let w = self.cell_width();
        let h = self.cell_height();
        let min = Point2::new(
            self.main.min.x + i as f64 * w,
            self.main.min.y + j as f64 * h,
        );
        let max = Point2::new(min.x + w, min.y + h);
        Envelope::new(min, max)
    }

    /// Cell envelope grown by the fetch margin (usually the maximum
    /// propagation distance).
    pub fn expanded_cell_envelope(&self, i: u32, j: u32, margin: f64) -> Envelope {
        self.cell_envelope(i, j).expanded(margin)
    }

    /// Iterate all (i, j) cell coordinates.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.dim).flat_map(move |i| (0..self.dim).map(move |j| (i, j)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> CellGrid {
        CellGrid::new(
            Envelope::new(Point2::new(0.0, 0.0), Point2::new(100.0, 100.0)),
            4,
        )
    }

    #[test]
    fn cells_tile_the_main_envelope() {
        let grid = grid();
        assert_eq!(grid.cells().count(), 16);
        let total_area: f64 = grid
            .cells()
            .map(|(i, j)| {
                let env = grid.cell_envelope(i, j);
                env.width() * env.height()
            })
            .sum();
        assert!((total_area - 10000.0).abs() < 1e-9);

        let corner = grid.cell_envelope(0, 0);
        assert_eq!(corner.min, Point2::new(0.0, 0.0));
        assert_eq!(corner.max, Point2::new(25.0, 25.0));
        let last = grid.cell_envelope(3, 3);
        assert_eq!(last.max, Point2::new(100.0, 100.0));
    }

    #[test]
    fn expansion_adds_the_fetch_margin() {
        let grid = grid();
        let env = grid.expanded_cell_envelope(1, 1, 170.0);
        assert_eq!(env.min, Point2::new(25.0 - 170.0, 25.0 - 170.0));
        assert_eq!(env.max, Point2::new(50.0 + 170.0, 50.0 + 170.0));
    }

    #[test]
    fn cell_ids_are_row_major_and_unique() {
        let grid = grid();
        let mut seen = std::collections::HashSet::new();
        for (i, j) in grid.cells() {
            assert!(seen.insert(grid.cell_id(i, j)));
        }
        assert_eq!(seen.len(), 16);
    }
}
