//! Coarse placement mask that keeps procedural structures from overlapping.

use crate::heightfield::grid_index;

/// Square grid of claimed cells over the world extent.
///
/// Cells are only ever claimed; removing a structure does not release its
/// cells. The mask is cleared wholesale when a new world is generated.
#[derive(Clone, Debug, PartialEq)]
pub struct OccupancyMask {
    size: usize,
    world_extent: f32,
    cells: Vec<bool>,
}

impl OccupancyMask {
    /// Creates an empty mask with `size × size` cells over a square of side `world_extent`.
    #[must_use]
    pub fn new(size: u32, world_extent: f32) -> Self {
        let size = usize::try_from(size).unwrap_or(0);
        Self {
            size,
            world_extent,
            cells: vec![false; size * size],
        }
    }

    /// Reports whether a disc of `radius` world units around `(x, z)` is unclaimed.
    ///
    /// Neighbours outside the grid never block placement.
    #[must_use]
    pub fn is_region_free(&self, x: f32, z: f32, radius: f32) -> bool {
        self.disc_cells(x, z, radius).all(|index| !self.cells[index])
    }

    /// Claims every in-bounds cell of the disc of `radius` world units around `(x, z)`.
    pub fn occupy(&mut self, x: f32, z: f32, radius: f32) {
        let claimed: Vec<usize> = self.disc_cells(x, z, radius).collect();
        for index in claimed {
            self.cells[index] = true;
        }
    }

    /// Releases every cell.
    pub fn clear(&mut self) {
        self.cells.fill(false);
    }

    /// Number of claimed cells.
    #[must_use]
    pub fn occupied_cells(&self) -> usize {
        self.cells.iter().filter(|claimed| **claimed).count()
    }

    /// Reports whether the cell at `(column, row)` is claimed; out-of-bounds cells are not.
    #[must_use]
    pub fn is_occupied(&self, column: usize, row: usize) -> bool {
        column < self.size && row < self.size && self.cells[row * self.size + column]
    }

    /// Converts a world radius into whole cells: `ceil(radius / extent * size)`.
    fn cell_radius(&self, radius: f32) -> i64 {
        let extent = self.world_extent;
        if !(radius > 0.0) || !(extent > 0.0) {
            return 0;
        }
        (radius / extent * self.size as f32).ceil() as i64
    }

    /// Indices of the in-bounds cells whose cell-space offset from the center
    /// cell has a Euclidean norm of at most the cell radius.
    ///
    /// Offsets are clamped to the grid before scanning, so the cost is bounded
    /// by the grid size rather than the radius.
    fn disc_cells(&self, x: f32, z: f32, radius: f32) -> impl Iterator<Item = usize> + '_ {
        let size = self.size;
        let half_extent = self.world_extent * 0.5;
        let center_column = grid_index(x, half_extent, size) as i64;
        let center_row = grid_index(z, half_extent, size) as i64;
        let bound = size as i64;
        // No in-grid offset is longer than the diagonal.
        let cell_radius = if size == 0 {
            -1
        } else {
            self.cell_radius(radius).min(2 * bound)
        };
        let limit = cell_radius.max(0) * cell_radius.max(0);

        let rows = (-cell_radius).max(-center_row)..=cell_radius.min(bound - 1 - center_row);
        let columns =
            (-cell_radius).max(-center_column)..=cell_radius.min(bound - 1 - center_column);

        rows.flat_map(move |dz| columns.clone().map(move |dx| (dx, dz)))
            .filter(move |(dx, dz)| dx * dx + dz * dz <= limit)
            .map(move |(dx, dz)| {
                let column = (center_column + dx) as usize;
                let row = (center_row + dz) as usize;
                row * size + column
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_mask_is_free_everywhere() {
        let mask = OccupancyMask::new(10, 100.0);
        assert!(mask.is_region_free(0.0, 0.0, 30.0));
        assert_eq!(mask.occupied_cells(), 0);
    }

    #[test]
    fn cell_radius_rounds_up() {
        let mask = OccupancyMask::new(10, 100.0);
        assert_eq!(mask.cell_radius(0.0), 0);
        assert_eq!(mask.cell_radius(1.0), 1);
        assert_eq!(mask.cell_radius(10.0), 1);
        assert_eq!(mask.cell_radius(10.5), 2);
        assert_eq!(mask.cell_radius(-3.0), 0);
    }

    #[test]
    fn occupy_claims_a_cell_space_disc() {
        let mut mask = OccupancyMask::new(11, 110.0);
        // Center cell is (5, 5); a 15-unit radius rounds up to two cells.
        mask.occupy(0.0, 0.0, 15.0);

        assert!(mask.is_occupied(5, 5));
        assert!(mask.is_occupied(7, 5));
        assert!(mask.is_occupied(5, 3));
        assert!(mask.is_occupied(6, 6));
        // (2, 2) has norm sqrt(8) > 2.
        assert!(!mask.is_occupied(7, 7));
        assert_eq!(mask.occupied_cells(), 13);
    }

    #[test]
    fn occupy_is_idempotent() {
        let mut mask = OccupancyMask::new(20, 100.0);
        mask.occupy(12.0, -7.0, 9.0);
        let first = mask.clone();
        mask.occupy(12.0, -7.0, 9.0);
        assert_eq!(mask, first);
    }

    #[test]
    fn occupied_disc_blocks_smaller_queries_at_same_center() {
        let mut mask = OccupancyMask::new(50, 200.0);
        for radius in [0.0_f32, 0.5, 3.0, 11.0] {
            mask.clear();
            mask.occupy(-30.0, 45.0, radius);
            for smaller in [0.0_f32, radius * 0.25, radius * 0.5, radius] {
                assert!(!mask.is_region_free(-30.0, 45.0, smaller));
            }
        }
    }

    #[test]
    fn out_of_bounds_neighbours_are_skipped() {
        let mut mask = OccupancyMask::new(10, 100.0);
        mask.occupy(-50.0, -50.0, 20.0);

        assert!(mask.is_occupied(0, 0));
        assert!(mask.is_occupied(2, 0));
        assert!(!mask.is_region_free(-50.0, -50.0, 1.0));
        assert!(mask.is_region_free(50.0, 50.0, 20.0));
    }

    #[test]
    fn distant_regions_stay_free() {
        let mut mask = OccupancyMask::new(100, 200.0);
        mask.occupy(0.0, 0.0, 2.0);
        assert!(mask.is_region_free(20.0, 20.0, 2.0));
        assert!(!mask.is_region_free(3.0, 0.0, 2.0));
    }

    #[test]
    fn clear_releases_every_cell() {
        let mut mask = OccupancyMask::new(10, 100.0);
        mask.occupy(0.0, 0.0, 30.0);
        mask.clear();
        assert_eq!(mask.occupied_cells(), 0);
    }

    #[test]
    fn huge_radii_cover_the_grid_without_scanning_past_it() {
        let mut mask = OccupancyMask::new(100, 200.0);
        assert!(mask.is_region_free(0.0, 0.0, 40_000.0));
        assert!(mask.is_region_free(90.0, -90.0, f32::MAX));

        mask.occupy(90.0, -90.0, 40_000.0);
        assert_eq!(mask.occupied_cells(), 100 * 100);

        mask.occupy(0.0, 0.0, f32::INFINITY);
        assert_eq!(mask.occupied_cells(), 100 * 100);
        assert!(!mask.is_region_free(-100.0, 100.0, 0.0));
    }

    #[test]
    fn corner_discs_match_a_full_neighbourhood_scan() {
        let mut mask = OccupancyMask::new(12, 120.0);
        mask.occupy(-60.0, 60.0, 25.0);

        // Center cell (0, 11) with a three-cell radius, keeping only in-grid cells.
        let expected = (0..12_i64)
            .flat_map(|row| (0..12_i64).map(move |column| (column, row)))
            .filter(|(column, row)| column * column + (row - 11) * (row - 11) <= 9)
            .count();
        assert_eq!(mask.occupied_cells(), expected);
        assert!(mask.is_occupied(0, 11));
        assert!(mask.is_occupied(3, 11));
        assert!(!mask.is_occupied(3, 9));
    }

    #[test]
    fn empty_mask_never_blocks() {
        let mut mask = OccupancyMask::new(0, 100.0);
        mask.occupy(0.0, 0.0, 10.0);
        assert!(mask.is_region_free(0.0, 0.0, 10.0));
        assert_eq!(mask.occupied_cells(), 0);
    }
}
