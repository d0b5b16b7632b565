//! Nearest-neighbour terrain elevation sampler.

use thiserror::Error;

/// Reasons a terrain grid cannot back a height field.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TerrainError {
    /// The grid had no rows.
    #[error("height map is empty")]
    Empty,
    /// A row's length differed from the number of rows.
    #[error("height map row {row} has {found} samples, expected {expected}")]
    NotSquare {
        /// Index of the offending row.
        row: usize,
        /// Required row length.
        expected: usize,
        /// Actual row length.
        found: usize,
    },
}

/// Square elevation grid covering the world extent centered at the origin.
///
/// Immutable once built; a new world replaces it wholesale.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
    size: usize,
    samples: Vec<f32>,
    half_extent: f32,
    vertical_scale: f32,
}

impl HeightField {
    /// Builds a height field from `[row][column]` samples, rows running along z.
    pub fn from_rows(
        rows: &[Vec<f32>],
        half_extent: f32,
        vertical_scale: f32,
    ) -> Result<Self, TerrainError> {
        let size = rows.len();
        if size == 0 {
            return Err(TerrainError::Empty);
        }

        let mut samples = Vec::with_capacity(size * size);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != size {
                return Err(TerrainError::NotSquare {
                    row,
                    expected: size,
                    found: values.len(),
                });
            }
            samples.extend_from_slice(values);
        }

        Ok(Self {
            size,
            samples,
            half_extent,
            vertical_scale,
        })
    }

    /// Elevation at a world position: the nearest lower cell, clamped, then scaled.
    #[must_use]
    pub fn sample(&self, x: f32, z: f32) -> f32 {
        let column = grid_index(x, self.half_extent, self.size);
        let row = grid_index(z, self.half_extent, self.size);
        self.samples[row * self.size + column] * self.vertical_scale
    }
}

/// Maps a world coordinate in `[-half_extent, +half_extent]` onto `[0, size - 1]`.
///
/// Floors to the containing cell and clamps out-of-range coordinates to the
/// nearest edge. The occupancy mask locates its center cell the same way.
pub(crate) fn grid_index(coordinate: f32, half_extent: f32, size: usize) -> usize {
    if size <= 1 || half_extent <= 0.0 {
        return 0;
    }

    let last = (size - 1) as f32;
    let scaled = (coordinate + half_extent) / (2.0 * half_extent) * last;
    if !scaled.is_finite() || scaled <= 0.0 {
        return 0;
    }

    (scaled.floor() as usize).min(size - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(size: usize) -> Vec<Vec<f32>> {
        (0..size)
            .map(|row| (0..size).map(|column| (row * size + column) as f32).collect())
            .collect()
    }

    #[test]
    fn corners_map_to_grid_corners() {
        let field = HeightField::from_rows(&ramp(5), 10.0, 1.0).expect("square grid");

        assert_eq!(field.sample(-10.0, -10.0), 0.0);
        assert_eq!(field.sample(10.0, -10.0), 4.0);
        assert_eq!(field.sample(-10.0, 10.0), 20.0);
        assert_eq!(field.sample(10.0, 10.0), 24.0);
    }

    #[test]
    fn samples_floor_to_the_lower_cell() {
        let field = HeightField::from_rows(&ramp(5), 10.0, 1.0).expect("square grid");

        // x = 0 maps to column 2.0 exactly; x = 7.4 maps to 3.48 and floors to 3.
        assert_eq!(field.sample(0.0, -10.0), 2.0);
        assert_eq!(field.sample(7.4, -10.0), 3.0);
        assert_eq!(field.sample(9.9, -10.0), 3.0);
    }

    #[test]
    fn out_of_bounds_coordinates_clamp() {
        let field = HeightField::from_rows(&ramp(4), 8.0, 2.0).expect("square grid");

        assert_eq!(field.sample(-500.0, -500.0), field.sample(-8.0, -8.0));
        assert_eq!(field.sample(500.0, 500.0), 15.0 * 2.0);
        assert_eq!(field.sample(f32::NAN, -8.0), 0.0);
    }

    #[test]
    fn vertical_scale_multiplies_samples() {
        let rows = vec![vec![0.5, 0.5], vec![0.5, 0.5]];
        let field = HeightField::from_rows(&rows, 1.0, 12.0).expect("square grid");
        assert_eq!(field.sample(0.3, 0.3), 6.0);
    }

    #[test]
    fn malformed_grids_are_rejected() {
        assert_eq!(HeightField::from_rows(&[], 1.0, 1.0), Err(TerrainError::Empty));
        assert_eq!(
            HeightField::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0, 5.0]], 1.0, 1.0),
            Err(TerrainError::NotSquare {
                row: 1,
                expected: 2,
                found: 3
            }),
        );
    }
}
