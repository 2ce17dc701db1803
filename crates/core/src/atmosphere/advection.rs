//! Semi-Lagrangian transport of scalar fields

use crate::core_types::WindVector;
use crate::grid::Grid;
use rayon::prelude::*;

/// Cells travelled per unit wind speed per simulated hour
pub const ADVECTION_SCALE: f32 = 0.5;

/// Transport `field` along `wind`.
///
/// Each destination cell traces back along its local wind to a source
/// position, clamped into the grid, and bilinearly samples the previous
/// field there. The input is not modified.
pub fn advect(field: &Grid<f32>, wind: &Grid<WindVector>, time_factor: f32) -> Grid<f32> {
    let size = field.size();
    let mut out = field.clone();
    out.as_mut_slice()
        .par_chunks_mut(size)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, cell) in row.iter_mut().enumerate() {
                let w = wind.at(x, y);
                let src_x = x as f32 - w.x * ADVECTION_SCALE * time_factor;
                let src_y = y as f32 - w.y * ADVECTION_SCALE * time_factor;
                *cell = field.sample_bilinear(src_x, src_y);
            }
        });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(size: usize) -> Grid<f32> {
        Grid::from_fn(size, |x, y| (x * 3 + y * 7) as f32)
    }

    #[test]
    fn test_zero_wind_is_identity() {
        let field = ramp(6);
        let calm = Grid::filled(6, WindVector::CALM);
        assert_eq!(advect(&field, &calm, 1.0), field);
    }

    #[test]
    fn test_shifts_downwind() {
        let field = Grid::from_fn(5, |x, _| x as f32);
        // 2 m/s eastward, 0.5 cells per m/s: one cell per hour
        let wind = Grid::filled(5, WindVector::new(2.0, 0.0));
        let out = advect(&field, &wind, 1.0);
        assert_relative_eq!(*out.at(3, 2), 2.0);
        // Upwind edge clamps to the boundary value
        assert_relative_eq!(*out.at(0, 2), 0.0);
    }

    #[test]
    fn test_fractional_trace_interpolates() {
        let field = Grid::from_fn(5, |x, _| x as f32);
        let wind = Grid::filled(5, WindVector::new(1.0, 0.0));
        let out = advect(&field, &wind, 1.0);
        assert_relative_eq!(*out.at(2, 2), 1.5);
    }
}
