//! Static relief shading
//!
//! Standard hillshade from a fixed sun (azimuth 315°, altitude 45°):
//!
//! ```text
//! hs = cos(zenith)·cos(slope) + sin(zenith)·sin(slope)·cos(azimuth − aspect)
//! ```
//!
//! Gradients are centred differences, so border cells (missing a neighbour
//! on one side) keep their previous value.

use crate::grid::SimulationState;
use rayon::prelude::*;

/// Sun azimuth for shading (degrees clockwise from north)
pub const SUN_AZIMUTH_DEG: f32 = 315.0;

/// Sun altitude for shading (degrees)
pub const SUN_ALTITUDE_DEG: f32 = 45.0;

/// Hillshade of flat ground under the fixed sun
pub fn flat_hillshade() -> f32 {
    (90.0 - SUN_ALTITUDE_DEG).to_radians().cos()
}

/// Hillshade for a local gradient (`dz/dx`, `dz/dy` in m/m).
pub fn hillshade_value(dz_dx: f32, dz_dy: f32) -> f32 {
    let zenith = (90.0 - SUN_ALTITUDE_DEG).to_radians();
    // Compass azimuth to math angle
    let azimuth = (360.0 - SUN_AZIMUTH_DEG + 90.0).rem_euclid(360.0).to_radians();

    let slope = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt().atan();
    let aspect = dz_dy.atan2(-dz_dx);

    let shade = zenith.cos() * slope.cos() + zenith.sin() * slope.sin() * (azimuth - aspect).cos();
    if shade.is_finite() {
        shade.clamp(0.0, 1.0)
    } else {
        flat_hillshade()
    }
}

/// Recompute hillshade for every interior cell.
pub fn compute_hillshade(state: &mut SimulationState) {
    let size = state.size;
    let spacing = 2.0 * state.cell_size;
    let elevation = &state.elevation;
    let mut shade = state.hillshade.clone();

    shade
        .as_mut_slice()
        .par_chunks_mut(size)
        .enumerate()
        .for_each(|(y, row)| {
            if y == 0 || y == size - 1 {
                return;
            }
            for (x, cell) in row.iter_mut().enumerate() {
                if x == 0 || x == size - 1 {
                    continue;
                }
                let dz_dx = (elevation.at(x + 1, y) - elevation.at(x - 1, y)) / spacing;
                // Row 0 is north; dz/dy is taken south minus north
                let dz_dy = (elevation.at(x, y + 1) - elevation.at(x, y - 1)) / spacing;
                *cell = hillshade_value(dz_dx, dz_dy);
            }
        });

    state.hillshade = shade;
}
