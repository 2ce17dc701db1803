//! Terrain-aware wind field
//!
//! Rebuilds the per-cell wind vector every tick from the prevailing wind:
//! 1. Valley channeling along detected valley axes
//! 2. Nocturnal katabatic drainage down steep slopes
//! 3. Lee-side föhn warming behind higher upwind terrain
//! 4. Random gusts scaled by roughness and thermals
//! 5. Land-cover drag
//! 6. One 3×3 weighted smoothing pass
//!
//! # Scientific References
//!
//! - Whiteman, C.D. (2000). "Mountain Meteorology: Fundamentals and Applications."
//! - Oke, T.R. (1987). "Boundary Layer Climates." Routledge.

use crate::atmosphere::valley_channeling::{
    channel_wind, detect_valley_geometry, REFERENCE_WIDTH_CELLS,
};
use crate::core_types::climate::wrap_hour;
use crate::core_types::{LandCover, Vec2, WindVector};
use crate::grid::{Grid, SimulationState};
use rand::Rng;
use rayon::prelude::*;

/// Minimum slope for katabatic drainage (degrees)
const KATABATIC_MIN_SLOPE: f32 = 2.0;
/// Slope at which katabatic strength saturates (degrees)
const KATABATIC_MAX_SLOPE: f32 = 30.0;
/// Katabatic speed at saturation in calm conditions (m/s)
const KATABATIC_MAX_SPEED: f32 = 3.0;
/// Largest rise tolerated along the drainage path (m)
const KATABATIC_MAX_RISE: f32 = 2.0;
/// Largest drop per cell before the path counts as a cliff (m)
const KATABATIC_MAX_DROP: f32 = 200.0;
const FOEHN_MIN_WIND: f32 = 3.0;
const FOEHN_MIN_SLOPE: f32 = 3.0;
/// Upwind scan length (cells)
const FOEHN_SCAN_CELLS: i32 = 10;
/// Dry adiabatic lapse rate (°C/m)
const DRY_ADIABATIC_LAPSE: f32 = 0.0098;
/// Wind speed at which föhn strength saturates (m/s)
const FOEHN_FULL_WIND: f32 = 10.0;
/// Downwind push per °C of föhn warming (m/s)
const FOEHN_PUSH: f32 = 0.3;
const GUST_SCALE: f32 = 0.3;
/// Roughness (m std dev) per unit of gust amplification
const GUST_ROUGHNESS_NORM: f32 = 20.0;
/// Thermal excess (°C) per unit of gust amplification
const GUST_THERMAL_NORM: f32 = 5.0;
/// Forest depth at which the canopy drag saturates (cells)
const CANOPY_DEPTH_NORM: f32 = 20.0;
const SMOOTHING_CENTER_WEIGHT: f32 = 4.0;

/// Katabatic drainage happens between these hours (wrapped onto the 24 h clock)
#[inline]
pub fn is_katabatic_hour(hour: f32) -> bool {
    let hour = wrap_hour(hour);
    hour <= 6.0 || hour >= 19.0
}

/// Centred elevation gradient over the two neighbours, in m/m.
///
/// Callers pass interior cells only.
pub fn elevation_gradient(elevation: &Grid<f32>, cell_size: f32, x: usize, y: usize) -> Vec2 {
    let dz_dx = (elevation.at(x + 1, y) - elevation.at(x - 1, y)) / (2.0 * cell_size);
    let dz_dy = (elevation.at(x, y + 1) - elevation.at(x, y - 1)) / (2.0 * cell_size);
    Vec2::new(dz_dx, dz_dy)
}

/// Slope angle in degrees for a gradient
#[inline]
pub fn slope_degrees(gradient: Vec2) -> f32 {
    gradient.norm().atan().to_degrees()
}

/// Standard deviation of the in-bounds 3×3 elevations (m)
pub fn terrain_roughness(elevation: &Grid<f32>, x: usize, y: usize) -> f32 {
    let mut values = [0.0_f32; 9];
    let mut count = 0;
    for dy in -1..=1 {
        for dx in -1..=1 {
            if let Some(&e) = elevation.get(x as i32 + dx, y as i32 + dy) {
                values[count] = e;
                count += 1;
            }
        }
    }
    let samples = &values[..count];
    let mean = samples.iter().sum::<f32>() / count as f32;
    let variance = samples.iter().map(|e| (e - mean).powi(2)).sum::<f32>() / count as f32;
    variance.sqrt()
}

/// Multiplicative drag of the surface on the wind
pub fn vegetation_drag(land: LandCover, forest_depth: f32) -> f32 {
    match land {
        LandCover::Grassland => 0.9,
        LandCover::Forest => 0.6 * (1.0 - 0.3 * (forest_depth / CANOPY_DEPTH_NORM).min(1.0)),
        LandCover::Water => 1.0,
        LandCover::Urban => 0.7,
        LandCover::Settlement => 0.8,
    }
}

/// Deterministic part of one cell's wind
#[derive(Debug, Clone, Copy, Default)]
struct CellWind {
    vector: Vec2,
    downslope: f32,
    foehn: f32,
}

/// Katabatic flow at an interior cell, as (vector, strength).
///
/// The flow must be able to step one and two cells downslope without
/// climbing or dropping off a cliff.
fn katabatic(
    state: &SimulationState,
    x: usize,
    y: usize,
    gradient: Vec2,
    slope: f32,
    base_speed: f32,
) -> Option<(Vec2, f32)> {
    if slope <= KATABATIC_MIN_SLOPE || gradient.norm() <= 0.0 {
        return None;
    }
    let downhill = -gradient.normalize();
    let center = *state.elevation.at(x, y);
    let mut previous = center;
    for step in 1..=2 {
        let px = x as f32 + downhill.x * step as f32;
        let py = y as f32 + downhill.y * step as f32;
        if !state.in_bounds(px.round() as i32, py.round() as i32) {
            break;
        }
        let e = state.elevation.sample_bilinear(px, py);
        if e - previous > KATABATIC_MAX_RISE || previous - e > KATABATIC_MAX_DROP {
            return None;
        }
        previous = e;
    }

    let strength = (slope.min(KATABATIC_MAX_SLOPE) / KATABATIC_MAX_SLOPE) * KATABATIC_MAX_SPEED
        / (1.0 + base_speed);
    Some((downhill * strength, strength))
}

/// Föhn warming (°C) at a cell with higher terrain upwind
fn foehn_warming(state: &SimulationState, x: usize, y: usize, direction: Vec2, base_speed: f32) -> f32 {
    let center = *state.elevation.at(x, y);
    let mut highest = f32::MIN;
    for step in 1..=FOEHN_SCAN_CELLS {
        let px = x as f32 - direction.x * step as f32;
        let py = y as f32 - direction.y * step as f32;
        if !state.in_bounds(px.round() as i32, py.round() as i32) {
            break;
        }
        highest = highest.max(state.elevation.sample_bilinear(px, py));
    }
    if highest <= center {
        return 0.0;
    }
    let descent = highest - center;
    descent * DRY_ADIABATIC_LAPSE * (base_speed / FOEHN_FULL_WIND).min(1.0)
}

fn cell_wind(
    state: &SimulationState,
    x: usize,
    y: usize,
    night: bool,
    prevailing: Vec2,
    base_speed: f32,
) -> CellWind {
    let size = state.size;
    let mut out = CellWind {
        vector: prevailing,
        ..Default::default()
    };
    if x == 0 || y == 0 || x + 1 >= size || y + 1 >= size {
        return out;
    }

    let geometry = detect_valley_geometry(&state.elevation, state.cell_size, x, y);
    out.vector = channel_wind(
        prevailing,
        &geometry,
        REFERENCE_WIDTH_CELLS * state.cell_size,
    );

    let gradient = elevation_gradient(&state.elevation, state.cell_size, x, y);
    let slope = slope_degrees(gradient);

    if night {
        if let Some((flow, strength)) = katabatic(state, x, y, gradient, slope, base_speed) {
            out.vector += flow;
            out.downslope = -strength;
        }
    }

    if base_speed > FOEHN_MIN_WIND && slope > FOEHN_MIN_SLOPE {
        let direction = prevailing / base_speed;
        let warming = foehn_warming(state, x, y, direction, base_speed);
        if warming > 0.0 {
            out.foehn = warming;
            out.vector += direction * warming * FOEHN_PUSH;
        }
    }

    out
}

/// 3×3 weighted average of the vector components, centre-weighted
fn smooth(field: &Grid<WindVector>) -> Grid<WindVector> {
    let size = field.size();
    let mut out = field.clone();
    out.as_mut_slice()
        .par_chunks_mut(size)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, cell) in row.iter_mut().enumerate() {
                let mut sum = Vec2::zeros();
                let mut weight = 0.0;
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        if let Some(w) = field.get(x as i32 + dx, y as i32 + dy) {
                            let k = if dx == 0 && dy == 0 {
                                SMOOTHING_CENTER_WEIGHT
                            } else {
                                1.0
                            };
                            sum += w.vector() * k;
                            weight += k;
                        }
                    }
                }
                *cell = WindVector::from_vec(sum / weight);
            }
        });
    out
}

/// Recompute the wind field from scratch.
///
/// `direction_degrees` is where the wind blows toward, counter-clockwise from
/// +x; a non-finite direction is read as 0° (east). Writes `wind`, `downslope_wind` and `foehn_effect`. Gusts draw two
/// values per cell from `rng` in row-major order when `gustiness > 0`.
pub fn update_wind<R: Rng + ?Sized>(
    state: &mut SimulationState,
    hour: f32,
    base_speed: f32,
    direction_degrees: f32,
    gustiness: f32,
    rng: &mut R,
) {
    let size = state.size;
    let base_speed = if base_speed.is_finite() { base_speed.max(0.0) } else { 0.0 };
    let gustiness = if gustiness.is_finite() { gustiness.max(0.0) } else { 0.0 };
    let direction_degrees = if direction_degrees.is_finite() { direction_degrees } else { 0.0 };
    let prevailing = WindVector::from_direction(direction_degrees, base_speed).vector();
    let night = is_katabatic_hour(hour);

    let mut cells = vec![CellWind::default(); size * size];
    {
        let state_ref = &*state;
        cells
            .par_chunks_mut(size)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, cell) in row.iter_mut().enumerate() {
                    *cell = cell_wind(state_ref, x, y, night, prevailing, base_speed);
                }
            });
    }

    let mut vectors = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            let idx = y * size + x;
            let mut v = cells[idx].vector;

            if gustiness > 0.0 {
                let roughness = terrain_roughness(&state.elevation, x, y);
                let thermal = (state.thermal_strength[idx].max(0.0) / GUST_THERMAL_NORM).min(1.0);
                let amplitude = gustiness
                    * (0.5 + (roughness / GUST_ROUGHNESS_NORM).min(1.5) + 0.5 * thermal)
                    * base_speed.max(1.0)
                    * GUST_SCALE;
                let gx: f32 = rng.random_range(-1.0..1.0);
                let gy: f32 = rng.random_range(-1.0..1.0);
                v += Vec2::new(gx, gy) * amplitude;
            }

            v *= vegetation_drag(state.land_cover[idx], state.forest_depth[idx]);
            vectors.push(WindVector::from_vec(v));
        }
    }

    let raw = Grid::from_vec(size, vectors).unwrap_or_else(|| Grid::filled(size, WindVector::CALM));
    state.wind = smooth(&raw);
    state.downslope_wind = Grid::from_fn(size, |x, y| cells[y * size + x].downslope);
    state.foehn_effect = Grid::from_fn(size, |x, y| cells[y * size + x].foehn);
}
