//! Surface energy balance
//!
//! Integrates air and soil temperature one step from independent energy
//! terms (°C per simulated hour):
//!
//! ```text
//! ΔT_air  = solar·0.4 − night_cooling·0.5 + longwave + conduction − ET·0.5
//!         + canopy + inversion/downslope + wind_mixing + latent + humidity + lapse
//! ΔT_soil = (solar − night_cooling − conduction − ET) / C + relaxation
//! ```
//!
//! Each delta is clamped to ±5 °C/h before being scaled by the time factor.
//! Terms are summed then clamped; energy is not conserved across cells.

use crate::atmosphere::humidity::dew_point;
use crate::atmosphere::radiation::calculate_cloud_radiation;
use crate::atmosphere::Environment;
use crate::core_types::LandCover;
use crate::grid::{clamp_finite, Grid, SimulationState, TEMPERATURE_RANGE};
use nalgebra::Vector3;
use rayon::prelude::*;
use tracing::warn;

/// Maximum hourly temperature change per cell (°C/h)
pub const MAX_HOURLY_DELTA: f32 = 5.0;
/// Absorbed shortwave to heating (°C/h at full sun)
const SOLAR_GAIN: f32 = 6.0;
/// Share of absorbed shortwave that heats the air directly
const AIR_SOLAR_SHARE: f32 = 0.4;
/// Albedo of fresh snow
const SNOW_ALBEDO: f32 = 0.8;
/// Clear-sky nighttime radiative loss (°C/h)
const NIGHT_COOLING: f32 = 1.5;
const CLOUD_COOLING_REDUCTION: f32 = 0.7;
const SNOW_COOLING_REDUCTION: f32 = 0.8;
const AIR_COOLING_SHARE: f32 = 0.5;
const CONDUCTION_RATE: f32 = 0.3;
const EVAPOTRANSPIRATION_RATE: f32 = 0.8;
const AIR_ET_SHARE: f32 = 0.5;
/// Soil moisture lost per unit of evapotranspiration
const ET_MOISTURE_LOSS: f32 = 0.01;
const CANOPY_DAY_COOLING: f32 = 0.8;
const CANOPY_NIGHT_WARMING: f32 = 0.5;
/// Forest depth at which canopy effects saturate (cells)
const CANOPY_DEPTH_NORM: f32 = 20.0;
/// Inversion top band that warms above the cold pool (m)
const INVERSION_WARM_BAND: f32 = 100.0;
const INVERSION_COLD_RATE: f32 = 0.25;
const INVERSION_WARM_RATE: f32 = 0.15;
const DOWNSLOPE_RATE: f32 = 0.4;
const FOEHN_RATE: f32 = 0.5;
/// Clamp on the combined inversion/downslope rate (°C/h)
const MAX_INVERSION_RATE: f32 = 3.0;
/// Wind above which the boundary layer mixes toward the baseline (m/s)
const MIXING_WIND: f32 = 5.0;
const MIXING_RATE: f32 = 0.1;
const HUMIDITY_RELAXATION: f32 = 0.1;
const HUMIDITY_NEUTRAL: f32 = 0.5;
const HUMIDITY_COUPLING: f32 = 0.4;
const HUMID_THRESHOLD: f32 = 0.8;
const HUMID_COOLING: f32 = 2.0;
const DRY_THRESHOLD: f32 = 0.3;
const DRY_HEATING: f32 = 1.5;
/// Standard atmosphere lapse rate (°C/m)
pub const LAPSE_RATE: f32 = 0.0065;
const LAPSE_RELAXATION: f32 = 0.05;
const SOIL_RELAXATION: f32 = 0.02;
const DIFFUSION_ITERATIONS: usize = 3;
const DIFFUSION_RATE: f32 = 0.1;
const MAX_DIFFUSION_RATE: f32 = 0.25;
const SOIL_DIFFUSION_SHARE: f32 = 0.5;
/// Cap on slope enhancement relative to flat ground
const MAX_SLOPE_GAIN: f32 = 1.2;

/// Driving parameters of one thermodynamics step
#[derive(Debug, Clone, Copy)]
pub struct ThermodynamicsOptions {
    pub month: f32,
    pub hour: f32,
    /// Sine proxy in [0, 1]; 0 at night
    pub sun_altitude: f32,
    /// Degrees clockwise from north
    pub sun_azimuth: f32,
    /// Simulated hours per step
    pub time_factor: f32,
    pub diffusion: bool,
    pub inversions: bool,
    pub downslope: bool,
    /// Whether the simulation is advancing (soil dries only while running)
    pub running: bool,
}

impl Default for ThermodynamicsOptions {
    fn default() -> Self {
        Self {
            month: 6.0,
            hour: 12.0,
            sun_altitude: 1.0,
            sun_azimuth: 180.0,
            time_factor: 1.0,
            diffusion: true,
            inversions: true,
            downslope: true,
            running: true,
        }
    }
}

/// Elevation gradient with one-sided differences at the edges
fn surface_gradient(state: &SimulationState, x: usize, y: usize) -> (f32, f32) {
    let n = state.size;
    let c = state.cell_size;
    let e = &state.elevation;
    let dz_dx = if x == 0 {
        (e.at(1, y) - e.at(0, y)) / c
    } else if x == n - 1 {
        (e.at(n - 1, y) - e.at(n - 2, y)) / c
    } else {
        (e.at(x + 1, y) - e.at(x - 1, y)) / (2.0 * c)
    };
    let dz_dy = if y == 0 {
        (e.at(x, 1) - e.at(x, 0)) / c
    } else if y == n - 1 {
        (e.at(x, n - 1) - e.at(x, n - 2)) / c
    } else {
        (e.at(x, y + 1) - e.at(x, y - 1)) / (2.0 * c)
    };
    (dz_dx, dz_dy)
}

/// Slope- and aspect-adjusted solar intensity at a cell, attenuated by cloud.
///
/// Flat ground receives `sun_altitude`; slopes facing the sun receive up to
/// 1.2× that. Row 0 is north, azimuth is clockwise from north.
pub fn calculate_solar_insolation(
    state: &SimulationState,
    x: usize,
    y: usize,
    sun_altitude: f32,
    sun_azimuth: f32,
) -> f32 {
    if sun_altitude.is_nan() || sun_altitude <= 0.0 || x >= state.size || y >= state.size {
        return 0.0;
    }
    let sin_el = sun_altitude.min(1.0);
    let cos_el = (1.0 - sin_el * sin_el).max(0.0).sqrt();
    let az = sun_azimuth.to_radians();
    let sun = Vector3::new(cos_el * az.sin(), -cos_el * az.cos(), sin_el);

    let (dz_dx, dz_dy) = surface_gradient(state, x, y);
    let normal = Vector3::new(-dz_dx, -dz_dy, 1.0).normalize();
    let incidence = normal.dot(&sun).max(0.0);

    let relative = (incidence / sin_el).min(MAX_SLOPE_GAIN);
    let transmission = calculate_cloud_radiation(state, x, y, sun_altitude).solar_transmission;
    sun_altitude * relative * transmission
}

/// Inversion cold pool and downslope/föhn heating per cell (°C/h)
fn inversion_rates(state: &SimulationState, inversions: bool, downslope: bool) -> Grid<f32> {
    let height = state.inversion_height;
    let strength = state.inversion_strength;
    Grid::from_fn(state.size, |x, y| {
        let idx = y * state.size + x;
        let mut rate = 0.0;
        if inversions && strength > 0.0 {
            let e = state.elevation[idx];
            if e < height {
                rate -= INVERSION_COLD_RATE * strength;
            } else if e < height + INVERSION_WARM_BAND {
                rate += INVERSION_WARM_RATE * strength;
            }
        }
        if downslope {
            rate += state.downslope_wind[idx] * DOWNSLOPE_RATE + state.foehn_effect[idx] * FOEHN_RATE;
        }
        clamp_finite(rate, -MAX_INVERSION_RATE, MAX_INVERSION_RATE, 0.0)
    })
}

/// New values of one cell
#[derive(Debug, Clone, Copy, Default)]
struct CellBalance {
    air: f32,
    soil: f32,
    humidity: f32,
    moisture: f32,
}

#[allow(clippy::too_many_arguments)]
fn cell_balance(
    state: &SimulationState,
    env: &Environment<'_>,
    options: &ThermodynamicsOptions,
    inversion_rate: f32,
    baseline: f32,
    target_humidity: f32,
    x: usize,
    y: usize,
) -> CellBalance {
    let idx = state.index(x, y);
    let props = state.thermal_properties(env.materials, x as i32, y as i32);
    let land = state.land_cover[idx];
    let air = state.air_temperature[idx];
    let soil = state.soil_temperature[idx];
    let moisture = state.soil_moisture[idx];
    let cloud = state.cloud_coverage[idx];
    let sun = options.sun_altitude.max(0.0);
    let daytime = sun > 0.0;
    let tf = options.time_factor;
    let hc = props.heat_capacity;
    let snow = env.snow.effect(state.snow_depth[idx]);
    let radiation = calculate_cloud_radiation(state, x, y, sun);

    let mut air_balance = 0.0;
    let mut soil_balance = 0.0;
    let mut new_moisture = moisture;

    // 1. Solar absorption, snow pulls albedo toward its own
    if daytime {
        let insolation =
            calculate_solar_insolation(state, x, y, options.sun_altitude, options.sun_azimuth);
        let albedo = props.albedo + (SNOW_ALBEDO - props.albedo) * snow.albedo_effect;
        let absorbed = insolation * (1.0 - albedo) * SOLAR_GAIN;
        soil_balance += absorbed / hc;
        air_balance += absorbed * AIR_SOLAR_SHARE;
    } else {
        // 2. Nighttime radiative cooling
        let cooling = NIGHT_COOLING
            * (1.0 - CLOUD_COOLING_REDUCTION * cloud)
            * (1.0 - SNOW_COOLING_REDUCTION * snow.insulation);
        soil_balance -= cooling / hc;
        air_balance -= cooling * AIR_COOLING_SHARE;
    }
    air_balance += radiation.longwave_warming;

    // 3. Soil-air conduction
    let water_factor = if land == LandCover::Water { 2.0 } else { 1.0 };
    let conduction = (soil - air) * props.conductivity * CONDUCTION_RATE * water_factor;
    air_balance += conduction;
    soil_balance -= conduction / hc;

    // 4. Evapotranspiration
    if moisture > 0.0 && air > 0.0 && daytime {
        let et = moisture * props.evaporation * sun * EVAPOTRANSPIRATION_RATE;
        air_balance -= et * AIR_ET_SHARE;
        soil_balance -= et / hc;
        if options.running {
            new_moisture = (moisture - et * ET_MOISTURE_LOSS * tf).clamp(0.0, 1.0);
        }
    }

    // 5. Forest canopy
    if land == LandCover::Forest {
        let depth = (state.forest_depth[idx] / CANOPY_DEPTH_NORM).min(1.0);
        if daytime {
            air_balance -= CANOPY_DAY_COOLING * depth;
        } else {
            air_balance += CANOPY_NIGHT_WARMING * depth;
        }
    }

    // 6. Inversion/downslope and wind mixing
    air_balance += inversion_rate;
    let wind_speed = state.wind[idx].speed;
    if wind_speed > MIXING_WIND {
        air_balance += (baseline - air) * MIXING_RATE * (wind_speed / 10.0).min(1.0);
    }

    // 7. Latent heat from the cloud pass
    air_balance += state.latent_heat_effect[idx];

    // 8. Humidity, relaxed first and coupled at the relaxed value
    let humidity = state.humidity[idx];
    let humidity = (humidity + (target_humidity - humidity) * (HUMIDITY_RELAXATION * tf).min(1.0))
        .clamp(0.0, 1.0);
    air_balance += (humidity - HUMIDITY_NEUTRAL) * HUMIDITY_COUPLING;
    if humidity > HUMID_THRESHOLD && air > dew_point(air, humidity) {
        air_balance -= (humidity - HUMID_THRESHOLD) * HUMID_COOLING;
    }
    if humidity < DRY_THRESHOLD && daytime {
        air_balance += (DRY_THRESHOLD - humidity) * DRY_HEATING;
    }

    // 9. Lapse-rate relaxation
    let standard = baseline - LAPSE_RATE * state.elevation[idx];
    air_balance += (standard - air) * LAPSE_RELAXATION;
    soil_balance += (baseline - soil) * SOIL_RELAXATION;

    let air_delta = air_balance.clamp(-MAX_HOURLY_DELTA, MAX_HOURLY_DELTA) * tf;
    let soil_delta = soil_balance.clamp(-MAX_HOURLY_DELTA, MAX_HOURLY_DELTA) * tf;

    CellBalance {
        air: air + air_delta,
        soil: soil + soil_delta,
        humidity,
        moisture: new_moisture,
    }
}

/// Jacobi smoothing toward the 4-neighbour mean, edges sampled clamped
pub fn diffuse(field: &Grid<f32>, rate: f32, iterations: usize) -> Grid<f32> {
    if rate <= 0.0 {
        return field.clone();
    }
    let size = field.size();
    let mut current = field.clone();
    let mut next = field.clone();
    for _ in 0..iterations {
        next.as_mut_slice()
            .par_chunks_mut(size)
            .enumerate()
            .for_each(|(y, row)| {
                let yi = y as i32;
                for (x, cell) in row.iter_mut().enumerate() {
                    let xi = x as i32;
                    let center = *current.at(x, y);
                    let mean = (current.clamped(xi + 1, yi)
                        + current.clamped(xi - 1, yi)
                        + current.clamped(xi, yi + 1)
                        + current.clamped(xi, yi - 1))
                        / 4.0;
                    *cell = center + (mean - center) * rate;
                }
            });
        std::mem::swap(&mut current, &mut next);
    }
    current
}

/// Replace non-finite values with the previous cell value and clamp into
/// range. Returns the number of substituted cells.
fn commit_temperature(new: &mut Grid<f32>, previous: &Grid<f32>) -> usize {
    let (min, max) = TEMPERATURE_RANGE;
    let mut replaced = 0;
    for (value, &prev) in new.as_mut_slice().iter_mut().zip(previous.iter()) {
        if !value.is_finite() {
            replaced += 1;
            *value = clamp_finite(prev, min, max, crate::grid::NEUTRAL_TEMPERATURE);
        } else {
            *value = value.clamp(min, max);
        }
    }
    replaced
}

/// Advance air and soil temperature, humidity and soil moisture one step.
///
/// Reads the whole previous snapshot and commits after the pass. Non-finite
/// results fall back to the previous value and everything is clamped to the
/// physical range before snow is updated and diffusion runs.
pub fn update_thermodynamics(
    state: &mut SimulationState,
    options: &ThermodynamicsOptions,
    env: &Environment<'_>,
) {
    let size = state.size;
    let tf = if options.time_factor.is_finite() {
        options.time_factor.max(0.0)
    } else {
        0.0
    };
    let options = ThermodynamicsOptions {
        time_factor: tf,
        ..*options
    };

    let baseline = env.climate.baseline_temperature(options.month, options.hour);
    let target_humidity = env.climate.target_humidity(options.month, options.hour);

    state.inversion_rate = inversion_rates(state, options.inversions, options.downslope);

    let mut cells = vec![CellBalance::default(); size * size];
    {
        let snapshot = &*state;
        cells
            .par_chunks_mut(size)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, cell) in row.iter_mut().enumerate() {
                    let rate = snapshot.inversion_rate[y * size + x];
                    *cell = cell_balance(
                        snapshot,
                        env,
                        &options,
                        rate,
                        baseline,
                        target_humidity,
                        x,
                        y,
                    );
                }
            });
    }

    let mut air = Grid::from_fn(size, |x, y| cells[y * size + x].air);
    let mut soil = Grid::from_fn(size, |x, y| cells[y * size + x].soil);
    let humidity = Grid::from_fn(size, |x, y| cells[y * size + x].humidity);
    let moisture = Grid::from_fn(size, |x, y| cells[y * size + x].moisture);

    let replaced_air = commit_temperature(&mut air, &state.air_temperature);
    let replaced_soil = commit_temperature(&mut soil, &state.soil_temperature);
    if replaced_air > 0 {
        warn!("Replaced {} non-finite air_temperature cells", replaced_air);
    }
    if replaced_soil > 0 {
        warn!("Replaced {} non-finite soil_temperature cells", replaced_soil);
    }

    env.snow
        .update(&mut state.snow_depth, &air, options.sun_altitude, tf);

    // Diffusion is a convex average, the committed range holds
    if options.diffusion {
        let rate = (DIFFUSION_RATE * tf).min(MAX_DIFFUSION_RATE);
        air = diffuse(&air, rate, DIFFUSION_ITERATIONS);
        soil = diffuse(&soil, rate * SOIL_DIFFUSION_SHARE, DIFFUSION_ITERATIONS);
    }

    state.dew_point = Grid::from_fn(size, |x, y| {
        let idx = y * size + x;
        dew_point(air[idx], humidity[idx])
    });
    state.air_temperature = air;
    state.soil_temperature = soil;
    state.humidity = humidity;
    state.soil_moisture = moisture;
}
