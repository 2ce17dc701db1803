//! Nocturnal temperature inversion
//!
//! A single global inversion layer pooled over the low ground. It builds
//! through the night under light wind and clear sky and vanishes by day.

use crate::core_types::climate::wrap_hour;
use crate::grid::SimulationState;

/// Inversions exist from this hour in the evening...
const EVENING_HOUR: f32 = 18.0;
/// ...until this hour in the morning
const MORNING_HOUR: f32 = 7.0;
/// Wind speed that mixes out the inversion (m/s)
const MAX_WIND: f32 = 4.0;
/// Moderate wind that weakens it (m/s)
const WEAKENING_WIND: f32 = 2.0;
const MAX_CLOUD_COVER: f32 = 0.5;
/// Lowest fraction of the relief counted as valley floor
const VALLEY_FRACTION: f32 = 0.25;
/// Hours after dusk until the inversion is fully developed
const BUILD_HOURS: f32 = 6.0;
const MIN_HOUR_FACTOR: f32 = 0.1;
/// Layer depth (m)
const BASE_DEPTH: f32 = 50.0;
const DEPTH_GAIN: f32 = 150.0;
const MAX_DEPTH: f32 = 200.0;
/// Strength at full development (°C)
const MAX_STRENGTH: f32 = 4.0;
/// Relief at which strength saturates (m)
const RELIEF_NORM: f32 = 100.0;
/// Below this relief there is no real cold-air pool (m)
const SMALL_RELIEF: f32 = 20.0;

/// Whether `hour` falls in the inversion window
#[inline]
pub fn is_inversion_hour(hour: f32) -> bool {
    let hour = wrap_hour(hour);
    hour >= EVENING_HOUR || hour <= MORNING_HOUR
}

/// Recompute the global inversion height and strength.
///
/// Both are reset to zero outside the night window, in wind of 4 m/s or
/// more, or under half cloud cover or more.
pub fn update_inversion_layer(
    state: &mut SimulationState,
    hour: f32,
    wind_speed: f32,
    cloud_cover: f32,
) {
    let calm_and_clear = wind_speed < MAX_WIND && cloud_cover < MAX_CLOUD_COVER;
    if !is_inversion_hour(hour) || !calm_and_clear {
        state.inversion_height = 0.0;
        state.inversion_strength = 0.0;
        return;
    }

    let (min_e, max_e) = state
        .elevation
        .iter()
        .filter(|e| e.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &e| {
            (lo.min(e), hi.max(e))
        });
    if !min_e.is_finite() {
        state.inversion_height = 0.0;
        state.inversion_strength = 0.0;
        return;
    }
    let relief = max_e - min_e;
    let threshold = min_e + VALLEY_FRACTION * relief;

    let (sum, count) = state
        .elevation
        .iter()
        .filter(|&&e| e.is_finite() && e <= threshold)
        .fold((0.0_f64, 0usize), |(s, n), &e| (s + f64::from(e), n + 1));
    let valley_elevation = (sum / count.max(1) as f64) as f32;

    let wind_speed = wind_speed.max(0.0);
    let wind_factor = 1.0 - wind_speed / MAX_WIND;
    let hours_since_dusk = if hour >= EVENING_HOUR {
        hour - EVENING_HOUR
    } else {
        hour + (24.0 - EVENING_HOUR)
    };
    let hour_factor = (hours_since_dusk / BUILD_HOURS).clamp(MIN_HOUR_FACTOR, 1.0);

    let depth = (BASE_DEPTH + DEPTH_GAIN * wind_factor * hour_factor).min(MAX_DEPTH);
    let relief_factor = 0.5 + 0.5 * (relief / RELIEF_NORM).min(1.0);
    let mut strength = MAX_STRENGTH
        * wind_factor
        * hour_factor
        * relief_factor
        * (1.0 - cloud_cover.clamp(0.0, 1.0));
    if wind_speed > WEAKENING_WIND || relief < SMALL_RELIEF {
        strength *= 0.5;
    }

    state.inversion_height = valley_elevation + depth;
    state.inversion_strength = strength;
}
