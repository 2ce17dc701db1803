//! Radiation fog

use crate::atmosphere::advection::advect;
use crate::grid::{clamp_finite, Grid, SimulationState};

/// Fog forms below this dew-point deficit (°C)
const FORMATION_DEFICIT: f32 = 1.5;
/// Fog forms only in lighter wind (m/s)
const FORMATION_MAX_WIND: f32 = 3.0;
const FORMATION_MIN_HUMIDITY: f32 = 0.85;
/// Formation rate at zero deficit (per hour)
const FORMATION_RATE: f32 = 0.1;
/// Burn-off rate at full sun (per hour)
const SOLAR_DISSIPATION: f32 = 0.3;
/// Mixing-out rate per m/s of wind (per hour)
const WIND_DISSIPATION: f32 = 0.05;
/// Fog thicker than this seeds a stratus deck
pub const STRATUS_FOG_THRESHOLD: f32 = 0.3;
const STRATUS_POTENTIAL_SCALE: f32 = 0.2;

/// Fog density after one step at a single cell, clamped to [0, 1].
///
/// A non-finite result keeps the previous density (or clears it).
pub fn step_fog(
    fog: f32,
    air_temperature: f32,
    dew_point: f32,
    humidity: f32,
    wind_speed: f32,
    sun_altitude: f32,
    time_factor: f32,
) -> f32 {
    let deficit = air_temperature - dew_point;
    let formation = if deficit < FORMATION_DEFICIT
        && wind_speed < FORMATION_MAX_WIND
        && humidity > FORMATION_MIN_HUMIDITY
    {
        FORMATION_RATE * (FORMATION_DEFICIT - deficit.max(0.0)) / FORMATION_DEFICIT
    } else {
        0.0
    };
    let dissipation =
        (SOLAR_DISSIPATION * sun_altitude.max(0.0) + WIND_DISSIPATION * wind_speed) * fog;
    let previous = clamp_finite(fog, 0.0, 1.0, 0.0);
    clamp_finite(fog + (formation - dissipation) * time_factor, 0.0, 1.0, previous)
}

/// Form, dissipate and transport fog over the whole grid
pub fn update_fog(state: &mut SimulationState, sun_altitude: f32, time_factor: f32) {
    let size = state.size;
    let formed = Grid::from_fn(size, |x, y| {
        let idx = y * size + x;
        step_fog(
            state.fog_density[idx],
            state.air_temperature[idx],
            state.dew_point[idx],
            state.humidity[idx],
            state.wind[idx].speed,
            sun_altitude,
            time_factor,
        )
    });
    state.fog_density =
        advect(&formed, &state.wind, time_factor).map(|&f| clamp_finite(f, 0.0, 1.0, 0.0));
}

/// Stratus formation potential contributed by fog
#[inline]
pub fn fog_cloud_potential(fog: f32) -> f32 {
    if fog > STRATUS_FOG_THRESHOLD {
        STRATUS_POTENTIAL_SCALE * fog
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_forms_in_calm_saturated_air() {
        let fog = step_fog(0.0, 10.0, 10.0, 0.95, 0.5, 0.0, 1.0);
        assert_relative_eq!(fog, 0.1);
    }

    #[test]
    fn test_no_formation_in_wind_or_dry_air() {
        assert_eq!(step_fog(0.0, 10.0, 10.0, 0.95, 5.0, 0.0, 1.0), 0.0);
        assert_eq!(step_fog(0.0, 10.0, 10.0, 0.6, 0.5, 0.0, 1.0), 0.0);
        assert_eq!(step_fog(0.0, 15.0, 10.0, 0.95, 0.5, 0.0, 1.0), 0.0);
    }

    #[test]
    fn test_sun_burns_off_fog() {
        let fog = step_fog(0.5, 15.0, 5.0, 0.6, 1.0, 1.0, 1.0);
        assert_relative_eq!(fog, 0.5 - 0.35 * 0.5);
    }

    #[test]
    fn test_stratus_potential_threshold() {
        assert_eq!(fog_cloud_potential(0.3), 0.0);
        assert_relative_eq!(fog_cloud_potential(0.5), 0.1);
    }

    #[test]
    fn test_update_fog_bounded() {
        let mut state = SimulationState::new(5, 30.0).unwrap();
        state.humidity.fill(0.99);
        state.dew_point = state.air_temperature.clone();
        for _ in 0..50 {
            update_fog(&mut state, 0.0, 1.0);
        }
        assert!(state.fog_density.iter().all(|&f| (0.0..=1.0).contains(&f)));
        assert!(state.fog_density.iter().all(|&f| f > 0.9));
    }

    #[test]
    fn test_non_finite_wind_keeps_fog_bounded() {
        assert_eq!(step_fog(0.4, 10.0, 10.0, 0.95, f32::NAN, 0.0, 1.0), 0.4);
        assert_eq!(step_fog(f32::NAN, 10.0, 10.0, 0.95, f32::NAN, 0.0, 1.0), 0.0);

        let mut state = SimulationState::new(5, 30.0).unwrap();
        state.fog_density.fill(0.5);
        state.wind.fill(crate::core_types::WindVector::new(f32::NAN, f32::NAN));
        update_fog(&mut state, 0.0, 1.0);
        assert!(state.fog_density.iter().all(|&f| (0.0..=1.0).contains(&f)));
    }
}
