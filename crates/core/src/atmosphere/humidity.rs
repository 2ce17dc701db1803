//! Humidity budget and dew point

use crate::core_types::{LandCover, ThermalProperties};
use crate::grid::{clamp_finite, Precipitation, PrecipitationType};

/// Magnus formula coefficient a
pub const MAGNUS_A: f32 = 17.27;
/// Magnus formula coefficient b (°C)
pub const MAGNUS_B: f32 = 237.7;

/// Open-water evaporation rate at 0 °C and calm air (per hour)
const WATER_EVAPORATION: f32 = 0.05;
const FOREST_EVAPORATION: f32 = 0.02;
const SOIL_EVAPORATION: f32 = 0.03;
/// Humidity removed per unit of liquid precipitation rate (per hour)
const PRECIPITATION_SINK: f32 = 0.05;

/// Dew point from temperature (°C) and relative humidity [0, 1].
///
/// Magnus approximation; humidity is floored at 1% so the logarithm stays finite.
pub fn dew_point(temperature: f32, relative_humidity: f32) -> f32 {
    let rh = if relative_humidity.is_finite() {
        relative_humidity.clamp(0.01, 1.0)
    } else {
        0.5
    };
    let gamma = MAGNUS_A * temperature / (MAGNUS_B + temperature) + rh.ln();
    MAGNUS_B * gamma / (MAGNUS_A - gamma)
}

/// Evaporative humidity source for one cell (per hour).
///
/// Open water evaporates fastest and speeds up with warmth and wind.
pub fn evaporation_source(
    land: LandCover,
    props: &ThermalProperties,
    temperature: f32,
    wind_speed: f32,
    soil_moisture: f32,
) -> f32 {
    match land {
        LandCover::Water => {
            WATER_EVAPORATION * (1.0 + temperature.max(0.0) / 20.0) * (1.0 + wind_speed / 10.0)
        }
        LandCover::Forest => FOREST_EVAPORATION,
        _ => soil_moisture * props.evaporation * SOIL_EVAPORATION,
    }
}

/// Humidity sink from falling liquid precipitation (per hour). Snow removes none.
pub fn precipitation_sink(precipitation: Precipitation) -> f32 {
    match precipitation.kind {
        PrecipitationType::Rain | PrecipitationType::Sleet => {
            precipitation.rate * PRECIPITATION_SINK
        }
        PrecipitationType::Snow | PrecipitationType::None => 0.0,
    }
}

/// Integrate the humidity budget and clamp to [0, 1].
///
/// A non-finite budget keeps the previous humidity.
#[inline]
pub fn integrate_humidity(humidity: f32, source: f32, sink: f32, time_factor: f32) -> f32 {
    let previous = clamp_finite(humidity, 0.0, 1.0, 0.5);
    clamp_finite(humidity + (source - sink) * time_factor, 0.0, 1.0, previous)
}
