//! Precipitation rate and phase

use crate::grid::{CloudType, Precipitation, PrecipitationType};
use rand::Rng;

/// Upper bound on any precipitation rate
pub const MAX_PRECIPITATION_RATE: f32 = 2.0;
/// Rates below this are treated as no precipitation
pub const MIN_PRECIPITATION_RATE: f32 = 0.01;
/// Above this air temperature precipitation falls as rain (°C)
pub const RAIN_THRESHOLD: f32 = 2.0;
/// At or below this air temperature precipitation falls as snow (°C)
pub const SNOW_THRESHOLD: f32 = -5.0;
/// Gate probability per unit of cloud water
const GATE_PROBABILITY: f32 = 0.5;
const RANDOM_EFFICIENCY: std::ops::Range<f32> = 0.8..1.2;

/// Conversion efficiency of cloud water to precipitation by cloud type
pub fn precipitation_efficiency(cloud_type: CloudType) -> f32 {
    match cloud_type {
        CloudType::Cumulonimbus => 1.5,
        CloudType::Nimbostratus => 1.0,
        CloudType::Orographic => 0.8,
        CloudType::Cumulus => 0.6,
        CloudType::Stratus => 0.3,
        CloudType::None => 0.0,
    }
}

/// Deterministic rate: water × efficiency, capped
pub fn base_precipitation_rate(cloud_water: f32, cloud_type: CloudType) -> f32 {
    (cloud_water.max(0.0) * precipitation_efficiency(cloud_type)).min(MAX_PRECIPITATION_RATE)
}

/// Precipitation rate with stochastic gating.
///
/// When the gate fires (probability proportional to cloud water) the rate is
/// recomputed with a randomised efficiency. `bonus` is the coalescence
/// efficiency from large droplets. Draws from `rng` only when the cloud can
/// precipitate at all.
pub fn calculate_precipitation<R: Rng + ?Sized>(
    cloud_water: f32,
    cloud_type: CloudType,
    bonus: f32,
    rng: &mut R,
) -> f32 {
    let efficiency = precipitation_efficiency(cloud_type);
    if efficiency <= 0.0 || cloud_water <= 0.0 {
        return 0.0;
    }
    let efficiency = efficiency + bonus;
    let mut rate = cloud_water * efficiency;

    if rng.random::<f32>() < cloud_water * GATE_PROBABILITY {
        rate = cloud_water * efficiency * rng.random_range(RANDOM_EFFICIENCY);
    }

    rate.min(MAX_PRECIPITATION_RATE)
}

/// Phase from rate and air temperature
pub fn classify_precipitation(rate: f32, air_temperature: f32) -> Precipitation {
    if rate.is_nan() || rate < MIN_PRECIPITATION_RATE {
        return Precipitation::NONE;
    }
    let kind = if air_temperature > RAIN_THRESHOLD {
        PrecipitationType::Rain
    } else if air_temperature <= SNOW_THRESHOLD {
        PrecipitationType::Snow
    } else {
        PrecipitationType::Sleet
    };
    Precipitation { rate, kind }
}
