//! Snow cover collaborator

use crate::grid::Grid;
use rayon::prelude::*;

/// Surface effects of the snowpack on one cell, both in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnowEffect {
    /// Blend factor toward snow albedo
    pub albedo_effect: f32,
    /// Suppression of nighttime radiative loss
    pub insulation: f32,
}

/// Snow accumulation/melt model plugged into the thermodynamics pass
pub trait SnowCover: Send + Sync {
    /// Surface effects of a snowpack of `depth` metres
    fn effect(&self, depth: f32) -> SnowEffect;

    /// Melt the pack against the new air temperatures
    fn update(
        &self,
        snow_depth: &mut Grid<f32>,
        air_temperature: &Grid<f32>,
        sun_altitude: f32,
        time_factor: f32,
    );
}

/// Degree-hour melt with a solar term
#[derive(Debug, Clone, Copy)]
pub struct SimpleSnowpack {
    /// Melt per °C above freezing (m/h)
    pub melt_per_degree: f32,
    /// Melt at full sun (m/h)
    pub solar_melt: f32,
    /// Depth at which albedo is fully snow (m)
    pub albedo_depth: f32,
    /// Depth at which insulation saturates (m)
    pub insulation_depth: f32,
}

impl Default for SimpleSnowpack {
    fn default() -> Self {
        Self {
            melt_per_degree: 0.02,
            solar_melt: 0.03,
            albedo_depth: 0.1,
            insulation_depth: 0.3,
        }
    }
}

impl SnowCover for SimpleSnowpack {
    fn effect(&self, depth: f32) -> SnowEffect {
        let depth = depth.max(0.0);
        SnowEffect {
            albedo_effect: (depth / self.albedo_depth).min(1.0),
            insulation: (depth / self.insulation_depth).min(1.0),
        }
    }

    fn update(
        &self,
        snow_depth: &mut Grid<f32>,
        air_temperature: &Grid<f32>,
        sun_altitude: f32,
        time_factor: f32,
    ) {
        let solar = self.solar_melt * sun_altitude.max(0.0);
        snow_depth
            .as_mut_slice()
            .par_iter_mut()
            .zip(air_temperature.as_slice().par_iter())
            .for_each(|(depth, &temp)| {
                if *depth <= 0.0 {
                    *depth = 0.0;
                    return;
                }
                let melt = (self.melt_per_degree * temp.max(0.0) + solar) * time_factor;
                *depth = (*depth - melt).max(0.0);
            });
    }
}
