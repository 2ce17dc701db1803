//! Simulation configuration

use crate::error::SimError;
use crate::grid::TerrainConfig;
use serde::{Deserialize, Serialize};

/// Optional physics passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationToggles {
    /// Jacobi smoothing of air and soil temperature
    pub diffusion: bool,
    /// Nocturnal inversion layer
    pub inversions: bool,
    /// Katabatic cooling and föhn warming in the energy balance
    pub downslope: bool,
}

impl Default for SimulationToggles {
    fn default() -> Self {
        Self {
            diffusion: true,
            inversions: true,
            downslope: true,
        }
    }
}

/// Everything needed to build and drive a [`Simulation`](super::Simulation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seed of the single random source
    pub seed: u64,
    pub terrain: TerrainConfig,
    /// Simulated hours per tick
    pub time_factor: f32,
    /// 1..=12
    pub start_month: u32,
    pub start_hour: f32,
    /// Prevailing wind speed (m/s)
    pub base_wind_speed: f32,
    /// Direction the wind blows toward, counter-clockwise from +x (degrees)
    pub wind_direction: f32,
    pub wind_gustiness: f32,
    pub toggles: SimulationToggles,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            terrain: TerrainConfig::default(),
            time_factor: 1.0,
            start_month: 6,
            start_hour: 6.0,
            base_wind_speed: 3.0,
            wind_direction: 0.0,
            wind_gustiness: 0.3,
            toggles: SimulationToggles::default(),
        }
    }
}

impl SimulationConfig {
    /// Reject values that would make a tick meaningless
    pub fn validate(&self) -> Result<(), SimError> {
        self.terrain.validate()?;

        let non_negative = [
            ("time_factor", self.time_factor),
            ("base_wind_speed", self.base_wind_speed),
            ("wind_gustiness", self.wind_gustiness),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::InvalidParameter { name, value });
            }
        }
        for (name, value) in [
            ("start_hour", self.start_hour),
            ("wind_direction", self.wind_direction),
        ] {
            if !value.is_finite() {
                return Err(SimError::InvalidParameter { name, value });
            }
        }
        if !(1..=12).contains(&self.start_month) {
            return Err(SimError::InvalidParameter {
                name: "start_month",
                value: self.start_month as f32,
            });
        }
        Ok(())
    }
}
