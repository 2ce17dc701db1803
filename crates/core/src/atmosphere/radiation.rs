//! Cloud radiative feedback consumed by the thermodynamics pass

use crate::grid::SimulationState;

/// Optical depth to extinction coefficient
const EXTINCTION_SCALE: f32 = 0.1;
/// Sun altitude floor for the slant path, keeps the path finite at the horizon
const MIN_SUN_FOR_PATH: f32 = 0.1;
/// Longwave warming at full cover (°C/h)
const LONGWAVE_WARMING: f32 = 0.8;
/// Coverage below which a cell counts as clear
const CLEAR_SKY_COVERAGE: f32 = 0.01;

/// Radiative effect of the cloud above a cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudRadiation {
    /// Fraction of clear-sky shortwave reaching the surface [0, 1]
    pub solar_transmission: f32,
    /// Downwelling longwave warming (°C/h)
    pub longwave_warming: f32,
}

impl CloudRadiation {
    pub const CLEAR: Self = Self {
        solar_transmission: 1.0,
        longwave_warming: 0.0,
    };
}

/// Beer's-law transmission through the covered fraction, with a slant path
/// that lengthens as the sun drops.
pub fn cloud_radiation(coverage: f32, optical_depth: f32, sun_altitude: f32) -> CloudRadiation {
    if coverage <= CLEAR_SKY_COVERAGE {
        return CloudRadiation::CLEAR;
    }
    let path = 1.0 / sun_altitude.max(MIN_SUN_FOR_PATH);
    let cloud_transmission = (-optical_depth * EXTINCTION_SCALE * path).exp();
    CloudRadiation {
        solar_transmission: ((1.0 - coverage) + coverage * cloud_transmission).clamp(0.0, 1.0),
        longwave_warming: coverage * LONGWAVE_WARMING,
    }
}

/// Radiative feedback of the cloud over `(x, y)`; clear sky outside the grid
pub fn calculate_cloud_radiation(
    state: &SimulationState,
    x: usize,
    y: usize,
    sun_altitude: f32,
) -> CloudRadiation {
    if x >= state.size || y >= state.size {
        return CloudRadiation::CLEAR;
    }
    let idx = state.index(x, y);
    cloud_radiation(
        state.cloud_coverage[idx],
        state.cloud_optical_depth[idx],
        sun_altitude,
    )
}
