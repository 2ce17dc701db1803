//! Per-tick atmospheric and surface engines
//!
//! This module models the boundary-layer microclimate over the grid:
//! - Terrain-driven wind (katabatic drainage, föhn, valley channeling)
//! - Surface energy balance and nocturnal inversions
//! - Fog, clouds, precipitation and cloud microphysics
//! - Snow cover feedback on albedo and radiative cooling
//!
//! Every engine takes the [`SimulationState`](crate::grid::SimulationState)
//! by exclusive reference, reads the previous snapshot and commits whole
//! grids at the end of its pass.
//!
//! # References
//!
//! - Oke, T.R. (1987). "Boundary Layer Climates." Routledge.
//! - Whiteman, C.D. (2000). "Mountain Meteorology: Fundamentals and Applications."
//! - Rogers, R.R. & Yau, M.K. (1989). "A Short Course in Cloud Physics."

pub mod advection;
pub mod clouds;
pub mod fog;
pub mod humidity;
pub mod inversion;
pub mod microphysics;
pub mod precipitation;
pub mod radiation;
pub mod snow;
pub mod thermodynamics;
pub mod valley_channeling;
pub mod wind;

use crate::core_types::{BaselineClimate, MaterialTable};

pub use advection::advect;
pub use clouds::{update_cloud_dynamics, CloudOptions};
pub use inversion::update_inversion_layer;
pub use precipitation::{base_precipitation_rate, calculate_precipitation, classify_precipitation};
pub use radiation::{calculate_cloud_radiation, CloudRadiation};
pub use snow::{SimpleSnowpack, SnowCover, SnowEffect};
pub use thermodynamics::{calculate_solar_insolation, update_thermodynamics, ThermodynamicsOptions};
pub use wind::update_wind;

/// External collaborators the engines consult
#[derive(Clone, Copy)]
pub struct Environment<'a> {
    pub climate: &'a dyn BaselineClimate,
    pub materials: &'a dyn MaterialTable,
    pub snow: &'a dyn SnowCover,
}
