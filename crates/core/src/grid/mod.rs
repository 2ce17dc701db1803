//! Grid storage, simulation state and the static terrain passes

pub mod field;
pub mod hillshade;
pub mod regions;
pub mod soil_moisture;
pub mod state;
pub mod terrain;

pub use field::{clamp_finite, Grid, NEIGHBORS_8};
pub use hillshade::compute_hillshade;
pub use regions::{compute_distance_fields, label_regions, multi_source_distance, DistanceField};
pub use soil_moisture::initialize_soil_moisture;
pub use state::{
    CloudType, Precipitation, PrecipitationType, SimulationState, MAX_CLOUD_WATER,
    NEUTRAL_TEMPERATURE, TEMPERATURE_RANGE,
};
pub use terrain::{TerrainConfig, TerrainGenerator};
