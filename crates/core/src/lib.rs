//! Microclimate Simulation Core Library
//!
//! A deterministic grid simulator for the local climate of a small terrain
//! patch. Each tick couples terrain-driven wind, the surface energy balance,
//! nocturnal inversions, fog, clouds, precipitation and snow cover.
//!
//! ## Simulation pipeline
//!
//! - Static terrain passes: connected regions, distance fields, hillshade
//! - Wind with katabatic drainage, föhn warming and valley channeling
//! - Per-cell energy balance with land-cover thermal properties
//! - Cloud formation (orographic, convective, fog-seeded) with microphysics
//! - Seeded randomness: identical seed and inputs reproduce identical runs

// Core types and collaborators
pub mod core_types;
pub mod error;

// Grid storage and static terrain passes
pub mod grid;

// Per-tick engines
pub mod atmosphere;

// Driver, clock, config and metrics
pub mod simulation;

// Re-export core types
pub use core_types::{
    BaselineClimate, DefaultMaterials, LandCover, MaterialTable, SeasonalClimate, SoilType,
    ThermalProperties, Vec2, WindVector,
};
pub use error::SimError;

// Re-export grid and engine types
pub use atmosphere::{Environment, SimpleSnowpack, SnowCover, SnowEffect};
pub use grid::{
    CloudType, Grid, Precipitation, PrecipitationType, SimulationState, TerrainConfig,
    TerrainGenerator,
};

// Re-export the driver
pub use simulation::{
    CellReport, Forcing, Simulation, SimulationClock, SimulationConfig, SimulationMetrics,
    SimulationToggles,
};
