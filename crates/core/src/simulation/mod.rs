//! Simulation driver
//!
//! `Simulation` owns the grid state, the seeded random source and the
//! external collaborators, and runs one ordered tick at a time:
//! 1. Wind field
//! 2. Inversion layer
//! 3. Fog, clouds and precipitation
//! 4. Energy balance, snow and diffusion
//! 5. Metrics

pub mod clock;
pub mod config;
pub mod metrics;

pub use clock::SimulationClock;
pub use config::{SimulationConfig, SimulationToggles};
pub use metrics::{calculate_simulation_metrics, SimulationMetrics};

use crate::atmosphere::clouds::{update_cloud_dynamics, CloudOptions};
use crate::atmosphere::inversion::update_inversion_layer;
use crate::atmosphere::snow::{SimpleSnowpack, SnowCover};
use crate::atmosphere::thermodynamics::{update_thermodynamics, ThermodynamicsOptions};
use crate::atmosphere::wind::update_wind;
use crate::atmosphere::Environment;
use crate::core_types::{
    sun_altitude, sun_azimuth, wrap_hour, BaselineClimate, DefaultMaterials, LandCover,
    MaterialTable, SeasonalClimate, SoilType, WindVector,
};
use crate::error::SimError;
use crate::grid::{
    clamp_finite, initialize_soil_moisture, CloudType, Precipitation, SimulationState,
    TerrainGenerator,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Exogenous inputs of one tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Forcing {
    /// Fractional month position (1.0 = January)
    pub month: f32,
    pub hour: f32,
    /// Sine proxy in [0, 1]
    pub sun_altitude: f32,
    /// Degrees clockwise from north
    pub sun_azimuth: f32,
    /// Simulated hours covered by this tick
    pub time_factor: f32,
    pub base_wind_speed: f32,
    /// Direction the wind blows toward, counter-clockwise from +x (degrees)
    pub wind_direction: f32,
    pub wind_gustiness: f32,
    pub toggles: SimulationToggles,
}

impl Forcing {
    /// Copy with every non-finite or out-of-range input replaced by a safe value.
    ///
    /// The hour wraps onto the 24 h clock (non-finite reads as noon), a
    /// non-finite direction reads as 0° and non-finite magnitudes as zero.
    pub fn sanitized(&self) -> Self {
        let non_negative = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
        Self {
            month: if self.month.is_finite() { self.month } else { 1.0 },
            hour: wrap_hour(self.hour),
            sun_altitude: clamp_finite(self.sun_altitude, 0.0, 1.0, 0.0),
            sun_azimuth: if self.sun_azimuth.is_finite() {
                self.sun_azimuth.rem_euclid(360.0)
            } else {
                180.0
            },
            time_factor: non_negative(self.time_factor),
            base_wind_speed: non_negative(self.base_wind_speed),
            wind_direction: if self.wind_direction.is_finite() {
                self.wind_direction
            } else {
                0.0
            },
            wind_gustiness: non_negative(self.wind_gustiness),
            toggles: self.toggles,
        }
    }
}

/// Read-only snapshot of one cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellReport {
    pub elevation: f32,
    pub land_cover: LandCover,
    pub soil_type: SoilType,
    pub region_id: u32,
    pub air_temperature: f32,
    pub soil_temperature: f32,
    pub humidity: f32,
    pub dew_point: f32,
    pub soil_moisture: f32,
    pub snow_depth: f32,
    pub wind: WindVector,
    pub fog_density: f32,
    pub cloud_coverage: f32,
    pub cloud_type: CloudType,
    pub precipitation: Precipitation,
}

/// Whether the state came from the terrain generator or the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TerrainSource {
    Generated,
    Custom,
}

/// Microclimate simulation over one terrain grid
pub struct Simulation {
    state: SimulationState,
    config: SimulationConfig,
    rng: StdRng,
    climate: Box<dyn BaselineClimate>,
    materials: Box<dyn MaterialTable>,
    snow: Box<dyn SnowCover>,
    clock: SimulationClock,
    metrics: SimulationMetrics,
    ticks: u64,
    source: TerrainSource,
}

impl Simulation {
    /// Generate terrain from `config` with the default collaborators
    pub fn new(config: SimulationConfig) -> Result<Self, SimError> {
        Self::with_collaborators(
            config,
            Box::new(SeasonalClimate::default()),
            Box::new(DefaultMaterials),
            Box::new(SimpleSnowpack::default()),
        )
    }

    /// Generate terrain from `config` with caller-supplied collaborators
    pub fn with_collaborators(
        config: SimulationConfig,
        climate: Box<dyn BaselineClimate>,
        materials: Box<dyn MaterialTable>,
        snow: Box<dyn SnowCover>,
    ) -> Result<Self, SimError> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let state = TerrainGenerator::new(config.terrain.clone()).generate(&mut rng, &*materials)?;
        Ok(Self::assemble(
            config,
            state,
            rng,
            climate,
            materials,
            snow,
            TerrainSource::Generated,
        ))
    }

    /// Drive a caller-built state (e.g. from [`SimulationState::from_terrain`])
    /// with the default collaborators. Soil moisture is initialised here.
    pub fn from_state(config: SimulationConfig, mut state: SimulationState) -> Result<Self, SimError> {
        let terrain = crate::grid::TerrainConfig {
            size: state.size,
            cell_size: state.cell_size,
            ..config.terrain.clone()
        };
        let config = SimulationConfig { terrain, ..config };
        config.validate()?;

        let materials: Box<dyn MaterialTable> = Box::new(DefaultMaterials);
        initialize_soil_moisture(&mut state, &*materials);
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self::assemble(
            config,
            state,
            rng,
            Box::new(SeasonalClimate::default()),
            materials,
            Box::new(SimpleSnowpack::default()),
            TerrainSource::Custom,
        ))
    }

    fn assemble(
        config: SimulationConfig,
        state: SimulationState,
        rng: StdRng,
        climate: Box<dyn BaselineClimate>,
        materials: Box<dyn MaterialTable>,
        snow: Box<dyn SnowCover>,
        source: TerrainSource,
    ) -> Self {
        let clock = SimulationClock::new(config.start_month, config.start_hour);
        let metrics = calculate_simulation_metrics(&state);
        info!(
            "Simulation created: {}x{} grid, cell_size={:.1}m, seed={}, start {}",
            state.size, state.size, state.cell_size, config.seed, clock
        );
        Self {
            state,
            config,
            rng,
            climate,
            materials,
            snow,
            clock,
            metrics,
            ticks: 0,
            source,
        }
    }

    /// Forcing for the current clock and configured wind
    pub fn forcing(&self) -> Forcing {
        let month = self.clock.month_position();
        let hour = self.clock.hour;
        let daylight = self.climate.daylight(month);
        Forcing {
            month,
            hour,
            sun_altitude: sun_altitude(&daylight, hour),
            sun_azimuth: sun_azimuth(&daylight, hour),
            time_factor: self.config.time_factor,
            base_wind_speed: self.config.base_wind_speed,
            wind_direction: self.config.wind_direction,
            wind_gustiness: self.config.wind_gustiness,
            toggles: self.config.toggles,
        }
    }

    /// Run one ordered tick with explicit forcing. The clock is not advanced.
    ///
    /// Non-finite forcing values are replaced first (see [`Forcing::sanitized`]).
    pub fn tick_with(&mut self, forcing: &Forcing) -> SimulationMetrics {
        let forcing = &forcing.sanitized();
        let env = Environment {
            climate: &*self.climate,
            materials: &*self.materials,
            snow: &*self.snow,
        };
        let state = &mut self.state;

        // 1. Wind
        update_wind(
            state,
            forcing.hour,
            forcing.base_wind_speed,
            forcing.wind_direction,
            forcing.wind_gustiness,
            &mut self.rng,
        );

        // 2. Inversion
        if forcing.toggles.inversions {
            let cloud_cover = state.mean_cloud_coverage();
            update_inversion_layer(state, forcing.hour, forcing.base_wind_speed, cloud_cover);
        } else {
            state.inversion_height = 0.0;
            state.inversion_strength = 0.0;
        }

        // 3. Fog, clouds and precipitation
        update_cloud_dynamics(
            state,
            &CloudOptions {
                month: forcing.month,
                hour: forcing.hour,
                wind_speed: forcing.base_wind_speed,
                wind_direction: forcing.wind_direction,
                sun_altitude: forcing.sun_altitude,
                time_factor: forcing.time_factor,
            },
            &env,
            &mut self.rng,
        );

        // 4. Energy balance, snow and diffusion
        update_thermodynamics(
            state,
            &ThermodynamicsOptions {
                month: forcing.month,
                hour: forcing.hour,
                sun_altitude: forcing.sun_altitude,
                sun_azimuth: forcing.sun_azimuth,
                time_factor: forcing.time_factor,
                diffusion: forcing.toggles.diffusion,
                inversions: forcing.toggles.inversions,
                downslope: forcing.toggles.downslope,
                running: forcing.time_factor > 0.0,
            },
            &env,
        );

        // 5. Metrics
        self.metrics = calculate_simulation_metrics(state);
        self.ticks += 1;
        debug!(
            "Tick {} at {:.2}h: T={:.1}..{:.1}°C (avg {:.1}), precip={:.3}, cloud_top={:.0}m, snow={:.3}m, inversion={:.1}°C",
            self.ticks,
            forcing.hour,
            self.metrics.min_temperature,
            self.metrics.max_temperature,
            self.metrics.avg_temperature,
            self.metrics.avg_precipitation,
            self.metrics.max_cloud_top,
            self.metrics.avg_snow_depth,
            state.inversion_strength
        );
        self.metrics
    }

    /// Run one tick from the internal clock and advance it
    pub fn tick(&mut self) -> SimulationMetrics {
        let forcing = self.forcing();
        let metrics = self.tick_with(&forcing);
        self.clock.advance(forcing.time_factor);
        metrics
    }

    /// Run enough ticks to cover `hours` of simulated time
    pub fn run(&mut self, hours: f32) -> SimulationMetrics {
        let tf = self.config.time_factor;
        if hours.is_nan() || hours <= 0.0 || tf <= 0.0 {
            return self.metrics;
        }
        let steps = (hours / tf).ceil() as u64;
        for _ in 0..steps {
            self.tick();
        }
        self.metrics
    }

    /// Return to the initial state. Generated terrain is regenerated from
    /// the seed, so a reset simulation replays identically.
    pub fn reset(&mut self) -> Result<(), SimError> {
        self.rng = StdRng::seed_from_u64(self.config.seed);
        match self.source {
            TerrainSource::Generated => {
                self.state = TerrainGenerator::new(self.config.terrain.clone())
                    .generate(&mut self.rng, &*self.materials)?;
            }
            TerrainSource::Custom => {
                self.state.reset_dynamic(&mut self.rng);
                initialize_soil_moisture(&mut self.state, &*self.materials);
            }
        }
        self.clock = SimulationClock::new(self.config.start_month, self.config.start_hour);
        self.metrics = calculate_simulation_metrics(&self.state);
        self.ticks = 0;
        info!("Simulation reset: seed={}, start {}", self.config.seed, self.clock);
        Ok(())
    }

    /// Probe one cell; `None` outside the grid
    pub fn cell_report(&self, x: usize, y: usize) -> Option<CellReport> {
        let s = &self.state;
        if x >= s.size || y >= s.size {
            return None;
        }
        let idx = s.index(x, y);
        Some(CellReport {
            elevation: s.elevation[idx],
            land_cover: s.land_cover[idx],
            soil_type: s.soil_type[idx],
            region_id: s.region_id[idx],
            air_temperature: s.air_temperature[idx],
            soil_temperature: s.soil_temperature[idx],
            humidity: s.humidity[idx],
            dew_point: s.dew_point[idx],
            soil_moisture: s.soil_moisture[idx],
            snow_depth: s.snow_depth[idx],
            wind: s.wind[idx],
            fog_density: s.fog_density[idx],
            cloud_coverage: s.cloud_coverage[idx],
            cloud_type: s.cloud_type[idx],
            precipitation: s.precipitation[idx],
        })
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn clock(&self) -> SimulationClock {
        self.clock
    }

    /// Metrics of the last tick (or of the initial state)
    pub fn metrics(&self) -> SimulationMetrics {
        self.metrics
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(seed: u64) -> SimulationConfig {
        let mut config = SimulationConfig {
            seed,
            ..Default::default()
        };
        config.terrain.size = 24;
        config
    }

    #[test]
    fn test_tick_advances_clock() {
        let mut sim = Simulation::new(small_config(1)).unwrap();
        let start = sim.clock();
        sim.tick();
        assert_eq!(sim.ticks(), 1);
        assert_eq!(sim.clock().hour, start.hour + 1.0);
    }

    #[test]
    fn test_run_covers_hours() {
        let mut config = small_config(2);
        config.time_factor = 0.5;
        let mut sim = Simulation::new(config).unwrap();
        sim.run(3.0);
        assert_eq!(sim.ticks(), 6);
        assert_eq!(sim.clock().hour, 9.0);
    }

    #[test]
    fn test_reset_replays() {
        let mut sim = Simulation::new(small_config(3)).unwrap();
        let first = sim.run(4.0);
        let snapshot = sim.state().air_temperature.clone();
        sim.reset().unwrap();
        assert_eq!(sim.ticks(), 0);
        let second = sim.run(4.0);
        assert_eq!(first, second);
        assert_eq!(sim.state().air_temperature, snapshot);
    }

    #[test]
    fn test_cell_report_bounds() {
        let sim = Simulation::new(small_config(4)).unwrap();
        assert!(sim.cell_report(0, 0).is_some());
        assert!(sim.cell_report(24, 0).is_none());
        let report = sim.cell_report(5, 5).unwrap();
        assert_eq!(report.elevation, *sim.state().elevation.at(5, 5));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_config(5);
        config.start_month = 0;
        assert!(Simulation::new(config).is_err());
    }

    #[test]
    fn test_forcing_follows_clock() {
        let mut config = small_config(6);
        config.start_hour = 0.0;
        let sim = Simulation::new(config).unwrap();
        assert_eq!(sim.forcing().sun_altitude, 0.0);
        let mut config = small_config(6);
        config.start_hour = 13.0;
        let sim = Simulation::new(config).unwrap();
        assert!(sim.forcing().sun_altitude > 0.5);
    }

    #[test]
    fn test_sanitized_forcing_replaces_non_finite() {
        let sim = Simulation::new(small_config(7)).unwrap();
        let mut forcing = sim.forcing();
        forcing.hour = 30.0;
        forcing.wind_direction = f32::NAN;
        forcing.base_wind_speed = f32::INFINITY;
        forcing.wind_gustiness = -1.0;
        forcing.sun_altitude = f32::NAN;

        let clean = forcing.sanitized();
        assert_eq!(clean.hour, 6.0);
        assert_eq!(clean.wind_direction, 0.0);
        assert_eq!(clean.base_wind_speed, 0.0);
        assert_eq!(clean.wind_gustiness, 0.0);
        assert_eq!(clean.sun_altitude, 0.0);
        assert_eq!(clean.time_factor, forcing.time_factor);

        let mut hourless = forcing;
        hourless.hour = f32::NAN;
        assert_eq!(hourless.sanitized().hour, 12.0);
    }
}
