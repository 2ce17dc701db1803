//! Procedural terrain generation
//!
//! Builds elevation, land cover and soil for a square grid from summed
//! sinusoidal relief, uniform jitter and a set of hand-placed features.
//! Features are laid out in fractional coordinates so the landscape keeps
//! its shape at any grid size:
//!
//! ```text
//!  fx: 0 ─ lake ─ 0.25 ─ valley ─ 0.45 ── 0.55 ─ foothills ─ 0.70 ─ ridge ─ 0.85 ─ lee slope ─ 1
//!  fy: forest band 0.15..0.35, dune belt 0.85..0.97, settlement blob at (0.55, 0.55)
//! ```
//!
//! Random draws are consumed in row-major order, four per cell, so a seed
//! fully determines the result.

use crate::core_types::noise::SinusoidalRelief;
use crate::core_types::{LandCover, MaterialTable, SoilType};
use crate::error::SimError;
use crate::grid::{initialize_soil_moisture, Grid, SimulationState};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use tracing::info;

const VALLEY_START: f32 = 0.25;
const VALLEY_END: f32 = 0.45;
const FOOTHILL_START: f32 = 0.55;
const RIDGE_START: f32 = 0.70;
const RIDGE_END: f32 = 0.85;
/// Foothill top as a fraction of ridge height
const FOOTHILL_FRACTION: f32 = 0.3;
const LAKE_CENTER: (f32, f32) = (0.2, 0.75);
/// Depth of the lake surface below the base elevation (m)
const LAKE_DEPTH: f32 = 20.0;
const FOREST_BAND: (f32, f32) = (0.15, 0.35);
const FOREST_SPAN: (f32, f32) = (0.05, 0.65);
const FOREST_PROBABILITY: f32 = 0.8;
const DUNE_BAND: (f32, f32) = (0.85, 0.97);
const DUNE_SPAN: (f32, f32) = (0.35, 0.75);
const DUNE_PROBABILITY: f32 = 0.7;
const SETTLEMENT_CENTER: (f32, f32) = (0.55, 0.55);
/// Settlement blob Manhattan radius as a fraction of grid size
const SETTLEMENT_RADIUS: f32 = 0.06;
/// Urban core Manhattan radius as a fraction of grid size
const URBAN_RADIUS: f32 = 0.025;
/// Amplitude of per-cell elevation jitter (m)
const ELEVATION_JITTER: f32 = 3.0;
/// Cells this close above base elevation default to clay/loam lowland soils (m)
const LOWLAND_BAND: f32 = 20.0;

/// Terrain generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainConfig {
    /// Grid side length in cells
    pub size: usize,
    /// Horizontal cell size (m)
    pub cell_size: f32,
    /// Elevation offset applied to the whole grid (m)
    pub base_elevation: f32,
    /// Peak height of the ridge above the foothills (m)
    pub ridge_height: f32,
    /// Maximum valley depression (m)
    pub valley_depth: f32,
    /// Lake radius as a fraction of grid size
    pub lake_radius_fraction: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            size: 100,
            cell_size: 30.0,
            base_elevation: 200.0,
            ridge_height: 600.0,
            valley_depth: 80.0,
            lake_radius_fraction: 0.08,
        }
    }
}

impl TerrainConfig {
    /// Reject sizes and lengths that cannot form a grid
    pub fn validate(&self) -> Result<(), SimError> {
        if self.size < 3 {
            return Err(SimError::InvalidGridSize { size: self.size });
        }
        let positive = [("cell_size", self.cell_size)];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimError::InvalidParameter { name, value });
            }
        }
        let non_negative = [
            ("ridge_height", self.ridge_height),
            ("valley_depth", self.valley_depth),
            ("lake_radius_fraction", self.lake_radius_fraction),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::InvalidParameter { name, value });
            }
        }
        if !self.base_elevation.is_finite() {
            return Err(SimError::InvalidParameter {
                name: "base_elevation",
                value: self.base_elevation,
            });
        }
        Ok(())
    }
}

/// Terrain for one cell before regions and fields are derived
struct CellTerrain {
    elevation: f32,
    land: LandCover,
    soil: SoilType,
}

/// Generates static terrain and the neutral initial atmosphere
#[derive(Debug, Clone, Default)]
pub struct TerrainGenerator {
    pub config: TerrainConfig,
    relief: SinusoidalRelief,
}

impl TerrainGenerator {
    pub fn new(config: TerrainConfig) -> Self {
        Self {
            config,
            relief: SinusoidalRelief::default(),
        }
    }

    /// Elevation from relief, jitter and the ridge/foothill/valley bands.
    fn elevation(&self, fx: f32, fy: f32, jitter: f32) -> f32 {
        let cfg = &self.config;
        let foothill_top = cfg.ridge_height * FOOTHILL_FRACTION;
        let mut e = cfg.base_elevation + self.relief.sample(fx, fy) + jitter;

        if (FOOTHILL_START..RIDGE_START).contains(&fx) {
            e += foothill_top * (fx - FOOTHILL_START) / (RIDGE_START - FOOTHILL_START);
        } else if (RIDGE_START..RIDGE_END).contains(&fx) {
            let axis = (RIDGE_START + RIDGE_END) / 2.0;
            let half_width = (RIDGE_END - RIDGE_START) / 2.0;
            let falloff = (fx - axis).abs() / half_width;
            let crest = cfg.ridge_height * (0.75 + 0.25 * (fy * TAU * 2.0).sin());
            e += foothill_top + crest * (1.0 - falloff).max(0.0);
        } else if fx >= RIDGE_END {
            e += foothill_top * (1.0 - (fx - RIDGE_END) / (1.0 - RIDGE_END));
        }

        if (VALLEY_START..VALLEY_END).contains(&fx) {
            let center = (VALLEY_START + VALLEY_END) / 2.0;
            let half_width = (VALLEY_END - VALLEY_START) / 2.0;
            let depth_factor = 1.0 - (fx - center).abs() / half_width;
            e -= cfg.valley_depth * depth_factor;
            e = e.max(cfg.base_elevation - cfg.valley_depth);
        }

        e
    }

    /// Default soil from elevation when no feature overrides it
    fn default_soil(&self, elevation: f32, roll: f32) -> SoilType {
        let cfg = &self.config;
        if elevation < cfg.base_elevation + LOWLAND_BAND {
            if roll < 0.5 {
                SoilType::Clay
            } else {
                SoilType::Loam
            }
        } else if elevation > cfg.base_elevation + cfg.ridge_height * 0.5 {
            SoilType::Rock
        } else if roll < 0.6 {
            SoilType::Loam
        } else if roll < 0.8 {
            SoilType::Sand
        } else {
            SoilType::Clay
        }
    }

    fn cell<R: Rng + ?Sized>(&self, x: usize, y: usize, rng: &mut R) -> CellTerrain {
        let n = self.config.size as f32;
        let fx = (x as f32 + 0.5) / n;
        let fy = (y as f32 + 0.5) / n;

        let jitter = rng.random_range(-ELEVATION_JITTER..ELEVATION_JITTER);
        let soil_roll: f32 = rng.random();
        let forest_roll: f32 = rng.random();
        let dune_roll: f32 = rng.random();

        let mut elevation = self.elevation(fx, fy, jitter);
        let mut land = LandCover::Grassland;
        let mut soil = self.default_soil(elevation, soil_roll);

        let in_band = |v: f32, band: (f32, f32)| v >= band.0 && v < band.1;

        if in_band(fy, FOREST_BAND) && in_band(fx, FOREST_SPAN) && forest_roll < FOREST_PROBABILITY
        {
            land = LandCover::Forest;
            soil = SoilType::Loam;
        }

        if in_band(fy, DUNE_BAND) && in_band(fx, DUNE_SPAN) && dune_roll < DUNE_PROBABILITY {
            soil = SoilType::Sand;
        }

        let manhattan = ((x as f32 - SETTLEMENT_CENTER.0 * n).abs()
            + (y as f32 - SETTLEMENT_CENTER.1 * n).abs())
            / n;
        if manhattan <= URBAN_RADIUS {
            land = LandCover::Urban;
        } else if manhattan <= SETTLEMENT_RADIUS {
            land = LandCover::Settlement;
        }

        let lake_dx = x as f32 - LAKE_CENTER.0 * n;
        let lake_dy = y as f32 - LAKE_CENTER.1 * n;
        let lake_radius = self.config.lake_radius_fraction * n;
        if (lake_dx * lake_dx + lake_dy * lake_dy).sqrt() <= lake_radius {
            land = LandCover::Water;
            elevation = self.config.base_elevation - LAKE_DEPTH;
        }

        CellTerrain {
            elevation,
            land,
            soil,
        }
    }

    /// Generate a complete state: terrain, neutral atmosphere, regions,
    /// distance fields, hillshade and initial soil moisture.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        materials: &dyn MaterialTable,
    ) -> Result<SimulationState, SimError> {
        self.config.validate()?;
        let size = self.config.size;

        let mut elevation = Vec::with_capacity(size * size);
        let mut land_cover = Vec::with_capacity(size * size);
        let mut soil_type = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                let cell = self.cell(x, y, rng);
                elevation.push(cell.elevation);
                land_cover.push(cell.land);
                soil_type.push(cell.soil);
            }
        }

        let mut state = SimulationState::from_terrain(
            size,
            self.config.cell_size,
            elevation,
            land_cover,
            soil_type,
        )?;
        state.reset_dynamic(rng);
        initialize_soil_moisture(&mut state, materials);

        let (min_e, max_e) = state
            .elevation
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &e| (lo.min(e), hi.max(e)));
        info!(
            "Generated {}x{} terrain: elevation {:.0}..{:.0}m, {} regions",
            size,
            size,
            min_e,
            max_e,
            state.region_count()
        );

        Ok(state)
    }
}

/// Flat grass/loam state at a uniform elevation
pub fn flat_terrain(size: usize, cell_size: f32, elevation: f32) -> Result<SimulationState, SimError> {
    SimulationState::from_terrain(
        size,
        cell_size,
        vec![elevation; size * size],
        vec![LandCover::Grassland; size * size],
        vec![SoilType::Loam; size * size],
    )
}

/// Grass/loam state with a single Gaussian hill in the centre
pub fn single_hill(
    size: usize,
    cell_size: f32,
    base_elevation: f32,
    hill_height: f32,
    hill_radius_cells: f32,
) -> Result<SimulationState, SimError> {
    let center = (size as f32 - 1.0) / 2.0;
    let elevation = Grid::from_fn(size, |x, y| {
        let dx = x as f32 - center;
        let dy = y as f32 - center;
        let dist_sq = dx * dx + dy * dy;
        base_elevation + hill_height * (-dist_sq / (hill_radius_cells * hill_radius_cells)).exp()
    });
    SimulationState::from_terrain(
        size,
        cell_size,
        elevation.as_slice().to_vec(),
        vec![LandCover::Grassland; size * size],
        vec![SoilType::Loam; size * size],
    )
}

/// Grass/loam state with a north-south valley between two parallel ridges
pub fn valley_between_ridges(
    size: usize,
    cell_size: f32,
    base_elevation: f32,
    ridge_height: f32,
    valley_half_width_cells: f32,
) -> Result<SimulationState, SimError> {
    let center = (size as f32 - 1.0) / 2.0;
    let elevation = Grid::from_fn(size, |x, _| {
        let offset = (x as f32 - center).abs();
        let rise = ((offset - valley_half_width_cells) / 2.0).clamp(0.0, 1.0);
        base_elevation + ridge_height * rise
    });
    SimulationState::from_terrain(
        size,
        cell_size,
        elevation.as_slice().to_vec(),
        vec![LandCover::Grassland; size * size],
        vec![SoilType::Loam; size * size],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::DefaultMaterials;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn generate(size: usize, seed: u64) -> SimulationState {
        let generator = TerrainGenerator::new(TerrainConfig {
            size,
            ..Default::default()
        });
        let mut rng = StdRng::seed_from_u64(seed);
        generator.generate(&mut rng, &DefaultMaterials).unwrap()
    }

    #[test]
    fn test_features_present() {
        let state = generate(100, 7);
        let count = |land: LandCover| state.land_cover.iter().filter(|&&l| l == land).count();
        assert!(count(LandCover::Water) > 100);
        assert!(count(LandCover::Forest) > 500);
        assert!(count(LandCover::Urban) > 0);
        assert!(count(LandCover::Settlement) > 0);
        assert!(state.soil_type.iter().any(|&s| s == SoilType::Rock));
        assert!(state.soil_type.iter().any(|&s| s == SoilType::Sand));
    }

    #[test]
    fn test_ridge_higher_than_valley() {
        let state = generate(100, 3);
        let ridge = *state.elevation.at(77, 25);
        let valley = *state.elevation.at(35, 50);
        assert!(ridge > valley + 400.0, "ridge={ridge} valley={valley}");
        // Valley floor clamp
        let floor = 200.0 - 80.0;
        assert!(state.elevation.iter().all(|&e| e >= floor - LAKE_DEPTH - 1e-3));
    }

    #[test]
    fn test_lake_is_flat_and_low() {
        let state = generate(100, 11);
        let lake_elevation = 200.0 - LAKE_DEPTH;
        for (idx, &land) in state.land_cover.iter().enumerate() {
            if land == LandCover::Water {
                assert_eq!(state.elevation[idx], lake_elevation);
            }
        }
        assert_eq!(*state.land_cover.at(20, 75), LandCover::Water);
    }

    #[test]
    fn test_same_seed_same_terrain() {
        let a = generate(40, 99);
        let b = generate(40, 99);
        assert_eq!(a.elevation, b.elevation);
        assert_eq!(a.land_cover, b.land_cover);
        assert_eq!(a.soil_type, b.soil_type);
        assert_eq!(a.humidity, b.humidity);

        let c = generate(40, 100);
        assert_ne!(a.elevation, c.elevation);
    }

    #[test]
    fn test_neutral_dynamic_fields() {
        let state = generate(30, 1);
        assert!(state.air_temperature.iter().all(|&t| t == 20.0));
        assert!(state.humidity.iter().all(|&h| (0.45..=0.55).contains(&h)));
        assert!(state.cloud_water.iter().all(|&w| w == 0.0));
        assert!(state.soil_moisture.iter().all(|&m| (0.0..=1.0).contains(&m)));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let generator = TerrainGenerator::new(TerrainConfig {
            cell_size: -1.0,
            ..Default::default()
        });
        let mut rng = StdRng::seed_from_u64(0);
        assert!(generator.generate(&mut rng, &DefaultMaterials).is_err());
    }

    #[test]
    fn test_helper_terrains() {
        let hill = single_hill(21, 10.0, 0.0, 100.0, 5.0).unwrap();
        assert!(hill.elevation.at(10, 10) > hill.elevation.at(0, 0));

        let valley = valley_between_ridges(21, 10.0, 0.0, 200.0, 3.0).unwrap();
        assert_eq!(*valley.elevation.at(10, 5), 0.0);
        assert_eq!(*valley.elevation.at(0, 5), 200.0);
    }
}
