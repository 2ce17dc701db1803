//! Simulation state: every static and dynamic field of one grid
//!
//! The state is a single owned arena of same-sized [`Grid`]s. Engines take it
//! by `&mut` and follow a snapshot discipline: each pass reads the previous
//! values and commits freshly built grids only once the whole pass is done.

use crate::core_types::{LandCover, MaterialTable, SoilType, ThermalProperties, WindVector};
use crate::error::SimError;
use crate::grid::Grid;
use serde::{Deserialize, Serialize};

/// Absolute physical temperature range (°C) for air and soil
pub const TEMPERATURE_RANGE: (f32, f32) = (-70.0, 65.0);

/// Neutral air/soil temperature used at initialisation (°C)
pub const NEUTRAL_TEMPERATURE: f32 = 20.0;

/// Maximum cloud water content
pub const MAX_CLOUD_WATER: f32 = 1.5;

/// Cloud classification, recomputed every tick from the winning formation mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CloudType {
    #[default]
    None,
    Cumulus,
    Cumulonimbus,
    Nimbostratus,
    Stratus,
    Orographic,
}

impl CloudType {
    /// Cloud depth above the base (m)
    pub fn vertical_extent(self) -> f32 {
        match self {
            CloudType::None => 0.0,
            CloudType::Cumulus => 1500.0,
            CloudType::Cumulonimbus => 8000.0,
            CloudType::Nimbostratus => 3000.0,
            CloudType::Stratus => 500.0,
            CloudType::Orographic => 1200.0,
        }
    }
}

/// Precipitation phase, recomputed every tick from rate and temperature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PrecipitationType {
    #[default]
    None,
    Rain,
    Sleet,
    Snow,
}

/// Per-cell precipitation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Precipitation {
    /// Rate (relative units, capped at 2)
    pub rate: f32,
    /// Phase
    pub kind: PrecipitationType,
}

impl Precipitation {
    pub const NONE: Self = Self {
        rate: 0.0,
        kind: PrecipitationType::None,
    };
}

/// All fields of the simulation grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationState {
    /// Side length in cells
    pub size: usize,
    /// Horizontal cell size (m)
    pub cell_size: f32,

    // ---- static terrain ----
    /// Elevation (m)
    pub elevation: Grid<f32>,
    pub land_cover: Grid<LandCover>,
    pub soil_type: Grid<SoilType>,
    /// 8-connected same-land-cover component id, starting at 1
    pub region_id: Grid<u32>,
    /// Cell count per region; index 0 is unused
    pub region_sizes: Vec<usize>,
    pub distance_to_water: Grid<f32>,
    pub distance_to_forest: Grid<f32>,
    pub distance_to_urban: Grid<f32>,
    /// Region id of the closest water cell (0 = none)
    pub nearest_water_region: Grid<u32>,
    /// Region id of the closest forest cell (0 = none)
    pub nearest_forest_region: Grid<u32>,
    /// Distance to the forest edge, forest cells only (cells)
    pub forest_depth: Grid<f32>,
    /// Relief shading [0, 1]
    pub hillshade: Grid<f32>,

    // ---- dynamic atmosphere / surface ----
    /// Air temperature (°C)
    pub air_temperature: Grid<f32>,
    /// Soil temperature (°C)
    pub soil_temperature: Grid<f32>,
    /// Soil moisture [0, 1]
    pub soil_moisture: Grid<f32>,
    /// Snow depth (m)
    pub snow_depth: Grid<f32>,
    /// Relative humidity [0, 1]
    pub humidity: Grid<f32>,
    /// Dew point (°C)
    pub dew_point: Grid<f32>,
    pub wind: Grid<WindVector>,
    /// Katabatic flow magnitude (negative = cooling)
    pub downslope_wind: Grid<f32>,
    /// Lee-side warming (°C)
    pub foehn_effect: Grid<f32>,
    /// Fog density [0, 1]
    pub fog_density: Grid<f32>,
    /// Cloud coverage [0, 1]
    pub cloud_coverage: Grid<f32>,
    /// Cloud base altitude (m)
    pub cloud_base: Grid<f32>,
    /// Cloud top altitude (m)
    pub cloud_top: Grid<f32>,
    pub cloud_type: Grid<CloudType>,
    pub cloud_optical_depth: Grid<f32>,
    /// Cloud liquid water [0, 1.5]
    pub cloud_water: Grid<f32>,
    pub ice_content: Grid<f32>,
    /// Graupel mass
    pub graupel: Grid<f32>,
    /// Mean droplet radius (µm)
    pub droplet_size: Grid<f32>,
    /// CAPE-like convective energy (J/kg)
    pub convective_energy: Grid<f32>,
    /// Thermal excess driving convection (°C)
    pub thermal_strength: Grid<f32>,
    /// Latent heating handed to the thermodynamics pass (°C/h)
    pub latent_heat_effect: Grid<f32>,
    pub precipitation: Grid<Precipitation>,
    /// Global inversion top (m)
    pub inversion_height: f32,
    /// Global inversion strength (°C)
    pub inversion_strength: f32,
    /// Inversion + downslope heating rate, rebuilt every tick (°C/h)
    pub inversion_rate: Grid<f32>,
}

impl SimulationState {
    /// Empty state on a flat, grass-covered loam grid with neutral atmosphere.
    pub fn new(size: usize, cell_size: f32) -> Result<Self, SimError> {
        if size < 3 {
            return Err(SimError::InvalidGridSize { size });
        }
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(SimError::InvalidParameter {
                name: "cell_size",
                value: cell_size,
            });
        }

        let f = |v: f32| Grid::filled(size, v);
        Ok(Self {
            size,
            cell_size,
            elevation: f(0.0),
            land_cover: Grid::filled(size, LandCover::Grassland),
            soil_type: Grid::filled(size, SoilType::Loam),
            region_id: Grid::filled(size, 0),
            region_sizes: vec![0],
            distance_to_water: f(f32::INFINITY),
            distance_to_forest: f(f32::INFINITY),
            distance_to_urban: f(f32::INFINITY),
            nearest_water_region: Grid::filled(size, 0),
            nearest_forest_region: Grid::filled(size, 0),
            forest_depth: f(0.0),
            hillshade: f(crate::grid::hillshade::flat_hillshade()),
            air_temperature: f(NEUTRAL_TEMPERATURE),
            soil_temperature: f(NEUTRAL_TEMPERATURE),
            soil_moisture: f(0.5),
            snow_depth: f(0.0),
            humidity: f(0.5),
            dew_point: f(crate::atmosphere::humidity::dew_point(
                NEUTRAL_TEMPERATURE,
                0.5,
            )),
            wind: Grid::filled(size, WindVector::CALM),
            downslope_wind: f(0.0),
            foehn_effect: f(0.0),
            fog_density: f(0.0),
            cloud_coverage: f(0.0),
            cloud_base: f(0.0),
            cloud_top: f(0.0),
            cloud_type: Grid::filled(size, CloudType::None),
            cloud_optical_depth: f(0.0),
            cloud_water: f(0.0),
            ice_content: f(0.0),
            graupel: f(0.0),
            droplet_size: f(crate::atmosphere::microphysics::INITIAL_DROPLET_SIZE),
            convective_energy: f(0.0),
            thermal_strength: f(0.0),
            latent_heat_effect: f(0.0),
            precipitation: Grid::filled(size, Precipitation::NONE),
            inversion_height: 0.0,
            inversion_strength: 0.0,
            inversion_rate: f(0.0),
        })
    }

    /// State over caller-supplied terrain.
    ///
    /// Rejects fields whose cell count differs from `size²`. Region labels,
    /// distance fields and hillshade are derived here; dynamic fields start
    /// neutral.
    pub fn from_terrain(
        size: usize,
        cell_size: f32,
        elevation: Vec<f32>,
        land_cover: Vec<LandCover>,
        soil_type: Vec<SoilType>,
    ) -> Result<Self, SimError> {
        let mut state = Self::new(size, cell_size)?;
        let expected = size * size;
        let mismatch = |field: &'static str, actual: usize| SimError::DimensionMismatch {
            field,
            expected,
            actual,
        };

        let elevation_len = elevation.len();
        state.elevation =
            Grid::from_vec(size, elevation).ok_or_else(|| mismatch("elevation", elevation_len))?;
        let land_len = land_cover.len();
        state.land_cover =
            Grid::from_vec(size, land_cover).ok_or_else(|| mismatch("land_cover", land_len))?;
        let soil_len = soil_type.len();
        state.soil_type =
            Grid::from_vec(size, soil_type).ok_or_else(|| mismatch("soil_type", soil_len))?;

        crate::grid::regions::label_regions(&mut state);
        crate::grid::regions::compute_distance_fields(&mut state);
        crate::grid::hillshade::compute_hillshade(&mut state);
        Ok(state)
    }

    /// Row-major index of `(x, y)`
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.size + x
    }

    /// Bounds predicate used before every neighbour read
    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.size && (y as usize) < self.size
    }

    /// Material properties of a cell; Loam outside the grid.
    pub fn thermal_properties(
        &self,
        materials: &dyn MaterialTable,
        x: i32,
        y: i32,
    ) -> ThermalProperties {
        if !self.in_bounds(x, y) {
            return ThermalProperties::LOAM;
        }
        let idx = self.index(x as usize, y as usize);
        materials.properties(self.land_cover[idx], self.soil_type[idx])
    }

    /// Number of labelled regions
    pub fn region_count(&self) -> usize {
        self.region_sizes.len().saturating_sub(1)
    }

    /// Cell count of a region (0 for unknown ids)
    pub fn region_size(&self, region_id: u32) -> usize {
        if region_id == 0 {
            return 0;
        }
        self.region_sizes
            .get(region_id as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Domain-mean cloud coverage
    pub fn mean_cloud_coverage(&self) -> f32 {
        self.cloud_coverage.iter().sum::<f32>() / self.cloud_coverage.len() as f32
    }

    /// Reset every dynamic field to the neutral baseline.
    ///
    /// Humidity receives a small jitter from `rng`, consumed in row-major order.
    pub fn reset_dynamic<R: rand::Rng + ?Sized>(&mut self, rng: &mut R) {
        let size = self.size;
        let f = |v: f32| Grid::filled(size, v);

        self.air_temperature = f(NEUTRAL_TEMPERATURE);
        self.soil_temperature = f(NEUTRAL_TEMPERATURE);
        self.snow_depth = f(0.0);
        self.humidity = Grid::from_fn(size, |_, _| 0.5 + rng.random_range(-0.05..0.05));
        self.dew_point = self
            .humidity
            .map(|&h| crate::atmosphere::humidity::dew_point(NEUTRAL_TEMPERATURE, h));
        self.wind = Grid::filled(size, WindVector::CALM);
        self.downslope_wind = f(0.0);
        self.foehn_effect = f(0.0);
        self.fog_density = f(0.0);
        self.cloud_coverage = f(0.0);
        self.cloud_base = f(0.0);
        self.cloud_top = f(0.0);
        self.cloud_type = Grid::filled(size, CloudType::None);
        self.cloud_optical_depth = f(0.0);
        self.cloud_water = f(0.0);
        self.ice_content = f(0.0);
        self.graupel = f(0.0);
        self.droplet_size = f(crate::atmosphere::microphysics::INITIAL_DROPLET_SIZE);
        self.convective_energy = f(0.0);
        self.thermal_strength = f(0.0);
        self.latent_heat_effect = f(0.0);
        self.precipitation = Grid::filled(size, Precipitation::NONE);
        self.inversion_height = 0.0;
        self.inversion_strength = 0.0;
        self.inversion_rate = f(0.0);
    }
}
