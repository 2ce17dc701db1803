//! Land cover, soil categories and their thermal material properties.

use serde::{Deserialize, Serialize};

/// Surface land cover of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LandCover {
    #[default]
    Grassland,
    Forest,
    Water,
    Urban,
    Settlement,
}

impl LandCover {
    /// Land covers whose material properties override the soil beneath
    pub fn overrides_soil(self) -> bool {
        matches!(
            self,
            LandCover::Water | LandCover::Urban | LandCover::Settlement
        )
    }

    /// Built-up cells (sources of the urban distance field)
    pub fn is_built_up(self) -> bool {
        matches!(self, LandCover::Urban | LandCover::Settlement)
    }
}

/// Soil category of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SoilType {
    #[default]
    Loam,
    Sand,
    Clay,
    Rock,
}

/// Thermal and hydrological material properties of a surface.
///
/// Never stored per cell; always looked up from the land cover / soil pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalProperties {
    /// Relative volumetric heat capacity (> 0)
    pub heat_capacity: f32,
    /// Relative soil-air thermal conductivity (>= 0)
    pub conductivity: f32,
    /// Water retention coefficient [0, 1]
    pub water_retention: f32,
    /// Shortwave albedo [0, 1]
    pub albedo: f32,
    /// Evaporation coefficient (>= 0)
    pub evaporation: f32,
    /// Human readable name
    pub display_name: &'static str,
    /// Display colour (RGB)
    pub color: [u8; 3],
}

impl ThermalProperties {
    pub const LOAM: ThermalProperties = ThermalProperties {
        heat_capacity: 1.0,
        conductivity: 0.5,
        water_retention: 0.6,
        albedo: 0.2,
        evaporation: 0.6,
        display_name: "Loam",
        color: [139, 115, 85],
    };

    pub const SAND: ThermalProperties = ThermalProperties {
        heat_capacity: 0.8,
        conductivity: 0.3,
        water_retention: 0.2,
        albedo: 0.35,
        evaporation: 0.3,
        display_name: "Sand",
        color: [237, 201, 175],
    };

    pub const CLAY: ThermalProperties = ThermalProperties {
        heat_capacity: 1.2,
        conductivity: 0.6,
        water_retention: 0.8,
        albedo: 0.25,
        evaporation: 0.5,
        display_name: "Clay",
        color: [160, 82, 45],
    };

    pub const ROCK: ThermalProperties = ThermalProperties {
        heat_capacity: 0.9,
        conductivity: 0.8,
        water_retention: 0.1,
        albedo: 0.3,
        evaporation: 0.1,
        display_name: "Rock",
        color: [128, 128, 128],
    };

    /// Open water - very high heat capacity, dark surface
    pub const WATER: ThermalProperties = ThermalProperties {
        heat_capacity: 4.0,
        conductivity: 0.6,
        water_retention: 1.0,
        albedo: 0.06,
        evaporation: 1.0,
        display_name: "Water",
        color: [64, 110, 200],
    };

    /// Dense built environment - sealed, conductive surfaces
    pub const URBAN: ThermalProperties = ThermalProperties {
        heat_capacity: 1.5,
        conductivity: 1.2,
        water_retention: 0.1,
        albedo: 0.15,
        evaporation: 0.05,
        display_name: "Urban",
        color: [90, 90, 100],
    };

    pub const SETTLEMENT: ThermalProperties = ThermalProperties {
        heat_capacity: 1.3,
        conductivity: 0.9,
        water_retention: 0.3,
        albedo: 0.18,
        evaporation: 0.2,
        display_name: "Settlement",
        color: [170, 150, 140],
    };
}

impl Default for ThermalProperties {
    fn default() -> Self {
        Self::LOAM
    }
}

/// Lookup of material properties per category.
///
/// Implementations may leave categories unmapped by returning `None`;
/// [`MaterialTable::properties`] then falls back to Loam.
pub trait MaterialTable: Send + Sync {
    /// Properties of an overriding land cover (Water, Urban, Settlement)
    fn land_cover(&self, land: LandCover) -> Option<ThermalProperties>;

    /// Properties of a soil type
    fn soil(&self, soil: SoilType) -> Option<ThermalProperties>;

    /// Effective properties of a cell: overriding land covers first, else soil.
    fn properties(&self, land: LandCover, soil: SoilType) -> ThermalProperties {
        let found = if land.overrides_soil() {
            self.land_cover(land)
        } else {
            self.soil(soil)
        };
        found.unwrap_or(ThermalProperties::LOAM)
    }
}

/// Built-in material table
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMaterials;

impl MaterialTable for DefaultMaterials {
    fn land_cover(&self, land: LandCover) -> Option<ThermalProperties> {
        match land {
            LandCover::Water => Some(ThermalProperties::WATER),
            LandCover::Urban => Some(ThermalProperties::URBAN),
            LandCover::Settlement => Some(ThermalProperties::SETTLEMENT),
            LandCover::Grassland | LandCover::Forest => None,
        }
    }

    fn soil(&self, soil: SoilType) -> Option<ThermalProperties> {
        Some(match soil {
            SoilType::Loam => ThermalProperties::LOAM,
            SoilType::Sand => ThermalProperties::SAND,
            SoilType::Clay => ThermalProperties::CLAY,
            SoilType::Rock => ThermalProperties::ROCK,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SparseTable;

    impl MaterialTable for SparseTable {
        fn land_cover(&self, _land: LandCover) -> Option<ThermalProperties> {
            None
        }

        fn soil(&self, soil: SoilType) -> Option<ThermalProperties> {
            (soil == SoilType::Rock).then_some(ThermalProperties::ROCK)
        }
    }

    #[test]
    fn test_overriding_land_covers_ignore_soil() {
        let table = DefaultMaterials;
        let water = table.properties(LandCover::Water, SoilType::Rock);
        assert_eq!(water.display_name, "Water");

        let urban = table.properties(LandCover::Urban, SoilType::Sand);
        assert_eq!(urban.display_name, "Urban");
    }

    #[test]
    fn test_vegetated_land_uses_soil() {
        let table = DefaultMaterials;
        assert_eq!(
            table.properties(LandCover::Forest, SoilType::Clay),
            ThermalProperties::CLAY
        );
        assert_eq!(
            table.properties(LandCover::Grassland, SoilType::Sand),
            ThermalProperties::SAND
        );
    }

    #[test]
    fn test_unmapped_categories_fall_back_to_loam() {
        let table = SparseTable;
        assert_eq!(
            table.properties(LandCover::Water, SoilType::Rock),
            ThermalProperties::LOAM
        );
        assert_eq!(
            table.properties(LandCover::Grassland, SoilType::Clay),
            ThermalProperties::LOAM
        );
        assert_eq!(
            table.properties(LandCover::Grassland, SoilType::Rock),
            ThermalProperties::ROCK
        );
    }

    #[test]
    fn test_property_ranges() {
        let table = DefaultMaterials;
        for land in [
            LandCover::Grassland,
            LandCover::Forest,
            LandCover::Water,
            LandCover::Urban,
            LandCover::Settlement,
        ] {
            for soil in [SoilType::Loam, SoilType::Sand, SoilType::Clay, SoilType::Rock] {
                let p = table.properties(land, soil);
                assert!(p.heat_capacity > 0.0);
                assert!(p.conductivity >= 0.0);
                assert!((0.0..=1.0).contains(&p.water_retention));
                assert!((0.0..=1.0).contains(&p.albedo));
                assert!(p.evaporation >= 0.0);
            }
        }
    }
}
