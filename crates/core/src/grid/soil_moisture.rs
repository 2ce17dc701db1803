//! Initial soil moisture from terrain
//!
//! One-shot derivation run after terrain, regions and hillshade exist. The
//! result is a pure function of the static fields: micro-variation comes from
//! a coordinate hash, never from the shared random source.

use crate::core_types::noise::micro_variation;
use crate::core_types::{LandCover, MaterialTable};
use crate::grid::{Grid, SimulationState, NEIGHBORS_8};

/// Weight of the material water-retention coefficient
const RETENTION_WEIGHT: f32 = 0.6;
/// Moisture offset added to every land cell
const BASE_OFFSET: f32 = 0.15;
/// Mean neighbour rise/fall (m per m) treated as "fully steep"
const SLOPE_NORMALIZER: f32 = 0.5;
/// Fraction of moisture lost on fully steep ground
const SLOPE_PENALTY: f32 = 0.3;
/// Moisture bonus for fully shaded cells
const SHADE_BONUS: f32 = 0.1;
/// Radius (cells) of the lake/river proximity bonus
const WATER_RADIUS: f32 = 15.0;
const WATER_BONUS: f32 = 0.25;
/// Radius (cells) of the forest proximity bonus
const FOREST_RADIUS: f32 = 5.0;
const FOREST_BONUS: f32 = 0.08;
/// Elevation above which drainage starts to dry the soil (m)
const HIGHLAND_THRESHOLD: f32 = 500.0;
/// Elevation above which alpine drainage adds a steeper penalty (m)
const ALPINE_THRESHOLD: f32 = 800.0;
/// Hash seed for micro-variation
const MICRO_SEED: u32 = 4099;
const MICRO_AMPLITUDE: f32 = 0.02;

/// Land-cover specific moisture adjustment
fn land_cover_adjustment(land: LandCover) -> f32 {
    match land {
        LandCover::Forest => 0.1,
        LandCover::Grassland => 0.05,
        LandCover::Urban => -0.2,
        LandCover::Settlement => -0.1,
        LandCover::Water => 0.0,
    }
}

/// Normalised local slope in [0, 1] from the mean 3×3 elevation difference.
fn slope_factor(state: &SimulationState, x: usize, y: usize) -> f32 {
    let center = *state.elevation.at(x, y);
    let mut total = 0.0;
    let mut count = 0.0;
    for (dx, dy) in NEIGHBORS_8 {
        if let Some(&e) = state.elevation.get(x as i32 + dx, y as i32 + dy) {
            total += (e - center).abs();
            count += 1.0;
        }
    }
    if count == 0.0 {
        return 0.0;
    }
    let mean_gradient = total / count / state.cell_size;
    (mean_gradient / SLOPE_NORMALIZER).min(1.0)
}

/// Moisture of a single cell
pub fn initial_moisture(
    state: &SimulationState,
    materials: &dyn MaterialTable,
    x: usize,
    y: usize,
) -> f32 {
    let idx = state.index(x, y);
    let land = state.land_cover[idx];
    if land == LandCover::Water {
        return 1.0;
    }

    let props = materials.properties(land, state.soil_type[idx]);
    let retention = props.water_retention;

    let mut moisture = retention * RETENTION_WEIGHT + BASE_OFFSET;
    moisture *= 1.0 - SLOPE_PENALTY * slope_factor(state, x, y);
    moisture += (1.0 - state.hillshade[idx]) * SHADE_BONUS;

    let d_water = state.distance_to_water[idx];
    if d_water < WATER_RADIUS {
        moisture += (1.0 - d_water / WATER_RADIUS) * WATER_BONUS * retention;
    }
    let d_forest = state.distance_to_forest[idx];
    if d_forest < FOREST_RADIUS {
        moisture += (1.0 - d_forest / FOREST_RADIUS) * FOREST_BONUS;
    }

    moisture += land_cover_adjustment(land);

    let elevation = state.elevation[idx];
    if elevation > HIGHLAND_THRESHOLD {
        moisture -= (elevation - HIGHLAND_THRESHOLD) / 1000.0 * 0.15;
    }
    if elevation > ALPINE_THRESHOLD {
        moisture -= (elevation - ALPINE_THRESHOLD) / 500.0 * 0.2;
    }

    moisture += micro_variation(x, y, MICRO_SEED, MICRO_AMPLITUDE);

    if moisture.is_finite() {
        moisture.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

/// Derive the initial soil moisture field.
pub fn initialize_soil_moisture(state: &mut SimulationState, materials: &dyn MaterialTable) {
    let moisture = Grid::from_fn(state.size, |x, y| initial_moisture(state, materials, x, y));
    state.soil_moisture = moisture;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{DefaultMaterials, SoilType};

    fn build(size: usize, land: Vec<LandCover>, soil: Vec<SoilType>, elev: Vec<f32>) -> SimulationState {
        let mut state = SimulationState::from_terrain(size, 30.0, elev, land, soil).unwrap();
        initialize_soil_moisture(&mut state, &DefaultMaterials);
        state
    }

    #[test]
    fn test_water_is_saturated_and_range_holds() {
        let size = 9;
        let mut land = vec![LandCover::Grassland; size * size];
        land[40] = LandCover::Water;
        land[0] = LandCover::Urban;
        let state = build(size, land, vec![SoilType::Sand; size * size], vec![0.0; size * size]);
        assert_eq!(*state.soil_moisture.at(4, 4), 1.0);
        assert!(state.soil_moisture.iter().all(|m| (0.0..=1.0).contains(m)));
    }

    #[test]
    fn test_clay_holds_more_than_sand() {
        let size = 5;
        let flat = vec![0.0; size * size];
        let clay = build(
            size,
            vec![LandCover::Grassland; size * size],
            vec![SoilType::Clay; size * size],
            flat.clone(),
        );
        let sand = build(
            size,
            vec![LandCover::Grassland; size * size],
            vec![SoilType::Sand; size * size],
            flat,
        );
        assert!(clay.soil_moisture.at(2, 2) > sand.soil_moisture.at(2, 2));
    }

    #[test]
    fn test_proximity_to_water_adds_moisture() {
        let size = 21;
        let mut land = vec![LandCover::Grassland; size * size];
        land[10 * size] = LandCover::Water;
        let state = build(size, land, vec![SoilType::Loam; size * size], vec![0.0; size * size]);
        let near = *state.soil_moisture.at(1, 10);
        let far = *state.soil_moisture.at(19, 10);
        assert!(near > far + 0.05, "near={near} far={far}");
    }

    #[test]
    fn test_alpine_cells_drain() {
        let size = 5;
        let low = build(
            size,
            vec![LandCover::Grassland; size * size],
            vec![SoilType::Loam; size * size],
            vec![100.0; size * size],
        );
        let high = build(
            size,
            vec![LandCover::Grassland; size * size],
            vec![SoilType::Loam; size * size],
            vec![1100.0; size * size],
        );
        assert!(high.soil_moisture.at(2, 2) + 0.15 < *low.soil_moisture.at(2, 2));
    }

    #[test]
    fn test_deterministic() {
        let size = 6;
        let a = build(
            size,
            vec![LandCover::Forest; size * size],
            vec![SoilType::Loam; size * size],
            (0..size * size).map(|i| i as f32).collect(),
        );
        let b = build(
            size,
            vec![LandCover::Forest; size * size],
            vec![SoilType::Loam; size * size],
            (0..size * size).map(|i| i as f32).collect(),
        );
        assert_eq!(a.soil_moisture, b.soil_moisture);
    }
}
