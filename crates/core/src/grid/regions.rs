//! Region labelling and proximity fields
//!
//! - [`label_regions`]: 8-connected flood fill over equal land cover.
//! - [`compute_distance_fields`]: multi-source shortest paths to water, forest
//!   and built-up cells, plus forest interior depth.
//!
//! Diagonal steps cost √2, so the distance transform runs on a min-priority
//! queue with relaxation (Dijkstra) rather than a FIFO breadth-first search:
//! a cell may be improved after it was first reached.

use crate::core_types::LandCover;
use crate::grid::{Grid, SimulationState, NEIGHBORS_8};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::f32::consts::SQRT_2;
use tracing::debug;

/// Search radius (cells) for forest depth; also the depth sentinel
pub const FOREST_DEPTH_RADIUS: i32 = 20;

/// Label every cell with the id of its 8-connected same-land-cover component.
///
/// Ids start at 1 and increase in row-major discovery order;
/// `state.region_sizes[id]` holds the component's cell count.
pub fn label_regions(state: &mut SimulationState) {
    let size = state.size;
    let mut labels = Grid::filled(size, 0u32);
    let mut sizes = vec![0usize];
    let mut frontier = VecDeque::new();

    for y in 0..size {
        for x in 0..size {
            if *labels.at(x, y) != 0 {
                continue;
            }

            let id = sizes.len() as u32;
            let category = *state.land_cover.at(x, y);
            let mut count = 0usize;
            *labels.at_mut(x, y) = id;
            frontier.push_back((x, y));

            while let Some((cx, cy)) = frontier.pop_front() {
                count += 1;
                for (dx, dy) in NEIGHBORS_8 {
                    let nx = cx as i32 + dx;
                    let ny = cy as i32 + dy;
                    if !labels.in_bounds(nx, ny) {
                        continue;
                    }
                    let (nx, ny) = (nx as usize, ny as usize);
                    if *labels.at(nx, ny) == 0 && *state.land_cover.at(nx, ny) == category {
                        *labels.at_mut(nx, ny) = id;
                        frontier.push_back((nx, ny));
                    }
                }
            }

            sizes.push(count);
        }
    }

    debug!("Labelled {} regions on {}x{} grid", sizes.len() - 1, size, size);
    state.region_id = labels;
    state.region_sizes = sizes;
}

#[derive(Clone, Copy, Debug)]
struct FrontierItem {
    distance: f32,
    idx: usize,
}

impl PartialEq for FrontierItem {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance && self.idx == other.idx
    }
}

impl Eq for FrontierItem {}

// Min-heap by distance via reversed ordering; ties broken by index so pops are deterministic.
impl PartialOrd for FrontierItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierItem {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

/// Result of a multi-source distance transform
pub struct DistanceField {
    /// Path length to the nearest source (cells); `INFINITY` if unreached
    pub distance: Grid<f32>,
    /// Region id of the source that produced `distance` (0 if unreached)
    pub source_region: Grid<u32>,
}

/// Multi-source shortest-path distance over the 8-neighbour lattice.
///
/// Cardinal steps cost 1, diagonal steps √2. Source cells get distance 0 and
/// carry their own region id outward.
pub fn multi_source_distance(
    state: &SimulationState,
    is_source: impl Fn(LandCover) -> bool,
) -> DistanceField {
    let size = state.size;
    let mut distance = Grid::filled(size, f32::INFINITY);
    let mut source_region = Grid::filled(size, 0u32);
    let mut heap = BinaryHeap::new();

    for idx in 0..size * size {
        if is_source(state.land_cover[idx]) {
            distance[idx] = 0.0;
            source_region[idx] = state.region_id[idx];
            heap.push(FrontierItem { distance: 0.0, idx });
        }
    }

    while let Some(FrontierItem { distance: d, idx }) = heap.pop() {
        // Stale entry: a shorter path was already settled
        if d > distance[idx] {
            continue;
        }
        let x = (idx % size) as i32;
        let y = (idx / size) as i32;

        for (dx, dy) in NEIGHBORS_8 {
            let nx = x + dx;
            let ny = y + dy;
            if !distance.in_bounds(nx, ny) {
                continue;
            }
            let step = if dx != 0 && dy != 0 { SQRT_2 } else { 1.0 };
            let n_idx = ny as usize * size + nx as usize;
            let candidate = d + step;
            if candidate < distance[n_idx] {
                distance[n_idx] = candidate;
                source_region[n_idx] = source_region[idx];
                heap.push(FrontierItem {
                    distance: candidate,
                    idx: n_idx,
                });
            }
        }
    }

    DistanceField {
        distance,
        source_region,
    }
}

/// Distance inward from each forest cell to the nearest non-forest cell.
///
/// Square rings of radius 1..=20 are searched outward; the first ring that
/// contains a non-forest cell yields the minimum Euclidean distance within
/// that ring. Forest cells with no such cell in range get the sentinel 20;
/// non-forest cells get 0.
pub fn compute_forest_depth(state: &SimulationState) -> Grid<f32> {
    let size = state.size;
    Grid::from_fn(size, |x, y| {
        if *state.land_cover.at(x, y) != LandCover::Forest {
            return 0.0;
        }

        for r in 1..=FOREST_DEPTH_RADIUS {
            let mut best = f32::INFINITY;
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx.abs() != r && dy.abs() != r {
                        continue;
                    }
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    if let Some(&land) = state.land_cover.get(nx, ny) {
                        if land != LandCover::Forest {
                            let d = ((dx * dx + dy * dy) as f32).sqrt();
                            best = best.min(d);
                        }
                    }
                }
            }
            if best.is_finite() {
                return best;
            }
        }

        FOREST_DEPTH_RADIUS as f32
    })
}

/// Compute water/forest/urban distance fields, nearest-region ids and forest depth.
///
/// Requires [`label_regions`] to have run. Categories without any source cell
/// leave their distance field at `INFINITY` everywhere.
pub fn compute_distance_fields(state: &mut SimulationState) {
    let water = multi_source_distance(state, |land| land == LandCover::Water);
    let forest = multi_source_distance(state, |land| land == LandCover::Forest);
    let urban = multi_source_distance(state, LandCover::is_built_up);

    debug!(
        "Distance fields: water reached={}, forest reached={}, urban reached={}",
        water.distance.iter().any(|d| d.is_finite()),
        forest.distance.iter().any(|d| d.is_finite()),
        urban.distance.iter().any(|d| d.is_finite()),
    );

    state.distance_to_water = water.distance;
    state.nearest_water_region = water.source_region;
    state.distance_to_forest = forest.distance;
    state.nearest_forest_region = forest.source_region;
    state.distance_to_urban = urban.distance;
    state.forest_depth = compute_forest_depth(state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::SoilType;
    use approx::assert_relative_eq;

    fn state_from(land: &[LandCover], size: usize) -> SimulationState {
        SimulationState::from_terrain(
            size,
            30.0,
            vec![0.0; size * size],
            land.to_vec(),
            vec![SoilType::Loam; size * size],
        )
        .unwrap()
    }

    #[test]
    fn test_diagonal_cells_share_region() {
        use LandCover::{Grassland as G, Water as W};
        #[rustfmt::skip]
        let land = [
            W, G, G,
            G, W, G,
            G, G, W,
        ];
        let state = state_from(&land, 3);
        // The water diagonal is one region; the two grass triangles touch
        // corner to corner at (1,0)-(0,1) and so form a single region too.
        assert_eq!(state.region_id.at(0, 0), state.region_id.at(2, 2));
        assert_eq!(state.region_id.at(1, 0), state.region_id.at(0, 1));
        assert_eq!(state.region_count(), 2);
        assert_eq!(state.region_size(*state.region_id.at(0, 0)), 3);
        assert_eq!(state.region_size(*state.region_id.at(1, 0)), 6);
    }

    #[test]
    fn test_disjoint_components_get_distinct_ids() {
        use LandCover::{Forest as F, Grassland as G};
        #[rustfmt::skip]
        let land = [
            F, G, G, F,
            G, G, G, G,
            G, G, G, G,
            F, G, G, F,
        ];
        let state = state_from(&land, 4);
        let corners = [
            *state.region_id.at(0, 0),
            *state.region_id.at(3, 0),
            *state.region_id.at(0, 3),
            *state.region_id.at(3, 3),
        ];
        for i in 0..4 {
            for j in (i + 1)..4 {
                assert_ne!(corners[i], corners[j]);
            }
        }
        assert_eq!(state.region_count(), 5);
        let total: usize = state.region_sizes.iter().sum();
        assert_eq!(total, 16);
    }

    #[test]
    fn test_ids_start_at_one_in_discovery_order() {
        let state = state_from(&[LandCover::Grassland; 9], 3);
        assert_eq!(*state.region_id.at(0, 0), 1);
        assert_eq!(state.region_sizes, vec![0, 9]);
    }

    #[test]
    fn test_distance_uses_diagonal_cost() {
        let mut land = vec![LandCover::Grassland; 25];
        land[0] = LandCover::Water;
        let state = state_from(&land, 5);
        assert_eq!(*state.distance_to_water.at(0, 0), 0.0);
        assert_relative_eq!(*state.distance_to_water.at(1, 1), SQRT_2, epsilon = 1e-6);
        assert_relative_eq!(*state.distance_to_water.at(4, 0), 4.0, epsilon = 1e-6);
        assert_relative_eq!(
            *state.distance_to_water.at(4, 2),
            2.0 + 2.0 * SQRT_2,
            epsilon = 1e-5
        );
        assert_eq!(
            *state.nearest_water_region.at(4, 4),
            *state.region_id.at(0, 0)
        );
    }

    #[test]
    fn test_missing_category_stays_unreached() {
        let state = state_from(&[LandCover::Grassland; 16], 4);
        assert!(state.distance_to_water.iter().all(|d| d.is_infinite()));
        assert!(state.distance_to_urban.iter().all(|d| d.is_infinite()));
        assert!(state.nearest_forest_region.iter().all(|&r| r == 0));
    }

    #[test]
    fn test_urban_sources_include_settlement() {
        let mut land = vec![LandCover::Grassland; 9];
        land[8] = LandCover::Settlement;
        let state = state_from(&land, 3);
        assert_eq!(*state.distance_to_urban.at(2, 2), 0.0);
        assert_relative_eq!(*state.distance_to_urban.at(0, 0), 2.0 * SQRT_2, epsilon = 1e-6);
    }

    #[test]
    fn test_forest_depth() {
        let size = 7;
        let mut land = vec![LandCover::Forest; size * size];
        land[0] = LandCover::Grassland;
        let state = state_from(&land, size);
        assert_eq!(*state.forest_depth.at(0, 0), 0.0);
        assert_eq!(*state.forest_depth.at(1, 0), 1.0);
        assert_relative_eq!(*state.forest_depth.at(1, 1), SQRT_2, epsilon = 1e-6);
        assert_eq!(*state.forest_depth.at(6, 0), 6.0);
    }

    #[test]
    fn test_forest_depth_sentinel_without_edge() {
        let state = state_from(&[LandCover::Forest; 9], 3);
        assert!(state
            .forest_depth
            .iter()
            .all(|&d| d == FOREST_DEPTH_RADIUS as f32));
    }
}
