//! Whole-simulation properties: value ranges, determinism and the static
//! terrain passes on generated terrain.

use microclimate_core::atmosphere::clouds::is_convective_hour;
use microclimate_core::atmosphere::inversion::is_inversion_hour;
use microclimate_core::atmosphere::wind::is_katabatic_hour;
use microclimate_core::core_types::LandCover;
use microclimate_core::grid::NEIGHBORS_8;
use microclimate_core::{Forcing, Simulation, SimulationConfig, SimulationState};
use std::f32::consts::SQRT_2;

#[ctor::ctor]
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config(size: usize, seed: u64) -> SimulationConfig {
    let mut config = SimulationConfig {
        seed,
        ..Default::default()
    };
    config.terrain.size = size;
    config
}

fn assert_in_ranges(state: &SimulationState) {
    for i in 0..state.size * state.size {
        let air = state.air_temperature[i];
        let soil = state.soil_temperature[i];
        assert!((-70.0..=65.0).contains(&air), "air temperature {air} at {i}");
        assert!((-70.0..=65.0).contains(&soil), "soil temperature {soil} at {i}");
        assert!((0.0..=1.0).contains(&state.humidity[i]));
        assert!((0.0..=1.0).contains(&state.soil_moisture[i]));
        assert!((0.0..=1.0).contains(&state.cloud_coverage[i]));
        assert!((0.0..=1.0).contains(&state.fog_density[i]));
        assert!(state.snow_depth[i] >= 0.0);
        assert!(state.precipitation[i].rate >= 0.0);

        assert!(state.dew_point[i].is_finite());
        assert!(state.cloud_water[i].is_finite() && state.cloud_water[i] >= 0.0);

        let w = state.wind[i];
        assert!(w.x.is_finite() && w.y.is_finite());
        assert_eq!(w.speed, (w.x * w.x + w.y * w.y).sqrt());
    }
    assert!(state.inversion_height.is_finite());
    assert!(state.inversion_strength.is_finite());
}

#[test]
fn test_fields_stay_in_range_over_a_day() {
    let mut sim = Simulation::new(config(32, 7)).unwrap();
    for _ in 0..24 {
        sim.tick();
        assert_in_ranges(sim.state());
    }
    let metrics = sim.metrics();
    assert!(metrics.min_temperature <= metrics.avg_temperature);
    assert!(metrics.avg_temperature <= metrics.max_temperature);
}

#[test]
fn test_winter_run_stays_in_range() {
    let mut config = config(24, 11);
    config.start_month = 1;
    config.start_hour = 0.0;
    config.base_wind_speed = 0.5;
    config.time_factor = 2.0;
    let mut sim = Simulation::new(config).unwrap();
    sim.run(48.0);
    assert_eq!(sim.ticks(), 24);
    assert_in_ranges(sim.state());
}

#[test]
fn test_identical_seeds_are_bit_identical() {
    let mut a = Simulation::new(config(28, 99)).unwrap();
    let mut b = Simulation::new(config(28, 99)).unwrap();
    a.run(12.0);
    b.run(12.0);

    let (sa, sb) = (a.state(), b.state());
    assert_eq!(sa.elevation, sb.elevation);
    assert_eq!(sa.air_temperature, sb.air_temperature);
    assert_eq!(sa.humidity, sb.humidity);
    assert_eq!(sa.wind, sb.wind);
    assert_eq!(sa.cloud_water, sb.cloud_water);
    assert_eq!(sa.precipitation, sb.precipitation);
    assert_eq!(a.metrics(), b.metrics());
}

#[test]
fn test_different_seeds_differ() {
    let a = Simulation::new(config(28, 1)).unwrap();
    let b = Simulation::new(config(28, 2)).unwrap();
    assert_ne!(a.state().elevation, b.state().elevation);
}

#[test]
fn test_regions_partition_the_grid() {
    let sim = Simulation::new(config(40, 5)).unwrap();
    let state = sim.state();

    let total: usize = (1..=state.region_count() as u32)
        .map(|id| state.region_size(id))
        .sum();
    assert_eq!(total, state.size * state.size);

    for y in 0..state.size {
        for x in 0..state.size {
            let id = *state.region_id.at(x, y);
            let land = *state.land_cover.at(x, y);
            assert_ne!(id, 0);
            for (dx, dy) in NEIGHBORS_8 {
                let (nx, ny) = (x as i32 + dx, y as i32 + dy);
                if let Some(&n_land) = state.land_cover.get(nx, ny) {
                    let n_id = *state.region_id.get(nx, ny).unwrap();
                    // Adjacent cells share a region exactly when they share a land cover
                    assert_eq!(n_land == land, n_id == id, "cells ({x},{y}) and ({nx},{ny})");
                }
            }
        }
    }
}

#[test]
fn test_distance_to_water_is_shortest_path() {
    let sim = Simulation::new(config(40, 5)).unwrap();
    let state = sim.state();
    assert!(state.land_cover.iter().any(|&l| l == LandCover::Water));

    for y in 0..state.size {
        for x in 0..state.size {
            let d = *state.distance_to_water.at(x, y);
            if *state.land_cover.at(x, y) == LandCover::Water {
                assert_eq!(d, 0.0);
                continue;
            }
            assert!(d.is_finite() && d > 0.0);
            // Some neighbour lies one step closer along a shortest path
            let has_predecessor = NEIGHBORS_8.iter().any(|&(dx, dy)| {
                let step = if dx != 0 && dy != 0 { SQRT_2 } else { 1.0 };
                state
                    .distance_to_water
                    .get(x as i32 + dx, y as i32 + dy)
                    .is_some_and(|&n| (n + step - d).abs() < 1e-3)
            });
            assert!(has_predecessor, "no predecessor at ({x},{y})");
        }
    }
}

#[test]
fn test_no_water_leaves_sentinel() {
    let state = microclimate_core::grid::terrain::flat_terrain(9, 30.0, 100.0).unwrap();
    assert!(state.distance_to_water.iter().all(|d| d.is_infinite()));
    assert!(state.nearest_water_region.iter().all(|&r| r == 0));
}

#[test]
fn test_custom_state_reset_restores_baseline() {
    let state = microclimate_core::grid::terrain::single_hill(12, 30.0, 100.0, 200.0, 3.0).unwrap();
    let mut sim = Simulation::from_state(SimulationConfig::default(), state).unwrap();
    sim.run(6.0);
    let elevation = sim.state().elevation.clone();
    sim.reset().unwrap();
    assert_eq!(sim.state().elevation, elevation);
    assert!(sim.state().air_temperature.iter().all(|&t| t == 20.0));
    assert_eq!(sim.ticks(), 0);
}

#[test]
fn test_non_finite_forcing_keeps_fields_in_range() {
    let bad = [f32::NAN, f32::INFINITY, f32::NEG_INFINITY];
    let edits: [fn(&mut Forcing, f32); 7] = [
        |f, v| f.hour = v,
        |f, v| f.base_wind_speed = v,
        |f, v| f.wind_direction = v,
        |f, v| f.wind_gustiness = v,
        |f, v| f.sun_altitude = v,
        |f, v| f.sun_azimuth = v,
        |f, v| f.month = v,
    ];

    let mut sim = Simulation::new(config(24, 13)).unwrap();
    for edit in edits {
        for value in bad {
            let mut forcing = sim.forcing();
            edit(&mut forcing, value);
            sim.tick_with(&forcing);
            assert_in_ranges(sim.state());
        }
    }

    // Everything broken at once
    let mut forcing = sim.forcing();
    for edit in edits {
        edit(&mut forcing, f32::NAN);
    }
    forcing.time_factor = f32::INFINITY;
    let metrics = sim.tick_with(&forcing);
    assert_in_ranges(sim.state());
    assert!(metrics.avg_temperature.is_finite());
}

#[test]
fn test_nan_direction_matches_east() {
    let mut nan_sim = Simulation::new(config(20, 17)).unwrap();
    let mut east_sim = Simulation::new(config(20, 17)).unwrap();

    let mut forcing = nan_sim.forcing();
    forcing.wind_direction = f32::NAN;
    nan_sim.tick_with(&forcing);
    forcing.wind_direction = 0.0;
    east_sim.tick_with(&forcing);

    assert_eq!(nan_sim.state().wind, east_sim.state().wind);
    assert_eq!(nan_sim.state().fog_density, east_sim.state().fog_density);
    assert_eq!(nan_sim.state().humidity, east_sim.state().humidity);
}

#[test]
fn test_hour_gates_repeat_every_day() {
    for step in 0..96 {
        let h = step as f32 * 0.25;
        for shifted in [h + 24.0, h + 48.0, h - 24.0] {
            assert_eq!(is_katabatic_hour(h), is_katabatic_hour(shifted), "katabatic at {h}");
            assert_eq!(is_inversion_hour(h), is_inversion_hour(shifted), "inversion at {h}");
            assert_eq!(is_convective_hour(h), is_convective_hour(shifted), "convective at {h}");
        }
    }
    assert!(!is_katabatic_hour(36.0));
    assert!(!is_inversion_hour(36.0));
    assert!(is_convective_hour(36.0));
}

#[test]
fn test_next_day_hour_ticks_like_same_hour() {
    let mut today = Simulation::new(config(20, 23)).unwrap();
    let mut tomorrow = Simulation::new(config(20, 23)).unwrap();

    for hour in [2.0, 12.0, 22.0] {
        let mut forcing = today.forcing();
        forcing.hour = hour;
        let a = today.tick_with(&forcing);
        forcing.hour = hour + 24.0;
        let b = tomorrow.tick_with(&forcing);
        assert_eq!(a, b, "hour {hour}");
    }
    assert_eq!(today.state().air_temperature, tomorrow.state().air_temperature);
    assert_eq!(today.state().downslope_wind, tomorrow.state().downslope_wind);
}
