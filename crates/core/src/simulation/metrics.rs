//! Whole-grid summary statistics

use crate::grid::SimulationState;
use serde::{Deserialize, Serialize};

/// Aggregates over every finite-valued cell
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationMetrics {
    /// °C
    pub min_temperature: f32,
    pub max_temperature: f32,
    pub avg_temperature: f32,
    pub avg_precipitation: f32,
    /// m
    pub max_cloud_top: f32,
    /// m
    pub avg_snow_depth: f32,
}

fn finite_mean(values: impl Iterator<Item = f32>) -> f32 {
    let (sum, count) = values
        .filter(|v| v.is_finite())
        .fold((0.0_f64, 0usize), |(s, n), v| (s + f64::from(v), n + 1));
    if count == 0 {
        0.0
    } else {
        (sum / count as f64) as f32
    }
}

/// Summarise temperature, precipitation, cloud tops and snow.
///
/// Sequential so the result is bit-identical run to run.
pub fn calculate_simulation_metrics(state: &SimulationState) -> SimulationMetrics {
    let (min_temperature, max_temperature) = state
        .air_temperature
        .iter()
        .filter(|t| t.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &t| {
            (lo.min(t), hi.max(t))
        });
    let (min_temperature, max_temperature) = if min_temperature.is_finite() {
        (min_temperature, max_temperature)
    } else {
        (0.0, 0.0)
    };

    let max_cloud_top = state
        .cloud_top
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0_f32, f32::max);

    SimulationMetrics {
        min_temperature,
        max_temperature,
        avg_temperature: finite_mean(state.air_temperature.iter().copied()),
        avg_precipitation: finite_mean(state.precipitation.iter().map(|p| p.rate)),
        max_cloud_top,
        avg_snow_depth: finite_mean(state.snow_depth.iter().copied()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_metrics_skip_non_finite_cells() {
        let mut state = SimulationState::new(3, 30.0).unwrap();
        state.air_temperature[0] = 10.0;
        state.air_temperature[1] = f32::NAN;
        state.air_temperature[2] = 30.0;
        state.cloud_top[4] = 2500.0;
        state.snow_depth[8] = 0.9;
        let m = calculate_simulation_metrics(&state);
        assert_eq!(m.min_temperature, 10.0);
        assert_eq!(m.max_temperature, 30.0);
        assert_relative_eq!(m.avg_temperature, (10.0 + 30.0 + 20.0 * 6.0) / 8.0);
        assert_eq!(m.max_cloud_top, 2500.0);
        assert_relative_eq!(m.avg_snow_depth, 0.1);
        assert_eq!(m.avg_precipitation, 0.0);
    }
}
