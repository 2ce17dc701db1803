//! Valley channeling
//!
//! Detects valley floors from the surrounding relief and steers the
//! prevailing wind along the valley axis, accelerating it as the valley
//! narrows:
//! - Wind is funneled along the axis in proportion to narrowness
//! - Speed follows `U_valley = U_ambient × (W_open / W_valley)^0.5`, 1.0-2.5×
//!
//! # Scientific References
//!
//! - Whiteman, C.D. (2000). "Mountain Meteorology: Fundamentals and Applications."
//!   Oxford University Press.
//! - Sharples, J.J. (2009). "An overview of mountain meteorological effects relevant to fire
//!   behaviour and bushfire risk." Int. J. Wildland Fire 18:737-754.

use crate::core_types::Vec2;
use crate::grid::Grid;
use std::f32::consts::TAU;

/// Search radius for valley detection (cells)
pub const VALLEY_RADIUS: i32 = 5;
/// A neighbour this much higher than the centre counts as a valley wall (m)
const WALL_HEIGHT: f32 = 15.0;
/// Minimum fraction of wall cells in the window
const WALL_FRACTION: f32 = 0.3;
const RING_SAMPLES: usize = 16;
/// Opposite ring pairs within this of the lowest pair share the axis (m)
const EXIT_TOLERANCE: f32 = 1.0;
/// Rise that ends the perpendicular width walk (m)
const WIDTH_TOLERANCE: f32 = 10.0;
/// Width of open terrain the venturi factor is measured against (cells)
pub const REFERENCE_WIDTH_CELLS: f32 = 20.0;
/// Maximum share of the prevailing direction replaced by the axis
const MAX_AXIS_BLEND: f32 = 0.8;

/// Valley geometry at a cell
#[derive(Debug, Clone, Copy)]
pub struct ValleyGeometry {
    /// Wall-to-wall width (m)
    pub width: f32,
    /// Mean ring elevation above the floor (m)
    pub depth: f32,
    /// Unit vector along the valley (sign arbitrary)
    pub axis: Vec2,
    pub in_valley: bool,
}

impl Default for ValleyGeometry {
    fn default() -> Self {
        Self {
            width: 0.0,
            depth: 0.0,
            axis: Vec2::zeros(),
            in_valley: false,
        }
    }
}

/// Detect valley geometry around `(x, y)`.
///
/// A candidate floor needs enough much-higher cells within the radius-5
/// window. The axis runs through the lowest pair of opposite exits on the
/// ring of 16 samples; the width is found by walking perpendicular to the
/// axis until the terrain rises. Both walls must be found.
pub fn detect_valley_geometry(
    elevation: &Grid<f32>,
    cell_size: f32,
    x: usize,
    y: usize,
) -> ValleyGeometry {
    let center = *elevation.at(x, y);
    let (cx, cy) = (x as i32, y as i32);

    let mut higher = 0usize;
    let mut total = 0usize;
    for dy in -VALLEY_RADIUS..=VALLEY_RADIUS {
        for dx in -VALLEY_RADIUS..=VALLEY_RADIUS {
            if dx == 0 && dy == 0 {
                continue;
            }
            if let Some(&e) = elevation.get(cx + dx, cy + dy) {
                total += 1;
                if e > center + WALL_HEIGHT {
                    higher += 1;
                }
            }
        }
    }
    if total == 0 || (higher as f32 / total as f32) < WALL_FRACTION {
        return ValleyGeometry::default();
    }

    let radius = VALLEY_RADIUS as f32;
    let ring: Vec<f32> = (0..RING_SAMPLES)
        .map(|i| {
            let angle = i as f32 * TAU / RING_SAMPLES as f32;
            elevation.sample_bilinear(x as f32 + angle.cos() * radius, y as f32 + angle.sin() * radius)
        })
        .collect();

    let half = RING_SAMPLES / 2;
    let pair_scores: Vec<f32> = (0..half).map(|i| ring[i] + ring[i + half]).collect();
    let lowest = pair_scores.iter().copied().fold(f32::INFINITY, f32::min);

    // Undirected axis: average ties on the doubled angle
    let mut doubled = Vec2::zeros();
    for (i, &score) in pair_scores.iter().enumerate() {
        if score <= lowest + EXIT_TOLERANCE {
            let angle = 2.0 * (i as f32 * TAU / RING_SAMPLES as f32);
            doubled += Vec2::new(angle.cos(), angle.sin());
        }
    }
    let axis_angle = if doubled.norm() > 1e-6 {
        doubled.y.atan2(doubled.x) / 2.0
    } else {
        0.0
    };
    let axis = Vec2::new(axis_angle.cos(), axis_angle.sin());
    let perpendicular = Vec2::new(-axis.y, axis.x);

    let max_steps = 2 * VALLEY_RADIUS;
    let mut walls = [None; 2];
    for (wall, side) in walls.iter_mut().zip([-1.0_f32, 1.0]) {
        for step in 1..=max_steps {
            let offset = perpendicular * (side * step as f32);
            let e = elevation.sample_bilinear(x as f32 + offset.x, y as f32 + offset.y);
            if e > center + WIDTH_TOLERANCE {
                *wall = Some(step as f32);
                break;
            }
        }
    }
    let [Some(left), Some(right)] = walls else {
        return ValleyGeometry::default();
    };

    let mean_ring = ring.iter().sum::<f32>() / RING_SAMPLES as f32;
    ValleyGeometry {
        width: (left + right) * cell_size,
        depth: (mean_ring - center).max(0.0),
        axis,
        in_valley: true,
    }
}

/// Calculate wind acceleration in valley
///
/// Wind speed in valley: `U_valley = U_ambient × (W_open / W_valley)^0.5`
///
/// # Returns
///
/// Wind acceleration factor (1.0 = no acceleration, 2.5 = maximum)
pub fn valley_wind_factor(geometry: &ValleyGeometry, reference_width: f32) -> f32 {
    if !geometry.in_valley || geometry.width <= 0.0 {
        return 1.0;
    }

    (reference_width / geometry.width).sqrt().clamp(1.0, 2.5)
}

/// Steer and accelerate `prevailing` along the valley.
///
/// The axis is oriented to agree with the prevailing flow, blended in
/// proportion to narrowness, and the speed scaled by the venturi factor.
pub fn channel_wind(prevailing: Vec2, geometry: &ValleyGeometry, reference_width: f32) -> Vec2 {
    let speed = prevailing.norm();
    if !geometry.in_valley || speed <= 0.0 {
        return prevailing;
    }

    let direction = prevailing / speed;
    let axis = if geometry.axis.dot(&direction) < 0.0 {
        -geometry.axis
    } else {
        geometry.axis
    };
    let narrowness = (1.0 - geometry.width / reference_width).clamp(0.0, 1.0);
    let blend = narrowness * MAX_AXIS_BLEND;

    let steered = direction * (1.0 - blend) + axis * blend;
    let steered = if steered.norm() > 1e-6 {
        steered.normalize()
    } else {
        axis
    };
    steered * speed * valley_wind_factor(geometry, reference_width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::terrain::{flat_terrain, valley_between_ridges};

    /// Angle between two undirected axes
    fn axis_separation(a: Vec2, b: Vec2) -> f32 {
        a.dot(&b).abs().min(1.0).acos()
    }

    #[test]
    fn test_flat_is_not_valley() {
        let state = flat_terrain(21, 10.0, 100.0).unwrap();
        let g = detect_valley_geometry(&state.elevation, 10.0, 10, 10);
        assert!(!g.in_valley);
        assert_eq!(valley_wind_factor(&g, 200.0), 1.0);
    }

    #[test]
    fn test_detects_north_south_valley() {
        let state = valley_between_ridges(21, 10.0, 0.0, 200.0, 3.0).unwrap();
        let g = detect_valley_geometry(&state.elevation, 10.0, 10, 10);
        assert!(g.in_valley);
        assert!(axis_separation(g.axis, Vec2::new(0.0, 1.0)) < 0.2, "axis {:?}", g.axis);
        assert_eq!(g.width, 80.0);
        assert!(g.depth > 0.0);
    }

    #[test]
    fn test_uniform_slope_is_not_valley() {
        let elevation = Grid::from_fn(21, |x, _| x as f32 * 20.0);
        let g = detect_valley_geometry(&elevation, 10.0, 10, 10);
        assert!(!g.in_valley);
    }

    #[test]
    fn test_channeling_turns_and_accelerates() {
        let geometry = ValleyGeometry {
            width: 50.0,
            depth: 100.0,
            axis: Vec2::new(0.0, 1.0),
            in_valley: true,
        };
        let prevailing = Vec2::new(1.0, -1.0) * 4.0;
        let out = channel_wind(prevailing, &geometry, 200.0);
        // Turned toward -y (the axis orientation agreeing with the flow)
        assert!(out.y < 0.0);
        assert!(out.x.abs() < out.y.abs());
        assert!((out.norm() - prevailing.norm() * 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_calm_stays_calm() {
        let geometry = ValleyGeometry {
            width: 50.0,
            depth: 100.0,
            axis: Vec2::new(0.0, 1.0),
            in_valley: true,
        };
        assert_eq!(channel_wind(Vec2::zeros(), &geometry, 200.0), Vec2::zeros());
    }
}
