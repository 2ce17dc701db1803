//! Vector types for horizontal gradients and wind.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// 2D vector type for terrain gradients and horizontal wind.
///
/// This is a simple alias for `nalgebra::Vector2<f32>`, used throughout
/// the engines for slope gradients, wind directions and valley axes.
pub type Vec2 = Vector2<f32>;

/// Per-cell horizontal wind (m/s).
///
/// `speed` is always the magnitude of `(x, y)`; it is recomputed by every
/// constructor and never set on its own.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindVector {
    /// Eastward (+x) component
    pub x: f32,
    /// Southward (+y) component
    pub y: f32,
    /// Magnitude of the vector
    pub speed: f32,
}

impl WindVector {
    /// Calm air
    pub const CALM: Self = Self {
        x: 0.0,
        y: 0.0,
        speed: 0.0,
    };

    /// Build a wind vector from its components, deriving `speed`.
    #[inline]
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            speed: (x * x + y * y).sqrt(),
        }
    }

    /// Build from an nalgebra vector
    #[inline]
    #[must_use]
    pub fn from_vec(v: Vec2) -> Self {
        Self::new(v.x, v.y)
    }

    /// Wind blowing toward `direction_degrees` (counter-clockwise from +x) at `speed`.
    #[must_use]
    pub fn from_direction(direction_degrees: f32, speed: f32) -> Self {
        let theta = direction_degrees.to_radians();
        Self::new(theta.cos() * speed, theta.sin() * speed)
    }

    /// Components as an nalgebra vector
    #[inline]
    #[must_use]
    pub fn vector(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}
