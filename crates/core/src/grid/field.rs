//! Dense square field storage
//!
//! Every per-cell quantity of the simulation lives in a [`Grid`]: a flat
//! `Vec<T>` in row-major order (`y * size + x`). All fields of one
//! simulation share the same side length for their whole lifetime.

use serde::{Deserialize, Serialize};

/// The 8 neighbour offsets, cardinals first
pub const NEIGHBORS_8: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Square grid of values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    /// Values in row-major order (y * size + x)
    data: Vec<T>,
    /// Side length in cells
    size: usize,
}

impl<T: Clone> Grid<T> {
    /// Create a grid with every cell set to `value`
    #[must_use]
    pub fn filled(size: usize, value: T) -> Self {
        Self {
            data: vec![value; size * size],
            size,
        }
    }

    /// Fill entire field with a value
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}

impl<T> Grid<T> {
    /// Wrap an existing row-major vector. Returns `None` if the length is not `size²`.
    pub fn from_vec(size: usize, data: Vec<T>) -> Option<Self> {
        (data.len() == size * size).then_some(Self { data, size })
    }

    /// Build a grid by evaluating `f(x, y)` for every cell in row-major order
    pub fn from_fn(size: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                data.push(f(x, y));
            }
        }
        Self { data, size }
    }

    /// Side length in cells
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Total number of cells
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the grid has no cells
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major index of `(x, y)`
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.size + x
    }

    /// Bounds predicate for signed coordinates
    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.size && (y as usize) < self.size
    }

    /// Value at `(x, y)`; `None` outside the grid
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<&T> {
        if self.in_bounds(x, y) {
            Some(&self.data[y as usize * self.size + x as usize])
        } else {
            None
        }
    }

    /// Value at an in-bounds cell
    ///
    /// # Panics
    ///
    /// Panics if coordinates are out of bounds
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> &T {
        &self.data[self.index(x, y)]
    }

    /// Mutable value at an in-bounds cell
    #[inline]
    pub fn at_mut(&mut self, x: usize, y: usize) -> &mut T {
        let idx = self.index(x, y);
        &mut self.data[idx]
    }

    /// Value at the nearest in-bounds cell (edge clamping)
    #[inline]
    pub fn clamped(&self, x: i32, y: i32) -> &T {
        let max = self.size as i32 - 1;
        let cx = x.clamp(0, max) as usize;
        let cy = y.clamp(0, max) as usize;
        &self.data[cy * self.size + cx]
    }

    /// Get reference to field data
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Get mutable reference to field data
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Iterate values in row-major order
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Map every value into a new grid of the same size
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            data: self.data.iter().map(f).collect(),
            size: self.size,
        }
    }
}

impl<T> std::ops::Index<usize> for Grid<T> {
    type Output = T;

    fn index(&self, idx: usize) -> &T {
        &self.data[idx]
    }
}

impl<T> std::ops::IndexMut<usize> for Grid<T> {
    fn index_mut(&mut self, idx: usize) -> &mut T {
        &mut self.data[idx]
    }
}

impl Grid<f32> {
    /// Bilinear sample at fractional coordinates, clamped into the grid.
    ///
    /// Exact at integer coordinates.
    pub fn sample_bilinear(&self, fx: f32, fy: f32) -> f32 {
        let max = (self.size - 1) as f32;
        let fx = if fx.is_finite() { fx.clamp(0.0, max) } else { 0.0 };
        let fy = if fy.is_finite() { fy.clamp(0.0, max) } else { 0.0 };

        let x0 = fx.floor() as usize;
        let y0 = fy.floor() as usize;
        let x1 = (x0 + 1).min(self.size - 1);
        let y1 = (y0 + 1).min(self.size - 1);
        let tx = fx - x0 as f32;
        let ty = fy - y0 as f32;

        let v00 = *self.at(x0, y0);
        let v10 = *self.at(x1, y0);
        let v01 = *self.at(x0, y1);
        let v11 = *self.at(x1, y1);

        if tx == 0.0 && ty == 0.0 {
            return v00;
        }

        let v0 = v00 * (1.0 - tx) + v10 * tx;
        let v1 = v01 * (1.0 - tx) + v11 * tx;
        v0 * (1.0 - ty) + v1 * ty
    }

    /// Unweighted mean of the in-bounds 3×3 neighbourhood (including the centre)
    pub fn mean_3x3(&self, x: usize, y: usize) -> f32 {
        let mut sum = 0.0;
        let mut count = 0.0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                if let Some(v) = self.get(x as i32 + dx, y as i32 + dy) {
                    sum += *v;
                    count += 1.0;
                }
            }
        }
        sum / count
    }
}

/// Clamp into `[min, max]`, substituting `fallback` for NaN.
///
/// Infinities clamp to the nearest bound.
#[inline]
pub fn clamp_finite(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback.clamp(min, max)
    } else {
        value.clamp(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_creation() {
        let grid = Grid::filled(10, 0.0_f32);
        assert_eq!(grid.size(), 10);
        assert_eq!(grid.len(), 100);
        assert!(grid.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_row_major_indexing() {
        let grid = Grid::from_fn(4, |x, y| (x * 10 + y) as f32);
        assert_eq!(grid.index(3, 2), 11);
        assert_eq!(grid[11], 32.0);
        assert_eq!(*grid.at(1, 3), 13.0);
    }

    #[test]
    fn test_bounds() {
        let grid = Grid::filled(3, 1u8);
        assert!(grid.in_bounds(0, 0));
        assert!(grid.in_bounds(2, 2));
        assert!(!grid.in_bounds(-1, 0));
        assert!(!grid.in_bounds(3, 1));
        assert!(grid.get(5, 5).is_none());
        assert_eq!(*grid.clamped(-4, 9), 1);
    }

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        assert!(Grid::from_vec(3, vec![0.0; 8]).is_none());
        assert!(Grid::from_vec(3, vec![0.0; 9]).is_some());
    }

    #[test]
    fn test_bilinear_exact_at_integers() {
        let grid = Grid::from_fn(5, |x, y| (x * x + 3 * y) as f32);
        for y in 0..5 {
            for x in 0..5 {
                assert_eq!(grid.sample_bilinear(x as f32, y as f32), *grid.at(x, y));
            }
        }
        let mid = grid.sample_bilinear(0.5, 0.0);
        assert!((mid - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_clamp_finite() {
        assert_eq!(clamp_finite(f32::NAN, 0.0, 1.0, 0.4), 0.4);
        assert_eq!(clamp_finite(f32::INFINITY, 0.0, 1.0, 0.4), 1.0);
        assert_eq!(clamp_finite(-3.0, 0.0, 1.0, 0.4), 0.0);
    }
}
