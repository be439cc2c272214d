//! 2D working-space primitives

use std::ops::{Add, Mul, Sub};
use serde::{Deserialize, Serialize};

/// A point in the normalized working space (not pixels)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance_to(self, other: Self) -> f64 {
        (self - other).length()
    }

    /// Midpoint between two points
    pub fn midpoint(self, other: Self) -> Self {
        (self + other) * 0.5
    }
}

impl Add for Point2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl Sub for Point2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl Mul<f64> for Point2 {
    type Output = Self;
    fn mul(self, s: f64) -> Self {
        Self { x: self.x * s, y: self.y * s }
    }
}

impl From<(f64, f64)> for Point2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Per-axis multiplier applied after projecting camera space into working
/// space (aspect / crop compensation)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverScale {
    pub x: f64,
    pub y: f64,
}

impl Default for CoverScale {
    fn default() -> Self {
        Self { x: 1.0, y: 1.0 }
    }
}

/// Clamp without panicking on inverted bounds (low wins)
pub fn clamp(value: f64, low: f64, high: f64) -> f64 {
    low.max(high.min(value))
}
