//! Plain 2D vector math shared by the pattern extractor and the matcher.
use std::f64::consts::PI;
use std::ops::Sub;

use serde::Deserialize;

/// A directional displacement `(dx, dy)`. Never a position.
///
/// Deserializes from a two-element array so patterns can be written as
/// `[[-1.0, 0.0], [0.0, 1.0]]` in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(from = "[f64; 2]")]
pub struct Vector {
    pub dx: f64,
    pub dy: f64,
}

impl Vector {
    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// Euclidean length.
    pub fn magnitude(&self) -> f64 {
        self.dx.hypot(self.dy)
    }
}

impl From<[f64; 2]> for Vector {
    fn from([dx, dy]: [f64; 2]) -> Self {
        Self { dx, dy }
    }
}

impl From<(f64, f64)> for Vector {
    fn from((dx, dy): (f64, f64)) -> Self {
        Self { dx, dy }
    }
}

/// A pointer position in screen (or integrated device) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Sub for Point {
    type Output = Vector;

    fn sub(self, rhs: Point) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    (b - a).magnitude()
}

/// Signed direction difference between two vectors, normalized to (-1, 1].
///
/// `0` means same direction, `±0.5` a right angle and `1` opposite
/// directions. The angle is taken with `atan2(dx, dy)` and wrapped into
/// (-π, π] before dividing by π, which makes the result unitless.
pub fn direction_difference(v1: Vector, v2: Vector) -> f64 {
    let mut angle = v1.dx.atan2(v1.dy) - v2.dx.atan2(v2.dy);

    if angle > PI {
        angle -= 2.0 * PI;
    } else if angle <= -PI {
        angle += 2.0 * PI;
    }

    angle / PI
}
