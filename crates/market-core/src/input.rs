//! The normalized 2-axis input vector consumed once per tick.
//!
//! The core never asks where the vector came from (keys, stick, touch drag).
//! Whatever the host hands over is sanitized before it can reach a position.

use serde::{Deserialize, Serialize};

/// Movement intent for one tick. Each axis is expected in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InputVector {
    pub x: f32,
    pub y: f32,
}

impl InputVector {
    pub const ZERO: InputVector = InputVector { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Clamp each axis into `[-1, 1]`. NaN becomes 0, infinities saturate.
    pub fn sanitized(self) -> Self {
        Self {
            x: sanitize_axis(self.x),
            y: sanitize_axis(self.y),
        }
    }

    pub fn magnitude(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Build a vector from four digital direction flags (keyboard style).
    pub fn from_directions(up: bool, down: bool, left: bool, right: bool) -> Self {
        let axis = |neg: bool, pos: bool| match (neg, pos) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        };
        Self {
            x: axis(left, right),
            y: axis(up, down),
        }
    }
}

fn sanitize_axis(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) }
}
