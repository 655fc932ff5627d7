//! Fundamental identifiers, geometry helpers, and simulation time.

use std::f32::consts::{PI, TAU};
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::constants::BATTLEFIELD_SIZE;

/// Stable public handle of a unit. Never reused within one simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

/// Stable public handle of a commander.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommanderId(pub u32);

/// Simulation time tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimTime {
    /// Current tick number (increments by 1 each tick).
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub elapsed_secs: f64,
}

impl SimTime {
    /// Advance by one tick of `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.tick += 1;
        self.elapsed_secs += dt as f64;
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds2 {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds2 {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// The whole battlefield square.
    pub fn battlefield() -> Self {
        Self::new(Vec2::ZERO, Vec2::splat(BATTLEFIELD_SIZE))
    }

    pub fn mid(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn clamp(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }

    /// Squared distance from `p` to the nearest point of the rectangle (0 inside).
    pub fn distance_squared(&self, p: Vec2) -> f32 {
        p.distance_squared(self.clamp(p))
    }

    /// Split into quadrants: south-west, south-east, north-west, north-east.
    pub fn quadrants(&self) -> [Bounds2; 4] {
        let mid = self.mid();
        [
            Bounds2::new(self.min, mid),
            Bounds2::new(Vec2::new(mid.x, self.min.y), Vec2::new(self.max.x, mid.y)),
            Bounds2::new(Vec2::new(self.min.x, mid.y), Vec2::new(mid.x, self.max.y)),
            Bounds2::new(mid, self.max),
        ]
    }
}

/// Angle of a vector in radians, counter-clockwise from +x.
#[inline]
pub fn angle_of(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// Unit vector pointing along `angle`.
#[inline]
pub fn vector_from_angle(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Normalize an angle to [-π, π).
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    let a = (angle + PI).rem_euclid(TAU) - PI;
    if a >= PI {
        a - TAU
    } else {
        a
    }
}

/// Signed shortest rotation from `from` to `to` (radians).
#[inline]
pub fn angle_difference(from: f32, to: f32) -> f32 {
    normalize_angle(to - from)
}
