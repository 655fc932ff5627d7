//! Missile volleys and their projectiles.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::constants::{ARROW_ARC_DURATION, ARROW_SPEED, BULLET_ARC_DURATION, BULLET_SPEED};
use crate::enums::MissileType;
use crate::types::UnitId;

/// One missile in a volley.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub origin: Vec2,
    pub destination: Vec2,
    /// Flight delay for this shot on top of the volley's arc duration (seconds).
    pub delay: f32,
}

impl Projectile {
    pub fn new(origin: Vec2, destination: Vec2, missile_type: MissileType) -> Self {
        Self {
            origin,
            destination,
            delay: flight_delay(missile_type, origin.distance(destination)),
        }
    }
}

/// A volley fired by one unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shooting {
    /// Shooting unit, if the volley came from one.
    pub unit: Option<UnitId>,
    /// Team of the shooter; projectiles never kill this team.
    pub team: i32,
    pub missile_type: MissileType,
    /// Fixed time from release until the first shot can land (seconds).
    pub time_to_impact: f32,
    /// Hit chance at half range.
    pub fire_accuracy: f32,
    /// Range used to scale accuracy (meters).
    pub maximum_range: f32,
    pub projectiles: Vec<Projectile>,
}

impl Shooting {
    pub fn new(
        unit: Option<UnitId>,
        team: i32,
        missile_type: MissileType,
        fire_accuracy: f32,
        maximum_range: f32,
    ) -> Self {
        Self {
            unit,
            team,
            missile_type,
            time_to_impact: arc_duration(missile_type),
            fire_accuracy,
            maximum_range,
            projectiles: Vec::new(),
        }
    }

    /// Seconds after release at which `projectile` lands.
    pub fn impact_time(&self, projectile: &Projectile) -> f32 {
        self.time_to_impact + projectile.delay
    }

    /// Seconds after release at which the last projectile lands.
    pub fn duration(&self) -> f32 {
        self.projectiles
            .iter()
            .map(|p| self.impact_time(p))
            .fold(self.time_to_impact, f32::max)
    }

    /// Hit chance for a projectile travelling `distance` meters.
    /// Linear in the range fraction, equal to `fire_accuracy` at half range.
    pub fn hit_probability(&self, distance: f32) -> f32 {
        if self.maximum_range <= 0.0 {
            return self.fire_accuracy.clamp(0.0, 1.0);
        }
        let fraction = (distance / self.maximum_range).clamp(0.0, 1.0);
        (self.fire_accuracy * 2.0 * (1.0 - fraction)).clamp(0.0, 1.0)
    }
}

/// Fixed arc duration for a missile type (seconds).
pub fn arc_duration(missile_type: MissileType) -> f32 {
    match missile_type {
        MissileType::Arrow => ARROW_ARC_DURATION,
        MissileType::Bullet => BULLET_ARC_DURATION,
    }
}

/// Flight delay proportional to distance (seconds).
pub fn flight_delay(missile_type: MissileType, distance: f32) -> f32 {
    let speed = match missile_type {
        MissileType::Arrow => ARROW_SPEED,
        MissileType::Bullet => BULLET_SPEED,
    };
    distance.max(0.0) / speed
}
