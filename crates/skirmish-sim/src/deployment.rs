//! Per-team deployment zones and the deployment timer.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use skirmish_core::constants::{DEPLOYMENT_EPSILON, TIMER_EPSILON};

/// Circular region where a team places its units before battle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeploymentZone {
    pub center: Vec2,
    pub radius: f32,
}

/// Deployment phase state.
#[derive(Debug, Clone, Default)]
pub struct Deployment {
    enabled: bool,
    /// Seconds left; None runs until every team has deployed.
    timer: Option<f32>,
    zones: BTreeMap<i32, DeploymentZone>,
}

impl Deployment {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn timer(&self) -> Option<f32> {
        self.timer
    }

    pub fn enable(&mut self, timer: Option<f32>) {
        self.enabled = true;
        self.timer = timer.map(|t| t.max(0.0));
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.timer = None;
    }

    /// Count the timer down. Returns true when it ran out this tick.
    pub fn tick(&mut self, dt: f32) -> bool {
        match self.timer.as_mut() {
            Some(timer) if self.enabled => {
                *timer -= dt;
                *timer <= TIMER_EPSILON
            }
            _ => false,
        }
    }

    pub fn set_zone(&mut self, team: i32, center: Vec2, radius: f32) {
        self.zones.insert(
            team,
            DeploymentZone {
                center,
                radius: radius.max(0.0),
            },
        );
    }

    pub fn zone(&self, team: i32) -> Option<DeploymentZone> {
        self.zones.get(&team).copied()
    }

    /// A team without a zone may stand anywhere.
    pub fn is_deployment_zone(&self, team: i32, position: Vec2) -> bool {
        match self.zones.get(&team) {
            Some(zone) => zone.center.distance(position) <= zone.radius + DEPLOYMENT_EPSILON,
            None => true,
        }
    }

    /// Project `position` into the team's zone shrunk by `inset`.
    pub fn constrain(&self, team: i32, position: Vec2, inset: f32) -> Vec2 {
        let Some(zone) = self.zones.get(&team) else {
            return position;
        };
        let radius = (zone.radius - inset.max(0.0)).max(0.0);
        let offset = position - zone.center;
        let distance = offset.length();
        if distance <= radius {
            position
        } else if distance > 0.0 {
            zone.center + offset * (radius / distance)
        } else {
            zone.center
        }
    }
}
