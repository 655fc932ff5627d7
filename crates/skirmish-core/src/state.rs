//! Battle snapshot: the visible state handed to displays and scripts.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::enums::UnitActivity;
use crate::types::{SimTime, UnitId};

/// Summary of one unit, as reported to scripts and status displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStatus {
    pub unit: UnitId,
    pub team: i32,
    pub unit_class: String,
    pub position: Vec2,
    /// Facing (radians).
    pub heading: f32,
    pub activity: UnitActivity,
    /// Fighters still standing.
    pub strength: usize,
    pub morale: f32,
    /// Blink period for a unit close to routing (0 when steady).
    pub routing_blink_time: f32,
}

/// Complete battle state after a tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleSnapshot {
    pub time: SimTime,
    /// Units in insertion order.
    pub units: Vec<UnitStatus>,
    pub shootings_in_flight: usize,
    /// Fighters killed, keyed by the killing team.
    pub kills: BTreeMap<i32, u32>,
    /// 0 while undecided.
    pub winner_team: i32,
    pub deployment: bool,
}

impl BattleSnapshot {
    pub fn unit(&self, unit: UnitId) -> Option<&UnitStatus> {
        self.units.iter().find(|u| u.unit == unit)
    }

    /// Fighters remaining on `team`.
    pub fn team_strength(&self, team: i32) -> usize {
        self.units
            .iter()
            .filter(|u| u.team == team)
            .map(|u| u.strength)
            .sum()
    }
}
