//! Events emitted by the simulation for rendering, audio, and scripts.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::commands::UnitCommand;
use crate::enums::UnitPlatform;
use crate::shooting::Shooting;
use crate::types::UnitId;

/// A fighter removed from the battle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Casualty {
    pub unit: UnitId,
    pub team: i32,
    pub platform: UnitPlatform,
    pub position: Vec2,
}

/// Everything observers are told about, in the order it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BattleEvent {
    /// Unit entered the battle.
    AddUnit {
        unit: UnitId,
        team: i32,
        unit_class: String,
        fighters: usize,
        position: Vec2,
    },
    /// Unit left the battle (destroyed, routed away, or removed by the caller).
    RemoveUnit { unit: UnitId },
    /// Command issued; takes effect after `delay` seconds.
    Command {
        unit: UnitId,
        command: UnitCommand,
        delay: f32,
    },
    /// Volley scheduled; released after `delay` seconds.
    Shooting { shooting: Shooting, delay: f32 },
    /// Volley released; projectiles are now in flight.
    Release { shooting: Shooting },
    Casualty(Casualty),
    /// Unit started routing.
    Routing { unit: UnitId },
}
