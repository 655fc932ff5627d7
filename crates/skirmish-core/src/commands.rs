//! Unit commands issued by players, scripts, or AI.
//!
//! Commands are stored as pending and consumed at the next tick boundary.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::types::UnitId;

/// Intent for a single unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitCommand {
    /// Points to march through, in order. Empty = hold position.
    pub path: Vec<Vec2>,
    /// Facing to adopt once the path is finished (radians).
    pub facing: f32,
    pub running: bool,
    /// Enemy unit to charge.
    pub melee_target: Option<UnitId>,
    /// Enemy unit to shoot at.
    pub missile_target: Option<UnitId>,
    /// Only ever shoot at `missile_target`.
    pub missile_target_locked: bool,
    pub hold_fire: bool,
}

impl UnitCommand {
    /// Command that keeps the unit where it is, facing `facing`.
    pub fn hold(facing: f32) -> Self {
        Self {
            facing,
            ..Default::default()
        }
    }

    /// Command that marches to `destination` and then faces `facing`.
    pub fn move_to(destination: Vec2, facing: f32, running: bool) -> Self {
        Self {
            path: vec![destination],
            facing,
            running,
            ..Default::default()
        }
    }

    /// Final point of the path, if any.
    pub fn destination(&self) -> Option<Vec2> {
        self.path.last().copied()
    }

    pub fn clear_path_and_set_destination(&mut self, p: Vec2) {
        self.path.clear();
        self.path.push(p);
    }
}
