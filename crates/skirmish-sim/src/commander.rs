//! Commanders: who gives orders to which team.

use serde::{Deserialize, Serialize};

use skirmish_core::enums::CommanderType;
use skirmish_core::types::CommanderId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commander {
    pub id: CommanderId,
    pub player_id: String,
    pub team: i32,
    pub kind: CommanderType,
}

impl Commander {
    pub fn is_player(&self) -> bool {
        self.kind == CommanderType::Player
    }
}
