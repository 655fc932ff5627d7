//! Enumeration types used throughout the simulation.

use serde::{Deserialize, Serialize};

/// Per-fighter melee engagement state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadyState {
    /// No engagement in progress.
    #[default]
    Unready,
    /// Opponent in reach, raising the weapon.
    Readying,
    /// Weapon raised, waiting for the opponent.
    Prepared,
    /// Exchange in progress; resolved when the timer runs out.
    Striking,
    /// Recovering after an exchange.
    Stunned,
}

/// What a unit as a whole is doing this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitMode {
    /// Freshly added, not yet simulated.
    #[default]
    Initializing,
    Standing,
    Moving,
    /// Standing still while wheeling toward the commanded facing.
    Turning,
}

/// How a unit's fighters are carried into battle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitPlatform {
    #[default]
    Cavalry,
    General,
    Ashigaru,
    Samurai,
}

impl UnitPlatform {
    /// Mounted platforms move faster and count as cavalry in melee.
    pub fn is_mounted(self) -> bool {
        matches!(self, UnitPlatform::Cavalry | UnitPlatform::General)
    }
}

/// Primary weapon of a unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitWeapon {
    #[default]
    Yari,
    Katana,
    Naginata,
    Bow,
    Arquebus,
}

impl UnitWeapon {
    /// Missile type fired by this weapon, if any.
    pub fn missile_type(self) -> Option<MissileType> {
        match self {
            UnitWeapon::Bow => Some(MissileType::Arrow),
            UnitWeapon::Arquebus => Some(MissileType::Bullet),
            _ => None,
        }
    }
}

/// Kind of projectile in a shooting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissileType {
    #[default]
    Arrow,
    Bullet,
}

/// Who issues orders for a commander.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommanderType {
    #[default]
    None,
    Player,
    Script,
}

/// Unit activity as reported to scripts and status displays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitActivity {
    #[default]
    Standing,
    Walking,
    Running,
    Routing,
    Charging,
    Fighting,
    Shooting,
}

impl UnitActivity {
    /// Numeric status code used by the scripting bridge.
    pub fn code(self) -> i32 {
        match self {
            UnitActivity::Standing => 0,
            UnitActivity::Walking => 1,
            UnitActivity::Running => 2,
            UnitActivity::Routing => 3,
            UnitActivity::Charging => 4,
            UnitActivity::Fighting => 5,
            UnitActivity::Shooting => 6,
        }
    }
}
