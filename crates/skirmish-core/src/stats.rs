//! Unit classes and static unit statistics.

use std::fmt;
use std::str::FromStr;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::enums::{UnitPlatform, UnitWeapon};

/// Error returned when a unit class string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseUnitClassError {
    #[error("unit class `{0}` is not of the form PLATFORM-WEAPON")]
    Malformed(String),
    #[error("unknown unit platform `{0}`")]
    UnknownPlatform(String),
    #[error("unknown unit weapon `{0}`")]
    UnknownWeapon(String),
}

/// Platform and weapon pair, written as e.g. `"ASH-YARI"` or `"SAM-BOW"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitClass {
    pub platform: UnitPlatform,
    pub weapon: UnitWeapon,
}

impl UnitClass {
    pub fn new(platform: UnitPlatform, weapon: UnitWeapon) -> Self {
        Self { platform, weapon }
    }
}

impl FromStr for UnitClass {
    type Err = ParseUnitClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (platform, weapon) = s
            .split_once('-')
            .ok_or_else(|| ParseUnitClassError::Malformed(s.to_string()))?;

        let platform = match platform.trim().to_ascii_uppercase().as_str() {
            "CAV" => UnitPlatform::Cavalry,
            "GEN" => UnitPlatform::General,
            "ASH" => UnitPlatform::Ashigaru,
            "SAM" => UnitPlatform::Samurai,
            other => return Err(ParseUnitClassError::UnknownPlatform(other.to_string())),
        };
        let weapon = match weapon.trim().to_ascii_uppercase().as_str() {
            "YARI" => UnitWeapon::Yari,
            "KATA" => UnitWeapon::Katana,
            "NAGI" => UnitWeapon::Naginata,
            "BOW" => UnitWeapon::Bow,
            "ARQ" => UnitWeapon::Arquebus,
            other => return Err(ParseUnitClassError::UnknownWeapon(other.to_string())),
        };

        Ok(Self { platform, weapon })
    }
}

impl fmt::Display for UnitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let platform = match self.platform {
            UnitPlatform::Cavalry => "CAV",
            UnitPlatform::General => "GEN",
            UnitPlatform::Ashigaru => "ASH",
            UnitPlatform::Samurai => "SAM",
        };
        let weapon = match self.weapon {
            UnitWeapon::Yari => "YARI",
            UnitWeapon::Katana => "KATA",
            UnitWeapon::Naginata => "NAGI",
            UnitWeapon::Bow => "BOW",
            UnitWeapon::Arquebus => "ARQ",
        };
        write!(f, "{platform}-{weapon}")
    }
}

/// Static attributes shared by all fighters of a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStats {
    pub platform: UnitPlatform,
    pub weapon: UnitWeapon,
    /// Melee reach (meters).
    pub weapon_reach: f32,
    /// 0.0 (levy) to 1.0 (veteran); weighs melee exchanges and morale.
    pub training_level: f32,
    /// Seconds an exchange lasts once both fighters are prepared.
    pub striking_duration: f32,
    /// Seconds to raise the weapon once an opponent is in reach.
    pub readying_duration: f32,
    /// Volleys per minute (0 for melee-only units).
    pub fire_rate: f32,
    /// Minimum fire range (meters).
    pub minimum_range: f32,
    /// Maximum fire range (meters, 0 for melee-only units).
    pub maximum_range: f32,
    /// Hit chance at half range.
    pub fire_accuracy: f32,
    /// Meters per second.
    pub walking_speed: f32,
    /// Meters per second.
    pub running_speed: f32,
    /// x = side-to-side, y = front-to-back (meters).
    pub fighter_size: Vec2,
    /// Gap between neighbouring fighters; x = between files, y = between ranks.
    pub spacing: Vec2,
    /// Ranks in a full-strength formation.
    pub ranks: usize,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self {
            platform: UnitPlatform::Ashigaru,
            weapon: UnitWeapon::Yari,
            weapon_reach: 1.0,
            training_level: 0.5,
            striking_duration: 2.0,
            readying_duration: 1.0,
            fire_rate: 0.0,
            minimum_range: 0.0,
            maximum_range: 0.0,
            fire_accuracy: 0.0,
            walking_speed: 4.0,
            running_speed: 8.0,
            fighter_size: Vec2::new(1.1, 1.1),
            spacing: Vec2::new(0.7, 0.3),
            ranks: 4,
        }
    }
}

impl UnitStats {
    /// Default statistics for a platform/weapon combination.
    pub fn for_class(class: UnitClass) -> Self {
        let mut stats = UnitStats {
            platform: class.platform,
            weapon: class.weapon,
            ..Default::default()
        };

        match class.platform {
            UnitPlatform::Cavalry | UnitPlatform::General => {
                stats.walking_speed = 7.0;
                stats.running_speed = 14.0;
                stats.fighter_size = Vec2::new(1.1, 2.3);
                stats.spacing = Vec2::new(1.1, 1.7);
                stats.readying_duration = 0.5;
                stats.ranks = 3;
                stats.training_level = if class.platform == UnitPlatform::General {
                    1.0
                } else {
                    0.9
                };
            }
            UnitPlatform::Samurai => {
                stats.training_level = 0.8;
            }
            UnitPlatform::Ashigaru => {
                stats.training_level = 0.5;
            }
        }

        match class.weapon {
            UnitWeapon::Yari => {
                stats.weapon_reach = if class.platform.is_mounted() { 2.4 } else { 5.0 };
            }
            UnitWeapon::Katana => {
                stats.weapon_reach = 1.0;
                stats.striking_duration = 1.5;
            }
            UnitWeapon::Naginata => {
                stats.weapon_reach = 2.4;
            }
            UnitWeapon::Bow => {
                stats.weapon_reach = 1.0;
                stats.fire_rate = 25.0;
                stats.minimum_range = 0.0;
                stats.maximum_range = 150.0;
                stats.fire_accuracy = 0.7;
            }
            UnitWeapon::Arquebus => {
                stats.weapon_reach = 1.0;
                stats.fire_rate = 20.0;
                stats.minimum_range = 0.0;
                stats.maximum_range = 110.0;
                stats.fire_accuracy = 0.5;
                stats.walking_speed = stats.walking_speed.min(4.0);
            }
        }

        stats
    }

    /// True when the unit can fire missiles at all.
    pub fn is_missile_unit(&self) -> bool {
        self.maximum_range > 0.0 && self.fire_rate > 0.0
    }

    /// Seconds between volleys.
    pub fn loading_duration(&self) -> f32 {
        if self.fire_rate > 0.0 {
            60.0 / self.fire_rate
        } else {
            0.0
        }
    }

    /// Distance between neighbouring files (meters).
    pub fn file_distance(&self) -> f32 {
        self.fighter_size.x + self.spacing.x
    }

    /// Distance between neighbouring ranks (meters).
    pub fn rank_distance(&self) -> f32 {
        self.fighter_size.y + self.spacing.y
    }
}
