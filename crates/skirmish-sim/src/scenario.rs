//! Scenario files: battles described in JSON.
//!
//! A scenario names the commanders, deployment zones, terrain, and the units
//! each commander fields, optionally with their opening orders. Loading goes
//! through the same public operations a script would call.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use skirmish_core::commands::UnitCommand;
use skirmish_core::enums::CommanderType;
use skirmish_core::stats::{ParseUnitClassError, UnitClass, UnitStats};
use skirmish_core::types::UnitId;
use skirmish_terrain::{TerrainDescription, TerrainError};

use crate::engine::{BattleSimulator, SimConfig};

/// Errors from reading a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("invalid scenario JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown commander '{0}'")]
    UnknownCommander(String),
    #[error("unit {index}: {source}")]
    UnitClass {
        index: usize,
        #[source]
        source: ParseUnitClassError,
    },
    #[error("unit {0} has no fighters")]
    EmptyUnit(usize),
    #[error("unit {0} refers to an unknown target unit")]
    UnknownUnit(usize),
    #[error(transparent)]
    Terrain(#[from] TerrainError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioDescription {
    pub config: SimConfig,
    pub commanders: Vec<CommanderDescription>,
    pub deployment: Option<DeploymentDescription>,
    pub terrain: Option<TerrainDescription>,
    pub units: Vec<UnitDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommanderDescription {
    pub player_id: String,
    pub team: i32,
    #[serde(default = "default_commander_kind")]
    pub kind: CommanderType,
    /// Map edge the team starts from.
    #[serde(default)]
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentDescription {
    /// Seconds until deployment ends.
    pub timer: Option<f32>,
    pub zones: Vec<ZoneDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneDescription {
    pub team: i32,
    pub center: Vec2,
    pub radius: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitDescription {
    /// `player_id` of the commanding commander.
    pub commander: String,
    /// Class string such as `"ASH-BOW"`.
    pub class: String,
    #[serde(default = "default_strength")]
    pub strength: usize,
    #[serde(default = "default_position")]
    pub position: Vec2,
    /// Facing in radians; defaults to facing the middle of the battlefield.
    #[serde(default)]
    pub bearing: Option<f32>,
    #[serde(default)]
    pub orders: Option<OrdersDescription>,
}

/// Opening orders. Targets refer to units by their index in the scenario.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrdersDescription {
    pub path: Vec<Vec2>,
    pub facing: Option<f32>,
    pub running: bool,
    pub hold_fire: bool,
    pub charge: Option<usize>,
    pub shoot_at: Option<usize>,
}

fn default_commander_kind() -> CommanderType {
    CommanderType::Script
}

fn default_strength() -> usize {
    40
}

fn default_position() -> Vec2 {
    Vec2::new(512.0, 512.0)
}

/// Parse a scenario and build the battle it describes.
pub fn load_scenario(json: &str) -> Result<BattleSimulator, ScenarioError> {
    let description: ScenarioDescription = serde_json::from_str(json)?;
    build_scenario(&description)
}

/// Build a battle from an already parsed scenario.
pub fn build_scenario(description: &ScenarioDescription) -> Result<BattleSimulator, ScenarioError> {
    let mut sim = match &description.terrain {
        Some(terrain) => BattleSimulator::with_ground(description.config.clone(), Box::new(terrain.build()?)),
        None => BattleSimulator::new(description.config.clone()),
    };

    for c in &description.commanders {
        sim.add_commander(&c.player_id, c.team, c.kind);
        if let Some(position) = c.position {
            sim.set_team_position(c.team, position);
        }
    }

    if let Some(deployment) = &description.deployment {
        for zone in &deployment.zones {
            sim.set_deployment_zone(zone.team, zone.center, zone.radius);
        }
        sim.enable_deployment_zones(deployment.timer);
    }

    let mut ids: Vec<UnitId> = Vec::with_capacity(description.units.len());
    for (index, unit) in description.units.iter().enumerate() {
        let (commander, team) = sim
            .commander_by_player(&unit.commander)
            .map(|c| (c.id, c.team))
            .ok_or_else(|| ScenarioError::UnknownCommander(unit.commander.clone()))?;
        let class: UnitClass = unit
            .class
            .parse()
            .map_err(|source| ScenarioError::UnitClass { index, source })?;

        let position = if sim.is_deployment() {
            sim.constrain_deployment_zone(team, unit.position, 0.0)
        } else {
            unit.position
        };
        let stats = UnitStats::for_class(class);
        let id = match unit.bearing {
            Some(bearing) => sim.add_unit_with_facing(commander, &unit.class, unit.strength, stats, position, bearing),
            None => sim.add_unit(commander, &unit.class, unit.strength, stats, position),
        };
        ids.push(id.ok_or(ScenarioError::EmptyUnit(index))?);
    }

    for (index, unit) in description.units.iter().enumerate() {
        let Some(orders) = &unit.orders else {
            continue;
        };
        let target = |t: Option<usize>| match t {
            Some(i) => ids.get(i).copied().map(Some).ok_or(ScenarioError::UnknownUnit(index)),
            None => Ok(None),
        };
        let facing = orders
            .facing
            .or_else(|| sim.unit_state(ids[index]).map(|s| s.direction))
            .unwrap_or_default();
        let command = UnitCommand {
            path: orders.path.clone(),
            facing,
            running: orders.running,
            melee_target: target(orders.charge)?,
            missile_target: target(orders.shoot_at)?,
            missile_target_locked: false,
            hold_fire: orders.hold_fire,
        };
        debug!(unit = %ids[index], "opening orders");
        sim.set_unit_command(ids[index], command, 0.0);
    }

    info!(
        commanders = description.commanders.len(),
        units = ids.len(),
        deployment = sim.is_deployment(),
        "scenario loaded"
    );
    Ok(sim)
}
