//! Snapshot system: queries the ECS world and builds a complete BattleSnapshot.
//!
//! This system is read-only; it never modifies the world.

use std::collections::BTreeMap;

use hecs::{Entity, World};

use skirmish_core::enums::{UnitActivity, UnitMode};
use skirmish_core::state::{BattleSnapshot, UnitStatus};
use skirmish_core::stats::UnitStats;
use skirmish_core::types::SimTime;

use crate::components::*;

/// Build a complete BattleSnapshot from the current world state.
pub fn build_snapshot(
    world: &World,
    units: &[Entity],
    time: &SimTime,
    shootings_in_flight: usize,
    kills: &BTreeMap<i32, u32>,
    winner_team: i32,
    deployment: bool,
) -> BattleSnapshot {
    BattleSnapshot {
        time: *time,
        units: units.iter().filter_map(|&u| unit_status(world, u)).collect(),
        shootings_in_flight,
        kills: kills.clone(),
        winner_team,
        deployment,
    }
}

/// Status summary of one unit.
pub fn unit_status(world: &World, unit: Entity) -> Option<UnitStatus> {
    let info = world.get::<&UnitInfo>(unit).ok()?;
    let state = unit_state(world, unit)?;
    let strength = world.get::<&Roster>(unit).ok()?.count();

    Some(UnitStatus {
        unit: info.id,
        team: info.team,
        unit_class: info.unit_class.clone(),
        position: state.center,
        heading: state.direction,
        activity: activity(world, unit, &state),
        strength,
        morale: state.morale + state.influence,
        routing_blink_time: state.routing_blink_time(),
    })
}

/// What the unit is doing, most urgent first.
pub fn activity(world: &World, unit: Entity, state: &UnitState) -> UnitActivity {
    if state.is_routing() {
        return UnitActivity::Routing;
    }
    let fighting = roster_fighters(world, unit)
        .into_iter()
        .any(|f| fighter_state(world, f).is_some_and(|s| s.is_in_melee()));
    if fighting {
        return UnitActivity::Fighting;
    }

    let moving = state.unit_mode == UnitMode::Moving;
    let missile = world.get::<&UnitStats>(unit).is_ok_and(|s| s.is_missile_unit());
    if missile && !moving && state.loading_timer > 0.0 {
        return UnitActivity::Shooting;
    }

    let Ok(orders) = world.get::<&Orders>(unit) else {
        return UnitActivity::Standing;
    };
    match (moving, orders.command.melee_target.is_some(), orders.command.running) {
        (false, _, _) => UnitActivity::Standing,
        (true, true, _) => UnitActivity::Charging,
        (true, false, true) => UnitActivity::Running,
        (true, false, false) => UnitActivity::Walking,
    }
}
