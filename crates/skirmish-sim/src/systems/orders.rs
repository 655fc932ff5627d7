//! Command delivery: sanitizing issued commands and promoting pending ones.

use std::collections::HashMap;

use hecs::{Entity, World};
use tracing::debug;

use skirmish_core::commands::UnitCommand;
use skirmish_core::constants::TIMER_EPSILON;
use skirmish_core::types::{Bounds2, UnitId};
use skirmish_terrain::GroundMap;

use crate::components::{unit_team, Orders, UnitInfo, UnitState};
use crate::deployment::Deployment;
use crate::path::{truncate_at_impassable, update_movement_path};

/// Promote pending commands whose issue delay has elapsed.
pub fn run(world: &mut World, units: &[Entity], dt: f32) {
    for &unit in units {
        let Ok(mut orders) = world.get::<&mut Orders>(unit) else {
            continue;
        };
        let due = match orders.pending.as_mut() {
            Some(pending) => {
                pending.delay -= dt;
                pending.delay <= TIMER_EPSILON
            }
            None => false,
        };
        if due {
            if let Some(pending) = orders.pending.take() {
                orders.command = pending.command;
            }
        }
    }
}

/// Make an externally supplied command safe to execute.
///
/// Path points are clamped to the battlefield, cut short at impassable
/// ground, pulled into the deployment zone while deploying, and re-spaced.
/// Targets that are unknown, the unit itself, or on the same team are dropped.
pub fn sanitize_command<G: GroundMap + ?Sized>(
    world: &World,
    ground: &G,
    deployment: &Deployment,
    lookup: &HashMap<UnitId, Entity>,
    unit: Entity,
    mut command: UnitCommand,
) -> UnitCommand {
    let Ok(info) = world.get::<&UnitInfo>(unit) else {
        return command;
    };
    let Ok(state) = world.get::<&UnitState>(unit) else {
        return command;
    };

    if !command.path.is_empty() {
        let battlefield = Bounds2::battlefield();
        for point in command.path.iter_mut() {
            *point = battlefield.clamp(*point);
            if deployment.is_enabled() {
                *point = deployment.constrain(info.team, *point, 0.0);
            }
        }
        if truncate_at_impassable(ground, state.center, &mut command.path) {
            debug!(unit = %info.id, "path truncated at impassable ground");
        }
        if let Some(destination) = command.destination() {
            update_movement_path(&mut command.path, state.center, destination);
        }
    }

    let valid_target = |target: UnitId| {
        target != info.id
            && lookup
                .get(&target)
                .and_then(|&e| unit_team(world, e))
                .is_some_and(|team| team != info.team)
    };
    if let Some(target) = command.melee_target {
        if !valid_target(target) {
            debug!(unit = %info.id, %target, "melee target rejected");
            command.melee_target = None;
        }
    }
    if let Some(target) = command.missile_target {
        if !valid_target(target) {
            debug!(unit = %info.id, %target, "missile target rejected");
            command.missile_target = None;
            command.missile_target_locked = false;
        }
    }

    command
}
