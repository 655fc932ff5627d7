//! Cleanup system: removes casualties and units that left the battle.

use std::collections::BTreeMap;

use hecs::{Entity, World};
use tracing::{debug, trace};

use skirmish_core::constants::ROUT_REMOVAL_MORALE;
use skirmish_core::events::{BattleEvent, Casualty};
use skirmish_core::stats::UnitStats;
use skirmish_core::types::{Bounds2, UnitId};

use crate::components::*;

/// Take casualties out of their rosters, credit kills, and despawn them.
/// Uses a pre-allocated buffer to avoid per-tick allocation.
pub fn remove_casualties(
    world: &mut World,
    units: &[Entity],
    kills: &mut BTreeMap<i32, u32>,
    events: &mut Vec<BattleEvent>,
    despawn_buffer: &mut Vec<Entity>,
) {
    despawn_buffer.clear();

    for &unit in units {
        let (id, team) = match world.get::<&UnitInfo>(unit) {
            Ok(info) => (info.id, info.team),
            Err(_) => continue,
        };
        let Ok(platform) = world.get::<&UnitStats>(unit).map(|s| s.platform) else {
            continue;
        };

        let mut lost = 0;
        for f in roster_fighters(world, unit) {
            let Some(info) = fighter(world, f) else {
                continue;
            };
            if !info.casualty {
                continue;
            }
            let position = fighter_state(world, f).map(|s| s.position).unwrap_or_default();

            release_opponent(world, f);
            if let Ok(mut roster) = world.get::<&mut Roster>(unit) {
                roster.remove(f);
            }
            if let Some(killer) = info.killed_by {
                *kills.entry(killer).or_insert(0) += 1;
            }
            trace!(unit = %id, ?f, "casualty");
            events.push(BattleEvent::Casualty(Casualty {
                unit: id,
                team,
                platform,
                position,
            }));
            despawn_buffer.push(f);
            lost += 1;
        }

        if lost > 0 {
            if let Ok(mut state) = world.get::<&mut UnitState>(unit) {
                state.recent_casualties += lost;
            }
        }
    }

    for entity in despawn_buffer.drain(..) {
        let _ = world.despawn(entity);
    }
}

/// Clear the melee partner of `fighter`, if it still points back.
fn release_opponent(world: &World, fighter: Entity) {
    let Some(opponent) = fighter_state(world, fighter).and_then(|s| s.opponent) else {
        return;
    };
    if let Ok(mut state) = world.get::<&mut FighterState>(opponent) {
        if state.opponent == Some(fighter) {
            state.clear_opponent();
        }
    }
    if let Ok(mut state) = world.get::<&mut FighterState>(fighter) {
        state.opponent = None;
    }
}

/// Units that are out of the battle: no fighters left, or routed past the
/// removal threshold, or routed off the battlefield.
pub fn find_dead_units(world: &World, units: &[Entity]) -> Vec<Entity> {
    let battlefield = Bounds2::battlefield();
    units
        .iter()
        .copied()
        .filter(|&unit| {
            let empty = world.get::<&Roster>(unit).map(|r| r.count() == 0).unwrap_or(true);
            let gone = unit_state(world, unit).is_some_and(|s| {
                s.is_routing() && (s.morale <= ROUT_REMOVAL_MORALE || !battlefield.contains(s.center))
            });
            empty || gone
        })
        .collect()
}

/// Despawn a unit and its remaining fighters. Fighters leaving this way are
/// not casualties and credit no kills.
pub fn despawn_unit(world: &mut World, unit: Entity, despawn_buffer: &mut Vec<Entity>) -> Option<UnitId> {
    let id = world.get::<&UnitInfo>(unit).ok()?.id;

    despawn_buffer.clear();
    for f in roster_fighters(world, unit) {
        release_opponent(world, f);
        despawn_buffer.push(f);
    }
    for entity in despawn_buffer.drain(..) {
        let _ = world.despawn(entity);
    }
    let _ = world.despawn(unit);

    debug!(unit = %id, "unit removed");
    Some(id)
}
