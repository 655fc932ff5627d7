//! Publish pass: copies every next state into the current state.

use hecs::{Entity, World};
use tracing::debug;

use skirmish_core::constants::TERRAIN_REFRESH_DISTANCE;
use skirmish_core::events::BattleEvent;
use skirmish_core::stats::UnitStats;
use skirmish_terrain::GroundMap;

use crate::components::*;

/// Copy next into current for every unit and fighter, refresh cached terrain
/// flags and formations, and report units that started routing.
pub fn assign_next_state<G: GroundMap + ?Sized>(
    world: &mut World,
    units: &[Entity],
    ground: &G,
    events: &mut Vec<BattleEvent>,
) {
    for &unit in units {
        let Ok(next) = world.get::<&NextUnitState>(unit).map(|n| n.0) else {
            continue;
        };
        let was_routing = match world.get::<&mut UnitState>(unit) {
            Ok(mut state) => {
                let was_routing = state.is_routing();
                *state = next;
                was_routing
            }
            Err(_) => continue,
        };

        if !was_routing && next.is_routing() {
            if let Ok(info) = world.get::<&UnitInfo>(unit) {
                debug!(unit = %info.id, morale = next.morale, "unit routing");
                events.push(BattleEvent::Routing { unit: info.id });
            }
        }

        update_formation(world, unit);

        for fighter in roster_fighters(world, unit) {
            assign_fighter(world, fighter, ground);
        }
    }
}

/// Recompute slot geometry from the current state and roster.
pub fn update_formation(world: &mut World, unit: Entity) {
    let Some(state) = unit_state(world, unit) else {
        return;
    };
    let dims = match world.get::<&Roster>(unit) {
        Ok(roster) => (roster.files(), roster.ranks),
        Err(_) => return,
    };
    let formation = match world.get::<&UnitStats>(unit) {
        Ok(stats) => Formation::new(state.center, state.direction, &stats, dims.0, dims.1),
        Err(_) => return,
    };
    if let Ok(mut f) = world.get::<&mut Formation>(unit) {
        *f = formation;
    }
}

fn assign_fighter<G: GroundMap + ?Sized>(world: &mut World, fighter: Entity, ground: &G) {
    let Ok(next) = world.get::<&NextFighterState>(fighter).map(|n| n.0) else {
        return;
    };
    let Ok(mut state) = world.get::<&mut FighterState>(fighter) else {
        return;
    };
    // Melee and cleanup own the opponent link
    let opponent = state.opponent;
    *state = next;
    state.opponent = opponent;
    drop(state);

    if let Ok(mut info) = world.get::<&mut Fighter>(fighter) {
        refresh_terrain(&mut info.terrain, next.position, ground, false);
    }
}

/// Resample terrain flags once the fighter has moved far enough (or when forced).
pub fn refresh_terrain<G: GroundMap + ?Sized>(
    cache: &mut TerrainCache,
    position: glam::Vec2,
    ground: &G,
    force: bool,
) {
    if force || cache.sampled_at.distance(position) > TERRAIN_REFRESH_DISTANCE {
        *cache = TerrainCache {
            sampled_at: position,
            forest: ground.is_forest(position),
            impassable: ground.is_impassable(position),
        };
    }
}
