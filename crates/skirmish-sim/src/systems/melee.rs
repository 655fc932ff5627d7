//! Melee resolution: finished strikes, broken pairs, and new pairings.

use hecs::{Entity, World};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use skirmish_core::constants::{MELEE_BREAK_FACTOR, MELEE_MAX_WIN_CHANCE, MELEE_MIN_WIN_CHANCE};
use skirmish_core::enums::ReadyState;
use skirmish_core::stats::UnitStats;

use crate::components::*;
use crate::spatial::SpatialIndex;

/// Resolve finished strikes, break stale pairs, then pair idle fighters.
pub fn resolve_melee_combat(world: &mut World, units: &[Entity], spatial: &SpatialIndex, rng: &mut ChaCha8Rng) {
    resolve_strikes(world, units, rng);
    break_pairs(world, units);
    pair_fighters(world, units, spatial);
}

/// Chance that a fighter with training `own` beats one with training `other`.
pub fn win_chance(own: f32, other: f32) -> f32 {
    (0.5 + (own - other) * 0.5).clamp(MELEE_MIN_WIN_CHANCE, MELEE_MAX_WIN_CHANCE)
}

fn training(world: &World, fighter_entity: Entity) -> Option<(f32, i32)> {
    let unit = fighter(world, fighter_entity)?.unit;
    let training = world.get::<&UnitStats>(unit).ok()?.training_level;
    Some((training, unit_team(world, unit)?))
}

fn set_strike_completed(world: &World, fighter: Entity, value: bool) {
    if let Ok(mut state) = world.get::<&mut FighterState>(fighter) {
        state.strike_completed = value;
    }
}

/// Each completed exchange kills exactly one of the pair.
fn resolve_strikes(world: &World, units: &[Entity], rng: &mut ChaCha8Rng) {
    for &unit in units {
        for striker in roster_fighters(world, unit) {
            let Some(state) = fighter_state(world, striker) else {
                continue;
            };
            if !state.strike_completed {
                continue;
            }
            set_strike_completed(world, striker, false);

            let Some(opponent) = state.opponent else {
                continue;
            };
            if !is_alive(world, striker) || !is_alive(world, opponent) {
                continue;
            }
            if fighter_state(world, opponent).and_then(|s| s.opponent) != Some(striker) {
                continue;
            }
            // One resolution per exchange
            set_strike_completed(world, opponent, false);

            let (Some((own, own_team)), Some((other, other_team))) =
                (training(world, striker), training(world, opponent))
            else {
                continue;
            };
            let (loser, winner_team) = if rng.gen::<f32>() < win_chance(own, other) {
                (opponent, own_team)
            } else {
                (striker, other_team)
            };

            if let Ok(mut f) = world.get::<&mut Fighter>(loser) {
                f.casualty = true;
                f.killed_by = Some(winner_team);
            }
            trace!(?loser, winner_team, "melee kill");
        }
    }
}

fn break_pairs(world: &World, units: &[Entity]) {
    let mut broken: Vec<(Entity, Entity)> = Vec::new();

    for &unit in units {
        let routing = is_unit_routing(world, unit);
        let Ok(reach) = world.get::<&UnitStats>(unit).map(|s| s.weapon_reach) else {
            continue;
        };
        for f in roster_fighters(world, unit) {
            let Some(state) = fighter_state(world, f) else {
                continue;
            };
            let Some(opponent) = state.opponent else {
                continue;
            };

            // A pair holds at the longer of the two weapons' reach
            let partner = fighter(world, opponent);
            let partner_reach = partner
                .and_then(|o| world.get::<&UnitStats>(o.unit).ok().map(|s| s.weapon_reach))
                .unwrap_or(reach);
            let keep = !routing
                && is_alive(world, f)
                && partner.is_some_and(|o| !o.casualty && !is_unit_routing(world, o.unit))
                && fighter_state(world, opponent).is_some_and(|o| {
                    o.position.distance(state.position) <= reach.max(partner_reach) * MELEE_BREAK_FACTOR
                });
            if !keep {
                broken.push((f, opponent));
            }
        }
    }

    for (f, opponent) in broken {
        if let Ok(mut state) = world.get::<&mut FighterState>(f) {
            if state.opponent == Some(opponent) {
                state.clear_opponent();
            }
        }
        if let Ok(mut state) = world.get::<&mut FighterState>(opponent) {
            if state.opponent == Some(f) {
                state.clear_opponent();
            }
        }
    }
}

/// Pair every idle fighter of a steady unit with the nearest idle enemy in reach.
fn pair_fighters(world: &World, units: &[Entity], spatial: &SpatialIndex) {
    for &unit in units {
        if is_unit_routing(world, unit) {
            continue;
        }
        let Some(team) = unit_team(world, unit) else {
            continue;
        };
        let Ok(reach) = world.get::<&UnitStats>(unit).map(|s| s.weapon_reach) else {
            continue;
        };

        for f in roster_fighters(world, unit) {
            if !is_alive(world, f) {
                continue;
            }
            let Some(state) = fighter_state(world, f) else {
                continue;
            };
            if state.opponent.is_some() || state.ready_state != ReadyState::Unready {
                continue;
            }

            // The index is built before routing is published, so check the unit again
            let found = spatial.combat.find_nearest(state.position, reach, |e| {
                e.team != team
                    && is_alive(world, e.fighter)
                    && !is_unit_routing(world, e.unit)
                    && fighter_state(world, e.fighter).is_some_and(|s| s.opponent.is_none())
            });
            let Some(enemy) = found else {
                continue;
            };

            start_readying(world, f, enemy.fighter);
            start_readying(world, enemy.fighter, f);
        }
    }
}

/// Pair `f` with `opponent`; an unready fighter starts readying at once.
fn start_readying(world: &World, f: Entity, opponent: Entity) {
    let readying_duration = fighter(world, f)
        .and_then(|info| world.get::<&UnitStats>(info.unit).ok().map(|s| s.readying_duration))
        .unwrap_or_default();
    if let Ok(mut s) = world.get::<&mut FighterState>(f) {
        s.opponent = Some(opponent);
        if s.ready_state == ReadyState::Unready {
            s.ready_state = ReadyState::Readying;
            s.ready_timer = readying_duration;
        }
    }
}

/// Fighters of mounted (or foot) units currently paired in melee.
pub fn count_in_melee(world: &World, units: &[Entity], mounted: bool) -> usize {
    units
        .iter()
        .filter(|&&unit| {
            world
                .get::<&UnitStats>(unit)
                .is_ok_and(|s| s.platform.is_mounted() == mounted)
        })
        .flat_map(|&unit| roster_fighters(world, unit))
        .filter(|&f| fighter_state(world, f).is_some_and(|s| s.is_in_melee()))
        .count()
}
