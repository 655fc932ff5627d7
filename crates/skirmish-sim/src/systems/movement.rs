//! Movement rules: per-unit bookkeeping and the compute pass.
//!
//! `compute_next_state` reads only the current state of every unit and
//! fighter and writes `NextUnitState`/`NextFighterState`. The melee partner
//! of a fighter is copied through unchanged.

use std::collections::HashMap;

use glam::Vec2;
use hecs::{Entity, World};

use skirmish_core::commands::UnitCommand;
use skirmish_core::constants::*;
use skirmish_core::enums::{ReadyState, UnitMode};
use skirmish_core::stats::UnitStats;
use skirmish_core::types::{angle_difference, angle_of, normalize_angle, Bounds2, UnitId};
use skirmish_terrain::GroundMap;

use crate::components::*;
use crate::formation::swap_fighters;
use crate::spatial::SpatialIndex;

/// Per-unit bookkeeping before the compute pass.
///
/// Reshuffles ranks on the swap timer, consumes reached path points, keeps a
/// charge pointed at the live enemy, and forgets targets that left the battle.
pub fn advance_time(world: &mut World, units: &[Entity], lookup: &HashMap<UnitId, Entity>, dt: f32) {
    for &unit in units {
        let Some(state) = unit_state(world, unit) else {
            continue;
        };

        let swap_due = match world.get::<&mut UnitInfo>(unit) {
            Ok(mut info) => {
                info.time_until_swap -= dt;
                let due = info.time_until_swap <= 0.0;
                if due {
                    info.time_until_swap = SWAP_FIGHTERS_INTERVAL;
                }
                due
            }
            Err(_) => false,
        };
        if swap_due {
            reshuffle(world, unit, &state);
        }

        let Ok(mut orders) = world.get::<&mut Orders>(unit) else {
            continue;
        };
        let command = &mut orders.command;

        let melee_center = command.melee_target.and_then(|id| live_center(world, lookup, id));
        match melee_center {
            Some(center) => command.clear_path_and_set_destination(center),
            None => command.melee_target = None,
        }
        if let Some(id) = command.missile_target {
            if live_center(world, lookup, id).is_none() {
                command.missile_target = None;
                command.missile_target_locked = false;
            }
        }

        if command.melee_target.is_none() {
            while command
                .path
                .first()
                .is_some_and(|p| p.distance(state.center) <= WAYPOINT_TOLERANCE)
            {
                command.path.remove(0);
            }
        }
    }
}

fn live_center(world: &World, lookup: &HashMap<UnitId, Entity>, id: UnitId) -> Option<Vec2> {
    lookup
        .get(&id)
        .and_then(|&e| unit_state(world, e))
        .map(|s| s.center)
}

fn reshuffle(world: &mut World, unit: Entity, state: &UnitState) {
    let dims = match world.get::<&mut Roster>(unit) {
        Ok(mut roster) => {
            swap_fighters(&mut roster);
            (roster.files(), roster.ranks)
        }
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

/// Compute the next state of every unit and fighter from the frozen current state.
pub fn compute_next_state<G: GroundMap + ?Sized>(
    world: &mut World,
    units: &[Entity],
    lookup: &HashMap<UnitId, Entity>,
    spatial: &SpatialIndex,
    ground: &G,
    deploying: bool,
    dt: f32,
) {
    for &unit in units {
        let Some(plan) = plan_unit(world, units, lookup, spatial, unit, deploying, dt) else {
            continue;
        };
        let fighters = plan_fighters(world, unit, &plan, ground, dt);

        if let Ok(mut next) = world.get::<&mut NextUnitState>(unit) {
            next.0 = plan.next;
        }
        for (fighter, state) in fighters {
            if let Ok(mut next) = world.get::<&mut NextFighterState>(fighter) {
                next.0 = state;
            }
        }
    }
}

/// Everything the fighters of a unit need from the unit's own next state.
struct UnitPlan {
    next: UnitState,
    stats: UnitStats,
    command: UnitCommand,
    formation: Formation,
    routing: bool,
    /// Direction routing fighters run toward.
    flee: Vec2,
}

fn plan_unit(
    world: &World,
    units: &[Entity],
    lookup: &HashMap<UnitId, Entity>,
    spatial: &SpatialIndex,
    unit: Entity,
    deploying: bool,
    dt: f32,
) -> Option<UnitPlan> {
    let state = unit_state(world, unit)?;
    let (team, initial_fighters) = {
        let info = world.get::<&UnitInfo>(unit).ok()?;
        (info.team, info.initial_fighters)
    };
    let stats = (*world.get::<&UnitStats>(unit).ok()?).clone();
    let command = world.get::<&Orders>(unit).ok()?.command.clone();
    let formation = *world.get::<&Formation>(unit).ok()?;
    let routing = state.is_routing();

    let mut next = state;
    next.recent_casualties = 0;
    next.loading_timer = (state.loading_timer - dt).max(0.0);

    // ---- Morale ----
    if state.recent_casualties > 0 {
        let per_fighter = CASUALTY_MORALE_LOSS * (1.5 - stats.training_level) / initial_fighters.max(1) as f32;
        next.morale -= per_fighter * state.recent_casualties as f32;
    } else if !routing {
        next.morale = (next.morale + MORALE_RECOVERY_RATE * stats.training_level * dt).min(INITIAL_MORALE);
    }
    if routing {
        next.morale -= ROUT_MORALE_DECAY * dt;
    }
    next.influence = influence(world, units, unit, team, state.center);

    // ---- Movement ----
    let mut flee = Vec2::ZERO;
    let mut desired = state.direction;
    let mut moving = false;

    if routing {
        flee = flee_direction(spatial, team, state.center);
        next.center = state.center + flee * stats.running_speed * dt;
        next.waypoint = next.center;
        desired = angle_of(flee);
        moving = true;
    } else {
        let charge = command
            .melee_target
            .and_then(|id| lookup.get(&id))
            .and_then(|&e| Some((unit_state(world, e)?, *world.get::<&Formation>(e).ok()?)));

        let waypoint = if deploying {
            None
        } else if let Some((target, _)) = &charge {
            Some(target.center)
        } else {
            command.path.first().copied()
        };

        match waypoint {
            Some(waypoint) => {
                let stop = charge
                    .as_ref()
                    .map(|(_, target)| (formation.depth() + target.depth()) / 2.0)
                    .unwrap_or(0.0);
                let offset = waypoint - state.center;
                let distance = offset.length();
                if distance > 0.0 {
                    desired = angle_of(offset);
                }
                if distance > stop {
                    let speed = if command.running || charge.is_some() {
                        stats.running_speed
                    } else {
                        stats.walking_speed
                    };
                    let step = (speed * dt).min(distance - stop);
                    next.center = state.center + offset / distance * step;
                    moving = step > 0.0;
                }
                next.waypoint = waypoint;
            }
            None => {
                desired = command
                    .missile_target
                    .and_then(|id| live_center(world, lookup, id))
                    .filter(|c| c.distance(state.center) > 0.0)
                    .map(|c| angle_of(c - state.center))
                    .unwrap_or(command.facing);
                next.waypoint = state.center;
            }
        }
    }

    next.direction = turn_towards(state.direction, desired, UNIT_TURN_RATE * dt);
    next.unit_mode = if moving {
        UnitMode::Moving
    } else if angle_difference(next.direction, desired).abs() > FACING_TOLERANCE {
        UnitMode::Turning
    } else {
        UnitMode::Standing
    };

    let files = formation.files;
    let ranks = formation.ranks;
    Some(UnitPlan {
        formation: Formation::new(next.center, next.direction, &stats, files, ranks),
        next,
        stats,
        command,
        routing,
        flee,
    })
}

/// Rotate `from` toward `to` by at most `max_step` radians.
pub fn turn_towards(from: f32, to: f32, max_step: f32) -> f32 {
    let difference = angle_difference(from, to);
    if difference.abs() <= max_step {
        normalize_angle(to)
    } else {
        normalize_angle(from + max_step.copysign(difference))
    }
}

/// Sum of morale pressure from units within `INFLUENCE_RADIUS`.
fn influence(world: &World, units: &[Entity], unit: Entity, team: i32, center: Vec2) -> f32 {
    let mut total = 0.0;
    for &other in units {
        if other == unit {
            continue;
        }
        let (Some(state), Some(other_team)) = (unit_state(world, other), unit_team(world, other)) else {
            continue;
        };
        if state.center.distance(center) > INFLUENCE_RADIUS {
            continue;
        }
        total += if other_team != team {
            ENEMY_INFLUENCE
        } else if state.is_routing() {
            ROUTING_FRIEND_INFLUENCE
        } else {
            FRIEND_INFLUENCE
        };
    }
    total.clamp(-MAX_INFLUENCE, MAX_INFLUENCE)
}

/// Away from the nearest enemy fighter, else away from the battlefield middle.
fn flee_direction(spatial: &SpatialIndex, team: i32, center: Vec2) -> Vec2 {
    let away_from = spatial
        .fighters
        .find_nearest(center, BATTLEFIELD_SIZE * 2.0, |e| e.team != team)
        .map(|e| e.position)
        .unwrap_or_else(|| Bounds2::battlefield().mid());
    let flee = (center - away_from).normalize_or_zero();
    if flee == Vec2::ZERO {
        Vec2::Y
    } else {
        flee
    }
}

fn plan_fighters<G: GroundMap + ?Sized>(
    world: &World,
    unit: Entity,
    plan: &UnitPlan,
    ground: &G,
    dt: f32,
) -> Vec<(Entity, FighterState)> {
    let placed: Vec<(usize, usize, Entity)> = match world.get::<&Roster>(unit) {
        Ok(roster) => roster.placed().collect(),
        Err(_) => return Vec::new(),
    };

    let mut out = Vec::with_capacity(placed.len());
    for (file, rank, entity) in placed {
        let (Some(current), Some(info)) = (fighter_state(world, entity), fighter(world, entity)) else {
            continue;
        };
        let opponent = current.opponent.and_then(|o| fighter_state(world, o));
        let slot = plan.formation.slot_position(file, rank);
        out.push((entity, next_fighter_state(&current, &info, opponent, slot, plan, ground, dt)));
    }
    out
}

fn next_fighter_state<G: GroundMap + ?Sized>(
    current: &FighterState,
    info: &Fighter,
    opponent: Option<FighterState>,
    slot: Vec2,
    plan: &UnitPlan,
    ground: &G,
    dt: f32,
) -> FighterState {
    let stats = &plan.stats;
    let mut next = *current;

    let (ready_state, ready_timer, strike_completed) = next_ready_state(current, opponent.as_ref(), stats, dt);
    next.ready_state = ready_state;
    next.ready_timer = ready_timer;
    next.strike_completed = strike_completed;

    let destination = if plan.routing {
        current.position + plan.flee * stats.running_speed
    } else if let Some(opponent) = &opponent {
        let distance = current.position.distance(opponent.position);
        if distance > stats.weapon_reach {
            let back = (current.position - opponent.position).normalize_or_zero();
            opponent.position + back * stats.weapon_reach * MELEE_CLOSING_FACTOR
        } else {
            current.position
        }
    } else {
        slot
    };
    next.destination = destination;

    let offset = destination - current.position;
    let distance = offset.length();
    let running = plan.routing || plan.command.running || distance > CATCH_UP_DISTANCE;
    let mut speed = if running {
        stats.running_speed
    } else {
        stats.walking_speed
    };
    if info.terrain.forest {
        speed *= FOREST_SPEED_FACTOR;
    }

    let step = (speed * dt).min(distance);
    let mut position = current.position;
    if step > 0.0 {
        let candidate = current.position + offset / distance * step;
        if !ground.is_impassable(candidate) {
            position = candidate;
        }
    }

    next.velocity = if dt > 0.0 {
        (position - current.position) / dt
    } else {
        Vec2::ZERO
    };
    next.position = position;
    next.position_z = ground.height_at(position);
    next.direction = match &opponent {
        Some(o) if o.position != position => angle_of(o.position - position),
        _ if next.velocity.length_squared() > 1e-6 => angle_of(next.velocity),
        _ => plan.next.direction,
    };

    next
}

/// Melee state machine step for one fighter.
///
/// Returns the new state, its timer, and whether a strike finished this tick.
pub fn next_ready_state(
    current: &FighterState,
    opponent: Option<&FighterState>,
    stats: &UnitStats,
    dt: f32,
) -> (ReadyState, f32, bool) {
    let timer = current.ready_timer - dt;
    match (current.ready_state, opponent) {
        (ReadyState::Stunned, _) => {
            if timer <= TIMER_EPSILON {
                (ReadyState::Unready, 0.0, false)
            } else {
                (ReadyState::Stunned, timer, false)
            }
        }
        (_, None) => (ReadyState::Unready, 0.0, false),
        (ReadyState::Unready, Some(o)) => {
            if current.position.distance(o.position) <= stats.weapon_reach {
                (ReadyState::Readying, stats.readying_duration, false)
            } else {
                (ReadyState::Unready, 0.0, false)
            }
        }
        (ReadyState::Readying, Some(o)) => {
            if timer > TIMER_EPSILON {
                (ReadyState::Readying, timer, false)
            } else if is_ready_to_strike(o, dt) {
                (ReadyState::Striking, stats.striking_duration, false)
            } else {
                (ReadyState::Prepared, 0.0, false)
            }
        }
        (ReadyState::Prepared, Some(o)) => {
            if is_ready_to_strike(o, dt) {
                (ReadyState::Striking, stats.striking_duration, false)
            } else {
                (ReadyState::Prepared, 0.0, false)
            }
        }
        (ReadyState::Striking, Some(_)) => {
            if timer <= TIMER_EPSILON {
                (ReadyState::Stunned, STUNNED_DURATION, true)
            } else {
                (ReadyState::Striking, timer, false)
            }
        }
    }
}

/// Whether the opponent is prepared, already striking, or finishes readying this tick.
fn is_ready_to_strike(opponent: &FighterState, dt: f32) -> bool {
    match opponent.ready_state {
        ReadyState::Prepared | ReadyState::Striking => true,
        ReadyState::Readying => opponent.ready_timer - dt <= TIMER_EPSILON,
        _ => false,
    }
}
