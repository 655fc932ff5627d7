//! Missile combat: volleys in flight, impact resolution, and triggering new volleys.

use std::collections::HashMap;

use glam::Vec2;
use hecs::{Entity, World};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use skirmish_core::constants::{FRIENDLY_FIRE_RADIUS, HIT_RADIUS, MISSILE_SPREAD, TIMER_EPSILON};
use skirmish_core::enums::UnitMode;
use skirmish_core::events::BattleEvent;
use skirmish_core::shooting::{Projectile, Shooting};
use skirmish_core::stats::UnitStats;
use skirmish_core::types::UnitId;

use crate::components::*;
use crate::spatial::SpatialIndex;

/// A volley waiting for release or in the air.
#[derive(Debug, Clone)]
pub struct ShootingInFlight {
    pub shooting: Shooting,
    /// Seconds until release.
    pub release_timer: f32,
    pub released: bool,
    /// Seconds since release.
    pub elapsed: f32,
    resolved: Vec<bool>,
}

impl ShootingInFlight {
    pub fn new(shooting: Shooting, delay: f32) -> Self {
        let resolved = vec![false; shooting.projectiles.len()];
        Self {
            shooting,
            release_timer: delay,
            released: false,
            elapsed: 0.0,
            resolved,
        }
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved.iter().filter(|r| **r).count()
    }

    /// Released and every projectile has landed.
    pub fn is_finished(&self) -> bool {
        self.released && self.resolved.iter().all(|r| *r)
    }
}

/// Queue a volley and report it to observers.
pub fn schedule_shooting(
    shootings: &mut Vec<ShootingInFlight>,
    events: &mut Vec<BattleEvent>,
    shooting: Shooting,
    delay: f32,
) {
    trace!(unit = ?shooting.unit, projectiles = shooting.projectiles.len(), delay, "shooting scheduled");
    events.push(BattleEvent::Shooting {
        shooting: shooting.clone(),
        delay,
    });
    shootings.push(ShootingInFlight::new(shooting, delay.max(0.0)));
}

/// Advance volleys in flight, then let every ready missile unit fire.
#[allow(clippy::too_many_arguments)]
pub fn resolve_missile_combat(
    world: &mut World,
    units: &[Entity],
    lookup: &HashMap<UnitId, Entity>,
    spatial: &SpatialIndex,
    rng: &mut ChaCha8Rng,
    shootings: &mut Vec<ShootingInFlight>,
    events: &mut Vec<BattleEvent>,
    dt: f32,
) {
    for flight in shootings.iter_mut() {
        if !flight.released {
            flight.release_timer -= dt;
            if flight.release_timer <= TIMER_EPSILON {
                flight.released = true;
                events.push(BattleEvent::Release {
                    shooting: flight.shooting.clone(),
                });
            }
            continue;
        }

        flight.elapsed += dt;
        for (index, projectile) in flight.shooting.projectiles.iter().enumerate() {
            if flight.resolved[index] {
                continue;
            }
            if flight.elapsed + TIMER_EPSILON >= flight.shooting.impact_time(projectile) {
                flight.resolved[index] = true;
                resolve_projectile(world, spatial, rng, &flight.shooting, projectile);
            }
        }
    }

    for &unit in units {
        let Some(shooting) = trigger_shooting(world, lookup, units, spatial, rng, unit) else {
            continue;
        };
        if let Ok(mut state) = world.get::<&mut UnitState>(unit) {
            state.loading_timer = state.loading_duration;
            state.shooting_counter += 1;
        }
        schedule_shooting(shootings, events, shooting, 0.0);
    }
}

/// Roll one projectile: a hit kills the nearest enemy fighter near the impact point.
fn resolve_projectile(
    world: &World,
    spatial: &SpatialIndex,
    rng: &mut ChaCha8Rng,
    shooting: &Shooting,
    projectile: &Projectile,
) {
    let chance = shooting.hit_probability(projectile.origin.distance(projectile.destination));
    if rng.gen::<f32>() >= chance {
        return;
    }

    let victim = spatial
        .fighters
        .find_nearest(projectile.destination, HIT_RADIUS, |e| {
            e.team != shooting.team && is_alive(world, e.fighter)
        });
    match victim {
        Some(entry) => {
            if let Ok(mut f) = world.get::<&mut Fighter>(entry.fighter) {
                f.casualty = true;
                f.killed_by = Some(shooting.team);
            }
            trace!(fighter = ?entry.fighter, team = shooting.team, "missile hit");
        }
        None => trace!(destination = %projectile.destination, "missile landed on empty ground"),
    }
}

/// Target is in the fire arc and range, visible, and clear of friendly fighters.
pub fn is_within_line_of_fire(
    spatial: &SpatialIndex,
    range: &UnitRange,
    unit: Entity,
    team: i32,
    position: Vec2,
) -> bool {
    range.is_within_range(position)
        && !spatial
            .fighters
            .any_within(position, FRIENDLY_FIRE_RADIUS, |e| e.team == team && e.unit != unit)
}

fn choose_target(
    world: &World,
    lookup: &HashMap<UnitId, Entity>,
    units: &[Entity],
    spatial: &SpatialIndex,
    unit: Entity,
    team: i32,
    range: &UnitRange,
) -> Option<Entity> {
    let command = world.get::<&Orders>(unit).ok()?.command.clone();

    if let Some(&target) = command.missile_target.and_then(|id| lookup.get(&id)) {
        if let Some(state) = unit_state(world, target) {
            if is_within_line_of_fire(spatial, range, unit, team, state.center) {
                return Some(target);
            }
        }
        if command.missile_target_locked {
            return None;
        }
    }

    let mut best: Option<(f32, Entity)> = None;
    for &other in units {
        if unit_team(world, other).map_or(true, |t| t == team) {
            continue;
        }
        let Some(state) = unit_state(world, other) else {
            continue;
        };
        if roster_fighters(world, other).is_empty() {
            continue;
        }
        let distance = state.center.distance(range.center);
        if best.is_some_and(|(d, _)| d <= distance) {
            continue;
        }
        if is_within_line_of_fire(spatial, range, unit, team, state.center) {
            best = Some((distance, other));
        }
    }
    best.map(|(_, e)| e)
}

/// Build a volley for `unit` if it is ready to fire and has a target.
fn trigger_shooting(
    world: &World,
    lookup: &HashMap<UnitId, Entity>,
    units: &[Entity],
    spatial: &SpatialIndex,
    rng: &mut ChaCha8Rng,
    unit: Entity,
) -> Option<Shooting> {
    let stats = (*world.get::<&UnitStats>(unit).ok()?).clone();
    let missile_type = stats.weapon.missile_type()?;
    if !stats.is_missile_unit() {
        return None;
    }
    let state = unit_state(world, unit)?;
    if state.unit_mode != UnitMode::Standing || state.is_routing() || state.loading_timer > 0.0 {
        return None;
    }
    if world.get::<&Orders>(unit).ok()?.command.hold_fire {
        return None;
    }
    let (id, team) = {
        let info = world.get::<&UnitInfo>(unit).ok()?;
        (info.id, info.team)
    };
    let range = (*world.get::<&UnitRange>(unit).ok()?).clone();

    let target = choose_target(world, lookup, units, spatial, unit, team, &range)?;
    let aim_points: Vec<Vec2> = roster_fighters(world, target)
        .into_iter()
        .filter(|&f| is_alive(world, f))
        .filter_map(|f| fighter_state(world, f).map(|s| s.position))
        .collect();
    if aim_points.is_empty() {
        return None;
    }

    let mut shooting = Shooting::new(Some(id), team, missile_type, stats.fire_accuracy, stats.maximum_range);
    for shooter in roster_fighters(world, unit) {
        if !is_alive(world, shooter) {
            continue;
        }
        let Some(fs) = fighter_state(world, shooter) else {
            continue;
        };
        if fs.is_in_melee() {
            continue;
        }

        let aim = aim_points[rng.gen_range(0..aim_points.len())];
        let fraction = (fs.position.distance(aim) / stats.maximum_range).min(1.0);
        let jitter = Vec2::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0));
        let destination = aim + jitter * fraction * MISSILE_SPREAD;
        shooting
            .projectiles
            .push(Projectile::new(fs.position, destination, missile_type));
    }

    if shooting.projectiles.is_empty() {
        None
    } else {
        Some(shooting)
    }
}

/// Drop volleys whose projectiles have all landed.
pub fn remove_finished_shootings(shootings: &mut Vec<ShootingInFlight>) {
    shootings.retain(|s| !s.is_finished());
}
