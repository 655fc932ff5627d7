//! ECS components for units and fighters.
//!
//! Dynamic state is double buffered: `UnitState`/`FighterState` hold the
//! current tick, `NextUnitState`/`NextFighterState` receive the compute pass,
//! and the transition pass copies next into current.

use std::f32::consts::TAU;

use glam::Vec2;
use hecs::{Entity, World};

use skirmish_core::commands::UnitCommand;
use skirmish_core::constants::{INITIAL_MORALE, ROUTING_BLINK_THRESHOLD, SWAP_FIGHTERS_INTERVAL};
use skirmish_core::enums::{ReadyState, UnitMode};
use skirmish_core::stats::UnitStats;
use skirmish_core::types::{angle_of, vector_from_angle, CommanderId, UnitId};

// ---- Unit components ----

/// Identity and bookkeeping of a unit entity.
#[derive(Debug, Clone)]
pub struct UnitInfo {
    pub id: UnitId,
    pub commander: CommanderId,
    pub team: i32,
    pub unit_class: String,
    pub initial_fighters: usize,
    /// Placed with `deploy` during the current deployment.
    pub deployed: bool,
    /// Countdown to the next rank/file reshuffle.
    pub time_until_swap: f32,
}

impl UnitInfo {
    pub fn new(id: UnitId, commander: CommanderId, team: i32, unit_class: String, fighters: usize) -> Self {
        Self {
            id,
            commander,
            team,
            unit_class,
            initial_fighters: fighters,
            deployed: false,
            time_until_swap: SWAP_FIGHTERS_INTERVAL,
        }
    }
}

/// Dynamic unit state for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitState {
    /// Formation anchor (middle of the formation).
    pub center: Vec2,
    /// Facing (radians).
    pub direction: f32,
    pub unit_mode: UnitMode,
    /// Point the unit is currently marching toward (its center when idle).
    pub waypoint: Vec2,
    pub morale: f32,
    /// Morale modifier from nearby units.
    pub influence: f32,
    /// Seconds until the next volley can be fired.
    pub loading_timer: f32,
    pub loading_duration: f32,
    /// Volleys fired so far.
    pub shooting_counter: u32,
    /// Fighters lost since the last compute pass.
    pub recent_casualties: u32,
}

impl UnitState {
    pub fn new(center: Vec2, direction: f32, loading_duration: f32) -> Self {
        Self {
            center,
            direction,
            unit_mode: UnitMode::Initializing,
            waypoint: center,
            morale: INITIAL_MORALE,
            influence: 0.0,
            loading_timer: 0.0,
            loading_duration,
            shooting_counter: 0,
            recent_casualties: 0,
        }
    }

    pub fn is_routing(&self) -> bool {
        self.morale + self.influence <= 0.0
    }

    /// Blink period for status displays; 0 while the unit is steady.
    pub fn routing_blink_time(&self) -> f32 {
        let value = self.morale + self.influence;
        if value >= ROUTING_BLINK_THRESHOLD {
            0.0
        } else {
            value.clamp(0.1, ROUTING_BLINK_THRESHOLD)
        }
    }
}

/// Unit state produced by the compute pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NextUnitState(pub UnitState);

/// Slot geometry of a unit, derived from its state and roster.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Formation {
    /// Slot of file 0, rank 0.
    pub front_left: Vec2,
    /// Offset between neighbouring files.
    pub towards_right: Vec2,
    /// Offset between neighbouring ranks.
    pub towards_back: Vec2,
    pub files: usize,
    pub ranks: usize,
}

impl Formation {
    pub fn new(center: Vec2, direction: f32, stats: &UnitStats, files: usize, ranks: usize) -> Self {
        let front = vector_from_angle(direction);
        let towards_right = Vec2::new(front.y, -front.x) * stats.file_distance();
        let towards_back = -front * stats.rank_distance();
        let half_files = files.saturating_sub(1) as f32 / 2.0;
        let half_ranks = ranks.saturating_sub(1) as f32 / 2.0;
        Self {
            front_left: center - towards_right * half_files - towards_back * half_ranks,
            towards_right,
            towards_back,
            files,
            ranks,
        }
    }

    pub fn slot_position(&self, file: usize, rank: usize) -> Vec2 {
        self.front_left + self.towards_right * file as f32 + self.towards_back * rank as f32
    }

    /// Front-to-back extent of the formation (meters).
    pub fn depth(&self) -> f32 {
        self.towards_back.length() * self.ranks.max(1) as f32
    }
}

/// Current command plus a command still on its way to the unit.
#[derive(Debug, Clone, Default)]
pub struct Orders {
    pub command: UnitCommand,
    pub pending: Option<PendingCommand>,
}

#[derive(Debug, Clone)]
pub struct PendingCommand {
    pub command: UnitCommand,
    /// Seconds until the command takes effect.
    pub delay: f32,
}

/// Fire arc of a missile unit with terrain-limited ranges per direction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitRange {
    pub center: Vec2,
    pub angle_start: f32,
    pub angle_length: f32,
    pub minimum_range: f32,
    pub maximum_range: f32,
    /// Visible distance for evenly spaced directions across the arc.
    pub actual_ranges: Vec<f32>,
}

impl UnitRange {
    /// Inside the arc, between the minimum and maximum range, and not hidden by terrain.
    pub fn is_within_range(&self, position: Vec2) -> bool {
        if self.actual_ranges.is_empty() || self.maximum_range <= 0.0 {
            return false;
        }
        let distance = self.center.distance(position);
        if distance < self.minimum_range || distance > self.maximum_range {
            return false;
        }

        let relative = (angle_of(position - self.center) - self.angle_start).rem_euclid(TAU);
        if relative > self.angle_length {
            return false;
        }

        let last = self.actual_ranges.len() - 1;
        let index = if self.angle_length > 0.0 {
            ((relative / self.angle_length) * last as f32).round() as usize
        } else {
            0
        };
        distance <= self.actual_ranges[index.min(last)]
    }
}

/// Fighters of a unit laid out in files of `ranks` slots.
/// Slot index is `file * ranks + rank`; rank 0 is the front.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    pub slots: Vec<Option<Entity>>,
    pub ranks: usize,
}

impl Roster {
    pub fn files(&self) -> usize {
        if self.ranks == 0 {
            0
        } else {
            self.slots.len() / self.ranks
        }
    }

    pub fn slot(&self, file: usize, rank: usize) -> Option<Entity> {
        self.slots.get(file * self.ranks + rank).copied().flatten()
    }

    /// Living fighters in slot order.
    pub fn fighters(&self) -> impl Iterator<Item = Entity> + '_ {
        self.slots.iter().filter_map(|s| *s)
    }

    /// Living fighters with their (file, rank) slot.
    pub fn placed(&self) -> impl Iterator<Item = (usize, usize, Entity)> + '_ {
        let ranks = self.ranks.max(1);
        self.slots
            .iter()
            .enumerate()
            .filter_map(move |(i, s)| s.map(|e| (i / ranks, i % ranks, e)))
    }

    pub fn count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Empty the slot holding `fighter`. Returns false when it was not found.
    pub fn remove(&mut self, fighter: Entity) -> bool {
        match self.slots.iter_mut().find(|s| **s == Some(fighter)) {
            Some(slot) => {
                *slot = None;
                true
            }
            None => false,
        }
    }
}

// ---- Fighter components ----

/// Membership and casualty bookkeeping of a fighter entity.
#[derive(Debug, Clone, Copy)]
pub struct Fighter {
    pub unit: Entity,
    /// Killed this tick; removed by cleanup.
    pub casualty: bool,
    /// Team credited with the kill.
    pub killed_by: Option<i32>,
    pub terrain: TerrainCache,
}

/// Terrain flags sampled at a fighter's position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TerrainCache {
    pub sampled_at: Vec2,
    pub forest: bool,
    pub impassable: bool,
}

/// Dynamic fighter state for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FighterState {
    pub position: Vec2,
    /// Ground height at `position`.
    pub position_z: f32,
    pub ready_state: ReadyState,
    pub ready_timer: f32,
    /// Melee partner. Only the melee resolver and cleanup change this.
    pub opponent: Option<Entity>,
    pub destination: Vec2,
    pub velocity: Vec2,
    /// Facing (radians).
    pub direction: f32,
    /// Finished a strike this tick; the exchange is resolved by the melee resolver.
    pub strike_completed: bool,
}

impl FighterState {
    pub fn new(position: Vec2, position_z: f32, direction: f32) -> Self {
        Self {
            position,
            position_z,
            ready_state: ReadyState::Unready,
            ready_timer: 0.0,
            opponent: None,
            destination: position,
            velocity: Vec2::ZERO,
            direction,
            strike_completed: false,
        }
    }

    pub fn is_in_melee(&self) -> bool {
        self.opponent.is_some()
    }

    /// Drop the melee partner; a stunned fighter keeps recovering.
    pub fn clear_opponent(&mut self) {
        self.opponent = None;
        self.strike_completed = false;
        if self.ready_state != ReadyState::Stunned {
            self.ready_state = ReadyState::Unready;
            self.ready_timer = 0.0;
        }
    }
}

/// Fighter state produced by the compute pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NextFighterState(pub FighterState);

// ---- Copy-out accessors ----
//
// Systems read other entities' components by value so that no borrow is held
// while the same component type is written for another entity.

pub fn unit_state(world: &World, unit: Entity) -> Option<UnitState> {
    world.get::<&UnitState>(unit).ok().map(|s| *s)
}

pub fn unit_team(world: &World, unit: Entity) -> Option<i32> {
    world.get::<&UnitInfo>(unit).ok().map(|i| i.team)
}

pub fn fighter(world: &World, fighter: Entity) -> Option<Fighter> {
    world.get::<&Fighter>(fighter).ok().map(|f| *f)
}

pub fn fighter_state(world: &World, fighter: Entity) -> Option<FighterState> {
    world.get::<&FighterState>(fighter).ok().map(|s| *s)
}

pub fn roster_fighters(world: &World, unit: Entity) -> Vec<Entity> {
    world
        .get::<&Roster>(unit)
        .map(|r| r.fighters().collect())
        .unwrap_or_default()
}

/// Living fighter that is not yet marked as a casualty.
pub fn is_alive(world: &World, fighter: Entity) -> bool {
    world.get::<&Fighter>(fighter).map(|f| !f.casualty).unwrap_or(false)
}

pub fn is_unit_routing(world: &World, unit: Entity) -> bool {
    unit_state(world, unit).map(|s| s.is_routing()).unwrap_or(false)
}
