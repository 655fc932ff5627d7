//! Simulation engine: the core of the battle.
//!
//! `BattleSimulator` owns the hecs ECS world, accepts commands between ticks,
//! runs all systems at a fixed time step, and produces `BattleSnapshot`s.
//! Completely headless, enabling deterministic testing.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use glam::Vec2;
use hecs::{Entity, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use skirmish_core::commands::UnitCommand;
use skirmish_core::constants::{COMMAND_ISSUE_DELAY, DEPLOYMENT_INSET, DT, TIMER_EPSILON};
use skirmish_core::enums::{CommanderType, ReadyState};
use skirmish_core::events::BattleEvent;
use skirmish_core::shooting::Shooting;
use skirmish_core::state::{BattleSnapshot, UnitStatus};
use skirmish_core::stats::UnitStats;
use skirmish_core::types::{angle_of, Bounds2, CommanderId, SimTime, UnitId};
use skirmish_terrain::{FlatGround, GroundMap};

use crate::commander::Commander;
use crate::components::*;
use crate::deployment::{Deployment, DeploymentZone};
use crate::formation::initial_roster;
use crate::observer::{BattleObserver, ObserverBus, ObserverId};
use crate::spatial::SpatialIndex;
use crate::systems;
use crate::systems::missile::ShootingInFlight;
use crate::systems::transition::refresh_terrain;

/// Configuration for starting a new battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// RNG seed for determinism. Same seed = same battle.
    pub seed: u64,
    /// Seconds per tick.
    pub time_step: f32,
    /// Practice battles never declare a winner.
    pub practice: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            time_step: DT,
            practice: false,
        }
    }
}

/// Read-only view of one fighter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FighterView {
    pub handle: Entity,
    pub position: Vec2,
    pub position_z: f32,
    pub direction: f32,
    pub ready_state: ReadyState,
    pub opponent: Option<Entity>,
}

/// The battle simulator. Owns the ECS world and all battle state.
pub struct BattleSimulator {
    world: World,
    ground: Box<dyn GroundMap>,
    config: SimConfig,
    time: SimTime,
    accumulator: f32,
    rng: ChaCha8Rng,

    // Unit registry, in insertion order.
    ids: Vec<UnitId>,
    entities: Vec<Entity>,
    lookup: HashMap<UnitId, Entity>,
    next_unit_id: u32,

    commanders: Vec<Commander>,
    team_positions: BTreeMap<i32, i32>,
    deployment: Deployment,
    spatial: SpatialIndex,
    shootings: Vec<ShootingInFlight>,
    kills: BTreeMap<i32, u32>,
    winner_team: i32,
    fielded_teams: BTreeSet<i32>,

    observers: ObserverBus,
    events: Vec<BattleEvent>,
    despawn_buffer: Vec<Entity>,
}

impl BattleSimulator {
    /// Create a battle on flat ground.
    pub fn new(config: SimConfig) -> Self {
        Self::with_ground(config, Box::new(FlatGround))
    }

    /// Create a battle on the given ground.
    pub fn with_ground(config: SimConfig, ground: Box<dyn GroundMap>) -> Self {
        let time_step = if config.time_step > 0.0 { config.time_step } else { DT };
        Self {
            world: World::new(),
            ground,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config: SimConfig { time_step, ..config },
            time: SimTime::default(),
            accumulator: 0.0,
            ids: Vec::new(),
            entities: Vec::new(),
            lookup: HashMap::new(),
            next_unit_id: 1,
            commanders: Vec::new(),
            team_positions: BTreeMap::new(),
            deployment: Deployment::default(),
            spatial: SpatialIndex::default(),
            shootings: Vec::new(),
            kills: BTreeMap::new(),
            winner_team: 0,
            fielded_teams: BTreeSet::new(),
            observers: ObserverBus::default(),
            events: Vec::new(),
            despawn_buffer: Vec::new(),
        }
    }

    // ---- Commanders ----

    pub fn add_commander(&mut self, player_id: &str, team: i32, kind: CommanderType) -> CommanderId {
        let id = CommanderId(self.commanders.len() as u32 + 1);
        self.commanders.push(Commander {
            id,
            player_id: player_id.to_string(),
            team,
            kind,
        });
        debug!(?id, player_id, team, ?kind, "commander added");
        id
    }

    pub fn commander(&self, id: CommanderId) -> Option<&Commander> {
        self.commanders.iter().find(|c| c.id == id)
    }

    /// The first commander registered under `player_id`.
    pub fn commander_by_player(&self, player_id: &str) -> Option<&Commander> {
        self.commanders.iter().find(|c| c.player_id == player_id)
    }

    pub fn commanders(&self) -> &[Commander] {
        &self.commanders
    }

    /// Record which map edge a team starts from.
    pub fn set_team_position(&mut self, team: i32, position: i32) {
        self.team_positions.insert(team, position);
    }

    pub fn team_position(&self, team: i32) -> Option<i32> {
        self.team_positions.get(&team).copied()
    }

    // ---- Units ----

    /// Add a unit facing the middle of the battlefield.
    /// Returns None for an unknown commander or zero fighters.
    pub fn add_unit(
        &mut self,
        commander: CommanderId,
        unit_class: &str,
        fighter_count: usize,
        stats: UnitStats,
        position: Vec2,
    ) -> Option<UnitId> {
        let offset = Bounds2::battlefield().mid() - position;
        let facing = if offset.length_squared() > 0.0 { angle_of(offset) } else { 0.0 };
        self.add_unit_with_facing(commander, unit_class, fighter_count, stats, position, facing)
    }

    /// Add a unit with an explicit facing (radians).
    pub fn add_unit_with_facing(
        &mut self,
        commander: CommanderId,
        unit_class: &str,
        fighter_count: usize,
        stats: UnitStats,
        position: Vec2,
        facing: f32,
    ) -> Option<UnitId> {
        if fighter_count == 0 {
            debug!(unit_class, "unit with no fighters ignored");
            return None;
        }
        let team = self.commander(commander)?.team;
        let position = Bounds2::battlefield().clamp(position);

        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;

        let state = UnitState::new(position, facing, stats.loading_duration());
        let unit = self.world.spawn((
            UnitInfo::new(id, commander, team, unit_class.to_string(), fighter_count),
            state,
            NextUnitState(state),
            Orders {
                command: UnitCommand::hold(facing),
                pending: None,
            },
            UnitRange::default(),
        ));

        let mut fighters = Vec::with_capacity(fighter_count);
        for _ in 0..fighter_count {
            let fs = FighterState::new(position, self.ground.height_at(position), facing);
            fighters.push(self.world.spawn((
                Fighter {
                    unit,
                    casualty: false,
                    killed_by: None,
                    terrain: TerrainCache::default(),
                },
                fs,
                NextFighterState(fs),
            )));
        }
        let roster = initial_roster(fighters, stats.ranks);
        let formation = Formation::new(position, facing, &stats, roster.files(), roster.ranks);
        let _ = self.world.insert(unit, (stats, formation, roster));
        self.place_fighters(unit);

        self.ids.push(id);
        self.entities.push(unit);
        self.lookup.insert(id, unit);
        self.fielded_teams.insert(team);

        debug!(unit = %id, team, unit_class, fighters = fighter_count, "unit added");
        self.events.push(BattleEvent::AddUnit {
            unit: id,
            team,
            unit_class: unit_class.to_string(),
            fighters: fighter_count,
            position,
        });
        self.flush_events();
        Some(id)
    }

    /// Remove a unit and all its fighters. Unknown ids are ignored.
    pub fn remove_unit(&mut self, id: UnitId) {
        if let Some(&unit) = self.lookup.get(&id) {
            self.drop_unit(unit);
        }
        self.flush_events();
    }

    /// Issue a command that takes effect after `issue_delay` seconds.
    pub fn set_unit_command(&mut self, id: UnitId, command: UnitCommand, issue_delay: f32) {
        let Some(&unit) = self.lookup.get(&id) else {
            debug!(unit = %id, "command for unknown unit ignored");
            return;
        };
        let command = systems::orders::sanitize_command(
            &self.world,
            &*self.ground,
            &self.deployment,
            &self.lookup,
            unit,
            command,
        );

        self.events.push(BattleEvent::Command {
            unit: id,
            command: command.clone(),
            delay: issue_delay,
        });
        if let Ok(mut orders) = self.world.get::<&mut Orders>(unit) {
            if issue_delay <= TIMER_EPSILON {
                orders.command = command;
                orders.pending = None;
            } else {
                orders.pending = Some(PendingCommand {
                    command,
                    delay: issue_delay,
                });
            }
        }
        self.flush_events();
    }

    /// Standard delay for a command to reach its unit.
    pub fn timer_delay(&self) -> f32 {
        COMMAND_ISSUE_DELAY
    }

    /// Schedule an externally created volley.
    pub fn add_shooting(&mut self, shooting: Shooting, delay: f32) {
        systems::missile::schedule_shooting(&mut self.shootings, &mut self.events, shooting, delay);
        self.flush_events();
    }

    pub fn set_practice(&mut self, practice: bool) {
        self.config.practice = practice;
    }

    pub fn is_practice(&self) -> bool {
        self.config.practice
    }

    // ---- Deployment ----

    /// Start the deployment phase. With a timer it ends after that many seconds;
    /// it also ends once every fielded team has deployed all its units.
    pub fn enable_deployment_zones(&mut self, timer: Option<f32>) {
        self.deployment.enable(timer);
        debug!(?timer, "deployment enabled");
    }

    pub fn is_deployment(&self) -> bool {
        self.deployment.is_enabled()
    }

    pub fn set_deployment_zone(&mut self, team: i32, center: Vec2, radius: f32) {
        self.deployment.set_zone(team, center, radius);
    }

    pub fn deployment_zone(&self, team: i32) -> Option<DeploymentZone> {
        self.deployment.zone(team)
    }

    pub fn is_deployment_zone(&self, team: i32, position: Vec2) -> bool {
        self.deployment.is_deployment_zone(team, position)
    }

    pub fn constrain_deployment_zone(&self, team: i32, position: Vec2, inset: f32) -> Vec2 {
        self.deployment.constrain(team, position, inset)
    }

    /// Place a unit inside its team's zone. Only possible while deploying.
    pub fn deploy(&mut self, id: UnitId, position: Vec2, facing: f32) -> bool {
        if !self.deployment.is_enabled() {
            return false;
        }
        let Some(&unit) = self.lookup.get(&id) else {
            return false;
        };
        let Some(team) = unit_team(&self.world, unit) else {
            return false;
        };
        let center = self.deployment.constrain(team, position, DEPLOYMENT_INSET);

        if let Ok(mut state) = self.world.get::<&mut UnitState>(unit) {
            state.center = center;
            state.direction = facing;
            state.waypoint = center;
        }
        if let Ok(mut orders) = self.world.get::<&mut Orders>(unit) {
            orders.command = UnitCommand::hold(facing);
            orders.pending = None;
        }
        if let Ok(mut info) = self.world.get::<&mut UnitInfo>(unit) {
            info.deployed = true;
        }
        systems::transition::update_formation(&mut self.world, unit);
        self.place_fighters(unit);
        debug!(unit = %id, %center, "unit deployed");
        true
    }

    /// Every unit of `team` has been placed with `deploy`.
    pub fn has_completed_deployment(&self, team: i32) -> bool {
        let mut any = false;
        for &unit in &self.entities {
            let Ok(info) = self.world.get::<&UnitInfo>(unit) else {
                continue;
            };
            if info.team == team {
                if !info.deployed {
                    return false;
                }
                any = true;
            }
        }
        any
    }

    // ---- Queries ----

    /// Unit ids in insertion order.
    pub fn units(&self) -> &[UnitId] {
        &self.ids
    }

    pub fn unit_state(&self, id: UnitId) -> Option<UnitState> {
        unit_state(&self.world, self.entity(id)?)
    }

    pub fn unit_stats(&self, id: UnitId) -> Option<UnitStats> {
        let unit = self.entity(id)?;
        let stats = self.world.get::<&UnitStats>(unit).ok()?;
        Some((*stats).clone())
    }

    pub fn unit_command(&self, id: UnitId) -> Option<UnitCommand> {
        let unit = self.entity(id)?;
        let orders = self.world.get::<&Orders>(unit).ok()?;
        Some(orders.command.clone())
    }

    pub fn unit_range(&self, id: UnitId) -> Option<UnitRange> {
        let unit = self.entity(id)?;
        let range = self.world.get::<&UnitRange>(unit).ok()?;
        Some((*range).clone())
    }

    pub fn unit_formation(&self, id: UnitId) -> Option<Formation> {
        let unit = self.entity(id)?;
        self.world.get::<&Formation>(unit).ok().map(|f| *f)
    }

    pub fn fighters_count(&self, id: UnitId) -> Option<usize> {
        let unit = self.entity(id)?;
        self.world.get::<&Roster>(unit).ok().map(|r| r.count())
    }

    /// Fighters of a unit in slot order.
    pub fn fighters(&self, id: UnitId) -> Vec<FighterView> {
        let Some(unit) = self.entity(id) else {
            return Vec::new();
        };
        roster_fighters(&self.world, unit)
            .into_iter()
            .filter_map(|handle| {
                let s = fighter_state(&self.world, handle)?;
                Some(FighterView {
                    handle,
                    position: s.position,
                    position_z: s.position_z,
                    direction: s.direction,
                    ready_state: s.ready_state,
                    opponent: s.opponent,
                })
            })
            .collect()
    }

    pub fn unit_status(&self, id: UnitId) -> Option<UnitStatus> {
        systems::snapshot::unit_status(&self.world, self.entity(id)?)
    }

    pub fn team_of(&self, id: UnitId) -> Option<i32> {
        unit_team(&self.world, self.entity(id)?)
    }

    /// Fighters killed by `team`.
    pub fn kills(&self, team: i32) -> u32 {
        self.kills.get(&team).copied().unwrap_or(0)
    }

    /// Winning team, or 0 while undecided.
    pub fn winner_team(&self) -> i32 {
        self.winner_team
    }

    pub fn count_cavalry_in_melee(&self) -> usize {
        systems::melee::count_in_melee(&self.world, &self.entities, true)
    }

    pub fn count_infantry_in_melee(&self) -> usize {
        systems::melee::count_in_melee(&self.world, &self.entities, false)
    }

    pub fn shootings_in_flight(&self) -> usize {
        self.shootings.len()
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Get a read-only reference to the ECS world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world access (for tests that need to force a state).
    #[cfg(test)]
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// ECS entity of a unit (for tests).
    #[cfg(test)]
    pub fn entity_of(&self, id: UnitId) -> Option<Entity> {
        self.entity(id)
    }

    pub fn snapshot(&self) -> BattleSnapshot {
        systems::snapshot::build_snapshot(
            &self.world,
            &self.entities,
            &self.time,
            self.shootings.len(),
            &self.kills,
            self.winner_team,
            self.deployment.is_enabled(),
        )
    }

    // ---- Observers ----

    pub fn add_observer(&mut self, observer: Box<dyn BattleObserver>) -> ObserverId {
        self.observers.add(observer)
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> Option<Box<dyn BattleObserver>> {
        self.observers.remove(id)
    }

    // ---- Time ----

    /// Add `elapsed` seconds and run every whole tick they cover.
    /// Returns the number of ticks run.
    pub fn advance_time(&mut self, elapsed: f32) -> u32 {
        if elapsed.is_finite() && elapsed > 0.0 {
            self.accumulator += elapsed;
        }
        let step = self.config.time_step;
        let mut ticks = 0;
        while self.accumulator + TIMER_EPSILON >= step {
            self.accumulator = (self.accumulator - step).max(0.0);
            self.simulate_one_time_step();
            ticks += 1;
        }
        ticks
    }

    /// Run exactly one tick.
    pub fn simulate_one_time_step(&mut self) {
        let dt = self.config.time_step;

        // 1. Pending commands
        systems::orders::run(&mut self.world, &self.entities, dt);
        // 2. Deployment timer
        self.update_deployment(dt);
        // 3. Per-unit bookkeeping (reshuffles, path points, live targets)
        systems::movement::advance_time(&mut self.world, &self.entities, &self.lookup, dt);
        // 4. Spatial index rebuild
        self.spatial.rebuild(&self.world, &self.entities);
        // 5. Compute next state from the frozen current state
        systems::movement::compute_next_state(
            &mut self.world,
            &self.entities,
            &self.lookup,
            &self.spatial,
            &*self.ground,
            self.deployment.is_enabled(),
            dt,
        );
        // 6. Publish next state
        systems::transition::assign_next_state(&mut self.world, &self.entities, &*self.ground, &mut self.events);
        // 7. Fire arcs
        systems::range::update_unit_range(&mut self.world, &self.entities, &*self.ground);
        // 8. Melee
        systems::melee::resolve_melee_combat(&mut self.world, &self.entities, &self.spatial, &mut self.rng);
        // 9. Missiles
        systems::missile::resolve_missile_combat(
            &mut self.world,
            &self.entities,
            &self.lookup,
            &self.spatial,
            &mut self.rng,
            &mut self.shootings,
            &mut self.events,
            dt,
        );
        // 10. Casualties
        systems::cleanup::remove_casualties(
            &mut self.world,
            &self.entities,
            &mut self.kills,
            &mut self.events,
            &mut self.despawn_buffer,
        );
        // 11. Destroyed and routed-away units
        for unit in systems::cleanup::find_dead_units(&self.world, &self.entities) {
            self.drop_unit(unit);
        }
        // 12. Finished volleys
        systems::missile::remove_finished_shootings(&mut self.shootings);
        // 13. Battle end
        self.evaluate_winner();

        self.time.advance(dt);
        self.flush_events();
    }

    // ---- Internals ----

    fn entity(&self, id: UnitId) -> Option<Entity> {
        self.lookup.get(&id).copied()
    }

    /// Teleport every fighter of `unit` onto its slot.
    fn place_fighters(&mut self, unit: Entity) {
        let Ok(formation) = self.world.get::<&Formation>(unit).map(|f| *f) else {
            return;
        };
        let Some(direction) = unit_state(&self.world, unit).map(|s| s.direction) else {
            return;
        };
        let placed: Vec<_> = match self.world.get::<&Roster>(unit) {
            Ok(roster) => roster.placed().collect(),
            Err(_) => return,
        };
        for (file, rank, f) in placed {
            let position = formation.slot_position(file, rank);
            let state = FighterState::new(position, self.ground.height_at(position), direction);
            if let Ok(mut s) = self.world.get::<&mut FighterState>(f) {
                *s = FighterState {
                    opponent: s.opponent,
                    ..state
                };
            }
            if let Ok(mut next) = self.world.get::<&mut NextFighterState>(f) {
                next.0 = state;
            }
            if let Ok(mut info) = self.world.get::<&mut Fighter>(f) {
                refresh_terrain(&mut info.terrain, position, &*self.ground, true);
            }
        }
    }

    /// Despawn a unit, drop it from the registry, and report it.
    fn drop_unit(&mut self, unit: Entity) {
        let Some(id) = systems::cleanup::despawn_unit(&mut self.world, unit, &mut self.despawn_buffer) else {
            return;
        };
        if let Some(index) = self.entities.iter().position(|&e| e == unit) {
            self.entities.remove(index);
            self.ids.remove(index);
        }
        self.lookup.remove(&id);
        self.events.push(BattleEvent::RemoveUnit { unit: id });
    }

    fn update_deployment(&mut self, dt: f32) {
        if !self.deployment.is_enabled() {
            return;
        }
        let expired = self.deployment.tick(dt);
        let completed = !self.fielded_teams.is_empty()
            && self
                .fielded_teams
                .iter()
                .all(|&team| self.has_completed_deployment(team));
        if expired || completed {
            self.deployment.disable();
            debug!(expired, completed, "deployment finished");
        }
    }

    /// Declare the only team that has not abandoned the battle the winner.
    fn evaluate_winner(&mut self) {
        if self.winner_team != 0
            || self.config.practice
            || self.deployment.is_enabled()
            || self.fielded_teams.len() < 2
        {
            return;
        }

        let standing: BTreeSet<i32> = self
            .entities
            .iter()
            .filter(|&&unit| !is_unit_routing(&self.world, unit))
            .filter_map(|&unit| unit_team(&self.world, unit))
            .collect();
        let abandoned = self.fielded_teams.iter().filter(|t| !standing.contains(t)).count();
        if abandoned == 0 {
            return;
        }

        // Simultaneous collapse leaves the battle undecided
        if standing.len() == 1 {
            if let Some(&team) = standing.first() {
                self.winner_team = team;
                info!(team, tick = self.time.tick, "battle won");
            }
        }
    }

    fn flush_events(&mut self) {
        for event in self.events.drain(..) {
            self.observers.notify(&event);
        }
    }
}
