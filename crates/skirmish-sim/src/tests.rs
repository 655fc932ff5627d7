//! Tests for the battle simulator, the tick pipeline, deployment, and observers.

use std::f32::consts::PI;

use glam::Vec2;

use skirmish_core::commands::UnitCommand;
use skirmish_core::constants::DT;
use skirmish_core::enums::*;
use skirmish_core::events::BattleEvent;
use skirmish_core::stats::UnitStats;
use skirmish_core::types::{CommanderId, UnitId};
use skirmish_terrain::GroundMap;

use crate::components::UnitState;
use crate::engine::{BattleSimulator, SimConfig};
use crate::observer::EventLog;

fn battle(seed: u64) -> (BattleSimulator, CommanderId, CommanderId) {
    let mut sim = BattleSimulator::new(SimConfig {
        seed,
        ..Default::default()
    });
    let red = sim.add_commander("red", 1, CommanderType::Player);
    let blue = sim.add_commander("blue", 2, CommanderType::Script);
    (sim, red, blue)
}

fn stats(class: &str) -> UnitStats {
    UnitStats::for_class(class.parse().unwrap())
}

fn observe(sim: &mut BattleSimulator) -> EventLog {
    let log = EventLog::new();
    sim.add_observer(Box::new(log.clone()));
    log
}

/// Hand-made ground: forest everywhere, or a band of impassable or raised ground.
enum TestGround {
    Woods,
    Wall { from: f32, to: f32 },
    Ridge { from: f32, to: f32, height: f32 },
}

impl GroundMap for TestGround {
    fn is_impassable(&self, position: Vec2) -> bool {
        matches!(*self, TestGround::Wall { from, to } if position.x >= from && position.x <= to)
    }

    fn is_forest(&self, _position: Vec2) -> bool {
        matches!(self, TestGround::Woods)
    }

    fn calculate_height(&self, x: f32, _y: f32) -> f32 {
        match *self {
            TestGround::Ridge { from, to, height } if x >= from && x <= to => height,
            _ => 0.0,
        }
    }
}

fn battle_on(ground: TestGround) -> (BattleSimulator, CommanderId, CommanderId) {
    let mut sim = BattleSimulator::with_ground(SimConfig::default(), Box::new(ground));
    let red = sim.add_commander("red", 1, CommanderType::Player);
    let blue = sim.add_commander("blue", 2, CommanderType::Script);
    (sim, red, blue)
}

fn volleys(log: &EventLog) -> usize {
    log.count(|e| matches!(e, BattleEvent::Shooting { .. }))
}

/// Two one-fighter units half a reach apart.
fn duel() -> (BattleSimulator, UnitId, UnitId) {
    let (mut sim, red, blue) = battle(7);
    let s = UnitStats::default();
    let a = sim
        .add_unit_with_facing(red, "ASH-YARI", 1, s.clone(), Vec2::new(512.0, 512.0), 0.0)
        .unwrap();
    let b = sim
        .add_unit_with_facing(blue, "ASH-YARI", 1, s.clone(), Vec2::new(512.0 + s.weapon_reach / 2.0, 512.0), PI)
        .unwrap();
    (sim, a, b)
}

/// Red yari charging a blue katana unit, with blue archers behind it.
fn skirmish(seed: u64) -> BattleSimulator {
    let (mut sim, red, blue) = battle(seed);
    let a = sim
        .add_unit_with_facing(red, "ASH-YARI", 24, stats("ASH-YARI"), Vec2::new(480.0, 512.0), 0.0)
        .unwrap();
    let b = sim
        .add_unit_with_facing(blue, "SAM-KATA", 16, stats("SAM-KATA"), Vec2::new(530.0, 512.0), PI)
        .unwrap();
    sim.add_unit_with_facing(blue, "ASH-BOW", 12, stats("ASH-BOW"), Vec2::new(640.0, 600.0), PI)
        .unwrap();
    sim.set_unit_command(
        a,
        UnitCommand {
            melee_target: Some(b),
            facing: 0.0,
            running: true,
            ..Default::default()
        },
        0.0,
    );
    sim
}

// ---- Determinism ----

#[test]
fn test_determinism_same_seed() {
    let mut sim_a = skirmish(12345);
    let mut sim_b = skirmish(12345);

    for _ in 0..300 {
        sim_a.advance_time(DT);
        sim_b.advance_time(DT);

        let json_a = serde_json::to_string(&sim_a.snapshot()).unwrap();
        let json_b = serde_json::to_string(&sim_b.snapshot()).unwrap();
        assert_eq!(json_a, json_b, "Snapshots diverged with same seed");
    }
}

#[test]
fn test_charge_reaches_melee() {
    let mut sim = skirmish(3);
    let mut engaged = false;
    for _ in 0..(15 * 15) {
        sim.advance_time(DT);
        if sim.count_infantry_in_melee() > 0 {
            engaged = true;
            break;
        }
    }
    assert!(engaged, "Charging unit never made contact");
    assert_eq!(sim.count_cavalry_in_melee(), 0);
}

// ---- Time stepping ----

#[test]
fn test_half_steps_make_one_tick() {
    let (mut sim, _, _) = battle(1);
    assert_eq!(sim.advance_time(DT / 2.0), 0);
    assert_eq!(sim.time().tick, 0);
    assert_eq!(sim.advance_time(DT / 2.0), 1);
    assert_eq!(sim.time().tick, 1);
}

#[test]
fn test_advance_time_runs_whole_ticks() {
    let (mut sim, _, _) = battle(1);
    assert_eq!(sim.advance_time(DT * 3.5), 3);
    assert_eq!(sim.advance_time(DT * 0.5), 1);
    assert_eq!(sim.advance_time(0.0), 0);
    assert_eq!(sim.advance_time(-1.0), 0);
    assert_eq!(sim.time().tick, 4);
}

// ---- Units ----

#[test]
fn test_add_unit_validation() {
    let (mut sim, red, _) = battle(1);
    assert!(sim.add_unit(red, "ASH-YARI", 0, stats("ASH-YARI"), Vec2::splat(300.0)).is_none());
    assert!(sim
        .add_unit(CommanderId(99), "ASH-YARI", 10, stats("ASH-YARI"), Vec2::splat(300.0))
        .is_none());

    let a = sim.add_unit(red, "ASH-YARI", 10, stats("ASH-YARI"), Vec2::splat(300.0)).unwrap();
    let b = sim.add_unit(red, "ASH-BOW", 10, stats("ASH-BOW"), Vec2::splat(320.0)).unwrap();
    assert_eq!(sim.units(), &[a, b]);
    assert!(b > a);
    assert_eq!(sim.fighters_count(a), Some(10));
    assert_eq!(sim.fighters(a).len(), 10);
    assert_eq!(sim.team_of(b), Some(1));
    assert_eq!(sim.unit_stats(b).unwrap().weapon, UnitWeapon::Bow);
}

#[test]
fn test_add_unit_faces_battlefield_middle() {
    let (mut sim, red, _) = battle(1);
    let id = sim.add_unit(red, "ASH-YARI", 8, stats("ASH-YARI"), Vec2::new(100.0, 512.0)).unwrap();
    let state = sim.unit_state(id).unwrap();
    assert!(state.direction.abs() < 1e-5, "Expected to face +x, got {}", state.direction);
}

#[test]
fn test_fighters_start_on_their_slots() {
    let (mut sim, red, _) = battle(1);
    let id = sim
        .add_unit_with_facing(red, "ASH-YARI", 12, stats("ASH-YARI"), Vec2::new(300.0, 300.0), 0.0)
        .unwrap();
    let mean = sim.fighters(id).iter().map(|f| f.position).sum::<Vec2>() / 12.0;
    assert!(mean.distance(Vec2::new(300.0, 300.0)) < 1e-3);
}

#[test]
fn test_empty_path_keeps_center() {
    let (mut sim, red, _) = battle(1);
    let id = sim.add_unit(red, "ASH-YARI", 16, stats("ASH-YARI"), Vec2::new(300.0, 300.0)).unwrap();
    let before = sim.unit_state(id).unwrap().center;
    sim.advance_time(DT);
    let after = sim.unit_state(id).unwrap();
    assert_eq!(after.center, before);
    assert_eq!(after.unit_mode, UnitMode::Standing);
}

#[test]
fn test_remove_unknown_unit_is_noop() {
    let (mut sim, red, _) = battle(1);
    sim.add_unit(red, "ASH-YARI", 4, stats("ASH-YARI"), Vec2::splat(300.0));
    sim.remove_unit(UnitId(999));
    assert_eq!(sim.units().len(), 1);
    assert!(sim.unit_state(UnitId(999)).is_none());
    assert!(sim.fighters(UnitId(999)).is_empty());
}

#[test]
fn test_forest_halves_fighter_speed() {
    let run_one_second = |mut sim: BattleSimulator, red: CommanderId| {
        let id = sim
            .add_unit_with_facing(red, "ASH-YARI", 1, stats("ASH-YARI"), Vec2::new(500.0, 512.0), 0.0)
            .unwrap();
        let start = sim.fighters(id)[0].position.x;
        sim.set_unit_command(id, UnitCommand::move_to(Vec2::new(700.0, 512.0), 0.0, true), 0.0);
        sim.advance_time(1.0);
        sim.fighters(id)[0].position.x - start
    };

    let (sim, red, _) = battle(1);
    let open = run_one_second(sim, red);
    let (sim, red, _) = battle_on(TestGround::Woods);
    let woods = run_one_second(sim, red);

    assert!((open - 8.0).abs() < 0.3, "open ground covered {open}");
    let ratio = woods / open;
    assert!((ratio - 0.5).abs() < 0.05, "forest ratio was {ratio}");
}

#[test]
fn test_fighters_never_step_onto_impassable_ground() {
    let (mut sim, red, _) = battle_on(TestGround::Wall { from: 560.0, to: 580.0 });
    let id = sim
        .add_unit_with_facing(red, "ASH-YARI", 12, stats("ASH-YARI"), Vec2::new(500.0, 512.0), 0.0)
        .unwrap();
    sim.set_unit_command(id, UnitCommand::move_to(Vec2::new(700.0, 512.0), 0.0, true), 0.0);

    for _ in 0..120 {
        sim.advance_time(DT);
        for f in sim.fighters(id) {
            assert!(f.position.x < 560.0, "fighter entered the wall at {}", f.position);
        }
    }
    assert!(sim.unit_state(id).unwrap().center.x > 540.0);
}

// ---- Commands ----

#[test]
fn test_command_issue_delay() {
    let (mut sim, red, _) = battle(1);
    let log = observe(&mut sim);
    let id = sim
        .add_unit_with_facing(red, "ASH-YARI", 8, stats("ASH-YARI"), Vec2::new(300.0, 512.0), 0.0)
        .unwrap();
    assert_eq!(sim.timer_delay(), 0.25);

    sim.set_unit_command(id, UnitCommand::move_to(Vec2::new(400.0, 512.0), 0.0, false), 0.5);
    assert_eq!(log.count(|e| matches!(e, BattleEvent::Command { delay, .. } if *delay == 0.5)), 1);

    sim.advance_time(0.3);
    assert!(sim.unit_command(id).unwrap().path.is_empty());
    assert_eq!(sim.unit_state(id).unwrap().center, Vec2::new(300.0, 512.0));

    sim.advance_time(1.0);
    assert_eq!(sim.unit_command(id).unwrap().destination(), Some(Vec2::new(400.0, 512.0)));
    assert!(sim.unit_state(id).unwrap().center.x > 300.0);
    assert_eq!(sim.unit_status(id).unwrap().activity, UnitActivity::Walking);
}

#[test]
fn test_march_speed() {
    let (mut sim, red, _) = battle(1);
    let s = stats("ASH-YARI");
    let id = sim
        .add_unit_with_facing(red, "ASH-YARI", 8, s.clone(), Vec2::new(300.0, 512.0), 0.0)
        .unwrap();
    sim.set_unit_command(id, UnitCommand::move_to(Vec2::new(400.0, 512.0), 0.0, true), 0.0);
    sim.advance_time(1.0);
    let moved = sim.unit_state(id).unwrap().center.x - 300.0;
    assert!((moved - s.running_speed).abs() < 0.5, "moved {moved}");
    assert_eq!(sim.unit_status(id).unwrap().activity, UnitActivity::Running);
}

#[test]
fn test_command_drops_friendly_target() {
    let (mut sim, red, _) = battle(1);
    let a = sim.add_unit(red, "ASH-YARI", 8, stats("ASH-YARI"), Vec2::splat(300.0)).unwrap();
    let b = sim.add_unit(red, "ASH-BOW", 8, stats("ASH-BOW"), Vec2::splat(320.0)).unwrap();
    sim.set_unit_command(
        a,
        UnitCommand {
            melee_target: Some(b),
            missile_target: Some(a),
            ..Default::default()
        },
        0.0,
    );
    let command = sim.unit_command(a).unwrap();
    assert_eq!(command.melee_target, None);
    assert_eq!(command.missile_target, None);
}

#[test]
fn test_command_clamps_destination_to_battlefield() {
    let (mut sim, red, _) = battle(1);
    let id = sim.add_unit(red, "ASH-YARI", 8, stats("ASH-YARI"), Vec2::splat(1000.0)).unwrap();
    sim.set_unit_command(id, UnitCommand::move_to(Vec2::new(2000.0, 1000.0), 0.0, false), 0.0);
    let destination = sim.unit_command(id).unwrap().destination().unwrap();
    assert!(destination.x <= 1024.0);
}

// ---- Melee ----

#[test]
fn test_duel_kills_exactly_one() {
    let (mut sim, a, b) = duel();
    let log = observe(&mut sim);
    let s = UnitStats::default();

    sim.advance_time(DT);
    assert_eq!(sim.count_infantry_in_melee(), 2);
    assert_eq!(sim.unit_status(a).unwrap().activity, UnitActivity::Fighting);
    assert_eq!(sim.fighters(a)[0].ready_state, ReadyState::Readying);

    // Paired on the first tick, so the exchange ends one tick after R + S
    sim.advance_time(s.readying_duration + s.striking_duration - 2.0 * DT);
    assert_eq!(log.count(|e| matches!(e, BattleEvent::Casualty(_))), 0);
    sim.advance_time(2.0 * DT);

    assert_eq!(log.count(|e| matches!(e, BattleEvent::Casualty(_))), 1);
    assert_eq!(log.count(|e| matches!(e, BattleEvent::RemoveUnit { .. })), 1);
    let survivors: Vec<UnitId> = [a, b]
        .into_iter()
        .filter(|&id| sim.fighters_count(id).is_some())
        .collect();
    assert_eq!(survivors.len(), 1);

    let winner = sim.team_of(survivors[0]).unwrap();
    assert_eq!(sim.kills(winner), 1);
    assert_eq!(sim.kills(3 - winner), 0);
    assert_eq!(sim.winner_team(), winner);
}

#[test]
fn test_routing_unit_is_not_paired() {
    let (mut sim, a, b) = duel();
    // The enemy's presence tips b into routing during the first tick
    let entity = sim.entity_of(b).unwrap();
    sim.world_mut().get::<&mut UnitState>(entity).unwrap().morale = 0.02;

    sim.advance_time(DT);
    assert!(sim.unit_state(b).unwrap().is_routing());
    assert_eq!(sim.fighters_count(b), Some(1));
    assert_eq!(sim.fighters(a)[0].opponent, None);
    assert_eq!(sim.fighters(b)[0].opponent, None);
    assert_eq!(sim.count_infantry_in_melee(), 0);

    sim.advance_time(DT);
    assert_eq!(sim.fighters(a)[0].opponent, None);
}

#[test]
fn test_pairing_is_mutual() {
    let (mut sim, a, b) = duel();
    sim.advance_time(DT);
    let fa = sim.fighters(a)[0];
    let fb = sim.fighters(b)[0];
    assert_eq!(fa.opponent, Some(fb.handle));
    assert_eq!(fb.opponent, Some(fa.handle));
}

#[test]
fn test_remove_unit_releases_opponents() {
    let (mut sim, a, b) = duel();
    let log = observe(&mut sim);
    sim.advance_time(DT);
    sim.remove_unit(b);
    assert_eq!(sim.fighters(a)[0].opponent, None);
    assert_eq!(log.count(|e| matches!(e, BattleEvent::RemoveUnit { unit } if *unit == b)), 1);
    // Removal is not a casualty
    assert_eq!(log.count(|e| matches!(e, BattleEvent::Casualty(_))), 0);
    assert_eq!(sim.kills(1), 0);
}

// ---- Missiles ----

#[test]
fn test_volley_one_projectile_per_shooter() {
    let (mut sim, red, blue) = battle(1);
    let log = observe(&mut sim);
    let bow = sim
        .add_unit_with_facing(red, "ASH-BOW", 8, stats("ASH-BOW"), Vec2::new(400.0, 512.0), 0.0)
        .unwrap();
    sim.add_unit_with_facing(blue, "ASH-YARI", 8, stats("ASH-YARI"), Vec2::new(500.0, 512.0), PI)
        .unwrap();

    sim.advance_time(DT);

    let volleys: Vec<_> = log
        .events()
        .into_iter()
        .filter_map(|e| match e {
            BattleEvent::Shooting { shooting, .. } => Some(shooting),
            _ => None,
        })
        .collect();
    assert_eq!(volleys.len(), 1);
    assert_eq!(volleys[0].unit, Some(bow));
    assert_eq!(volleys[0].projectiles.len(), 8);
    assert_eq!(sim.shootings_in_flight(), 1);

    let state = sim.unit_state(bow).unwrap();
    assert_eq!(state.shooting_counter, 1);
    assert!(state.loading_timer > 0.0);
    assert_eq!(sim.unit_status(bow).unwrap().activity, UnitActivity::Shooting);
}

#[test]
fn test_volley_lands_and_is_removed() {
    let (mut sim, red, blue) = battle(1);
    let log = observe(&mut sim);
    let bow = sim
        .add_unit_with_facing(red, "ASH-BOW", 8, stats("ASH-BOW"), Vec2::new(400.0, 512.0), 0.0)
        .unwrap();
    sim.add_unit_with_facing(blue, "ASH-YARI", 8, stats("ASH-YARI"), Vec2::new(500.0, 512.0), PI)
        .unwrap();

    sim.advance_time(DT);
    sim.set_unit_command(
        bow,
        UnitCommand {
            hold_fire: true,
            ..UnitCommand::hold(0.0)
        },
        0.0,
    );
    sim.advance_time(4.0);

    assert_eq!(log.count(|e| matches!(e, BattleEvent::Shooting { .. })), 1);
    assert_eq!(log.count(|e| matches!(e, BattleEvent::Release { .. })), 1);
    assert_eq!(sim.shootings_in_flight(), 0);
}

#[test]
fn test_no_volley_out_of_range() {
    let (mut sim, red, blue) = battle(1);
    let log = observe(&mut sim);
    sim.add_unit_with_facing(red, "ASH-BOW", 8, stats("ASH-BOW"), Vec2::new(200.0, 512.0), 0.0)
        .unwrap();
    sim.add_unit_with_facing(blue, "ASH-YARI", 8, stats("ASH-YARI"), Vec2::new(800.0, 512.0), PI)
        .unwrap();
    sim.advance_time(1.0);
    assert_eq!(log.count(|e| matches!(e, BattleEvent::Shooting { .. })), 0);
}

#[test]
fn test_no_volley_behind_the_arc() {
    let (mut sim, red, blue) = battle(1);
    let log = observe(&mut sim);
    // Facing away from the enemy; holding the facing keeps it turned away
    sim.add_unit_with_facing(red, "ASH-BOW", 8, stats("ASH-BOW"), Vec2::new(400.0, 512.0), PI)
        .unwrap();
    sim.add_unit_with_facing(blue, "ASH-YARI", 8, stats("ASH-YARI"), Vec2::new(500.0, 512.0), PI)
        .unwrap();
    sim.advance_time(1.0);
    assert_eq!(log.count(|e| matches!(e, BattleEvent::Shooting { .. })), 0);
}

#[test]
fn test_external_shooting_released_after_delay() {
    use skirmish_core::shooting::{Projectile, Shooting};

    let (mut sim, _, _) = battle(1);
    let log = observe(&mut sim);
    let mut shooting = Shooting::new(None, 1, MissileType::Bullet, 0.5, 110.0);
    shooting.projectiles.push(Projectile::new(
        Vec2::new(100.0, 100.0),
        Vec2::new(150.0, 100.0),
        MissileType::Bullet,
    ));
    sim.add_shooting(shooting, 0.5);
    assert_eq!(log.count(|e| matches!(e, BattleEvent::Shooting { .. })), 1);

    sim.advance_time(0.3);
    assert_eq!(log.count(|e| matches!(e, BattleEvent::Release { .. })), 0);
    sim.advance_time(1.0);
    assert_eq!(log.count(|e| matches!(e, BattleEvent::Release { .. })), 1);
    assert_eq!(sim.shootings_in_flight(), 0);
}

#[test]
fn test_no_volley_with_friends_near_the_target() {
    let (mut sim, red, blue) = battle(1);
    let log = observe(&mut sim);
    sim.add_unit_with_facing(red, "ASH-BOW", 8, stats("ASH-BOW"), Vec2::new(400.0, 512.0), 0.0)
        .unwrap();
    sim.add_unit_with_facing(blue, "ASH-YARI", 8, stats("ASH-YARI"), Vec2::new(500.0, 512.0), PI)
        .unwrap();
    // Friendly infantry right beside the only target
    sim.add_unit_with_facing(red, "ASH-YARI", 8, stats("ASH-YARI"), Vec2::new(500.0, 524.0), 0.0)
        .unwrap();

    sim.advance_time(0.5);
    assert_eq!(volleys(&log), 0);
}

#[test]
fn test_no_volley_at_target_behind_a_ridge() {
    let (mut sim, red, blue) = battle_on(TestGround::Ridge {
        from: 440.0,
        to: 450.0,
        height: 10.0,
    });
    let log = observe(&mut sim);
    let bow = sim
        .add_unit_with_facing(red, "ASH-BOW", 8, stats("ASH-BOW"), Vec2::new(400.0, 512.0), 0.0)
        .unwrap();
    sim.add_unit_with_facing(blue, "ASH-YARI", 8, stats("ASH-YARI"), Vec2::new(500.0, 512.0), PI)
        .unwrap();

    sim.advance_time(1.0);
    assert_eq!(volleys(&log), 0);
    let range = sim.unit_range(bow).unwrap();
    assert!(!range.is_within_range(Vec2::new(500.0, 512.0)));
    assert!(range.is_within_range(Vec2::new(430.0, 512.0)));
}

/// Certain-hit arrows from 30 m aimed at `targets`, released after `delay`.
fn arrows_at(targets: &[Vec2], delay: f32, sim: &mut BattleSimulator) {
    use skirmish_core::shooting::{Projectile, Shooting};

    let mut shooting = Shooting::new(None, 1, MissileType::Arrow, 1.0, 150.0);
    for &target in targets {
        let origin = target - Vec2::new(30.0, 0.0);
        shooting.projectiles.push(Projectile::new(origin, target, MissileType::Arrow));
    }
    sim.add_shooting(shooting, delay);
}

#[test]
fn test_arrows_at_a_standing_target_kill() {
    let (mut sim, _, blue) = battle(1);
    let log = observe(&mut sim);
    let target = sim
        .add_unit_with_facing(blue, "ASH-YARI", 8, stats("ASH-YARI"), Vec2::new(500.0, 512.0), PI)
        .unwrap();
    let aim: Vec<Vec2> = sim.fighters(target).iter().map(|f| f.position).collect();
    arrows_at(&aim, 0.2, &mut sim);

    sim.advance_time(3.0);
    assert!(log.count(|e| matches!(e, BattleEvent::Casualty(_))) > 0);
    assert_eq!(sim.shootings_in_flight(), 0);
}

#[test]
fn test_arrows_miss_a_target_that_left() {
    let (mut sim, _, blue) = battle(1);
    let log = observe(&mut sim);
    let target = sim
        .add_unit_with_facing(blue, "ASH-YARI", 8, stats("ASH-YARI"), Vec2::new(500.0, 512.0), PI)
        .unwrap();
    let aim: Vec<Vec2> = sim.fighters(target).iter().map(|f| f.position).collect();
    arrows_at(&aim, 0.2, &mut sim);
    sim.remove_unit(target);

    sim.advance_time(3.0);
    assert_eq!(log.count(|e| matches!(e, BattleEvent::Release { .. })), 1);
    assert_eq!(log.count(|e| matches!(e, BattleEvent::Casualty(_))), 0);
    assert_eq!(sim.shootings_in_flight(), 0);
}

#[test]
fn test_arrows_at_empty_ground_miss() {
    let (mut sim, _, blue) = battle(1);
    let log = observe(&mut sim);
    let target = sim
        .add_unit_with_facing(blue, "ASH-YARI", 8, stats("ASH-YARI"), Vec2::new(500.0, 512.0), PI)
        .unwrap();
    // Where the unit stood before it moved 20 m north
    let aim: Vec<Vec2> = sim
        .fighters(target)
        .iter()
        .map(|f| f.position - Vec2::new(0.0, 20.0))
        .collect();
    arrows_at(&aim, 0.2, &mut sim);

    sim.advance_time(3.0);
    assert_eq!(log.count(|e| matches!(e, BattleEvent::Casualty(_))), 0);
    assert_eq!(sim.fighters_count(target), Some(8));
    assert_eq!(sim.shootings_in_flight(), 0);
}

// ---- Morale ----

#[test]
fn test_routing_unit_flees_and_is_removed() {
    let (mut sim, red, _) = battle(1);
    let log = observe(&mut sim);
    let id = sim
        .add_unit_with_facing(red, "ASH-YARI", 10, stats("ASH-YARI"), Vec2::new(300.0, 300.0), 0.0)
        .unwrap();
    let entity = sim.entity_of(id).unwrap();
    {
        let mut state = sim.world_mut().get::<&mut UnitState>(entity).unwrap();
        state.morale = 0.01;
        state.recent_casualties = 5;
    }

    sim.advance_time(DT);
    let state = sim.unit_state(id).unwrap();
    assert!(state.is_routing());
    assert_eq!(log.count(|e| matches!(e, BattleEvent::Routing { .. })), 1);
    assert_eq!(sim.unit_status(id).unwrap().activity, UnitActivity::Routing);

    sim.advance_time(1.0);
    assert!(sim.unit_state(id).is_none());
    assert_eq!(log.count(|e| matches!(e, BattleEvent::RemoveUnit { .. })), 1);
}

#[test]
fn test_morale_recovers_toward_initial() {
    let (mut sim, red, _) = battle(1);
    let id = sim.add_unit(red, "ASH-YARI", 10, stats("ASH-YARI"), Vec2::splat(300.0)).unwrap();
    let entity = sim.entity_of(id).unwrap();
    sim.world_mut().get::<&mut UnitState>(entity).unwrap().morale = 0.5;
    sim.advance_time(2.0);
    let morale = sim.unit_state(id).unwrap().morale;
    assert!(morale > 0.5 && morale <= 1.0);
}

// ---- Deployment ----

#[test]
fn test_deploy_into_zone() {
    let (mut sim, red, blue) = battle(1);
    sim.set_deployment_zone(1, Vec2::new(200.0, 200.0), 60.0);
    sim.set_deployment_zone(2, Vec2::new(800.0, 800.0), 60.0);
    sim.enable_deployment_zones(None);

    let a = sim.add_unit(red, "ASH-YARI", 12, stats("ASH-YARI"), Vec2::splat(500.0)).unwrap();
    let b = sim.add_unit(blue, "ASH-YARI", 12, stats("ASH-YARI"), Vec2::splat(600.0)).unwrap();
    assert!(sim.is_deployment());

    assert!(sim.deploy(a, Vec2::ZERO, 0.0));
    let center = sim.unit_state(a).unwrap().center;
    assert!(sim.is_deployment_zone(1, center));
    for f in sim.fighters(a) {
        assert!(sim.is_deployment_zone(1, f.position));
    }
    assert!(sim.has_completed_deployment(1));
    assert!(!sim.has_completed_deployment(2));

    // Units do not march while deploying
    sim.set_unit_command(b, UnitCommand::move_to(Vec2::new(900.0, 600.0), 0.0, false), 0.0);
    sim.advance_time(1.0);
    assert!(sim.is_deployment());
    assert_eq!(sim.unit_state(b).unwrap().center, Vec2::splat(600.0));
    assert_eq!(sim.winner_team(), 0);

    assert!(sim.deploy(b, Vec2::new(800.0, 800.0), PI));
    sim.advance_time(DT);
    assert!(!sim.is_deployment());
    assert!(!sim.deploy(b, Vec2::new(800.0, 800.0), PI));
}

#[test]
fn test_deployment_timer_expires() {
    let (mut sim, red, _) = battle(1);
    sim.enable_deployment_zones(Some(1.0));
    sim.add_unit(red, "ASH-YARI", 4, stats("ASH-YARI"), Vec2::splat(300.0));
    sim.advance_time(0.5);
    assert!(sim.is_deployment());
    sim.advance_time(0.6);
    assert!(!sim.is_deployment());
}

#[test]
fn test_deployment_zone_queries() {
    let (mut sim, _, _) = battle(1);
    assert!(sim.is_deployment_zone(7, Vec2::splat(5.0)));
    assert!(sim.deployment_zone(1).is_none());

    sim.set_deployment_zone(1, Vec2::new(100.0, 100.0), 30.0);
    let zone = sim.deployment_zone(1).unwrap();
    assert_eq!(zone.radius, 30.0);
    let p = sim.constrain_deployment_zone(1, Vec2::new(500.0, 100.0), 10.0);
    assert!((p - Vec2::new(120.0, 100.0)).length() < 1e-3);
    assert!(!sim.is_deployment_zone(1, Vec2::new(500.0, 100.0)));
}

// ---- Battle end ----

#[test]
fn test_winner_when_enemy_leaves() {
    let (mut sim, red, blue) = battle(1);
    sim.add_unit(red, "ASH-YARI", 4, stats("ASH-YARI"), Vec2::splat(200.0)).unwrap();
    let b = sim.add_unit(blue, "ASH-YARI", 4, stats("ASH-YARI"), Vec2::splat(800.0)).unwrap();
    sim.advance_time(DT);
    assert_eq!(sim.winner_team(), 0);

    sim.remove_unit(b);
    sim.advance_time(DT);
    assert_eq!(sim.winner_team(), 1);
    assert_eq!(sim.snapshot().winner_team, 1);
}

#[test]
fn test_no_winner_with_one_team() {
    let (mut sim, red, _) = battle(1);
    sim.add_unit(red, "ASH-YARI", 4, stats("ASH-YARI"), Vec2::splat(200.0)).unwrap();
    sim.advance_time(1.0);
    assert_eq!(sim.winner_team(), 0);
}

#[test]
fn test_practice_never_declares_winner() {
    let (mut sim, red, blue) = battle(1);
    sim.set_practice(true);
    sim.add_unit(red, "ASH-YARI", 4, stats("ASH-YARI"), Vec2::splat(200.0)).unwrap();
    let b = sim.add_unit(blue, "ASH-YARI", 4, stats("ASH-YARI"), Vec2::splat(800.0)).unwrap();
    sim.remove_unit(b);
    sim.advance_time(1.0);
    assert_eq!(sim.winner_team(), 0);
    assert!(sim.is_practice());
}

// ---- Observers ----

#[test]
fn test_observer_add_and_remove() {
    let (mut sim, red, _) = battle(1);
    let log = EventLog::new();
    let id = sim.add_observer(Box::new(log.clone()));

    sim.add_unit(red, "ASH-YARI", 4, stats("ASH-YARI"), Vec2::splat(200.0)).unwrap();
    assert_eq!(log.count(|e| matches!(e, BattleEvent::AddUnit { fighters: 4, .. })), 1);

    assert!(sim.remove_observer(id).is_some());
    sim.add_unit(red, "ASH-YARI", 4, stats("ASH-YARI"), Vec2::splat(300.0)).unwrap();
    assert_eq!(log.count(|e| matches!(e, BattleEvent::AddUnit { .. })), 1);
    assert!(sim.remove_observer(id).is_none());
}

// ---- Snapshot ----

#[test]
fn test_snapshot_contents() {
    let (mut sim, red, blue) = battle(1);
    let a = sim.add_unit(red, "ASH-YARI", 10, stats("ASH-YARI"), Vec2::splat(200.0)).unwrap();
    sim.add_unit(blue, "ASH-BOW", 6, stats("ASH-BOW"), Vec2::splat(800.0)).unwrap();
    sim.advance_time(DT);

    let snapshot = sim.snapshot();
    assert_eq!(snapshot.time.tick, 1);
    assert_eq!(snapshot.units.len(), 2);
    assert_eq!(snapshot.team_strength(1), 10);
    assert_eq!(snapshot.team_strength(2), 6);
    assert!(!snapshot.deployment);

    let status = snapshot.unit(a).unwrap();
    assert_eq!(status.unit_class, "ASH-YARI");
    assert_eq!(status.activity, UnitActivity::Standing);
    assert_eq!(status.routing_blink_time, 0.0);
}
