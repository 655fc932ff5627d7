//! battle-harness: run a scenario file headless and print snapshots as JSON.
//!
//! Usage:
//!   battle-harness <scenario.json> [--seconds N] [--snapshot-every S] [--seed N] [--practice]
//!
//! Log output goes to stderr and follows RUST_LOG (default `info`).

use std::path::PathBuf;
use std::process;

use skirmish_core::constants::DT;
use skirmish_sim::scenario::{build_scenario, ScenarioDescription};

struct Options {
    scenario: PathBuf,
    seconds: f32,
    snapshot_every: f32,
    seed: Option<u64>,
    practice: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let options = match parse_args(&args[1..]) {
        Some(options) => options,
        None => {
            print_usage();
            process::exit(1);
        }
    };

    let json = match std::fs::read_to_string(&options.scenario) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Failed to read {}: {e}", options.scenario.display());
            process::exit(1);
        }
    };
    let mut description: ScenarioDescription = match serde_json::from_str(&json) {
        Ok(description) => description,
        Err(e) => {
            eprintln!("Invalid scenario {}: {e}", options.scenario.display());
            process::exit(1);
        }
    };
    if let Some(seed) = options.seed {
        description.config.seed = seed;
    }
    description.config.practice |= options.practice;

    let mut sim = match build_scenario(&description) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("Failed to build scenario: {e}");
            process::exit(1);
        }
    };

    let mut elapsed = 0.0;
    let step = options.snapshot_every.max(DT);
    print_snapshot(&sim.snapshot());
    while elapsed < options.seconds {
        sim.advance_time(step);
        elapsed += step;
        print_snapshot(&sim.snapshot());
        if sim.winner_team() != 0 {
            tracing::info!(winner = sim.winner_team(), elapsed, "battle decided");
            break;
        }
    }
}

fn print_snapshot(snapshot: &skirmish_core::state::BattleSnapshot) {
    match serde_json::to_string(snapshot) {
        Ok(line) => println!("{line}"),
        Err(e) => eprintln!("Failed to serialize snapshot: {e}"),
    }
}

fn print_usage() {
    eprintln!(
        "battle-harness: SKIRMISH headless battle runner\n\
         \n\
         Usage: battle-harness <scenario.json> [options]\n\
         \n\
           --seconds <N>         Battle time to simulate (default: 60)\n\
           --snapshot-every <S>  Seconds between printed snapshots (default: 1)\n\
           --seed <N>            Override the scenario's RNG seed\n\
           --practice            Never declare a winner\n\
         \n\
         Example:\n\
         \n\
           RUST_LOG=skirmish_sim=debug battle-harness tools/battle-harness/scenarios/river_crossing.json --seconds 30\n"
    );
}

fn parse_args(args: &[String]) -> Option<Options> {
    let mut options = Options {
        scenario: PathBuf::new(),
        seconds: 60.0,
        snapshot_every: 1.0,
        seed: None,
        practice: false,
    };
    let mut scenario = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--seconds" => {
                options.seconds = args.get(i + 1)?.parse().ok()?;
                i += 1;
            }
            "--snapshot-every" => {
                options.snapshot_every = args.get(i + 1)?.parse().ok()?;
                i += 1;
            }
            "--seed" => {
                options.seed = Some(args.get(i + 1)?.parse().ok()?);
                i += 1;
            }
            "--practice" => options.practice = true,
            "help" | "--help" | "-h" => return None,
            other if other.starts_with("--") => {
                eprintln!("Unknown option: {other}");
                return None;
            }
            path => scenario = Some(PathBuf::from(path)),
        }
        i += 1;
    }

    options.scenario = scenario?;
    Some(options)
}
