//! Battle simulation engine for SKIRMISH.
//!
//! Owns the hecs ECS world of units and fighters, runs systems at a fixed
//! time step, notifies observers, and produces BattleSnapshots.

pub mod commander;
pub mod components;
pub mod deployment;
pub mod engine;
pub mod formation;
pub mod observer;
pub mod path;
pub mod scenario;
pub mod spatial;
pub mod systems;

pub use skirmish_core as core;
pub use engine::{BattleSimulator, FighterView, SimConfig};
pub use observer::{BattleObserver, EventLog, ObserverId};
pub use scenario::{load_scenario, ScenarioError};

#[cfg(test)]
mod tests;
