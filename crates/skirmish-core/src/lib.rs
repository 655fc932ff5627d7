//! Core types and definitions for the SKIRMISH battle engine.
//!
//! This crate defines the vocabulary shared across all other crates:
//! identifiers, unit classes and stats, commands, shootings, observer events,
//! snapshots, and tuning constants. It has no dependency on the entity arena
//! or on any terrain implementation.

pub mod commands;
pub mod constants;
pub mod enums;
pub mod events;
pub mod shooting;
pub mod state;
pub mod stats;
pub mod types;
