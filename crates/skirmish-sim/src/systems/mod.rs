//! ECS systems that operate on the battle world each tick.
//!
//! Systems are pure functions that take `&mut World` (or `&World` for read-only).
//! They do not own state; all state lives in components. Each system walks
//! the units in insertion order so that random draws stay reproducible.

pub mod cleanup;
pub mod melee;
pub mod missile;
pub mod movement;
pub mod orders;
pub mod range;
pub mod snapshot;
pub mod transition;
