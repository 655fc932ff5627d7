//! Terrain collaborator for SKIRMISH.
//!
//! The engine only sees the [`GroundMap`] trait. This crate provides a flat
//! ground, a raster [`TerrainGrid`] with heights and forest/impassable masks,
//! and line-of-fire ray casting.

pub use skirmish_core as core;

pub mod grid;
pub mod ground;
pub mod los;

// Re-export key types for convenience.
pub use grid::{TerrainDescription, TerrainError, TerrainFeature, TerrainGrid};
pub use ground::{FlatGround, GroundMap};
pub use los::line_of_fire_range;
