//! Simulation constants and tuning parameters.

use std::f32::consts::PI;

/// Simulation tick rate (Hz).
pub const TICK_RATE: u32 = 15;

/// Seconds per tick.
pub const DT: f32 = 1.0 / TICK_RATE as f32;

/// Standard delay before an issued command reaches the unit (seconds).
pub const COMMAND_ISSUE_DELAY: f32 = 0.25;

/// Slack used when comparing countdown timers against zero.
pub const TIMER_EPSILON: f32 = 1e-4;

// --- Battlefield ---

/// Side length of the square battlefield (meters). Origin at the south-west corner.
pub const BATTLEFIELD_SIZE: f32 = 1024.0;

/// Quadtree leaf capacity before a node splits.
pub const QUADTREE_LEAF_CAPACITY: usize = 8;

/// Maximum quadtree depth (1024 m / 2^8 = 4 m leaves).
pub const QUADTREE_MAX_DEPTH: u32 = 8;

// --- Movement ---

/// Spacing between synthesized path points (meters).
pub const PATH_SPACING: f32 = 10.0;

/// A path point counts as reached once the unit center is this close (meters).
pub const WAYPOINT_TOLERANCE: f32 = 1.0;

/// Maximum turn rate of a unit's facing (radians per second).
pub const UNIT_TURN_RATE: f32 = PI / 2.0;

/// Facing difference below which a standing unit counts as aligned (radians).
pub const FACING_TOLERANCE: f32 = 0.05;

/// Seconds between rank/file reshuffles after casualties.
pub const SWAP_FIGHTERS_INTERVAL: f32 = 0.2;

/// A fighter farther than this from its slot runs to catch up (meters).
pub const CATCH_UP_DISTANCE: f32 = 4.0;

/// Movement speed multiplier inside forest.
pub const FOREST_SPEED_FACTOR: f32 = 0.5;

/// Distance a fighter moves before its cached terrain flags are refreshed (meters).
pub const TERRAIN_REFRESH_DISTANCE: f32 = 2.0;

/// Step used when scanning a path for impassable ground (meters).
pub const IMPASSABLE_SCAN_STEP: f32 = 1.0;

/// Distance kept from impassable ground when a path is truncated (meters).
pub const IMPASSABLE_BACKOFF: f32 = 2.0;

// --- Melee ---

/// Seconds a fighter stays stunned after striking.
pub const STUNNED_DURATION: f32 = 0.6;

/// A melee pair breaks once separated by more than reach times this factor.
pub const MELEE_BREAK_FACTOR: f32 = 1.5;

/// Fighters close in on their opponent to this fraction of weapon reach.
pub const MELEE_CLOSING_FACTOR: f32 = 0.9;

/// Lowest and highest chance for the stronger fighter to win an exchange.
pub const MELEE_MIN_WIN_CHANCE: f32 = 0.1;
pub const MELEE_MAX_WIN_CHANCE: f32 = 0.9;

// --- Missile ---

/// Total angular width of a missile unit's fire arc (radians).
pub const FIRE_ARC: f32 = PI / 2.0;

/// Number of sampled directions across the fire arc.
pub const LINE_OF_FIRE_SAMPLES: usize = 25;

/// Step used when ray casting a line of fire (meters).
pub const LINE_OF_FIRE_STEP: f32 = 4.0;

/// Eye height of a shooter above the ground (meters).
pub const EYE_HEIGHT: f32 = 1.8;

/// Friendly fighters this close to a target block the line of fire (meters).
pub const FRIENDLY_FIRE_RADIUS: f32 = 15.0;

/// A projectile kills the nearest enemy within this radius of its destination (meters).
pub const HIT_RADIUS: f32 = 1.5;

/// Aiming spread at maximum range (meters).
pub const MISSILE_SPREAD: f32 = 1.0;

/// Arrow flight speed (m/s) and fixed arc duration (s).
pub const ARROW_SPEED: f32 = 60.0;
pub const ARROW_ARC_DURATION: f32 = 0.8;

/// Bullet flight speed (m/s) and fixed arc duration (s).
pub const BULLET_SPEED: f32 = 400.0;
pub const BULLET_ARC_DURATION: f32 = 0.1;

// --- Morale ---

/// Morale of a fresh unit.
pub const INITIAL_MORALE: f32 = 1.0;

/// Morale lost when a unit loses its whole initial strength (scaled by 1.5 - training).
pub const CASUALTY_MORALE_LOSS: f32 = 2.0;

/// Morale regained per second without casualties (scaled by training).
pub const MORALE_RECOVERY_RATE: f32 = 0.02;

/// Morale lost per second while routing.
pub const ROUT_MORALE_DECAY: f32 = 0.1;

/// A routing unit at or below this morale leaves the battle.
pub const ROUT_REMOVAL_MORALE: f32 = -1.0;

/// Radius within which other units influence morale (meters).
pub const INFLUENCE_RADIUS: f32 = 50.0;

/// Influence contributed by each nearby unit.
pub const FRIEND_INFLUENCE: f32 = 0.1;
pub const ROUTING_FRIEND_INFLUENCE: f32 = -0.2;
pub const ENEMY_INFLUENCE: f32 = -0.05;

/// Influence is clamped to this magnitude.
pub const MAX_INFLUENCE: f32 = 0.5;

/// Units below this morale (plus influence) blink on status displays.
pub const ROUTING_BLINK_THRESHOLD: f32 = 0.5;

// --- Deployment ---

/// Inset from the deployment zone edge applied by `deploy` (meters).
pub const DEPLOYMENT_INSET: f32 = 10.0;

/// Slack when testing membership of a deployment zone (meters).
pub const DEPLOYMENT_EPSILON: f32 = 1e-3;
