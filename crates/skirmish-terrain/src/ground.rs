//! The ground queries the engine needs from whatever terrain it runs on.

use glam::Vec2;

/// Terrain queries used by movement rules and line-of-fire checks.
pub trait GroundMap {
    /// Fighters cannot enter this position.
    fn is_impassable(&self, position: Vec2) -> bool;

    /// Position lies in forest (slows movement).
    fn is_forest(&self, position: Vec2) -> bool;

    /// Ground elevation at (x, y) in meters.
    fn calculate_height(&self, x: f32, y: f32) -> f32;

    fn height_at(&self, position: Vec2) -> f32 {
        self.calculate_height(position.x, position.y)
    }
}

/// Open, level ground everywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatGround;

impl GroundMap for FlatGround {
    fn is_impassable(&self, _position: Vec2) -> bool {
        false
    }

    fn is_forest(&self, _position: Vec2) -> bool {
        false
    }

    fn calculate_height(&self, _x: f32, _y: f32) -> f32 {
        0.0
    }
}

impl<G: GroundMap + ?Sized> GroundMap for Box<G> {
    fn is_impassable(&self, position: Vec2) -> bool {
        (**self).is_impassable(position)
    }

    fn is_forest(&self, position: Vec2) -> bool {
        (**self).is_forest(position)
    }

    fn calculate_height(&self, x: f32, y: f32) -> f32 {
        (**self).calculate_height(x, y)
    }
}
