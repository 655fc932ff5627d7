//! Line-of-fire range along a bearing, cut short by terrain occlusion.
//!
//! Marches outward from the shooter in fixed steps keeping the steepest
//! terrain slope seen so far (the horizon). A sample is visible while a
//! standing fighter there rises above that horizon.

use glam::Vec2;

use skirmish_core::types::vector_from_angle;

use crate::ground::GroundMap;

/// Distance along `angle` from `origin` that a shooter can see, capped at `max_range`.
///
/// Returns the distance of the last visible sample before the first occluded
/// one. On flat ground this is always `max_range`.
pub fn line_of_fire_range<G: GroundMap + ?Sized>(
    ground: &G,
    origin: Vec2,
    angle: f32,
    max_range: f32,
    step: f32,
    eye_height: f32,
) -> f32 {
    if max_range <= 0.0 || step <= 0.0 {
        return max_range.max(0.0);
    }

    let direction = vector_from_angle(angle);
    let eye = ground.height_at(origin) + eye_height;

    let mut horizon = f32::NEG_INFINITY;
    let mut visible = 0.0;
    let mut distance = step;

    while distance <= max_range {
        let ground_z = ground.height_at(origin + direction * distance);

        // A fighter standing at this sample
        let target_slope = (ground_z + eye_height - eye) / distance;
        if target_slope < horizon {
            return visible;
        }

        visible = distance;
        horizon = horizon.max((ground_z - eye) / distance);
        distance += step;
    }

    max_range
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ground::FlatGround;
    use crate::grid::TerrainGrid;

    #[test]
    fn test_flat_ground_full_range() {
        let range = line_of_fire_range(&FlatGround, Vec2::new(500.0, 500.0), 0.3, 150.0, 4.0, 1.8);
        assert_eq!(range, 150.0);
    }

    #[test]
    fn test_ridge_blocks_view() {
        // 1 m cells, a 10 m wall running north-south at x = 540..550
        let resolution = 1024;
        let mut heights = vec![0.0; resolution * resolution];
        for row in 0..resolution {
            for col in 540..550 {
                heights[row * resolution + col] = 10.0;
            }
        }
        let grid = TerrainGrid::from_heights(1024.0, resolution, heights).unwrap();

        let origin = Vec2::new(500.0, 500.0);
        let east = line_of_fire_range(&grid, origin, 0.0, 150.0, 4.0, 1.8);
        assert!(east > 36.0 && east < 60.0, "east range was {east}");

        // Looking west the wall is behind the shooter
        let west = line_of_fire_range(&grid, origin, std::f32::consts::PI, 150.0, 4.0, 1.8);
        assert_eq!(west, 150.0);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(line_of_fire_range(&FlatGround, Vec2::ZERO, 0.0, 0.0, 4.0, 1.8), 0.0);
        assert_eq!(line_of_fire_range(&FlatGround, Vec2::ZERO, 0.0, 50.0, 0.0, 1.8), 50.0);
    }
}
