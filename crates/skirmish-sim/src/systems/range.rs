//! Fire arc refresh for missile units.

use hecs::{Entity, World};

use skirmish_core::constants::{EYE_HEIGHT, FIRE_ARC, LINE_OF_FIRE_SAMPLES, LINE_OF_FIRE_STEP};
use skirmish_core::stats::UnitStats;
use skirmish_terrain::{line_of_fire_range, GroundMap};

use crate::components::{unit_state, UnitRange};

/// Recompute every unit's `UnitRange` from its current center and facing.
pub fn update_unit_range<G: GroundMap + ?Sized>(world: &mut World, units: &[Entity], ground: &G) {
    for &unit in units {
        let Some(state) = unit_state(world, unit) else {
            continue;
        };
        let range = match world.get::<&UnitStats>(unit) {
            Ok(stats) if stats.is_missile_unit() => {
                let angle_start = state.direction - FIRE_ARC / 2.0;
                let last = (LINE_OF_FIRE_SAMPLES - 1).max(1) as f32;
                let actual_ranges = (0..LINE_OF_FIRE_SAMPLES)
                    .map(|i| {
                        let angle = angle_start + FIRE_ARC * i as f32 / last;
                        line_of_fire_range(
                            ground,
                            state.center,
                            angle,
                            stats.maximum_range,
                            LINE_OF_FIRE_STEP,
                            EYE_HEIGHT,
                        )
                    })
                    .collect();
                UnitRange {
                    center: state.center,
                    angle_start,
                    angle_length: FIRE_ARC,
                    minimum_range: stats.minimum_range,
                    maximum_range: stats.maximum_range,
                    actual_ranges,
                }
            }
            Ok(_) => UnitRange {
                center: state.center,
                angle_start: state.direction,
                ..Default::default()
            },
            Err(_) => continue,
        };
        if let Ok(mut r) = world.get::<&mut UnitRange>(unit) {
            *r = range;
        }
    }
}
