//! Movement path synthesis and sanitizing.

use glam::Vec2;

use skirmish_core::constants::{IMPASSABLE_BACKOFF, IMPASSABLE_SCAN_STEP, PATH_SPACING};
use skirmish_terrain::GroundMap;

const SAME_POINT: f32 = 0.01;

/// Rebuild `path` so it runs from `current` to `destination`.
///
/// Already-laid points are kept while each one brings the unit closer to the
/// destination; the rest of the way is re-spaced at `PATH_SPACING` and the
/// path always ends exactly at `destination`.
pub fn update_movement_path(path: &mut Vec<Vec2>, current: Vec2, destination: Vec2) {
    if current.distance(destination) < SAME_POINT {
        path.clear();
        return;
    }

    let mut remaining = current.distance(destination);
    let mut kept = 0;
    for point in path.iter() {
        let distance = point.distance(destination);
        if distance + SAME_POINT >= remaining || distance < PATH_SPACING {
            break;
        }
        remaining = distance;
        kept += 1;
    }
    path.truncate(kept);

    let mut from = path.last().copied().unwrap_or(current);
    while from.distance(destination) > PATH_SPACING {
        from += (destination - from).normalize() * PATH_SPACING;
        path.push(from);
    }
    path.push(destination);
}

/// Total length of `path` when walked from `start`.
pub fn path_length(start: Vec2, path: &[Vec2]) -> f32 {
    let mut from = start;
    let mut length = 0.0;
    for &point in path {
        length += from.distance(point);
        from = point;
    }
    length
}

/// Cut `path` short where it first enters impassable ground, backing off
/// from the boundary. Returns true when the path was shortened.
pub fn truncate_at_impassable<G: GroundMap + ?Sized>(ground: &G, start: Vec2, path: &mut Vec<Vec2>) -> bool {
    let mut from = start;
    for index in 0..path.len() {
        let to = path[index];
        let length = from.distance(to);
        if length > 0.0 {
            let direction = (to - from) / length;
            let mut travelled = IMPASSABLE_SCAN_STEP.min(length);
            loop {
                if ground.is_impassable(from + direction * travelled) {
                    let stop = from + direction * (travelled - IMPASSABLE_BACKOFF).max(0.0);
                    path.truncate(index);
                    if path.last().copied().unwrap_or(start).distance(stop) > SAME_POINT {
                        path.push(stop);
                    }
                    return true;
                }
                if travelled >= length {
                    break;
                }
                travelled = (travelled + IMPASSABLE_SCAN_STEP).min(length);
            }
        }
        from = to;
    }
    false
}
