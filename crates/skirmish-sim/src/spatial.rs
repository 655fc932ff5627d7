//! Region quadtree over the battlefield, rebuilt from scratch every tick.
//!
//! Entries are non-owning fighter handles. Queries prune by node bounds and
//! break distance ties by insertion order, so results never depend on how the
//! tree happened to split.

use glam::Vec2;
use hecs::{Entity, World};

use skirmish_core::constants::{QUADTREE_LEAF_CAPACITY, QUADTREE_MAX_DEPTH};
use skirmish_core::types::Bounds2;

use crate::components::{Fighter, FighterState, Roster, UnitInfo, UnitState};

/// A fighter as seen by the index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialEntry {
    pub fighter: Entity,
    pub unit: Entity,
    pub team: i32,
    /// Position clamped into the battlefield.
    pub position: Vec2,
    order: u32,
}

#[derive(Debug)]
struct Node {
    bounds: Bounds2,
    depth: u32,
    children: Option<[usize; 4]>,
    items: Vec<usize>,
}

impl Node {
    fn new(bounds: Bounds2, depth: u32) -> Self {
        Self {
            bounds,
            depth,
            children: None,
            items: Vec::new(),
        }
    }
}

/// Point quadtree with a fixed root square.
#[derive(Debug)]
pub struct Quadtree {
    bounds: Bounds2,
    nodes: Vec<Node>,
    entries: Vec<SpatialEntry>,
}

impl Default for Quadtree {
    fn default() -> Self {
        Self::new(Bounds2::battlefield())
    }
}

impl Quadtree {
    pub fn new(bounds: Bounds2) -> Self {
        Self {
            bounds,
            nodes: vec![Node::new(bounds, 0)],
            entries: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes.push(Node::new(self.bounds, 0));
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, fighter: Entity, unit: Entity, team: i32, position: Vec2) {
        let index = self.entries.len();
        self.entries.push(SpatialEntry {
            fighter,
            unit,
            team,
            position: self.bounds.clamp(position),
            order: index as u32,
        });
        self.insert_into(0, index);
    }

    fn child_for(&self, node: usize, position: Vec2) -> usize {
        let mid = self.nodes[node].bounds.mid();
        let east = (position.x >= mid.x) as usize;
        let north = (position.y >= mid.y) as usize;
        east + 2 * north
    }

    fn insert_into(&mut self, mut node: usize, entry: usize) {
        let position = self.entries[entry].position;
        while let Some(children) = self.nodes[node].children {
            node = children[self.child_for(node, position)];
        }

        self.nodes[node].items.push(entry);
        if self.nodes[node].items.len() > QUADTREE_LEAF_CAPACITY
            && self.nodes[node].depth < QUADTREE_MAX_DEPTH
        {
            self.split(node);
        }
    }

    fn split(&mut self, node: usize) {
        let depth = self.nodes[node].depth + 1;
        let quadrants = self.nodes[node].bounds.quadrants();
        let first = self.nodes.len();
        for bounds in quadrants {
            self.nodes.push(Node::new(bounds, depth));
        }
        let children = [first, first + 1, first + 2, first + 3];
        self.nodes[node].children = Some(children);

        let items = std::mem::take(&mut self.nodes[node].items);
        for entry in items {
            let child = children[self.child_for(node, self.entries[entry].position)];
            self.insert_into(child, entry);
        }
    }

    /// Closest entry within `max_radius` of `position` accepted by `filter`.
    pub fn find_nearest<F>(&self, position: Vec2, max_radius: f32, mut filter: F) -> Option<SpatialEntry>
    where
        F: FnMut(&SpatialEntry) -> bool,
    {
        let mut best: Option<SpatialEntry> = None;
        let mut best_d2 = max_radius * max_radius;
        let mut stack = vec![0usize];

        while let Some(node) = stack.pop() {
            let node = &self.nodes[node];
            if node.bounds.distance_squared(position) > best_d2 {
                continue;
            }
            if let Some(children) = node.children {
                stack.extend_from_slice(&children);
                continue;
            }
            for &index in &node.items {
                let entry = &self.entries[index];
                let d2 = entry.position.distance_squared(position);
                let better = d2 < best_d2
                    || (d2 == best_d2 && best.map_or(true, |b| entry.order < b.order));
                if better && filter(entry) {
                    best = Some(*entry);
                    best_d2 = d2;
                }
            }
        }

        best
    }

    /// True when any entry within `radius` of `position` is accepted by `filter`.
    pub fn any_within<F>(&self, position: Vec2, radius: f32, mut filter: F) -> bool
    where
        F: FnMut(&SpatialEntry) -> bool,
    {
        let r2 = radius * radius;
        let mut stack = vec![0usize];

        while let Some(node) = stack.pop() {
            let node = &self.nodes[node];
            if node.bounds.distance_squared(position) > r2 {
                continue;
            }
            if let Some(children) = node.children {
                stack.extend_from_slice(&children);
                continue;
            }
            let hit = node.items.iter().any(|&index| {
                let entry = &self.entries[index];
                entry.position.distance_squared(position) <= r2 && filter(entry)
            });
            if hit {
                return true;
            }
        }

        false
    }
}

/// The two per-tick indices.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    /// Every living fighter. Used for missile hits and friendly-fire checks.
    pub fighters: Quadtree,
    /// Fighters of non-routing units. Used for melee pairing.
    pub combat: Quadtree,
}

impl SpatialIndex {
    /// Clear and reinsert every fighter that is not a casualty, in unit then slot order.
    pub fn rebuild(&mut self, world: &World, units: &[Entity]) {
        self.fighters.clear();
        self.combat.clear();

        for &unit in units {
            let Ok(info) = world.get::<&UnitInfo>(unit) else {
                continue;
            };
            let Ok(roster) = world.get::<&Roster>(unit) else {
                continue;
            };
            let routing = world
                .get::<&UnitState>(unit)
                .map(|s| s.is_routing())
                .unwrap_or(false);

            for fighter in roster.fighters() {
                let alive = world
                    .get::<&Fighter>(fighter)
                    .map(|f| !f.casualty)
                    .unwrap_or(false);
                if !alive {
                    continue;
                }
                let Ok(state) = world.get::<&FighterState>(fighter) else {
                    continue;
                };
                self.fighters.insert(fighter, unit, info.team, state.position);
                if !routing {
                    self.combat.insert(fighter, unit, info.team, state.position);
                }
            }
        }
    }
}
