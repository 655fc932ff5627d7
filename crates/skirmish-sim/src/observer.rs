//! Observer bus: listeners notified of unit lifecycle and combat events.
//!
//! Observers receive event data only; they never get a handle to the
//! simulator, so they cannot re-enter it from a callback.

use glam::Vec2;

use skirmish_core::commands::UnitCommand;
use skirmish_core::events::{BattleEvent, Casualty};
use skirmish_core::shooting::Shooting;
use skirmish_core::types::UnitId;

/// Listener for battle events. Every callback defaults to doing nothing.
pub trait BattleObserver {
    fn on_add_unit(
        &mut self,
        _unit: UnitId,
        _team: i32,
        _unit_class: &str,
        _fighters: usize,
        _position: Vec2,
    ) {
    }
    fn on_remove_unit(&mut self, _unit: UnitId) {}
    fn on_command(&mut self, _unit: UnitId, _command: &UnitCommand, _delay: f32) {}
    fn on_shooting(&mut self, _shooting: &Shooting, _delay: f32) {}
    fn on_release(&mut self, _shooting: &Shooting) {}
    fn on_casualty(&mut self, _casualty: &Casualty) {}
    fn on_routing(&mut self, _unit: UnitId) {}
}

/// Handle returned by `add_observer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u32);

/// Registered observers, notified in registration order.
#[derive(Default)]
pub struct ObserverBus {
    observers: Vec<(ObserverId, Box<dyn BattleObserver>)>,
    next_id: u32,
}

impl ObserverBus {
    pub fn add(&mut self, observer: Box<dyn BattleObserver>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    /// Returns the observer, or None for an unknown id.
    pub fn remove(&mut self, id: ObserverId) -> Option<Box<dyn BattleObserver>> {
        let index = self.observers.iter().position(|(i, _)| *i == id)?;
        Some(self.observers.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn notify(&mut self, event: &BattleEvent) {
        for (_, observer) in self.observers.iter_mut() {
            match event {
                BattleEvent::AddUnit {
                    unit,
                    team,
                    unit_class,
                    fighters,
                    position,
                } => observer.on_add_unit(*unit, *team, unit_class, *fighters, *position),
                BattleEvent::RemoveUnit { unit } => observer.on_remove_unit(*unit),
                BattleEvent::Command {
                    unit,
                    command,
                    delay,
                } => observer.on_command(*unit, command, *delay),
                BattleEvent::Shooting { shooting, delay } => observer.on_shooting(shooting, *delay),
                BattleEvent::Release { shooting } => observer.on_release(shooting),
                BattleEvent::Casualty(casualty) => observer.on_casualty(casualty),
                BattleEvent::Routing { unit } => observer.on_routing(*unit),
            }
        }
    }
}

impl std::fmt::Debug for ObserverBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverBus")
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Observer that records every event it sees. Handy for tools and tests.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: std::rc::Rc<std::cell::RefCell<Vec<BattleEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything recorded so far.
    pub fn events(&self) -> Vec<BattleEvent> {
        self.events.borrow().clone()
    }

    pub fn count(&self, matches: impl Fn(&BattleEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| matches(e)).count()
    }

    fn push(&self, event: BattleEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl BattleObserver for EventLog {
    fn on_add_unit(
        &mut self,
        unit: UnitId,
        team: i32,
        unit_class: &str,
        fighters: usize,
        position: Vec2,
    ) {
        self.push(BattleEvent::AddUnit {
            unit,
            team,
            unit_class: unit_class.to_string(),
            fighters,
            position,
        });
    }

    fn on_remove_unit(&mut self, unit: UnitId) {
        self.push(BattleEvent::RemoveUnit { unit });
    }

    fn on_command(&mut self, unit: UnitId, command: &UnitCommand, delay: f32) {
        self.push(BattleEvent::Command {
            unit,
            command: command.clone(),
            delay,
        });
    }

    fn on_shooting(&mut self, shooting: &Shooting, delay: f32) {
        self.push(BattleEvent::Shooting {
            shooting: shooting.clone(),
            delay,
        });
    }

    fn on_release(&mut self, shooting: &Shooting) {
        self.push(BattleEvent::Release {
            shooting: shooting.clone(),
        });
    }

    fn on_casualty(&mut self, casualty: &Casualty) {
        self.push(BattleEvent::Casualty(*casualty));
    }

    fn on_routing(&mut self, unit: UnitId) {
        self.push(BattleEvent::Routing { unit });
    }
}
