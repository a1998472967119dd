//! One-shot transfer signals between an admission waitlist and the
//! treatment flow that boards the patient.

use std::collections::HashMap;

use bevy_ecs::prelude::{Entity, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignalState {
    Pending { waiter: bool },
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The signal already fired; continue immediately.
    Resolved,
    /// Parked until the signal fires.
    Suspended,
    /// No signal exists for this patient.
    Missing,
}

#[derive(Debug, Default, Resource)]
pub struct TransferSignals {
    signals: HashMap<Entity, SignalState>,
}

impl TransferSignals {
    pub fn create(&mut self, patient: Entity) {
        self.signals
            .insert(patient, SignalState::Pending { waiter: false });
    }

    pub fn wait(&mut self, patient: Entity) -> WaitOutcome {
        match self.signals.get(&patient).copied() {
            None => WaitOutcome::Missing,
            Some(SignalState::Resolved) => {
                self.signals.remove(&patient);
                WaitOutcome::Resolved
            }
            Some(SignalState::Pending { .. }) => {
                self.signals
                    .insert(patient, SignalState::Pending { waiter: true });
                WaitOutcome::Suspended
            }
        }
    }

    /// Fires the signal. Returns `true` when a suspended waiter must be
    /// resumed. Firing twice, or firing an unknown signal, is a no-op.
    pub fn resolve(&mut self, patient: Entity) -> bool {
        match self.signals.get(&patient).copied() {
            Some(SignalState::Pending { waiter: true }) => {
                self.signals.remove(&patient);
                true
            }
            Some(SignalState::Pending { waiter: false }) => {
                self.signals.insert(patient, SignalState::Resolved);
                false
            }
            Some(SignalState::Resolved) | None => false,
        }
    }

    pub fn pending(&self) -> usize {
        self.signals
            .values()
            .filter(|state| matches!(state, SignalState::Pending { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::world::World;

    #[test]
    fn suspended_waiter_is_resumed_exactly_once() {
        let mut world = World::new();
        let patient = world.spawn_empty().id();
        let mut signals = TransferSignals::default();

        signals.create(patient);
        assert_eq!(signals.wait(patient), WaitOutcome::Suspended);
        assert!(signals.resolve(patient));
        assert!(!signals.resolve(patient));
        assert_eq!(signals.pending(), 0);
    }

    #[test]
    fn resolve_before_wait_lets_waiter_pass() {
        let mut world = World::new();
        let patient = world.spawn_empty().id();
        let mut signals = TransferSignals::default();

        signals.create(patient);
        assert!(!signals.resolve(patient));
        assert_eq!(signals.wait(patient), WaitOutcome::Resolved);
        assert_eq!(signals.wait(patient), WaitOutcome::Missing);
    }
}
