//! Waiting queues for the two treatment streams.

use std::collections::VecDeque;

use bevy_ecs::prelude::{Entity, Resource};

use crate::ecs::TreatmentStream;

/// Acute and fast-track queues in enqueue order. The acute dispatcher ranks
/// by acuity; the fast-track dispatcher serves strictly first-in-first-out.
#[derive(Debug, Clone, Default, Resource)]
pub struct PatientQueues {
    acute: VecDeque<Entity>,
    fast_track: VecDeque<Entity>,
}

impl PatientQueues {
    pub fn queue(&self, stream: TreatmentStream) -> &VecDeque<Entity> {
        match stream {
            TreatmentStream::Acute => &self.acute,
            TreatmentStream::FastTrack => &self.fast_track,
        }
    }

    fn queue_mut(&mut self, stream: TreatmentStream) -> &mut VecDeque<Entity> {
        match stream {
            TreatmentStream::Acute => &mut self.acute,
            TreatmentStream::FastTrack => &mut self.fast_track,
        }
    }

    pub fn push(&mut self, stream: TreatmentStream, patient: Entity) {
        self.queue_mut(stream).push_back(patient);
    }

    pub fn len(&self, stream: TreatmentStream) -> usize {
        self.queue(stream).len()
    }

    pub fn is_empty(&self, stream: TreatmentStream) -> bool {
        self.queue(stream).is_empty()
    }

    /// Removes `patient` wherever it sits. `false` when it was already gone,
    /// which is how a losing racer finds out.
    pub fn remove(&mut self, stream: TreatmentStream, patient: Entity) -> bool {
        let queue = self.queue_mut(stream);
        match queue.iter().position(|queued| *queued == patient) {
            Some(idx) => queue.remove(idx).is_some(),
            None => false,
        }
    }

    pub fn pop_front(&mut self, stream: TreatmentStream) -> Option<Entity> {
        self.queue_mut(stream).pop_front()
    }

    pub fn push_front(&mut self, stream: TreatmentStream, patient: Entity) {
        self.queue_mut(stream).push_front(patient);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::world::World;

    #[test]
    fn second_removal_loses_the_race() {
        let mut world = World::new();
        let a = world.spawn_empty().id();
        let b = world.spawn_empty().id();
        let mut queues = PatientQueues::default();
        queues.push(TreatmentStream::Acute, a);
        queues.push(TreatmentStream::Acute, b);

        assert!(queues.remove(TreatmentStream::Acute, a));
        assert!(!queues.remove(TreatmentStream::Acute, a));
        assert!(!queues.remove(TreatmentStream::FastTrack, b));
        assert_eq!(queues.len(TreatmentStream::Acute), 1);
    }
}
