//! Countable capacity: bed pools and FIFO waiter pools.
//!
//! Counters are private; every change goes through acquire/release so that
//! `0 <= in_use <= capacity` always holds.

use std::collections::{BTreeMap, VecDeque};

use bevy_ecs::prelude::{Entity, Resource};

use crate::ecs::TreatmentStream;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityPool {
    capacity: u32,
    in_use: u32,
}

impl CapacityPool {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            in_use: 0,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn in_use(&self) -> u32 {
        self.in_use
    }

    pub fn available(&self) -> u32 {
        self.capacity - self.in_use
    }

    pub fn has_free(&self) -> bool {
        self.in_use < self.capacity
    }

    pub fn try_acquire(&mut self) -> bool {
        if !self.has_free() {
            return false;
        }
        self.in_use += 1;
        true
    }

    /// Returns `false` (and leaves the pool untouched) on release of an idle pool.
    pub fn release(&mut self) -> bool {
        if self.in_use == 0 {
            tracing::warn!(capacity = self.capacity, "release on idle pool ignored");
            return false;
        }
        self.in_use -= 1;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    Granted,
    Queued,
}

/// A pool whose requests wait in arrival order. A release hands the slot
/// straight to the oldest waiter, so nobody can jump the line.
///
/// The target size can change at runtime. Shrinking never preempts: slots
/// above the target retire as their holders release them.
#[derive(Debug, Clone, Default)]
pub struct WaitingPool {
    capacity: u32,
    target: u32,
    in_use: u32,
    waiters: VecDeque<Entity>,
}

impl WaitingPool {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            target: capacity,
            in_use: 0,
            waiters: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn in_use(&self) -> u32 {
        self.in_use
    }

    pub fn waiting(&self) -> usize {
        self.waiters.len()
    }

    pub fn request(&mut self, who: Entity) -> Grant {
        if self.waiters.is_empty() && self.in_use < self.capacity {
            self.in_use += 1;
            Grant::Granted
        } else {
            self.waiters.push_back(who);
            Grant::Queued
        }
    }

    /// Releases one held slot. Returns the waiter that now holds it, if any.
    pub fn release(&mut self) -> Option<Entity> {
        if self.in_use == 0 {
            tracing::warn!(capacity = self.capacity, "release on idle waiting pool ignored");
            return None;
        }
        if self.capacity > self.target {
            self.capacity -= 1;
            self.in_use -= 1;
            return None;
        }
        match self.waiters.pop_front() {
            Some(next) => Some(next),
            None => {
                self.in_use -= 1;
                None
            }
        }
    }

    /// Moves the pool toward `target`. Returns waiters granted by growth.
    pub fn resize(&mut self, target: u32) -> Vec<Entity> {
        self.target = target;
        if target >= self.capacity {
            self.capacity = target;
        } else {
            let idle = self.capacity - self.in_use;
            self.capacity -= (self.capacity - target).min(idle);
        }

        let mut granted = Vec::new();
        while self.in_use < self.capacity {
            let Some(next) = self.waiters.pop_front() else {
                break;
            };
            self.in_use += 1;
            granted.push(next);
        }
        granted
    }
}

/// ED treatment spaces: one pool per acute area plus the fast-track pool.
#[derive(Debug, Clone, Default, Resource)]
pub struct EdBeds {
    acute: BTreeMap<String, CapacityPool>,
    fast_track: Option<(String, CapacityPool)>,
}

impl EdBeds {
    pub fn new(
        acute: impl IntoIterator<Item = (String, u32)>,
        fast_track: Option<(String, u32)>,
    ) -> Self {
        Self {
            acute: acute
                .into_iter()
                .map(|(name, beds)| (name, CapacityPool::new(beds)))
                .collect(),
            fast_track: fast_track.map(|(name, spaces)| (name, CapacityPool::new(spaces))),
        }
    }

    pub fn acute_areas(&self) -> impl Iterator<Item = &str> {
        self.acute.keys().map(String::as_str)
    }

    pub fn fast_track_name(&self) -> Option<&str> {
        self.fast_track.as_ref().map(|(name, _)| name.as_str())
    }

    pub fn pool(&self, stream: TreatmentStream, area: &str) -> Option<&CapacityPool> {
        match stream {
            TreatmentStream::Acute => self.acute.get(area),
            TreatmentStream::FastTrack => self.fast_track.as_ref().map(|(_, pool)| pool),
        }
    }

    fn pool_mut(&mut self, stream: TreatmentStream, area: &str) -> Option<&mut CapacityPool> {
        match stream {
            TreatmentStream::Acute => self.acute.get_mut(area),
            TreatmentStream::FastTrack => self.fast_track.as_mut().map(|(_, pool)| pool),
        }
    }

    pub fn has_free(&self, stream: TreatmentStream, area: &str) -> bool {
        self.pool(stream, area).is_some_and(CapacityPool::has_free)
    }

    pub fn try_acquire(&mut self, stream: TreatmentStream, area: &str) -> bool {
        self.pool_mut(stream, area)
            .is_some_and(CapacityPool::try_acquire)
    }

    pub fn release(&mut self, stream: TreatmentStream, area: &str) -> bool {
        self.pool_mut(stream, area).is_some_and(CapacityPool::release)
    }

    /// `(in_use, capacity)` for logging; zeros for an unknown area.
    pub fn occupancy(&self, stream: TreatmentStream, area: &str) -> (u32, u32) {
        self.pool(stream, area)
            .map(|pool| (pool.in_use(), pool.capacity()))
            .unwrap_or((0, 0))
    }

    pub fn pools(&self) -> impl Iterator<Item = &CapacityPool> {
        self.acute
            .values()
            .chain(self.fast_track.as_ref().map(|(_, pool)| pool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::world::World;

    fn entities(n: usize) -> Vec<Entity> {
        let mut world = World::new();
        (0..n).map(|_| world.spawn_empty().id()).collect()
    }

    #[test]
    fn capacity_pool_never_exceeds_bounds() {
        let mut pool = CapacityPool::new(1);
        assert_eq!(pool.available(), 1);
        assert!(pool.try_acquire());
        assert_eq!(pool.available(), 0);
        assert!(!pool.try_acquire());
        assert!(pool.release());
        assert!(!pool.release());
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn waiting_pool_hands_slots_over_in_fifo_order() {
        let e = entities(3);
        let mut pool = WaitingPool::new(1);
        assert_eq!(pool.request(e[0]), Grant::Granted);
        assert_eq!(pool.request(e[1]), Grant::Queued);
        assert_eq!(pool.request(e[2]), Grant::Queued);

        assert_eq!(pool.release(), Some(e[1]));
        assert_eq!(pool.in_use(), 1);
        assert_eq!(pool.release(), Some(e[2]));
        assert_eq!(pool.release(), None);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn shrinking_retires_busy_slots_on_release() {
        let e = entities(4);
        let mut pool = WaitingPool::new(3);
        for who in &e[..3] {
            assert_eq!(pool.request(*who), Grant::Granted);
        }
        assert!(pool.resize(1).is_empty());
        assert_eq!(pool.target(), 1);
        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.request(e[3]), Grant::Queued);

        assert_eq!(pool.release(), None);
        assert_eq!(pool.release(), None);
        assert_eq!(pool.capacity(), 1);
        assert_eq!(pool.release(), Some(e[3]));
        assert!(pool.in_use() <= pool.capacity());
    }

    #[test]
    fn growth_grants_waiters_immediately() {
        let e = entities(3);
        let mut pool = WaitingPool::new(0);
        assert_eq!(pool.request(e[0]), Grant::Queued);
        assert_eq!(pool.request(e[1]), Grant::Queued);
        assert_eq!(pool.resize(2), vec![e[0], e[1]]);
        assert_eq!(pool.in_use(), 2);
        // Idle slots shrink right away.
        let mut idle = WaitingPool::new(3);
        idle.resize(1);
        assert_eq!(idle.capacity(), 1);
    }
}
