//! Ambulance-side resources: offload bays and download holding.

use std::collections::VecDeque;

use bevy_ecs::prelude::{Entity, Resource};

use crate::capacity::{CapacityPool, WaitingPool};

/// Offload bays, resized every hour from the staffing profile.
#[derive(Debug, Clone, Default, Resource)]
pub struct OffloadBays {
    pub bays: WaitingPool,
    /// Absolute hour the next staffing change applies to.
    pub next_hour: u64,
}

/// Monitored holding area between offload and an acute bed. Critical
/// patients who find it full wait in `waitlist` in arrival order.
#[derive(Debug, Clone, Resource)]
pub struct DownloadHolding {
    pub spaces: CapacityPool,
    pub waitlist: VecDeque<Entity>,
}

impl DownloadHolding {
    pub fn new(capacity: u32) -> Self {
        Self {
            spaces: CapacityPool::new(capacity),
            waitlist: VecDeque::new(),
        }
    }
}
