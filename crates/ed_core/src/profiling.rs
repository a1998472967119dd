//! Event throughput counters, filled in by the runner when the resource is present.

use std::collections::BTreeMap;
use std::time::Instant;

use bevy_ecs::prelude::Resource;

use crate::clock::EventKind;

#[derive(Debug, Default, Resource)]
pub struct EventMetrics {
    pub events_processed: u64,
    /// Wall-clock instant of the first recorded event.
    pub start_time: Option<Instant>,
    pub events_by_kind: BTreeMap<EventKind, u64>,
}

impl EventMetrics {
    pub fn record_event(&mut self, kind: EventKind) {
        if self.start_time.is_none() {
            self.start_time = Some(Instant::now());
        }
        self.events_processed += 1;
        *self.events_by_kind.entry(kind).or_insert(0) += 1;
    }

    /// Events handled per wall-clock second since the first one.
    pub fn events_per_second(&self) -> f64 {
        let Some(start) = self.start_time else {
            return 0.0;
        };
        let elapsed = start.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.events_processed as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn count(&self, kind: EventKind) -> u64 {
        self.events_by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// Logs the per-kind breakdown, busiest first.
    pub fn log_summary(&self) {
        tracing::info!(
            events = self.events_processed,
            per_second = self.events_per_second(),
            "event processing summary"
        );
        let mut entries: Vec<_> = self.events_by_kind.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1));
        for (kind, count) in entries {
            tracing::info!(kind = ?kind, count, "events by kind");
        }
    }
}
