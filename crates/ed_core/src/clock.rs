//! Simulation clock: a min-heap of timestamped events and the current time.
//!
//! Time is integer milliseconds of simulated time. The ED model speaks in
//! minutes; [ONE_MIN_MS], [minutes_to_ms] and [ms_to_minutes] convert between
//! the two. Events that share a timestamp pop in the order they were scheduled.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::{Entity, Resource};

use crate::ecs::ArrivalChannel;

pub const ONE_SEC_MS: u64 = 1000;
pub const ONE_MIN_MS: u64 = 60 * ONE_SEC_MS;
pub const ONE_HOUR_MS: u64 = 60 * ONE_MIN_MS;
pub const ONE_DAY_MS: u64 = 24 * ONE_HOUR_MS;

/// Converts a (possibly fractional) minute duration to milliseconds.
/// Non-finite and negative durations collapse to zero.
pub fn minutes_to_ms(minutes: f64) -> u64 {
    if !minutes.is_finite() || minutes <= 0.0 {
        return 0;
    }
    (minutes * ONE_MIN_MS as f64).round() as u64
}

pub fn ms_to_minutes(ms: u64) -> f64 {
    ms as f64 / ONE_MIN_MS as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    SimulationStarted,
    /// Top of an arrival hour for one stream; draws that hour's arrivals.
    ArrivalHour,
    PatientArrival,
    OffloadStaffing,
    OffloadBayGranted,
    OffloadComplete,
    CrewClear,
    AcuteDispatch,
    FastTrackDispatch,
    LwbsCheck,
    AssessmentComplete,
    ConsultComplete,
    NurseGranted,
    NurseAssessmentComplete,
    LabsComplete,
    ImagingComplete,
    ReassessmentComplete,
    TreatmentComplete,
    TransferCompleted,
    InpatientDischarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSubject {
    Patient(Entity),
    Stream(ArrivalChannel),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub timestamp: u64,
    /// Insertion order; breaks timestamp ties first-scheduled-first.
    pub seq: u64,
    pub kind: EventKind,
    pub subject: Option<EventSubject>,
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap a min-heap.
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The event currently being handled by the schedule.
#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub Event);

#[derive(Debug, Default, Resource)]
pub struct SimulationClock {
    now: u64,
    next_seq: u64,
    events: BinaryHeap<Event>,
}

impl SimulationClock {
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn now_minutes(&self) -> f64 {
        ms_to_minutes(self.now)
    }

    /// Schedules an event at an absolute timestamp. Timestamps in the past are
    /// clamped to the current time.
    pub fn schedule_at(&mut self, timestamp: u64, kind: EventKind, subject: Option<EventSubject>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Event {
            timestamp: timestamp.max(self.now),
            seq,
            kind,
            subject,
        });
    }

    pub fn schedule_in(&mut self, delay_ms: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule_at(self.now.saturating_add(delay_ms), kind, subject);
    }

    pub fn schedule_in_minutes(
        &mut self,
        minutes: f64,
        kind: EventKind,
        subject: Option<EventSubject>,
    ) {
        self.schedule_in(minutes_to_ms(minutes), kind, subject);
    }

    pub fn schedule_now(&mut self, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule_at(self.now, kind, subject);
    }

    pub fn pop_next(&mut self) -> Option<Event> {
        let event = self.events.pop()?;
        self.now = event.timestamp;
        Some(event)
    }

    pub fn next_event_time(&self) -> Option<u64> {
        self.events.peek().map(|event| event.timestamp)
    }

    pub fn pending_event_count(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_pops_events_in_time_order() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(10, EventKind::AcuteDispatch, None);
        clock.schedule_at(5, EventKind::LwbsCheck, None);
        clock.schedule_at(20, EventKind::TreatmentComplete, None);

        assert_eq!(clock.pop_next().map(|e| e.timestamp), Some(5));
        assert_eq!(clock.now(), 5);
        assert_eq!(clock.pop_next().map(|e| e.timestamp), Some(10));
        assert_eq!(clock.pop_next().map(|e| e.timestamp), Some(20));
        assert!(clock.is_empty());
    }

    #[test]
    fn same_timestamp_events_pop_in_scheduling_order() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(100, EventKind::TreatmentComplete, None);
        clock.schedule_at(100, EventKind::AcuteDispatch, None);
        clock.schedule_at(100, EventKind::LwbsCheck, None);

        let kinds: Vec<_> = std::iter::from_fn(|| clock.pop_next().map(|e| e.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::TreatmentComplete,
                EventKind::AcuteDispatch,
                EventKind::LwbsCheck
            ]
        );
    }

    #[test]
    fn minute_helpers_round_trip_whole_minutes() {
        let mut clock = SimulationClock::default();
        clock.schedule_in_minutes(2.5, EventKind::LwbsCheck, None);
        assert_eq!(clock.next_event_time(), Some(150_000));
        clock.pop_next();
        assert_eq!(clock.now_minutes(), 2.5);
        assert_eq!(minutes_to_ms(f64::NAN), 0);
        assert_eq!(minutes_to_ms(-3.0), 0);
    }
}
