use ed_core::clock::{EventKind, SimulationClock, ONE_MIN_MS};

#[test]
fn clock_pops_events_in_time_order() {
    let mut clock = SimulationClock::default();
    clock.schedule_at(20, EventKind::PatientArrival, None);
    clock.schedule_at(5, EventKind::PatientArrival, None);
    clock.schedule_at(20, EventKind::AcuteDispatch, None);
    clock.schedule_at(10, EventKind::PatientArrival, None);

    let first = clock.pop_next().expect("first event");
    assert_eq!(first.timestamp, 5);
    assert_eq!(clock.now(), 5);

    let second = clock.pop_next().expect("second event");
    assert_eq!(second.timestamp, 10);
    assert_eq!(clock.now(), 10);

    // Same instant: first scheduled, first out.
    let third = clock.pop_next().expect("third event");
    assert_eq!(third.timestamp, 20);
    assert_eq!(third.kind, EventKind::PatientArrival);
    let fourth = clock.pop_next().expect("fourth event");
    assert_eq!(fourth.timestamp, 20);
    assert_eq!(fourth.kind, EventKind::AcuteDispatch);

    assert!(clock.pop_next().is_none());
    assert!(clock.is_empty());
}

#[test]
fn schedule_in_minutes_is_relative_to_now() {
    let mut clock = SimulationClock::default();
    clock.schedule_at(3 * ONE_MIN_MS, EventKind::AcuteDispatch, None);
    clock.pop_next().expect("event");

    clock.schedule_in_minutes(2.5, EventKind::LwbsCheck, None);
    clock.schedule_now(EventKind::AcuteDispatch, None);
    assert_eq!(clock.pending_event_count(), 2);

    let now = clock.pop_next().expect("zero delay event");
    assert_eq!(now.timestamp, 3 * ONE_MIN_MS);
    let later = clock.pop_next().expect("delayed event");
    assert_eq!(later.timestamp, 5 * ONE_MIN_MS + ONE_MIN_MS / 2);
    assert_eq!(clock.now_minutes(), 5.5);
}
