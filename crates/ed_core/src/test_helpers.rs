//! Test helpers for common test setup and utilities.
//!
//! Small deterministic scenarios (constant draws, one area, no random
//! arrivals) and shortcuts for injecting arrivals by hand.

use bevy_ecs::prelude::World;

use crate::clock::{EventKind, EventSubject, SimulationClock, ONE_DAY_MS, ONE_MIN_MS};
use crate::distributions::DrawSpec;
use crate::ecs::{ArrivalChannel, Patient};
use crate::runner::initialize_simulation;
use crate::scenario::{build_scenario, AreaConfig, DoctorConfig, EdConfig};
use crate::telemetry_export::collect_patients;

/// Name of the single acute area in [quiet_config].
pub const TEST_AREA: &str = "A";

/// A doctor that is always on shift with no hourly cap.
pub fn test_doctor(name: &str, area: &str, max_active_panel: u32, assess_minutes: f64) -> DoctorConfig {
    DoctorConfig {
        name: name.to_string(),
        area: area.to_string(),
        start_minute: 0,
        shift_minutes: (ONE_DAY_MS / ONE_MIN_MS) as u32,
        hourly_max_signups: Vec::new(),
        max_active_panel,
        assess_time: DrawSpec::constant(assess_minutes),
        reassess_time: DrawSpec::constant(assess_minutes),
    }
}

/// One acute area with `beds` beds and one doctor with a panel of one.
/// No scheduled arrivals, no ambulances, no fast-track, no nurses, no orders,
/// no consults; every patient is one-touch with a 10 minute assessment and a
/// 1000 minute abandonment base. Clinical draws are constant, so every
/// walk-in gets the same acuity.
pub fn quiet_config(beds: u32) -> EdConfig {
    let mut config = EdConfig::default()
        .with_seed(7)
        .with_days(2.0)
        .with_walk_in_rate(vec![0.0; 24])
        .without_ems()
        .without_fast_track();
    config.areas = vec![AreaConfig {
        name: TEST_AREA.to_string(),
        beds,
        nurse_model: None,
    }];
    config.doctors = vec![test_doctor("DrTest", TEST_AREA, 1, 10.0)];
    config.arrivals.lwbs_threshold = DrawSpec::constant(1000.0);
    config.triage.age = DrawSpec::constant(50.0);
    config.triage.temperature = DrawSpec::constant(37.0);
    config.triage.o2_saturation = DrawSpec::constant(98.0);
    config.triage.systolic_bp = DrawSpec::constant(120.0);
    config.triage.gcs = DrawSpec::constant(15.0);
    config.triage.complaint_code = DrawSpec::constant(10.0);
    config.triage.p_trauma = 0.0;
    config.triage.p_mental_health = 0.0;
    config.orders.lab_prob = 0.0;
    config.orders.di_prob = 0.0;
    config.orders.consult_prob = 0.0;
    config.orders.p_one_touch = 1.0;
    config.orders.p_three_touch = 0.0;
    config
}

/// Builds the scenario and schedules the start event.
///
/// # Panics
///
/// Panics if `config` fails validation.
pub fn create_test_world(config: &EdConfig) -> World {
    let mut world = World::new();
    build_scenario(&mut world, config).expect("test config should be valid");
    initialize_simulation(&mut world);
    world
}

/// Schedules one arrival on `channel` at `at_ms`.
pub fn schedule_arrival(world: &mut World, channel: ArrivalChannel, at_ms: u64) {
    world.resource_mut::<SimulationClock>().schedule_at(
        at_ms,
        EventKind::PatientArrival,
        Some(EventSubject::Stream(channel)),
    );
}

pub fn schedule_walk_in(world: &mut World, at_ms: u64) {
    schedule_arrival(world, ArrivalChannel::WalkIn, at_ms);
}

pub fn schedule_ems_arrival(world: &mut World, at_ms: u64) {
    schedule_arrival(world, ArrivalChannel::Ems, at_ms);
}

/// All patients, ordered by id.
pub fn patients(world: &mut World) -> Vec<Patient> {
    collect_patients(world)
}
