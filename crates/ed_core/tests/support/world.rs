#![allow(dead_code)]

use bevy_ecs::prelude::World;
use ed_core::clock::ONE_MIN_MS;
use ed_core::distributions::DrawSpec;
use ed_core::ecs::Patient;
use ed_core::scenario::{EdConfig, InpatientUnitConfig, NurseModelConfig};
use ed_core::telemetry::EventLog;
use ed_core::test_helpers::{create_test_world, patients, quiet_config, test_doctor, TEST_AREA};

/// Builder over [quiet_config] for the flow tests: deterministic draws, no
/// generated arrivals, everything optional switched off until asked for.
#[derive(Debug, Clone)]
pub struct TestWorldBuilder {
    config: EdConfig,
}

impl Default for TestWorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorldBuilder {
    pub fn new() -> Self {
        Self {
            config: quiet_config(1),
        }
    }

    pub fn with_beds(mut self, beds: u32) -> Self {
        self.config.areas[0].beds = beds;
        self
    }

    /// Replaces the acute doctor.
    pub fn with_doctor(mut self, panel: u32, assess_minutes: f64) -> Self {
        self.config
            .doctors
            .retain(|doctor| doctor.area != TEST_AREA);
        self.config
            .doctors
            .push(test_doctor("DrTest", TEST_AREA, panel, assess_minutes));
        self
    }

    /// Probabilities of one- and three-touch; the rest are two-touch.
    pub fn with_touch(mut self, p_one: f64, p_three: f64) -> Self {
        self.config.orders.p_one_touch = p_one;
        self.config.orders.p_three_touch = p_three;
        self
    }

    pub fn with_nurse_team(mut self, nurses: u32) -> Self {
        self.config.areas[0].nurse_model = Some(NurseModelConfig::Team { nurses });
        self
    }

    pub fn with_labs(mut self, minutes: f64) -> Self {
        self.config.orders.lab_prob = 1.0;
        self.config.orders.lab_critical_prob = 0.0;
        self.config.orders.lab_time = DrawSpec::constant(minutes);
        self
    }

    pub fn with_imaging(mut self, modality: &str, minutes: f64) -> Self {
        self.config.orders.di_prob = 1.0;
        self.config.orders.di_time_by_modality =
            [(modality.to_string(), DrawSpec::constant(minutes))].into();
        self
    }

    pub fn with_lwbs_base(mut self, minutes: f64) -> Self {
        self.config.arrivals.lwbs_threshold = DrawSpec::constant(minutes);
        self
    }

    /// Turns fast-track on with one space and a dedicated doctor; every
    /// walk-in is offered to it.
    pub fn with_fast_track(mut self, assess_minutes: f64) -> Self {
        self.config.fast_track.enabled = true;
        self.config.fast_track.assessment_spaces = 1;
        self.config.arrivals.fast_track_route_probability = Some(1.0);
        let name = self.config.fast_track.name.clone();
        self.config
            .doctors
            .push(test_doctor("DrFast", &name, 1, assess_minutes));
        self
    }

    /// A single inpatient unit that every consult goes to and always admits.
    pub fn with_admitting_unit(mut self, beds: u32, consult_minutes: f64, los_minutes: f64) -> Self {
        self.config.orders.consult_prob = 1.0;
        self.config.inpatient.units = vec![InpatientUnitConfig {
            name: "Medicine".to_string(),
            beds,
            los: DrawSpec::constant(los_minutes),
            consult_p: 1.0,
            consult_admit_p: 1.0,
            consult_time: Some(DrawSpec::constant(consult_minutes)),
        }];
        self.config.inpatient.service_to_unit.clear();
        self.config.inpatient.default_unit = Some("Medicine".to_string());
        self.config.inpatient.default_consult_service = "Medicine".to_string();
        self
    }

    /// Ambulances on, with no generated ambulance arrivals, one offload bay
    /// around the clock and constant handover times.
    pub fn with_ems(mut self, offload_minutes: f64, crew_clear_minutes: f64) -> Self {
        self.config.ems.enabled = true;
        self.config.ems.hourly_rate = vec![0.0; 24];
        self.config.ems.offload_bays_per_hour = vec![1; 24];
        self.config.ems.offload_service_time = DrawSpec::constant(offload_minutes);
        self.config.ems.crew_clear_time = DrawSpec::constant(crew_clear_minutes);
        self.config.ems.lwbs_threshold = None;
        self.config.ems.p_critical = 0.0;
        self.config.ems.p_direct_to_bed = 0.0;
        self
    }

    pub fn with_config(mut self, f: impl FnOnce(&mut EdConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn config(&self) -> &EdConfig {
        &self.config
    }

    pub fn build(self) -> World {
        create_test_world(&self.config)
    }
}

pub fn minutes(m: f64) -> u64 {
    (m * ONE_MIN_MS as f64).round() as u64
}

/// The patient with `pid`.
///
/// # Panics
///
/// Panics if no such patient exists.
pub fn patient(world: &mut World, pid: u64) -> Patient {
    patients(world)
        .into_iter()
        .find(|p| p.id.0 == pid)
        .unwrap_or_else(|| panic!("patient {pid} not found"))
}

/// Event names logged for `pid`, in order.
pub fn event_kinds(world: &World, pid: u64) -> Vec<&'static str> {
    world
        .resource::<EventLog>()
        .for_patient(pid)
        .map(|record| record.event)
        .collect()
}

/// Index of the first `event` in `kinds`.
///
/// # Panics
///
/// Panics if the event is missing.
pub fn position(kinds: &[&str], event: &str) -> usize {
    kinds
        .iter()
        .position(|kind| *kind == event)
        .unwrap_or_else(|| panic!("`{event}` missing from {kinds:?}"))
}

pub fn count(world: &World, event: &str) -> usize {
    world.resource::<EventLog>().count(event)
}
