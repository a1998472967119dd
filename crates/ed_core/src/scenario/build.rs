use std::collections::BTreeMap;

use bevy_ecs::prelude::World;

use crate::capacity::EdBeds;
use crate::clock::{minutes_to_ms, SimulationClock};
use crate::distributions::SimRng;
use crate::doctors::DoctorRoster;
use crate::ems::{DownloadHolding, OffloadBays};
use crate::error::ConfigError;
use crate::generation::PatientIdAllocator;
use crate::inpatient::InpatientUnits;
use crate::nurses::{NurseModel, NurseStaff};
use crate::queues::PatientQueues;
use crate::scenario::params::{EdConfig, SimulationEndTimeMs};
use crate::signal::TransferSignals;
use crate::telemetry::EventLog;

/// Validates `config` and inserts every resource the schedule needs.
/// Nothing is inserted when validation fails.
pub fn build_scenario(world: &mut World, config: &EdConfig) -> Result<(), ConfigError> {
    config.validate()?;

    let fast_track = config
        .fast_track_active()
        .then(|| (config.fast_track.name.clone(), config.fast_track.assessment_spaces));
    let beds = EdBeds::new(
        config.areas.iter().map(|area| (area.name.clone(), area.beds)),
        fast_track,
    );
    let nurse_models: BTreeMap<String, NurseModel> = config
        .areas
        .iter()
        .filter_map(|area| {
            area.nurse_model
                .as_ref()
                .map(|model| (area.name.clone(), NurseModel::from_config(model, area.beds)))
        })
        .collect();

    world.insert_resource(SimulationClock::default());
    world.insert_resource(SimRng::seeded(config.seed));
    world.insert_resource(EventLog::default());
    world.insert_resource(PatientIdAllocator::default());
    world.insert_resource(beds);
    world.insert_resource(PatientQueues::default());
    world.insert_resource(DoctorRoster::from_configs(&config.doctors));
    world.insert_resource(NurseStaff::new(nurse_models));
    world.insert_resource(OffloadBays::default());
    world.insert_resource(DownloadHolding::new(config.ems.download_capacity));
    world.insert_resource(InpatientUnits::from_config(&config.inpatient));
    world.insert_resource(TransferSignals::default());
    if let Some(minutes) = config.end_time_minutes {
        world.insert_resource(SimulationEndTimeMs(minutes_to_ms(minutes)));
    }
    world.insert_resource(config.clone());

    tracing::info!(
        seed = ?config.seed,
        areas = config.areas.len(),
        doctors = config.doctors.len(),
        ems = config.ems.enabled,
        fast_track = config.fast_track_active(),
        end_minutes = ?config.end_time_minutes,
        "scenario built"
    );
    Ok(())
}
