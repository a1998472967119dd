mod support;

use bevy_ecs::prelude::World;
use ed_core::capacity::EdBeds;
use ed_core::clock::SimulationClock;
use ed_core::doctors::DoctorRoster;
use ed_core::ecs::TreatmentStream;
use ed_core::error::ConfigError;
use ed_core::scenario::{build_scenario, EdConfig, SimulationEndTimeMs};
use ed_core::test_helpers::quiet_config;

#[test]
fn build_scenario_inserts_the_hospital() {
    let mut world = World::new();
    build_scenario(&mut world, &EdConfig::default()).expect("default config builds");

    let beds = world.resource::<EdBeds>();
    assert_eq!(beds.occupancy(TreatmentStream::Acute, "A"), (0, 12));
    assert_eq!(beds.occupancy(TreatmentStream::FastTrack, "FAST"), (0, 18));
    assert_eq!(world.resource::<DoctorRoster>().iter().count(), 4);
    assert_eq!(world.resource::<SimulationEndTimeMs>().0, 30 * 24 * 60 * 60 * 1000);
    assert_eq!(world.resource::<SimulationClock>().pending_event_count(), 0);
}

#[test]
fn build_scenario_rejects_an_uncovered_area() {
    let mut config = quiet_config(1);
    config.doctors.clear();

    let mut world = World::new();
    let err = build_scenario(&mut world, &config).expect_err("no doctors");
    assert_eq!(err, ConfigError::MissingDoctorCoverage("A".to_string()));
    assert!(err.to_string().contains("`A`"));
    assert!(world.get_resource::<EdBeds>().is_none());
}

#[test]
fn build_scenario_accepts_a_partial_json_config() {
    let config: EdConfig = serde_json::from_str(
        r#"{
            "seed": 5,
            "end_time_minutes": 120,
            "areas": [{ "name": "Resus", "beds": 4 }],
            "doctors": [{
                "name": "DrR",
                "area": "Resus",
                "max_active_panel": 3,
                "assess_time": { "kind": "constant", "value": 10 },
                "reassess_time": { "kind": "uniform", "low": 5, "high": 10 }
            }],
            "fast_track": { "enabled": false },
            "ems": { "enabled": false }
        }"#,
    )
    .expect("config parses");

    let mut world = World::new();
    build_scenario(&mut world, &config).expect("partial config builds");
    assert_eq!(
        world.resource::<EdBeds>().occupancy(TreatmentStream::Acute, "Resus"),
        (0, 4)
    );
    assert_eq!(world.resource::<SimulationEndTimeMs>().0, 120 * 60 * 1000);
}
