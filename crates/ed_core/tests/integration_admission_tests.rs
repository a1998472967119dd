mod support;

use ed_core::ecs::Disposition;
use ed_core::doctors::DoctorRoster;
use ed_core::inpatient::InpatientUnits;
use ed_core::signal::TransferSignals;
use ed_core::test_helpers::schedule_walk_in;
use support::schedule::ScheduleRunner;
use support::world::{count, minutes, patient, TestWorldBuilder};

#[test]
fn admission_to_a_unit_without_beds_fails_and_care_continues() {
    let mut world = TestWorldBuilder::new()
        .with_touch(0.0, 0.0)
        .with_admitting_unit(0, 30.0, 100.0)
        .build();
    schedule_walk_in(&mut world, minutes(1.0));

    ScheduleRunner::new().run_full(&mut world);

    assert_eq!(count(&world, "consult_admit"), 1);
    assert_eq!(count(&world, "admit_failed_no_unit"), 1);
    assert_eq!(count(&world, "admit_transfer"), 0);
    // No second consult after a failed admission.
    assert_eq!(count(&world, "consult_start"), 1);

    let p = patient(&mut world, 1);
    assert!(!p.admission.admitted);
    assert!(!p.consults.admit);
    assert_eq!(p.consults.count, 1);
    assert_eq!(p.consults.minutes_total, 30.0);
    assert_eq!(p.disposition, Some(Disposition::Discharged));
    assert!(p.timeline.bed_end.is_some());
}

#[test]
fn free_unit_bed_transfers_at_the_admit_decision() {
    let mut world = TestWorldBuilder::new()
        .with_touch(0.0, 0.0)
        .with_admitting_unit(1, 30.0, 100.0)
        .build();
    schedule_walk_in(&mut world, minutes(1.0));

    ScheduleRunner::new().run_full(&mut world);

    let p = patient(&mut world, 1);
    // Placed at 1, assessed for 10, consulted for 30.
    assert_eq!(p.admission.decision, Some(minutes(41.0)));
    assert_eq!(p.admission.inpatient_start, Some(minutes(41.0)));
    assert_eq!(p.boarding_minutes(), Some(0.0));
    assert_eq!(p.timeline.bed_end, Some(minutes(41.0)));
    assert_eq!(p.disposition, Some(Disposition::TransferredToInpatient));
    assert_eq!(p.admission.inpatient_end, Some(minutes(141.0)));
    assert_eq!(count(&world, "doctor_panel_release"), 1);
    assert_eq!(count(&world, "discharge"), 0);
}

#[test]
fn boarding_patient_takes_the_next_freed_unit_bed() {
    let mut world = TestWorldBuilder::new()
        .with_beds(2)
        .with_doctor(2, 10.0)
        .with_touch(0.0, 0.0)
        .with_admitting_unit(1, 30.0, 100.0)
        .build();
    schedule_walk_in(&mut world, minutes(1.0));
    schedule_walk_in(&mut world, minutes(1.0));

    ScheduleRunner::new().run_full(&mut world);

    assert_eq!(count(&world, "admit_waitlist_enqueue"), 1);
    assert_eq!(count(&world, "admit_transfer"), 2);

    let first = patient(&mut world, 1);
    let boarder = patient(&mut world, 2);
    assert_eq!(first.admission.inpatient_start, Some(minutes(41.0)));
    assert_eq!(boarder.admission.decision, Some(minutes(41.0)));
    // The boarder moves up when the first patient's 100 minute stay ends.
    assert_eq!(boarder.admission.inpatient_start, Some(minutes(141.0)));
    assert_eq!(boarder.boarding_minutes(), Some(100.0));
    assert_eq!(boarder.timeline.bed_end, Some(minutes(141.0)));
    assert_eq!(boarder.disposition, Some(Disposition::TransferredToInpatient));

    assert_eq!(world.resource::<TransferSignals>().pending(), 0);
    assert_eq!(world.resource::<InpatientUnits>().waitlist_len(), 0);
    let roster = world.resource::<DoctorRoster>();
    assert!(roster.iter().all(|doctor| doctor.active_panel() == 0));
    assert_eq!(count(&world, "doctor_panel_release"), 2);
}
