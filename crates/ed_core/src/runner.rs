//! Simulation runner: advances the clock and routes events into the ECS.
//!
//! Clock progression and event routing happen here, outside systems. Each step
//! pops the next event from [SimulationClock], inserts it as [CurrentEvent],
//! then runs the schedule. The arrival streams and dispatch loops never stop
//! on their own, so a run is bounded by [SimulationEndTimeMs].

use bevy_ecs::prelude::{Res, Schedule, World};
use bevy_ecs::schedule::{apply_deferred, ExecutorKind, IntoSystemConfigs};

use crate::clock::{CurrentEvent, Event, EventKind, SimulationClock};
use crate::profiling::EventMetrics;
use crate::scenario::SimulationEndTimeMs;
use crate::systems::{
    dispatch::{acute_dispatch_system, fast_track_dispatch_system},
    inpatient::{inpatient_discharge_system, transfer_completed_system},
    lwbs::lwbs_check_system,
    offload::{
        crew_clear_system, offload_bay_granted_system, offload_complete_system,
        offload_staffing_system,
    },
    spawner::{arrival_hour_system, patient_arrival_system, simulation_started_system},
    treatment::{
        assessment_complete_system, consult_complete_system, nurse_granted_system,
        reassessment_complete_system, treatment_complete_system, workup_task_system,
    },
};

/// Run condition matching the current event's kind.
fn event_is(kind: EventKind) -> impl Fn(Option<Res<CurrentEvent>>) -> bool + Clone {
    move |event: Option<Res<CurrentEvent>>| event.map(|e| e.0.kind == kind).unwrap_or(false)
}

fn is_workup_task(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| {
            matches!(
                e.0.kind,
                EventKind::NurseAssessmentComplete
                    | EventKind::LabsComplete
                    | EventKind::ImagingComplete
            )
        })
        .unwrap_or(false)
}

/// Stops before an event at or past [SimulationEndTimeMs] when that resource exists.
fn reached_end(world: &World) -> bool {
    let stop_at = world.get_resource::<SimulationEndTimeMs>().map(|e| e.0);
    let next_ts = world
        .get_resource::<SimulationClock>()
        .and_then(|c| c.next_event_time());
    matches!((stop_at, next_ts), (Some(end_ms), Some(ts)) if ts >= end_ms)
}

fn step(world: &mut World, schedule: &mut Schedule) -> Option<Event> {
    if reached_end(world) {
        return None;
    }
    let event = world.get_resource_mut::<SimulationClock>()?.pop_next()?;
    world.insert_resource(CurrentEvent(event));

    if let Some(mut metrics) = world.get_resource_mut::<EventMetrics>() {
        metrics.record_event(event.kind);
    }

    schedule.run(world);
    Some(event)
}

/// Runs one simulation step. Returns `true` if an event was processed, `false`
/// if the clock was empty or the next event is past the end time.
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> bool {
    step(world, schedule).is_some()
}

/// Runs one simulation step and invokes `hook` after the schedule completes.
pub fn run_next_event_with_hook<F>(world: &mut World, schedule: &mut Schedule, mut hook: F) -> bool
where
    F: FnMut(&World, &Event),
{
    match step(world, schedule) {
        Some(event) => {
            hook(world, &event);
            true
        }
        None => false,
    }
}

/// Runs simulation steps until the event queue is empty, the end time is
/// reached, or `max_steps` is hit. Returns the number of steps executed.
pub fn run_until_empty(world: &mut World, schedule: &mut Schedule, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule) {
        steps += 1;
    }
    steps
}

/// Runs simulation steps until empty and invokes `hook` after each step.
pub fn run_until_empty_with_hook<F>(
    world: &mut World,
    schedule: &mut Schedule,
    max_steps: usize,
    mut hook: F,
) -> usize
where
    F: FnMut(&World, &Event),
{
    let mut steps = 0;
    while steps < max_steps && run_next_event_with_hook(world, schedule, &mut hook) {
        steps += 1;
    }
    steps
}

/// Builds the simulation schedule: one system per event kind, each gated on
/// the current event, followed by [apply_deferred] so that spawned patients and
/// inserted or removed care episodes are visible to the next step.
///
/// Systems run on a single thread in insertion order; every handler mutates
/// shared pools, so there is nothing to gain from parallel execution.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);

    schedule.add_systems(
        (
            simulation_started_system.run_if(event_is(EventKind::SimulationStarted)),
            arrival_hour_system.run_if(event_is(EventKind::ArrivalHour)),
            patient_arrival_system.run_if(event_is(EventKind::PatientArrival)),
            offload_staffing_system.run_if(event_is(EventKind::OffloadStaffing)),
            offload_bay_granted_system.run_if(event_is(EventKind::OffloadBayGranted)),
            offload_complete_system.run_if(event_is(EventKind::OffloadComplete)),
            crew_clear_system.run_if(event_is(EventKind::CrewClear)),
            acute_dispatch_system.run_if(event_is(EventKind::AcuteDispatch)),
            fast_track_dispatch_system.run_if(event_is(EventKind::FastTrackDispatch)),
            lwbs_check_system.run_if(event_is(EventKind::LwbsCheck)),
            assessment_complete_system.run_if(event_is(EventKind::AssessmentComplete)),
            consult_complete_system.run_if(event_is(EventKind::ConsultComplete)),
            nurse_granted_system.run_if(event_is(EventKind::NurseGranted)),
            workup_task_system.run_if(is_workup_task),
            reassessment_complete_system.run_if(event_is(EventKind::ReassessmentComplete)),
            treatment_complete_system.run_if(event_is(EventKind::TreatmentComplete)),
            transfer_completed_system.run_if(event_is(EventKind::TransferCompleted)),
            inpatient_discharge_system.run_if(event_is(EventKind::InpatientDischarge)),
            apply_deferred,
        )
            .chain(),
    );

    schedule
}

/// Schedules [EventKind::SimulationStarted] at time 0.
/// Call this after building the scenario and before running events.
pub fn initialize_simulation(world: &mut World) {
    let mut clock = world.resource_mut::<SimulationClock>();
    clock.schedule_at(0, EventKind::SimulationStarted, None);
}
