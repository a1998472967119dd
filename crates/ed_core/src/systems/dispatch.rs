//! Bed placement loops for the acute and fast-track queues.
//!
//! Each dispatcher places as many patients as it can at the current instant,
//! then polls again one minute later.

use bevy_ecs::prelude::{Commands, Entity, Query, Res};

use crate::capacity::EdBeds;
use crate::care::begin_care;
use crate::clock::{CurrentEvent, EventKind, ONE_MIN_MS};
use crate::ecs::{Patient, TreatmentStream};
use crate::hospital::Hospital;
use crate::queues::PatientQueues;

const DISPATCH_POLL_MS: u64 = ONE_MIN_MS;

/// Highest effective acuity among queued acute patients whose area has a
/// free bed; earliest arrival breaks ties.
pub fn best_acute_candidate(
    queues: &PatientQueues,
    beds: &EdBeds,
    patients: &Query<&mut Patient>,
) -> Option<Entity> {
    let mut best: Option<(Entity, f64, u64)> = None;
    for &entity in queues.queue(TreatmentStream::Acute) {
        let Ok(patient) = patients.get(entity) else {
            continue;
        };
        if !beds.has_free(TreatmentStream::Acute, &patient.area) {
            continue;
        }
        let acuity = patient.effective_acuity();
        let arrival = patient.timeline.arrival;
        let better = match best {
            None => true,
            Some((_, best_acuity, best_arrival)) => {
                acuity > best_acuity || (acuity == best_acuity && arrival < best_arrival)
            }
        };
        if better {
            best = Some((entity, acuity, arrival));
        }
    }
    best.map(|(entity, _, _)| entity)
}

/// Moves critical ambulance patients from the download waitlist into any
/// holding space that is free.
pub fn fill_download_from_waitlist(h: &mut Hospital, patients: &mut Query<&mut Patient>) {
    while h.download.spaces.has_free() {
        let Some(next) = h.download.waitlist.pop_front() else {
            break;
        };
        let Ok(mut patient) = patients.get_mut(next) else {
            continue;
        };
        if patient.disposition.is_some() || patient.timeline.download_start.is_some() {
            continue;
        }
        h.place_in_download(next, &mut patient);
    }
}

pub fn acute_dispatch_system(
    mut commands: Commands,
    mut h: Hospital,
    event: Res<CurrentEvent>,
    mut patients: Query<&mut Patient>,
) {
    if event.0.kind != EventKind::AcuteDispatch {
        return;
    }
    let now = h.now();
    while let Some(entity) = best_acute_candidate(&h.queues, &h.beds, &patients) {
        let Ok(area) = patients.get(entity).map(|p| p.area.clone()) else {
            break;
        };
        // Sign-up and dequeue happen together; nothing else runs in between.
        let Some(doctor) = h.doctors.try_sign_up(&area, now) else {
            break;
        };
        h.queues.remove(TreatmentStream::Acute, entity);
        h.beds.try_acquire(TreatmentStream::Acute, &area);

        let freed_download = match patients.get_mut(entity) {
            Ok(mut patient) => h.end_download(&mut patient),
            Err(_) => false,
        };
        if freed_download {
            fill_download_from_waitlist(&mut h, &mut patients);
        }

        let Ok(mut patient) = patients.get_mut(entity) else {
            continue;
        };
        let episode = begin_care(&mut h, entity, &mut patient, TreatmentStream::Acute, doctor);
        commands.entity(entity).insert(episode);
    }
    h.clock
        .schedule_in(DISPATCH_POLL_MS, EventKind::AcuteDispatch, None);
}

pub fn fast_track_dispatch_system(
    mut commands: Commands,
    mut h: Hospital,
    event: Res<CurrentEvent>,
    mut patients: Query<&mut Patient>,
) {
    if event.0.kind != EventKind::FastTrackDispatch {
        return;
    }
    let Some(area) = h.beds.fast_track_name().map(str::to_string) else {
        return;
    };
    let now = h.now();
    while h.beds.has_free(TreatmentStream::FastTrack, &area) {
        let Some(entity) = h.queues.pop_front(TreatmentStream::FastTrack) else {
            break;
        };
        let Ok(mut patient) = patients.get_mut(entity) else {
            continue;
        };
        let Some(doctor) = h.doctors.try_sign_up(&area, now) else {
            h.queues.push_front(TreatmentStream::FastTrack, entity);
            break;
        };
        h.beds.try_acquire(TreatmentStream::FastTrack, &area);
        let episode = begin_care(
            &mut h,
            entity,
            &mut patient,
            TreatmentStream::FastTrack,
            doctor,
        );
        commands.entity(entity).insert(episode);
    }
    h.clock
        .schedule_in(DISPATCH_POLL_MS, EventKind::FastTrackDispatch, None);
}
