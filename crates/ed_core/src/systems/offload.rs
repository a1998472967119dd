//! Ambulance handover: hourly bay staffing, the offload itself, routing into
//! download holding or the acute queue, and crew clearance.

use bevy_ecs::prelude::{Entity, Query, Res};
use serde_json::json;

use crate::clock::{CurrentEvent, EventKind, EventSubject, ONE_HOUR_MS};
use crate::distributions::draw_or;
use crate::ecs::Patient;
use crate::hospital::Hospital;
use crate::patterns::hourly_value;

const OFFLOAD_FALLBACK_MINUTES: f64 = 7.5;

/// Begins the handover for a patient who holds an offload bay.
pub fn start_offload(h: &mut Hospital, entity: Entity, patient: &mut Patient) {
    let minutes = draw_or(
        &h.config.ems.offload_service_time,
        &mut h.rng.0,
        OFFLOAD_FALLBACK_MINUTES,
        "offload",
    );
    patient.timeline.offload_start = Some(h.now());
    let (busy, cap) = (h.offload.bays.in_use(), h.offload.bays.capacity());
    h.record(
        "offload_start",
        json!({
            "pid": patient.id.0,
            "busy": busy,
            "cap": cap,
            "minutes": minutes,
            "wait_minutes": patient.arrival_to_offload_minutes(),
        }),
    );
    h.schedule_for(entity, minutes, EventKind::OffloadComplete);
}

/// Applies this hour's staffed bay count and schedules the next change.
pub fn offload_staffing_system(mut h: Hospital, event: Res<CurrentEvent>) {
    if event.0.kind != EventKind::OffloadStaffing {
        return;
    }
    let hour = h.offload.next_hour;
    let target = hourly_value(&h.config.ems.offload_bays_per_hour, hour);
    let granted = h.offload.bays.resize(target);
    for waiter in granted {
        h.schedule_now_for(waiter, EventKind::OffloadBayGranted);
    }
    h.record(
        "offload_staff_set",
        json!({ "hour": hour % 24, "day": hour / 24, "nurses": target }),
    );
    tracing::debug!(hour, target, capacity = h.offload.bays.capacity(), "offload staffing");

    h.offload.next_hour = hour + 1;
    h.clock
        .schedule_at((hour + 1) * ONE_HOUR_MS, EventKind::OffloadStaffing, None);
}

pub fn offload_bay_granted_system(
    mut h: Hospital,
    event: Res<CurrentEvent>,
    mut patients: Query<&mut Patient>,
) {
    if event.0.kind != EventKind::OffloadBayGranted {
        return;
    }
    let Some(EventSubject::Patient(entity)) = event.0.subject else {
        return;
    };
    let Ok(mut patient) = patients.get_mut(entity) else {
        return;
    };
    start_offload(&mut h, entity, &mut patient);
}

/// Frees the bay, then places the patient: download holding for direct or
/// critical patients when it has room, the download waitlist for critical
/// patients when it is full, otherwise the acute queue.
pub fn offload_complete_system(
    mut h: Hospital,
    event: Res<CurrentEvent>,
    mut patients: Query<&mut Patient>,
) {
    if event.0.kind != EventKind::OffloadComplete {
        return;
    }
    let Some(EventSubject::Patient(entity)) = event.0.subject else {
        return;
    };
    let Ok(mut patient) = patients.get_mut(entity) else {
        return;
    };

    if let Some(next) = h.offload.bays.release() {
        h.schedule_now_for(next, EventKind::OffloadBayGranted);
    }
    patient.timeline.offload_end = Some(h.now());
    let (busy, cap) = (h.offload.bays.in_use(), h.offload.bays.capacity());
    h.record(
        "offload_end",
        json!({ "pid": patient.id.0, "busy": busy, "cap": cap }),
    );

    let wants_download = patient.ems_direct || patient.is_critical;
    if wants_download && h.place_in_download(entity, &mut patient) {
        h.start_crew_clear(entity);
        return;
    }
    if patient.is_critical {
        h.download.waitlist.push_back(entity);
        patient.crew_awaiting_download = true;
        let qlen = h.download.waitlist.len();
        h.record(
            "download_wait",
            json!({ "pid": patient.id.0, "qlen": qlen }),
        );
        return;
    }
    h.enqueue(entity, &patient);
    h.start_crew_clear(entity);
}

pub fn crew_clear_system(
    mut h: Hospital,
    event: Res<CurrentEvent>,
    mut patients: Query<&mut Patient>,
) {
    if event.0.kind != EventKind::CrewClear {
        return;
    }
    let Some(EventSubject::Patient(entity)) = event.0.subject else {
        return;
    };
    let Ok(mut patient) = patients.get_mut(entity) else {
        return;
    };
    patient.timeline.ems_clear = Some(h.now());
    h.record(
        "ems_clear",
        json!({
            "pid": patient.id.0,
            "offload_to_clear_minutes": patient.offload_to_clear_minutes(),
            "ems_total_minutes": patient.ems_total_minutes(),
        }),
    );
}
