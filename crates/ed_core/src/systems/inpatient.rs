use bevy_ecs::prelude::{Commands, Query, Res};
use serde_json::json;

use crate::admission::start_inpatient_stay;
use crate::care::end_episode;
use crate::clock::{CurrentEvent, EventKind, EventSubject};
use crate::ecs::{CareEpisode, Patient};
use crate::hospital::Hospital;

/// A boarding patient reached their unit: the ED side of the encounter ends.
pub fn transfer_completed_system(
    mut commands: Commands,
    mut h: Hospital,
    event: Res<CurrentEvent>,
    care_q: Query<(&Patient, &CareEpisode)>,
) {
    if event.0.kind != EventKind::TransferCompleted {
        return;
    }
    let Some(EventSubject::Patient(entity)) = event.0.subject else {
        return;
    };
    let Ok((patient, episode)) = care_q.get(entity) else {
        return;
    };
    h.release_doctor(patient, episode.doctor, episode.stream);
    end_episode(&mut commands, entity);
}

/// End of an inpatient stay. The freed unit bed goes to the head of the
/// unit's waitlist.
pub fn inpatient_discharge_system(
    mut h: Hospital,
    event: Res<CurrentEvent>,
    mut patients: Query<&mut Patient>,
) {
    if event.0.kind != EventKind::InpatientDischarge {
        return;
    }
    let Some(EventSubject::Patient(entity)) = event.0.subject else {
        return;
    };
    let unit_name = {
        let Ok(mut patient) = patients.get_mut(entity) else {
            return;
        };
        let Some(unit_name) = patient.admission.unit.clone() else {
            return;
        };
        patient.admission.inpatient_end = Some(h.now());
        h.record(
            "inpatient_discharge",
            json!({
                "pid": patient.id.0,
                "unit": unit_name,
                "los_minutes": patient.admission.los_minutes,
            }),
        );
        unit_name
    };

    let Some(unit) = h.inpatient.get_mut(&unit_name) else {
        return;
    };
    unit.beds.release();
    loop {
        let next = match h.inpatient.get_mut(&unit_name) {
            Some(unit) if unit.beds.has_free() => unit.waitlist.pop_front(),
            _ => None,
        };
        let Some(next) = next else {
            break;
        };
        let Ok(mut waiting) = patients.get_mut(next) else {
            continue;
        };
        if waiting.admission.inpatient_start.is_some() {
            continue;
        }
        start_inpatient_stay(&mut h, next, &mut waiting, &unit_name);
        break;
    }
}
