//! Event handlers for patients in a bed. Each one resumes the patient's
//! [CareEpisode] through the step functions in [crate::care].

use bevy_ecs::prelude::{Commands, Entity, Query, Res};

use crate::care;
use crate::clock::{CurrentEvent, EventKind, EventSubject};
use crate::ecs::{CareEpisode, CarePhase, Patient};
use crate::hospital::Hospital;

fn subject_patient(event: &CurrentEvent) -> Option<Entity> {
    match event.0.subject {
        Some(EventSubject::Patient(entity)) => Some(entity),
        _ => None,
    }
}

pub fn assessment_complete_system(
    mut h: Hospital,
    event: Res<CurrentEvent>,
    mut care_q: Query<(&mut Patient, &mut CareEpisode)>,
) {
    if event.0.kind != EventKind::AssessmentComplete {
        return;
    }
    let Some(entity) = subject_patient(&event) else {
        return;
    };
    let Ok((mut patient, mut episode)) = care_q.get_mut(entity) else {
        return;
    };
    care::on_assessment_complete(&mut h, entity, &mut patient, &mut episode);
}

pub fn consult_complete_system(
    mut commands: Commands,
    mut h: Hospital,
    event: Res<CurrentEvent>,
    mut care_q: Query<(&mut Patient, &mut CareEpisode)>,
) {
    if event.0.kind != EventKind::ConsultComplete {
        return;
    }
    let Some(entity) = subject_patient(&event) else {
        return;
    };
    let Ok((mut patient, mut episode)) = care_q.get_mut(entity) else {
        return;
    };
    if care::on_consult_complete(&mut h, entity, &mut patient, &mut episode) {
        care::end_episode(&mut commands, entity);
    }
}

/// A nurse slot was handed over by a release; only patients still waiting
/// for one start their nursing assessment.
pub fn nurse_granted_system(
    mut h: Hospital,
    event: Res<CurrentEvent>,
    mut care_q: Query<(&mut Patient, &mut CareEpisode)>,
) {
    if event.0.kind != EventKind::NurseGranted {
        return;
    }
    let Some(entity) = subject_patient(&event) else {
        return;
    };
    let Ok((mut patient, mut episode)) = care_q.get_mut(entity) else {
        return;
    };
    if episode.phase != CarePhase::AwaitingNurse {
        tracing::warn!(pid = patient.id.0, phase = ?episode.phase, "nurse granted outside nurse wait");
        h.release_nurse(&episode.area, &patient);
        return;
    }
    care::begin_nurse_workup(&mut h, entity, &mut patient, &mut episode);
}

/// Completion of any concurrent workup task (nursing assessment, labs, imaging).
pub fn workup_task_system(
    mut h: Hospital,
    event: Res<CurrentEvent>,
    mut care_q: Query<(&mut Patient, &mut CareEpisode)>,
) {
    let Some(entity) = subject_patient(&event) else {
        return;
    };
    let Ok((mut patient, mut episode)) = care_q.get_mut(entity) else {
        return;
    };
    match event.0.kind {
        EventKind::NurseAssessmentComplete => {
            care::on_nurse_assessment_complete(&mut h, entity, &mut patient, &mut episode)
        }
        EventKind::LabsComplete => care::on_labs_complete(&mut h, entity, &mut patient, &mut episode),
        EventKind::ImagingComplete => {
            care::on_imaging_complete(&mut h, entity, &mut patient, &mut episode)
        }
        _ => {}
    }
}

pub fn reassessment_complete_system(
    mut h: Hospital,
    event: Res<CurrentEvent>,
    mut care_q: Query<(&mut Patient, &mut CareEpisode)>,
) {
    if event.0.kind != EventKind::ReassessmentComplete {
        return;
    }
    let Some(entity) = subject_patient(&event) else {
        return;
    };
    let Ok((mut patient, mut episode)) = care_q.get_mut(entity) else {
        return;
    };
    care::on_reassessment_complete(&mut h, entity, &mut patient, &mut episode);
}

/// Core treatment finished: discharge home.
pub fn treatment_complete_system(
    mut commands: Commands,
    mut h: Hospital,
    event: Res<CurrentEvent>,
    mut care_q: Query<(&mut Patient, &mut CareEpisode)>,
) {
    if event.0.kind != EventKind::TreatmentComplete {
        return;
    }
    let Some(entity) = subject_patient(&event) else {
        return;
    };
    let Ok((mut patient, episode)) = care_q.get_mut(entity) else {
        return;
    };
    care::finish_treatment(&mut h, &mut patient, &episode);
    care::end_episode(&mut commands, entity);
}
