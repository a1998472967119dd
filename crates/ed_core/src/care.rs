//! Treatment flow inside an ED bed.
//!
//! Each function runs one step of a patient's care at the current instant
//! and schedules the event that resumes it. Steps never block: a wait is
//! always an event addressed to the patient.
//!
//! Acute: assessment, optional consults (up to two), nursing assessment with
//! concurrent labs, imaging, one or two reassessments, core treatment.
//! Fast-track: assessment, labs and imaging in parallel, optional
//! reassessment, core treatment.

use bevy_ecs::prelude::{Commands, Entity};
use serde_json::json;

use crate::admission::{request_admission, AdmitOutcome};
use crate::capacity::Grant;
use crate::clock::{ms_to_minutes, EventKind};
use crate::distributions::{chance, draw_optional_or, draw_or, pick_weighted};
use crate::doctors::DoctorId;
use crate::ecs::{CareEpisode, CarePhase, Disposition, Patient, Touch, TreatmentStream};
use crate::hospital::Hospital;
use crate::nurses::nurse_assessment_minutes;
use crate::signal::WaitOutcome;

const ASSESS_FALLBACK_MINUTES: f64 = 15.0;
const REASSESS_FALLBACK_MINUTES: f64 = 20.0;
const REASSESS_FLOOR_MINUTES: f64 = 1.0;
const LAB_FALLBACK_MINUTES: f64 = 45.0;
const IMAGING_FALLBACK_MINUTES: f64 = 45.0;
const CONSULT_FALLBACK_MINUTES: f64 = 60.0;
const MAX_CONSULT_ATTEMPTS: u8 = 2;
const ACUTE_CORE_TREATMENT_MINUTES: f64 = 180.0;
const FAST_TRACK_CORE_TREATMENT_MINUTES: f64 = 60.0;

fn doctor_name(patient: &Patient) -> &str {
    patient.doctor.as_deref().unwrap_or("")
}

/// Starts care for a patient who was just given a bed and a doctor.
/// Returns the episode to attach to the patient.
pub fn begin_care(
    h: &mut Hospital,
    entity: Entity,
    patient: &mut Patient,
    stream: TreatmentStream,
    doctor: DoctorId,
) -> CareEpisode {
    let now = h.now();
    let (name, panel) = h
        .doctors
        .get(doctor)
        .map(|doc| (doc.name.clone(), doc.active_panel()))
        .unwrap_or_default();
    patient.doctor = Some(name);
    patient.timeline.treatment_start = Some(now);
    patient.timeline.bed_start = Some(now);

    h.record(
        "treatment_start",
        json!({
            "pid": patient.id.0,
            "area": patient.area,
            "mode": stream.mode_label(),
            "doctor": doctor_name(patient),
            "doc_active_panel": panel,
        }),
    );
    let (busy, cap) = h.beds.occupancy(stream, &patient.area);
    h.record(
        "bed_start",
        json!({
            "pid": patient.id.0,
            "area": patient.area,
            "mode": stream.mode_label(),
            "busy": busy,
            "cap": cap,
            "is_ems": patient.is_ems(),
            "doctor": doctor_name(patient),
            "wait_minutes": ms_to_minutes(now.saturating_sub(patient.timeline.arrival)),
        }),
    );

    let mut episode = CareEpisode::new(stream, patient.area.clone(), doctor);
    start_assessment(h, entity, patient, &mut episode);
    episode
}

fn start_assessment(h: &mut Hospital, entity: Entity, patient: &Patient, episode: &mut CareEpisode) {
    let minutes = match h.doctors.get(episode.doctor) {
        Some(doc) => draw_or(&doc.assess_time, &mut h.rng.0, ASSESS_FALLBACK_MINUTES, "assess"),
        None => ASSESS_FALLBACK_MINUTES,
    };
    episode.phase = CarePhase::Assessment;
    h.record(
        "assess_start",
        json!({
            "pid": patient.id.0,
            "area": episode.area,
            "minutes": minutes,
            "mode": episode.stream.mode_label(),
            "doctor": doctor_name(patient),
            "touch": 1,
        }),
    );
    h.schedule_for(entity, minutes, EventKind::AssessmentComplete);
}

pub fn on_assessment_complete(
    h: &mut Hospital,
    entity: Entity,
    patient: &mut Patient,
    episode: &mut CareEpisode,
) {
    h.record(
        "assess_end",
        json!({
            "pid": patient.id.0,
            "area": episode.area,
            "mode": episode.stream.mode_label(),
            "doctor": doctor_name(patient),
            "touch": 1,
        }),
    );

    let wants_consult = episode.stream == TreatmentStream::Acute
        && patient.touch != Touch::One
        && chance(&mut h.rng.0, h.config.orders.consult_prob);
    if wants_consult {
        patient.consults.ordered = true;
        start_consult(h, entity, patient, episode);
    } else {
        start_workup(h, entity, patient, episode);
    }
}

fn choose_consult_service(h: &mut Hospital) -> String {
    let weights = h.inpatient.consult_weights();
    let total: f64 = weights
        .iter()
        .map(|(_, w)| if w.is_finite() { w.max(0.0) } else { 0.0 })
        .sum();
    if total > 0.0 {
        if let Some(service) = pick_weighted(&weights, &mut h.rng.0) {
            return service.clone();
        }
    }
    h.inpatient.default_consult_service().to_string()
}

fn start_consult(h: &mut Hospital, entity: Entity, patient: &mut Patient, episode: &mut CareEpisode) {
    let service = choose_consult_service(h);
    let consult_time = h
        .inpatient
        .get(&service)
        .and_then(|unit| unit.consult_time.clone());
    let minutes = draw_optional_or(
        consult_time.as_ref(),
        &mut h.rng.0,
        CONSULT_FALLBACK_MINUTES,
        "consult",
    )
    .max(0.0);

    episode.phase = CarePhase::Consult;
    episode.consult_attempts += 1;
    episode.consult_service = Some(service.clone());
    patient.timeline.consult_start = Some(h.now());
    patient.consults.count += 1;
    patient.consults.services.push(service.clone());

    h.record(
        "consult_start",
        json!({
            "pid": patient.id.0,
            "area": episode.area,
            "doctor": doctor_name(patient),
            "service": service,
            "attempt": episode.consult_attempts,
            "minutes": minutes,
        }),
    );
    h.schedule_for(entity, minutes, EventKind::ConsultComplete);
}

/// Ends a consult and applies its admission decision. Returns `true` when
/// the patient left the ED (care is over and the episode must be dropped).
pub fn on_consult_complete(
    h: &mut Hospital,
    entity: Entity,
    patient: &mut Patient,
    episode: &mut CareEpisode,
) -> bool {
    let now = h.now();
    let service = episode.consult_service.take().unwrap_or_default();
    let minutes = patient
        .timeline
        .consult_start
        .map(|start| ms_to_minutes(now.saturating_sub(start)))
        .unwrap_or(0.0);
    patient.timeline.consult_end = Some(now);
    patient.consults.last_minutes = Some(minutes);
    patient.consults.minutes_total += minutes;

    h.record(
        "consult_end",
        json!({
            "pid": patient.id.0,
            "area": episode.area,
            "minutes": minutes,
            "service": service,
            "attempt": episode.consult_attempts,
        }),
    );

    let admit_p = h
        .inpatient
        .get(&service)
        .map(|unit| unit.consult_admit_p)
        .unwrap_or(0.0);
    if chance(&mut h.rng.0, admit_p) {
        patient.consults.admit = true;
        h.record(
            "consult_admit",
            json!({
                "pid": patient.id.0,
                "area": episode.area,
                "service": service,
                "attempt": episode.consult_attempts,
            }),
        );
        let outcome = request_admission(h, entity, patient, &service);
        h.record(
            "admit_requested",
            json!({
                "pid": patient.id.0,
                "service": service,
                "unit": patient.admission.unit,
            }),
        );
        return match outcome {
            AdmitOutcome::Transferred => {
                h.release_doctor(patient, episode.doctor, episode.stream);
                true
            }
            AdmitOutcome::Waitlisted => match h.signals.wait(entity) {
                WaitOutcome::Suspended => {
                    episode.phase = CarePhase::Boarding;
                    false
                }
                WaitOutcome::Resolved | WaitOutcome::Missing => {
                    h.release_doctor(patient, episode.doctor, episode.stream);
                    true
                }
            },
            AdmitOutcome::Failed => {
                patient.consults.admit = false;
                start_workup(h, entity, patient, episode);
                false
            }
        };
    }

    h.record(
        "consult_no_admit",
        json!({
            "pid": patient.id.0,
            "service": service,
            "attempt": episode.consult_attempts,
        }),
    );
    if episode.consult_attempts < MAX_CONSULT_ATTEMPTS {
        start_consult(h, entity, patient, episode);
    } else {
        patient.consults.admit = false;
        start_workup(h, entity, patient, episode);
    }
    false
}

fn start_workup(h: &mut Hospital, entity: Entity, patient: &mut Patient, episode: &mut CareEpisode) {
    episode.phase = CarePhase::Workup;
    episode.pending = 0;
    match episode.stream {
        TreatmentStream::Acute => match h.nurses.request(&episode.area, patient.id, entity) {
            Some(Grant::Granted) => begin_nurse_workup(h, entity, patient, episode),
            Some(Grant::Queued) => episode.phase = CarePhase::AwaitingNurse,
            None => {
                if patient.orders.requires_lab {
                    episode.pending = 1;
                    start_labs(h, entity, patient);
                } else {
                    after_workup(h, entity, patient, episode);
                }
            }
        },
        TreatmentStream::FastTrack => {
            if patient.orders.requires_lab {
                episode.pending += 1;
                start_labs(h, entity, patient);
            }
            if start_imaging(h, entity, patient) {
                episode.pending += 1;
            }
            if episode.pending == 0 {
                after_workup(h, entity, patient, episode);
            }
        }
    }
}

/// Nurse assigned: run the nursing assessment with labs alongside.
pub fn begin_nurse_workup(
    h: &mut Hospital,
    entity: Entity,
    patient: &mut Patient,
    episode: &mut CareEpisode,
) {
    let minutes = nurse_assessment_minutes(patient.acuity, &mut h.rng.0);
    episode.phase = CarePhase::Workup;
    episode.holds_nurse = true;
    episode.pending = 1;
    patient.timeline.nurse_assess_start = Some(h.now());
    h.record(
        "nurse_assess_start",
        json!({ "pid": patient.id.0, "area": episode.area, "minutes": minutes }),
    );
    h.schedule_for(entity, minutes, EventKind::NurseAssessmentComplete);
    if patient.orders.requires_lab {
        episode.pending += 1;
        start_labs(h, entity, patient);
    }
}

fn start_labs(h: &mut Hospital, entity: Entity, patient: &mut Patient) {
    let mut minutes = draw_or(
        &h.config.orders.lab_time,
        &mut h.rng.0,
        LAB_FALLBACK_MINUTES,
        "labs",
    );
    if minutes <= 0.0 {
        minutes = LAB_FALLBACK_MINUTES;
    }
    patient.timeline.lab_start = Some(h.now());
    h.record("lab_start", json!({ "pid": patient.id.0 }));
    h.schedule_for(entity, minutes, EventKind::LabsComplete);
}

/// Starts imaging if ordered. Returns whether an imaging event was scheduled.
fn start_imaging(h: &mut Hospital, entity: Entity, patient: &mut Patient) -> bool {
    if !patient.orders.requires_di {
        return false;
    }
    let Some(modality) = patient.orders.di_modality.clone() else {
        return false;
    };
    let spec = h.config.orders.di_time_by_modality.get(&modality).cloned();
    let mut minutes = draw_optional_or(
        spec.as_ref(),
        &mut h.rng.0,
        IMAGING_FALLBACK_MINUTES,
        "imaging",
    );
    if minutes <= 0.0 {
        minutes = IMAGING_FALLBACK_MINUTES;
    }
    patient.timeline.di_start = Some(h.now());
    h.record(
        "di_start",
        json!({ "pid": patient.id.0, "modality": modality }),
    );
    h.schedule_for(entity, minutes, EventKind::ImagingComplete);
    true
}

pub fn on_labs_complete(
    h: &mut Hospital,
    entity: Entity,
    patient: &mut Patient,
    episode: &mut CareEpisode,
) {
    let now = h.now();
    let minutes = patient
        .timeline
        .lab_start
        .map(|start| ms_to_minutes(now.saturating_sub(start)));
    patient.timeline.lab_end = Some(now);
    patient.lab_minutes = minutes;
    patient.lab_is_critical = chance(&mut h.rng.0, h.config.orders.lab_critical_prob);
    h.record(
        "lab_end",
        json!({
            "pid": patient.id.0,
            "minutes": minutes,
            "critical": patient.lab_is_critical,
        }),
    );
    workup_task_done(h, entity, patient, episode);
}

pub fn on_imaging_complete(
    h: &mut Hospital,
    entity: Entity,
    patient: &mut Patient,
    episode: &mut CareEpisode,
) {
    let now = h.now();
    let minutes = patient
        .timeline
        .di_start
        .map(|start| ms_to_minutes(now.saturating_sub(start)));
    patient.timeline.di_end = Some(now);
    h.record(
        "di_end",
        json!({
            "pid": patient.id.0,
            "modality": patient.orders.di_modality,
            "minutes": minutes,
        }),
    );
    if episode.phase == CarePhase::Imaging {
        start_reassessment(h, entity, patient, episode, 2);
    } else {
        workup_task_done(h, entity, patient, episode);
    }
}

pub fn on_nurse_assessment_complete(
    h: &mut Hospital,
    entity: Entity,
    patient: &mut Patient,
    episode: &mut CareEpisode,
) {
    workup_task_done(h, entity, patient, episode);
}

/// Joins the concurrent workup tasks; the last one to finish moves care on.
fn workup_task_done(
    h: &mut Hospital,
    entity: Entity,
    patient: &mut Patient,
    episode: &mut CareEpisode,
) {
    episode.pending = episode.pending.saturating_sub(1);
    if episode.pending > 0 {
        return;
    }
    if episode.holds_nurse {
        let now = h.now();
        let minutes = patient
            .timeline
            .nurse_assess_start
            .map(|start| ms_to_minutes(now.saturating_sub(start)));
        patient.timeline.nurse_assess_end = Some(now);
        patient.nurse_assess_minutes = minutes;
        h.record(
            "nurse_assess_end",
            json!({ "pid": patient.id.0, "minutes": minutes }),
        );
        episode.holds_nurse = false;
        h.release_nurse(&episode.area, patient);
    }
    after_workup(h, entity, patient, episode);
}

fn after_workup(h: &mut Hospital, entity: Entity, patient: &mut Patient, episode: &mut CareEpisode) {
    match episode.stream {
        TreatmentStream::Acute => {
            if patient.touch == Touch::One {
                episode.phase = CarePhase::CoreTreatment;
                h.schedule_now_for(entity, EventKind::TreatmentComplete);
            } else if start_imaging(h, entity, patient) {
                episode.phase = CarePhase::Imaging;
            } else {
                start_reassessment(h, entity, patient, episode, 2);
            }
        }
        TreatmentStream::FastTrack => {
            if patient.touch == Touch::One {
                start_core_treatment(h, entity, episode);
            } else {
                start_reassessment(h, entity, patient, episode, 2);
            }
        }
    }
}

fn start_reassessment(
    h: &mut Hospital,
    entity: Entity,
    patient: &mut Patient,
    episode: &mut CareEpisode,
    touch: u8,
) {
    let minutes = match h.doctors.get(episode.doctor) {
        Some(doc) => draw_or(
            &doc.reassess_time,
            &mut h.rng.0,
            REASSESS_FALLBACK_MINUTES,
            "reassess",
        )
        .max(REASSESS_FLOOR_MINUTES),
        None => REASSESS_FALLBACK_MINUTES,
    };
    episode.phase = CarePhase::Reassessment(touch);
    patient.timeline.reassess_start = Some(h.now());
    h.record(
        "reassess_start",
        json!({
            "pid": patient.id.0,
            "area": episode.area,
            "minutes": minutes,
            "mode": episode.stream.mode_label(),
            "doctor": doctor_name(patient),
            "touch": touch,
        }),
    );
    h.schedule_for(entity, minutes, EventKind::ReassessmentComplete);
}

pub fn on_reassessment_complete(
    h: &mut Hospital,
    entity: Entity,
    patient: &mut Patient,
    episode: &mut CareEpisode,
) {
    let CarePhase::Reassessment(touch) = episode.phase else {
        return;
    };
    patient.timeline.reassess_end = Some(h.now());
    patient.reassessments += 1;
    h.record(
        "reassess_end",
        json!({
            "pid": patient.id.0,
            "area": episode.area,
            "mode": episode.stream.mode_label(),
            "doctor": doctor_name(patient),
            "touch": touch,
        }),
    );
    if episode.stream == TreatmentStream::Acute && touch == 2 && patient.touch == Touch::Three {
        start_reassessment(h, entity, patient, episode, 3);
    } else {
        start_core_treatment(h, entity, episode);
    }
}

fn start_core_treatment(h: &mut Hospital, entity: Entity, episode: &mut CareEpisode) {
    episode.phase = CarePhase::CoreTreatment;
    let minutes = match episode.stream {
        TreatmentStream::Acute => ACUTE_CORE_TREATMENT_MINUTES,
        TreatmentStream::FastTrack => FAST_TRACK_CORE_TREATMENT_MINUTES,
    };
    h.schedule_for(entity, minutes, EventKind::TreatmentComplete);
}

/// Discharges the patient home: frees the bed and the doctor's panel slot.
/// The caller drops the episode.
pub fn finish_treatment(h: &mut Hospital, patient: &mut Patient, episode: &CareEpisode) {
    let now = h.now();
    patient.timeline.bed_end = Some(now);
    patient.timeline.disposition = Some(now);
    patient.disposition = Some(Disposition::Discharged);
    h.record(
        "bed_end",
        json!({
            "pid": patient.id.0,
            "area": episode.area,
            "is_ems": patient.is_ems(),
            "doctor": doctor_name(patient),
        }),
    );
    h.release_bed(patient);
    let (busy, cap) = h.beds.occupancy(episode.stream, &episode.area);
    h.record(
        "discharge",
        json!({
            "pid": patient.id.0,
            "area": episode.area,
            "busy": busy,
            "cap": cap,
            "is_ems": patient.is_ems(),
            "doctor": doctor_name(patient),
            "los_minutes": patient.los_minutes(),
        }),
    );
    h.release_doctor(patient, episode.doctor, episode.stream);
}

/// Removes the episode once care is over.
pub fn end_episode(commands: &mut Commands, entity: Entity) {
    commands.entity(entity).remove::<CareEpisode>();
}
