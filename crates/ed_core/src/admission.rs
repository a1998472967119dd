//! Inpatient admission: unit resolution, waitlisting, transfer and the bed
//! handover on unit discharge.

use bevy_ecs::prelude::Entity;
use serde_json::json;

use crate::clock::EventKind;
use crate::distributions::draw_or;
use crate::ecs::{Disposition, Patient, TreatmentStream};
use crate::hospital::Hospital;

/// Length of stay used when the unit's draw fails.
const LOS_FALLBACK_MINUTES: f64 = 1440.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// A unit bed was free; the patient left the ED now.
    Transferred,
    /// Boarding in the ED until a unit bed frees up.
    Waitlisted,
    /// No unit with beds for this service.
    Failed,
}

/// Requests an inpatient bed for `service`.
pub fn request_admission(
    h: &mut Hospital,
    entity: Entity,
    patient: &mut Patient,
    service: &str,
) -> AdmitOutcome {
    let Some(unit_name) = h.inpatient.resolve_unit(service) else {
        let unit = h.inpatient.mapped_unit(service);
        tracing::warn!(pid = patient.id.0, service, unit = %unit, "no inpatient unit can admit");
        h.record(
            "admit_failed_no_unit",
            json!({ "pid": patient.id.0, "service": service, "unit": unit }),
        );
        return AdmitOutcome::Failed;
    };

    let now = h.now();
    patient.admission.admitted = true;
    patient.admission.service = Some(service.to_string());
    patient.admission.unit = Some(unit_name.clone());
    patient.admission.decision = Some(now);

    let Some(unit) = h.inpatient.get_mut(&unit_name) else {
        return AdmitOutcome::Failed;
    };
    let (busy, cap) = (unit.beds.in_use(), unit.beds.capacity());
    let has_bed = unit.beds.has_free();
    if !has_bed {
        unit.waitlist.push_back(entity);
    }
    let qlen = unit.waitlist.len();

    h.record(
        "admit_decision",
        json!({
            "pid": patient.id.0,
            "service": service,
            "unit": unit_name,
            "unit_busy": busy,
            "unit_cap": cap,
        }),
    );

    if has_bed {
        start_inpatient_stay(h, entity, patient, &unit_name);
        AdmitOutcome::Transferred
    } else {
        h.signals.create(entity);
        h.record(
            "admit_waitlist_enqueue",
            json!({ "pid": patient.id.0, "unit": unit_name, "qlen": qlen }),
        );
        AdmitOutcome::Waitlisted
    }
}

/// Moves the patient from their ED bed into `unit_name`. The ED bed is freed
/// at this instant and the patient's ED stay ends here.
pub fn start_inpatient_stay(
    h: &mut Hospital,
    entity: Entity,
    patient: &mut Patient,
    unit_name: &str,
) {
    let now = h.now();
    let Some(unit) = h.inpatient.get_mut(unit_name) else {
        return;
    };
    if !unit.beds.try_acquire() {
        tracing::warn!(pid = patient.id.0, unit = unit_name, "transfer without a free unit bed");
        return;
    }
    let (unit_busy, unit_cap) = (unit.beds.in_use(), unit.beds.capacity());
    let los_spec = unit.los.clone();

    patient.admission.inpatient_start = Some(now);

    h.release_bed(patient);
    let (busy, cap) = h.beds.occupancy(patient.stream, &patient.area);
    let release_event = match patient.stream {
        TreatmentStream::FastTrack => "ft_bed_release_on_transfer",
        TreatmentStream::Acute => "acute_bed_release_on_transfer",
    };
    h.record(
        release_event,
        json!({ "pid": patient.id.0, "area": patient.area, "busy": busy, "cap": cap }),
    );
    h.record(
        "admit_transfer",
        json!({
            "pid": patient.id.0,
            "unit": unit_name,
            "busy": unit_busy,
            "cap": unit_cap,
            "emer_inpatient_min": patient.boarding_minutes(),
        }),
    );

    patient.timeline.bed_end = Some(now);
    patient.timeline.disposition = Some(now);
    patient.disposition = Some(Disposition::TransferredToInpatient);

    let los = draw_or(&los_spec, &mut h.rng.0, LOS_FALLBACK_MINUTES, "inpatient_los");
    patient.admission.los_minutes = Some(los);
    h.schedule_for(entity, los, EventKind::InpatientDischarge);

    if h.signals.resolve(entity) {
        h.schedule_now_for(entity, EventKind::TransferCompleted);
    }
}
