use bevy_ecs::prelude::{Query, Res};
use serde_json::json;

use crate::clock::{CurrentEvent, EventKind, EventSubject};
use crate::ecs::{Disposition, Patient};
use crate::hospital::Hospital;

/// Abandonment timer expiry. Placement wins every race: a patient with a bed,
/// one sitting in download holding, or one already removed from the queue is
/// left alone.
pub fn lwbs_check_system(
    mut h: Hospital,
    event: Res<CurrentEvent>,
    mut patients: Query<&mut Patient>,
) {
    if event.0.kind != EventKind::LwbsCheck {
        return;
    }
    let Some(EventSubject::Patient(entity)) = event.0.subject else {
        return;
    };
    let Ok(mut patient) = patients.get_mut(entity) else {
        return;
    };
    if patient.timeline.bed_start.is_some()
        || patient.in_download_holding()
        || patient.disposition.is_some()
    {
        return;
    }
    if !h.queues.remove(patient.stream, entity) {
        return;
    }

    let now = h.now();
    patient.disposition = Some(Disposition::LeftWithoutBeingSeen);
    patient.timeline.disposition = Some(now);
    h.record(
        "lwbs",
        json!({
            "pid": patient.id.0,
            "area": patient.area,
            "mode": patient.stream.mode_label(),
            "is_ems": patient.is_ems(),
            "waited_minutes": patient.los_minutes(),
            "threshold_minutes": patient.lwbs_threshold_minutes,
        }),
    );
}
