//! Arrival generation: hourly Poisson batches per stream, then one patient
//! entity per arrival event.

use bevy_ecs::prelude::{Commands, Entity, Res, ResMut};
use rand::Rng;
use serde_json::json;

use crate::capacity::Grant;
use crate::clock::{minutes_to_ms, CurrentEvent, EventKind, EventSubject, ONE_HOUR_MS};
use crate::distributions::{chance, poisson_count};
use crate::ecs::{ArrivalChannel, Patient, Touch, TreatmentStream};
use crate::generation::{
    choose_acute_area, draw_ems_ctas, generate_patient, Intake, PatientIdAllocator,
};
use crate::hospital::Hospital;
use crate::patterns::hourly_value;
use crate::systems::offload::start_offload;

/// Starts the recurring processes: offload staffing, the arrival streams and
/// both dispatch loops.
pub fn simulation_started_system(mut h: Hospital, event: Res<CurrentEvent>) {
    if event.0.kind != EventKind::SimulationStarted {
        return;
    }
    let now = h.now();
    let ems_enabled = h.config.ems.enabled;
    let fast_track = h.config.fast_track_active();

    if ems_enabled {
        h.clock.schedule_at(now, EventKind::OffloadStaffing, None);
    }
    h.clock.schedule_at(
        now,
        EventKind::ArrivalHour,
        Some(EventSubject::Stream(ArrivalChannel::WalkIn)),
    );
    if ems_enabled {
        h.clock.schedule_at(
            now,
            EventKind::ArrivalHour,
            Some(EventSubject::Stream(ArrivalChannel::Ems)),
        );
    }
    h.clock.schedule_at(now, EventKind::AcuteDispatch, None);
    if fast_track {
        h.clock.schedule_at(now, EventKind::FastTrackDispatch, None);
    }
    tracing::info!(ems_enabled, fast_track, "simulation started");
}

/// Draws this hour's arrival count for one stream and spreads the arrivals
/// uniformly over the hour.
pub fn arrival_hour_system(mut h: Hospital, event: Res<CurrentEvent>) {
    if event.0.kind != EventKind::ArrivalHour {
        return;
    }
    let Some(EventSubject::Stream(channel)) = event.0.subject else {
        return;
    };
    let now = h.now();
    let hour = now / ONE_HOUR_MS;
    let rate = match channel {
        ArrivalChannel::WalkIn => hourly_value(&h.config.arrivals.walk_in_hourly_rate, hour),
        ArrivalChannel::Ems => hourly_value(&h.config.ems.hourly_rate, hour),
    };
    let count = poisson_count(&mut h.rng.0, rate);

    let mut offsets: Vec<u64> = (0..count)
        .map(|_| minutes_to_ms(h.rng.0.gen_range(0.0..60.0)))
        .collect();
    offsets.sort_unstable();
    let hour_start = hour * ONE_HOUR_MS;
    for offset in offsets {
        h.clock.schedule_at(
            hour_start + offset.min(ONE_HOUR_MS - 1),
            EventKind::PatientArrival,
            Some(EventSubject::Stream(channel)),
        );
    }
    tracing::debug!(?channel, hour, rate, count, "arrival hour");

    h.clock.schedule_at(
        (hour + 1) * ONE_HOUR_MS,
        EventKind::ArrivalHour,
        Some(EventSubject::Stream(channel)),
    );
}

/// Creates the patient for one arrival and sends them to triage routing
/// (walk-ins) or the offload bay (ambulances).
pub fn patient_arrival_system(
    mut commands: Commands,
    mut h: Hospital,
    mut ids: ResMut<PatientIdAllocator>,
    event: Res<CurrentEvent>,
) {
    if event.0.kind != EventKind::PatientArrival {
        return;
    }
    let Some(EventSubject::Stream(channel)) = event.0.subject else {
        return;
    };
    let entity = commands.spawn_empty().id();
    let patient = admit_arrival(&mut h, entity, ids.next_id(), channel);
    commands.entity(entity).insert(patient);
}

fn route_walk_in(h: &mut Hospital) -> (String, TreatmentStream) {
    let areas: Vec<String> = h.beds.acute_areas().map(str::to_string).collect();
    let acute_area = choose_acute_area(&areas, &mut h.rng.0).unwrap_or_default();
    if !h.config.fast_track_active() {
        return (acute_area, TreatmentStream::Acute);
    }
    let p = h.config.fast_track_route_probability();
    match h.beds.fast_track_name().map(str::to_string) {
        Some(name) if chance(&mut h.rng.0, p) => (name, TreatmentStream::FastTrack),
        _ => (acute_area, TreatmentStream::Acute),
    }
}

fn admit_arrival(
    h: &mut Hospital,
    entity: Entity,
    id: crate::ecs::PatientId,
    channel: ArrivalChannel,
) -> Patient {
    let intake = match channel {
        ArrivalChannel::WalkIn => {
            let (area, stream) = route_walk_in(h);
            Intake {
                channel,
                ctas: h.config.triage.walk_in_ctas,
                area,
                stream,
                ems_direct: false,
                is_critical: false,
            }
        }
        ArrivalChannel::Ems => {
            let ctas = draw_ems_ctas(&h.config, &mut h.rng.0);
            let is_critical = chance(&mut h.rng.0, h.config.ems.p_critical);
            let ems_direct = chance(&mut h.rng.0, h.config.ems.p_direct_to_bed);
            let areas: Vec<String> = h.beds.acute_areas().map(str::to_string).collect();
            Intake {
                channel,
                ctas,
                area: choose_acute_area(&areas, &mut h.rng.0).unwrap_or_default(),
                stream: TreatmentStream::Acute,
                ems_direct,
                is_critical,
            }
        }
    };

    let lwbs_draw = match channel {
        ArrivalChannel::Ems => h
            .config
            .ems
            .lwbs_threshold
            .clone()
            .unwrap_or_else(|| h.config.arrivals.lwbs_threshold.clone()),
        ArrivalChannel::WalkIn => h.config.arrivals.lwbs_threshold.clone(),
    };
    let now = h.now();
    let (mut patient, base) =
        generate_patient(id, intake, &h.config, &lwbs_draw, &mut h.rng.0, now);

    h.record(
        "arrival",
        json!({
            "pid": patient.id.0,
            "channel": patient.channel,
            "ctas": patient.ctas,
            "acuity": patient.acuity,
            "area": patient.area,
            "mode": patient.stream.mode_label(),
            "is_ems": patient.is_ems(),
            "ems_direct": patient.ems_direct,
            "is_critical": patient.is_critical,
        }),
    );
    h.record(
        "lwbs_set",
        json!({
            "pid": patient.id.0,
            "base_minutes": base,
            "threshold_minutes": patient.lwbs_threshold_minutes,
            "acuity": patient.acuity,
        }),
    );
    h.record(
        "touch_assigned",
        json!({ "pid": patient.id.0, "touch": patient.touch.label() }),
    );
    h.record(
        "orders_on_arrival",
        json!({
            "pid": patient.id.0,
            "requires_lab": patient.orders.requires_lab,
            "requires_di": patient.orders.requires_di,
            "di_modality": patient.orders.di_modality,
        }),
    );

    match channel {
        ArrivalChannel::WalkIn => {
            if patient.touch == Touch::Three && patient.stream == TreatmentStream::FastTrack {
                let areas: Vec<String> = h.beds.acute_areas().map(str::to_string).collect();
                patient.area = choose_acute_area(&areas, &mut h.rng.0).unwrap_or_default();
                patient.stream = TreatmentStream::Acute;
                h.record(
                    "route_override",
                    json!({
                        "pid": patient.id.0,
                        "reason": "three_touch_force_acute_reroute",
                        "new_area": patient.area,
                    }),
                );
            }
            h.enqueue(entity, &patient);
            h.record(
                "route",
                json!({
                    "pid": patient.id.0,
                    "area": patient.area,
                    "mode": patient.stream.mode_label(),
                }),
            );
        }
        ArrivalChannel::Ems => match h.offload.bays.request(entity) {
            Grant::Granted => start_offload(h, entity, &mut patient),
            Grant::Queued => {
                tracing::debug!(pid = patient.id.0, waiting = h.offload.bays.waiting(), "offload bay queued");
            }
        },
    }
    patient
}
