//! Shared hospital state as one system parameter, plus the small flow steps
//! that several systems need (enqueueing, download holding, panel release).

use bevy_ecs::prelude::{Entity, Res, ResMut};
use bevy_ecs::system::SystemParam;
use serde_json::{json, Value};

use crate::capacity::EdBeds;
use crate::clock::{EventKind, EventSubject, SimulationClock};
use crate::distributions::{draw_or, SimRng};
use crate::doctors::{DoctorId, DoctorRoster};
use crate::ecs::{Patient, TreatmentStream};
use crate::ems::{DownloadHolding, OffloadBays};
use crate::inpatient::InpatientUnits;
use crate::nurses::NurseStaff;
use crate::queues::PatientQueues;
use crate::scenario::EdConfig;
use crate::signal::TransferSignals;
use crate::telemetry::EventLog;

/// Crew turnaround used when the configured draw fails.
const CREW_CLEAR_FALLBACK_MINUTES: f64 = 42.5;

#[derive(SystemParam)]
pub struct Hospital<'w> {
    pub clock: ResMut<'w, SimulationClock>,
    pub log: ResMut<'w, EventLog>,
    pub rng: ResMut<'w, SimRng>,
    pub config: Res<'w, EdConfig>,
    pub beds: ResMut<'w, EdBeds>,
    pub queues: ResMut<'w, PatientQueues>,
    pub download: ResMut<'w, DownloadHolding>,
    pub offload: ResMut<'w, OffloadBays>,
    pub doctors: ResMut<'w, DoctorRoster>,
    pub nurses: ResMut<'w, NurseStaff>,
    pub inpatient: ResMut<'w, InpatientUnits>,
    pub signals: ResMut<'w, TransferSignals>,
}

impl Hospital<'_> {
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn record(&mut self, event: &'static str, attrs: Value) {
        let now = self.clock.now();
        self.log.record(now, event, attrs);
    }

    pub fn schedule_for(&mut self, patient: Entity, minutes: f64, kind: EventKind) {
        self.clock
            .schedule_in_minutes(minutes, kind, Some(EventSubject::Patient(patient)));
    }

    pub fn schedule_now_for(&mut self, patient: Entity, kind: EventKind) {
        self.clock
            .schedule_now(kind, Some(EventSubject::Patient(patient)));
    }

    /// Queues the patient on its stream and starts the abandonment timer.
    pub fn enqueue(&mut self, entity: Entity, patient: &Patient) {
        self.queues.push(patient.stream, entity);
        let qlen = self.queues.len(patient.stream);
        self.record(
            "enqueue",
            json!({
                "pid": patient.id.0,
                "queue": patient.stream.mode_label(),
                "qlen": qlen,
                "area": patient.area,
                "is_ems": patient.is_ems(),
                "ems_direct": patient.in_download_holding(),
            }),
        );
        self.schedule_for(entity, patient.lwbs_threshold_minutes, EventKind::LwbsCheck);
    }

    /// Moves an offloaded patient into download holding and onto the acute
    /// queue. Returns `false` when holding is full.
    pub fn place_in_download(&mut self, entity: Entity, patient: &mut Patient) -> bool {
        if !self.download.spaces.try_acquire() {
            return false;
        }
        patient.timeline.download_start = Some(self.now());
        patient.acuity_bonus += self.config.ems.download_acuity_bonus;
        let (busy, cap) = (
            self.download.spaces.in_use(),
            self.download.spaces.capacity(),
        );
        self.record(
            "download_start",
            json!({ "pid": patient.id.0, "busy": busy, "cap": cap }),
        );
        self.enqueue(entity, patient);
        if patient.crew_awaiting_download {
            patient.crew_awaiting_download = false;
            self.start_crew_clear(entity);
        }
        true
    }

    /// Ends download holding for a patient who just got a bed.
    /// Returns whether a holding space was freed.
    pub fn end_download(&mut self, patient: &mut Patient) -> bool {
        if !patient.in_download_holding() {
            return false;
        }
        patient.timeline.download_end = Some(self.now());
        self.download.spaces.release();
        let (busy, cap) = (
            self.download.spaces.in_use(),
            self.download.spaces.capacity(),
        );
        self.record(
            "download_end",
            json!({
                "pid": patient.id.0,
                "busy": busy,
                "cap": cap,
                "download_minutes": patient.download_minutes(),
            }),
        );
        true
    }

    pub fn start_crew_clear(&mut self, entity: Entity) {
        let minutes = draw_or(
            &self.config.ems.crew_clear_time,
            &mut self.rng.0,
            CREW_CLEAR_FALLBACK_MINUTES,
            "crew_clear",
        );
        self.schedule_for(entity, minutes, EventKind::CrewClear);
    }

    pub fn release_bed(&mut self, patient: &Patient) {
        self.beds.release(patient.stream, &patient.area);
    }

    /// Frees the patient's nurse and wakes whoever inherits it.
    pub fn release_nurse(&mut self, area: &str, patient: &Patient) {
        if let Some(next) = self.nurses.release(area, patient.id) {
            self.schedule_now_for(next, EventKind::NurseGranted);
        }
    }

    pub fn release_doctor(&mut self, patient: &Patient, doctor: DoctorId, stream: TreatmentStream) {
        let panel = self.doctors.release_panel(doctor);
        self.record(
            "doctor_panel_release",
            json!({
                "pid": patient.id.0,
                "area": patient.area,
                "mode": stream.mode_label(),
                "doctor": patient.doctor,
                "doc_active_panel": panel,
            }),
        );
    }
}
