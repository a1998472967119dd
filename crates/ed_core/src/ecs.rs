//! Patient components.
//!
//! [Patient] is the full per-patient record: attributes fixed at generation,
//! flow timestamps (milliseconds of simulated time) and the final disposition.
//! [CareEpisode] exists only while a patient occupies an ED bed and carries
//! the treatment machinery state.

use std::fmt;

use bevy_ecs::prelude::Component;
use serde::{Deserialize, Serialize};

use crate::clock::ms_to_minutes;
use crate::doctors::DoctorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatientId(pub u64);

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrivalChannel {
    WalkIn,
    Ems,
}

/// Which bed pool and dispatcher a patient belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreatmentStream {
    Acute,
    FastTrack,
}

impl TreatmentStream {
    pub fn mode_label(self) -> &'static str {
        match self {
            Self::Acute => "ACUTE",
            Self::FastTrack => "FAST",
        }
    }
}

/// Number of clinician touches a patient needs before disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Touch {
    One,
    Two,
    Three,
}

impl Touch {
    pub fn count(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::One => "one_touch",
            Self::Two => "two_touch",
            Self::Three => "three_touch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Discharged,
    LeftWithoutBeingSeen,
    TransferredToInpatient,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalAttributes {
    pub age: u32,
    pub temperature: f64,
    pub o2_saturation: f64,
    pub systolic_bp: f64,
    pub gcs: u32,
    pub complaint_code: u32,
    pub is_trauma: bool,
    pub is_mental_health: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Orders {
    pub requires_lab: bool,
    pub requires_di: bool,
    pub di_modality: Option<String>,
}

/// Flow timestamps in milliseconds. `None` means the stage never happened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientTimeline {
    pub arrival: u64,
    pub offload_start: Option<u64>,
    pub offload_end: Option<u64>,
    pub download_start: Option<u64>,
    pub download_end: Option<u64>,
    pub ems_clear: Option<u64>,
    pub treatment_start: Option<u64>,
    pub bed_start: Option<u64>,
    pub bed_end: Option<u64>,
    pub nurse_assess_start: Option<u64>,
    pub nurse_assess_end: Option<u64>,
    pub lab_start: Option<u64>,
    pub lab_end: Option<u64>,
    pub di_start: Option<u64>,
    pub di_end: Option<u64>,
    pub reassess_start: Option<u64>,
    pub reassess_end: Option<u64>,
    pub consult_start: Option<u64>,
    pub consult_end: Option<u64>,
    pub disposition: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsultRecord {
    pub ordered: bool,
    pub count: u8,
    pub minutes_total: f64,
    pub last_minutes: Option<f64>,
    pub services: Vec<String>,
    pub admit: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdmissionRecord {
    pub admitted: bool,
    pub service: Option<String>,
    pub unit: Option<String>,
    pub decision: Option<u64>,
    pub inpatient_start: Option<u64>,
    pub inpatient_end: Option<u64>,
    pub los_minutes: Option<f64>,
}

#[derive(Debug, Clone, Component, Serialize)]
pub struct Patient {
    pub id: PatientId,
    pub channel: ArrivalChannel,
    pub clinical: ClinicalAttributes,
    pub ctas: u8,
    pub acuity: f64,
    /// Added on entering download holding; ranks alongside `acuity`.
    pub acuity_bonus: f64,
    pub touch: Touch,
    pub lwbs_threshold_minutes: f64,
    pub area: String,
    pub stream: TreatmentStream,
    pub ems_direct: bool,
    pub is_critical: bool,
    pub orders: Orders,
    pub lab_is_critical: bool,
    pub lab_minutes: Option<f64>,
    pub nurse_assess_minutes: Option<f64>,
    pub reassessments: u8,
    pub doctor: Option<String>,
    pub disposition: Option<Disposition>,
    pub timeline: PatientTimeline,
    pub consults: ConsultRecord,
    pub admission: AdmissionRecord,
    /// Crew of a critical patient stays until the patient reaches download holding.
    #[serde(skip)]
    pub crew_awaiting_download: bool,
}

impl Patient {
    pub fn effective_acuity(&self) -> f64 {
        self.acuity + self.acuity_bonus
    }

    pub fn is_ems(&self) -> bool {
        self.channel == ArrivalChannel::Ems
    }

    pub fn lwbs(&self) -> bool {
        self.disposition == Some(Disposition::LeftWithoutBeingSeen)
    }

    pub fn in_download_holding(&self) -> bool {
        self.timeline.download_start.is_some() && self.timeline.download_end.is_none()
    }

    pub fn los_minutes(&self) -> Option<f64> {
        span_minutes(Some(self.timeline.arrival), self.timeline.disposition)
    }

    pub fn arrival_to_offload_minutes(&self) -> Option<f64> {
        span_minutes(Some(self.timeline.arrival), self.timeline.offload_start)
    }

    pub fn offload_to_clear_minutes(&self) -> Option<f64> {
        span_minutes(self.timeline.offload_end, self.timeline.ems_clear)
    }

    pub fn ems_total_minutes(&self) -> Option<f64> {
        span_minutes(Some(self.timeline.arrival), self.timeline.ems_clear)
    }

    pub fn download_minutes(&self) -> Option<f64> {
        span_minutes(self.timeline.download_start, self.timeline.download_end)
    }

    /// Boarding: admit decision to inpatient bed.
    pub fn boarding_minutes(&self) -> Option<f64> {
        span_minutes(self.admission.decision, self.admission.inpatient_start)
    }
}

fn span_minutes(start: Option<u64>, end: Option<u64>) -> Option<f64> {
    match (start, end) {
        (Some(start), Some(end)) => Some(ms_to_minutes(end.saturating_sub(start))),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarePhase {
    Assessment,
    Consult,
    AwaitingNurse,
    /// Concurrent sub-tasks (nurse assessment, labs, fast-track imaging).
    Workup,
    /// Acute imaging runs after the workup join.
    Imaging,
    Reassessment(u8),
    CoreTreatment,
    Boarding,
}

#[derive(Debug, Clone, Component)]
pub struct CareEpisode {
    pub stream: TreatmentStream,
    pub area: String,
    pub doctor: DoctorId,
    pub phase: CarePhase,
    /// Outstanding concurrent sub-tasks in [CarePhase::Workup].
    pub pending: u8,
    pub holds_nurse: bool,
    pub consult_attempts: u8,
    pub consult_service: Option<String>,
}

impl CareEpisode {
    pub fn new(stream: TreatmentStream, area: String, doctor: DoctorId) -> Self {
        Self {
            stream,
            area,
            doctor,
            phase: CarePhase::Assessment,
            pending: 0,
            holds_nurse: false,
            consult_attempts: 0,
            consult_service: None,
        }
    }
}
