//! CSV export of run results: one row per patient, the event log, the
//! hourly arrival summary and per-doctor patient traces. All times are
//! minutes of simulated time.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use bevy_ecs::prelude::World;
use serde::Serialize;
use serde_json::Value;

use crate::clock::ms_to_minutes;
use crate::ecs::{Disposition, Patient, Touch, TreatmentStream};
use crate::error::ExportError;
use crate::telemetry::{hourly_arrivals, EventLog, HourlyArrivals};

pub const PATIENTS_FILE: &str = "patients.csv";
pub const EVENTS_FILE: &str = "events.csv";
pub const HOURLY_FILE: &str = "summary_hourly.csv";
pub const DOCTOR_TRACES_FILE: &str = "doctor_patient_traces.csv";

/// Every patient record in the world, ordered by id.
pub fn collect_patients(world: &mut World) -> Vec<Patient> {
    let mut patients: Vec<Patient> = world.query::<&Patient>().iter(world).cloned().collect();
    patients.sort_by_key(|patient| patient.id);
    patients
}

/// Flat per-patient row.
#[derive(Debug, Serialize)]
pub struct PatientRow {
    pub pid: u64,
    pub channel: &'static str,
    pub ctas: u8,
    pub age: u32,
    pub temperature: f64,
    pub o2_saturation: f64,
    pub systolic_bp: f64,
    pub gcs: u32,
    pub complaint_code: u32,
    pub is_trauma: u8,
    pub is_mental_health: u8,
    pub acuity: f64,
    pub acuity_bonus: f64,
    pub one_touch: u8,
    pub two_touch: u8,
    pub three_touch: u8,
    pub lwbs_threshold_minutes: f64,
    pub area: String,
    pub mode: &'static str,
    pub fast_track: u8,
    pub ems_direct: u8,
    pub is_critical: u8,
    pub requires_lab: u8,
    pub requires_di: u8,
    pub di_modality: Option<String>,
    pub lab_is_critical: u8,
    pub lab_minutes: Option<f64>,
    pub nurse_assess_minutes: Option<f64>,
    pub reassessments: u8,
    pub doctor: Option<String>,
    pub disposition: Option<&'static str>,
    pub lwbs: u8,
    pub arrival_time: f64,
    pub offload_start: Option<f64>,
    pub offload_end: Option<f64>,
    pub download_start: Option<f64>,
    pub download_end: Option<f64>,
    pub ems_clear_time: Option<f64>,
    pub treatment_start: Option<f64>,
    pub bed_start: Option<f64>,
    pub bed_end: Option<f64>,
    pub nurse_assess_start: Option<f64>,
    pub nurse_assess_end: Option<f64>,
    pub lab_start: Option<f64>,
    pub lab_end: Option<f64>,
    pub di_start: Option<f64>,
    pub di_end: Option<f64>,
    pub reassess_start: Option<f64>,
    pub reassess_end: Option<f64>,
    pub disposition_time: Option<f64>,
    pub los_minutes: Option<f64>,
    pub arrival_to_offload_minutes: Option<f64>,
    pub download_minutes: Option<f64>,
    pub ems_total_minutes: Option<f64>,
    pub consult_ordered: u8,
    pub consult_count: u8,
    pub consult_minutes_total: f64,
    pub consult_units: String,
    pub consult_admit: u8,
    pub admitted: u8,
    pub admit_service: Option<String>,
    pub admit_unit: Option<String>,
    pub admit_decision_time: Option<f64>,
    pub inpatient_start: Option<f64>,
    pub inpatient_end: Option<f64>,
    pub inpatient_los_minutes: Option<f64>,
    pub boarding_minutes: Option<f64>,
}

fn minutes(ms: Option<u64>) -> Option<f64> {
    ms.map(ms_to_minutes)
}

fn disposition_label(disposition: Disposition) -> &'static str {
    match disposition {
        Disposition::Discharged => "discharged",
        Disposition::LeftWithoutBeingSeen => "lwbs",
        Disposition::TransferredToInpatient => "transferred",
    }
}

impl From<&Patient> for PatientRow {
    fn from(p: &Patient) -> Self {
        let t = &p.timeline;
        Self {
            pid: p.id.0,
            channel: if p.is_ems() { "ems" } else { "walk_in" },
            ctas: p.ctas,
            age: p.clinical.age,
            temperature: p.clinical.temperature,
            o2_saturation: p.clinical.o2_saturation,
            systolic_bp: p.clinical.systolic_bp,
            gcs: p.clinical.gcs,
            complaint_code: p.clinical.complaint_code,
            is_trauma: p.clinical.is_trauma.into(),
            is_mental_health: p.clinical.is_mental_health.into(),
            acuity: p.acuity,
            acuity_bonus: p.acuity_bonus,
            one_touch: (p.touch == Touch::One).into(),
            two_touch: (p.touch == Touch::Two).into(),
            three_touch: (p.touch == Touch::Three).into(),
            lwbs_threshold_minutes: p.lwbs_threshold_minutes,
            area: p.area.clone(),
            mode: p.stream.mode_label(),
            fast_track: (p.stream == TreatmentStream::FastTrack).into(),
            ems_direct: p.ems_direct.into(),
            is_critical: p.is_critical.into(),
            requires_lab: p.orders.requires_lab.into(),
            requires_di: p.orders.requires_di.into(),
            di_modality: p.orders.di_modality.clone(),
            lab_is_critical: p.lab_is_critical.into(),
            lab_minutes: p.lab_minutes,
            nurse_assess_minutes: p.nurse_assess_minutes,
            reassessments: p.reassessments,
            doctor: p.doctor.clone(),
            disposition: p.disposition.map(disposition_label),
            lwbs: p.lwbs().into(),
            arrival_time: ms_to_minutes(t.arrival),
            offload_start: minutes(t.offload_start),
            offload_end: minutes(t.offload_end),
            download_start: minutes(t.download_start),
            download_end: minutes(t.download_end),
            ems_clear_time: minutes(t.ems_clear),
            treatment_start: minutes(t.treatment_start),
            bed_start: minutes(t.bed_start),
            bed_end: minutes(t.bed_end),
            nurse_assess_start: minutes(t.nurse_assess_start),
            nurse_assess_end: minutes(t.nurse_assess_end),
            lab_start: minutes(t.lab_start),
            lab_end: minutes(t.lab_end),
            di_start: minutes(t.di_start),
            di_end: minutes(t.di_end),
            reassess_start: minutes(t.reassess_start),
            reassess_end: minutes(t.reassess_end),
            disposition_time: minutes(t.disposition),
            los_minutes: p.los_minutes(),
            arrival_to_offload_minutes: p.arrival_to_offload_minutes(),
            download_minutes: p.download_minutes(),
            ems_total_minutes: p.ems_total_minutes(),
            consult_ordered: p.consults.ordered.into(),
            consult_count: p.consults.count,
            consult_minutes_total: p.consults.minutes_total,
            consult_units: p.consults.services.join(";"),
            consult_admit: p.consults.admit.into(),
            admitted: p.admission.admitted.into(),
            admit_service: p.admission.service.clone(),
            admit_unit: p.admission.unit.clone(),
            admit_decision_time: minutes(p.admission.decision),
            inpatient_start: minutes(p.admission.inpatient_start),
            inpatient_end: minutes(p.admission.inpatient_end),
            inpatient_los_minutes: p.admission.los_minutes,
            boarding_minutes: p.boarding_minutes(),
        }
    }
}

/// One patient's passage through a doctor's panel.
#[derive(Debug, Serialize)]
pub struct DoctorTraceRow {
    pub doctor: String,
    pub pid: u64,
    pub area: String,
    pub mode: &'static str,
    pub arrival_time: f64,
    pub bed_start: Option<f64>,
    pub bed_end: Option<f64>,
    pub disposition: Option<&'static str>,
    pub disposition_time: Option<f64>,
}

/// Trace rows for every patient a doctor signed up for, grouped by doctor
/// and ordered by bed start within each doctor.
pub fn doctor_traces(patients: &[Patient]) -> Vec<DoctorTraceRow> {
    let mut seen: Vec<&Patient> = patients.iter().filter(|p| p.doctor.is_some()).collect();
    seen.sort_by(|a, b| {
        a.doctor
            .cmp(&b.doctor)
            .then_with(|| a.timeline.bed_start.cmp(&b.timeline.bed_start))
            .then_with(|| a.id.cmp(&b.id))
    });
    seen.into_iter()
        .map(|p| DoctorTraceRow {
            doctor: p.doctor.clone().unwrap_or_default(),
            pid: p.id.0,
            area: p.area.clone(),
            mode: p.stream.mode_label(),
            arrival_time: ms_to_minutes(p.timeline.arrival),
            bed_start: minutes(p.timeline.bed_start),
            bed_end: minutes(p.timeline.bed_end),
            disposition: p.disposition.map(disposition_label),
            disposition_time: minutes(p.timeline.disposition),
        })
        .collect()
}

pub fn write_doctor_traces_csv<P: AsRef<Path>>(
    path: P,
    traces: &[DoctorTraceRow],
) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in traces {
        writer.serialize(row)?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_patients_csv<P: AsRef<Path>>(path: P, patients: &[Patient]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    for patient in patients {
        writer.serialize(PatientRow::from(patient))?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Writes the event log with one column per attribute key seen anywhere in
/// the log; events without a key leave the cell empty.
pub fn write_events_csv<P: AsRef<Path>>(path: P, log: &EventLog) -> Result<(), ExportError> {
    let keys: BTreeSet<&str> = log
        .records()
        .iter()
        .flat_map(|record| record.attrs.keys().map(String::as_str))
        .collect();

    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec!["t", "event"];
    header.extend(keys.iter().copied());
    writer.write_record(&header)?;

    for record in log.records() {
        let mut row = Vec::with_capacity(header.len());
        row.push(record.t.to_string());
        row.push(record.event.to_string());
        row.extend(keys.iter().map(|key| cell(record.attr(key))));
        writer.write_record(&row)?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_hourly_csv<P: AsRef<Path>>(
    path: P,
    hourly: &[HourlyArrivals],
) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in hourly {
        writer.serialize(row)?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Writes all four tables into `dir`, creating it if needed. Returns the
/// paths written.
pub fn write_run_outputs(
    dir: &Path,
    patients: &[Patient],
    log: &EventLog,
) -> Result<Vec<PathBuf>, ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let patients_path = dir.join(PATIENTS_FILE);
    let events_path = dir.join(EVENTS_FILE);
    let hourly_path = dir.join(HOURLY_FILE);
    let traces_path = dir.join(DOCTOR_TRACES_FILE);

    write_patients_csv(&patients_path, patients)?;
    write_events_csv(&events_path, log)?;
    write_hourly_csv(&hourly_path, &hourly_arrivals(patients))?;
    write_doctor_traces_csv(&traces_path, &doctor_traces(patients))?;
    Ok(vec![patients_path, events_path, hourly_path, traces_path])
}
