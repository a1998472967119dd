//! Telemetry / KPIs: the domain event log and run summaries built from
//! patient records.

use std::collections::BTreeMap;

use bevy_ecs::prelude::Resource;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::clock::{ms_to_minutes, ONE_HOUR_MS};
use crate::ecs::{Disposition, Patient};

/// One entry of the event log. `t` is in minutes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub t: f64,
    pub event: &'static str,
    #[serde(flatten)]
    pub attrs: Map<String, Value>,
}

impl EventRecord {
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    pub fn pid(&self) -> Option<u64> {
        self.attrs.get("pid").and_then(Value::as_u64)
    }
}

/// Append-only, time-ordered record of everything that happened to patients
/// and resources.
#[derive(Debug, Default, Resource)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    /// Appends an event. `attrs` should be a JSON object; anything else is
    /// stored under a `value` key.
    pub fn record(&mut self, now_ms: u64, event: &'static str, attrs: Value) {
        let attrs = match attrs {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => Map::from_iter([("value".to_string(), other)]),
        };
        tracing::trace!(t = ms_to_minutes(now_ms), event, "event logged");
        self.records.push(EventRecord {
            t: ms_to_minutes(now_ms),
            event,
            attrs,
        });
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn of_kind<'a>(&'a self, event: &'a str) -> impl Iterator<Item = &'a EventRecord> + 'a {
        self.records.iter().filter(move |record| record.event == event)
    }

    pub fn count(&self, event: &str) -> usize {
        self.of_kind(event).count()
    }

    pub fn for_patient(&self, pid: u64) -> impl Iterator<Item = &EventRecord> + '_ {
        self.records
            .iter()
            .filter(move |record| record.pid() == Some(pid))
    }
}

/// Arrivals per absolute hour; the hourly analytics table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyArrivals {
    pub abs_hour: u64,
    pub hour_of_day: u64,
    pub arrivals: u64,
    pub acuity_mean: f64,
}

pub fn hourly_arrivals(patients: &[Patient]) -> Vec<HourlyArrivals> {
    let mut by_hour: BTreeMap<u64, (u64, f64)> = BTreeMap::new();
    for patient in patients {
        let entry = by_hour
            .entry(patient.timeline.arrival / ONE_HOUR_MS)
            .or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += patient.acuity;
    }
    by_hour
        .into_iter()
        .map(|(abs_hour, (arrivals, acuity_sum))| HourlyArrivals {
            abs_hour,
            hour_of_day: abs_hour % 24,
            arrivals,
            acuity_mean: acuity_sum / arrivals as f64,
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub patients: usize,
    pub walk_ins: usize,
    pub ems: usize,
    pub discharged: usize,
    pub lwbs: usize,
    pub transferred: usize,
    pub in_progress: usize,
    pub lwbs_rate: f64,
    pub mean_los_minutes: Option<f64>,
    pub median_los_minutes: Option<f64>,
    pub mean_boarding_minutes: Option<f64>,
    pub consults: usize,
}

impl RunSummary {
    pub fn from_patients(patients: &[Patient]) -> Self {
        let mut summary = Self {
            patients: patients.len(),
            ..Self::default()
        };
        let mut los = Vec::new();
        let mut boarding = Vec::new();
        for patient in patients {
            if patient.is_ems() {
                summary.ems += 1;
            } else {
                summary.walk_ins += 1;
            }
            match patient.disposition {
                Some(Disposition::Discharged) => summary.discharged += 1,
                Some(Disposition::LeftWithoutBeingSeen) => summary.lwbs += 1,
                Some(Disposition::TransferredToInpatient) => summary.transferred += 1,
                None => summary.in_progress += 1,
            }
            if patient.consults.ordered {
                summary.consults += 1;
            }
            if !patient.lwbs() {
                los.extend(patient.los_minutes());
            }
            boarding.extend(patient.boarding_minutes());
        }
        if summary.patients > 0 {
            summary.lwbs_rate = summary.lwbs as f64 / summary.patients as f64;
        }
        summary.mean_los_minutes = mean(&los);
        summary.median_los_minutes = median(&mut los);
        summary.mean_boarding_minutes = mean(&boarding);
        summary
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn log_stores_minutes_and_attributes() {
        let mut log = EventLog::default();
        log.record(90_000, "arrival", json!({ "pid": 1, "area": "A" }));
        log.record(120_000, "route", json!("odd"));

        assert_eq!(log.len(), 2);
        let first = &log.records()[0];
        assert_eq!(first.t, 1.5);
        assert_eq!(first.pid(), Some(1));
        assert_eq!(first.attr("area"), Some(&json!("A")));
        assert_eq!(log.records()[1].attr("value"), Some(&json!("odd")));
        assert_eq!(log.for_patient(1).count(), 1);
    }

    #[test]
    fn median_handles_even_counts() {
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
        assert_eq!(mean(&[1.0, 2.0]), Some(1.5));
    }
}
