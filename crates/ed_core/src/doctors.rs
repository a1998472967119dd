//! Physician roster: shifts, hourly sign-up caps and active panels.

use std::collections::BTreeMap;

use bevy_ecs::prelude::Resource;

use crate::clock::{ONE_DAY_MS, ONE_HOUR_MS, ONE_MIN_MS};
use crate::distributions::DrawSpec;
use crate::scenario::DoctorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DoctorId(pub usize);

#[derive(Debug, Clone)]
pub struct Doctor {
    pub name: String,
    pub area: String,
    start_ms: u64,
    shift_ms: u64,
    hourly_max_signups: Vec<u32>,
    max_active_panel: u32,
    active_panel: u32,
    signups_by_hour: BTreeMap<u64, u32>,
    pub assess_time: DrawSpec,
    pub reassess_time: DrawSpec,
}

impl Doctor {
    pub fn from_config(config: &DoctorConfig) -> Self {
        Self {
            name: config.name.clone(),
            area: config.area.clone(),
            start_ms: u64::from(config.start_minute) * ONE_MIN_MS,
            shift_ms: u64::from(config.shift_minutes) * ONE_MIN_MS,
            hourly_max_signups: config.hourly_max_signups.clone(),
            max_active_panel: config.max_active_panel,
            active_panel: 0,
            signups_by_hour: BTreeMap::new(),
            assess_time: config.assess_time.clone(),
            reassess_time: config.reassess_time.clone(),
        }
    }

    pub fn active_panel(&self) -> u32 {
        self.active_panel
    }

    pub fn max_active_panel(&self) -> u32 {
        self.max_active_panel
    }

    /// Sign-ups recorded in the absolute hour containing `now_ms`.
    pub fn signups_in_hour(&self, now_ms: u64) -> u32 {
        self.signups_by_hour
            .get(&(now_ms / ONE_HOUR_MS))
            .copied()
            .unwrap_or(0)
    }

    /// The shift repeats daily from its start minute and may wrap past midnight.
    pub fn is_on_shift(&self, now_ms: u64) -> bool {
        if self.shift_ms >= ONE_DAY_MS {
            return true;
        }
        let day_start = now_ms / ONE_DAY_MS * ONE_DAY_MS;
        let start = day_start + self.start_ms;
        let end = start + self.shift_ms;
        if end <= day_start + ONE_DAY_MS {
            start <= now_ms && now_ms < end
        } else {
            now_ms >= start || now_ms < end - ONE_DAY_MS
        }
    }

    /// Cap for the hour of day, cycling through the configured list.
    /// An empty list means no cap.
    pub fn hourly_cap(&self, now_ms: u64) -> u32 {
        if self.hourly_max_signups.is_empty() {
            return u32::MAX;
        }
        let hour_of_day = (now_ms % ONE_DAY_MS) / ONE_HOUR_MS;
        self.hourly_max_signups[(hour_of_day % self.hourly_max_signups.len() as u64) as usize]
    }

    pub fn can_sign_up(&self, now_ms: u64) -> bool {
        self.is_on_shift(now_ms)
            && self.active_panel < self.max_active_panel
            && self.signups_in_hour(now_ms) < self.hourly_cap(now_ms)
    }

    fn sign_up(&mut self, now_ms: u64) {
        *self.signups_by_hour.entry(now_ms / ONE_HOUR_MS).or_insert(0) += 1;
        self.active_panel += 1;
    }
}

#[derive(Debug, Clone, Default, Resource)]
pub struct DoctorRoster {
    doctors: Vec<Doctor>,
}

impl DoctorRoster {
    pub fn from_configs(configs: &[DoctorConfig]) -> Self {
        Self {
            doctors: configs.iter().map(Doctor::from_config).collect(),
        }
    }

    pub fn get(&self, id: DoctorId) -> Option<&Doctor> {
        self.doctors.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Doctor> {
        self.doctors.iter()
    }

    /// Signs the least-loaded eligible doctor in `area` up for a new patient.
    /// Ties go to the lexicographically smallest name. The sign-up counts
    /// against the doctor's panel and the current hour's cap.
    pub fn try_sign_up(&mut self, area: &str, now_ms: u64) -> Option<DoctorId> {
        let chosen = self
            .doctors
            .iter()
            .enumerate()
            .filter(|(_, doc)| doc.area == area && doc.can_sign_up(now_ms))
            .min_by(|(_, a), (_, b)| {
                a.active_panel
                    .cmp(&b.active_panel)
                    .then_with(|| a.name.cmp(&b.name))
            })
            .map(|(idx, _)| DoctorId(idx))?;
        self.doctors[chosen.0].sign_up(now_ms);
        Some(chosen)
    }

    /// Frees one panel slot. Returns the doctor's panel size after release.
    pub fn release_panel(&mut self, id: DoctorId) -> u32 {
        let Some(doctor) = self.doctors.get_mut(id.0) else {
            return 0;
        };
        if doctor.active_panel == 0 {
            tracing::warn!(doctor = %doctor.name, "panel release with empty panel ignored");
            return 0;
        }
        doctor.active_panel -= 1;
        doctor.active_panel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor(name: &str, start_minute: u32, shift_minutes: u32, caps: Vec<u32>) -> DoctorConfig {
        DoctorConfig {
            name: name.to_string(),
            area: "A".to_string(),
            start_minute,
            shift_minutes,
            hourly_max_signups: caps,
            max_active_panel: 2,
            assess_time: DrawSpec::constant(10.0),
            reassess_time: DrawSpec::constant(5.0),
        }
    }

    #[test]
    fn overnight_shift_wraps_midnight() {
        let doc = Doctor::from_config(&doctor("Night", 22 * 60, 10 * 60, vec![]));
        assert!(doc.is_on_shift(23 * ONE_HOUR_MS));
        assert!(doc.is_on_shift(ONE_DAY_MS + 7 * ONE_HOUR_MS));
        assert!(!doc.is_on_shift(8 * ONE_HOUR_MS));
        assert!(!doc.is_on_shift(21 * ONE_HOUR_MS));
    }

    #[test]
    fn day_shift_end_is_exclusive() {
        let doc = Doctor::from_config(&doctor("Day", 0, 720, vec![]));
        assert!(doc.is_on_shift(0));
        assert!(!doc.is_on_shift(12 * ONE_HOUR_MS));
        assert!(doc.is_on_shift(ONE_DAY_MS + ONE_HOUR_MS));
    }

    #[test]
    fn hourly_cap_blocks_until_next_hour() {
        let mut roster = DoctorRoster::from_configs(&[doctor("Solo", 0, 1440, vec![1])]);
        let t = 30 * ONE_MIN_MS;
        assert_eq!(roster.try_sign_up("A", t), Some(DoctorId(0)));
        roster.release_panel(DoctorId(0));
        assert_eq!(roster.try_sign_up("A", t + ONE_MIN_MS), None);
        assert_eq!(roster.try_sign_up("A", ONE_HOUR_MS), Some(DoctorId(0)));
    }

    #[test]
    fn least_loaded_doctor_wins_with_name_tie_break() {
        let mut roster = DoctorRoster::from_configs(&[
            doctor("Zed", 0, 1440, vec![]),
            doctor("Amy", 0, 1440, vec![]),
        ]);
        assert_eq!(roster.try_sign_up("A", 0), Some(DoctorId(1)));
        assert_eq!(roster.try_sign_up("A", 0), Some(DoctorId(0)));
        assert_eq!(roster.try_sign_up("A", 0), Some(DoctorId(1)));
        assert_eq!(roster.try_sign_up("A", 0), Some(DoctorId(0)));
        // Both panels full.
        assert_eq!(roster.try_sign_up("A", 0), None);
        assert_eq!(roster.release_panel(DoctorId(0)), 1);
        assert_eq!(roster.try_sign_up("B", 0), None);
    }
}
