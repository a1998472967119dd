use std::collections::BTreeSet;

use crate::error::ConfigError;
use crate::scenario::params::{EdConfig, NurseModelConfig};

const HOURS_PER_DAY: usize = 24;

fn check_profile_length(profile: &'static str, actual: usize) -> Result<(), ConfigError> {
    if actual != HOURS_PER_DAY {
        return Err(ConfigError::ProfileLength {
            profile,
            expected: HOURS_PER_DAY,
            actual,
        });
    }
    Ok(())
}

fn check_rates(profile: &'static str, rates: &[f64]) -> Result<(), ConfigError> {
    check_profile_length(profile, rates.len())?;
    match rates
        .iter()
        .enumerate()
        .find(|(_, rate)| !(rate.is_finite() && **rate >= 0.0))
    {
        Some((hour, value)) => Err(ConfigError::InvalidRate {
            profile,
            hour,
            value: *value,
        }),
        None => Ok(()),
    }
}

impl EdConfig {
    /// Checks the scenario once, before any resource is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.areas.is_empty() {
            return Err(ConfigError::NoAcuteAreas);
        }

        let mut areas = BTreeSet::new();
        for area in &self.areas {
            if !areas.insert(area.name.as_str()) {
                return Err(ConfigError::DuplicateArea(area.name.clone()));
            }
            if area.beds == 0 {
                return Err(ConfigError::EmptyArea(area.name.clone()));
            }
            match area.nurse_model {
                Some(NurseModelConfig::Ratio { beds_per_nurse: 0 }) => {
                    return Err(ConfigError::InvalidNurseModel {
                        area: area.name.clone(),
                        reason: "beds_per_nurse must be positive",
                    });
                }
                Some(NurseModelConfig::Team { nurses: 0 }) => {
                    return Err(ConfigError::InvalidNurseModel {
                        area: area.name.clone(),
                        reason: "team needs at least one nurse",
                    });
                }
                _ => {}
            }
        }

        let fast_track = self.fast_track_active();
        if fast_track && areas.contains(self.fast_track.name.as_str()) {
            return Err(ConfigError::DuplicateArea(self.fast_track.name.clone()));
        }

        check_rates("walk_in_hourly_rate", &self.arrivals.walk_in_hourly_rate)?;
        if self.ems.enabled {
            check_rates("ems_hourly_rate", &self.ems.hourly_rate)?;
            check_profile_length("offload_bays_per_hour", self.ems.offload_bays_per_hour.len())?;
        }

        let mut covered = BTreeSet::new();
        for doctor in &self.doctors {
            let known = areas.contains(doctor.area.as_str()) || doctor.area == self.fast_track.name;
            if !known {
                return Err(ConfigError::UnknownDoctorArea {
                    doctor: doctor.name.clone(),
                    area: doctor.area.clone(),
                });
            }
            if doctor.shift_minutes == 0 || doctor.max_active_panel == 0 {
                return Err(ConfigError::InvalidDoctor(doctor.name.clone()));
            }
            covered.insert(doctor.area.as_str());
        }
        for area in &areas {
            if !covered.contains(area) {
                return Err(ConfigError::MissingDoctorCoverage((*area).to_string()));
            }
        }
        if fast_track && !covered.contains(self.fast_track.name.as_str()) {
            return Err(ConfigError::MissingDoctorCoverage(
                self.fast_track.name.clone(),
            ));
        }

        let mut units = BTreeSet::new();
        for unit in &self.inpatient.units {
            if !units.insert(unit.name.as_str()) {
                return Err(ConfigError::DuplicateUnit(unit.name.clone()));
            }
        }
        for (service, unit) in &self.inpatient.service_to_unit {
            if !units.contains(unit.as_str()) {
                return Err(ConfigError::UnknownServiceUnit {
                    service: service.clone(),
                    unit: unit.clone(),
                });
            }
        }
        if let Some(unit) = &self.inpatient.default_unit {
            if !units.contains(unit.as_str()) {
                return Err(ConfigError::UnknownServiceUnit {
                    service: "default".to_string(),
                    unit: unit.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scenario_is_valid() {
        assert_eq!(EdConfig::default().validate(), Ok(()));
        assert_eq!(EdConfig::default().without_fast_track().validate(), Ok(()));
    }

    #[test]
    fn rejects_short_profiles() {
        let config = EdConfig::default().with_walk_in_rate(vec![1.0; 23]);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ProfileLength {
                profile: "walk_in_hourly_rate",
                expected: 24,
                actual: 23,
            })
        );

        let mut config = EdConfig::default();
        config.ems.offload_bays_per_hour.pop();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ProfileLength {
                profile: "offload_bays_per_hour",
                ..
            })
        ));
        // Ignored when ambulances are off.
        assert_eq!(config.without_ems().validate(), Ok(()));
    }

    #[test]
    fn rejects_negative_rates() {
        let mut rates = vec![2.0; 24];
        rates[7] = -1.0;
        let config = EdConfig::default().with_walk_in_rate(rates);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRate { hour: 7, .. })
        ));
    }

    #[test]
    fn rejects_doctor_in_unknown_area() {
        let mut config = EdConfig::default();
        config.doctors[0].area = "Z".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnknownDoctorArea {
                doctor: config.doctors[0].name.clone(),
                area: "Z".to_string(),
            })
        );
    }

    #[test]
    fn rejects_uncovered_area() {
        let mut config = EdConfig::default();
        let area = config.doctors[0].area.clone();
        config.doctors.retain(|doc| doc.area != area);
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingDoctorCoverage(area))
        );
    }

    #[test]
    fn rejects_zero_panel_doctor() {
        let mut config = EdConfig::default();
        config.doctors[1].max_active_panel = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidDoctor(config.doctors[1].name.clone()))
        );
    }

    #[test]
    fn rejects_mapping_to_unknown_unit() {
        let mut config = EdConfig::default();
        config
            .inpatient
            .service_to_unit
            .insert("Oncology".to_string(), "Ward 9".to_string());
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnknownServiceUnit {
                service: "Oncology".to_string(),
                unit: "Ward 9".to_string(),
            })
        );
    }

    #[test]
    fn rejects_bad_nurse_models() {
        let mut config = EdConfig::default();
        config.areas[0].nurse_model = Some(NurseModelConfig::Team { nurses: 0 });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidNurseModel { .. })
        ));
    }
}
