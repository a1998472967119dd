use std::collections::BTreeMap;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::clock::{ONE_DAY_MS, ONE_MIN_MS};
use crate::distributions::DrawSpec;
use crate::patterns::{
    ACUTE_SIGNUP_CAPS, EMS_CTAS_MIX, EMS_HOURLY_RATE, FAST_TRACK_SIGNUP_CAPS,
    OFFLOAD_BAYS_PER_HOUR, WALK_IN_HOURLY_RATE,
};

/// Simulation end time in milliseconds. When set, the runner stops processing events
/// once the next event would be at or after this timestamp.
#[derive(Debug, Clone, Copy, Resource)]
pub struct SimulationEndTimeMs(pub u64);

/// Full scenario description. Every optional field falls back to the default
/// scenario through serde, so a partial JSON file is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct EdConfig {
    /// RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Run length; `None` runs until the event queue drains (never, with arrivals on).
    pub end_time_minutes: Option<f64>,
    pub areas: Vec<AreaConfig>,
    pub doctors: Vec<DoctorConfig>,
    pub arrivals: ArrivalsConfig,
    pub ems: EmsConfig,
    pub triage: TriageConfig,
    pub orders: OrdersConfig,
    pub inpatient: InpatientConfig,
    pub fast_track: FastTrackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaConfig {
    pub name: String,
    pub beds: u32,
    #[serde(default)]
    pub nurse_model: Option<NurseModelConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NurseModelConfig {
    /// One nurse per `beds_per_nurse` beds, each with a fixed panel.
    Ratio { beds_per_nurse: u32 },
    /// A shared pool of nurses.
    Team { nurses: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorConfig {
    pub name: String,
    pub area: String,
    /// Minute of day the shift starts; the shift repeats every day.
    #[serde(default)]
    pub start_minute: u32,
    #[serde(default = "full_day_minutes")]
    pub shift_minutes: u32,
    /// Sign-up caps cycled by hour of day. Empty means uncapped.
    #[serde(default)]
    pub hourly_max_signups: Vec<u32>,
    pub max_active_panel: u32,
    pub assess_time: DrawSpec,
    pub reassess_time: DrawSpec,
}

fn full_day_minutes() -> u32 {
    (ONE_DAY_MS / ONE_MIN_MS) as u32
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrivalsConfig {
    /// Walk-in Poisson rate per hour of day (24 entries).
    pub walk_in_hourly_rate: Vec<f64>,
    /// Base abandonment threshold in minutes, scaled by acuity at arrival.
    pub lwbs_threshold: DrawSpec,
    /// Overrides `fast_track.route_probability` for walk-ins.
    pub fast_track_route_probability: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmsConfig {
    pub enabled: bool,
    pub hourly_rate: Vec<f64>,
    /// Weight per CTAS level; normalized at draw time.
    pub ctas_mix: BTreeMap<u8, f64>,
    pub p_critical: f64,
    pub p_direct_to_bed: f64,
    pub download_capacity: u32,
    pub download_acuity_bonus: f64,
    pub offload_service_time: DrawSpec,
    /// Offload bays staffed per hour of day (24 entries).
    pub offload_bays_per_hour: Vec<u32>,
    pub crew_clear_time: DrawSpec,
    /// Overrides `arrivals.lwbs_threshold` for ambulance patients.
    pub lwbs_threshold: Option<DrawSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageWeights {
    pub age: f64,
    pub temperature: f64,
    pub o2_saturation: f64,
    pub systolic_bp: f64,
    pub gcs: f64,
    pub complaint: f64,
    pub flags: f64,
    pub ctas_bonus: BTreeMap<u8, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub weights: TriageWeights,
    pub age: DrawSpec,
    pub temperature: DrawSpec,
    pub o2_saturation: DrawSpec,
    pub systolic_bp: DrawSpec,
    pub gcs: DrawSpec,
    pub complaint_code: DrawSpec,
    pub p_trauma: f64,
    pub p_mental_health: f64,
    /// CTAS assigned to walk-ins.
    pub walk_in_ctas: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrdersConfig {
    pub lab_prob: f64,
    pub lab_critical_prob: f64,
    pub lab_time: DrawSpec,
    pub di_prob: f64,
    /// Imaging modality to duration; the modality is picked uniformly.
    pub di_time_by_modality: BTreeMap<String, DrawSpec>,
    pub consult_prob: f64,
    pub p_one_touch: f64,
    pub p_three_touch: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InpatientUnitConfig {
    pub name: String,
    pub beds: u32,
    pub los: DrawSpec,
    #[serde(default)]
    pub consult_p: f64,
    #[serde(default)]
    pub consult_admit_p: f64,
    #[serde(default)]
    pub consult_time: Option<DrawSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InpatientConfig {
    pub units: Vec<InpatientUnitConfig>,
    /// Consult service to unit. Unmapped services use `default_unit`, then
    /// a unit with the service's own name.
    pub service_to_unit: BTreeMap<String, String>,
    pub default_unit: Option<String>,
    /// Service consulted when no unit carries consult weight.
    pub default_consult_service: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FastTrackConfig {
    pub enabled: bool,
    pub name: String,
    pub assessment_spaces: u32,
    pub route_probability: f64,
}

impl Default for ArrivalsConfig {
    fn default() -> Self {
        Self {
            walk_in_hourly_rate: WALK_IN_HOURLY_RATE.to_vec(),
            lwbs_threshold: DrawSpec::uniform(200.0, 500.0),
            fast_track_route_probability: Some(0.55),
        }
    }
}

impl Default for EmsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hourly_rate: EMS_HOURLY_RATE.to_vec(),
            ctas_mix: EMS_CTAS_MIX.into_iter().collect(),
            p_critical: 0.12,
            p_direct_to_bed: 0.35,
            download_capacity: 6,
            download_acuity_bonus: 0.4,
            offload_service_time: DrawSpec::uniform(5.0, 10.0),
            offload_bays_per_hour: OFFLOAD_BAYS_PER_HOUR.to_vec(),
            crew_clear_time: DrawSpec::uniform(40.0, 50.0),
            lwbs_threshold: Some(DrawSpec::uniform(45.0, 180.0)),
        }
    }
}

impl Default for TriageWeights {
    fn default() -> Self {
        Self {
            age: 0.2,
            temperature: 0.2,
            o2_saturation: -0.3,
            systolic_bp: -0.1,
            gcs: -0.3,
            complaint: 0.2,
            flags: 0.4,
            ctas_bonus: BTreeMap::from([(1, 1.2), (2, 0.8), (3, 0.4), (4, 0.0), (5, -0.2)]),
        }
    }
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            weights: TriageWeights::default(),
            age: DrawSpec::uniform_int(18, 95),
            temperature: DrawSpec::uniform(36.0, 40.5),
            o2_saturation: DrawSpec::uniform(80.0, 100.0),
            systolic_bp: DrawSpec::uniform(70.0, 180.0),
            gcs: DrawSpec::uniform_int(3, 15),
            complaint_code: DrawSpec::uniform_int(1, 168),
            p_trauma: 0.10,
            p_mental_health: 0.12,
            walk_in_ctas: 3,
        }
    }
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            lab_prob: 0.5,
            lab_critical_prob: 0.10,
            lab_time: DrawSpec::uniform(45.0, 120.0),
            di_prob: 0.35,
            di_time_by_modality: BTreeMap::from([
                ("CT".to_string(), DrawSpec::uniform(60.0, 150.0)),
                ("US".to_string(), DrawSpec::uniform(45.0, 120.0)),
                ("Xray".to_string(), DrawSpec::uniform(30.0, 90.0)),
            ]),
            consult_prob: 0.30,
            p_one_touch: 0.25,
            p_three_touch: 0.10,
        }
    }
}

impl Default for InpatientConfig {
    fn default() -> Self {
        let unit = |name: &str, beds, los, consult_p, consult_admit_p, consult_time| {
            InpatientUnitConfig {
                name: name.to_string(),
                beds,
                los,
                consult_p,
                consult_admit_p,
                consult_time: Some(consult_time),
            }
        };
        Self {
            units: vec![
                unit(
                    "Medicine",
                    32,
                    DrawSpec::log_normal(4.4, 0.35, 60.0),
                    0.60,
                    0.95,
                    DrawSpec::uniform(30.0, 90.0),
                ),
                unit(
                    "Surgery",
                    12,
                    DrawSpec::log_normal(4.1, 0.40, 60.0),
                    0.18,
                    0.70,
                    DrawSpec::uniform(30.0, 75.0),
                ),
                unit(
                    "ICU",
                    8,
                    DrawSpec::uniform(1440.0, 7200.0),
                    0.08,
                    0.90,
                    DrawSpec::uniform(45.0, 120.0),
                ),
                unit(
                    "Cardiology",
                    10,
                    DrawSpec::log_normal(4.0, 0.35, 60.0),
                    0.15,
                    0.50,
                    DrawSpec::uniform(30.0, 90.0),
                ),
            ],
            service_to_unit: BTreeMap::new(),
            default_unit: Some("Medicine".to_string()),
            default_consult_service: "Medicine".to_string(),
        }
    }
}

impl Default for FastTrackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: "FAST".to_string(),
            assessment_spaces: 18,
            route_probability: 0.5,
        }
    }
}

impl Default for EdConfig {
    fn default() -> Self {
        let doctor = |name: &str, area: &str, start_minute, caps: Vec<u32>, panel, assess, reassess| {
            DoctorConfig {
                name: name.to_string(),
                area: area.to_string(),
                start_minute,
                shift_minutes: 720,
                hourly_max_signups: caps,
                max_active_panel: panel,
                assess_time: assess,
                reassess_time: reassess,
            }
        };
        Self {
            seed: Some(42),
            end_time_minutes: Some(30.0 * 24.0 * 60.0),
            areas: vec![AreaConfig {
                name: "A".to_string(),
                beds: 12,
                nurse_model: Some(NurseModelConfig::Ratio { beds_per_nurse: 2 }),
            }],
            doctors: vec![
                doctor(
                    "DrA1",
                    "A",
                    0,
                    ACUTE_SIGNUP_CAPS.to_vec(),
                    10,
                    DrawSpec::uniform(12.0, 35.0),
                    DrawSpec::uniform(8.0, 20.0),
                ),
                doctor(
                    "DrB1",
                    "A",
                    720,
                    ACUTE_SIGNUP_CAPS.to_vec(),
                    10,
                    DrawSpec::uniform(12.0, 35.0),
                    DrawSpec::uniform(8.0, 20.0),
                ),
                doctor(
                    "DrFT1",
                    "FAST",
                    0,
                    FAST_TRACK_SIGNUP_CAPS.to_vec(),
                    22,
                    DrawSpec::uniform(5.0, 12.0),
                    DrawSpec::uniform(3.0, 8.0),
                ),
                doctor(
                    "DrFT2",
                    "FAST",
                    720,
                    FAST_TRACK_SIGNUP_CAPS.to_vec(),
                    22,
                    DrawSpec::uniform(5.0, 12.0),
                    DrawSpec::uniform(3.0, 8.0),
                ),
            ],
            arrivals: ArrivalsConfig::default(),
            ems: EmsConfig::default(),
            triage: TriageConfig::default(),
            orders: OrdersConfig::default(),
            inpatient: InpatientConfig::default(),
            fast_track: FastTrackConfig::default(),
        }
    }
}

impl EdConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_end_time_minutes(mut self, minutes: f64) -> Self {
        self.end_time_minutes = Some(minutes);
        self
    }

    pub fn with_days(self, days: f64) -> Self {
        self.with_end_time_minutes(days * 24.0 * 60.0)
    }

    pub fn with_walk_in_rate(mut self, hourly_rate: Vec<f64>) -> Self {
        self.arrivals.walk_in_hourly_rate = hourly_rate;
        self
    }

    pub fn without_ems(mut self) -> Self {
        self.ems.enabled = false;
        self
    }

    pub fn without_fast_track(mut self) -> Self {
        self.fast_track.enabled = false;
        self.doctors.retain(|doc| doc.area != self.fast_track.name);
        self
    }

    /// Whether walk-ins can be routed to fast-track at all.
    pub fn fast_track_active(&self) -> bool {
        self.fast_track.enabled && self.fast_track.assessment_spaces > 0
    }

    /// Walk-in routing probability, preferring the arrival-level override.
    pub fn fast_track_route_probability(&self) -> f64 {
        self.arrivals
            .fast_track_route_probability
            .unwrap_or(self.fast_track.route_probability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: EdConfig = serde_json::from_str(
            r#"{
                "seed": 7,
                "fast_track": { "enabled": false },
                "ems": { "p_critical": 0.5 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.seed, Some(7));
        assert!(!config.fast_track.enabled);
        assert_eq!(config.fast_track.assessment_spaces, 18);
        assert_eq!(config.ems.p_critical, 0.5);
        assert_eq!(config.ems.download_capacity, 6);
        assert_eq!(config.doctors.len(), 4);
    }

    #[test]
    fn route_probability_prefers_arrival_override() {
        let mut config = EdConfig::default();
        assert_eq!(config.fast_track_route_probability(), 0.55);
        config.arrivals.fast_track_route_probability = None;
        assert_eq!(config.fast_track_route_probability(), 0.5);
    }

    #[test]
    fn default_config_round_trips_through_json() {
        let json = serde_json::to_string(&EdConfig::default()).unwrap();
        let back: EdConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.areas[0].beds, 12);
        assert_eq!(back.ems.ctas_mix.get(&3), Some(&0.48));
    }
}
