//! Patient generation: clinical attributes, acuity scoring, abandonment
//! threshold, touch classification and orders.

use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::distributions::{chance, draw_or, pick_weighted, DrawSpec};
use crate::ecs::{
    AdmissionRecord, ArrivalChannel, ClinicalAttributes, ConsultRecord, Orders, Patient,
    PatientId, PatientTimeline, Touch, TreatmentStream,
};
use crate::scenario::{EdConfig, OrdersConfig, TriageConfig, TriageWeights};

/// Floor on any abandonment threshold, in minutes.
pub const MIN_LWBS_MINUTES: f64 = 5.0;

/// Hands out patient ids, starting at 1.
#[derive(Debug, Default, Resource)]
pub struct PatientIdAllocator {
    last: u64,
}

impl PatientIdAllocator {
    pub fn next_id(&mut self) -> PatientId {
        self.last += 1;
        PatientId(self.last)
    }

    pub fn issued(&self) -> u64 {
        self.last
    }
}

/// Where a new patient is headed and how they arrived.
#[derive(Debug, Clone)]
pub struct Intake {
    pub channel: ArrivalChannel,
    pub ctas: u8,
    pub area: String,
    pub stream: TreatmentStream,
    pub ems_direct: bool,
    pub is_critical: bool,
}

pub fn draw_clinical(triage: &TriageConfig, rng: &mut StdRng) -> ClinicalAttributes {
    let whole = |value: f64| value.max(0.0).round() as u32;
    ClinicalAttributes {
        age: whole(draw_or(&triage.age, rng, 50.0, "age")),
        temperature: draw_or(&triage.temperature, rng, 37.0, "temperature"),
        o2_saturation: draw_or(&triage.o2_saturation, rng, 97.0, "o2_saturation"),
        systolic_bp: draw_or(&triage.systolic_bp, rng, 120.0, "systolic_bp"),
        gcs: whole(draw_or(&triage.gcs, rng, 15.0, "gcs")),
        complaint_code: whole(draw_or(&triage.complaint_code, rng, 1.0, "complaint_code")),
        is_trauma: chance(rng, triage.p_trauma),
        is_mental_health: chance(rng, triage.p_mental_health),
    }
}

/// Weighted acuity score; larger is sicker.
pub fn acuity_score(weights: &TriageWeights, clinical: &ClinicalAttributes, ctas: u8) -> f64 {
    let flags = u8::from(clinical.is_trauma) + u8::from(clinical.is_mental_health);
    weights.age * (f64::from(clinical.age) / 100.0)
        + weights.temperature * ((clinical.temperature - 36.0) / 4.5)
        + weights.o2_saturation * ((100.0 - clinical.o2_saturation) / 20.0)
        + weights.systolic_bp * ((120.0 - clinical.systolic_bp) / 50.0)
        + weights.gcs * ((15.0 - f64::from(clinical.gcs)) / 12.0)
        + weights.complaint * (f64::from(clinical.complaint_code) / 168.0)
        + weights.flags * f64::from(flags)
        + weights.ctas_bonus.get(&ctas).copied().unwrap_or(0.0)
}

/// Sicker patients tolerate less waiting: the base is scaled from 1.4x at
/// acuity 0 down to 0.6x at acuity 2.5 and above.
pub fn lwbs_threshold_minutes(base_minutes: f64, acuity: f64) -> f64 {
    let a = if acuity.is_nan() {
        0.0
    } else {
        acuity.clamp(0.0, 2.5)
    };
    let scale = 1.4 - 0.8 * (a / 2.5);
    (base_minutes * scale).max(MIN_LWBS_MINUTES)
}

/// One-, two- or three-touch classification. Probabilities are clamped and
/// renormalized if they sum past one.
pub fn assign_touch(orders: &OrdersConfig, rng: &mut StdRng) -> Touch {
    let clamp = |p: f64| if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
    let mut p_one = clamp(orders.p_one_touch);
    let mut p_three = clamp(orders.p_three_touch);
    let total = p_one + p_three;
    if total > 1.0 {
        p_one /= total;
        p_three /= total;
    }
    let r: f64 = rng.gen();
    if r < p_one {
        Touch::One
    } else if r < p_one + p_three {
        Touch::Three
    } else {
        Touch::Two
    }
}

pub fn draw_orders(orders: &OrdersConfig, rng: &mut StdRng) -> Orders {
    let requires_lab = chance(rng, orders.lab_prob);
    let mut requires_di = chance(rng, orders.di_prob);
    let modalities: Vec<&String> = orders.di_time_by_modality.keys().collect();
    let di_modality = if requires_di {
        modalities.choose(rng).map(|m| (*m).clone())
    } else {
        None
    };
    if di_modality.is_none() {
        requires_di = false;
    }
    Orders {
        requires_lab,
        requires_di,
        di_modality,
    }
}

/// Uniform pick among acute areas.
pub fn choose_acute_area(areas: &[String], rng: &mut StdRng) -> Option<String> {
    areas.choose(rng).cloned()
}

/// CTAS level for an ambulance arrival from the configured mix.
pub fn draw_ems_ctas(config: &EdConfig, rng: &mut StdRng) -> u8 {
    let mix: Vec<(u8, f64)> = config
        .ems
        .ctas_mix
        .iter()
        .map(|(level, weight)| (*level, *weight))
        .collect();
    pick_weighted(&mix, rng)
        .copied()
        .unwrap_or(config.triage.walk_in_ctas)
}

/// Builds the patient record at the arrival instant. The abandonment base
/// comes from `lwbs_draw` and is returned alongside for logging.
pub fn generate_patient(
    id: PatientId,
    intake: Intake,
    config: &EdConfig,
    lwbs_draw: &DrawSpec,
    rng: &mut StdRng,
    now_ms: u64,
) -> (Patient, f64) {
    let clinical = draw_clinical(&config.triage, rng);
    let acuity = acuity_score(&config.triage.weights, &clinical, intake.ctas);
    let base = draw_or(lwbs_draw, rng, 240.0, "lwbs_threshold");
    let lwbs_threshold_minutes = lwbs_threshold_minutes(base, acuity);
    let touch = assign_touch(&config.orders, rng);
    let orders = draw_orders(&config.orders, rng);

    let patient = Patient {
        id,
        channel: intake.channel,
        clinical,
        ctas: intake.ctas,
        acuity,
        acuity_bonus: 0.0,
        touch,
        lwbs_threshold_minutes,
        area: intake.area,
        stream: intake.stream,
        ems_direct: intake.ems_direct,
        is_critical: intake.is_critical,
        orders,
        lab_is_critical: false,
        lab_minutes: None,
        nurse_assess_minutes: None,
        reassessments: 0,
        doctor: None,
        disposition: None,
        timeline: PatientTimeline {
            arrival: now_ms,
            ..PatientTimeline::default()
        },
        consults: ConsultRecord::default(),
        admission: AdmissionRecord::default(),
        crew_awaiting_download: false,
    };
    (patient, base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn calm_patient() -> ClinicalAttributes {
        ClinicalAttributes {
            age: 50,
            temperature: 36.0,
            o2_saturation: 100.0,
            systolic_bp: 120.0,
            gcs: 15,
            complaint_code: 0,
            is_trauma: false,
            is_mental_health: false,
        }
    }

    #[test]
    fn acuity_combines_weights_and_ctas_bonus() {
        let weights = TriageWeights::default();
        let clinical = calm_patient();
        let score = acuity_score(&weights, &clinical, 3);
        assert!((score - (0.2 * 0.5 + 0.4)).abs() < 1e-12);

        let flagged = ClinicalAttributes {
            is_trauma: true,
            is_mental_health: true,
            ..clinical
        };
        let score = acuity_score(&weights, &flagged, 9);
        assert!((score - (0.1 + 0.8)).abs() < 1e-12);
    }

    #[test]
    fn lwbs_threshold_scales_and_floors() {
        assert!((lwbs_threshold_minutes(100.0, 0.0) - 140.0).abs() < 1e-9);
        assert!((lwbs_threshold_minutes(100.0, 2.5) - 60.0).abs() < 1e-9);
        assert!((lwbs_threshold_minutes(100.0, 10.0) - 60.0).abs() < 1e-9);
        assert_eq!(lwbs_threshold_minutes(1.0, 1.0), MIN_LWBS_MINUTES);
    }

    #[test]
    fn touch_probabilities_renormalize() {
        let mut rng = StdRng::seed_from_u64(2);
        let orders = OrdersConfig {
            p_one_touch: 3.0,
            p_three_touch: 3.0,
            ..OrdersConfig::default()
        };
        for _ in 0..50 {
            assert_ne!(assign_touch(&orders, &mut rng), Touch::Two);
        }
        let all_one = OrdersConfig {
            p_one_touch: 1.0,
            p_three_touch: 0.0,
            ..OrdersConfig::default()
        };
        assert_eq!(assign_touch(&all_one, &mut rng), Touch::One);
    }

    #[test]
    fn imaging_without_modalities_is_dropped() {
        let mut rng = StdRng::seed_from_u64(4);
        let orders = OrdersConfig {
            di_prob: 1.0,
            di_time_by_modality: Default::default(),
            ..OrdersConfig::default()
        };
        let drawn = draw_orders(&orders, &mut rng);
        assert!(!drawn.requires_di);
        assert!(drawn.di_modality.is_none());
    }

    #[test]
    fn ids_start_at_one() {
        let mut ids = PatientIdAllocator::default();
        assert_eq!(ids.next_id(), PatientId(1));
        assert_eq!(ids.next_id(), PatientId(2));
        assert_eq!(ids.issued(), 2);
    }
}
