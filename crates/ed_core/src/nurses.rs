//! Nurse staffing per acute area.
//!
//! Two models: fixed-ratio panels (each patient maps to one panel by id) and
//! a team pool shared by the whole area. Waiting is FIFO in both.

use std::collections::BTreeMap;

use bevy_ecs::prelude::{Entity, Resource};
use rand::rngs::StdRng;
use rand::Rng;

use crate::capacity::{Grant, WaitingPool};
use crate::ecs::PatientId;
use crate::scenario::NurseModelConfig;

#[derive(Debug, Clone)]
pub enum NurseModel {
    Ratio(Vec<WaitingPool>),
    Team(WaitingPool),
}

impl NurseModel {
    pub fn from_config(config: &NurseModelConfig, beds: u32) -> Self {
        match *config {
            NurseModelConfig::Ratio { beds_per_nurse } => {
                let panels = (beds / beds_per_nurse.max(1)).max(1);
                Self::Ratio((0..panels).map(|_| WaitingPool::new(1)).collect())
            }
            NurseModelConfig::Team { nurses } => Self::Team(WaitingPool::new(nurses)),
        }
    }

    fn pool_for(&mut self, patient: PatientId) -> &mut WaitingPool {
        match self {
            Self::Ratio(panels) => {
                let idx = (patient.0 % panels.len() as u64) as usize;
                &mut panels[idx]
            }
            Self::Team(pool) => pool,
        }
    }

    pub fn busy_nurses(&self) -> u32 {
        match self {
            Self::Ratio(panels) => panels.iter().map(WaitingPool::in_use).sum(),
            Self::Team(pool) => pool.in_use(),
        }
    }

    pub fn nurse_count(&self) -> u32 {
        match self {
            Self::Ratio(panels) => panels.len() as u32,
            Self::Team(pool) => pool.capacity(),
        }
    }
}

#[derive(Debug, Clone, Default, Resource)]
pub struct NurseStaff {
    areas: BTreeMap<String, NurseModel>,
}

impl NurseStaff {
    pub fn new(areas: BTreeMap<String, NurseModel>) -> Self {
        Self { areas }
    }

    pub fn has_model(&self, area: &str) -> bool {
        self.areas.contains_key(area)
    }

    pub fn model(&self, area: &str) -> Option<&NurseModel> {
        self.areas.get(area)
    }

    /// `None` when the area has no nurse model; the nurse step is skipped.
    pub fn request(&mut self, area: &str, patient: PatientId, who: Entity) -> Option<Grant> {
        let model = self.areas.get_mut(area)?;
        Some(model.pool_for(patient).request(who))
    }

    /// Returns the waiter now holding the released nurse, if any.
    pub fn release(&mut self, area: &str, patient: PatientId) -> Option<Entity> {
        let model = self.areas.get_mut(area)?;
        model.pool_for(patient).release()
    }
}

/// Nurse assessment minutes: a band around a target that climbs from 5 to
/// 120 minutes as acuity goes from 0 to 2.5.
pub fn nurse_assessment_minutes(acuity: f64, rng: &mut StdRng) -> f64 {
    let acuity = if acuity.is_nan() {
        0.0
    } else {
        acuity.clamp(0.0, 2.5)
    };
    let target = 5.0 + acuity / 2.5 * 115.0;
    let low = (0.75 * target).max(5.0);
    let high = (1.25 * target).min(120.0);
    rng.gen_range(low..=high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::world::World;
    use rand::SeedableRng;

    #[test]
    fn ratio_model_maps_patients_to_panels() {
        let mut world = World::new();
        let a = world.spawn_empty().id();
        let b = world.spawn_empty().id();
        let c = world.spawn_empty().id();

        let model = NurseModel::from_config(&NurseModelConfig::Ratio { beds_per_nurse: 2 }, 4);
        assert_eq!(model.nurse_count(), 2);
        let mut staff = NurseStaff::new(BTreeMap::from([("A".to_string(), model)]));

        // Ids 2 and 4 share panel 0; id 3 uses panel 1.
        assert_eq!(staff.request("A", PatientId(2), a), Some(Grant::Granted));
        assert_eq!(staff.request("A", PatientId(3), b), Some(Grant::Granted));
        assert_eq!(staff.request("A", PatientId(4), c), Some(Grant::Queued));
        assert_eq!(staff.model("A").map(NurseModel::busy_nurses), Some(2));
        assert_eq!(staff.release("A", PatientId(2)), Some(c));
        assert_eq!(staff.model("A").map(NurseModel::busy_nurses), Some(2));
        assert_eq!(staff.request("B", PatientId(5), a), None);
    }

    #[test]
    fn nurse_minutes_grow_with_acuity() {
        let mut rng = StdRng::seed_from_u64(5);
        let calm = nurse_assessment_minutes(0.0, &mut rng);
        assert!((5.0..=6.25).contains(&calm));
        let sick = nurse_assessment_minutes(5.0, &mut rng);
        assert!((90.0..=120.0).contains(&sick));
    }
}
