//! Inpatient units: beds, FIFO admission waitlists and consult parameters.

use std::collections::{BTreeMap, VecDeque};

use bevy_ecs::prelude::{Entity, Resource};

use crate::capacity::CapacityPool;
use crate::distributions::DrawSpec;
use crate::scenario::{InpatientConfig, InpatientUnitConfig};

#[derive(Debug, Clone)]
pub struct InpatientUnit {
    pub name: String,
    pub beds: CapacityPool,
    pub waitlist: VecDeque<Entity>,
    pub los: DrawSpec,
    pub consult_p: f64,
    pub consult_admit_p: f64,
    pub consult_time: Option<DrawSpec>,
}

impl InpatientUnit {
    fn from_config(config: &InpatientUnitConfig) -> Self {
        Self {
            name: config.name.clone(),
            beds: CapacityPool::new(config.beds),
            waitlist: VecDeque::new(),
            los: config.los.clone(),
            consult_p: config.consult_p,
            consult_admit_p: config.consult_admit_p,
            consult_time: config.consult_time.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Resource)]
pub struct InpatientUnits {
    units: BTreeMap<String, InpatientUnit>,
    service_to_unit: BTreeMap<String, String>,
    default_unit: Option<String>,
    default_consult_service: String,
}

impl InpatientUnits {
    pub fn from_config(config: &InpatientConfig) -> Self {
        Self {
            units: config
                .units
                .iter()
                .map(|unit| (unit.name.clone(), InpatientUnit::from_config(unit)))
                .collect(),
            service_to_unit: config.service_to_unit.clone(),
            default_unit: config.default_unit.clone(),
            default_consult_service: config.default_consult_service.clone(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&InpatientUnit> {
        self.units.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut InpatientUnit> {
        self.units.get_mut(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InpatientUnit> {
        self.units.values()
    }

    pub fn default_consult_service(&self) -> &str {
        &self.default_consult_service
    }

    /// Unit name a service admits to, before checking it exists.
    pub fn mapped_unit(&self, service: &str) -> String {
        self.service_to_unit
            .get(service)
            .or(self.default_unit.as_ref())
            .cloned()
            .unwrap_or_else(|| service.to_string())
    }

    /// Resolves a service to an admitting unit. `None` when the unit is
    /// unknown or has no beds at all.
    pub fn resolve_unit(&self, service: &str) -> Option<String> {
        let unit = self.mapped_unit(service);
        self.units
            .get(&unit)
            .filter(|u| u.beds.capacity() > 0)
            .map(|u| u.name.clone())
    }

    /// Consult services with their weights, in unit name order.
    pub fn consult_weights(&self) -> Vec<(String, f64)> {
        self.units
            .values()
            .map(|unit| (unit.name.clone(), unit.consult_p))
            .collect()
    }

    pub fn waitlist_len(&self) -> usize {
        self.units.values().map(|unit| unit.waitlist.len()).sum()
    }
}
