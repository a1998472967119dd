//! Scenario setup: the serde configuration schema, its validation, and the
//! builder that turns a config into world resources.

mod build;
mod params;
mod validate;

pub use build::build_scenario;
pub use params::{
    AreaConfig, ArrivalsConfig, DoctorConfig, EdConfig, EmsConfig, FastTrackConfig,
    InpatientConfig, InpatientUnitConfig, NurseModelConfig, OrdersConfig, SimulationEndTimeMs,
    TriageConfig, TriageWeights,
};
