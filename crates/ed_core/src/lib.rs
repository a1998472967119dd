pub mod admission;
pub mod capacity;
pub mod care;
pub mod clock;
pub mod distributions;
pub mod doctors;
pub mod ecs;
pub mod ems;
pub mod error;
pub mod generation;
pub mod hospital;
pub mod inpatient;
pub mod nurses;
pub mod patterns;
pub mod profiling;
pub mod queues;
pub mod runner;
pub mod scenario;
pub mod signal;
pub mod systems;
pub mod telemetry;
pub mod telemetry_export;
#[cfg(feature = "test-helpers")]
pub mod test_helpers;
