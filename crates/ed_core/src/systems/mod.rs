pub mod dispatch;
pub mod inpatient;
pub mod lwbs;
pub mod offload;
pub mod spawner;
pub mod treatment;
