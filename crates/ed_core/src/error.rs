use std::path::PathBuf;

use thiserror::Error;

/// Configuration problems detected before a run starts.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{profile} profile must have {expected} hourly entries, got {actual}")]
    ProfileLength {
        profile: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{profile} profile has an invalid rate {value} at hour {hour}")]
    InvalidRate {
        profile: &'static str,
        hour: usize,
        value: f64,
    },
    #[error("no acute areas configured")]
    NoAcuteAreas,
    #[error("area `{0}` is configured more than once")]
    DuplicateArea(String),
    #[error("area `{0}` has no beds")]
    EmptyArea(String),
    #[error("area `{area}` has an unusable nurse model: {reason}")]
    InvalidNurseModel { area: String, reason: &'static str },
    #[error("doctor `{doctor}` works in unknown area `{area}`")]
    UnknownDoctorArea { doctor: String, area: String },
    #[error("doctor `{0}` has a zero-length shift or a zero panel")]
    InvalidDoctor(String),
    #[error("area `{0}` has no doctor assigned")]
    MissingDoctorCoverage(String),
    #[error("inpatient unit `{0}` is configured more than once")]
    DuplicateUnit(String),
    #[error("service `{service}` maps to unknown inpatient unit `{unit}`")]
    UnknownServiceUnit { service: String, unit: String },
}

/// A sampling failure; callers fall back to a documented per-stage default.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DrawError {
    #[error("invalid distribution parameters: {0}")]
    InvalidParameters(String),
    #[error("custom draw failed: {0}")]
    Custom(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
}
