//! Random draws used throughout the ED model.
//!
//! Every stochastic duration or attribute is described by a [DrawSpec] and
//! sampled from the single seeded [SimRng]. Consumers never trust a draw
//! blindly: [draw_or] substitutes a per-stage fallback when sampling fails or
//! yields a non-finite value.

use std::fmt;
use std::sync::Arc;

use bevy_ecs::prelude::Resource;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::DrawError;

/// The one random stream shared by every system; seeded for reproducible runs.
#[derive(Debug, Resource)]
pub struct SimRng(pub StdRng);

impl SimRng {
    pub fn seeded(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self(StdRng::seed_from_u64(seed)),
            None => Self(StdRng::from_entropy()),
        }
    }
}

/// Anything that can produce a real-valued sample from the shared stream.
pub trait Sample: Send + Sync + fmt::Debug {
    fn sample(&self, rng: &mut StdRng) -> Result<f64, DrawError>;
}

/// Wraps a closure as a [Sample], for draws that have no config representation.
pub struct FnSample<F>(pub F);

impl<F> fmt::Debug for FnSample<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnSample(..)")
    }
}

impl<F> Sample for FnSample<F>
where
    F: Fn(&mut StdRng) -> Result<f64, DrawError> + Send + Sync,
{
    fn sample(&self, rng: &mut StdRng) -> Result<f64, DrawError> {
        (self.0)(rng)
    }
}

/// Serializable description of a draw. Duration draws are in minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawSpec {
    Constant {
        value: f64,
    },
    Uniform {
        low: f64,
        high: f64,
    },
    /// Inclusive on both ends.
    UniformInt {
        low: i64,
        high: i64,
    },
    Normal {
        mean: f64,
        std_dev: f64,
    },
    /// `scale * exp(N(mu, sigma))`.
    LogNormal {
        mu: f64,
        sigma: f64,
        #[serde(default = "unit_scale")]
        scale: f64,
    },
    Exponential {
        mean: f64,
    },
    #[serde(skip)]
    Custom(Arc<dyn Sample>),
}

fn unit_scale() -> f64 {
    1.0
}

impl DrawSpec {
    pub fn constant(value: f64) -> Self {
        Self::Constant { value }
    }

    pub fn uniform(low: f64, high: f64) -> Self {
        Self::Uniform { low, high }
    }

    pub fn uniform_int(low: i64, high: i64) -> Self {
        Self::UniformInt { low, high }
    }

    pub fn log_normal(mu: f64, sigma: f64, scale: f64) -> Self {
        Self::LogNormal { mu, sigma, scale }
    }

    pub fn custom(sampler: impl Sample + 'static) -> Self {
        Self::Custom(Arc::new(sampler))
    }
}

impl Sample for DrawSpec {
    fn sample(&self, rng: &mut StdRng) -> Result<f64, DrawError> {
        match self {
            Self::Constant { value } => Ok(*value),
            Self::Uniform { low, high } => {
                // rand rejects spans that overflow to infinity.
                if !(low <= high && (high - low).is_finite()) {
                    return Err(DrawError::InvalidParameters(format!(
                        "uniform({low}, {high})"
                    )));
                }
                Ok(rng.gen_range(*low..=*high))
            }
            Self::UniformInt { low, high } => {
                if low > high {
                    return Err(DrawError::InvalidParameters(format!(
                        "uniform_int({low}, {high})"
                    )));
                }
                Ok(rng.gen_range(*low..=*high) as f64)
            }
            Self::Normal { mean, std_dev } => {
                check_normal(*mean, *std_dev)?;
                Ok(mean + std_dev * standard_normal(rng))
            }
            Self::LogNormal { mu, sigma, scale } => {
                check_normal(*mu, *sigma)?;
                Ok(scale * (mu + sigma * standard_normal(rng)).exp())
            }
            Self::Exponential { mean } => {
                if !(mean.is_finite() && *mean > 0.0) {
                    return Err(DrawError::InvalidParameters(format!(
                        "exponential(mean = {mean})"
                    )));
                }
                // Inverse transform: -ln(U) * mean, with U in (0, 1].
                let u: f64 = 1.0 - rng.gen::<f64>();
                Ok(-u.ln() * mean)
            }
            Self::Custom(sampler) => sampler.sample(rng),
        }
    }
}

const POISSON_SLICE: f64 = 30.0;

fn check_normal(mean: f64, std_dev: f64) -> Result<(), DrawError> {
    if mean.is_finite() && std_dev.is_finite() && std_dev >= 0.0 {
        Ok(())
    } else {
        Err(DrawError::InvalidParameters(format!(
            "normal(mean = {mean}, std_dev = {std_dev})"
        )))
    }
}

/// Box-Muller transform over two uniforms.
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Samples `spec`, returning `fallback` if the draw fails or is not finite.
/// `stage` names the consumer in the warning.
pub fn draw_or(spec: &DrawSpec, rng: &mut StdRng, fallback: f64, stage: &'static str) -> f64 {
    match spec.sample(rng) {
        Ok(value) if value.is_finite() => value,
        Ok(value) => {
            tracing::warn!(stage, value, fallback, "non-finite draw, using fallback");
            fallback
        }
        Err(err) => {
            tracing::warn!(stage, error = %err, fallback, "draw failed, using fallback");
            fallback
        }
    }
}

/// Like [draw_or] for optional specs; a missing spec yields the fallback silently.
pub fn draw_optional_or(
    spec: Option<&DrawSpec>,
    rng: &mut StdRng,
    fallback: f64,
    stage: &'static str,
) -> f64 {
    match spec {
        Some(spec) => draw_or(spec, rng, fallback, stage),
        None => fallback,
    }
}

/// Bernoulli trial. Probabilities are clamped into `[0, 1]`; NaN counts as zero.
pub fn chance(rng: &mut StdRng, p: f64) -> bool {
    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
    rng.gen_bool(p)
}

/// Poisson count for one hour. Non-positive or non-finite rates yield zero.
///
/// Knuth's product-of-uniforms method, applied to slices of at most
/// [POISSON_SLICE] so `exp(-lambda)` never underflows; the sum of the
/// slices' counts is Poisson with the full rate.
pub fn poisson_count(rng: &mut StdRng, lambda: f64) -> u64 {
    if !(lambda.is_finite() && lambda > 0.0) {
        return 0;
    }
    let mut remaining = lambda;
    let mut count = 0;
    while remaining > 0.0 {
        let slice = remaining.min(POISSON_SLICE);
        remaining -= slice;
        let limit = (-slice).exp();
        let mut product: f64 = rng.gen();
        while product > limit {
            count += 1;
            product *= rng.gen::<f64>();
        }
    }
    count
}

/// Picks from weighted options. Negative weights count as zero; if nothing
/// carries weight the pick is uniform. `None` only for an empty slice.
pub fn pick_weighted<'a, T>(options: &'a [(T, f64)], rng: &mut StdRng) -> Option<&'a T> {
    if options.is_empty() {
        return None;
    }
    let weights: Vec<f64> = options
        .iter()
        .map(|(_, w)| if w.is_finite() { w.max(0.0) } else { 0.0 })
        .collect();
    match WeightedIndex::new(&weights) {
        Ok(index) => options.get(index.sample(rng)).map(|(item, _)| item),
        Err(_) => options.choose(rng).map(|(item, _)| item),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Failing;

    impl Sample for Failing {
        fn sample(&self, _rng: &mut StdRng) -> Result<f64, DrawError> {
            Err(DrawError::Custom("boom".to_string()))
        }
    }

    #[test]
    fn failed_and_non_finite_draws_use_fallback() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(draw_or(&DrawSpec::custom(Failing), &mut rng, 15.0, "assess"), 15.0);
        assert_eq!(
            draw_or(&DrawSpec::constant(f64::NAN), &mut rng, 20.0, "reassess"),
            20.0
        );
        assert_eq!(
            draw_or(&DrawSpec::uniform(5.0, 1.0), &mut rng, 45.0, "labs"),
            45.0
        );
        assert_eq!(draw_optional_or(None, &mut rng, 60.0, "consult"), 60.0);
    }

    #[test]
    fn uniform_with_an_overflowing_span_is_rejected() {
        let mut rng = StdRng::seed_from_u64(7);
        let wide = DrawSpec::uniform(-1e308, 1e308);
        assert!(matches!(
            wide.sample(&mut rng),
            Err(DrawError::InvalidParameters(_))
        ));
        assert_eq!(draw_or(&wide, &mut rng, 15.0, "assess"), 15.0);
        assert_eq!(
            draw_or(&DrawSpec::uniform(f64::NEG_INFINITY, 0.0), &mut rng, 5.0, "labs"),
            5.0
        );
    }

    #[test]
    fn uniform_int_is_inclusive() {
        let mut rng = StdRng::seed_from_u64(1);
        let spec = DrawSpec::uniform_int(3, 4);
        let samples: Vec<f64> = (0..200).map(|_| draw_or(&spec, &mut rng, 0.0, "t")).collect();
        assert!(samples.iter().all(|v| *v == 3.0 || *v == 4.0));
        assert!(samples.contains(&3.0) && samples.contains(&4.0));
    }

    #[test]
    fn pick_weighted_falls_back_to_uniform_when_weightless() {
        let mut rng = StdRng::seed_from_u64(3);
        let options = [("a", 0.0), ("b", -1.0)];
        for _ in 0..20 {
            assert!(pick_weighted(&options, &mut rng).is_some());
        }
        let empty: [(&str, f64); 0] = [];
        assert!(pick_weighted(&empty, &mut rng).is_none());

        let only_c = [("a", 0.0), ("c", 2.0)];
        assert_eq!(pick_weighted(&only_c, &mut rng), Some(&"c"));
    }

    #[test]
    fn zero_rate_hours_produce_no_arrivals() {
        let mut rng = StdRng::seed_from_u64(9);
        assert_eq!(poisson_count(&mut rng, 0.0), 0);
        assert_eq!(poisson_count(&mut rng, -2.0), 0);
        assert_eq!(poisson_count(&mut rng, f64::INFINITY), 0);
    }

    #[test]
    fn poisson_mean_tracks_the_rate() {
        let mut rng = StdRng::seed_from_u64(5);
        let draws = 400;
        let total: u64 = (0..draws).map(|_| poisson_count(&mut rng, 100.0)).sum();
        let mean = total as f64 / draws as f64;
        assert!((95.0..105.0).contains(&mean), "mean {mean}");
    }

    #[test]
    fn normal_family_rejects_bad_parameters() {
        let mut rng = StdRng::seed_from_u64(13);
        let bad = DrawSpec::Normal {
            mean: 0.0,
            std_dev: -1.0,
        };
        assert!(bad.sample(&mut rng).is_err());
        let lognormal = DrawSpec::log_normal(0.0, 0.0, 60.0);
        assert_eq!(lognormal.sample(&mut rng), Ok(60.0));
        let exp = DrawSpec::Exponential { mean: 10.0 };
        assert!(exp.sample(&mut rng).expect("valid") >= 0.0);
    }

    #[test]
    fn chance_clamps_probabilities() {
        let mut rng = StdRng::seed_from_u64(11);
        assert!(chance(&mut rng, 3.0));
        assert!(!chance(&mut rng, -0.5));
        assert!(!chance(&mut rng, f64::NAN));
    }

    #[test]
    fn draw_specs_deserialize_from_tagged_json() {
        let spec: DrawSpec =
            serde_json::from_str(r#"{"kind":"log_normal","mu":4.4,"sigma":0.35}"#).unwrap();
        match spec {
            DrawSpec::LogNormal { scale, .. } => assert_eq!(scale, 1.0),
            other => panic!("unexpected spec {other:?}"),
        }
    }
}
