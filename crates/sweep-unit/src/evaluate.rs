//! Evaluator contract and a deterministic synthetic evaluator.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::Hasher;
use std::panic::{self, AssertUnwindSafe};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use siphasher::sip::SipHasher13;
use sweep_core::{Condition, Scalar};
use thiserror::Error;

use crate::space::{
    FactorSpace, BIOMODEL_NUM, CNT, NOISE_MAG, NUM_PARAMETER, NUM_REACTION, NUM_SPECIES,
};

/// Metric values produced for a single condition, keyed by result field.
pub type Metrics = BTreeMap<String, Scalar>;

/// A recoverable failure raised while evaluating one condition.
///
/// The reason text becomes the condition's `status` value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct EvaluationFailure {
    /// Human readable failure reason, stored as is.
    pub reason: String,
}

impl EvaluationFailure {
    /// Creates a failure with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Computes metrics for a fully specified condition.
pub trait Evaluator: Send + Sync {
    /// Returns the metrics of `condition`, or why they could not be computed.
    fn evaluate(&self, condition: &Condition) -> Result<Metrics, EvaluationFailure>;
}

impl<F> Evaluator for F
where
    F: Fn(&Condition) -> Result<Metrics, EvaluationFailure> + Send + Sync,
{
    fn evaluate(&self, condition: &Condition) -> Result<Metrics, EvaluationFailure> {
        self(condition)
    }
}

/// Runs the evaluator, turning a panic into an [`EvaluationFailure`].
pub(crate) fn evaluate_guarded(
    evaluator: &dyn Evaluator,
    condition: &Condition,
) -> Result<Metrics, EvaluationFailure> {
    match panic::catch_unwind(AssertUnwindSafe(|| evaluator.evaluate(condition))) {
        Ok(outcome) => outcome,
        Err(payload) => Err(EvaluationFailure::new(format!(
            "evaluator panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Deterministic stand-in for a model fitting routine.
///
/// Every condition seeds its own RNG from the condition encoding, so repeated
/// runs produce identical metrics. Conditions whose `biomodel_num` is listed in
/// `failing` fail with a fixed reason.
#[derive(Debug, Clone)]
pub struct SyntheticEvaluator {
    metrics: Vec<String>,
    failing: BTreeSet<i64>,
    seed: u64,
}

impl SyntheticEvaluator {
    /// Produces every metric of `space`.
    pub fn new(space: &FactorSpace) -> Self {
        Self {
            metrics: space.metric_names().into_iter().map(str::to_string).collect(),
            failing: BTreeSet::new(),
            seed: 0,
        }
    }

    /// Marks biomodels whose evaluation fails.
    pub fn with_failing(mut self, biomodels: impl IntoIterator<Item = i64>) -> Self {
        self.failing.extend(biomodels);
        self
    }

    /// Seed mixed into every condition's RNG.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn condition_seed(&self, condition: &Condition) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(0, 0);
        hasher.write_u64(self.seed);
        hasher.write(condition.encode().as_bytes());
        hasher.finish()
    }
}

impl Evaluator for SyntheticEvaluator {
    fn evaluate(&self, condition: &Condition) -> Result<Metrics, EvaluationFailure> {
        if let Some(biomodel) = condition.get(BIOMODEL_NUM).and_then(Scalar::as_int) {
            if self.failing.contains(&biomodel) {
                return Err(EvaluationFailure::new(format!(
                    "Cannot create model for biomodel {biomodel}."
                )));
            }
        }
        let noise = condition
            .get(NOISE_MAG)
            .and_then(Scalar::as_f64)
            .unwrap_or(0.0);
        let mut rng = StdRng::seed_from_u64(self.condition_seed(condition));
        let mut metrics = Metrics::new();
        for name in &self.metrics {
            if name == crate::STATUS_KEY {
                continue;
            }
            let value = match name.as_str() {
                NUM_SPECIES | NUM_REACTION | NUM_PARAMETER => Scalar::Int(rng.gen_range(1..60)),
                CNT => Scalar::Int(rng.gen_range(1..20)),
                _ => Scalar::Float(rng.gen_range(0.0..1.0) * (1.0 + noise)),
            };
            metrics.insert(name.clone(), value);
        }
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_metrics_are_deterministic() {
        let space = FactorSpace::fitting();
        let evaluator = SyntheticEvaluator::new(&space);
        let condition =
            Condition::new(space.condition_schema(), [(BIOMODEL_NUM, 7)]).expect("condition");
        let first = evaluator.evaluate(&condition).expect("metrics");
        let second = evaluator.evaluate(&condition).expect("metrics");
        assert_eq!(first, second);
        assert!(first.contains_key(NUM_SPECIES));
        assert!(!first.contains_key(crate::STATUS_KEY));
    }

    #[test]
    fn panics_become_failures() {
        let exploding = |_: &Condition| -> Result<Metrics, EvaluationFailure> {
            panic!("solver diverged");
        };
        let space = FactorSpace::fitting();
        let condition =
            Condition::new(space.condition_schema(), Vec::<(String, Scalar)>::new())
                .expect("condition");
        let failure = evaluate_guarded(&exploding, &condition).expect_err("panic caught");
        assert!(failure.reason.contains("solver diverged"));
    }
}
