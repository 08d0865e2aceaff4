//! The standard fitting-experiment factor space and its descriptor type.

use std::sync::Arc;

use sweep_core::{Schema, STATUS_KEY};
use sweep_grid::ExpansionTable;

/// Index of the model under study.
pub const BIOMODEL_NUM: &str = "biomodel_num";
/// Number of observation columns removed from the time series.
pub const COLUMNS_DELETED: &str = "columns_deleted";
/// Index of the latin-hypercube parameter sample.
pub const LATINCUBE_IDX: &str = "latincube_idx";
/// Function evaluation budget of the optimizer.
pub const MAX_FEV: &str = "max_fev";
/// Optimization method name.
pub const METHOD: &str = "method";
/// Magnitude of noise added to observations.
pub const NOISE_MAG: &str = "noise_mag";
/// Upper parameter bound as a fraction of the true value.
pub const RANGE_MAX_FRAC: &str = "range_max_frac";
/// Lower parameter bound as a fraction of the true value.
pub const RANGE_MIN_FRAC: &str = "range_min_frac";
/// Index of the synthetic time series instance.
pub const TS_INSTANCE: &str = "ts_instance";

/// Number of species in the model.
pub const NUM_SPECIES: &str = "num_species";
/// Number of reactions in the model.
pub const NUM_REACTION: &str = "num_reaction";
/// Number of fitted parameters.
pub const NUM_PARAMETER: &str = "num_parameter";

/// Median log error of fitted parameters.
pub const MEDIAN_LOGERR: &str = "median_logerr";
/// Largest log error of fitted parameters.
pub const MAX_LOGERR: &str = "max_logerr";
/// Smallest log error of fitted parameters.
pub const MIN_LOGERR: &str = "min_logerr";
/// Residual sum of squares.
pub const RSSQ: &str = "rssq";
/// Median fractional error of fitted parameters.
pub const MEDIAN_FRCERR: &str = "median_frcerr";
/// Largest fractional error of fitted parameters.
pub const MAX_FRCERR: &str = "max_frcerr";
/// Smallest fractional error of fitted parameters.
pub const MIN_FRCERR: &str = "min_frcerr";
/// Mean time per fit.
pub const AVG_TIME: &str = "avg_time";
/// Number of fits performed.
pub const CNT: &str = "cnt";
/// Total fitting time.
pub const TOT_TIME: &str = "tot_time";

/// Status text recorded for a condition that evaluated cleanly.
pub const STATUS_SUCCESS: &str = "Success!";

/// Descriptors of the model under study; not aggregated.
pub const MODEL_DESCRIPTORS: [&str; 3] = [NUM_SPECIES, NUM_REACTION, NUM_PARAMETER];

/// Error and timing metrics produced per condition.
pub const FITTING_METRICS: [&str; 10] = [
    MEDIAN_LOGERR,
    MAX_LOGERR,
    MIN_LOGERR,
    RSSQ,
    MEDIAN_FRCERR,
    MAX_FRCERR,
    MIN_FRCERR,
    AVG_TIME,
    CNT,
    TOT_TIME,
];

/// Immutable description of a sweep: condition factors with defaults, the
/// result schema and the universal-sentinel expansions.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorSpace {
    conditions: Schema,
    exclusions: Schema,
    results: Arc<Schema>,
    expansions: ExpansionTable,
}

impl FactorSpace {
    /// Builds a factor space. The result schema is the union of the condition
    /// factors, the given metrics and `status`, none of them defaulted.
    pub fn new<I, S>(conditions: Schema, metrics: I, expansions: ExpansionTable) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut exclusions = Schema::builder("exclusions");
        let mut results = Schema::builder("results");
        for key in conditions.keys() {
            exclusions = exclusions.optional(key);
            results = results.optional(key);
        }
        for metric in metrics {
            results = results.optional(metric);
        }
        results = results.optional(STATUS_KEY);
        Self {
            conditions,
            exclusions: exclusions.build(),
            results: Arc::new(results.build()),
            expansions,
        }
    }

    /// The fitting-experiment space: nine condition factors, model
    /// descriptors, error and timing metrics.
    pub fn fitting() -> Self {
        let conditions = Schema::builder("conditions")
            .field(BIOMODEL_NUM, 1)
            .field(COLUMNS_DELETED, 0)
            .field(LATINCUBE_IDX, 1)
            .field(MAX_FEV, 1000)
            .field(METHOD, "differential_evolution")
            .field(NOISE_MAG, 0)
            .field(RANGE_MAX_FRAC, 2.0)
            .field(RANGE_MIN_FRAC, 0.5)
            .field(TS_INSTANCE, 1)
            .build();
        let metrics = MODEL_DESCRIPTORS.iter().chain(FITTING_METRICS.iter()).copied();
        Self::new(conditions, metrics, fitting_expansions())
    }

    /// Condition factors with their defaults.
    pub fn condition_schema(&self) -> &Schema {
        &self.conditions
    }

    /// Same keys as the condition schema, without defaults.
    pub fn exclusion_schema(&self) -> &Schema {
        &self.exclusions
    }

    /// Result fields: factors, metrics and `status`, none defaulted.
    pub fn result_schema(&self) -> Arc<Schema> {
        Arc::clone(&self.results)
    }

    /// Levels substituted for the universal sentinel.
    pub fn expansions(&self) -> &ExpansionTable {
        &self.expansions
    }

    /// Condition factor names in key order.
    pub fn factor_names(&self) -> Vec<&str> {
        self.conditions.keys().collect()
    }

    /// Result fields that are not condition factors.
    pub fn metric_names(&self) -> Vec<&str> {
        self.results
            .keys()
            .filter(|key| !self.conditions.contains(key))
            .collect()
    }
}

impl Default for FactorSpace {
    fn default() -> Self {
        Self::fitting()
    }
}

/// Levels substituted for the universal sentinel in the fitting space.
pub fn fitting_expansions() -> ExpansionTable {
    ExpansionTable::new()
        .with(BIOMODEL_NUM, 1..=1059)
        .with(LATINCUBE_IDX, 1..=10)
        .with(TS_INSTANCE, 1..=5)
}

