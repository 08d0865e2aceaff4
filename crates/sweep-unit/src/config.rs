use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sweep_core::{CanonicalDict, Schema, SweepError, Value};
use sweep_grid::ExpansionTable;

use crate::serde::from_yaml_slice;
use crate::space::{fitting_expansions, FactorSpace, FITTING_METRICS, MODEL_DESCRIPTORS};

/// Output settings of a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Directory for snapshots, exports and reports.
    #[serde(default = "OutputSpec::default_dir")]
    pub dir: PathBuf,
    /// Write a CSV next to each snapshot.
    #[serde(default = "OutputSpec::default_write_csv")]
    pub write_csv: bool,
}

impl OutputSpec {
    fn default_dir() -> PathBuf {
        PathBuf::from("experiments")
    }

    fn default_write_csv() -> bool {
        true
    }
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            dir: Self::default_dir(),
            write_csv: Self::default_write_csv(),
        }
    }
}

/// YAML sweep configuration. Every section is optional; omitted sections
/// fall back to the fitting experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Condition factors and their default levels.
    #[serde(default)]
    pub conditions: Option<BTreeMap<String, Value>>,
    /// Metric names recorded per condition.
    #[serde(default)]
    pub metrics: Option<Vec<String>>,
    /// Levels substituted for `all`.
    #[serde(default)]
    pub expansions: Option<ExpansionTable>,
    /// Output settings.
    #[serde(default)]
    pub output: OutputSpec,
    /// Workunits processed in parallel by `batch`.
    #[serde(default = "SweepConfig::default_concurrency")]
    pub concurrency: usize,
}

impl SweepConfig {
    fn default_concurrency() -> usize {
        1
    }

    /// Builds the factor space described by the configuration.
    pub fn factor_space(&self) -> Result<FactorSpace, SweepError> {
        let fitting = FactorSpace::fitting();
        let conditions = match &self.conditions {
            Some(levels) => {
                CanonicalDict::from_map(levels.clone())?;
                levels
                    .iter()
                    .fold(Schema::builder("conditions"), |builder, (key, value)| {
                        builder.field(key.clone(), value.clone())
                    })
                    .build()
            }
            None => fitting.condition_schema().clone(),
        };
        let metrics: Vec<String> = match &self.metrics {
            Some(metrics) => metrics.clone(),
            None => MODEL_DESCRIPTORS
                .iter()
                .chain(FITTING_METRICS.iter())
                .map(|name| name.to_string())
                .collect(),
        };
        let expansions = self.expansions.clone().unwrap_or_else(fitting_expansions);
        Ok(FactorSpace::new(conditions, metrics, expansions))
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            conditions: None,
            metrics: None,
            expansions: None,
            output: OutputSpec::default(),
            concurrency: Self::default_concurrency(),
        }
    }
}

/// Loads a YAML configuration from disk.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SweepConfig, SweepError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|err| SweepError::io("config.read", path, err))?;
    let config: SweepConfig = from_yaml_slice(&bytes)?;
    config.factor_space()?;
    Ok(config)
}
