//! The resumable unit of work: a hypercube, its exclusions and the results
//! accumulated so far.

use std::collections::HashSet;
use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sweep_core::{CanonicalDict, Condition, ErrorInfo, ResultRecord, ResultTable, SweepError, Value};
use sweep_grid::{expand, Exclusion, Hypercube};
use tracing::{debug, info, warn};

use crate::evaluate::{evaluate_guarded, Evaluator};
use crate::persist::{snapshot_filename, Persister, Snapshot, SNAPSHOT_VERSION};
use crate::registry::write_csv;
use crate::space::{FactorSpace, STATUS_SUCCESS};
use crate::STATUS_KEY;

/// Lifecycle of a [`Workunit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkunitState {
    /// Constructed; no result appended in this session.
    Fresh,
    /// A result was appended but not yet written.
    Running,
    /// The latest result is on disk.
    Persisted,
    /// Rebuilt from a snapshot.
    Resumed,
    /// Every pending condition has been processed.
    Exhausted,
}

/// Counters for one [`Workunit::run`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Conditions evaluated in this pass, including failures.
    pub processed: usize,
    /// Conditions whose evaluation failed and were recorded with an error status.
    pub failures: usize,
    /// Conditions skipped because a result already existed.
    pub skipped_completed: usize,
}

/// A persisted, resumable sweep over one factor specification.
#[derive(Debug, Clone)]
pub struct Workunit {
    space: Arc<FactorSpace>,
    spec: CanonicalDict,
    exclusion_spec: CanonicalDict,
    cube: Hypercube,
    exclusion: Exclusion,
    results: ResultTable,
    completed: HashSet<String>,
    persister: Option<Persister>,
    state: WorkunitState,
}

impl Workunit {
    /// Builds a workunit from a validated specification, an exclusion
    /// specification and optionally a prior result table.
    pub fn new(
        space: Arc<FactorSpace>,
        spec: CanonicalDict,
        exclusion_spec: CanonicalDict,
        results: Option<ResultTable>,
    ) -> Result<Self, SweepError> {
        let cube = expand(&spec, space.expansions())?;
        let exclusion = if exclusion_spec.is_empty() {
            Exclusion::none()
        } else {
            Exclusion::from_hypercube(&expand(&exclusion_spec, space.expansions())?)
        };
        let results = match results {
            Some(table) => {
                table.len()?;
                table
            }
            None => ResultTable::with_columns(space.result_schema().keys()),
        };
        let factors = space.factor_names();
        let completed = results.condition_encodings(&factors);
        Ok(Self {
            space,
            spec,
            exclusion_spec,
            cube,
            exclusion,
            results,
            completed,
            persister: None,
            state: WorkunitState::Fresh,
        })
    }

    /// Builds a workunit from keyword-style arguments; missing factors take
    /// their schema defaults.
    pub fn from_args<I, K, V>(space: Arc<FactorSpace>, args: I) -> Result<Self, SweepError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let spec = CanonicalDict::new(space.condition_schema(), args)?;
        Self::new(space, spec, CanonicalDict::default(), None)
    }

    /// Parses a workunit specification line.
    pub fn from_encoding(space: Arc<FactorSpace>, text: &str) -> Result<Self, SweepError> {
        let spec = CanonicalDict::decode(space.condition_schema(), text.trim())?;
        Self::new(space, spec, CanonicalDict::default(), None)
    }

    /// Replaces the exclusion specification. Keys must be condition factors;
    /// absent keys are not filled with defaults.
    pub fn exclude<I, K, V>(self, args: I) -> Result<Self, SweepError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let exclusion_spec = CanonicalDict::new(self.space.exclusion_schema(), args)?;
        let persister = self.persister.clone();
        let mut unit = Self::new(self.space, self.spec, exclusion_spec, Some(self.results))?;
        unit.persister = persister;
        Ok(unit)
    }

    /// Binds the workunit to a snapshot path; every appended result is
    /// written there.
    pub fn persist_at(mut self, path: impl Into<PathBuf>) -> Self {
        self.persister = Some(Persister::new(path));
        self
    }

    /// Binds the workunit to `dir/wu_<encoding>.pcl`.
    pub fn persist_in(self, dir: impl AsRef<Path>) -> Self {
        let path = dir.as_ref().join(self.snapshot_filename());
        self.persist_at(path)
    }

    /// Resumes from `dir/wu_<encoding>.pcl` when that snapshot exists,
    /// otherwise starts fresh bound to that path.
    pub fn resume_or_new(
        space: Arc<FactorSpace>,
        text: &str,
        dir: impl AsRef<Path>,
    ) -> Result<Self, SweepError> {
        let fresh = Self::from_encoding(Arc::clone(&space), text)?.persist_in(dir);
        let path = fresh.snapshot_path().map(Path::to_path_buf);
        match path {
            Some(path) if path.is_file() => {
                let resumed = Self::deserialize(space, &path)?;
                if !resumed.spec.equals(&fresh.spec) {
                    return Err(SweepError::Serde(
                        ErrorInfo::new("workunit.snapshot_mismatch", "snapshot belongs to another workunit")
                            .with_context("path", path.display().to_string())
                            .with_context("expected", fresh.encoding()),
                    ));
                }
                info!(path = %path.display(), completed = resumed.completed.len(), "resuming workunit");
                Ok(resumed)
            }
            _ => Ok(fresh),
        }
    }

    /// Canonical encoding of the unexpanded specification; the workunit's identity.
    pub fn encoding(&self) -> String {
        self.spec.encode()
    }

    /// `wu_<encoding>.pcl`.
    pub fn snapshot_filename(&self) -> String {
        snapshot_filename(&self.encoding())
    }

    /// Bound snapshot path, if any.
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.persister.as_ref().map(Persister::path)
    }

    /// Unexpanded specification with defaults filled.
    pub fn spec(&self) -> &CanonicalDict {
        &self.spec
    }

    /// Exclusion specification.
    pub fn exclusion_spec(&self) -> &CanonicalDict {
        &self.exclusion_spec
    }

    /// Expanded specification.
    pub fn hypercube(&self) -> &Hypercube {
        &self.cube
    }

    /// Results accumulated so far.
    pub fn results(&self) -> &ResultTable {
        &self.results
    }

    /// Factor space the workunit validates against.
    pub fn space(&self) -> &Arc<FactorSpace> {
        &self.space
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkunitState {
        self.state
    }

    /// Factors whose expanded level list has more than one entry.
    pub fn calc_multivalued_factors(&self) -> Vec<String> {
        self.cube
            .multivalued_factors()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Conditions of the hypercube minus the excluded ones.
    pub fn conditions(&self) -> impl Iterator<Item = Condition> + '_ {
        self.cube
            .conditions()
            .filter(move |condition| !self.exclusion.excludes(condition))
    }

    /// Conditions still to evaluate: not excluded and without a result.
    pub fn iterate(&self) -> impl Iterator<Item = Condition> + '_ {
        self.conditions()
            .filter(move |condition| !self.completed.contains(&condition.encode()))
    }

    /// Alias of [`Workunit::iterate`].
    pub fn pending(&self) -> impl Iterator<Item = Condition> + '_ {
        self.iterate()
    }

    /// Number of conditions [`Workunit::iterate`] yields.
    pub fn pending_count(&self) -> usize {
        self.iterate().count()
    }

    /// Number of non-excluded conditions.
    pub fn len(&self) -> usize {
        self.conditions().count()
    }

    /// True when every condition is excluded.
    pub fn is_empty(&self) -> bool {
        self.conditions().next().is_none()
    }

    /// True when a result for `condition` is already recorded.
    pub fn is_completed(&self, condition: &Condition) -> bool {
        self.completed.contains(&condition.encode())
    }

    /// Appends a result and, when bound to a path, persists the whole workunit.
    pub fn append_result(&mut self, record: &ResultRecord) -> Result<(), SweepError> {
        self.state = WorkunitState::Running;
        let factors = self.space.factor_names();
        let condition = record.condition(factors.iter().copied())?;
        self.results.append(record);
        self.completed.insert(condition.encode());
        if self.persister.is_some() {
            self.serialize()?;
            self.state = WorkunitState::Persisted;
        }
        Ok(())
    }

    /// Evaluates every pending condition in enumeration order.
    ///
    /// Evaluation failures, panics and invalid metric keys are recorded in the
    /// `status` field verbatim and never abort the pass. Persistence failures do.
    pub fn run(&mut self, evaluator: &dyn Evaluator) -> Result<RunSummary, SweepError> {
        let cube = self.cube.clone();
        let total = cube.len();
        let multivalued = self.calc_multivalued_factors();
        let mut summary = RunSummary::default();
        info!(workunit = %self.spec.display(), conditions = total, "starting workunit");
        for (position, condition) in cube.conditions().enumerate() {
            if self.exclusion.excludes(&condition) {
                continue;
            }
            if self.is_completed(&condition) {
                debug!(condition = %condition, "already completed");
                summary.skipped_completed += 1;
                continue;
            }
            let record = self.evaluate_condition(evaluator, &condition, &mut summary)?;
            self.append_result(&record)?;
            summary.processed += 1;
            let progress = condition.project(multivalued.iter().map(String::as_str));
            info!(
                position = position + 1,
                total,
                condition = %progress,
                status = record.status().unwrap_or_default(),
                "condition processed"
            );
        }
        self.state = WorkunitState::Exhausted;
        info!(
            processed = summary.processed,
            failures = summary.failures,
            skipped = summary.skipped_completed,
            "workunit exhausted"
        );
        Ok(summary)
    }

    fn evaluate_condition(
        &self,
        evaluator: &dyn Evaluator,
        condition: &Condition,
        summary: &mut RunSummary,
    ) -> Result<ResultRecord, SweepError> {
        let mut record = ResultRecord::from_condition(self.space.result_schema(), condition)?;
        match evaluate_guarded(evaluator, condition) {
            Ok(metrics) => {
                let mut status = STATUS_SUCCESS.to_string();
                for (key, value) in metrics {
                    if key == STATUS_KEY {
                        if let Some(text) = value.as_str() {
                            status = text.to_string();
                        }
                        continue;
                    }
                    let assigned = if self.space.condition_schema().contains(&key) {
                        Err(format!("`{key}` is a condition factor"))
                    } else {
                        record
                            .set_outcome(&key, value)
                            .map_err(|err| err.info().message.clone())
                    };
                    if let Err(reason) = assigned {
                        warn!(condition = %condition, metric = %key, "evaluator produced an invalid metric");
                        status = format!("Invalid metric: {reason}");
                        summary.failures += 1;
                        break;
                    }
                }
                record.set_outcome(STATUS_KEY, status)?;
            }
            Err(failure) => {
                warn!(condition = %condition, reason = %failure, "condition evaluation failed");
                summary.failures += 1;
                record.set_outcome(STATUS_KEY, failure.reason)?;
            }
        }
        Ok(record)
    }

    /// Snapshot of the persisted state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            spec: self.spec.clone(),
            exclusions: self.exclusion_spec.clone(),
            results: self.results.clone(),
        }
    }

    /// Writes the workunit to its bound path.
    pub fn serialize(&self) -> Result<(), SweepError> {
        let persister = self.persister.as_ref().ok_or_else(|| {
            SweepError::Io(
                ErrorInfo::new("workunit.unbound", "workunit has no snapshot path")
                    .with_context("workunit", self.encoding())
                    .with_hint("bind a path with persist_at or persist_in"),
            )
        })?;
        persister.dump(&self.snapshot())?;
        debug!(path = %persister.path().display(), rows = self.completed.len(), "workunit persisted");
        Ok(())
    }

    /// Rebuilds a workunit from a snapshot and binds it to that path.
    pub fn deserialize(space: Arc<FactorSpace>, path: impl AsRef<Path>) -> Result<Self, SweepError> {
        let persister = Persister::new(path.as_ref());
        let snapshot: Snapshot = persister.load()?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SweepError::Serde(
                ErrorInfo::new("workunit.snapshot_version", "unsupported snapshot version")
                    .with_context("path", path.as_ref().display().to_string())
                    .with_context("version", snapshot.version.to_string()),
            ));
        }
        let spec = CanonicalDict::new(space.condition_schema(), snapshot.spec.as_map().clone())?;
        let exclusion_spec =
            CanonicalDict::new(space.exclusion_schema(), snapshot.exclusions.as_map().clone())?;
        let mut unit = Self::new(space, spec, exclusion_spec, Some(snapshot.results))?;
        unit.persister = Some(persister);
        unit.state = WorkunitState::Resumed;
        Ok(unit)
    }

    /// Compares specification, exclusions and results.
    pub fn equals(&self, other: &Workunit) -> bool {
        self.spec.equals(&other.spec)
            && self.exclusion_spec.equals(&other.exclusion_spec)
            && self.results == other.results
    }

    /// Appends the other workunit's rows, keeping duplicates.
    pub fn merge(&mut self, other: &Workunit) -> Result<(), SweepError> {
        self.results.extend(&other.results, true);
        self.results.len()?;
        let factors = self.space.factor_names();
        self.completed = self.results.condition_encodings(&factors);
        Ok(())
    }

    /// Writes the results as CSV, condition factors first.
    pub fn export_csv(&self, path: impl AsRef<Path>) -> Result<(), SweepError> {
        let export = self.results.to_tabular_export(self.space.factor_names());
        write_csv(path.as_ref(), &export)
    }
}

impl Display for Workunit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.spec.display())
    }
}
