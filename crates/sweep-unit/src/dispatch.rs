use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sweep_core::{ErrorInfo, SweepError};
use tracing::{error, info, warn};

use crate::evaluate::Evaluator;
use crate::hash::stable_hash_string;
use crate::serde::to_canonical_json_bytes;
use crate::space::FactorSpace;
use crate::workunit::{Workunit, WorkunitState};

/// File written next to the snapshots after every dispatch.
pub const DISPATCH_REPORT: &str = "dispatch_report.json";

/// Options governing a batch of workunits.
#[derive(Debug, Clone)]
pub struct DispatchOpts {
    /// Directory holding snapshots, CSV exports and the report.
    pub out_dir: PathBuf,
    /// Continue from existing snapshots when true; otherwise start over.
    pub resume: bool,
    /// Number of workunits processed in parallel.
    pub concurrency: usize,
    /// Write `<encoding>.csv` beside each snapshot.
    pub write_csv: bool,
}

impl DispatchOpts {
    /// Resuming, sequential, CSV-writing options for `out_dir`.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            resume: true,
            concurrency: 1,
            write_csv: true,
        }
    }
}

/// Outcome of one workunit within a dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkunitReport {
    /// Canonical encoding, or the raw line when it failed to parse.
    pub encoding: String,
    /// Snapshot path, absent when the unit never started.
    pub snapshot: Option<String>,
    /// Non-excluded conditions.
    pub conditions: usize,
    /// Conditions with a result after the run.
    pub completed: usize,
    /// Conditions evaluated in this dispatch.
    pub processed: usize,
    /// Conditions recorded with an error status in this dispatch.
    pub failures: usize,
    /// Final state, absent when the unit never started.
    pub state: Option<WorkunitState>,
    /// Structural error that stopped this unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkunitReport {
    fn failed(encoding: String, err: &SweepError) -> Self {
        Self {
            encoding,
            snapshot: None,
            conditions: 0,
            completed: 0,
            processed: 0,
            failures: 0,
            state: None,
            error: Some(err.to_string()),
        }
    }

    /// True when the unit finished without a structural error.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of a dispatch, written as canonical JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Hash of the deduplicated specification list.
    pub specs_hash: String,
    /// One entry per distinct specification, in input order.
    pub workunits: Vec<WorkunitReport>,
}

impl DispatchReport {
    /// Entries that stopped on a structural error.
    pub fn failed_units(&self) -> impl Iterator<Item = &WorkunitReport> {
        self.workunits.iter().filter(|unit| !unit.is_ok())
    }
}

/// Runs every workunit specification on a thread pool.
///
/// Identical specifications (after canonicalization) run once. A structural
/// error in one unit is reported in its entry and does not stop the others.
pub fn dispatch(
    space: Arc<FactorSpace>,
    specs: &[String],
    evaluator: &dyn Evaluator,
    opts: &DispatchOpts,
) -> Result<DispatchReport, SweepError> {
    fs::create_dir_all(&opts.out_dir)
        .map_err(|err| SweepError::io("dispatch.out_dir", &opts.out_dir, err))?;
    let units = dedupe(&space, specs);
    let encodings: Vec<&str> = units.iter().map(|(encoding, _)| encoding.as_str()).collect();
    let specs_hash = stable_hash_string(&encodings)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.concurrency.max(1))
        .build()
        .map_err(|err| SweepError::Io(ErrorInfo::new("dispatch.thread_pool", err.to_string())))?;
    info!(workunits = units.len(), concurrency = opts.concurrency.max(1), "dispatching");

    let mut reports: Vec<(usize, WorkunitReport)> = pool.install(|| {
        units
            .par_iter()
            .enumerate()
            .map(|(index, (encoding, parsed))| {
                let report = match parsed {
                    Ok(()) => match run_unit(&space, encoding, evaluator, opts) {
                        Ok(report) => report,
                        Err(err) => {
                            error!(workunit = %encoding, error = %err, "workunit aborted");
                            WorkunitReport::failed(encoding.clone(), &err)
                        }
                    },
                    Err(err) => WorkunitReport::failed(encoding.clone(), err),
                };
                (index, report)
            })
            .collect()
    });
    reports.sort_by_key(|(index, _)| *index);

    let report = DispatchReport {
        specs_hash,
        workunits: reports.into_iter().map(|(_, report)| report).collect(),
    };
    let path = opts.out_dir.join(DISPATCH_REPORT);
    let bytes = to_canonical_json_bytes(&report)?;
    fs::write(&path, bytes).map_err(|err| SweepError::io("dispatch.report_write", &path, err))?;
    Ok(report)
}

/// Canonicalizes each line, keeping the first occurrence of each encoding.
/// Lines that fail to parse are kept with their error.
fn dedupe(space: &Arc<FactorSpace>, specs: &[String]) -> Vec<(String, Result<(), SweepError>)> {
    let mut seen = HashSet::new();
    let mut units = Vec::new();
    for line in specs {
        match Workunit::from_encoding(Arc::clone(space), line) {
            Ok(unit) => {
                let encoding = unit.encoding();
                if seen.insert(encoding.clone()) {
                    units.push((encoding, Ok(())));
                } else {
                    warn!(workunit = %encoding, "duplicate workunit specification skipped");
                }
            }
            Err(err) => units.push((line.trim().to_string(), Err(err))),
        }
    }
    units
}

fn run_unit(
    space: &Arc<FactorSpace>,
    encoding: &str,
    evaluator: &dyn Evaluator,
    opts: &DispatchOpts,
) -> Result<WorkunitReport, SweepError> {
    let mut unit = if opts.resume {
        Workunit::resume_or_new(Arc::clone(space), encoding, &opts.out_dir)?
    } else {
        let unit = Workunit::from_encoding(Arc::clone(space), encoding)?.persist_in(&opts.out_dir);
        unit.serialize()?;
        unit
    };
    let summary = unit.run(evaluator)?;
    if opts.write_csv {
        unit.export_csv(csv_path(&opts.out_dir, encoding))?;
    }
    let conditions = unit.len();
    Ok(WorkunitReport {
        encoding: encoding.to_string(),
        snapshot: unit.snapshot_path().map(|path| path.display().to_string()),
        conditions,
        completed: conditions - unit.pending_count(),
        processed: summary.processed,
        failures: summary.failures,
        state: Some(unit.state()),
        error: None,
    })
}

fn csv_path(dir: &Path, encoding: &str) -> PathBuf {
    dir.join(format!("{encoding}.csv"))
}
