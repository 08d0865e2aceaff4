#![deny(missing_docs)]
//! Resumable workunits over factorial condition spaces: evaluation, snapshot
//! persistence, parallel dispatch and result collection.

mod collect;
mod config;
mod dispatch;
mod evaluate;
mod hash;
mod persist;
mod registry;
mod serde;
mod source;
mod space;
mod workunit;

pub use collect::{collect_results, snapshot_paths};
pub use config::{load_config, OutputSpec, SweepConfig};
pub use dispatch::{dispatch, DispatchOpts, DispatchReport, WorkunitReport, DISPATCH_REPORT};
pub use evaluate::{EvaluationFailure, Evaluator, Metrics, SyntheticEvaluator};
pub use hash::stable_hash_string;
pub use persist::{
    snapshot_filename, Persister, Snapshot, SNAPSHOT_EXTENSION, SNAPSHOT_PREFIX, SNAPSHOT_VERSION,
};
pub use registry::{read_csv, registry_read, registry_write, write_csv, Registry, RESULTS_TABLE};
pub use source::{
    load_workunit_source, parse_workunit_source, plan_workunits, write_workunit_source,
    COMMENT_MARKER,
};
pub use space::*;
pub use sweep_core::STATUS_KEY;
pub use workunit::{RunSummary, Workunit, WorkunitState};
