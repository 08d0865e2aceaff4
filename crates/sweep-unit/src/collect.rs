use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use sweep_core::{ErrorInfo, ResultTable, SweepError};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::persist::{SNAPSHOT_EXTENSION, SNAPSHOT_PREFIX};
use crate::space::FactorSpace;
use crate::workunit::Workunit;

fn collect_error(code: &str, err: impl ToString) -> SweepError {
    SweepError::Io(ErrorInfo::new(code, err.to_string()))
}

fn snapshot_globset() -> Result<GlobSet, SweepError> {
    let pattern = format!("{SNAPSHOT_PREFIX}*.{SNAPSHOT_EXTENSION}");
    let mut builder = GlobSetBuilder::new();
    builder.add(Glob::new(&pattern).map_err(|err| collect_error("collect.glob", err))?);
    builder
        .build()
        .map_err(|err| collect_error("collect.glob_build", err))
}

/// Snapshot files below `root`, in path order.
pub fn snapshot_paths(root: &Path) -> Result<Vec<PathBuf>, SweepError> {
    if !root.is_dir() {
        return Err(SweepError::io(
            "collect.root",
            root,
            "collection root is not a directory",
        ));
    }
    let globset = snapshot_globset()?;
    let mut paths = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|err| SweepError::io("collect.walk", root, err))?;
        if entry.file_type().is_file() && globset.is_match(entry.file_name()) {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Loads every snapshot below `root` and merges the result tables,
/// dropping identical rows.
pub fn collect_results(space: Arc<FactorSpace>, root: &Path) -> Result<ResultTable, SweepError> {
    let mut merged = ResultTable::with_columns(space.result_schema().keys());
    let paths = snapshot_paths(root)?;
    for path in &paths {
        let unit = Workunit::deserialize(Arc::clone(&space), path)?;
        debug!(path = %path.display(), rows = unit.results().len()?, "snapshot loaded");
        merged.extend(unit.results(), false);
    }
    info!(root = %root.display(), snapshots = paths.len(), rows = merged.len()?, "results collected");
    Ok(merged)
}
