//! Workunit source files: one canonical specification per line.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use sweep_core::{CanonicalDict, SweepError, Value};
use sweep_grid::Hypercube;

use crate::space::FactorSpace;

/// Lines starting with this marker are skipped.
pub const COMMENT_MARKER: char = '#';

/// Returns the trimmed specification lines, skipping blanks and comments.
pub fn parse_workunit_source(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(COMMENT_MARKER))
        .map(str::to_string)
        .collect()
}

/// Reads a source file and returns its specification lines.
pub fn load_workunit_source(path: &Path) -> Result<Vec<String>, SweepError> {
    let text =
        fs::read_to_string(path).map_err(|err| SweepError::io("source.read", path, err))?;
    Ok(parse_workunit_source(&text))
}

/// Writes one specification per line.
pub fn write_workunit_source(path: &Path, specs: &[String]) -> Result<(), SweepError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| SweepError::io("source.dir", parent, err))?;
        }
    }
    let mut text = String::new();
    for spec in specs {
        text.push_str(spec);
        text.push('\n');
    }
    fs::write(path, text).map_err(|err| SweepError::io("source.write", path, err))
}

/// Splits a sweep into one workunit specification per point of `partition`.
///
/// Each point's levels override the matching entries of `base`; the rest of
/// `base` is shared by every unit and missing factors take their defaults.
/// Units built from distinct points never enumerate the same condition.
pub fn plan_workunits(
    space: &FactorSpace,
    base: &BTreeMap<String, Value>,
    partition: &Hypercube,
) -> Result<Vec<String>, SweepError> {
    let schema = space.condition_schema();
    partition
        .conditions()
        .map(|point| {
            let mut args = base.clone();
            for (key, level) in point.levels() {
                args.insert(key.to_string(), Value::Single(level.clone()));
            }
            CanonicalDict::new(schema, args).map(|spec| spec.encode())
        })
        .collect()
}
