//! Snapshot persistence for workunits.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sweep_core::{CanonicalDict, ResultTable, SweepError};

use crate::serde::{from_json_slice, to_canonical_json_bytes};

/// File name prefix shared by all workunit snapshots.
pub const SNAPSHOT_PREFIX: &str = "wu_";
/// File extension of workunit snapshots.
pub const SNAPSHOT_EXTENSION: &str = "pcl";
/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Deterministic snapshot file name for a workunit encoding.
pub fn snapshot_filename(encoding: &str) -> String {
    format!("{SNAPSHOT_PREFIX}{encoding}.{SNAPSHOT_EXTENSION}")
}

/// Serialized state of a workunit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Layout version, see [`SNAPSHOT_VERSION`].
    pub version: u32,
    /// Unexpanded workunit specification.
    pub spec: CanonicalDict,
    /// Exclusion specification; empty when nothing is excluded.
    #[serde(default)]
    pub exclusions: CanonicalDict,
    /// Results accumulated so far.
    pub results: ResultTable,
}

/// Reads and writes one object at a fixed path.
///
/// Writes go through a sibling temporary file and a rename so a reader never
/// observes a partially written snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persister {
    path: PathBuf,
}

impl Persister {
    /// Creates a persister for `path`; nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Target file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the target file exists.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Writes `value` as canonical JSON, replacing any earlier contents.
    pub fn dump<T: Serialize>(&self, value: &T) -> Result<(), SweepError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|err| SweepError::io("persist.dir", parent, err))?;
            }
        }
        let bytes = to_canonical_json_bytes(value)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, bytes).map_err(|err| SweepError::io("persist.write", &tmp, err))?;
        fs::rename(&tmp, &self.path).map_err(|err| SweepError::io("persist.rename", &self.path, err))
    }

    /// Reads the object back from canonical JSON.
    pub fn load<T: DeserializeOwned>(&self) -> Result<T, SweepError> {
        let bytes =
            fs::read(&self.path).map_err(|err| SweepError::io("persist.read", &self.path, err))?;
        from_json_slice(&bytes)
    }

    /// Removes the file; a missing file is not an error.
    pub fn delete(&self) -> Result<(), SweepError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(SweepError::io("persist.delete", &self.path, err)),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
