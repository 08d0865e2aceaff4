//! Structured error types shared across sweep crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`SweepError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (factor names, offending values, paths).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for condition-space operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SweepError {
    /// A key outside the declared schema was supplied.
    #[error("invalid key: {0}")]
    InvalidKey(ErrorInfo),
    /// A value is not elemental or cannot be encoded losslessly.
    #[error("invalid value: {0}")]
    InvalidValue(ErrorInfo),
    /// The universal sentinel was used for a factor without an expansion entry.
    #[error("missing expansion: {0}")]
    MissingExpansion(ErrorInfo),
    /// A canonical string is malformed or abbreviated.
    #[error("parse error: {0}")]
    Parse(ErrorInfo),
    /// Result table columns diverged in length.
    #[error("inconsistent length: {0}")]
    InconsistentLength(ErrorInfo),
    /// Filesystem failures.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl SweepError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            SweepError::InvalidKey(info)
            | SweepError::InvalidValue(info)
            | SweepError::MissingExpansion(info)
            | SweepError::Parse(info)
            | SweepError::InconsistentLength(info)
            | SweepError::Io(info)
            | SweepError::Serde(info) => info,
        }
    }

    /// Wraps an I/O failure, recording the path it concerns.
    pub fn io(code: &str, path: impl AsRef<std::path::Path>, err: impl ToString) -> Self {
        SweepError::Io(
            ErrorInfo::new(code, err.to_string())
                .with_context("path", path.as_ref().display().to_string()),
        )
    }

    /// Wraps a serialization failure.
    pub fn serde(code: &str, err: impl ToString) -> Self {
        SweepError::Serde(ErrorInfo::new(code, err.to_string()))
    }
}
