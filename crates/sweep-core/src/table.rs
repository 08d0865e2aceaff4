//! Columnar accumulator of completed outcomes.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::encoding::{encode_entries, Separators};
use crate::errors::{ErrorInfo, SweepError};
use crate::record::ResultRecord;
use crate::value::{Scalar, Value};

/// One table cell. `None` is the null placeholder used for back-filling.
pub type Cell = Option<Scalar>;

/// Parallel, equal-length columns; one row per completed condition in
/// completion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable", into = "RawTable")]
pub struct ResultTable {
    columns: BTreeMap<String, Vec<Cell>>,
    rows: usize,
}

#[derive(Serialize, Deserialize)]
struct RawTable {
    columns: BTreeMap<String, Vec<Cell>>,
    rows: usize,
}

impl TryFrom<RawTable> for ResultTable {
    type Error = SweepError;

    fn try_from(raw: RawTable) -> Result<Self, Self::Error> {
        let table = ResultTable {
            columns: raw.columns,
            rows: raw.rows,
        };
        table.len()?;
        Ok(table)
    }
}

impl From<ResultTable> for RawTable {
    fn from(table: ResultTable) -> Self {
        RawTable {
            columns: table.columns,
            rows: table.rows,
        }
    }
}

/// Row-oriented view of a table, ready for file export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularExport {
    /// Column headers.
    pub columns: Vec<String>,
    /// One entry per row, aligned with `columns`.
    pub rows: Vec<Vec<Cell>>,
}

impl ResultTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table that already tracks the given columns.
    pub fn with_columns<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            columns: keys
                .into_iter()
                .map(|key| (key.to_string(), Vec::new()))
                .collect(),
            rows: 0,
        }
    }

    /// Builds a table from explicit columns, rejecting diverging lengths.
    pub fn from_columns(columns: BTreeMap<String, Vec<Cell>>) -> Result<Self, SweepError> {
        let rows = columns.values().map(Vec::len).next().unwrap_or(0);
        let table = Self { columns, rows };
        table.len()?;
        Ok(table)
    }

    /// Number of rows. Fails with [`SweepError::InconsistentLength`] when a
    /// column length diverges from the row count.
    pub fn len(&self) -> Result<usize, SweepError> {
        for (key, column) in &self.columns {
            if column.len() != self.rows {
                return Err(SweepError::InconsistentLength(
                    ErrorInfo::new("table.length", "column lengths diverge")
                        .with_context("column", key.clone())
                        .with_context("length", column.len().to_string())
                        .with_context("expected", self.rows.to_string()),
                ));
            }
        }
        Ok(self.rows)
    }

    /// Returns true when the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Tracked column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Borrows one column.
    pub fn column(&self, key: &str) -> Option<&[Cell]> {
        self.columns.get(key).map(Vec::as_slice)
    }

    /// Appends one record. Unseen keys become new columns back-filled with
    /// nulls; tracked columns absent from the record receive a null.
    pub fn append(&mut self, record: &ResultRecord) {
        self.append_row(
            record
                .fields()
                .map(|(key, scalar)| (key.to_string(), Some(scalar.clone())))
                .collect(),
        );
    }

    /// Appends a row given as a map of cells.
    pub fn append_row(&mut self, mut row: BTreeMap<String, Cell>) {
        for key in row.keys() {
            if !self.columns.contains_key(key) {
                self.columns.insert(key.clone(), vec![None; self.rows]);
            }
        }
        for (key, column) in self.columns.iter_mut() {
            column.push(row.remove(key).flatten());
        }
        self.rows += 1;
    }

    /// Appends the rows of `other`.
    ///
    /// When `allow_duplicates` is false a row is skipped if an identical row,
    /// compared over the union of both tables' columns, is already present.
    pub fn extend(&mut self, other: &ResultTable, allow_duplicates: bool) {
        for key in other.columns.keys() {
            if !self.columns.contains_key(key) {
                self.columns.insert(key.clone(), vec![None; self.rows]);
            }
        }
        let mut seen: HashSet<String> = if allow_duplicates {
            HashSet::new()
        } else {
            (0..self.rows).map(|idx| self.row_key(idx)).collect()
        };
        for idx in 0..other.rows {
            let row = other.row(idx).unwrap_or_default();
            if !allow_duplicates {
                let key = self.key_for(&row);
                if !seen.insert(key) {
                    continue;
                }
            }
            self.append_row(row);
        }
    }

    /// Returns row `idx` as a map over every tracked column.
    pub fn row(&self, idx: usize) -> Option<BTreeMap<String, Cell>> {
        if idx >= self.rows {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|(key, column)| (key.clone(), column.get(idx).cloned().flatten()))
                .collect(),
        )
    }

    /// Iterates over rows in completion order.
    pub fn rows(&self) -> impl Iterator<Item = BTreeMap<String, Cell>> + '_ {
        (0..self.rows).filter_map(move |idx| self.row(idx))
    }

    /// Canonical encodings of the conditions already present, projected onto
    /// `factors`. Rows missing a factor are encoded without it.
    pub fn condition_encodings(&self, factors: &[&str]) -> HashSet<String> {
        let seps = Separators::default();
        (0..self.rows)
            .map(|idx| {
                let entries: BTreeMap<String, Value> = factors
                    .iter()
                    .filter_map(|&key| {
                        self.columns
                            .get(key)
                            .and_then(|column| column[idx].clone())
                            .map(|scalar| (key.to_string(), Value::Single(scalar)))
                    })
                    .collect();
                encode_entries(&entries, &seps)
            })
            .collect()
    }

    /// Produces a row-oriented export. Columns named in `leading` come first
    /// in the given order, the rest follow lexicographically.
    pub fn to_tabular_export<'a>(&self, leading: impl IntoIterator<Item = &'a str>) -> TabularExport {
        let mut columns: Vec<String> = Vec::new();
        for key in leading {
            if self.columns.contains_key(key) && !columns.iter().any(|c| c == key) {
                columns.push(key.to_string());
            }
        }
        for key in self.columns.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        let rows = (0..self.rows)
            .map(|idx| {
                columns
                    .iter()
                    .map(|key| self.columns[key][idx].clone())
                    .collect()
            })
            .collect();
        TabularExport { columns, rows }
    }

    /// Rebuilds a table from a row-oriented export.
    pub fn from_tabular(export: &TabularExport) -> Result<Self, SweepError> {
        let mut table = Self::with_columns(export.columns.iter().map(String::as_str));
        for (line, row) in export.rows.iter().enumerate() {
            if row.len() != export.columns.len() {
                return Err(SweepError::InconsistentLength(
                    ErrorInfo::new("table.tabular_row", "row width differs from header width")
                        .with_context("row", line.to_string())
                        .with_context("width", row.len().to_string())
                        .with_context("expected", export.columns.len().to_string()),
                ));
            }
            table.append_row(export.columns.iter().cloned().zip(row.iter().cloned()).collect());
        }
        Ok(table)
    }

    fn row_key(&self, idx: usize) -> String {
        let row = self.row(idx).unwrap_or_default();
        self.key_for(&row)
    }

    // Tags keep Str("1") and Int(1) apart; the unit separator cannot occur in a safe token.
    fn key_for(&self, row: &BTreeMap<String, Cell>) -> String {
        self.columns
            .keys()
            .map(|key| match row.get(key).and_then(Option::as_ref) {
                Some(scalar) => format!("{}:{}", scalar.kind(), scalar.render()),
                None => "null".to_string(),
            })
            .collect::<Vec<_>>()
            .join("\u{1f}")
    }
}
