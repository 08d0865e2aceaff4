use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use rusqlite::{params_from_iter, Connection};
use sweep_core::{parse_scalar, Cell, ErrorInfo, SweepError, TabularExport};
use tracing::info;

/// Name of the SQLite table holding exported results.
pub const RESULTS_TABLE: &str = "results";

/// Supported export backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registry {
    /// Comma separated file with a header row.
    Csv(PathBuf),
    /// SQLite database holding one `results` table.
    Sqlite(PathBuf),
}

impl Registry {
    /// Chooses the backend from the file extension; anything that is not
    /// `.sqlite` or `.db` is written as CSV.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("sqlite") | Some("db") => Registry::Sqlite(path),
            _ => Registry::Csv(path),
        }
    }

    /// Backend file.
    pub fn path(&self) -> &Path {
        match self {
            Registry::Csv(path) | Registry::Sqlite(path) => path,
        }
    }
}

/// Writes the export, replacing whatever the backend held before.
pub fn registry_write(registry: &Registry, export: &TabularExport) -> Result<(), SweepError> {
    match registry {
        Registry::Csv(path) => write_csv(path, export),
        Registry::Sqlite(path) => write_sqlite(path, export),
    }
}

/// Reads a previously written export. Cells are re-typed by probing.
pub fn registry_read(registry: &Registry) -> Result<TabularExport, SweepError> {
    match registry {
        Registry::Csv(path) => read_csv(path),
        Registry::Sqlite(path) => read_sqlite(path),
    }
}

fn render_cell(cell: &Cell) -> String {
    cell.as_ref().map(|scalar| scalar.render()).unwrap_or_default()
}

fn parse_cell(text: &str) -> Cell {
    if text.is_empty() {
        None
    } else {
        Some(parse_scalar(text))
    }
}

/// Writes a header row followed by one line per result; null cells are empty.
pub fn write_csv(path: &Path, export: &TabularExport) -> Result<(), SweepError> {
    ensure_parent(path)?;
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .map_err(|err| wrap_csv("registry.csv_open", path, err))?;
    writer
        .write_record(&export.columns)
        .map_err(|err| wrap_csv("registry.csv_header", path, err))?;
    for row in &export.rows {
        writer
            .write_record(row.iter().map(render_cell))
            .map_err(|err| wrap_csv("registry.csv_row", path, err))?;
    }
    writer
        .flush()
        .map_err(|err| SweepError::io("registry.csv_flush", path, err))?;
    info!(path = %path.display(), rows = export.rows.len(), "csv export written");
    Ok(())
}

/// Reads a CSV export; empty cells are null.
pub fn read_csv(path: &Path) -> Result<TabularExport, SweepError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|err| wrap_csv("registry.csv_read", path, err))?;
    let columns = reader
        .headers()
        .map_err(|err| wrap_csv("registry.csv_header", path, err))?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| wrap_csv("registry.csv_record", path, err))?;
        rows.push(record.iter().map(parse_cell).collect());
    }
    Ok(TabularExport { columns, rows })
}

fn write_sqlite(path: &Path, export: &TabularExport) -> Result<(), SweepError> {
    if export.columns.is_empty() {
        return Err(SweepError::InvalidValue(
            ErrorInfo::new("registry.sqlite_no_columns", "cannot create a table without columns")
                .with_context("path", path.display().to_string()),
        ));
    }
    ensure_parent(path)?;
    let mut conn = Connection::open(path).map_err(|err| sqlite_error("registry.sqlite_open", err))?;
    let columns = export
        .columns
        .iter()
        .map(|name| quote_ident(name))
        .collect::<Vec<_>>();
    let definitions = columns
        .iter()
        .map(|name| format!("{name} TEXT"))
        .collect::<Vec<_>>()
        .join(", ");
    conn.execute_batch(&format!(
        "DROP TABLE IF EXISTS {RESULTS_TABLE}; CREATE TABLE {RESULTS_TABLE} ({definitions});"
    ))
    .map_err(|err| sqlite_error("registry.sqlite_schema", err))?;
    let placeholders = (1..=columns.len())
        .map(|idx| format!("?{idx}"))
        .collect::<Vec<_>>()
        .join(", ");
    let insert = format!(
        "INSERT INTO {RESULTS_TABLE} ({}) VALUES ({placeholders})",
        columns.join(", ")
    );
    let tx = conn
        .transaction()
        .map_err(|err| sqlite_error("registry.sqlite_transaction", err))?;
    {
        let mut stmt = tx
            .prepare(&insert)
            .map_err(|err| sqlite_error("registry.sqlite_prepare", err))?;
        for row in &export.rows {
            let values = row
                .iter()
                .map(|cell| cell.as_ref().map(|scalar| scalar.render()));
            stmt.execute(params_from_iter(values))
                .map_err(|err| sqlite_error("registry.sqlite_insert", err))?;
        }
    }
    tx.commit()
        .map_err(|err| sqlite_error("registry.sqlite_commit", err))?;
    info!(path = %path.display(), rows = export.rows.len(), "sqlite export written");
    Ok(())
}

fn read_sqlite(path: &Path) -> Result<TabularExport, SweepError> {
    if !path.exists() {
        return Err(SweepError::io("registry.sqlite_missing", path, "registry file not found"));
    }
    let conn = Connection::open(path).map_err(|err| sqlite_error("registry.sqlite_open", err))?;
    let mut stmt = conn
        .prepare(&format!("SELECT * FROM {RESULTS_TABLE} ORDER BY rowid"))
        .map_err(|err| sqlite_error("registry.sqlite_prepare", err))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
    let width = columns.len();
    let mut query = stmt
        .query([])
        .map_err(|err| sqlite_error("registry.sqlite_query", err))?;
    let mut rows = Vec::new();
    while let Some(row) = query
        .next()
        .map_err(|err| sqlite_error("registry.sqlite_row", err))?
    {
        let mut cells = Vec::with_capacity(width);
        for idx in 0..width {
            let value: Option<String> = row
                .get(idx)
                .map_err(|err| sqlite_error("registry.sqlite_value", err))?;
            cells.push(value.as_deref().and_then(parse_cell));
        }
        rows.push(cells);
    }
    Ok(TabularExport { columns, rows })
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn ensure_parent(path: &Path) -> Result<(), SweepError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| SweepError::io("registry.dir", parent, err))?;
        }
    }
    Ok(())
}

fn wrap_csv(code: &str, path: &Path, err: csv::Error) -> SweepError {
    SweepError::Serde(
        ErrorInfo::new(code, "csv registry failure")
            .with_context("path", path.display().to_string())
            .with_hint(err.to_string()),
    )
}

fn sqlite_error(code: &str, err: rusqlite::Error) -> SweepError {
    SweepError::Serde(ErrorInfo::new(code, "sqlite registry failure").with_hint(err.to_string()))
}
