//! Result aggregation -- flattens per-task rows into one dataset with a unified
//! column schema and serializes it to CSV.

use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::Record;

/// Flat records from every task plus the union of their columns
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Dataset {
    /// Flatten task results in submission order.
    ///
    /// `None` entries (failed tasks) and empty row lists are skipped. Returns `None`
    /// when no row remains, so that callers report "no data" instead of writing an
    /// empty file.
    pub fn from_results(results: Vec<Option<Vec<Record>>>) -> Option<Self> {
        Self::from_rows(results.into_iter().flatten().flatten().collect())
    }

    /// Build from already-flat rows; `None` when `rows` is empty
    pub fn from_rows(rows: Vec<Record>) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }

        // Keep first-appearance order, skip keys already seen
        let mut seen = HashSet::new();
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if seen.insert(key.as_str()) {
                    columns.push(key.clone());
                }
            }
        }

        Some(Self { columns, rows })
    }

    /// Unified columns in order of first appearance
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Raw rows as returned by the service
    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false; an empty dataset is never constructed
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows projected onto the unified columns, missing fields filled with `""`
    pub fn normalized_rows(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|column| {
                        let value = row
                            .get(column)
                            .cloned()
                            .unwrap_or_else(|| Value::String(String::new()));
                        (column.clone(), value)
                    })
                    .collect()
            })
            .collect()
    }

    /// Serialize to CSV: a header row, then one line per normalized row, CRLF
    /// terminated.
    ///
    /// Fields containing the delimiter, a quote or a line break are quoted.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .quote_style(csv::QuoteStyle::Necessary)
            .from_writer(Vec::new());

        writer.write_record(&self.columns)?;
        for row in self.normalized_rows() {
            writer.write_record(row.values().map(|value| render_cell(Some(value))))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| Error::Other(format!("CSV is not UTF-8: {e}")))
    }
}

/// Render one value as CSV cell text.
///
/// Strings are written verbatim, numbers and booleans in JSON notation, nulls and
/// missing fields as empty cells, nested arrays and objects as compact JSON.
pub fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested) => nested.to_string(),
    }
}

/// Artifact file name: `<base>-<ISO-8601 timestamp with ':' and '.' replaced by '-'>.csv`
pub fn export_filename(base_name: &str, now: DateTime<Utc>) -> String {
    let timestamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{base_name}-{timestamp}.csv")
}
