//! CSV data-source plugin.
//!
//! Parses the exports produced by the PAM collection scripts: a header row
//! followed by records, comma separated by default, with RFC 4180 quoting.
//!
//! Source input (`data` of the data source):
//!
//! - `{"path": "accounts.csv"}` reads a file
//! - `{"text": "a,b\n1,2"}` parses inline text
//! - a bare string is treated as a path
//!
//! Options: `delimiter` (single character, default `,`) and `inferTypes`
//! (parse numbers and booleans instead of keeping every cell a string).

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Number, Value};
use tracing::debug;

use crate::domain::{DashboardError, Result};
use crate::plugin::{DataLoader, Plugin};

pub const PLUGIN_ID: &str = "csv";

#[must_use]
pub fn plugin() -> Plugin {
    Plugin::data_source(PLUGIN_ID, "CSV Loader", env!("CARGO_PKG_VERSION"), Arc::new(CsvLoader))
}

/// Loads CSV text into an array of records keyed by header.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvLoader;

#[async_trait]
impl DataLoader for CsvLoader {
    async fn load_data(&self, source: &Value, options: &Value) -> Result<Value> {
        let (text, file_name) = match source {
            Value::String(path) => read_file(path).await?,
            Value::Object(input) => match (input.get("text"), input.get("path")) {
                (Some(Value::String(text)), _) => (text.clone(), None),
                (_, Some(Value::String(path))) => read_file(path).await?,
                _ => {
                    return Err(DashboardError::Load(
                        "csv source needs a 'path' or 'text' field".to_string(),
                    ))
                }
            },
            other => {
                return Err(DashboardError::Load(format!(
                    "csv source must be a path or an object, got {other}"
                )))
            }
        };

        let delimiter = delimiter(options)?;
        let infer = options.get("inferTypes").and_then(Value::as_bool).unwrap_or(false);

        let (columns, rows) = parse(&text, delimiter, infer)?;
        debug!(rows = rows.len(), columns = columns.len(), "parsed csv");

        let mut metadata = Map::new();
        metadata.insert("columns".to_string(), json!(columns));
        if let Some(name) = file_name {
            metadata.insert("fileName".to_string(), Value::String(name));
        }

        Ok(json!({ "data": rows, "metadata": metadata }))
    }
}

async fn read_file(path: &str) -> Result<(String, Option<String>)> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        DashboardError::Load(format!("failed to read csv file '{path}': {e}"))
    })?;
    let name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    Ok((text, name))
}

fn delimiter(options: &Value) -> Result<u8> {
    match options.get("delimiter") {
        None | Some(Value::Null) => Ok(b','),
        Some(Value::String(s)) => match s.as_bytes() {
            &[b] if b.is_ascii() && !matches!(b, b'"' | b'\n' | b'\r') => Ok(b),
            _ => Err(DashboardError::Load(format!("invalid csv delimiter: {s:?}"))),
        },
        Some(other) => Err(DashboardError::Load(format!("invalid csv delimiter: {other}"))),
    }
}

/// Parses CSV text into the header columns and one object per record.
///
/// Blank lines are skipped. Records shorter than the header get empty
/// strings (or `null` with type inference) for the missing cells; extra cells
/// are dropped.
///
/// # Errors
///
/// Returns [`DashboardError::Csv`] if the reader rejects the input.
pub fn parse(text: &str, delimiter: u8, infer_types: bool) -> Result<(Vec<String>, Vec<Value>)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(::csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() == 1 && record.get(0).is_some_and(|cell| cell.trim().is_empty()) {
            continue;
        }

        let mut row = Map::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            let value = match (record.get(i), infer_types) {
                (Some(cell), true) => infer(cell),
                (Some(cell), false) => Value::String(cell.to_string()),
                (None, true) => Value::Null,
                (None, false) => Value::String(String::new()),
            };
            row.insert(column.clone(), value);
        }
        rows.push(Value::Object(row));
    }

    Ok((columns, rows))
}

fn infer(cell: &str) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    match trimmed {
        "true" | "TRUE" | "True" => return Value::Bool(true),
        "false" | "FALSE" | "False" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Number(i.into());
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or_else(|| Value::String(cell.to_string()), Value::Number)
}
