//! Export plugins: JSON documents and CSV tables.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;

use crate::domain::{DashboardError, Result};
use crate::plugin::{Exporter, Plugin};

pub const JSON_EXPORT_ID: &str = "json-export";
pub const CSV_EXPORT_ID: &str = "csv-export";

#[must_use]
pub fn json_plugin() -> Plugin {
    Plugin::exporter(JSON_EXPORT_ID, "JSON Export", env!("CARGO_PKG_VERSION"), Arc::new(JsonExporter))
}

#[must_use]
pub fn csv_plugin() -> Plugin {
    Plugin::exporter(CSV_EXPORT_ID, "CSV Export", env!("CARGO_PKG_VERSION"), Arc::new(CsvExporter))
}

/// Serializes rows as a JSON array; `{"pretty": true}` indents it.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter;

impl Exporter for JsonExporter {
    fn export(&self, data: &[Value], options: &Value) -> Result<String> {
        let pretty = options.get("pretty").and_then(Value::as_bool).unwrap_or(false);
        let document = if pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(document)
    }
}

/// Renders object rows as CSV.
///
/// Columns come from the `columns` option, otherwise the union of row keys in
/// sorted order. Non-object rows are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

impl Exporter for CsvExporter {
    fn export(&self, data: &[Value], options: &Value) -> Result<String> {
        let columns: Vec<String> = match options.get("columns").and_then(Value::as_array) {
            Some(columns) => columns
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            None => data
                .iter()
                .filter_map(Value::as_object)
                .flat_map(|row| row.keys().cloned())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        };

        let mut writer = ::csv::WriterBuilder::new()
            .terminator(::csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        if !columns.is_empty() {
            writer.write_record(&columns)?;
        }

        for (index, row) in data.iter().enumerate() {
            let Some(row) = row.as_object() else {
                return Err(DashboardError::Capability(format!(
                    "csv export row {index} is not an object"
                )));
            };
            let cells: Vec<String> = columns
                .iter()
                .map(|column| match row.get(column) {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                })
                .collect();
            if !cells.is_empty() {
                writer.write_record(&cells)?;
            }
        }

        let bytes = writer.into_inner().map_err(|e| {
            DashboardError::Capability(format!("failed to flush csv export: {}", e.error()))
        })?;
        String::from_utf8(bytes)
            .map_err(|e| DashboardError::Capability(format!("csv export is not valid UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_export_is_compact_by_default() {
        let doc = JsonExporter.export(&[json!({"a": 1})], &Value::Null).unwrap();
        assert_eq!(doc, r#"[{"a":1}]"#);
    }

    #[test]
    fn csv_export_quotes_cells_that_need_it() {
        let rows = [json!({"safe": "Vault, Primary", "members": 3}), json!({"safe": "Backups"})];
        let doc = CsvExporter.export(&rows, &Value::Null).unwrap();
        assert_eq!(doc, "members,safe\n3,\"Vault, Primary\"\n,Backups\n");
    }

    #[test]
    fn csv_export_honours_column_selection() {
        let rows = [json!({"safe": "Backups", "members": 3})];
        let doc = CsvExporter.export(&rows, &json!({"columns": ["safe"]})).unwrap();
        assert_eq!(doc, "safe\nBackups\n");
    }

    #[test]
    fn csv_export_escapes_embedded_quotes_and_newlines() {
        let rows = [json!({"note": "rotated \"daily\"\nby CPM"})];
        let doc = CsvExporter.export(&rows, &Value::Null).unwrap();
        assert_eq!(doc, "note\n\"rotated \"\"daily\"\"\nby CPM\"\n");
    }

    #[test]
    fn csv_export_rejects_scalar_rows() {
        assert!(CsvExporter.export(&[json!(1)], &Value::Null).is_err());
    }
}
