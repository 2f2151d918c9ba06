//! Data source domain model.
//!
//! A [`DataSource`] describes where a dataset comes from (which plugin loads it
//! and with what input/config). Everything the store tracks per source
//! (loaded rows, [`SourceMetadata`], [`ValidationResult`], [`SyncStatus`]) is
//! keyed by the source id.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{DashboardError, Result};

/// A registered data source.
///
/// `plugin_id` takes precedence over `source_type` when resolving the plugin
/// that loads the source. `data` is opaque plugin input (a file path, inline
/// text, inline rows); `config` is merged with per-call options on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_id: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub config: Map<String, Value>,
    /// Unix timestamp in milliseconds, stamped when the source is added.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl DataSource {
    /// Creates a source loaded by the given plugin.
    #[must_use]
    pub fn new(id: impl Into<String>, plugin_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            plugin_id: Some(plugin_id.into()),
            source_type: None,
            data: Value::Null,
            config: Map::new(),
            created_at: None,
        }
    }

    /// Sets the opaque plugin input.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Sets the source configuration.
    #[must_use]
    pub fn with_config(mut self, config: Map<String, Value>) -> Self {
        self.config = config;
        self
    }

    /// Key used to resolve the loading plugin: `plugin_id`, else `type`.
    #[must_use]
    pub fn plugin_key(&self) -> Option<&str> {
        self.plugin_id
            .as_deref()
            .or(self.source_type.as_deref())
            .filter(|key| !key.is_empty())
    }

    /// Returns the source config with `overrides` deep-merged on top.
    #[must_use]
    pub fn merged_config(&self, overrides: &Value) -> Value {
        let mut merged = Value::Object(self.config.clone());
        merge_json(&mut merged, overrides);
        merged
    }
}

/// Deep-merges `overlay` into `base`. Objects merge key by key; any other
/// overlay value replaces the base value. A `null` overlay leaves `base` alone.
pub fn merge_json(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Load bookkeeping for a source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMetadata {
    pub row_count: usize,
    /// Unix timestamp in milliseconds of the last successful load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_loaded: Option<i64>,
    #[serde(default)]
    pub errors: Vec<String>,
    /// Plugin-supplied metadata (columns, file name, ...), kept under its own
    /// key so it never shadows the fields above.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub plugin: Map<String, Value>,
}

/// Outcome of validating a source's loaded data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ValidationResult {
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}

/// Whether a source's stored data reflects its current configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Synced,
    Dirty,
}

/// Normalized result of a successful load.
///
/// `data` is the same allocation the data-source slice stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedData {
    pub data: Arc<Vec<Value>>,
    pub metadata: SourceMetadata,
}

/// Normalizes whatever a data-source plugin returned into rows plus
/// plugin metadata.
///
/// Accepted shapes: a bare array of rows, an object with a `data` array and an
/// optional `metadata` object, or a single object (treated as one row).
/// `null`, `false`, `0` and `""` count as "no result".
///
/// # Errors
///
/// [`DashboardError::EmptyLoadResult`] for falsy results,
/// [`DashboardError::Load`] when `data` is present but not an array or the
/// result is a bare scalar.
pub fn normalize_load_result(plugin_id: &str, result: Value) -> Result<(Vec<Value>, Map<String, Value>)> {
    if !is_truthy(&result) {
        return Err(DashboardError::EmptyLoadResult(plugin_id.to_string()));
    }

    match result {
        Value::Array(rows) => Ok((rows, Map::new())),
        Value::Object(mut object) => match object.remove("data") {
            Some(Value::Array(rows)) => {
                let metadata = match object.remove("metadata") {
                    Some(Value::Object(metadata)) => metadata,
                    _ => Map::new(),
                };
                Ok((rows, metadata))
            }
            Some(other) => Err(DashboardError::Load(format!(
                "plugin '{plugin_id}' returned non-array data: {other}"
            ))),
            None => Ok((vec![Value::Object(object)], Map::new())),
        },
        other => Err(DashboardError::Load(format!(
            "plugin '{plugin_id}' returned an unsupported result: {other}"
        ))),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plugin_key_prefers_plugin_id() {
        let mut source = DataSource::new("s1", "csv1");
        source.source_type = Some("csv".to_string());
        assert_eq!(source.plugin_key(), Some("csv1"));

        source.plugin_id = None;
        assert_eq!(source.plugin_key(), Some("csv"));
    }

    #[test]
    fn merged_config_overlays_nested_keys() {
        let config = json!({"delimiter": ",", "columns": {"id": "string", "owner": "string"}});
        let source = DataSource::new("s1", "csv").with_config(config.as_object().cloned().unwrap_or_default());

        let merged = source.merged_config(&json!({"columns": {"owner": "number"}, "inferTypes": true}));
        assert_eq!(
            merged,
            json!({
                "delimiter": ",",
                "columns": {"id": "string", "owner": "number"},
                "inferTypes": true
            })
        );
    }

    #[test]
    fn normalize_accepts_bare_rows_and_wrapped_rows() {
        let (rows, meta) = normalize_load_result("p", json!([{"a": 1}])).unwrap();
        assert_eq!(rows, vec![json!({"a": 1})]);
        assert!(meta.is_empty());

        let (rows, meta) =
            normalize_load_result("p", json!({"data": [{"a": 2}], "metadata": {"columns": ["a"]}})).unwrap();
        assert_eq!(rows, vec![json!({"a": 2})]);
        assert_eq!(meta.get("columns"), Some(&json!(["a"])));
    }

    #[test]
    fn normalize_rejects_falsy_and_scalar_results() {
        assert!(matches!(
            normalize_load_result("p", Value::Null),
            Err(DashboardError::EmptyLoadResult(_))
        ));
        assert!(matches!(
            normalize_load_result("p", json!(false)),
            Err(DashboardError::EmptyLoadResult(_))
        ));
        assert!(matches!(normalize_load_result("p", json!(42)), Err(DashboardError::Load(_))));
        assert!(matches!(
            normalize_load_result("p", json!({"data": "nope"})),
            Err(DashboardError::Load(_))
        ));
    }

    #[test]
    fn empty_array_is_a_valid_result() {
        let (rows, _) = normalize_load_result("p", json!([])).unwrap();
        assert!(rows.is_empty());
    }
}
