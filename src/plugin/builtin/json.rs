//! JSON data-source plugin.
//!
//! Accepts `{"path": "..."}` (a file holding an array of records, or an
//! object with a `data` array), `{"rows": [...]}` for inline records, or a
//! bare array.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{DashboardError, Result};
use crate::plugin::{DataLoader, Plugin};

pub const PLUGIN_ID: &str = "json";

#[must_use]
pub fn plugin() -> Plugin {
    Plugin::data_source(PLUGIN_ID, "JSON Loader", env!("CARGO_PKG_VERSION"), Arc::new(JsonLoader))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLoader;

#[async_trait]
impl DataLoader for JsonLoader {
    async fn load_data(&self, source: &Value, _options: &Value) -> Result<Value> {
        match source {
            Value::Array(_) => Ok(source.clone()),
            Value::Object(input) => match (input.get("rows"), input.get("path")) {
                (Some(rows @ Value::Array(_)), _) => Ok(rows.clone()),
                (_, Some(Value::String(path))) => {
                    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
                        DashboardError::Load(format!("failed to read json file '{path}': {e}"))
                    })?;
                    Ok(serde_json::from_str(&text)?)
                }
                _ => Err(DashboardError::Load(
                    "json source needs a 'path' or 'rows' field".to_string(),
                )),
            },
            other => Err(DashboardError::Load(format!(
                "json source must be an array or an object, got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn inline_rows_pass_through() {
        let rows = JsonLoader
            .load_data(&json!({"rows": [{"platformId": "WinDomain"}]}), &Value::Null)
            .await
            .unwrap();
        assert_eq!(rows, json!([{"platformId": "WinDomain"}]));
    }

    #[tokio::test]
    async fn reads_records_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("platforms.json");
        std::fs::write(&path, r#"[{"platformId": "UnixSSH"}]"#).unwrap();

        let rows = JsonLoader
            .load_data(&json!({"path": path.to_string_lossy()}), &Value::Null)
            .await
            .unwrap();
        assert_eq!(rows, json!([{"platformId": "UnixSSH"}]));
    }

    #[tokio::test]
    async fn missing_input_is_a_load_error() {
        let err = JsonLoader.load_data(&json!({}), &Value::Null).await.unwrap_err();
        assert!(matches!(err, DashboardError::Load(_)));
    }
}
