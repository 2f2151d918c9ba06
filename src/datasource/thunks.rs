//! Async and store-aware operations of the data-source module.
//!
//! These are the action creators the dashboard calls: they read the current
//! state, talk to the [`PluginRegistry`], and dispatch the resulting actions.

use serde_json::{json, Value};
use tracing::Instrument;

use super::actions::DataSourceAction;
use super::reducer::{DataSourceState, MODULE_NAME};
use crate::domain::{
    normalize_load_result, DashboardError, DataSource, LoadedData, Result, SourceMetadata,
    ValidationResult,
};
use crate::plugin::{HookName, PluginRegistry};
use crate::store::Store;

fn state(store: &Store) -> Option<std::sync::Arc<DataSourceState>> {
    store.module::<DataSourceState>(MODULE_NAME)
}

fn source_exists(store: &Store, source_id: &str) -> bool {
    state(store).is_some_and(|s| s.sources.contains_key(source_id))
}

/// Registers a source, stamping its creation time.
///
/// Returns `false` if a source with the same id already exists.
pub fn add_source(store: &Store, mut source: DataSource) -> bool {
    if source_exists(store, &source.id) {
        tracing::warn!(source_id = %source.id, "data source already exists");
        return false;
    }

    source.created_at = Some(chrono::Utc::now().timestamp_millis());
    tracing::debug!(source_id = %source.id, plugin = ?source.plugin_key(), "adding data source");
    store.dispatch(DataSourceAction::AddSource(source));
    true
}

/// Merges `config` into a source's config, marks it dirty and fires
/// `onConfigChange`.
pub fn update_source(store: &Store, registry: &PluginRegistry, source_id: &str, config: Value) -> bool {
    if !source_exists(store, source_id) {
        tracing::warn!(source_id = %source_id, "cannot update unknown data source");
        return false;
    }

    store.dispatch(DataSourceAction::UpdateSource {
        source_id: source_id.to_string(),
        config: config.clone(),
    });
    registry.execute_hook(
        HookName::OnConfigChange,
        &json!({ "sourceId": source_id, "config": config }),
    );
    true
}

pub fn remove_source(store: &Store, source_id: &str) -> bool {
    if !source_exists(store, source_id) {
        tracing::warn!(source_id = %source_id, "cannot remove unknown data source");
        return false;
    }
    store.dispatch(DataSourceAction::RemoveSource {
        source_id: source_id.to_string(),
    });
    true
}

pub fn set_synced(store: &Store, source_id: &str) {
    store.dispatch(DataSourceAction::set_synced(source_id));
}

pub fn set_dirty(store: &Store, source_id: &str) {
    store.dispatch(DataSourceAction::set_dirty(source_id));
}

/// Loads a source through its plugin and stores the rows.
///
/// Dispatches `LOAD_REQUEST`, then exactly one of `LOAD_SUCCESS` or
/// `LOAD_FAILURE`. On success the `onDataLoad` hook fires with the source id
/// and row count.
///
/// # Errors
///
/// - [`DashboardError::SourceNotFound`] if the source is not registered
/// - [`DashboardError::NoPluginForSource`] if no enabled data-source plugin
///   matches the source's plugin id or type
/// - [`DashboardError::EmptyLoadResult`] if the plugin returned nothing
/// - any error raised by the plugin's loader
pub async fn load_data(
    store: &Store,
    registry: &PluginRegistry,
    source_id: &str,
    config: &Value,
) -> Result<LoadedData> {
    store.dispatch(DataSourceAction::LoadRequest {
        source_id: source_id.to_string(),
    });

    let span = tracing::debug_span!("load_data", source_id = %source_id);
    match fetch(store, registry, source_id, config).instrument(span).await {
        Ok((plugin_id, data, metadata)) => {
            tracing::debug!(source_id = %source_id, plugin_id = %plugin_id, rows = data.len(), "data source loaded");
            store.dispatch(DataSourceAction::load_success(source_id, data, &metadata));
            registry.execute_hook(
                HookName::OnDataLoad,
                &json!({
                    "sourceId": source_id,
                    "pluginId": plugin_id,
                    "rowCount": metadata.row_count,
                }),
            );
            // Hand back the rows the slice now owns rather than a copy.
            let data = state(store).map(|s| s.rows(source_id)).unwrap_or_default();
            Ok(LoadedData { data, metadata })
        }
        Err(e) => {
            tracing::error!(source_id = %source_id, error = %e, "data source load failed");
            store.dispatch(DataSourceAction::LoadFailure {
                source_id: source_id.to_string(),
                error: e.to_string(),
            });
            Err(e)
        }
    }
}

async fn fetch(
    store: &Store,
    registry: &PluginRegistry,
    source_id: &str,
    config: &Value,
) -> Result<(String, Vec<Value>, SourceMetadata)> {
    let source = state(store)
        .and_then(|s| s.source(source_id).cloned())
        .ok_or_else(|| DashboardError::SourceNotFound(source_id.to_string()))?;

    let plugin_id = source
        .plugin_key()
        .ok_or_else(|| DashboardError::NoPluginForSource(source_id.to_string()))?
        .to_string();
    let loader = registry.data_loader(&plugin_id)?;

    let options = source.merged_config(config);
    let raw = loader.load_data(&source.data, &options).await?;
    let (data, plugin) = normalize_load_result(&plugin_id, raw)?;

    let metadata = SourceMetadata {
        row_count: data.len(),
        last_loaded: Some(chrono::Utc::now().timestamp_millis()),
        errors: Vec::new(),
        plugin,
    };
    Ok((plugin_id, data, metadata))
}

/// Validates a source's loaded rows and records the result.
///
/// The rows must be a non-empty array. `requiredFields` (from `config`, else
/// the source config) lists fields every row must carry with a non-null
/// value. Problems are reported as `valid: false`, never as errors.
#[tracing::instrument(level = "debug", skip(store, config))]
pub fn validate_source(store: &Store, source_id: &str, config: &Value) -> ValidationResult {
    store.dispatch(DataSourceAction::ValidateSource {
        source_id: source_id.to_string(),
    });

    let result = check(state(store).as_deref(), source_id, config);
    tracing::debug!(source_id = %source_id, valid = result.valid, errors = result.errors.len(), "data source validated");

    store.dispatch(DataSourceAction::ValidationResult {
        source_id: source_id.to_string(),
        valid: result.valid,
        errors: result.errors.clone(),
    });
    result
}

fn check(state: Option<&DataSourceState>, source_id: &str, config: &Value) -> ValidationResult {
    let Some(source) = state.and_then(|s| s.source(source_id)) else {
        return ValidationResult::failed(vec![DashboardError::SourceNotFound(source_id.to_string()).to_string()]);
    };
    let Some(rows) = state.and_then(|s| s.data.get(source_id)) else {
        return ValidationResult::failed(vec!["Data must be an array".to_string()]);
    };
    if rows.is_empty() {
        return ValidationResult::failed(vec!["Data array is empty".to_string()]);
    }

    let merged = source.merged_config(config);
    let required: Vec<&str> = merged
        .get("requiredFields")
        .and_then(Value::as_array)
        .map(|fields| fields.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let errors: Vec<String> = required
        .iter()
        .filter_map(|field| {
            let missing = rows
                .iter()
                .filter(|row| row.get(field).map_or(true, Value::is_null))
                .count();
            (missing > 0).then(|| format!("Missing required field '{field}' in {missing} row(s)"))
        })
        .collect();

    if errors.is_empty() {
        ValidationResult::ok()
    } else {
        ValidationResult::failed(errors)
    }
}
