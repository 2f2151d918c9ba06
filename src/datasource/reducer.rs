//! The `dataSources` state slice and its reducer.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::actions::DataSourceAction;
use crate::domain::{merge_json, DataSource, SourceMetadata, SyncStatus, ValidationResult};
use crate::store::{Action, ActionSet, Module};

pub const MODULE_NAME: &str = "dataSources";

/// Per-source bookkeeping, every map keyed by source id.
///
/// Loaded rows sit behind an `Arc` so state clones stay shallow.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceState {
    pub sources: BTreeMap<String, DataSource>,
    pub data: BTreeMap<String, Arc<Vec<Value>>>,
    pub metadata: BTreeMap<String, SourceMetadata>,
    pub validation_results: BTreeMap<String, ValidationResult>,
    pub sync_status: BTreeMap<String, SyncStatus>,
    pub loading: BTreeMap<String, bool>,
    pub errors: BTreeMap<String, String>,
}

impl DataSourceState {
    #[must_use]
    pub fn source(&self, id: &str) -> Option<&DataSource> {
        self.sources.get(id)
    }

    /// Loaded rows of a source; empty if it never loaded.
    #[must_use]
    pub fn rows(&self, id: &str) -> Arc<Vec<Value>> {
        self.data.get(id).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn is_loading(&self, id: &str) -> bool {
        self.loading.get(id).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn sync_status(&self, id: &str) -> Option<SyncStatus> {
        self.sync_status.get(id).copied()
    }
}

#[must_use]
pub fn module() -> Module {
    Module::new(MODULE_NAME, reducer, DataSourceState::default())
}

pub fn reducer(state: &Arc<DataSourceState>, action: &Action) -> Arc<DataSourceState> {
    let Some(action) = DataSourceAction::from_action(action) else {
        return Arc::clone(state);
    };

    let mut next = (**state).clone();
    if apply(&mut next, action) {
        Arc::new(next)
    } else {
        Arc::clone(state)
    }
}

/// Applies one action; returns whether anything changed.
fn apply(state: &mut DataSourceState, action: DataSourceAction) -> bool {
    match action {
        DataSourceAction::AddSource(source) => {
            if state.sources.contains_key(&source.id) {
                tracing::warn!(source_id = %source.id, "data source already exists");
                return false;
            }
            state.sync_status.insert(source.id.clone(), SyncStatus::Dirty);
            state.sources.insert(source.id.clone(), source);
            true
        }
        DataSourceAction::UpdateSource { source_id, config } => {
            let Some(source) = state.sources.get_mut(&source_id) else {
                tracing::warn!(source_id = %source_id, "cannot update unknown data source");
                return false;
            };
            let mut merged = Value::Object(std::mem::take(&mut source.config));
            merge_json(&mut merged, &config);
            if let Value::Object(map) = merged {
                source.config = map;
            }
            state.sync_status.insert(source_id, SyncStatus::Dirty);
            true
        }
        DataSourceAction::RemoveSource { source_id } => {
            let existed = state.sources.remove(&source_id).is_some();
            state.data.remove(&source_id);
            state.metadata.remove(&source_id);
            state.validation_results.remove(&source_id);
            state.sync_status.remove(&source_id);
            state.loading.remove(&source_id);
            state.errors.remove(&source_id);
            existed
        }
        DataSourceAction::LoadRequest { source_id } => {
            if !state.sources.contains_key(&source_id) {
                tracing::debug!(source_id = %source_id, "ignoring load request for unknown source");
                return false;
            }
            let cleared = state.errors.remove(&source_id).is_some();
            let started = state.loading.insert(source_id, true) != Some(true);
            cleared || started
        }
        DataSourceAction::LoadSuccess {
            source_id,
            data,
            metadata,
        } => {
            state.data.insert(source_id.clone(), Arc::new(data));
            state.metadata.insert(source_id.clone(), metadata);
            state.sync_status.insert(source_id.clone(), SyncStatus::Synced);
            state.loading.insert(source_id.clone(), false);
            state.errors.remove(&source_id);
            true
        }
        DataSourceAction::LoadFailure { source_id, error } => {
            if !state.sources.contains_key(&source_id) {
                tracing::debug!(source_id = %source_id, error = %error, "ignoring load failure for unknown source");
                return false;
            }
            state.loading.insert(source_id.clone(), false);
            if let Some(metadata) = state.metadata.get_mut(&source_id) {
                metadata.errors = vec![error.clone()];
            }
            state.errors.insert(source_id, error);
            true
        }
        DataSourceAction::ValidateSource { source_id } => {
            state.validation_results.remove(&source_id).is_some()
        }
        DataSourceAction::ValidationResult {
            source_id,
            valid,
            errors,
        } => {
            let result = ValidationResult { valid, errors };
            state.validation_results.insert(source_id, result.clone()) != Some(result)
        }
        DataSourceAction::SetSynced { source_id } => set_status(state, source_id, SyncStatus::Synced),
        DataSourceAction::SetDirty { source_id } => set_status(state, source_id, SyncStatus::Dirty),
    }
}

fn set_status(state: &mut DataSourceState, source_id: String, status: SyncStatus) -> bool {
    if !state.sources.contains_key(&source_id) {
        tracing::warn!(source_id = %source_id, status = ?status, "ignoring status change for unknown source");
        return false;
    }
    state.sync_status.insert(source_id, status) != Some(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reduce(state: &Arc<DataSourceState>, action: DataSourceAction) -> Arc<DataSourceState> {
        reducer(state, &action.into())
    }

    fn with_source() -> Arc<DataSourceState> {
        let state = Arc::new(DataSourceState::default());
        let source = DataSource::new("s1", "csv")
            .with_config(json!({"delimiter": ","}).as_object().cloned().unwrap_or_default());
        reduce(&state, DataSourceAction::AddSource(source))
    }

    #[test]
    fn new_sources_start_dirty() {
        let state = with_source();
        assert_eq!(state.sync_status("s1"), Some(SyncStatus::Dirty));
    }

    #[test]
    fn load_success_stores_rows_and_marks_synced() {
        let state = with_source();
        let state = reduce(&state, DataSourceAction::LoadRequest { source_id: "s1".into() });
        assert!(state.is_loading("s1"));

        let state = reduce(
            &state,
            DataSourceAction::LoadSuccess {
                source_id: "s1".into(),
                data: vec![json!({"a": 1})],
                metadata: SourceMetadata {
                    row_count: 1,
                    ..SourceMetadata::default()
                },
            },
        );
        assert!(!state.is_loading("s1"));
        assert_eq!(*state.rows("s1"), vec![json!({"a": 1})]);
        assert_eq!(state.sync_status("s1"), Some(SyncStatus::Synced));
    }

    #[test]
    fn update_merges_config_and_marks_dirty() {
        let state = with_source();
        let state = reduce(&state, DataSourceAction::set_synced("s1"));
        let state = reduce(
            &state,
            DataSourceAction::UpdateSource {
                source_id: "s1".into(),
                config: json!({"inferTypes": true}),
            },
        );
        let source = state.source("s1").unwrap();
        assert_eq!(source.config.get("delimiter"), Some(&json!(",")));
        assert_eq!(source.config.get("inferTypes"), Some(&json!(true)));
        assert_eq!(state.sync_status("s1"), Some(SyncStatus::Dirty));
    }

    #[test]
    fn remove_drops_every_keyed_entry() {
        let state = with_source();
        let state = reduce(
            &state,
            DataSourceAction::LoadFailure {
                source_id: "s1".into(),
                error: "boom".into(),
            },
        );
        let state = reduce(&state, DataSourceAction::RemoveSource { source_id: "s1".into() });
        assert!(state.sources.is_empty());
        assert!(state.errors.is_empty());
        assert!(state.loading.is_empty());
        assert!(state.sync_status.is_empty());
    }

    #[test]
    fn redundant_status_change_keeps_identity() {
        let state = with_source();
        let same = reduce(&state, DataSourceAction::set_dirty("s1"));
        assert!(Arc::ptr_eq(&state, &same));
        let same = reduce(&state, DataSourceAction::set_synced("unknown"));
        assert!(Arc::ptr_eq(&state, &same));
    }

    #[test]
    fn load_outcomes_for_unknown_sources_create_no_entries() {
        let state = with_source();
        let same = reduce(&state, DataSourceAction::LoadRequest { source_id: "ghost".into() });
        let same = reduce(
            &same,
            DataSourceAction::LoadFailure {
                source_id: "ghost".into(),
                error: "Data source not found: ghost".into(),
            },
        );
        assert!(Arc::ptr_eq(&state, &same));
        assert!(!same.errors.contains_key("ghost"));
        assert!(!same.loading.contains_key("ghost"));
    }

    #[test]
    fn unrelated_actions_keep_identity() {
        let state = with_source();
        let same = reducer(&state, &Action::new("TOGGLE_SIDEBAR"));
        assert!(Arc::ptr_eq(&state, &same));
    }
}
