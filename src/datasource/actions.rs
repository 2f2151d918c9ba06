//! Data-source actions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{DataSource, SourceMetadata};
use crate::store::{Action, ActionSet, INVALID};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSourceAction {
    AddSource(DataSource),
    /// Deep-merges `config` into the source config and marks it dirty.
    UpdateSource {
        #[serde(rename = "sourceId")]
        source_id: String,
        config: Value,
    },
    RemoveSource {
        #[serde(rename = "sourceId")]
        source_id: String,
    },
    LoadRequest {
        #[serde(rename = "sourceId")]
        source_id: String,
    },
    LoadSuccess {
        #[serde(rename = "sourceId")]
        source_id: String,
        data: Vec<Value>,
        metadata: SourceMetadata,
    },
    LoadFailure {
        #[serde(rename = "sourceId")]
        source_id: String,
        error: String,
    },
    ValidateSource {
        #[serde(rename = "sourceId")]
        source_id: String,
    },
    ValidationResult {
        #[serde(rename = "sourceId")]
        source_id: String,
        valid: bool,
        #[serde(default)]
        errors: Vec<String>,
    },
    SetSynced {
        #[serde(rename = "sourceId")]
        source_id: String,
    },
    SetDirty {
        #[serde(rename = "sourceId")]
        source_id: String,
    },
}

impl ActionSet for DataSourceAction {
    const KINDS: &'static [&'static str] = &[
        "ADD_SOURCE",
        "UPDATE_SOURCE",
        "REMOVE_SOURCE",
        "LOAD_REQUEST",
        "LOAD_SUCCESS",
        "LOAD_FAILURE",
        "VALIDATE_SOURCE",
        "VALIDATION_RESULT",
        "SET_SYNCED",
        "SET_DIRTY",
    ];
}

impl From<DataSourceAction> for Action {
    fn from(action: DataSourceAction) -> Self {
        Self::encode(&action)
    }
}

impl DataSourceAction {
    #[must_use]
    pub fn set_synced(source_id: impl Into<String>) -> Self {
        Self::SetSynced {
            source_id: source_id.into(),
        }
    }

    #[must_use]
    pub fn set_dirty(source_id: impl Into<String>) -> Self {
        Self::SetDirty {
            source_id: source_id.into(),
        }
    }

    /// Builds `LOAD_SUCCESS` with `data` moved into the payload.
    ///
    /// Equivalent to encoding [`Self::LoadSuccess`] without serializing a
    /// second copy of the rows.
    #[must_use]
    pub fn load_success(source_id: &str, data: Vec<Value>, metadata: &SourceMetadata) -> Action {
        let metadata = match serde_json::to_value(metadata) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::error!(source_id = %source_id, error = %e, "failed to encode load metadata");
                return Action::new(INVALID);
            }
        };

        let mut payload = Map::with_capacity(3);
        payload.insert("sourceId".to_string(), Value::String(source_id.to_string()));
        payload.insert("data".to_string(), Value::Array(data));
        payload.insert("metadata".to_string(), metadata);
        Action::with_payload("LOAD_SUCCESS", Value::Object(payload))
    }

    /// Source the action targets.
    #[must_use]
    pub fn source_id(&self) -> &str {
        match self {
            Self::AddSource(source) => &source.id,
            Self::UpdateSource { source_id, .. }
            | Self::RemoveSource { source_id }
            | Self::LoadRequest { source_id }
            | Self::LoadSuccess { source_id, .. }
            | Self::LoadFailure { source_id, .. }
            | Self::ValidateSource { source_id }
            | Self::ValidationResult { source_id, .. }
            | Self::SetSynced { source_id }
            | Self::SetDirty { source_id } => source_id,
        }
    }
}
