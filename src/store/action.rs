//! Actions: the only way state changes.
//!
//! An [`Action`] is a `type` string plus an optional JSON `payload`, the same
//! shape the front end dispatches. Feature modules define typed action enums
//! (adjacently tagged on `type`/`payload`) and convert them with
//! [`Action::encode`]; their reducers convert back with [`Action::decode`].
//!
//! # Example
//!
//! ```
//! use pamdash::store::{Action, AppAction};
//!
//! let action = Action::encode(&AppAction::SetTheme("dark".to_string()));
//! assert_eq!(action.kind, "SET_THEME");
//! assert_eq!(action.decode::<AppAction>().ok(), Some(AppAction::SetTheme("dark".to_string())));
//! ```

use serde::de::value::MapDeserializer;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Action type that no reducer handles.
pub const NOOP: &str = "__NOOP__";

/// Action type produced when a typed action cannot be encoded.
pub const INVALID: &str = "__INVALID__";

/// A dispatched action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl Action {
    /// Creates an action without payload.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Value::Null,
        }
    }

    #[must_use]
    pub fn with_payload(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// The `__NOOP__` action.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(NOOP)
    }

    #[must_use]
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// Encodes a typed action.
    ///
    /// Encoding failures are logged and yield an [`INVALID`] action, which no
    /// reducer handles.
    #[must_use]
    pub fn encode<T: Serialize>(action: &T) -> Self {
        match serde_json::to_value(action) {
            Ok(Value::Object(mut object)) => {
                let kind = match object.remove("type") {
                    Some(Value::String(kind)) => kind,
                    _ => {
                        tracing::error!("typed action serialized without a string 'type'");
                        return Self::new(INVALID);
                    }
                };
                let payload = object.remove("payload").unwrap_or(Value::Null);
                Self { kind, payload }
            }
            Ok(other) => {
                tracing::error!(value = %other, "typed action did not serialize to an object");
                Self::new(INVALID)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to encode action");
                Self::new(INVALID)
            }
        }
    }

    /// Decodes into a typed action enum, reading the payload in place.
    ///
    /// # Errors
    ///
    /// Fails if the type is not one of `T`'s variants or the payload does not
    /// match the variant.
    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        let kind = Value::String(self.kind.clone());
        let fields = [("type", &kind), ("payload", &self.payload)];
        T::deserialize(MapDeserializer::new(fields.into_iter()))
    }
}

/// Typed action enums with the set of `type` strings they own.
///
/// Reducers check [`owns`](ActionSet::owns) before decoding so unrelated
/// actions are not deserialized by every module.
pub trait ActionSet: Serialize + DeserializeOwned {
    const KINDS: &'static [&'static str];

    #[must_use]
    fn owns(action: &Action) -> bool {
        Self::KINDS.contains(&action.kind.as_str())
    }

    /// Decodes `action` if it belongs to this set.
    ///
    /// A known type with a malformed payload is logged and treated as
    /// unhandled.
    #[must_use]
    fn from_action(action: &Action) -> Option<Self> {
        if !Self::owns(action) {
            return None;
        }
        match action.decode::<Self>() {
            Ok(typed) => Some(typed),
            Err(e) => {
                tracing::warn!(action = %action.kind, error = %e, "ignoring malformed action payload");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
    enum Counter {
        Increment,
        AddBy(i64),
    }

    impl ActionSet for Counter {
        const KINDS: &'static [&'static str] = &["INCREMENT", "ADD_BY"];
    }

    #[test]
    fn unit_variants_encode_without_payload() {
        let action = Action::encode(&Counter::Increment);
        assert_eq!(action, Action::new("INCREMENT"));
        assert_eq!(serde_json::to_value(&action).unwrap(), json!({"type": "INCREMENT"}));
        assert_eq!(Counter::from_action(&action), Some(Counter::Increment));
    }

    #[test]
    fn payload_variants_round_trip() {
        let action = Action::encode(&Counter::AddBy(3));
        assert_eq!(action.payload, json!(3));
        assert_eq!(Counter::from_action(&action), Some(Counter::AddBy(3)));
    }

    #[test]
    fn foreign_and_malformed_actions_are_not_decoded() {
        assert_eq!(Counter::from_action(&Action::noop()), None);
        assert_eq!(Counter::from_action(&Action::with_payload("ADD_BY", json!("x"))), None);
    }

    #[test]
    fn non_object_values_encode_as_invalid() {
        assert_eq!(Action::encode(&42).kind, INVALID);
    }
}
