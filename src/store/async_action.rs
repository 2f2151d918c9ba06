//! Async action helper: pending / fulfilled / rejected around a future.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::action::Action;
use super::store::Store;
use crate::domain::{DashboardError, Result};

/// Progress of an async action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AsyncStatus {
    Pending,
    Fulfilled,
    Rejected,
}

impl AsyncStatus {
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fulfilled => "fulfilled",
            Self::Rejected => "rejected",
        }
    }

    /// Splits an action type like `sources/load/pending` into its prefix and
    /// status.
    #[must_use]
    pub fn of(kind: &str) -> Option<(&str, Self)> {
        let (prefix, suffix) = kind.rsplit_once('/')?;
        let status = match suffix {
            "pending" => Self::Pending,
            "fulfilled" => Self::Fulfilled,
            "rejected" => Self::Rejected,
            _ => return None,
        };
        (!prefix.is_empty()).then_some((prefix, status))
    }
}

impl fmt::Display for AsyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

type PayloadMapper<T> = Arc<dyn Fn(&T) -> Value + Send + Sync>;
type ErrorMapper = Arc<dyn Fn(&DashboardError) -> String + Send + Sync>;

/// Wraps a fallible future in `<prefix>/pending`, `<prefix>/fulfilled` and
/// `<prefix>/rejected` dispatches.
///
/// The fulfilled payload is the mapped result (the serialized value by
/// default). The rejected payload is `{"error": message}`.
///
/// # Example
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use pamdash::store::{AsyncAction, Store};
///
/// let store = Store::new();
/// let count = AsyncAction::<usize>::new("accounts/count")
///     .run(&store, async { Ok(3) })
///     .await;
/// assert_eq!(count.ok(), Some(3));
/// assert!(!store.app().loading);
/// # }
/// ```
pub struct AsyncAction<T> {
    prefix: String,
    map_payload: PayloadMapper<T>,
    map_error: ErrorMapper,
}

impl<T: Serialize + 'static> AsyncAction<T> {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            map_payload: Arc::new(|value: &T| {
                serde_json::to_value(value).unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "async action result is not serializable");
                    Value::Null
                })
            }),
            map_error: Arc::new(|e: &DashboardError| e.to_string()),
        }
    }
}

impl<T> AsyncAction<T> {
    /// Replaces how the fulfilled payload is derived from the result.
    #[must_use]
    pub fn map_payload<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        self.map_payload = Arc::new(f);
        self
    }

    /// Replaces how the rejection message is derived from the error.
    #[must_use]
    pub fn map_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&DashboardError) -> String + Send + Sync + 'static,
    {
        self.map_error = Arc::new(f);
        self
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn action_type(&self, status: AsyncStatus) -> String {
        format!("{}/{}", self.prefix, status.suffix())
    }

    /// Dispatches `pending`, awaits `future`, then dispatches `fulfilled` or
    /// `rejected`.
    ///
    /// # Errors
    ///
    /// Returns the future's error after the `rejected` action is dispatched.
    pub async fn run<F>(&self, store: &Store, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        store.dispatch(Action::new(self.action_type(AsyncStatus::Pending)));

        match future.await {
            Ok(value) => {
                let payload = (self.map_payload)(&value);
                store.dispatch(Action::with_payload(
                    self.action_type(AsyncStatus::Fulfilled),
                    payload,
                ));
                Ok(value)
            }
            Err(e) => {
                let message = (self.map_error)(&e);
                tracing::debug!(prefix = %self.prefix, error = %message, "async action rejected");
                store.dispatch(Action::with_payload(
                    self.action_type(AsyncStatus::Rejected),
                    json!({ "error": message }),
                ));
                Err(e)
            }
        }
    }
}

impl<T> fmt::Debug for AsyncAction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncAction")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lifecycle_suffixes() {
        assert_eq!(AsyncStatus::of("a/b/pending"), Some(("a/b", AsyncStatus::Pending)));
        assert_eq!(AsyncStatus::of("x/rejected"), Some(("x", AsyncStatus::Rejected)));
        assert_eq!(AsyncStatus::of("/fulfilled"), None);
        assert_eq!(AsyncStatus::of("SET_THEME"), None);
        assert_eq!(AsyncStatus::of("x/done"), None);
    }
}
