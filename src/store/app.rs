//! The built-in `app` module: theme, layout flags, global loading/error and
//! notifications.
//!
//! Besides its own actions, the reducer follows the lifecycle of every
//! [`AsyncAction`](super::AsyncAction): `<prefix>/pending` raises the global
//! loading flag, `<prefix>/fulfilled` lowers it and `<prefix>/rejected` lowers
//! it and records the error message.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::action::{Action, ActionSet};
use super::async_action::AsyncStatus;
use super::module::{update_slice, Module};

pub const MODULE_NAME: &str = "app";

pub const DEFAULT_THEME: &str = "light";

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: NotificationKind,
    /// Unix timestamp in milliseconds.
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub theme: String,
    pub sidebar_open: bool,
    pub loading: bool,
    pub error: Option<String>,
    pub notifications: Vec<Notification>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            sidebar_open: true,
            loading: false,
            error: None,
            notifications: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppAction {
    SetTheme(String),
    ToggleSidebar,
    SetLoading(bool),
    SetError(Option<String>),
    AddNotification(Notification),
    RemoveNotification(i64),
    ClearNotifications,
}

impl ActionSet for AppAction {
    const KINDS: &'static [&'static str] = &[
        "SET_THEME",
        "TOGGLE_SIDEBAR",
        "SET_LOADING",
        "SET_ERROR",
        "ADD_NOTIFICATION",
        "REMOVE_NOTIFICATION",
        "CLEAR_NOTIFICATIONS",
    ];
}

impl AppAction {
    /// Builds an `ADD_NOTIFICATION` action.
    ///
    /// The id is assigned here, when the action is created, so the caller
    /// can later remove the notification it added.
    #[must_use]
    pub fn add_notification(message: impl Into<String>, kind: NotificationKind) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self::AddNotification(Notification {
            id: next_notification_id(now),
            message: message.into(),
            kind,
            created_at: now,
        })
    }
}

impl From<AppAction> for Action {
    fn from(action: AppAction) -> Self {
        Self::encode(&action)
    }
}

static LAST_NOTIFICATION_ID: AtomicI64 = AtomicI64::new(0);

/// Millisecond timestamp ids, bumped when two notifications land in the same
/// millisecond.
fn next_notification_id(now: i64) -> i64 {
    let mut last = LAST_NOTIFICATION_ID.load(Ordering::Relaxed);
    loop {
        let id = now.max(last + 1);
        match LAST_NOTIFICATION_ID.compare_exchange_weak(last, id, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return id,
            Err(current) => last = current,
        }
    }
}

#[must_use]
pub fn module(theme: impl Into<String>) -> Module {
    let initial = AppState {
        theme: theme.into(),
        ..AppState::default()
    };
    Module::new(MODULE_NAME, reducer, initial)
}

pub fn reducer(state: &Arc<AppState>, action: &Action) -> Arc<AppState> {
    if let Some(action) = AppAction::from_action(action) {
        return update_slice(state, |s| apply(s, action));
    }

    match AsyncStatus::of(&action.kind) {
        Some((_, AsyncStatus::Pending)) => update_slice(state, |s| s.loading = true),
        Some((_, AsyncStatus::Fulfilled)) => update_slice(state, |s| s.loading = false),
        Some((_, AsyncStatus::Rejected)) => {
            let message = action
                .payload
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string);
            update_slice(state, |s| {
                s.loading = false;
                s.error = message;
            })
        }
        None => Arc::clone(state),
    }
}

fn apply(state: &mut AppState, action: AppAction) {
    match action {
        AppAction::SetTheme(theme) => state.theme = theme,
        AppAction::ToggleSidebar => state.sidebar_open = !state.sidebar_open,
        AppAction::SetLoading(loading) => state.loading = loading,
        AppAction::SetError(error) => state.error = error,
        AppAction::AddNotification(notification) => state.notifications.push(notification),
        AppAction::RemoveNotification(id) => state.notifications.retain(|n| n.id != id),
        AppAction::ClearNotifications => state.notifications.clear(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reduce(state: &Arc<AppState>, action: AppAction) -> Arc<AppState> {
        reducer(state, &action.into())
    }

    #[test]
    fn toggles_sidebar_and_sets_theme() {
        let state = Arc::new(AppState::default());
        let state = reduce(&state, AppAction::ToggleSidebar);
        assert!(!state.sidebar_open);
        let state = reduce(&state, AppAction::SetTheme("dark".to_string()));
        assert_eq!(state.theme, "dark");
    }

    #[test]
    fn unchanged_state_keeps_identity() {
        let state = Arc::new(AppState::default());
        let same = reduce(&state, AppAction::SetTheme(DEFAULT_THEME.to_string()));
        assert!(Arc::ptr_eq(&state, &same));
        let same = reducer(&state, &Action::noop());
        assert!(Arc::ptr_eq(&state, &same));
    }

    #[test]
    fn notification_ids_are_unique_and_removable() {
        let first = AppAction::add_notification("vault unreachable", NotificationKind::Error);
        let second = AppAction::add_notification("retrying", NotificationKind::Info);
        let (AppAction::AddNotification(a), AppAction::AddNotification(b)) = (&first, &second) else {
            panic!("expected notifications");
        };
        assert!(b.id > a.id);

        let state = Arc::new(AppState::default());
        let state = reduce(&state, first.clone());
        let state = reduce(&state, second.clone());
        assert_eq!(state.notifications.len(), 2);

        let state = reduce(&state, AppAction::RemoveNotification(a.id));
        assert_eq!(state.notifications, vec![b.clone()]);

        let state = reduce(&state, AppAction::ClearNotifications);
        assert!(state.notifications.is_empty());
    }

    #[test]
    fn set_error_accepts_null_to_clear() {
        let state = Arc::new(AppState::default());
        let state = reduce(&state, AppAction::SetError(Some("boom".to_string())));
        assert_eq!(state.error.as_deref(), Some("boom"));
        let state = reducer(&state, &Action::new("SET_ERROR"));
        assert_eq!(state.error, None);
    }

    #[test]
    fn async_lifecycle_drives_loading_and_error() {
        let state = Arc::new(AppState::default());
        let state = reducer(&state, &Action::new("sources/loadAll/pending"));
        assert!(state.loading);
        let state = reducer(
            &state,
            &Action::with_payload("sources/loadAll/rejected", json!({"error": "timeout"})),
        );
        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some("timeout"));
    }
}
