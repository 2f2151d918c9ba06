//! Module-based state store.
//!
//! Features register a named [`Module`] (reducer plus initial state) into one
//! [`Store`]. Dispatching an [`Action`] runs every module's reducer on its own
//! slice; slices a reducer leaves untouched keep their identity, and a
//! dispatch that changes nothing keeps the whole [`StateSnapshot`].
//!
//! # Modules
//!
//! - [`action`]: the `{type, payload}` action and typed action sets
//! - [`module`]: modules, snapshots and the combined reducer
//! - [`store`]: the shared handle with dispatch, selection and subscriptions
//! - [`app`]: the always-present `app` module
//! - [`async_action`]: pending/fulfilled/rejected wrapper for futures
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use pamdash::store::{Action, AppAction, Store};
//!
//! let store = Store::new();
//! store.dispatch(AppAction::ToggleSidebar);
//! assert!(!store.app().sidebar_open);
//!
//! store.register_module("counter", |n: &Arc<u32>, a: &Action| {
//!     if a.is("INCREMENT") { Arc::new(**n + 1) } else { Arc::clone(n) }
//! }, 0_u32);
//! store.dispatch(Action::new("INCREMENT"));
//! assert_eq!(store.module::<u32>("counter").as_deref(), Some(&1));
//! ```

pub mod action;
pub mod app;
pub mod async_action;
pub mod module;
#[allow(clippy::module_inception)]
pub mod store;

pub use action::{Action, ActionSet, INVALID, NOOP};
pub use app::{AppAction, AppState, Notification, NotificationKind};
pub use async_action::{AsyncAction, AsyncStatus};
pub use module::{update_slice, Module, ModuleRegistry, Slice, StateSnapshot};
pub use store::Store;
