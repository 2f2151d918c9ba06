//! The store handle: serialized dispatch over the module registry.
//!
//! # Architecture
//!
//! A [`Store`] is a cheap-to-clone handle around one mutex holding the
//! [`ModuleRegistry`], the current [`StateSnapshot`] and a `watch` channel.
//! Every dispatch runs the combined reducer under that mutex, so reducers
//! apply strictly in dispatch order and readers only ever see whole
//! snapshots. Subscribers are woken only when the snapshot actually changed.
//!
//! Reducer panics are not caught. The mutex is poisoned by the unwinding
//! dispatch; later calls recover the guard and keep using the last committed
//! snapshot, which the failed dispatch never replaced.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use super::action::Action;
use super::app::{self, AppState};
use super::module::{Module, ModuleRegistry, StateSnapshot};

struct Inner {
    modules: ModuleRegistry,
    state: StateSnapshot,
    notifier: watch::Sender<StateSnapshot>,
}

/// Shared handle to the application state.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<Inner>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Creates a store with the `app` module registered.
    #[must_use]
    pub fn new() -> Self {
        Self::with_theme(app::DEFAULT_THEME)
    }

    /// Creates a store whose `app` module starts with `theme`.
    #[must_use]
    pub fn with_theme(theme: impl Into<String>) -> Self {
        let store = Self::empty();
        store.register(app::module(theme));
        store
    }

    /// Creates a store without any module.
    #[must_use]
    pub fn empty() -> Self {
        let state = StateSnapshot::default();
        let (notifier, _) = watch::channel(state.clone());
        Self {
            inner: Arc::new(Mutex::new(Inner {
                modules: ModuleRegistry::new(),
                state,
                notifier,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `action` to every module.
    pub fn dispatch(&self, action: impl Into<Action>) {
        let action = action.into();
        let mut inner = self.lock();

        let next = inner.modules.reduce(&inner.state, &action);
        if next.ptr_eq(&inner.state) {
            tracing::trace!(action = %action.kind, "dispatch left state unchanged");
            return;
        }

        tracing::debug!(action = %action.kind, "state updated");
        inner.state = next.clone();
        inner.notifier.send_replace(next);
    }

    /// Runs an action creator that needs the store itself, the equivalent of
    /// a thunk receiving `(dispatch, getState)`.
    pub fn dispatch_thunk<R, F>(&self, thunk: F) -> R
    where
        F: FnOnce(&Self) -> R,
    {
        thunk(self)
    }

    /// Current state snapshot.
    #[must_use]
    pub fn get_state(&self) -> StateSnapshot {
        self.lock().state.clone()
    }

    /// Slice of module `name`, if registered with slice type `S`.
    #[must_use]
    pub fn module<S: Any + Send + Sync>(&self, name: &str) -> Option<Arc<S>> {
        self.get_state().get::<S>(name)
    }

    /// The `app` slice, or its initial value if the module was unregistered.
    #[must_use]
    pub fn app(&self) -> Arc<AppState> {
        self.module::<AppState>(app::MODULE_NAME).unwrap_or_default()
    }

    /// Derives a value from the current snapshot.
    pub fn select<R, F>(&self, selector: F) -> R
    where
        F: FnOnce(&StateSnapshot) -> R,
    {
        selector(&self.get_state())
    }

    /// Receiver that observes every committed snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StateSnapshot> {
        self.lock().notifier.subscribe()
    }

    /// Registers a module and seeds its slice with the initial state.
    ///
    /// A duplicate name is a warned no-op that keeps the existing module.
    pub fn register_module<S, F>(&self, name: impl Into<String>, reducer: F, initial_state: S) -> bool
    where
        S: Any + Send + Sync,
        F: Fn(&Arc<S>, &Action) -> Arc<S> + Send + Sync + 'static,
    {
        self.register(Module::new(name, reducer, initial_state))
    }

    /// Registers a prebuilt [`Module`].
    pub fn register(&self, module: Module) -> bool {
        let mut inner = self.lock();
        let name = module.name().to_string();
        let initial = module.initial_state();

        if !inner.modules.insert(module) {
            tracing::warn!(module = %name, "module already registered");
            return false;
        }

        let next = inner.state.with_slice(&name, initial);
        inner.state = next.clone();
        inner.notifier.send_replace(next);

        tracing::debug!(module = %name, "module registered");
        true
    }

    /// Removes a module and its slice. Unknown names are a warned no-op.
    pub fn unregister_module(&self, name: &str) -> bool {
        let mut inner = self.lock();
        if inner.modules.remove(name).is_none() {
            tracing::warn!(module = %name, "cannot unregister unknown module");
            return false;
        }

        let next = inner.state.without_slice(name);
        inner.state = next.clone();
        inner.notifier.send_replace(next);

        tracing::debug!(module = %name, "module unregistered");
        true
    }

    /// Names of registered modules.
    #[must_use]
    pub fn module_names(&self) -> Vec<String> {
        self.lock().modules.names().map(str::to_string).collect()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("modules", &self.module_names())
            .finish()
    }
}
